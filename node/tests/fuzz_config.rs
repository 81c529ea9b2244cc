//! Property-based tests for the configuration boundary.
//!
//! Configuration text comes from operators and environments we do not
//! control, so parsing must reject bad input with an error, never a panic.

use proptest::prelude::*;

use guild_node::{LogFormat, NodeConfig};

proptest! {
    /// Arbitrary text either parses or yields a config error.
    #[test]
    fn arbitrary_text_never_panics(text in "\\PC{0,200}") {
        let _ = NodeConfig::from_toml_str(&text);
    }

    /// Numeric settings written out are read back unchanged.
    #[test]
    fn numeric_settings_roundtrip(
        map_size_mb in 1usize..=1 << 20,
        depth in 0usize..=10_000,
        timeout in 1u64..=3_600,
        json in any::<bool>(),
    ) {
        let mut config = NodeConfig {
            map_size_mb,
            log_format: if json { LogFormat::Json } else { LogFormat::Human },
            ..NodeConfig::default()
        };
        config.engine.max_acknowledgment_depth = depth;
        config.notifications.timeout_secs = timeout;

        let text = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&text).unwrap();
        prop_assert_eq!(parsed, config);
    }
}
