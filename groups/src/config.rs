use serde::{Deserialize, Serialize};

fn default_max_acknowledgment_depth() -> usize {
    64
}

/// Engine tuning, the `[engine]` table of the node config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Longest validated acknowledgment chain followed when deciding
    /// whether a user is related to a group.
    #[serde(default = "default_max_acknowledgment_depth")]
    pub max_acknowledgment_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_acknowledgment_depth: default_max_acknowledgment_depth(),
        }
    }
}
