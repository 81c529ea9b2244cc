//! Guild node: configuration, logging and the wiring of the LMDB store,
//! the group engine and its notifiers.

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod tracing_spans;

pub use config::{NodeConfig, NotificationConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::GuildNode;
