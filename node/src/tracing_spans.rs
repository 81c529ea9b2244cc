//! Pre-built [`tracing::Span`] constructors for node operations.
//!
//! Consistent span names and fields make it easy to filter and correlate
//! the engine's log lines by operation and actor.

use tracing::{info_span, Span};

use guild_types::UserId;

/// Span covering one engine operation run on behalf of `actor`.
pub fn operation_span(operation: &str, actor: Option<UserId>) -> Span {
    match actor {
        Some(actor) => info_span!("operation", op = %operation, actor = %actor),
        None => info_span!("operation", op = %operation),
    }
}

/// Span covering opening and checking the data directory.
pub fn open_span(data_dir: &str) -> Span {
    info_span!("open", data_dir = %data_dir)
}
