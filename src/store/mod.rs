//! Message store boundary for the inbound receiver.
//!
//! The receiver only depends on this trait; persistence details (and their
//! limits) live behind it. Errors are typed rather than classified by
//! matching on message text, so "too large" handling does not depend on
//! the wording of an error string.

pub mod spool;

use std::path::PathBuf;

use thiserror::Error;

pub use spool::SpoolStore;

/// Identifier assigned to a stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a message could not be persisted.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The message exceeds the store's configured size limit.
    #[error("Value with size {size} exceeded {limit} limit")]
    SizeLimitExceeded { size: u64, limit: u64 },

    /// Any other persistence failure.
    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Persistence for received messages.
///
/// Implementations must be safe to call concurrently: the SMTP listener
/// dispatches one session per connection.
pub trait MessageStore: Send + Sync {
    /// Persist one raw message, returning its assigned id.
    fn store(&self, raw: &[u8]) -> Result<MessageId, StoreError>;
}
