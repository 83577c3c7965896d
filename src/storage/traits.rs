//! Storage trait definitions

use crate::graph::{Debate, DebateId, Message, MessageId};
use crate::session::SessionKey;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for message store backends
///
/// The store is append-only per session: messages are never updated, and
/// are removed only by clearing a whole session. Implementations must be
/// thread-safe (Send + Sync); sessions call into the store from their own
/// tasks concurrently.
pub trait MessageStore: Send + Sync {
    // === Debate catalogue ===

    /// All debates, newest first
    fn list_debates(&self) -> StorageResult<Vec<Debate>>;

    /// Look up one debate
    fn get_debate(&self, id: DebateId) -> StorageResult<Option<Debate>>;

    /// Add a debate with the given topic
    fn create_debate(&self, topic: &str) -> StorageResult<Debate>;

    // === Session logs ===

    /// Append an accepted message to its session log
    fn append_message(&self, message: &Message) -> StorageResult<()>;

    /// Load a session's messages in id order
    fn load_session(&self, key: &SessionKey) -> StorageResult<Vec<Message>>;

    /// Find message `id` in any session of a debate
    ///
    /// Ids repeat across sessions; the most recently stored match wins.
    fn find_message(&self, debate_id: DebateId, id: MessageId) -> StorageResult<Option<Message>>;

    /// Delete every message of a session; returns how many were removed
    ///
    /// Must be all-or-nothing: on error the session is left as it was.
    fn clear_session(&self, key: &SessionKey) -> StorageResult<usize>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: MessageStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
