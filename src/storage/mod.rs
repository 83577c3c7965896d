//! Storage backends for debates and session logs
//!
//! Sessions persist through the `MessageStore` trait. `SqliteStore` is the
//! persistent backend; `MemoryStore` backs tests and throwaway servers.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{MessageStore, OpenStore, StorageError, StorageResult};
