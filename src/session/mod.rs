//! Sessions: isolated argument graphs, one actor each
//!
//! A session is addressed by `(debate_id, session_id)`. It owns the ordered
//! message log, the graph derived from it and the current labelling. All
//! writes to a session go through its actor task; reads take point-in-time
//! snapshots.

mod key;
mod manager;
mod state;

pub use key::SessionKey;
pub use manager::{Accepted, SessionError, SessionHandle, SessionManager, SessionResult};
pub use state::{LabelledNode, Score, SessionSnapshot, SessionState};
