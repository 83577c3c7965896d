//! Session addressing

use crate::graph::{DebateId, SessionId};
use serde::{Deserialize, Serialize};

/// Identifies one isolated session of a debate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub debate_id: DebateId,
    pub session_id: SessionId,
}

impl SessionKey {
    pub fn new(debate_id: DebateId, session_id: SessionId) -> Self {
        Self {
            debate_id,
            session_id,
        }
    }

    /// The shared session of a debate
    pub fn default_for(debate_id: DebateId) -> Self {
        Self::new(debate_id, SessionId::default())
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.debate_id, self.session_id)
    }
}
