//! Directed relations between messages

use super::message::{MessageId, RelationType};
use serde::{Deserialize, Serialize};

/// Kind of relation an edge carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Attack,
    Support,
}

impl EdgeKind {
    /// The edge kind a relation produces; `None` produces no edge
    pub fn from_relation(relation: RelationType) -> Option<Self> {
        match relation {
            RelationType::Attack => Some(Self::Attack),
            RelationType::Support => Some(Self::Support),
            RelationType::None => None,
        }
    }
}

/// A directed edge `source -> target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: MessageId,
    pub target: MessageId,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(source: MessageId, target: MessageId, kind: EdgeKind) -> Self {
        Self { source, target, kind }
    }

    pub fn attack(source: MessageId, target: MessageId) -> Self {
        Self::new(source, target, EdgeKind::Attack)
    }

    pub fn support(source: MessageId, target: MessageId) -> Self {
        Self::new(source, target, EdgeKind::Support)
    }

    pub fn is_attack(&self) -> bool {
        self.kind == EdgeKind::Attack
    }
}
