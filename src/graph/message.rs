//! Debate messages: the nodes of the argument graph

use crate::semantics::WinnerSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a message, unique and strictly increasing within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Largest id a store can hold (SQLite integers are signed 64-bit)
    pub const MAX: MessageId = MessageId(i64::MAX as u64);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// The id that follows this one, if it is still storable
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self).filter(|id| *id <= Self::MAX)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of a debate in the catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebateId(i64);

impl DebateId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for DebateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DebateId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Caller-chosen session key
///
/// Opaque: how clients build it (e.g. from participant names) is their concern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub const DEFAULT: &'static str = "default_session";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace-only keys address the default session
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Role of a message in the argument structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    #[default]
    Claim,
    Premise,
}

impl ArgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Premise => "premise",
        }
    }

    /// Lenient parse used for storage rows and coach output
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claim" => Some(Self::Claim),
            "premise" => Some(Self::Premise),
            _ => None,
        }
    }
}

/// How a message relates to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Attack,
    Support,
    #[default]
    None,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Support => "support",
            Self::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attack" => Some(Self::Attack),
            "support" => Some(Self::Support),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// A debate message
///
/// Immutable once accepted. `current_winners` is a derived annotation that
/// is attached when the message is broadcast or fetched; it is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    #[serde(rename = "username", alias = "author")]
    pub author: String,
    pub debate_id: DebateId,
    #[serde(default)]
    pub session_id: SessionId,
    #[serde(default)]
    pub arg_type: ArgType,
    #[serde(default)]
    pub relation_type: RelationType,
    #[serde(default)]
    pub target_id: Option<MessageId>,
    #[serde(default)]
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_winners: Option<WinnerSet>,
}

impl Message {
    /// Create a bare claim with no relation
    pub fn new(
        id: MessageId,
        debate_id: DebateId,
        session_id: SessionId,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            author: author.into(),
            debate_id,
            session_id,
            arg_type: ArgType::Claim,
            relation_type: RelationType::None,
            target_id: None,
            feedback: None,
            created_at: Utc::now(),
            current_winners: None,
        }
    }

    pub fn with_arg_type(mut self, arg_type: ArgType) -> Self {
        self.arg_type = arg_type;
        self
    }

    /// Relate this message to an earlier one
    pub fn relating(mut self, relation_type: RelationType, target: MessageId) -> Self {
        self.relation_type = relation_type;
        self.target_id = Some(target);
        self
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    /// Copy of this message annotated with a winner set
    pub fn annotated(&self, winners: &WinnerSet) -> Self {
        let mut message = self.clone();
        message.current_winners = Some(winners.clone());
        message
    }
}

/// A message as submitted to a session, before an id is assigned
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    /// Caller-supplied id; the session assigns the next one when absent
    pub id: Option<MessageId>,
    /// The relation was proposed by the coach rather than the author
    pub relation_inferred: bool,
    pub content: String,
    pub author: String,
    pub arg_type: ArgType,
    pub relation_type: RelationType,
    pub target_id: Option<MessageId>,
    pub feedback: Option<String>,
}

impl NewMessage {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            relation_inferred: false,
            content: content.into(),
            author: author.into(),
            arg_type: ArgType::Claim,
            relation_type: RelationType::None,
            target_id: None,
            feedback: None,
        }
    }

    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_arg_type(mut self, arg_type: ArgType) -> Self {
        self.arg_type = arg_type;
        self
    }

    pub fn attacking(self, target: MessageId) -> Self {
        self.relating(RelationType::Attack, target)
    }

    pub fn supporting(self, target: MessageId) -> Self {
        self.relating(RelationType::Support, target)
    }

    pub fn relating(mut self, relation_type: RelationType, target: MessageId) -> Self {
        self.relation_type = relation_type;
        self.target_id = Some(target);
        self
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    /// Mark the relation as inferred; an unresolved target is then dropped
    /// instead of rejecting the message
    pub fn inferred(mut self) -> Self {
        self.relation_inferred = true;
        self
    }

    /// Materialize with a concrete id inside a session
    pub fn into_message(self, id: MessageId, debate_id: DebateId, session_id: SessionId) -> Message {
        Message {
            id,
            content: self.content,
            author: self.author,
            debate_id,
            session_id,
            arg_type: self.arg_type,
            relation_type: self.relation_type,
            target_id: self.target_id,
            feedback: self.feedback,
            created_at: Utc::now(),
            current_winners: None,
        }
    }
}

/// A debate in the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debate {
    pub id: DebateId,
    pub topic: String,
}
