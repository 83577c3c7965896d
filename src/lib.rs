//! Dialectic: live argumentation engine
//!
//! Participants post messages into a debate session. Each message may
//! attack or support an earlier one; the session keeps an argument graph
//! and, after every accepted message, recomputes which messages currently
//! win under grounded semantics.
//!
//! # Core Concepts
//!
//! - **Messages**: Immutable claims or premises, optionally related to a target
//! - **Sessions**: Independent graphs keyed by debate and session id, each
//!   owned by one writer task
//! - **Winners**: Messages labelled IN by the grounded labelling
//! - **Coach**: Optional language model that classifies unstructured
//!   messages and suggests rebuttals
//!
//! # Example
//!
//! ```
//! use dialectic::{ArgumentGraph, GroundedSemantics, Message, MessageId, DebateId, SessionId, RelationType};
//!
//! let mut graph = ArgumentGraph::new();
//! let session = SessionId::default();
//! let claim = Message::new(MessageId::new(1), DebateId::new(1), session.clone(), "alice", "Cars out");
//! let reply = Message::new(MessageId::new(2), DebateId::new(1), session, "bob", "Deliveries?")
//!     .relating(RelationType::Attack, MessageId::new(1));
//! graph.add_message(&claim).unwrap();
//! graph.add_message(&reply).unwrap();
//!
//! let labelling = GroundedSemantics::label(&graph);
//! assert!(labelling.winners().contains(&MessageId::new(2)));
//! ```

pub mod api;
pub mod broadcast;
pub mod coach;
pub mod config;
mod graph;
pub mod mcp;
pub mod semantics;
pub mod server;
pub mod session;
pub mod storage;

pub use api::{ApiError, ApiOptions, ApiResult, DebateApi, Submission};
pub use broadcast::{BroadcastGateway, DebateEvent, Subscription};
pub use coach::{ArgumentAnalysis, Coach, CoachError, CoachResult, DisabledCoach, HistoryEntry, MockCoach, OpenAiCoach};
pub use config::{CoachConfig, Config, ConfigError};
pub use graph::{
    ArgType, ArgumentGraph, Debate, DebateId, Edge, EdgeKind, GraphError, GraphResult, Insertion, Message,
    MessageId, NewMessage, RelationType, SessionId,
};
pub use semantics::{GroundedSemantics, Label, Labelling, RelabelStats, WinnerSet};
pub use session::{Accepted, Score, SessionError, SessionHandle, SessionKey, SessionManager, SessionSnapshot};
pub use storage::{MemoryStore, MessageStore, OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
