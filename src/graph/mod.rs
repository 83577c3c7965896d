//! Core graph data structures

mod edge;
mod framework;
mod message;


pub use edge::{Edge, EdgeKind};
pub use framework::{ArgumentGraph, GraphError, GraphResult, Insertion};
pub use message::{
    ArgType, Debate, DebateId, Message, MessageId, NewMessage, RelationType, SessionId,
};
