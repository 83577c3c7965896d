//! ArgumentGraph: the argumentation framework derived from a session's messages

use super::edge::{Edge, EdgeKind};
use super::message::{Message, MessageId};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised while building the graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("target message {target} does not exist in this session")]
    InvalidTarget { target: MessageId },

    #[error("unknown message {0}")]
    UnknownNode(MessageId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Outcome of inserting a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The id was already present; nothing changed
    Duplicate,
    /// A new node, and the edge it introduced if any
    Inserted { node: MessageId, edge: Option<Edge> },
}

impl Insertion {
    /// Nodes whose labels may have changed because of this insertion
    pub fn affected(&self) -> Vec<MessageId> {
        match self {
            Self::Duplicate => Vec::new(),
            Self::Inserted { node, edge } => {
                let mut seeds = vec![*node];
                if let Some(edge) = edge.filter(Edge::is_attack) {
                    seeds.push(edge.target);
                }
                seeds
            }
        }
    }
}

/// Nodes and attack/support edges of one session
///
/// Nodes are kept in insertion order. Adjacency is indexed in both
/// directions for attacks so the evaluator can walk attackers and targets.
#[derive(Debug, Clone, Default)]
pub struct ArgumentGraph {
    order: Vec<MessageId>,
    nodes: HashSet<MessageId>,
    edges: Vec<Edge>,
    edge_set: HashSet<Edge>,
    attackers: HashMap<MessageId, Vec<MessageId>>,
    targets: HashMap<MessageId, Vec<MessageId>>,
    supporters: HashMap<MessageId, Vec<MessageId>>,
}

impl ArgumentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message and the edge its relation implies
    ///
    /// A repeated id is a no-op. An unresolved `target_id` rejects the
    /// message and leaves the graph untouched.
    pub fn add_message(&mut self, message: &Message) -> GraphResult<Insertion> {
        if self.contains(message.id) {
            return Ok(Insertion::Duplicate);
        }
        if let Some(target) = message.target_id {
            if !self.contains(target) {
                return Err(GraphError::InvalidTarget { target });
            }
        }

        self.add_node(message.id);
        let edge = match (EdgeKind::from_relation(message.relation_type), message.target_id) {
            (Some(kind), Some(target)) => {
                let edge = Edge::new(message.id, target, kind);
                self.insert_edge(edge);
                Some(edge)
            }
            _ => None,
        };

        Ok(Insertion::Inserted {
            node: message.id,
            edge,
        })
    }

    /// Insert a bare node. Returns false if it already existed.
    pub fn add_node(&mut self, id: MessageId) -> bool {
        if !self.nodes.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Insert a relation between two existing nodes
    ///
    /// Returns false if the identical edge is already present.
    pub fn add_edge(&mut self, edge: Edge) -> GraphResult<bool> {
        for endpoint in [edge.source, edge.target] {
            if !self.contains(endpoint) {
                return Err(GraphError::UnknownNode(endpoint));
            }
        }
        Ok(self.insert_edge(edge))
    }

    fn insert_edge(&mut self, edge: Edge) -> bool {
        if !self.edge_set.insert(edge) {
            return false;
        }
        match edge.kind {
            EdgeKind::Attack => {
                self.attackers.entry(edge.target).or_default().push(edge.source);
                self.targets.entry(edge.source).or_default().push(edge.target);
            }
            EdgeKind::Support => {
                self.supporters.entry(edge.target).or_default().push(edge.source);
            }
        }
        self.edges.push(edge);
        true
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.nodes.contains(&id)
    }

    /// Nodes attacking `id`
    pub fn attackers_of(&self, id: MessageId) -> &[MessageId] {
        self.attackers.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes attacked by `id`
    pub fn targets_of(&self, id: MessageId) -> &[MessageId] {
        self.targets.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes supporting `id`
    pub fn supporters_of(&self, id: MessageId) -> &[MessageId] {
        self.supporters.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.order.iter().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DebateId, RelationType, SessionId};

    fn msg(id: u64) -> Message {
        Message::new(
            MessageId::new(id),
            DebateId::new(1),
            SessionId::default(),
            "alice",
            format!("message {}", id),
        )
    }

    #[test]
    fn test_add_claim_creates_node_without_edge() {
        let mut graph = ArgumentGraph::new();
        let result = graph.add_message(&msg(1)).unwrap();

        assert_eq!(
            result,
            Insertion::Inserted {
                node: MessageId::new(1),
                edge: None
            }
        );
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_attack_creates_indexed_edge() {
        let mut graph = ArgumentGraph::new();
        graph.add_message(&msg(1)).unwrap();
        graph
            .add_message(&msg(2).relating(RelationType::Attack, MessageId::new(1)))
            .unwrap();

        assert_eq!(graph.attackers_of(MessageId::new(1)), &[MessageId::new(2)]);
        assert_eq!(graph.targets_of(MessageId::new(2)), &[MessageId::new(1)]);
        assert!(graph.supporters_of(MessageId::new(1)).is_empty());
    }

    #[test]
    fn test_support_is_recorded_but_not_an_attack() {
        let mut graph = ArgumentGraph::new();
        graph.add_message(&msg(1)).unwrap();
        graph
            .add_message(&msg(2).relating(RelationType::Support, MessageId::new(1)))
            .unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.supporters_of(MessageId::new(1)), &[MessageId::new(2)]);
        assert!(graph.attackers_of(MessageId::new(1)).is_empty());
    }

    #[test]
    fn test_unresolved_target_is_rejected_and_graph_unchanged() {
        let mut graph = ArgumentGraph::new();
        graph.add_message(&msg(1)).unwrap();

        let err = graph
            .add_message(&msg(2).relating(RelationType::Attack, MessageId::new(9)))
            .unwrap_err();

        assert_eq!(err, GraphError::InvalidTarget { target: MessageId::new(9) });
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains(MessageId::new(2)));
    }

    #[test]
    fn test_target_with_relation_none_must_still_resolve() {
        let mut graph = ArgumentGraph::new();
        let mut m = msg(1);
        m.target_id = Some(MessageId::new(5));

        assert!(graph.add_message(&m).is_err());
    }

    #[test]
    fn test_duplicate_id_is_noop() {
        let mut graph = ArgumentGraph::new();
        graph.add_message(&msg(1)).unwrap();
        graph.add_message(&msg(2)).unwrap();

        // Same id, different relation: still a no-op
        let again = graph
            .add_message(&msg(2).relating(RelationType::Attack, MessageId::new(1)))
            .unwrap();

        assert_eq!(again, Insertion::Duplicate);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_add_edge_requires_both_endpoints() {
        let mut graph = ArgumentGraph::new();
        graph.add_node(MessageId::new(1));

        let err = graph.add_edge(Edge::attack(MessageId::new(1), MessageId::new(2))).unwrap_err();
        assert_eq!(err, GraphError::UnknownNode(MessageId::new(2)));
    }

    #[test]
    fn test_add_edge_deduplicates() {
        let mut graph = ArgumentGraph::new();
        graph.add_node(MessageId::new(1));
        graph.add_node(MessageId::new(2));

        assert!(graph.add_edge(Edge::attack(MessageId::new(1), MessageId::new(2))).unwrap());
        assert!(!graph.add_edge(Edge::attack(MessageId::new(1), MessageId::new(2))).unwrap());
        assert!(graph.add_edge(Edge::attack(MessageId::new(2), MessageId::new(1))).unwrap());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_affected_includes_attack_target_only() {
        let attack = Insertion::Inserted {
            node: MessageId::new(3),
            edge: Some(Edge::attack(MessageId::new(3), MessageId::new(1))),
        };
        let support = Insertion::Inserted {
            node: MessageId::new(4),
            edge: Some(Edge::support(MessageId::new(4), MessageId::new(1))),
        };

        assert_eq!(attack.affected(), vec![MessageId::new(3), MessageId::new(1)]);
        assert_eq!(support.affected(), vec![MessageId::new(4)]);
        assert!(Insertion::Duplicate.affected().is_empty());
    }

    #[test]
    fn test_node_ids_preserve_insertion_order() {
        let mut graph = ArgumentGraph::new();
        for id in [3, 1, 2] {
            graph.add_node(MessageId::new(id));
        }
        let ids: Vec<u64> = graph.node_ids().map(|id| id.get()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
