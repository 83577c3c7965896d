//! Per-session state: message log, derived graph, current labelling

use super::manager::{SessionError, SessionResult};
use crate::graph::{
    ArgType, ArgumentGraph, Edge, Insertion, Message, MessageId, NewMessage, RelationType,
};
use crate::semantics::{GroundedSemantics, Label, Labelling, RelabelStats, WinnerSet};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Result of checking a submission against the current state
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Admission {
    /// The caller-supplied id is already in the log
    Duplicate(Message),
    /// Accept under this id
    Fresh(MessageId),
}

/// A node of the graph with its current label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelledNode {
    pub id: MessageId,
    #[serde(rename = "username")]
    pub author: String,
    pub content: String,
    pub arg_type: ArgType,
    pub label: Label,
}

/// Point-in-time copy of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub nodes: Vec<LabelledNode>,
    pub edges: Vec<Edge>,
    pub current_winners: WinnerSet,
}

/// Winning messages per author
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Score {
    #[serde(rename = "username")]
    pub author: String,
    pub wins: usize,
    pub messages: usize,
}

/// Everything a session knows
///
/// The log, graph and labelling always describe the same prefix of
/// accepted messages. Mutation goes through [`SessionState::commit`], which
/// inserts and relabels in one step.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    log: Vec<Message>,
    index: HashMap<MessageId, usize>,
    graph: ArgumentGraph,
    labelling: Labelling,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from a stored log in id order
    ///
    /// Rows that no longer form a valid graph are skipped; the second value
    /// is how many were dropped.
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> (Self, usize) {
        let mut state = Self::new();
        let mut skipped = 0;

        for message in messages {
            match state.graph.add_message(&message) {
                Ok(Insertion::Inserted { .. }) => state.push(message),
                Ok(Insertion::Duplicate) => skipped += 1,
                Err(e) => {
                    warn!(message_id = %message.id, error = %e, "skipping stored message");
                    skipped += 1;
                }
            }
        }

        state.labelling = GroundedSemantics::label(&state.graph);
        (state, skipped)
    }

    fn push(&mut self, message: Message) {
        self.index.insert(message.id, self.log.len());
        self.log.push(message);
    }

    /// Decide whether `new` can be accepted, and under which id
    ///
    /// An inferred relation whose target is not in the session is cleared
    /// from `new` instead of failing the submission.
    pub(crate) fn admit(&self, new: &mut NewMessage) -> SessionResult<Admission> {
        let id = match new.id {
            Some(id) => {
                if let Some(existing) = self.get(id) {
                    return Ok(Admission::Duplicate(existing.annotated(self.winners())));
                }
                if let Some(last) = self.last_id().filter(|last| id <= *last) {
                    return Err(SessionError::NonMonotonicId { id, last });
                }
                // Keep room for the id that follows
                if id >= MessageId::MAX {
                    return Err(SessionError::IdOutOfRange { id, max: MessageId::MAX });
                }
                id
            }
            None => match self.last_id() {
                Some(last) => last.next().ok_or(SessionError::IdsExhausted)?,
                None => MessageId::new(1),
            },
        };

        if let Some(target) = new.target_id.filter(|target| !self.graph.contains(*target)) {
            if !new.relation_inferred {
                return Err(SessionError::InvalidTarget { target });
            }
            warn!(target = %target, "inferred target not in session, dropping relation");
            new.relation_type = RelationType::None;
            new.target_id = None;
        }

        Ok(Admission::Fresh(id))
    }

    /// Append an admitted message and bring the labelling up to date
    pub fn commit(&mut self, message: Message) -> SessionResult<RelabelStats> {
        let insertion = self.graph.add_message(&message)?;
        let stats = GroundedSemantics::relabel(&self.graph, &mut self.labelling, insertion.affected());
        if insertion != Insertion::Duplicate {
            self.push(message);
        }
        Ok(stats)
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn last_id(&self) -> Option<MessageId> {
        self.log.last().map(|m| m.id)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.index.get(&id).map(|&i| &self.log[i])
    }

    pub fn graph(&self) -> &ArgumentGraph {
        &self.graph
    }

    pub fn labelling(&self) -> &Labelling {
        &self.labelling
    }

    pub fn winners(&self) -> &WinnerSet {
        self.labelling.winners()
    }

    /// The log, each message annotated with the current winners
    pub fn messages(&self) -> Vec<Message> {
        let winners = self.winners();
        self.log.iter().map(|m| m.annotated(winners)).collect()
    }

    /// The last `window` messages, oldest first
    pub fn recent(&self, window: usize) -> &[Message] {
        &self.log[self.log.len().saturating_sub(window)..]
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let nodes = self
            .log
            .iter()
            .map(|m| LabelledNode {
                id: m.id,
                author: m.author.clone(),
                content: m.content.clone(),
                arg_type: m.arg_type,
                label: self.labelling.label(m.id),
            })
            .collect();

        SessionSnapshot {
            nodes,
            edges: self.graph.edges().copied().collect(),
            current_winners: self.winners().clone(),
        }
    }

    /// Scoreboard, highest wins first
    pub fn scores(&self) -> Vec<Score> {
        let mut tally: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for message in &self.log {
            let entry = tally.entry(message.author.as_str()).or_default();
            entry.1 += 1;
            if self.winners().contains(&message.id) {
                entry.0 += 1;
            }
        }

        let mut scores: Vec<Score> = tally
            .into_iter()
            .map(|(author, (wins, messages))| Score {
                author: author.to_string(),
                wins,
                messages,
            })
            .collect();
        // Stable sort keeps authors alphabetical within a tie
        scores.sort_by(|a, b| b.wins.cmp(&a.wins));
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DebateId, SessionId};

    fn admit_and_commit(state: &mut SessionState, mut new: NewMessage) -> Message {
        let id = match state.admit(&mut new).unwrap() {
            Admission::Fresh(id) => id,
            Admission::Duplicate(m) => panic!("unexpected duplicate {}", m.id),
        };
        let message = new.into_message(id, DebateId::new(1), SessionId::default());
        state.commit(message.clone()).unwrap();
        message
    }

    fn winners(state: &SessionState) -> Vec<u64> {
        state.winners().iter().map(|id| id.get()).collect()
    }

    #[test]
    fn test_ids_are_assigned_sequentially() {
        let mut state = SessionState::new();
        let m1 = admit_and_commit(&mut state, NewMessage::new("alice", "a"));
        let m2 = admit_and_commit(&mut state, NewMessage::new("bob", "b"));

        assert_eq!(m1.id, MessageId::new(1));
        assert_eq!(m2.id, MessageId::new(2));
        assert_eq!(state.last_id(), Some(MessageId::new(2)));
    }

    #[test]
    fn test_reply_chain_winners() {
        let mut state = SessionState::new();
        admit_and_commit(&mut state, NewMessage::new("alice", "nice weather"));
        assert_eq!(winners(&state), vec![1]);

        admit_and_commit(
            &mut state,
            NewMessage::new("bob", "rain forecast").attacking(MessageId::new(1)),
        );
        assert_eq!(winners(&state), vec![2]);

        admit_and_commit(
            &mut state,
            NewMessage::new("alice", "forecast revised").attacking(MessageId::new(2)),
        );
        assert_eq!(winners(&state), vec![1, 3]);
    }

    #[test]
    fn test_duplicate_id_returns_existing() {
        let mut state = SessionState::new();
        admit_and_commit(&mut state, NewMessage::new("alice", "a"));

        let mut again = NewMessage::new("mallory", "changed").with_id(MessageId::new(1));
        match state.admit(&mut again).unwrap() {
            Admission::Duplicate(existing) => {
                assert_eq!(existing.author, "alice");
                assert!(existing.current_winners.is_some());
            }
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[test]
    fn test_caller_ids_must_increase() {
        let mut state = SessionState::new();
        admit_and_commit(&mut state, NewMessage::new("alice", "a").with_id(MessageId::new(5)));

        let err = state
            .admit(&mut NewMessage::new("bob", "b").with_id(MessageId::new(3)))
            .unwrap_err();
        assert!(matches!(err, SessionError::NonMonotonicId { .. }));

        // Auto-assigned ids continue after the largest
        let next = admit_and_commit(&mut state, NewMessage::new("bob", "b"));
        assert_eq!(next.id, MessageId::new(6));
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let state = SessionState::new();
        let err = state
            .admit(&mut NewMessage::new("bob", "b").attacking(MessageId::new(1)))
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTarget { target } if target == MessageId::new(1)));
    }

    #[test]
    fn test_caller_ids_leave_room_for_a_successor() {
        let mut state = SessionState::new();
        for id in [u64::MAX, MessageId::MAX.get()] {
            let err = state
                .admit(&mut NewMessage::new("alice", "a").with_id(MessageId::new(id)))
                .unwrap_err();
            assert!(matches!(err, SessionError::IdOutOfRange { .. }));
        }
        assert!(state.is_empty());

        // The largest accepted caller id still has a storable successor
        let last = MessageId::new(MessageId::MAX.get() - 1);
        admit_and_commit(&mut state, NewMessage::new("alice", "a").with_id(last));
        let next = admit_and_commit(&mut state, NewMessage::new("bob", "b"));
        assert_eq!(next.id, MessageId::MAX);

        let err = state.admit(&mut NewMessage::new("carol", "c")).unwrap_err();
        assert!(matches!(err, SessionError::IdsExhausted));
    }

    #[test]
    fn test_inferred_unknown_target_is_dropped() {
        let mut state = SessionState::new();
        let message = admit_and_commit(
            &mut state,
            NewMessage::new("bob", "b").attacking(MessageId::new(7)).inferred(),
        );

        assert_eq!(message.relation_type, RelationType::None);
        assert_eq!(message.target_id, None);
        assert_eq!(winners(&state), vec![1]);
    }

    #[test]
    fn test_from_messages_skips_broken_rows() {
        let session = SessionId::default();
        let debate = DebateId::new(1);
        let rows = vec![
            Message::new(MessageId::new(1), debate, session.clone(), "a", "x"),
            Message::new(MessageId::new(2), debate, session.clone(), "b", "y")
                .relating(RelationType::Attack, MessageId::new(1)),
            Message::new(MessageId::new(3), debate, session.clone(), "c", "z")
                .relating(RelationType::Attack, MessageId::new(40)),
        ];

        let (state, skipped) = SessionState::from_messages(rows);
        assert_eq!(skipped, 1);
        assert_eq!(state.len(), 2);
        assert_eq!(winners(&state), vec![2]);
    }

    #[test]
    fn test_messages_are_annotated_with_winners() {
        let mut state = SessionState::new();
        admit_and_commit(&mut state, NewMessage::new("alice", "a"));
        admit_and_commit(&mut state, NewMessage::new("bob", "b").supporting(MessageId::new(1)));

        for message in state.messages() {
            let winners: Vec<u64> = message
                .current_winners
                .unwrap()
                .iter()
                .map(|id| id.get())
                .collect();
            assert_eq!(winners, vec![1, 2]);
        }
    }

    #[test]
    fn test_snapshot_lists_labels_and_support_edges() {
        let mut state = SessionState::new();
        admit_and_commit(&mut state, NewMessage::new("alice", "a"));
        admit_and_commit(&mut state, NewMessage::new("bob", "b").attacking(MessageId::new(1)));
        admit_and_commit(&mut state, NewMessage::new("carol", "c").supporting(MessageId::new(1)));

        let snapshot = state.snapshot();
        let labels: Vec<Label> = snapshot.nodes.iter().map(|n| n.label).collect();
        assert_eq!(labels, vec![Label::Out, Label::In, Label::In]);
        assert_eq!(snapshot.edges.len(), 2);
        assert_eq!(snapshot.edges[1], Edge::support(MessageId::new(3), MessageId::new(1)));
    }

    #[test]
    fn test_scores_count_winning_messages() {
        let mut state = SessionState::new();
        admit_and_commit(&mut state, NewMessage::new("alice", "a"));
        admit_and_commit(&mut state, NewMessage::new("bob", "b").attacking(MessageId::new(1)));
        admit_and_commit(&mut state, NewMessage::new("alice", "c").attacking(MessageId::new(2)));

        let scores = state.scores();
        assert_eq!(scores[0].author, "alice");
        assert_eq!(scores[0].wins, 2);
        assert_eq!(scores[1], Score { author: "bob".into(), wins: 0, messages: 1 });
    }

    #[test]
    fn test_recent_window() {
        let mut state = SessionState::new();
        for i in 0..5 {
            admit_and_commit(&mut state, NewMessage::new("alice", format!("m{}", i)));
        }
        let recent: Vec<u64> = state.recent(2).iter().map(|m| m.id.get()).collect();
        assert_eq!(recent, vec![4, 5]);
        assert_eq!(state.recent(50).len(), 5);
    }
}
