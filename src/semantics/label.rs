//! Labels, labellings and winner sets

use crate::graph::MessageId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Acceptance status of an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    In,
    Out,
    #[default]
    Undec,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Undec => "UNDEC",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ids of the messages currently labelled `IN`, in ascending order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinnerSet(BTreeSet<MessageId>);

impl WinnerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageId> {
        self.0.iter()
    }

    fn insert(&mut self, id: MessageId) {
        self.0.insert(id);
    }

    fn remove(&mut self, id: &MessageId) {
        self.0.remove(id);
    }
}

impl FromIterator<MessageId> for WinnerSet {
    fn from_iter<I: IntoIterator<Item = MessageId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a WinnerSet {
    type Item = &'a MessageId;
    type IntoIter = std::collections::btree_set::Iter<'a, MessageId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A label per node, with the winner set kept in step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labelling {
    labels: HashMap<MessageId, Label>,
    winners: WinnerSet,
}

impl Labelling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label of a node, if it has been evaluated
    pub fn get(&self, id: MessageId) -> Option<Label> {
        self.labels.get(&id).copied()
    }

    /// Label of a node, treating unevaluated nodes as undecided
    pub fn label(&self, id: MessageId) -> Label {
        self.get(id).unwrap_or_default()
    }

    pub fn set(&mut self, id: MessageId, label: Label) {
        match label {
            Label::In => self.winners.insert(id),
            Label::Out | Label::Undec => self.winners.remove(&id),
        }
        self.labels.insert(id, label);
    }

    pub fn winners(&self) -> &WinnerSet {
        &self.winners
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MessageId, Label)> + '_ {
        self.labels.iter().map(|(id, label)| (*id, *label))
    }

    /// Number of nodes carrying each label: (in, out, undec)
    pub fn counts(&self) -> (usize, usize, usize) {
        self.labels
            .values()
            .fold((0, 0, 0), |(i, o, u), label| match label {
                Label::In => (i + 1, o, u),
                Label::Out => (i, o + 1, u),
                Label::Undec => (i, o, u + 1),
            })
    }
}
