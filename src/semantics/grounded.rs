//! Grounded labelling over the attack relation
//!
//! A node is `IN` iff every attacker is `OUT`, `OUT` iff some attacker is
//! `IN`, and `UNDEC` otherwise. Support edges do not participate.
//!
//! Both the full and the incremental computation run the same worklist
//! propagation over a *region* of the graph. The incremental path limits the
//! region to the forward attack-closure of the changed nodes: a node's label
//! depends only on its attackers, so nodes that cannot reach it through
//! attacks keep their labels.

use super::label::{Label, Labelling};
use crate::graph::{ArgumentGraph, MessageId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Work done by one relabel pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelabelStats {
    /// Nodes recomputed
    pub region: usize,
    /// Nodes whose label differs from before
    pub changed: usize,
}

/// Grounded semantics evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundedSemantics;

impl GroundedSemantics {
    /// Label every node from scratch
    pub fn label(graph: &ArgumentGraph) -> Labelling {
        let mut labelling = Labelling::new();
        let region: Vec<MessageId> = graph.node_ids().collect();
        propagate(graph, &mut labelling, &region);
        labelling
    }

    /// Update `labelling` after the nodes in `seeds` (or their attackers) changed
    ///
    /// Produces the same labelling a full recompute would.
    pub fn relabel(
        graph: &ArgumentGraph,
        labelling: &mut Labelling,
        seeds: impl IntoIterator<Item = MessageId>,
    ) -> RelabelStats {
        let region = forward_closure(graph, seeds);
        let before: Vec<Option<Label>> = region.iter().map(|id| labelling.get(*id)).collect();

        propagate(graph, labelling, &region);

        let changed = region
            .iter()
            .zip(before)
            .filter(|(id, old)| *old != labelling.get(**id))
            .count();

        RelabelStats {
            region: region.len(),
            changed,
        }
    }
}

/// Seeds plus every node reachable from them along attack edges
fn forward_closure(
    graph: &ArgumentGraph,
    seeds: impl IntoIterator<Item = MessageId>,
) -> Vec<MessageId> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<MessageId> = seeds
        .into_iter()
        .filter(|id| graph.contains(*id))
        .collect();

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        order.push(id);
        queue.extend(graph.targets_of(id).iter().copied());
    }
    order
}

/// Relabel `region`, treating labels outside it as fixed
///
/// `region` must be closed under attack targets (a forward closure, or the
/// whole graph). Labels only move from UNDEC to IN/OUT during the pass, so
/// it terminates after at most one visit per edge.
fn propagate(graph: &ArgumentGraph, labelling: &mut Labelling, region: &[MessageId]) {
    let members: HashSet<MessageId> = region.iter().copied().collect();
    for &id in region {
        labelling.set(id, Label::Undec);
    }

    // Attackers not yet known to be OUT
    let mut live: HashMap<MessageId, usize> = HashMap::with_capacity(region.len());
    let mut queue: VecDeque<(MessageId, Label)> = VecDeque::new();

    for &id in region {
        let mut count = 0;
        let mut defeated = false;
        for &attacker in graph.attackers_of(id) {
            if members.contains(&attacker) {
                count += 1;
                continue;
            }
            match labelling.label(attacker) {
                Label::Out => {}
                Label::In => {
                    defeated = true;
                    count += 1;
                }
                Label::Undec => count += 1,
            }
        }
        live.insert(id, count);

        if defeated {
            queue.push_back((id, Label::Out));
        } else if count == 0 {
            queue.push_back((id, Label::In));
        }
    }

    while let Some((id, label)) = queue.pop_front() {
        if labelling.label(id) != Label::Undec {
            continue;
        }
        labelling.set(id, label);

        for &target in graph.targets_of(id) {
            if !members.contains(&target) || labelling.label(target) != Label::Undec {
                continue;
            }
            match label {
                Label::In => queue.push_back((target, Label::Out)),
                Label::Out => {
                    if let Some(remaining) = live.get_mut(&target) {
                        *remaining = remaining.saturating_sub(1);
                        if *remaining == 0 {
                            queue.push_back((target, Label::In));
                        }
                    }
                }
                Label::Undec => {}
            }
        }
    }
}
