//! Broadcast gateway: per-debate fan-out of accepted messages
//!
//! Each debate with at least one subscriber owns a `tokio::sync::broadcast`
//! channel. Publishing never waits on subscribers; a subscriber that falls
//! more than `capacity` events behind skips the backlog.

use crate::graph::{DebateId, Message, SessionId};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// An accepted message, annotated with its session's winners at acceptance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DebateEvent {
    pub message: Message,
}

impl DebateEvent {
    pub fn new(message: Message) -> Self {
        Self { message }
    }

    pub fn debate_id(&self) -> DebateId {
        self.message.debate_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.message.session_id
    }
}

type Registry = DashMap<DebateId, broadcast::Sender<DebateEvent>>;

/// Subscriber registry keyed by debate
#[derive(Debug, Clone)]
pub struct BroadcastGateway {
    channels: Arc<Registry>,
    capacity: usize,
}

impl Default for BroadcastGateway {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl BroadcastGateway {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber for every session of `debate_id`
    pub fn subscribe(&self, debate_id: DebateId) -> Subscription {
        let receiver = self
            .channels
            .entry(debate_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(%debate_id, "subscriber registered");

        Subscription {
            debate_id,
            session: None,
            receiver,
            registry: Arc::clone(&self.channels),
        }
    }

    /// Deliver `event` to the current subscribers of `debate_id`
    ///
    /// Returns how many subscribers will see it. No subscribers is fine.
    pub fn publish(&self, debate_id: DebateId, event: DebateEvent) -> usize {
        match self.channels.get(&debate_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, debate_id: DebateId) -> usize {
        self.channels
            .get(&debate_id)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Debates that currently have a channel
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// A live subscription; dropping it unregisters the subscriber
#[derive(Debug)]
pub struct Subscription {
    debate_id: DebateId,
    session: Option<SessionId>,
    receiver: broadcast::Receiver<DebateEvent>,
    registry: Arc<Registry>,
}

impl Subscription {
    /// Only yield events from one session
    pub fn for_session(mut self, session_id: SessionId) -> Self {
        self.session = Some(session_id);
        self
    }

    pub fn debate_id(&self) -> DebateId {
        self.debate_id
    }

    /// Next event, or `None` once the channel is gone
    ///
    /// Lag is logged and skipped. Safe to use inside `tokio::select!`.
    pub async fn recv(&mut self) -> Option<DebateEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self
                        .session
                        .as_ref()
                        .is_some_and(|session| session != event.session_id())
                    {
                        continue;
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(debate_id = %self.debate_id, skipped, "subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // This receiver is still alive here, so the last one sees a count of 1
        self.registry
            .remove_if(&self.debate_id, |_, sender| sender.receiver_count() <= 1);
        debug!(debate_id = %self.debate_id, "subscriber dropped");
    }
}
