//! SessionManager: routes work to per-session actors

use super::key::SessionKey;
use super::state::{Admission, Score, SessionSnapshot, SessionState};
use crate::broadcast::{BroadcastGateway, DebateEvent};
use crate::graph::{GraphError, Message, MessageId, NewMessage};
use crate::semantics::{RelabelStats, WinnerSet};
use crate::storage::{MessageStore, StorageError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Errors raised by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("target message {target} does not exist in this session")]
    InvalidTarget { target: MessageId },

    #[error("message id {id} must be greater than the last id {last}")]
    NonMonotonicId { id: MessageId, last: MessageId },

    #[error("message id {id} is out of range (must be below {max})")]
    IdOutOfRange { id: MessageId, max: MessageId },

    #[error("session has used every available message id")]
    IdsExhausted,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to reset session: {0}")]
    ResetFailure(#[source] StorageError),

    #[error("session {0} is closed")]
    Closed(SessionKey),
}

impl From<GraphError> for SessionError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::InvalidTarget { target } | GraphError::UnknownNode(target) => {
                Self::InvalidTarget { target }
            }
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Outcome of a submission
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    /// The stored message annotated with the winners after it was applied
    pub message: Message,
    /// True when the id was already present and nothing changed
    pub duplicate: bool,
    pub stats: RelabelStats,
    /// Subscribers the event was delivered to
    pub delivered: usize,
}

enum Command {
    Submit {
        message: NewMessage,
        reply: oneshot::Sender<SessionResult<Accepted>>,
    },
    Reset {
        reply: oneshot::Sender<SessionResult<usize>>,
    },
}

/// Cheap, cloneable reference to a running session
///
/// Writes are queued to the session's actor. Reads copy out of the shared
/// state under a short read lock.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    key: SessionKey,
    state: Arc<RwLock<SessionState>>,
    commands: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submit { message, .. } => f.debug_struct("Submit").field("message", message).finish(),
            Self::Reset { .. } => f.write_str("Reset"),
        }
    }
}

impl SessionHandle {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Validate, persist, insert, relabel and publish one message
    pub async fn submit(&self, message: NewMessage) -> SessionResult<Accepted> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Submit { message, reply }).await?;
        response.await.map_err(|_| self.closed())?
    }

    /// Clear every message, edge and label of this session
    ///
    /// Returns the number of stored messages removed.
    pub async fn reset(&self) -> SessionResult<usize> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Reset { reply }).await?;
        response.await.map_err(|_| self.closed())?
    }

    /// True once the session's actor has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> SessionResult<()> {
        self.commands.send(command).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> SessionError {
        SessionError::Closed(self.key.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Messages in order, annotated with the current winners
    pub fn messages(&self) -> Vec<Message> {
        self.read().messages()
    }

    pub fn message(&self, id: MessageId) -> Option<Message> {
        let state = self.read();
        state.get(id).map(|m| m.annotated(state.winners()))
    }

    /// The last `window` messages, oldest first
    pub fn recent(&self, window: usize) -> Vec<Message> {
        self.read().recent(window).to_vec()
    }

    pub fn winners(&self) -> WinnerSet {
        self.read().winners().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read().snapshot()
    }

    pub fn scores(&self) -> Vec<Score> {
        self.read().scores()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Owns the write path of one session
struct SessionActor {
    key: SessionKey,
    state: Arc<RwLock<SessionState>>,
    store: Arc<dyn MessageStore>,
    gateway: BroadcastGateway,
}

impl SessionActor {
    async fn run(self, mut commands: mpsc::Receiver<Command>) {
        debug!(session = %self.key, "session actor started");
        while let Some(command) = commands.recv().await {
            match command {
                Command::Submit { message, reply } => {
                    let _ = reply.send(self.submit(message));
                }
                Command::Reset { reply } => {
                    let _ = reply.send(self.reset());
                }
            }
        }
        debug!(session = %self.key, "session actor stopped");
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, mut new: NewMessage) -> SessionResult<Accepted> {
        let admission = self.read().admit(&mut new);
        let id = match admission {
            Ok(Admission::Fresh(id)) => id,
            Ok(Admission::Duplicate(existing)) => {
                debug!(session = %self.key, message_id = %existing.id, "duplicate message ignored");
                return Ok(Accepted {
                    message: existing,
                    duplicate: true,
                    stats: RelabelStats::default(),
                    delivered: 0,
                });
            }
            Err(e) => {
                warn!(session = %self.key, error = %e, "message rejected");
                return Err(e);
            }
        };

        let message = new.into_message(id, self.key.debate_id, self.key.session_id.clone());
        if let Err(e) = self.store.append_message(&message) {
            error!(session = %self.key, message_id = %id, error = %e, "failed to persist message");
            return Err(e.into());
        }

        // Insert and relabel under one write lock so readers never see a
        // node without its label.
        let (annotated, stats) = {
            let mut state = self.write();
            let stats = state.commit(message.clone())?;
            (message.annotated(state.winners()), stats)
        };

        let delivered = self
            .gateway
            .publish(self.key.debate_id, DebateEvent::new(annotated.clone()));

        info!(
            session = %self.key,
            message_id = %id,
            relation = annotated.relation_type.as_str(),
            region = stats.region,
            changed = stats.changed,
            delivered,
            "message accepted"
        );

        Ok(Accepted {
            message: annotated,
            duplicate: false,
            stats,
            delivered,
        })
    }

    fn reset(&self) -> SessionResult<usize> {
        let removed = self.store.clear_session(&self.key).map_err(|e| {
            error!(session = %self.key, error = %e, "failed to reset session");
            SessionError::ResetFailure(e)
        })?;
        *self.write() = SessionState::new();
        info!(session = %self.key, removed, "session reset");
        Ok(removed)
    }
}

/// Registry of live sessions
///
/// Sessions are created lazily on first access and hydrated from the
/// store. Each one runs its own actor; nothing is shared between them.
pub struct SessionManager {
    sessions: DashMap<SessionKey, SessionHandle>,
    store: Arc<dyn MessageStore>,
    gateway: BroadcastGateway,
    queue: usize,
}

impl SessionManager {
    pub const DEFAULT_QUEUE: usize = 64;

    pub fn new(store: Arc<dyn MessageStore>, gateway: BroadcastGateway) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
            gateway,
            queue: Self::DEFAULT_QUEUE,
        }
    }

    /// Bound on queued writes per session
    pub fn with_queue(mut self, queue: usize) -> Self {
        self.queue = queue.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn gateway(&self) -> &BroadcastGateway {
        &self.gateway
    }

    /// Handle to the session at `key`, starting it if needed
    ///
    /// Never fails: a session that cannot be loaded starts empty. A session
    /// whose actor has stopped is reloaded from the store and restarted.
    pub async fn resolve(&self, key: &SessionKey) -> SessionHandle {
        if let Some(handle) = self.sessions.get(key).filter(|h| !h.is_closed()) {
            return handle.value().clone();
        }

        // Loading under the entry lock keeps a concurrent reset from
        // clearing the store between the load and the insert.
        match self.sessions.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_closed() {
                    warn!(session = %key, "session actor stopped, restarting");
                    let state = self.hydrate(key);
                    entry.insert(self.spawn(key.clone(), state));
                }
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let state = self.hydrate(key);
                entry.insert(self.spawn(key.clone(), state)).value().clone()
            }
        }
    }

    /// Run `read` against the current state of a session without starting it
    ///
    /// Live sessions are read in place; others are loaded from the store
    /// into a throwaway copy, so reads never grow the registry.
    pub fn read<R>(&self, key: &SessionKey, f: impl FnOnce(&SessionState) -> R) -> R {
        let live = self
            .sessions
            .get(key)
            .filter(|h| !h.is_closed())
            .map(|h| Arc::clone(&h.state));
        match live {
            Some(state) => {
                let guard = state.read().unwrap_or_else(PoisonError::into_inner);
                f(&guard)
            }
            None => f(&self.hydrate(key)),
        }
    }

    /// Clear a session's messages, edges and labels
    ///
    /// A session that is not running is cleared in the store directly.
    pub async fn reset(&self, key: &SessionKey) -> SessionResult<usize> {
        let live = match self.sessions.entry(key.clone()) {
            Entry::Occupied(entry) if !entry.get().is_closed() => entry.get().clone(),
            Entry::Occupied(entry) => {
                entry.remove();
                return self.clear_stored(key);
            }
            Entry::Vacant(_) => return self.clear_stored(key),
        };
        live.reset().await
    }

    fn clear_stored(&self, key: &SessionKey) -> SessionResult<usize> {
        let removed = self.store.clear_session(key).map_err(|e| {
            error!(session = %key, error = %e, "failed to reset session");
            SessionError::ResetFailure(e)
        })?;
        info!(session = %key, removed, "stored session reset");
        Ok(removed)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_loaded(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    fn hydrate(&self, key: &SessionKey) -> SessionState {
        match self.store.load_session(key) {
            Ok(messages) => {
                let (state, skipped) = SessionState::from_messages(messages);
                if skipped > 0 {
                    warn!(session = %key, skipped, "stored messages skipped during load");
                }
                if !state.is_empty() {
                    info!(session = %key, messages = state.len(), "session loaded");
                }
                state
            }
            Err(e) => {
                warn!(session = %key, error = %e, "failed to load session, starting empty");
                SessionState::new()
            }
        }
    }

    fn spawn(&self, key: SessionKey, state: SessionState) -> SessionHandle {
        let (commands, receiver) = mpsc::channel(self.queue);
        let state = Arc::new(RwLock::new(state));
        let actor = SessionActor {
            key: key.clone(),
            state: Arc::clone(&state),
            store: Arc::clone(&self.store),
            gateway: self.gateway.clone(),
        };
        tokio::spawn(actor.run(receiver));

        SessionHandle {
            key,
            state,
            commands,
        }
    }
}
