//! In-memory storage backend

use super::traits::{MessageStore, StorageError, StorageResult};
use crate::graph::{Debate, DebateId, Message, MessageId};
use crate::session::SessionKey;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Inner {
    debates: Vec<Debate>,
    sessions: HashMap<SessionKey, BTreeMap<MessageId, Message>>,
}

/// Process-local message store
///
/// Nothing survives a restart. Writes can be switched off with
/// [`MemoryStore::set_unavailable`] to exercise failure paths.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with [`StorageError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl MessageStore for MemoryStore {
    fn list_debates(&self) -> StorageResult<Vec<Debate>> {
        Ok(self.inner().debates.iter().rev().cloned().collect())
    }

    fn get_debate(&self, id: DebateId) -> StorageResult<Option<Debate>> {
        Ok(self.inner().debates.iter().find(|d| d.id == id).cloned())
    }

    fn create_debate(&self, topic: &str) -> StorageResult<Debate> {
        self.check_writable()?;
        let mut inner = self.inner();
        let next = inner.debates.last().map_or(1, |d| d.id.get() + 1);
        let debate = Debate {
            id: DebateId::new(next),
            topic: topic.to_string(),
        };
        inner.debates.push(debate.clone());
        Ok(debate)
    }

    fn append_message(&self, message: &Message) -> StorageResult<()> {
        self.check_writable()?;
        let key = SessionKey::new(message.debate_id, message.session_id.clone());
        let mut inner = self.inner();
        let log = inner.sessions.entry(key).or_default();
        if log.contains_key(&message.id) {
            return Err(StorageError::InvalidRow(format!(
                "message {} already stored",
                message.id
            )));
        }
        let mut stored = message.clone();
        stored.current_winners = None;
        log.insert(message.id, stored);
        Ok(())
    }

    fn load_session(&self, key: &SessionKey) -> StorageResult<Vec<Message>> {
        Ok(self
            .inner()
            .sessions
            .get(key)
            .map(|log| log.values().cloned().collect())
            .unwrap_or_default())
    }

    fn find_message(&self, debate_id: DebateId, id: MessageId) -> StorageResult<Option<Message>> {
        Ok(self
            .inner()
            .sessions
            .iter()
            .filter(|(key, _)| key.debate_id == debate_id)
            .filter_map(|(_, log)| log.get(&id))
            .max_by_key(|m| m.created_at)
            .cloned())
    }

    fn clear_session(&self, key: &SessionKey) -> StorageResult<usize> {
        self.check_writable()?;
        Ok(self.inner().sessions.remove(key).map_or(0, |log| log.len()))
    }
}
