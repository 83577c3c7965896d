//! Shared helpers for dialectic integration tests

#![allow(dead_code)]

use dialectic::{
    BroadcastGateway, DebateEvent, DebateId, MemoryStore, MessageStore, SessionHandle, SessionId,
    SessionKey, SessionManager, Subscription,
};
use std::sync::Arc;
use std::time::Duration;

/// A manager over a fresh in-memory store with one debate (id 1)
pub fn memory_manager() -> (Arc<SessionManager>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.create_debate("Should cities ban cars downtown?").unwrap();
    let manager = Arc::new(SessionManager::new(store.clone(), BroadcastGateway::default()));
    (manager, store)
}

pub fn key(debate: i64, session: &str) -> SessionKey {
    SessionKey::new(DebateId::new(debate), SessionId::new(session))
}

pub fn winners(handle: &SessionHandle) -> Vec<u64> {
    handle.winners().iter().map(|id| id.get()).collect()
}

/// Next event, failing the test if none arrives within a second
pub async fn next_event(subscription: &mut Subscription) -> DebateEvent {
    tokio::time::timeout(Duration::from_secs(1), subscription.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

/// True if no event arrives within a short grace period
pub async fn no_event(subscription: &mut Subscription) -> bool {
    tokio::time::timeout(Duration::from_millis(50), subscription.recv())
        .await
        .is_err()
}
