//! Transport-independent API layer.
//!
//! `DebateApi` is the single entry point for all consumer-facing operations.
//! Transports (HTTP, WebSocket, MCP, the CLI) call `DebateApi` methods; they
//! never reach into the session manager, the store or the coach directly.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::broadcast::{BroadcastGateway, Subscription};
use crate::coach::{self, Coach, HistoryEntry};
use crate::config::Config;
use crate::graph::{
    ArgType, Debate, DebateId, Message, MessageId, NewMessage, RelationType, SessionId,
};
use crate::session::{
    Accepted, Score, SessionError, SessionHandle, SessionKey, SessionManager, SessionSnapshot,
    SessionState,
};
use crate::storage::{OpenStore, SqliteStore, StorageError};

/// Errors surfaced to transports
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("debate {0} not found")]
    DebateNotFound(DebateId),

    #[error("message {id} not found in debate {debate_id}")]
    MessageNotFound { debate_id: DebateId, id: MessageId },

    #[error("message content must not be empty")]
    EmptyContent,

    #[error("debate topic must not be empty")]
    EmptyTopic,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A message as posted by a client
///
/// When `arg_type`, `relation_type` and `target_id` are all absent the coach
/// is asked to classify the message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Submission {
    pub content: String,
    #[serde(rename = "username", alias = "author")]
    pub author: String,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub id: Option<MessageId>,
    #[serde(default)]
    pub arg_type: Option<ArgType>,
    #[serde(default)]
    pub relation_type: Option<RelationType>,
    #[serde(default)]
    pub target_id: Option<MessageId>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl Submission {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author: author.into(),
            session_id: None,
            id: None,
            arg_type: None,
            relation_type: None,
            target_id: None,
            feedback: None,
        }
    }

    pub fn in_session(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_arg_type(mut self, arg_type: ArgType) -> Self {
        self.arg_type = Some(arg_type);
        self
    }

    pub fn attacking(self, target: MessageId) -> Self {
        self.relating(RelationType::Attack, target)
    }

    pub fn supporting(self, target: MessageId) -> Self {
        self.relating(RelationType::Support, target)
    }

    pub fn relating(mut self, relation_type: RelationType, target: MessageId) -> Self {
        self.relation_type = Some(relation_type);
        self.target_id = Some(target);
        self
    }

    /// Session this submission goes to
    pub fn session(&self) -> SessionId {
        self.session_id
            .clone()
            .filter(|s| !s.is_blank())
            .unwrap_or_default()
    }

    /// No structure given: the coach should classify it
    pub fn is_unstructured(&self) -> bool {
        self.arg_type.is_none() && self.relation_type.is_none() && self.target_id.is_none()
    }

    fn into_new_message(self) -> NewMessage {
        NewMessage {
            id: self.id,
            relation_inferred: false,
            content: self.content,
            author: self.author,
            arg_type: self.arg_type.unwrap_or_default(),
            relation_type: self.relation_type.unwrap_or_default(),
            target_id: self.target_id,
            feedback: self.feedback,
        }
    }
}

/// Tunables for coach-assisted operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiOptions {
    pub coach_timeout: Duration,
    /// Messages shown to the coach when mining
    pub history_window: usize,
    /// Messages shown to the coach when suggesting
    pub suggestion_context: usize,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ApiOptions {
    fn from(config: &Config) -> Self {
        Self {
            coach_timeout: config.coach.timeout(),
            history_window: config.history_window,
            suggestion_context: config.suggestion_context,
        }
    }
}

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct DebateApi {
    sessions: Arc<SessionManager>,
    coach: Arc<dyn Coach>,
    options: ApiOptions,
}

impl DebateApi {
    pub fn new(sessions: Arc<SessionManager>, coach: Arc<dyn Coach>) -> Self {
        Self {
            sessions,
            coach,
            options: ApiOptions::default(),
        }
    }

    /// Open the configured database and wire up sessions, gateway and coach
    ///
    /// Seeds the catalogue from `config.debates` when it is empty.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        let store = SqliteStore::open(&config.database)?;
        let gateway = BroadcastGateway::new(config.broadcast_capacity);
        let sessions = SessionManager::new(Arc::new(store), gateway).with_queue(config.session_queue);
        let api = Self::new(Arc::new(sessions), coach::from_config(&config.coach))
            .with_options(ApiOptions::from(config));

        let seeded = api.seed_debates(&config.debates)?;
        if seeded > 0 {
            info!(seeded, "debate catalogue seeded");
        }
        Ok(api)
    }

    pub fn with_options(mut self, options: ApiOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    // --- Debate catalogue ---

    /// All debates, newest first
    pub fn list_debates(&self) -> ApiResult<Vec<Debate>> {
        Ok(self.sessions.store().list_debates()?)
    }

    pub fn create_debate(&self, topic: &str) -> ApiResult<Debate> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ApiError::EmptyTopic);
        }
        let debate = self.sessions.store().create_debate(topic)?;
        info!(debate_id = %debate.id, topic = %debate.topic, "debate created");
        Ok(debate)
    }

    pub fn get_debate(&self, id: DebateId) -> ApiResult<Debate> {
        self.sessions
            .store()
            .get_debate(id)?
            .ok_or(ApiError::DebateNotFound(id))
    }

    /// Create `topics` if the catalogue is empty; returns how many were added
    pub fn seed_debates(&self, topics: &[String]) -> ApiResult<usize> {
        if topics.is_empty() || !self.list_debates()?.is_empty() {
            return Ok(0);
        }
        for topic in topics {
            self.create_debate(topic)?;
        }
        Ok(topics.len())
    }

    // --- Session reads ---
    //
    // Reads never start a session: idle ones are loaded from the store for
    // the duration of the call.

    /// Messages of a session in order, each carrying the current winners
    pub async fn fetch_messages(&self, debate_id: DebateId, session_id: &SessionId) -> Vec<Message> {
        self.read(debate_id, session_id, |state| state.messages())
    }

    /// Nodes with labels, and every attack and support edge
    pub async fn session_graph(&self, debate_id: DebateId, session_id: &SessionId) -> SessionSnapshot {
        self.read(debate_id, session_id, |state| state.snapshot())
    }

    /// Winning messages per author
    pub async fn scores(&self, debate_id: DebateId, session_id: &SessionId) -> Vec<Score> {
        self.read(debate_id, session_id, |state| state.scores())
    }

    // --- Writes ---

    /// Append a message to its session and publish it to the debate
    pub async fn submit_message(
        &self,
        debate_id: DebateId,
        submission: Submission,
    ) -> ApiResult<Accepted> {
        if submission.content.trim().is_empty() {
            return Err(ApiError::EmptyContent);
        }
        self.get_debate(debate_id)?;

        let session = self.session(debate_id, &submission.session()).await;
        let message = if submission.is_unstructured() && self.coach.is_enabled() {
            self.mine(&session, submission).await
        } else {
            submission.into_new_message()
        };

        Ok(session.submit(message).await?)
    }

    /// Clear every message, edge and label of a session
    pub async fn reset_session(&self, debate_id: DebateId, session_id: &SessionId) -> ApiResult<usize> {
        let key = SessionKey::new(debate_id, session_id.clone());
        Ok(self.sessions.reset(&key).await?)
    }

    // --- Streams ---

    /// Events for every session of a debate, or only `session_id` if given
    pub fn subscribe(&self, debate_id: DebateId, session_id: Option<SessionId>) -> Subscription {
        let subscription = self.sessions.gateway().subscribe(debate_id);
        match session_id {
            Some(session_id) => subscription.for_session(session_id),
            None => subscription,
        }
    }

    // --- Coach ---

    /// Rebuttal ideas for one message; never fails on coach errors
    ///
    /// Without `session_id` the message is looked up across the debate's
    /// sessions. Context comes from the session the message belongs to.
    pub async fn suggestions(
        &self,
        debate_id: DebateId,
        session_id: Option<&SessionId>,
        target: MessageId,
    ) -> ApiResult<Vec<String>> {
        let not_found = || ApiError::MessageNotFound { debate_id, id: target };
        let session_id = match session_id {
            Some(session_id) => session_id.clone(),
            None => {
                self.sessions
                    .store()
                    .find_message(debate_id, target)?
                    .ok_or_else(not_found)?
                    .session_id
            }
        };

        let window = self.options.suggestion_context;
        let (target_message, context) = self.read(debate_id, &session_id, |state| {
            let target_message = state.get(target).map(|m| m.content.clone());
            // Newest first
            let context: Vec<String> = state.recent(window).iter().rev().map(|m| m.content.clone()).collect();
            (target_message, context)
        });
        let target_message = target_message.ok_or_else(not_found)?;

        Ok(coach::suggest_or_fallback(
            self.coach.as_ref(),
            self.options.coach_timeout,
            &target_message,
            &context,
        )
        .await)
    }

    // --- Internal ---

    fn read<R>(&self, debate_id: DebateId, session_id: &SessionId, f: impl FnOnce(&SessionState) -> R) -> R {
        self.sessions.read(&SessionKey::new(debate_id, session_id.clone()), f)
    }

    async fn session(&self, debate_id: DebateId, session_id: &SessionId) -> SessionHandle {
        self.sessions
            .resolve(&SessionKey::new(debate_id, session_id.clone()))
            .await
    }

    /// Let the coach fill in structure
    ///
    /// The proposed relation is marked inferred, so the session drops it
    /// rather than rejecting the message if the target is gone by the time
    /// the message is applied.
    async fn mine(&self, session: &SessionHandle, submission: Submission) -> NewMessage {
        let history: Vec<HistoryEntry> = session
            .recent(self.options.history_window)
            .iter()
            .map(HistoryEntry::from)
            .collect();
        let analysis = coach::analyze_or_default(
            self.coach.as_ref(),
            self.options.coach_timeout,
            &submission.content,
            &history,
        )
        .await;

        let (relation_type, target_id) = match analysis.target_id {
            Some(target) => (analysis.relation_type, Some(target)),
            None => (RelationType::None, None),
        };

        let mut message = submission.into_new_message();
        message.arg_type = analysis.arg_type;
        message.relation_type = relation_type;
        message.target_id = target_id;
        message.relation_inferred = true;
        if message.feedback.is_none() {
            message.feedback = analysis.feedback;
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::{ArgumentAnalysis, DisabledCoach, MockCoach, FALLBACK_SUGGESTION};
    use crate::storage::{MemoryStore, MessageStore};

    fn setup(coach: impl Coach + 'static) -> (DebateApi, DebateId) {
        let store = Arc::new(MemoryStore::new());
        let debate = store.create_debate("Should cities ban cars?").unwrap();
        let sessions = Arc::new(SessionManager::new(store, BroadcastGateway::default()));
        (DebateApi::new(sessions, Arc::new(coach)), debate.id)
    }

    fn winners(accepted: &Accepted) -> Vec<u64> {
        accepted
            .message
            .current_winners
            .as_ref()
            .unwrap()
            .iter()
            .map(|id| id.get())
            .collect()
    }

    #[tokio::test]
    async fn submit_to_unknown_debate_is_rejected() {
        let (api, _) = setup(DisabledCoach);
        let err = api
            .submit_message(DebateId::new(99), Submission::new("alice", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DebateNotFound(_)));
    }

    #[tokio::test]
    async fn blank_content_is_rejected() {
        let (api, debate) = setup(DisabledCoach);
        let err = api
            .submit_message(debate, Submission::new("alice", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmptyContent));
    }

    #[tokio::test]
    async fn explicit_relations_skip_the_coach() {
        let coach = Arc::new(MockCoach::new());
        let store = Arc::new(MemoryStore::new());
        let debate = store.create_debate("t").unwrap().id;
        let sessions = Arc::new(SessionManager::new(store, BroadcastGateway::default()));
        let api = DebateApi::new(sessions, coach.clone());

        api.submit_message(debate, Submission::new("alice", "a").with_arg_type(ArgType::Claim))
            .await
            .unwrap();
        let accepted = api
            .submit_message(debate, Submission::new("bob", "b").attacking(MessageId::new(1)))
            .await
            .unwrap();

        assert_eq!(winners(&accepted), vec![2]);
        assert_eq!(coach.calls(), 0);
    }

    #[tokio::test]
    async fn explicit_unknown_target_is_invalid() {
        let (api, debate) = setup(DisabledCoach);
        let err = api
            .submit_message(debate, Submission::new("bob", "b").attacking(MessageId::new(7)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Session(SessionError::InvalidTarget { .. })
        ));
        assert!(api.fetch_messages(debate, &SessionId::default()).await.is_empty());
    }

    #[tokio::test]
    async fn coach_classifies_unstructured_messages() {
        let coach = MockCoach::new().with_analysis(ArgumentAnalysis {
            arg_type: ArgType::Premise,
            relation_type: RelationType::Attack,
            target_id: Some(MessageId::new(1)),
            feedback: Some("Cite a source.".into()),
        });
        let (api, debate) = setup(coach);

        // First message: the mined target does not exist yet and is dropped
        let first = api
            .submit_message(debate, Submission::new("alice", "nice weather"))
            .await
            .unwrap();
        assert_eq!(first.message.relation_type, RelationType::None);
        assert_eq!(first.message.target_id, None);

        let second = api
            .submit_message(debate, Submission::new("bob", "rain is forecast"))
            .await
            .unwrap();
        assert_eq!(second.message.arg_type, ArgType::Premise);
        assert_eq!(second.message.relation_type, RelationType::Attack);
        assert_eq!(second.message.feedback.as_deref(), Some("Cite a source."));
        assert_eq!(winners(&second), vec![2]);
    }

    #[tokio::test]
    async fn failing_coach_falls_back_to_claim() {
        // Unconfigured mock reports Unavailable
        let (api, debate) = setup(MockCoach::new());
        let accepted = api
            .submit_message(debate, Submission::new("alice", "hello"))
            .await
            .unwrap();
        assert_eq!(accepted.message.arg_type, ArgType::Claim);
        assert_eq!(accepted.message.relation_type, RelationType::None);
    }

    #[tokio::test]
    async fn suggestions_for_missing_message() {
        let (api, debate) = setup(DisabledCoach);
        let err = api
            .suggestions(debate, None, MessageId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MessageNotFound { .. }));
    }

    #[tokio::test]
    async fn suggestions_use_coach_or_fallback() {
        let (api, debate) = setup(MockCoach::new().with_suggestions(["Attack the source."]));
        api.submit_message(debate, Submission::new("alice", "x").with_arg_type(ArgType::Claim))
            .await
            .unwrap();
        let ideas = api
            .suggestions(debate, Some(&SessionId::default()), MessageId::new(1))
            .await
            .unwrap();
        assert_eq!(ideas, vec!["Attack the source."]);

        let (api, debate) = setup(DisabledCoach);
        api.submit_message(debate, Submission::new("alice", "x")).await.unwrap();
        let ideas = api
            .suggestions(debate, Some(&SessionId::default()), MessageId::new(1))
            .await
            .unwrap();
        assert_eq!(ideas, vec![FALLBACK_SUGGESTION]);
    }

    #[tokio::test]
    async fn suggestions_find_messages_in_named_sessions() {
        let (api, debate) = setup(MockCoach::new().with_suggestions(["Ask for numbers."]));
        api.submit_message(
            debate,
            Submission::new("alice", "x").with_arg_type(ArgType::Claim).in_session("alice_vs_bob"),
        )
        .await
        .unwrap();

        let ideas = api.suggestions(debate, None, MessageId::new(1)).await.unwrap();
        assert_eq!(ideas, vec!["Ask for numbers."]);

        // An explicit session still narrows the lookup
        let err = api
            .suggestions(debate, Some(&SessionId::default()), MessageId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MessageNotFound { .. }));
    }

    #[tokio::test]
    async fn reads_do_not_register_sessions() {
        let (api, debate) = setup(DisabledCoach);
        for n in 0..200 {
            let session = SessionId::new(format!("s{}", n));
            assert!(api.fetch_messages(DebateId::new(1000 + n), &session).await.is_empty());
            assert!(api.session_graph(debate, &session).await.nodes.is_empty());
            assert!(api.scores(debate, &session).await.is_empty());
            assert!(api.suggestions(debate, Some(&session), MessageId::new(1)).await.is_err());
        }
        assert_eq!(api.sessions().session_count(), 0);

        api.submit_message(debate, Submission::new("alice", "a").with_arg_type(ArgType::Claim))
            .await
            .unwrap();
        assert_eq!(api.sessions().session_count(), 1);
        assert_eq!(api.fetch_messages(debate, &SessionId::default()).await.len(), 1);
    }

    #[tokio::test]
    async fn mined_target_removed_by_reset_is_dropped() {
        let coach = MockCoach::new()
            .with_analysis(ArgumentAnalysis {
                arg_type: ArgType::Premise,
                relation_type: RelationType::Attack,
                target_id: Some(MessageId::new(1)),
                feedback: None,
            })
            .with_delay(Duration::from_millis(200));
        let (api, debate) = setup(coach);
        let api = api.with_options(ApiOptions {
            coach_timeout: Duration::from_secs(5),
            ..Default::default()
        });
        api.submit_message(debate, Submission::new("alice", "a").with_arg_type(ArgType::Claim))
            .await
            .unwrap();

        let pending = {
            let api = api.clone();
            tokio::spawn(async move { api.submit_message(debate, Submission::new("bob", "b")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        api.reset_session(debate, &SessionId::default()).await.unwrap();

        let accepted = pending.await.unwrap().unwrap();
        assert_eq!(accepted.message.id, MessageId::new(1));
        assert_eq!(accepted.message.relation_type, RelationType::None);
        assert_eq!(accepted.message.target_id, None);
    }

    #[tokio::test]
    async fn caller_ids_beyond_storage_are_rejected() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let debate = store.create_debate("t").unwrap().id;
        let sessions = Arc::new(SessionManager::new(store, BroadcastGateway::default()));
        let api = DebateApi::new(sessions, Arc::new(DisabledCoach));

        for id in [i64::MAX as u64, u64::MAX] {
            let err = api
                .submit_message(
                    debate,
                    Submission::new("alice", "a").with_arg_type(ArgType::Claim).with_id(MessageId::new(id)),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Session(SessionError::IdOutOfRange { .. })));
        }

        let next = api
            .submit_message(debate, Submission::new("bob", "b").with_arg_type(ArgType::Claim))
            .await
            .unwrap();
        assert_eq!(next.message.id, MessageId::new(1));
    }

    #[tokio::test]
    async fn seed_only_fills_an_empty_catalogue() {
        let (api, _) = setup(DisabledCoach);
        assert_eq!(api.seed_debates(&["Another topic".to_string()]).unwrap(), 0);

        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(SessionManager::new(store, BroadcastGateway::default()));
        let api = DebateApi::new(sessions, Arc::new(DisabledCoach));
        let topics = vec!["One".to_string(), "Two".to_string()];
        assert_eq!(api.seed_debates(&topics).unwrap(), 2);
        assert_eq!(api.list_debates().unwrap()[0].topic, "Two");
    }

    #[test]
    fn submission_accepts_username_or_author() {
        let a: Submission =
            serde_json::from_str(r#"{"content": "x", "username": "alice"}"#).unwrap();
        let b: Submission = serde_json::from_str(
            r#"{"content": "x", "author": "alice", "session_id": "s1", "target_id": 2, "relation_type": "support"}"#,
        )
        .unwrap();

        assert_eq!(a.author, "alice");
        assert!(a.is_unstructured());
        assert_eq!(a.session(), SessionId::default());
        assert_eq!(b.session().as_str(), "s1");
        assert!(!b.is_unstructured());
    }

    #[test]
    fn from_config_opens_database_and_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database: dir.path().join("debates.db"),
            debates: vec!["Seeded topic".to_string()],
            ..Default::default()
        };

        let api = DebateApi::from_config(&config).unwrap();
        assert_eq!(api.list_debates().unwrap()[0].topic, "Seeded topic");

        // Reopening does not seed twice
        let api = DebateApi::from_config(&config).unwrap();
        assert_eq!(api.list_debates().unwrap().len(), 1);
    }

    #[test]
    fn create_debate_rejects_blank_topic() {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(SessionManager::new(store, BroadcastGateway::default()));
        let api = DebateApi::new(sessions, Arc::new(DisabledCoach));
        assert!(matches!(api.create_debate("  "), Err(ApiError::EmptyTopic)));
    }
}
