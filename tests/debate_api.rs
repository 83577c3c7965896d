//! Debate API behaviour with a slow or absent coach, and persistence
//! across restarts.

mod common;

use common::{memory_manager, next_event};
use dialectic::{
    ApiOptions, ArgType, ArgumentAnalysis, BroadcastGateway, DebateApi, DebateId, MessageId, MockCoach,
    OpenStore, RelationType, SessionId, SessionManager, SqliteStore, Submission,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fast_timeout() -> ApiOptions {
    ApiOptions {
        coach_timeout: Duration::from_millis(50),
        ..Default::default()
    }
}

#[tokio::test]
async fn slow_coach_does_not_stall_ingestion() {
    let (manager, _) = memory_manager();
    let coach = Arc::new(
        MockCoach::new()
            .with_analysis(ArgumentAnalysis {
                arg_type: ArgType::Premise,
                ..Default::default()
            })
            .with_delay(Duration::from_secs(30)),
    );
    let api = DebateApi::new(manager, coach.clone()).with_options(fast_timeout());
    let debate = DebateId::new(1);

    let started = Instant::now();
    let slow = {
        let api = api.clone();
        tokio::spawn(async move { api.submit_message(debate, Submission::new("alice", "free text")).await })
    };
    let structured = api
        .submit_message(debate, Submission::new("bob", "a claim").with_arg_type(ArgType::Claim))
        .await
        .unwrap();
    assert_eq!(structured.message.author, "bob");

    let mined = slow.await.unwrap().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    // Timed out analysis falls back to an unrelated claim
    assert_eq!(mined.message.arg_type, ArgType::Claim);
    assert_eq!(mined.message.relation_type, RelationType::None);
    assert_eq!(coach.calls(), 1);

    let messages = api.fetch_messages(debate, &SessionId::default()).await;
    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn slow_coach_suggestions_fall_back() {
    let (manager, _) = memory_manager();
    let coach = Arc::new(
        MockCoach::new()
            .with_suggestions(["never arrives"])
            .with_delay(Duration::from_secs(30)),
    );
    let api = DebateApi::new(manager, coach).with_options(fast_timeout());
    let debate = DebateId::new(1);
    api.submit_message(debate, Submission::new("alice", "a").with_arg_type(ArgType::Claim))
        .await
        .unwrap();

    let suggestions = api
        .suggestions(debate, None, MessageId::new(1))
        .await
        .unwrap();
    assert_eq!(suggestions, vec![dialectic::coach::FALLBACK_SUGGESTION.to_string()]);
}

#[tokio::test]
async fn coach_relation_becomes_an_attack() {
    let (manager, _) = memory_manager();
    let api = DebateApi::new(
        manager,
        Arc::new(MockCoach::new().with_analysis(ArgumentAnalysis {
            arg_type: ArgType::Premise,
            relation_type: RelationType::Attack,
            target_id: Some(MessageId::new(1)),
            feedback: Some("cite a source".into()),
        })),
    );
    let debate = DebateId::new(1);
    let mut events = api.subscribe(debate, None);

    api.submit_message(debate, Submission::new("alice", "a").with_arg_type(ArgType::Claim))
        .await
        .unwrap();
    let reply = api
        .submit_message(debate, Submission::new("bob", "that is wrong"))
        .await
        .unwrap();

    assert_eq!(reply.message.target_id, Some(MessageId::new(1)));
    assert_eq!(reply.message.feedback.as_deref(), Some("cite a source"));
    assert_eq!(next_event(&mut events).await.message.id, MessageId::new(1));
    let event = next_event(&mut events).await;
    let winners: Vec<u64> = event.message.current_winners.unwrap().iter().map(|id| id.get()).collect();
    assert_eq!(winners, vec![2]);
}

#[tokio::test]
async fn sqlite_sessions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dialectic.db");
    let debate;

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let sessions = Arc::new(SessionManager::new(store, BroadcastGateway::default()));
        let api = DebateApi::new(sessions, Arc::new(dialectic::DisabledCoach));
        debate = api.create_debate("Four-day work week?").unwrap().id;

        api.submit_message(debate, Submission::new("alice", "a").with_arg_type(ArgType::Claim))
            .await
            .unwrap();
        api.submit_message(debate, Submission::new("bob", "b").attacking(MessageId::new(1)))
            .await
            .unwrap();
        api.submit_message(
            debate,
            Submission::new("carol", "elsewhere").in_session("side"),
        )
        .await
        .unwrap();
    }

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let sessions = Arc::new(SessionManager::new(store, BroadcastGateway::default()));
    let api = DebateApi::new(sessions, Arc::new(dialectic::DisabledCoach));

    let snapshot = api.session_graph(debate, &SessionId::default()).await;
    assert_eq!(snapshot.nodes.len(), 2);
    let winners: Vec<u64> = snapshot.current_winners.iter().map(|id| id.get()).collect();
    assert_eq!(winners, vec![2]);

    // Ids continue after the stored log
    let next = api
        .submit_message(debate, Submission::new("alice", "c").attacking(MessageId::new(2)))
        .await
        .unwrap();
    assert_eq!(next.message.id, MessageId::new(3));

    let side = api.fetch_messages(debate, &SessionId::new("side")).await;
    assert_eq!(side.len(), 1);
    assert_eq!(side[0].author, "carol");
}
