//! Mock coach for testing: returns preconfigured responses

use super::{ArgumentAnalysis, Coach, CoachError, CoachResult, HistoryEntry};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Coach with canned answers
///
/// Unconfigured operations report `Unavailable`.
#[derive(Debug, Default)]
pub struct MockCoach {
    analysis: Option<ArgumentAnalysis>,
    suggestions: Option<Vec<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockCoach {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analysis(mut self, analysis: ArgumentAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn with_suggestions<S: Into<String>>(mut self, suggestions: impl IntoIterator<Item = S>) -> Self {
        self.suggestions = Some(suggestions.into_iter().map(Into::into).collect());
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of analyze and suggest calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Coach for MockCoach {
    async fn analyze(&self, _content: &str, _history: &[HistoryEntry]) -> CoachResult<ArgumentAnalysis> {
        self.pause().await;
        self.analysis
            .clone()
            .ok_or_else(|| CoachError::Unavailable("mock has no analysis".to_string()))
    }

    async fn suggest(&self, _target: &str, _context: &[String]) -> CoachResult<Vec<String>> {
        self.pause().await;
        self.suggestions
            .clone()
            .ok_or_else(|| CoachError::Unavailable("mock has no suggestions".to_string()))
    }
}
