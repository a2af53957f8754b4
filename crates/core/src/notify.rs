//! Notification routing contract.
//!
//! The lifecycle logic hands events to a delivery collaborator through
//! [`NotificationDispatcher`]. Delivery mechanics (transport, retries
//! inside one attempt, timeouts) belong to the implementation; the one
//! rule here is that failure surfaces as `false`, never as a fault —
//! the scheduler's one-shot flags depend on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rankvote_store::{ChannelLink, Contest};
use serde::{Deserialize, Serialize};

use crate::tabulation::IrvResult;

/// Lifecycle event classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A contest was created (authoring action or recurrence spawn).
    VoteCreated,
    /// A contest's start time arrived.
    VoteOpened,
    /// A contest closed.
    VoteClosed,
    /// A contest ended in a pure tie and a runoff was spawned.
    RunoffRequired,
}

impl EventKind {
    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VoteCreated => "vote_created",
            Self::VoteOpened => "vote_opened",
            Self::VoteClosed => "vote_closed",
            Self::RunoffRequired => "runoff_required",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload handed to the delivery collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub contest_id: String,
    pub title: String,
    pub contest_url: String,
    pub results_url: String,
    /// Winner, when the event carries a tabulation outcome.
    pub winner: Option<String>,
    /// Tied options, when the outcome was a tie.
    pub tied_options: Vec<String>,
    pub ballot_count: usize,
    pub closes_at: Option<DateTime<Utc>>,
}

impl EventPayload {
    /// Build the payload for a contest, without tabulation data.
    #[must_use]
    pub fn for_contest(base_url: &str, contest: &Contest, ballot_count: usize) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            contest_id: contest.id.clone(),
            title: contest.title.clone(),
            contest_url: format!("{base}/contest/{}", contest.id),
            results_url: format!("{base}/contest/{}/results", contest.id),
            winner: None,
            tied_options: Vec::new(),
            ballot_count,
            closes_at: contest.closed_at.or(contest.closes_at),
        }
    }

    /// Attach a tabulation outcome.
    #[must_use]
    pub fn with_result(mut self, result: &IrvResult) -> Self {
        self.winner = result.winner.clone();
        self.tied_options = result.tied_options.clone();
        self.ballot_count = result.total_ballots;
        self
    }
}

/// Delivery collaborator contract.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one event to one channel. `true` means confirmed
    /// delivery; anything else — transport error, non-success status,
    /// timeout — is `false`.
    async fn dispatch(&self, channel: &ChannelLink, kind: EventKind, payload: &EventPayload)
    -> bool;
}

/// Recording dispatcher for tests and local runs: remembers every
/// event and can be switched to fail deliveries.
#[derive(Default)]
pub struct RecordingDispatcher {
    events: std::sync::Mutex<Vec<(String, EventKind, EventPayload)>>,
    fail: std::sync::atomic::AtomicBool,
}

impl RecordingDispatcher {
    /// Create a dispatcher that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    /// Events delivered so far, as (endpoint, kind, payload).
    #[must_use]
    pub fn events(&self) -> Vec<(String, EventKind, EventPayload)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Kinds delivered so far, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().into_iter().map(|(_, k, _)| k).collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        channel: &ChannelLink,
        kind: EventKind,
        payload: &EventPayload,
    ) -> bool {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return false;
        }
        if let Ok(mut events) = self.events.lock() {
            events.push((channel.endpoint.clone(), kind, payload.clone()));
        }
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rankvote_store::NotificationState;

    fn contest() -> Contest {
        Contest {
            id: "lunch-03-09-2024".to_string(),
            title: "Lunch".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            admin_token: "t".to_string(),
            created_at: Utc::now(),
            opens_at: None,
            closes_at: None,
            closed_at: None,
            recurrence: None,
            runoff_id: None,
            runoff_source_id: None,
            channel: None,
            notification: NotificationState::default(),
        }
    }

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(EventKind::VoteCreated.as_str(), "vote_created");
        assert_eq!(EventKind::RunoffRequired.as_str(), "runoff_required");
        assert_eq!(
            serde_json::to_string(&EventKind::VoteClosed).unwrap(),
            "\"vote_closed\""
        );
    }

    #[test]
    fn test_payload_urls() {
        let payload = EventPayload::for_contest("https://vote.example.org/", &contest(), 3);
        assert_eq!(
            payload.contest_url,
            "https://vote.example.org/contest/lunch-03-09-2024"
        );
        assert_eq!(
            payload.results_url,
            "https://vote.example.org/contest/lunch-03-09-2024/results"
        );
        assert_eq!(payload.ballot_count, 3);
    }

    #[tokio::test]
    async fn test_recording_dispatcher_failure_switch() {
        let dispatcher = RecordingDispatcher::new();
        let channel = ChannelLink {
            endpoint: "https://hooks.example.org/x".to_string(),
            secret: None,
        };
        let payload = EventPayload::for_contest("https://vote.example.org", &contest(), 0);

        assert!(
            dispatcher
                .dispatch(&channel, EventKind::VoteOpened, &payload)
                .await
        );
        dispatcher.set_failing(true);
        assert!(
            !dispatcher
                .dispatch(&channel, EventKind::VoteClosed, &payload)
                .await
        );
        assert_eq!(dispatcher.kinds(), vec![EventKind::VoteOpened]);
    }
}
