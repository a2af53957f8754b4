//! Contest entity and its owned sub-records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One ranked-choice poll instance with a fixed option set and
/// open/closed state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contest {
    /// Canonical lowercase identifier, 3-32 chars in `[a-z0-9-]`.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Ordered, unique option labels. An open contest always has at
    /// least two.
    pub options: Vec<String>,

    /// Opaque admin credential. Generated at creation, copied into
    /// recurrence successors and runoffs.
    pub admin_token: String,

    /// When the contest was created.
    pub created_at: DateTime<Utc>,

    /// Scheduled start. `None` means the contest was open from creation.
    pub opens_at: Option<DateTime<Utc>>,

    /// Scheduled auto-close time.
    pub closes_at: Option<DateTime<Utc>>,

    /// When the contest was actually closed. `None` while open.
    pub closed_at: Option<DateTime<Utc>>,

    /// Recurrence rule, present on every instance of a recurring group.
    pub recurrence: Option<RecurrenceRule>,

    /// Identifier of the runoff contest spawned from this one. Set at
    /// most once; never rewritten.
    pub runoff_id: Option<String>,

    /// Identifier of the contest this runoff re-votes. Set at creation
    /// for runoff contests only.
    pub runoff_source_id: Option<String>,

    /// Notification channel this contest reports to.
    pub channel: Option<ChannelLink>,

    /// One-shot notification bookkeeping.
    pub notification: NotificationState,
}

impl Contest {
    /// Whether the contest accepts ballots at `now`.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.closed_at.is_none() && self.opens_at.is_none_or(|t| t <= now)
    }

    /// Whether the contest has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}

/// Recurrence rule shared by every instance of a recurring group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Shared identifier of the recurrence group.
    pub group_id: String,

    /// Days between instance starts. At least 7.
    pub period_days: i64,

    /// Hours an instance stays open for voting. At least 1.
    pub vote_duration_hours: i64,

    /// Start anchor of this instance. The successor starts one period
    /// after this.
    pub anchor: DateTime<Utc>,

    /// Whether the group keeps spawning successors.
    pub active: bool,

    /// Identifier template for successor instances.
    pub id_template: Option<String>,
}

impl RecurrenceRule {
    /// Start and auto-close times of the next instance.
    #[must_use]
    pub fn next_occurrence(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.anchor + Duration::days(self.period_days);
        let close = start + Duration::hours(self.vote_duration_hours);
        (start, close)
    }

    /// The rule as copied into a successor instance.
    #[must_use]
    pub fn advanced(&self) -> Self {
        let (start, _) = self.next_occurrence();
        Self {
            anchor: start,
            ..self.clone()
        }
    }
}

/// Notification channel binding: where lifecycle events for this contest
/// are delivered. The delivery collaborator interprets the endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLink {
    /// Delivery endpoint (a webhook URL for the default dispatcher).
    pub endpoint: String,

    /// Shared secret for payload signing, if the channel has one.
    pub secret: Option<String>,
}

/// One-shot notification flags. Each stamp is `None` until its event has
/// fired exactly once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationState {
    /// When the open notification was confirmed delivered.
    pub open_notified_at: Option<DateTime<Utc>>,

    /// When the close notification was confirmed delivered.
    pub close_notified_at: Option<DateTime<Utc>>,

    /// When the tie-runoff pass resolved this contest (either by
    /// spawning a runoff or by finding nothing to do).
    pub runoff_checked_at: Option<DateTime<Utc>>,
}
