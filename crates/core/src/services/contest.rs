//! Contest service for business logic.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rankvote_common::{AppError, AppResult, IdGenerator, id};
use rankvote_store::{ChannelLink, Contest, ContestStore, NotificationState, RecurrenceRule};
use serde::Deserialize;
use validator::Validate;

use crate::notify::{EventKind, EventPayload, NotificationDispatcher};
use crate::tabulation::{IrvResult, tabulate};

/// Maximum number of options on a contest.
const MAX_OPTIONS: usize = 32;

/// Maximum length of one option label.
const MAX_OPTION_LEN: usize = 100;

/// Hours a runoff stays open when the source carries no recurrence
/// rule with its own duration.
const DEFAULT_RUNOFF_DURATION_HOURS: i64 = 24;

/// Identifier template tokens the builder understands.
const KNOWN_TEMPLATE_TOKENS: [&str; 5] = [
    "{title}",
    "{close-mm-dd-yyyy}",
    "{close-yyyy-mm-dd}",
    "{start-mm-dd-yyyy}",
    "{start-yyyy-mm-dd}",
];

/// Input for creating a contest.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContestInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub options: Vec<String>,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub channel: Option<ChannelLink>,
    #[validate(nested)]
    pub recurrence: Option<CreateRecurrenceInput>,
    pub id_template: Option<String>,
}

/// Recurrence parameters for a new recurring contest.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecurrenceInput {
    #[validate(range(min = 7))]
    pub period_days: i64,
    #[validate(range(min = 1))]
    pub vote_duration_hours: i64,
}

/// Contest service.
#[derive(Clone)]
pub struct ContestService {
    store: Arc<dyn ContestStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    id_gen: IdGenerator,
    instance_url: String,
    max_active_groups: usize,
}

impl ContestService {
    /// Create a new contest service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContestStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        instance_url: &str,
        max_active_groups: usize,
    ) -> Self {
        Self {
            store,
            dispatcher,
            id_gen: IdGenerator::new(),
            instance_url: instance_url.to_string(),
            max_active_groups,
        }
    }

    /// Get a contest by id.
    pub async fn get(&self, contest_id: &str) -> AppResult<Contest> {
        self.store
            .get_contest(contest_id)
            .await?
            .ok_or_else(|| AppError::ContestNotFound(contest_id.to_string()))
    }

    /// Create a new contest.
    pub async fn create(&self, input: CreateContestInput) -> AppResult<Contest> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if let Some(ref template) = input.id_template {
            validate_id_template(template)?;
        }
        let options = normalize_options(&input.options)?;

        let now = Utc::now();
        let anchor = input.opens_at.unwrap_or(now);
        if let Some(closes) = input.closes_at
            && closes <= anchor
        {
            return Err(AppError::Validation(
                "Close time must be after the start time".to_string(),
            ));
        }

        // A recurring contest without an explicit close gets one period's
        // vote duration.
        let closes_at = match (input.closes_at, &input.recurrence) {
            (Some(closes), _) => Some(closes),
            (None, Some(r)) => Some(anchor + Duration::hours(r.vote_duration_hours)),
            (None, None) => None,
        };

        let candidate = id::build_id(
            &input.title,
            closes_at.unwrap_or(now),
            input.opens_at,
            input.id_template.as_deref(),
        );
        let contest_id = id::unique_id(&candidate, |cand| {
            let store = Arc::clone(&self.store);
            async move { store.contest_id_exists(&cand).await }
        })
        .await?;

        let recurrence = if let Some(ref r) = input.recurrence {
            let active_groups = self.store.count_active_groups().await?;
            if active_groups >= self.max_active_groups {
                return Err(AppError::Validation(format!(
                    "Maximum of {} active recurring contests allowed",
                    self.max_active_groups
                )));
            }
            Some(RecurrenceRule {
                group_id: contest_id.clone(),
                period_days: r.period_days,
                vote_duration_hours: r.vote_duration_hours,
                anchor,
                active: true,
                id_template: input.id_template.clone(),
            })
        } else {
            None
        };

        let contest = Contest {
            id: contest_id,
            title: input.title.trim().to_string(),
            options,
            admin_token: self.id_gen.generate_token(),
            created_at: now,
            opens_at: input.opens_at,
            closes_at,
            closed_at: None,
            recurrence,
            runoff_id: None,
            runoff_source_id: None,
            channel: input.channel,
            notification: NotificationState::default(),
        };
        self.store.insert_contest(contest.clone()).await?;

        tracing::info!(contest_id = %contest.id, "Contest created");
        self.announce(&contest, EventKind::VoteCreated, 0).await;

        Ok(contest)
    }

    /// Close a contest now.
    pub async fn close(&self, contest_id: &str, token: &str) -> AppResult<Contest> {
        let contest = self.get(contest_id).await?;
        self.verify_admin(&contest, token)?;

        if !self.store.close_if_open(contest_id, Utc::now()).await? {
            return Err(AppError::Conflict(format!(
                "Contest is already closed: {contest_id}"
            )));
        }
        tracing::info!(contest_id = %contest_id, "Contest closed");
        self.get(contest_id).await
    }

    /// Reopen a closed contest.
    pub async fn reopen(&self, contest_id: &str, token: &str) -> AppResult<Contest> {
        let mut contest = self.get(contest_id).await?;
        self.verify_admin(&contest, token)?;

        if !contest.is_closed() {
            return Err(AppError::Conflict(format!(
                "Contest is not closed: {contest_id}"
            )));
        }
        contest.closed_at = None;
        self.store.update_contest(contest.clone()).await?;
        tracing::info!(contest_id = %contest_id, "Contest reopened");
        Ok(contest)
    }

    /// Rename a contest. The identifier never changes.
    pub async fn rename(&self, contest_id: &str, token: &str, title: &str) -> AppResult<Contest> {
        let mut contest = self.get(contest_id).await?;
        self.verify_admin(&contest, token)?;

        let title = title.trim();
        if title.is_empty() || title.len() > 200 {
            return Err(AppError::Validation(
                "Title must be between 1 and 200 characters".to_string(),
            ));
        }
        contest.title = title.to_string();
        self.store.update_contest(contest.clone()).await?;
        Ok(contest)
    }

    /// Replace a contest's option set.
    ///
    /// Rankings for removed options are stripped from existing ballots,
    /// preserving the order of the rest. A ballot emptied this way is
    /// kept and simply exhausts in every round.
    pub async fn edit_options(
        &self,
        contest_id: &str,
        token: &str,
        options: &[String],
    ) -> AppResult<Contest> {
        let mut contest = self.get(contest_id).await?;
        self.verify_admin(&contest, token)?;

        contest.options = normalize_options(options)?;
        self.store.update_contest(contest.clone()).await?;

        let mut truncated = 0usize;
        for mut ballot in self.store.ballots_for_contest(contest_id).await? {
            if ballot.retain_options(&contest.options) {
                self.store.put_ballot(ballot).await?;
                truncated += 1;
            }
        }
        if truncated > 0 {
            tracing::info!(
                contest_id = %contest_id,
                truncated,
                "Ballots truncated after option edit"
            );
        }
        Ok(contest)
    }

    /// Delete a contest and its ballots.
    pub async fn delete(&self, contest_id: &str, token: &str) -> AppResult<()> {
        let contest = self.get(contest_id).await?;
        self.verify_admin(&contest, token)?;

        self.store.delete_contest(contest_id).await?;
        tracing::info!(contest_id = %contest_id, "Contest deleted");
        Ok(())
    }

    /// Stop a recurrence group. Call on the latest instance.
    pub async fn stop_recurrence(&self, contest_id: &str, token: &str) -> AppResult<Contest> {
        let mut contest = self.get(contest_id).await?;
        self.verify_admin(&contest, token)?;

        let Some(ref mut rule) = contest.recurrence else {
            return Err(AppError::Validation(format!(
                "Contest is not recurring: {contest_id}"
            )));
        };
        if !rule.active {
            return Err(AppError::Conflict(format!(
                "Recurrence is already stopped: {contest_id}"
            )));
        }
        rule.active = false;
        self.store.update_contest(contest.clone()).await?;
        tracing::info!(contest_id = %contest_id, "Recurrence stopped");
        Ok(contest)
    }

    /// Tabulate a contest's current ballots for results rendering.
    pub async fn results(&self, contest_id: &str) -> AppResult<IrvResult> {
        let contest = self.get(contest_id).await?;
        let ballots = self.store.ballots_for_contest(contest_id).await?;
        let rankings: Vec<Vec<String>> = ballots.into_iter().map(|b| b.rankings).collect();
        Ok(tabulate(&contest.options, &rankings))
    }

    /// Admin-initiated tie runoff.
    ///
    /// Shares the spawn path and idempotency guard with the scheduled
    /// pass, but surfaces each precondition as a specific rejection.
    pub async fn trigger_tie_runoff(&self, contest_id: &str, token: &str) -> AppResult<Contest> {
        let contest = self.get(contest_id).await?;
        self.verify_admin(&contest, token)?;

        if !contest.is_closed() {
            return Err(AppError::Conflict(format!(
                "Contest is still open: {contest_id}"
            )));
        }
        if contest.runoff_id.is_some() {
            return Err(AppError::Conflict(format!(
                "Contest already has a runoff: {contest_id}"
            )));
        }
        let ballots = self.store.ballots_for_contest(contest_id).await?;
        if ballots.is_empty() {
            return Err(AppError::Validation(format!(
                "Contest has no ballots: {contest_id}"
            )));
        }
        let rankings: Vec<Vec<String>> = ballots.into_iter().map(|b| b.rankings).collect();
        let result = tabulate(&contest.options, &rankings);
        if !result.is_tie {
            return Err(AppError::Validation(format!(
                "Contest did not end in a tie: {contest_id}"
            )));
        }

        self.spawn_runoff(&contest, &result).await
    }

    // ==================== Processing Methods (for the scheduler) ====================

    /// Create the runoff contest for a tied source contest.
    ///
    /// Claims the source's runoff link first; losing that claim means a
    /// concurrent actor already spawned one, and the operation is
    /// rejected rather than duplicated.
    pub async fn spawn_runoff(&self, source: &Contest, result: &IrvResult) -> AppResult<Contest> {
        let options: Vec<String> = source
            .options
            .iter()
            .filter(|o| result.tied_options.contains(*o))
            .cloned()
            .collect();
        if options.len() < 2 {
            return Err(AppError::Validation(format!(
                "Tie does not span two options: {}",
                source.id
            )));
        }

        let now = Utc::now();
        let duration_hours = source
            .recurrence
            .as_ref()
            .map_or(DEFAULT_RUNOFF_DURATION_HOURS, |r| r.vote_duration_hours);
        let closes_at = now + Duration::hours(duration_hours);
        let title = format!("{} (runoff)", source.title);

        let candidate = id::build_id(&title, closes_at, None, None);
        let runoff_id = id::unique_id(&candidate, |cand| {
            let store = Arc::clone(&self.store);
            async move { store.contest_id_exists(&cand).await }
        })
        .await?;

        if !self.store.link_runoff_if_unset(&source.id, &runoff_id).await? {
            return Err(AppError::Conflict(format!(
                "Contest already has a runoff: {}",
                source.id
            )));
        }

        let runoff = Contest {
            id: runoff_id,
            title,
            options,
            admin_token: source.admin_token.clone(),
            created_at: now,
            opens_at: None,
            closes_at: Some(closes_at),
            closed_at: None,
            recurrence: None,
            runoff_id: None,
            runoff_source_id: Some(source.id.clone()),
            channel: source.channel.clone(),
            notification: NotificationState::default(),
        };
        self.store.insert_contest(runoff.clone()).await?;

        tracing::info!(
            contest_id = %source.id,
            runoff_id = %runoff.id,
            "Runoff contest spawned"
        );
        if let Some(ref channel) = runoff.channel {
            let mut payload =
                EventPayload::for_contest(&self.instance_url, &runoff, result.total_ballots);
            payload.tied_options = result.tied_options.clone();
            if !self
                .dispatcher
                .dispatch(channel, EventKind::RunoffRequired, &payload)
                .await
            {
                tracing::warn!(runoff_id = %runoff.id, "Runoff notification failed");
            }
        }

        Ok(runoff)
    }

    /// Create the successor instance of a recurring contest.
    pub async fn spawn_successor(&self, latest: &Contest) -> AppResult<Contest> {
        let Some(ref rule) = latest.recurrence else {
            return Err(AppError::Internal(format!(
                "Contest is not recurring: {}",
                latest.id
            )));
        };

        let (opens_at, closes_at) = rule.next_occurrence();
        let candidate = id::build_id(
            &latest.title,
            closes_at,
            Some(opens_at),
            rule.id_template.as_deref(),
        );
        let successor_id = id::unique_id(&candidate, |cand| {
            let store = Arc::clone(&self.store);
            async move { store.contest_id_exists(&cand).await }
        })
        .await?;

        let successor = Contest {
            id: successor_id,
            title: latest.title.clone(),
            options: latest.options.clone(),
            admin_token: latest.admin_token.clone(),
            created_at: Utc::now(),
            opens_at: Some(opens_at),
            closes_at: Some(closes_at),
            closed_at: None,
            recurrence: Some(rule.advanced()),
            runoff_id: None,
            runoff_source_id: None,
            channel: latest.channel.clone(),
            notification: NotificationState::default(),
        };
        self.store.insert_contest(successor.clone()).await?;

        tracing::info!(
            contest_id = %latest.id,
            successor_id = %successor.id,
            "Recurrence successor spawned"
        );
        self.announce(&successor, EventKind::VoteCreated, 0).await;

        Ok(successor)
    }

    // ==================== Helper Methods ====================

    /// Best-effort announcement; creation events are not flag-gated.
    async fn announce(&self, contest: &Contest, kind: EventKind, ballot_count: usize) {
        let Some(ref channel) = contest.channel else {
            return;
        };
        let payload = EventPayload::for_contest(&self.instance_url, contest, ballot_count);
        if !self.dispatcher.dispatch(channel, kind, &payload).await {
            tracing::warn!(contest_id = %contest.id, event = %kind, "Announcement failed");
        }
    }

    fn verify_admin(&self, contest: &Contest, token: &str) -> AppResult<()> {
        // Credential verification proper is the caller's collaborator;
        // this is only the opaque-token equality gate.
        if contest.admin_token == token {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Invalid admin credential".to_string(),
            ))
        }
    }
}

/// Trim, bound, and case-insensitively dedup option labels, keeping
/// first occurrences and their entered case.
fn normalize_options(raw: &[String]) -> AppResult<Vec<String>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut options: Vec<String> = Vec::new();
    for label in raw {
        let label = label.trim();
        if label.is_empty() {
            return Err(AppError::Validation(
                "Option labels cannot be empty".to_string(),
            ));
        }
        if label.len() > MAX_OPTION_LEN {
            return Err(AppError::Validation(format!(
                "Option label is too long (max {MAX_OPTION_LEN} chars)"
            )));
        }
        if seen.insert(label.to_lowercase()) {
            options.push(label.to_string());
        }
    }
    if options.len() < 2 {
        return Err(AppError::Validation(
            "Contest must have at least 2 distinct options".to_string(),
        ));
    }
    if options.len() > MAX_OPTIONS {
        return Err(AppError::Validation(format!(
            "Contest cannot have more than {MAX_OPTIONS} options"
        )));
    }
    Ok(options)
}

/// Reject templates with tokens the identifier builder does not know.
fn validate_id_template(template: &str) -> AppResult<()> {
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            return Err(AppError::Validation(format!(
                "Unclosed token in id template: {template}"
            )));
        };
        let token = &rest[start..=start + len];
        if !KNOWN_TEMPLATE_TOKENS.contains(&token) {
            return Err(AppError::Validation(format!(
                "Unknown id template token: {token}"
            )));
        }
        rest = &rest[start + len + 1..];
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notify::RecordingDispatcher;
    use rankvote_store::MemoryStore;

    fn service(store: Arc<MemoryStore>, dispatcher: Arc<RecordingDispatcher>) -> ContestService {
        ContestService::new(store, dispatcher, "https://vote.example.org", 2)
    }

    fn input(title: &str, options: &[&str]) -> CreateContestInput {
        CreateContestInput {
            title: title.to_string(),
            options: options.iter().map(ToString::to_string).collect(),
            opens_at: None,
            closes_at: None,
            channel: None,
            recurrence: None,
            id_template: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_two_options() {
        let svc = service(Arc::new(MemoryStore::new()), Arc::new(RecordingDispatcher::new()));
        let err = svc.create(input("Lunch", &["pizza"])).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_dedups_options_case_insensitively() {
        let svc = service(Arc::new(MemoryStore::new()), Arc::new(RecordingDispatcher::new()));
        let contest = svc
            .create(input("Lunch", &["Pizza", "pizza ", "Tacos"]))
            .await
            .unwrap();
        assert_eq!(contest.options, vec!["Pizza".to_string(), "Tacos".to_string()]);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_template() {
        let svc = service(Arc::new(MemoryStore::new()), Arc::new(RecordingDispatcher::new()));
        let mut bad = input("Lunch", &["a", "b"]);
        bad.id_template = Some("{title}-{bogus}".to_string());
        let err = svc.create(bad).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_rejects_short_recurrence_period() {
        let svc = service(Arc::new(MemoryStore::new()), Arc::new(RecordingDispatcher::new()));
        let mut bad = input("Lunch", &["a", "b"]);
        bad.recurrence = Some(CreateRecurrenceInput {
            period_days: 6,
            vote_duration_hours: 24,
        });
        let err = svc.create(bad).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_group_cap_refuses_new_groups_only() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(Arc::clone(&store), Arc::new(RecordingDispatcher::new()));

        for title in ["One", "Two"] {
            let mut recurring = input(title, &["a", "b"]);
            recurring.recurrence = Some(CreateRecurrenceInput {
                period_days: 7,
                vote_duration_hours: 24,
            });
            svc.create(recurring).await.unwrap();
        }

        let mut third = input("Three", &["a", "b"]);
        third.recurrence = Some(CreateRecurrenceInput {
            period_days: 7,
            vote_duration_hours: 24,
        });
        let err = svc.create(third).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        // Non-recurring creation is unaffected by the cap.
        svc.create(input("Plain", &["a", "b"])).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_idempotent_rejection() {
        let svc = service(Arc::new(MemoryStore::new()), Arc::new(RecordingDispatcher::new()));
        let contest = svc.create(input("Lunch", &["a", "b"])).await.unwrap();

        svc.close(&contest.id, &contest.admin_token).await.unwrap();
        let err = svc
            .close(&contest.id, &contest.admin_token)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_admin_token_is_checked() {
        let svc = service(Arc::new(MemoryStore::new()), Arc::new(RecordingDispatcher::new()));
        let contest = svc.create(input("Lunch", &["a", "b"])).await.unwrap();

        let err = svc.close(&contest.id, "wrong").await.unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_edit_options_truncates_ballots() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(Arc::clone(&store), Arc::new(RecordingDispatcher::new()));
        let contest = svc.create(input("Lunch", &["a", "b", "c"])).await.unwrap();

        store
            .put_ballot(rankvote_store::Ballot {
                id: "b1".to_string(),
                contest_id: contest.id.clone(),
                rankings: vec!["c".to_string(), "a".to_string(), "b".to_string()],
                voter_name: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        svc.edit_options(&contest.id, &contest.admin_token, &[
            "a".to_string(),
            "b".to_string(),
        ])
        .await
        .unwrap();

        let ballots = store.ballots_for_contest(&contest.id).await.unwrap();
        assert_eq!(ballots[0].rankings, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_trigger_tie_runoff_guards() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(Arc::clone(&store), Arc::new(RecordingDispatcher::new()));
        let contest = svc.create(input("Lunch", &["a", "b"])).await.unwrap();
        let token = contest.admin_token.clone();

        // Still open.
        let err = svc.trigger_tie_runoff(&contest.id, &token).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");

        svc.close(&contest.id, &token).await.unwrap();

        // No ballots.
        let err = svc.trigger_tie_runoff(&contest.id, &token).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        for (id, first, second) in [("b1", "a", "b"), ("b2", "b", "a")] {
            store
                .put_ballot(rankvote_store::Ballot {
                    id: id.to_string(),
                    contest_id: contest.id.clone(),
                    rankings: vec![first.to_string(), second.to_string()],
                    voter_name: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        // A genuine tie spawns exactly one runoff.
        let runoff = svc.trigger_tie_runoff(&contest.id, &token).await.unwrap();
        assert_eq!(runoff.runoff_source_id.as_deref(), Some(contest.id.as_str()));
        assert_eq!(runoff.options, vec!["a".to_string(), "b".to_string()]);

        // Requesting another is a rejection, not a duplicate.
        let err = svc.trigger_tie_runoff(&contest.id, &token).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_trigger_tie_runoff_rejects_clear_winner() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(Arc::clone(&store), Arc::new(RecordingDispatcher::new()));
        let contest = svc.create(input("Lunch", &["a", "b"])).await.unwrap();
        let token = contest.admin_token.clone();

        for (id, ranking) in [("b1", "a"), ("b2", "a"), ("b3", "b")] {
            store
                .put_ballot(rankvote_store::Ballot {
                    id: id.to_string(),
                    contest_id: contest.id.clone(),
                    rankings: vec![ranking.to_string()],
                    voter_name: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        svc.close(&contest.id, &token).await.unwrap();

        let err = svc.trigger_tie_runoff(&contest.id, &token).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_results_tabulates_current_ballots() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(Arc::clone(&store), Arc::new(RecordingDispatcher::new()));
        let contest = svc.create(input("Lunch", &["a", "b"])).await.unwrap();

        for (id, ranking) in [("b1", "a"), ("b2", "a"), ("b3", "b")] {
            store
                .put_ballot(rankvote_store::Ballot {
                    id: id.to_string(),
                    contest_id: contest.id.clone(),
                    rankings: vec![ranking.to_string()],
                    voter_name: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let result = svc.results(&contest.id).await.unwrap();
        assert_eq!(result.winner.as_deref(), Some("a"));
        assert_eq!(result.total_ballots, 3);
    }

    #[tokio::test]
    async fn test_created_event_is_announced() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let svc = service(Arc::new(MemoryStore::new()), Arc::clone(&dispatcher));

        let mut with_channel = input("Lunch", &["a", "b"]);
        with_channel.channel = Some(ChannelLink {
            endpoint: "https://hooks.example.org/x".to_string(),
            secret: None,
        });
        svc.create(with_channel).await.unwrap();

        assert_eq!(dispatcher.kinds(), vec![EventKind::VoteCreated]);
    }
}
