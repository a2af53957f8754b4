//! Contest lifecycle scheduler.
//!
//! A periodic control loop over the shared store: auto-close, one-shot
//! open/close notifications, tie-runoff spawning, and recurrence
//! spawning. The scheduler holds **no persisted state of its own** — a
//! restart between ticks loses nothing, because every pass re-derives
//! its work from store predicates and re-checks each precondition at
//! the point of mutation.
//!
//! [`Scheduler`] is an explicit lifecycle object: construct as many as
//! tests need, [`Scheduler::start`] the loop, [`Scheduler::stop`] it,
//! and drive [`Scheduler::run_tick`] by hand where wall-clock timing
//! would get in the way.

#![allow(missing_docs)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rankvote_common::{AppError, AppResult, SchedulerConfig};
use rankvote_core::notify::{EventKind, EventPayload, NotificationDispatcher};
use rankvote_core::services::ContestService;
use rankvote_core::tabulation::tabulate;
use rankvote_store::{Contest, ContestStore};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Whether the periodic loop is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerStatus {
    Running,
    Stopped,
}

/// Read-only report of the scheduler's protective limits.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsReport {
    pub active_groups: usize,
    pub max_active_groups: usize,
    pub max_per_tick: usize,
    pub can_create_new: bool,
}

/// Contest lifecycle scheduler.
pub struct Scheduler {
    store: Arc<dyn ContestStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    contests: ContestService,
    config: SchedulerConfig,
    instance_url: String,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl Scheduler {
    /// Create a new scheduler.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContestStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        contests: ContestService,
        config: SchedulerConfig,
        instance_url: &str,
    ) -> Self {
        Self {
            store,
            dispatcher,
            contests,
            config,
            instance_url: instance_url.to_string(),
            shutdown: Mutex::new(None),
        }
    }

    /// Start the periodic loop. Returns `false` if already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let Ok(mut guard) = self.shutdown.lock() else {
            return false;
        };
        if guard.is_some() {
            return false;
        }
        let (tx, mut rx) = watch::channel(false);
        *guard = Some(tx);
        drop(guard);

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(
                interval_seconds = scheduler.config.tick_seconds,
                "Lifecycle scheduler starting"
            );
            let mut interval =
                tokio::time::interval(Duration::from_secs(scheduler.config.tick_seconds));
            // Ticks are never deliberately overlapped; a long tick just
            // delays the next one.
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        scheduler.run_tick(Utc::now()).await;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Lifecycle scheduler stopped");
        });
        true
    }

    /// Signal the loop to stop. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let Ok(mut guard) = self.shutdown.lock() else {
            return false;
        };
        match guard.take() {
            Some(tx) => {
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> SchedulerStatus {
        match self.shutdown.lock() {
            Ok(guard) if guard.is_some() => SchedulerStatus::Running,
            _ => SchedulerStatus::Stopped,
        }
    }

    /// The protective-limits report.
    pub async fn limits(&self) -> AppResult<LimitsReport> {
        let active_groups = self.store.count_active_groups().await?;
        Ok(LimitsReport {
            active_groups,
            max_active_groups: self.config.max_active_groups,
            max_per_tick: self.config.max_spawn_per_tick,
            can_create_new: active_groups < self.config.max_active_groups,
        })
    }

    /// Run one tick's worth of lifecycle passes at `now`.
    ///
    /// Each pass is independently idempotent; a failure in one is
    /// logged and never aborts the others.
    pub async fn run_tick(&self, now: DateTime<Utc>) {
        if let Err(e) = self.pass_auto_close(now).await {
            tracing::error!(error = %e, "Auto-close pass failed");
        }
        if let Err(e) = self.pass_close_notification(now).await {
            tracing::error!(error = %e, "Close-notification pass failed");
        }
        if let Err(e) = self.pass_open_notification(now).await {
            tracing::error!(error = %e, "Open-notification pass failed");
        }
        if let Err(e) = self.pass_tie_runoff(now).await {
            tracing::error!(error = %e, "Tie-runoff pass failed");
        }
        if let Err(e) = self.pass_recurrence_spawn(now).await {
            tracing::error!(error = %e, "Recurrence-spawn pass failed");
        }
    }

    // ==================== Passes ====================

    /// Close contests past their scheduled auto-close time.
    async fn pass_auto_close(&self, now: DateTime<Utc>) -> AppResult<()> {
        let mut closed = 0usize;
        for contest in self.store.due_auto_close(now).await? {
            // Re-check at the point of mutation; an admin may have
            // closed (or deleted) it since the listing.
            match self.store.close_if_open(&contest.id, now).await {
                Ok(true) => closed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(contest_id = %contest.id, error = %e, "Auto-close failed");
                }
            }
        }
        if closed > 0 {
            tracing::info!(count = closed, "Auto-closed contests");
        }
        Ok(())
    }

    /// Send the one-shot close notification for closed contests.
    async fn pass_close_notification(&self, now: DateTime<Utc>) -> AppResult<()> {
        let mut sent = 0usize;
        for contest in self.store.due_close_notification().await? {
            match self.notify_closed(&contest, now).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        contest_id = %contest.id,
                        error = %e,
                        "Close notification failed"
                    );
                }
            }
        }
        if sent > 0 {
            tracing::info!(count = sent, "Close notifications sent");
        }
        Ok(())
    }

    /// Send the one-shot open notification for contests whose start
    /// time has arrived.
    async fn pass_open_notification(&self, now: DateTime<Utc>) -> AppResult<()> {
        let mut sent = 0usize;
        for contest in self.store.due_open_notification(now).await? {
            match self.notify_opened(&contest, now).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        contest_id = %contest.id,
                        error = %e,
                        "Open notification failed"
                    );
                }
            }
        }
        if sent > 0 {
            tracing::info!(count = sent, "Open notifications sent");
        }
        Ok(())
    }

    /// Spawn runoffs for closed contests that ended in a pure tie.
    async fn pass_tie_runoff(&self, now: DateTime<Utc>) -> AppResult<()> {
        for contest in self.store.due_tie_runoff().await? {
            if let Err(e) = self.process_tie_runoff(&contest, now).await {
                // Nothing was marked, so this contest is retried on the
                // next tick.
                tracing::error!(
                    contest_id = %contest.id,
                    error = %e,
                    "Tie-runoff processing failed"
                );
            }
        }
        Ok(())
    }

    /// Spawn successors for recurring contests whose latest instance is
    /// closed and due, up to the per-tick cap.
    async fn pass_recurrence_spawn(&self, now: DateTime<Utc>) -> AppResult<()> {
        let due = self.store.due_recurrence_spawn(now).await?;
        let cap = self.config.max_spawn_per_tick;
        if due.len() > cap {
            // Deferred, not dropped: still due on the next tick.
            tracing::info!(deferred = due.len() - cap, "Recurrence spawns deferred");
        }

        let mut spawned = 0usize;
        for latest in due.into_iter().take(cap) {
            match self.contests.spawn_successor(&latest).await {
                Ok(successor) => {
                    tracing::debug!(
                        contest_id = %latest.id,
                        successor_id = %successor.id,
                        "Successor spawned"
                    );
                    spawned += 1;
                }
                Err(e) => {
                    tracing::error!(
                        contest_id = %latest.id,
                        error = %e,
                        "Recurrence spawn failed"
                    );
                }
            }
        }
        if spawned > 0 {
            tracing::info!(count = spawned, "Spawned recurrence successors");
        }
        Ok(())
    }

    // ==================== Per-contest work ====================

    /// Tabulate and deliver `vote_closed`; stamp the flag only on
    /// confirmed delivery. Returns whether this call sent the event.
    async fn notify_closed(&self, contest: &Contest, now: DateTime<Utc>) -> AppResult<bool> {
        let Some(ref channel) = contest.channel else {
            return Ok(false);
        };
        let ballots = self.store.ballots_for_contest(&contest.id).await?;
        let rankings: Vec<Vec<String>> = ballots.into_iter().map(|b| b.rankings).collect();
        let result = tabulate(&contest.options, &rankings);

        let payload = EventPayload::for_contest(&self.instance_url, contest, rankings.len())
            .with_result(&result);
        if !self
            .dispatcher
            .dispatch(channel, EventKind::VoteClosed, &payload)
            .await
        {
            tracing::debug!(contest_id = %contest.id, "Close delivery failed; retrying next tick");
            return Ok(false);
        }
        self.store.set_close_notified_if_unset(&contest.id, now).await
    }

    /// Deliver `vote_opened`; stamp the flag only on confirmed
    /// delivery.
    async fn notify_opened(&self, contest: &Contest, now: DateTime<Utc>) -> AppResult<bool> {
        let Some(ref channel) = contest.channel else {
            return Ok(false);
        };
        let ballots = self.store.ballots_for_contest(&contest.id).await?;
        let payload = EventPayload::for_contest(&self.instance_url, contest, ballots.len());
        if !self
            .dispatcher
            .dispatch(channel, EventKind::VoteOpened, &payload)
            .await
        {
            tracing::debug!(contest_id = %contest.id, "Open delivery failed; retrying next tick");
            return Ok(false);
        }
        self.store.set_open_notified_if_unset(&contest.id, now).await
    }

    /// Decide one closed contest's tie-runoff fate.
    ///
    /// No ballots or a non-tied result are expected steady states:
    /// marked resolved without retry. A genuine tie spawns a runoff
    /// through the same guarded path as the admin operation.
    async fn process_tie_runoff(&self, contest: &Contest, now: DateTime<Utc>) -> AppResult<()> {
        let ballots = self.store.ballots_for_contest(&contest.id).await?;
        if ballots.is_empty() {
            self.store.mark_runoff_checked(&contest.id, now).await?;
            return Ok(());
        }
        let rankings: Vec<Vec<String>> = ballots.into_iter().map(|b| b.rankings).collect();
        let result = tabulate(&contest.options, &rankings);
        if !result.is_tie {
            self.store.mark_runoff_checked(&contest.id, now).await?;
            return Ok(());
        }

        match self.contests.spawn_runoff(contest, &result).await {
            Ok(runoff) => {
                tracing::info!(
                    contest_id = %contest.id,
                    runoff_id = %runoff.id,
                    "Tie runoff opened"
                );
                Ok(())
            }
            // Lost the link claim: someone spawned it concurrently.
            Err(AppError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use rankvote_core::notify::RecordingDispatcher;
    use rankvote_store::MemoryStore;

    fn scheduler() -> Arc<Scheduler> {
        let store: Arc<dyn ContestStore> = Arc::new(MemoryStore::new());
        let dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(RecordingDispatcher::new());
        let contests = ContestService::new(
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            "https://vote.example.org",
            100,
        );
        Arc::new(Scheduler::new(
            store,
            dispatcher,
            contests,
            SchedulerConfig::default(),
            "https://vote.example.org",
        ))
    }

    #[tokio::test]
    async fn test_start_stop_status() {
        let scheduler = scheduler();
        assert_eq!(scheduler.status(), SchedulerStatus::Stopped);

        assert!(scheduler.start());
        assert_eq!(scheduler.status(), SchedulerStatus::Running);
        // Starting twice is a no-op.
        assert!(!scheduler.start());

        assert!(scheduler.stop());
        assert_eq!(scheduler.status(), SchedulerStatus::Stopped);
        assert!(!scheduler.stop());
    }

    #[tokio::test]
    async fn test_limits_report_empty_store() {
        let scheduler = scheduler();
        let limits = scheduler.limits().await.expect("limits");
        assert_eq!(limits.active_groups, 0);
        assert_eq!(limits.max_active_groups, 100);
        assert_eq!(limits.max_per_tick, 20);
        assert!(limits.can_create_new);
    }
}
