//! In-memory [`ContestStore`] implementation.
//!
//! Reference implementation of the persistence contract, used by tests
//! and the demo daemon. A single `RwLock` over both maps keeps every
//! conditional mutation atomic with respect to concurrent readers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rankvote_common::{AppError, AppResult};
use tokio::sync::RwLock;

use crate::ballot::Ballot;
use crate::contest::Contest;
use crate::store::ContestStore;

#[derive(Default)]
struct Inner {
    contests: HashMap<String, Contest>,
    ballots: HashMap<String, Ballot>,
}

/// In-memory contest store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest instance of each recurrence group, keyed by group id.
    ///
    /// "Latest" is the instance with the greatest anchor, ties broken by
    /// id so listings stay deterministic.
    fn latest_per_group(inner: &Inner) -> Vec<Contest> {
        let mut latest: HashMap<String, &Contest> = HashMap::new();
        for contest in inner.contests.values() {
            let Some(rule) = &contest.recurrence else {
                continue;
            };
            latest
                .entry(rule.group_id.clone())
                .and_modify(|current| {
                    let cur = current
                        .recurrence
                        .as_ref()
                        .map(|r| (r.anchor, current.id.clone()));
                    if cur < Some((rule.anchor, contest.id.clone())) {
                        *current = contest;
                    }
                })
                .or_insert(contest);
        }
        let mut result: Vec<Contest> = latest.into_values().cloned().collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        result
    }
}

#[async_trait]
impl ContestStore for MemoryStore {
    async fn insert_contest(&self, contest: Contest) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.contests.contains_key(&contest.id) {
            return Err(AppError::Conflict(format!(
                "Contest id already taken: {}",
                contest.id
            )));
        }
        inner.contests.insert(contest.id.clone(), contest);
        Ok(())
    }

    async fn get_contest(&self, id: &str) -> AppResult<Option<Contest>> {
        let inner = self.inner.read().await;
        Ok(inner.contests.get(id).cloned())
    }

    async fn update_contest(&self, contest: Contest) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.contests.contains_key(&contest.id) {
            return Err(AppError::ContestNotFound(contest.id));
        }
        inner.contests.insert(contest.id.clone(), contest);
        Ok(())
    }

    async fn delete_contest(&self, id: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.contests.remove(id).is_none() {
            return Err(AppError::ContestNotFound(id.to_string()));
        }
        inner.ballots.retain(|_, b| b.contest_id != id);
        Ok(())
    }

    async fn contest_id_exists(&self, id: &str) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.contests.contains_key(id))
    }

    async fn due_auto_close(&self, now: DateTime<Utc>) -> AppResult<Vec<Contest>> {
        let inner = self.inner.read().await;
        let mut due: Vec<Contest> = inner
            .contests
            .values()
            .filter(|c| !c.is_closed() && c.closes_at.is_some_and(|t| t <= now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(due)
    }

    async fn due_open_notification(&self, now: DateTime<Utc>) -> AppResult<Vec<Contest>> {
        let inner = self.inner.read().await;
        let mut due: Vec<Contest> = inner
            .contests
            .values()
            .filter(|c| {
                c.channel.is_some()
                    && !c.is_closed()
                    && c.notification.open_notified_at.is_none()
                    && c.opens_at.is_none_or(|t| t <= now)
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(due)
    }

    async fn due_close_notification(&self) -> AppResult<Vec<Contest>> {
        let inner = self.inner.read().await;
        let mut due: Vec<Contest> = inner
            .contests
            .values()
            .filter(|c| {
                c.channel.is_some() && c.is_closed() && c.notification.close_notified_at.is_none()
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(due)
    }

    async fn due_tie_runoff(&self) -> AppResult<Vec<Contest>> {
        let inner = self.inner.read().await;
        let mut due: Vec<Contest> = inner
            .contests
            .values()
            .filter(|c| {
                c.channel.is_some()
                    && c.is_closed()
                    && c.runoff_id.is_none()
                    && c.notification.runoff_checked_at.is_none()
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(due)
    }

    async fn due_recurrence_spawn(&self, now: DateTime<Utc>) -> AppResult<Vec<Contest>> {
        let inner = self.inner.read().await;
        let due = Self::latest_per_group(&inner)
            .into_iter()
            .filter(|c| {
                c.is_closed()
                    && c.recurrence.as_ref().is_some_and(|r| {
                        r.active && r.anchor + Duration::days(r.period_days) <= now
                    })
            })
            .collect();
        Ok(due)
    }

    async fn count_active_groups(&self) -> AppResult<usize> {
        let inner = self.inner.read().await;
        let count = Self::latest_per_group(&inner)
            .iter()
            .filter(|c| c.recurrence.as_ref().is_some_and(|r| r.active))
            .count();
        Ok(count)
    }

    async fn close_if_open(&self, id: &str, closed_at: DateTime<Utc>) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let contest = inner
            .contests
            .get_mut(id)
            .ok_or_else(|| AppError::ContestNotFound(id.to_string()))?;
        if contest.closed_at.is_some() {
            return Ok(false);
        }
        contest.closed_at = Some(closed_at);
        Ok(true)
    }

    async fn set_open_notified_if_unset(&self, id: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let contest = inner
            .contests
            .get_mut(id)
            .ok_or_else(|| AppError::ContestNotFound(id.to_string()))?;
        if contest.notification.open_notified_at.is_some() {
            return Ok(false);
        }
        contest.notification.open_notified_at = Some(at);
        Ok(true)
    }

    async fn set_close_notified_if_unset(&self, id: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let contest = inner
            .contests
            .get_mut(id)
            .ok_or_else(|| AppError::ContestNotFound(id.to_string()))?;
        if contest.notification.close_notified_at.is_some() {
            return Ok(false);
        }
        contest.notification.close_notified_at = Some(at);
        Ok(true)
    }

    async fn link_runoff_if_unset(&self, id: &str, runoff_id: &str) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let contest = inner
            .contests
            .get_mut(id)
            .ok_or_else(|| AppError::ContestNotFound(id.to_string()))?;
        if contest.runoff_id.is_some() {
            return Ok(false);
        }
        contest.runoff_id = Some(runoff_id.to_string());
        Ok(true)
    }

    async fn mark_runoff_checked(&self, id: &str, at: DateTime<Utc>) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let contest = inner
            .contests
            .get_mut(id)
            .ok_or_else(|| AppError::ContestNotFound(id.to_string()))?;
        contest.notification.runoff_checked_at = Some(at);
        Ok(())
    }

    async fn put_ballot(&self, ballot: Ballot) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.ballots.insert(ballot.id.clone(), ballot);
        Ok(())
    }

    async fn delete_ballot(&self, id: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.ballots.remove(id).is_none() {
            return Err(AppError::BallotNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn ballots_for_contest(&self, contest_id: &str) -> AppResult<Vec<Ballot>> {
        let inner = self.inner.read().await;
        let mut ballots: Vec<Ballot> = inner
            .ballots
            .values()
            .filter(|b| b.contest_id == contest_id)
            .cloned()
            .collect();
        ballots.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(ballots)
    }

    async fn find_ballot_by_voter(
        &self,
        contest_id: &str,
        voter_name: &str,
    ) -> AppResult<Option<Ballot>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ballots
            .values()
            .find(|b| {
                b.contest_id == contest_id
                    && b.voter_name
                        .as_deref()
                        .is_some_and(|n| n.eq_ignore_ascii_case(voter_name))
            })
            .cloned())
    }
}
