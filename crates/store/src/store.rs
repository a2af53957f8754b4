//! The persistence collaborator's contract.
//!
//! Request handlers and the lifecycle scheduler both talk to storage
//! through this trait. Implementations are free to back it with any
//! database; correctness only relies on the conditional mutations being
//! atomic per contest (re-check at the point of mutation), not on
//! cross-contest transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rankvote_common::AppResult;

use crate::ballot::Ballot;
use crate::contest::Contest;

/// Persistence operations over contests and ballots.
#[async_trait]
pub trait ContestStore: Send + Sync {
    // ==================== Contests ====================

    /// Insert a new contest. Fails with a conflict if the id is taken.
    async fn insert_contest(&self, contest: Contest) -> AppResult<()>;

    /// Fetch a contest by id.
    async fn get_contest(&self, id: &str) -> AppResult<Option<Contest>>;

    /// Replace a stored contest wholesale. Used by admin edits.
    async fn update_contest(&self, contest: Contest) -> AppResult<()>;

    /// Delete a contest and every ballot cast against it.
    async fn delete_contest(&self, id: &str) -> AppResult<()>;

    /// Whether a contest id is already taken.
    async fn contest_id_exists(&self, id: &str) -> AppResult<bool>;

    // ==================== Due listings ====================

    /// Open contests whose scheduled auto-close time has passed.
    async fn due_auto_close(&self, now: DateTime<Utc>) -> AppResult<Vec<Contest>>;

    /// Unclosed contests with a channel whose start time has arrived and
    /// whose open notification has not fired.
    async fn due_open_notification(&self, now: DateTime<Utc>) -> AppResult<Vec<Contest>>;

    /// Closed contests with a channel whose close notification has not
    /// fired.
    async fn due_close_notification(&self) -> AppResult<Vec<Contest>>;

    /// Closed contests with a channel, no runoff link, and no tie-runoff
    /// resolution stamp yet.
    async fn due_tie_runoff(&self) -> AppResult<Vec<Contest>>;

    /// Latest instance of each active recurrence group, where that
    /// instance is closed and one period has elapsed since its anchor.
    async fn due_recurrence_spawn(&self, now: DateTime<Utc>) -> AppResult<Vec<Contest>>;

    /// Number of recurrence groups with an active rule.
    async fn count_active_groups(&self) -> AppResult<usize>;

    // ==================== Conditional mutations ====================
    //
    // Each re-checks its precondition at the point of mutation and
    // returns whether it won; `false` means a concurrent actor got
    // there first and the caller must not act on the contest.

    /// Close the contest if it is still open.
    async fn close_if_open(&self, id: &str, closed_at: DateTime<Utc>) -> AppResult<bool>;

    /// Stamp the open notification if it has not fired yet.
    async fn set_open_notified_if_unset(&self, id: &str, at: DateTime<Utc>) -> AppResult<bool>;

    /// Stamp the close notification if it has not fired yet.
    async fn set_close_notified_if_unset(&self, id: &str, at: DateTime<Utc>) -> AppResult<bool>;

    /// Set the runoff link if the contest has none yet.
    async fn link_runoff_if_unset(&self, id: &str, runoff_id: &str) -> AppResult<bool>;

    /// Stamp the contest as resolved by the tie-runoff pass.
    async fn mark_runoff_checked(&self, id: &str, at: DateTime<Utc>) -> AppResult<()>;

    // ==================== Ballots ====================

    /// Insert or replace a ballot.
    async fn put_ballot(&self, ballot: Ballot) -> AppResult<()>;

    /// Delete a ballot by id.
    async fn delete_ballot(&self, id: &str) -> AppResult<()>;

    /// All ballots cast against a contest, oldest first.
    async fn ballots_for_contest(&self, contest_id: &str) -> AppResult<Vec<Ballot>>;

    /// The ballot a named voter cast against a contest, if any.
    async fn find_ballot_by_voter(
        &self,
        contest_id: &str,
        voter_name: &str,
    ) -> AppResult<Option<Ballot>>;
}
