//! Ballot service for business logic.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rankvote_common::{AppError, AppResult, IdGenerator};
use rankvote_store::{Ballot, Contest, ContestStore};
use serde::Deserialize;

/// Input for casting a ballot.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastBallotInput {
    pub rankings: Vec<String>,
    pub voter_name: Option<String>,
}

/// Ballot service.
#[derive(Clone)]
pub struct BallotService {
    store: Arc<dyn ContestStore>,
    id_gen: IdGenerator,
}

impl BallotService {
    /// Create a new ballot service.
    #[must_use]
    pub fn new(store: Arc<dyn ContestStore>) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast a ballot against an open contest.
    ///
    /// Rankings must be a duplicate-free subset of the contest's current
    /// options; entries are matched case-insensitively and stored under
    /// the contest's canonical labels. Casting again under the same
    /// voter name replaces the earlier ballot.
    pub async fn cast(&self, contest_id: &str, input: CastBallotInput) -> AppResult<Ballot> {
        let contest = self
            .store
            .get_contest(contest_id)
            .await?
            .ok_or_else(|| AppError::ContestNotFound(contest_id.to_string()))?;

        let now = Utc::now();
        if !contest.is_open(now) {
            return Err(AppError::Validation(format!(
                "Contest is not open for voting: {contest_id}"
            )));
        }
        if input.rankings.is_empty() {
            return Err(AppError::Validation(
                "Ballot must rank at least one option".to_string(),
            ));
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut rankings: Vec<String> = Vec::with_capacity(input.rankings.len());
        for entry in &input.rankings {
            let entry = entry.trim();
            let Some(canonical) = contest
                .options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(entry))
            else {
                return Err(AppError::Validation(format!("Unknown option: {entry}")));
            };
            if !seen.insert(canonical.to_lowercase()) {
                return Err(AppError::Validation(format!(
                    "Option ranked twice: {canonical}"
                )));
            }
            rankings.push(canonical.clone());
        }

        let voter_name = input
            .voter_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        // A named voter keeps one ballot: resubmission replaces it.
        let id = match voter_name {
            Some(ref name) => match self.store.find_ballot_by_voter(contest_id, name).await? {
                Some(existing) => existing.id,
                None => self.id_gen.generate(),
            },
            None => self.id_gen.generate(),
        };

        let ballot = Ballot {
            id,
            contest_id: contest_id.to_string(),
            rankings,
            voter_name,
            created_at: now,
        };
        self.store.put_ballot(ballot.clone()).await?;
        tracing::debug!(contest_id = %contest_id, ballot_id = %ballot.id, "Ballot cast");
        Ok(ballot)
    }

    /// Delete a ballot by admin credential.
    pub async fn delete(&self, contest_id: &str, ballot_id: &str, token: &str) -> AppResult<()> {
        let contest = self
            .store
            .get_contest(contest_id)
            .await?
            .ok_or_else(|| AppError::ContestNotFound(contest_id.to_string()))?;
        verify_admin(&contest, token)?;

        let ballots = self.store.ballots_for_contest(contest_id).await?;
        if !ballots.iter().any(|b| b.id == ballot_id) {
            return Err(AppError::BallotNotFound(ballot_id.to_string()));
        }
        self.store.delete_ballot(ballot_id).await
    }

    /// List a contest's ballots, oldest first.
    pub async fn list(&self, contest_id: &str) -> AppResult<Vec<Ballot>> {
        if self.store.get_contest(contest_id).await?.is_none() {
            return Err(AppError::ContestNotFound(contest_id.to_string()));
        }
        self.store.ballots_for_contest(contest_id).await
    }
}

fn verify_admin(contest: &Contest, token: &str) -> AppResult<()> {
    if contest.admin_token == token {
        Ok(())
    } else {
        Err(AppError::Forbidden("Invalid admin credential".to_string()))
    }
}
