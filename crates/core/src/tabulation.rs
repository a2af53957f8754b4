//! Instant-runoff tabulation.
//!
//! [`tabulate`] is a total, pure function: for any option set and any
//! ballot list it produces a result without panicking, and identical
//! input yields identical output on every call. All intermediate state
//! lives in ordered collections so enumeration order can never leak
//! into the outcome.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::tiebreak::{self, TieBreak};

/// One tabulation round over the standing option set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Round number, starting at 1.
    pub number: usize,
    /// Tally per standing option.
    pub tallies: BTreeMap<String, usize>,
    /// Ballots that still ranked a standing option this round.
    pub active_ballots: usize,
    /// Option eliminated this round, if the round eliminated one.
    pub eliminated: Option<String>,
    /// Rationale for the elimination, when one happened.
    pub tie_break: Option<TieBreak>,
    /// Winner, if this round produced one.
    pub winner: Option<String>,
}

/// Outcome of an instant-runoff tabulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrvResult {
    /// The winning option, if the ballots produced one.
    pub winner: Option<String>,
    /// Whether tabulation ended in a pure tie.
    pub is_tie: bool,
    /// The tied options, sorted, when `is_tie` is set.
    pub tied_options: Vec<String>,
    /// Every ballot cast, including ones exhausted along the way.
    pub total_ballots: usize,
    /// Per-round record for audit display.
    pub rounds: Vec<Round>,
}

impl IrvResult {
    fn empty(total_ballots: usize) -> Self {
        Self {
            winner: None,
            is_tie: false,
            tied_options: Vec::new(),
            total_ballots,
            rounds: Vec::new(),
        }
    }
}

/// Tabulate ranked ballots over an option set.
///
/// Rules, per round over a shrinking standing set:
/// 1. Each ballot counts for its highest-ranked standing option; a
///    ballot with none left is exhausted for the round.
/// 2. An option with strictly more than half the active ballots wins
///    outright. An exact 50/50 split is not a majority.
/// 3. If every standing option shares the minimum tally the contest is
///    a pure tie and tabulation stops.
/// 4. Otherwise exactly one option at the minimum is eliminated (see
///    [`tiebreak::resolve`]) and the next round begins.
/// 5. A sole survivor wins regardless of its share of the total.
///
/// Degenerate inputs are defined, not errors: no options means no
/// winner and no rounds; options without ballots tie by definition.
#[must_use]
pub fn tabulate(options: &[String], ballots: &[Vec<String>]) -> IrvResult {
    let total_ballots = ballots.len();

    if options.is_empty() {
        return IrvResult::empty(total_ballots);
    }

    if ballots.is_empty() {
        let mut tied: Vec<String> = options.to_vec();
        tied.sort();
        tied.dedup();
        return IrvResult {
            is_tie: true,
            tied_options: tied,
            ..IrvResult::empty(total_ballots)
        };
    }

    let mut standing: BTreeSet<String> = options.iter().cloned().collect();
    let mut rounds: Vec<Round> = Vec::new();
    let mut first_round_tallies: BTreeMap<String, usize> = BTreeMap::new();

    loop {
        let number = rounds.len() + 1;
        let (tallies, active_ballots) = count_round(&standing, ballots);
        if number == 1 {
            first_round_tallies.clone_from(&tallies);
        }

        // Sole survivor wins, majority or not.
        if standing.len() == 1 {
            let winner = standing.iter().next().cloned();
            rounds.push(Round {
                number,
                tallies,
                active_ballots,
                eliminated: None,
                tie_break: None,
                winner: winner.clone(),
            });
            return IrvResult {
                winner,
                total_ballots,
                rounds,
                ..IrvResult::empty(total_ballots)
            };
        }

        // Strict majority of active ballots. 2t > active is the integer
        // form of t > active/2, so a 50/50 split does not pass.
        let majority = tallies
            .iter()
            .find(|&(_, &t)| 2 * t > active_ballots)
            .map(|(option, _)| option.clone());
        if let Some(winner) = majority {
            rounds.push(Round {
                number,
                tallies,
                active_ballots,
                eliminated: None,
                tie_break: None,
                winner: Some(winner.clone()),
            });
            return IrvResult {
                winner: Some(winner),
                total_ballots,
                rounds,
                ..IrvResult::empty(total_ballots)
            };
        }

        let min = tallies.values().copied().min().unwrap_or(0);
        let at_minimum: Vec<String> = tallies
            .iter()
            .filter(|&(_, &t)| t == min)
            .map(|(option, _)| option.clone())
            .collect();

        // Everyone at the minimum: a pure tie, nothing left to narrow.
        if at_minimum.len() == standing.len() {
            rounds.push(Round {
                number,
                tallies,
                active_ballots,
                eliminated: None,
                tie_break: None,
                winner: None,
            });
            return IrvResult {
                is_tie: true,
                tied_options: at_minimum,
                total_ballots,
                rounds,
                ..IrvResult::empty(total_ballots)
            };
        }

        let Some(elimination) = tiebreak::resolve(&at_minimum, ballots, &first_round_tallies)
        else {
            // Unreachable: at_minimum is non-empty by construction.
            return IrvResult {
                total_ballots,
                rounds,
                ..IrvResult::empty(total_ballots)
            };
        };

        standing.remove(&elimination.option);
        rounds.push(Round {
            number,
            tallies,
            active_ballots,
            eliminated: Some(elimination.option),
            tie_break: Some(elimination.tie_break),
            winner: None,
        });
    }
}

/// Tally each ballot's highest-ranked standing option.
fn count_round(
    standing: &BTreeSet<String>,
    ballots: &[Vec<String>],
) -> (BTreeMap<String, usize>, usize) {
    let mut tallies: BTreeMap<String, usize> =
        standing.iter().map(|o| (o.clone(), 0)).collect();
    let mut active_ballots = 0;

    for ballot in ballots {
        let first_standing = ballot.iter().find(|r| standing.contains(*r));
        if let Some(option) = first_standing {
            if let Some(tally) = tallies.get_mut(option) {
                *tally += 1;
            }
            active_ballots += 1;
        }
        // No standing entry: exhausted for this round.
    }

    (tallies, active_ballots)
}
