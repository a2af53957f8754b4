//! Tie-break resolution for elimination rounds.
//!
//! When several options share a round's minimum tally, exactly one must
//! go. The resolver runs an ordered list of narrowing stages; each stage
//! either leaves a sole loser (stop) or a narrowed tied subset (continue
//! with the next stage). Reordering or extending the cascade is a data
//! change to [`STAGES`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which rule decided an elimination, for audit display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakCause {
    /// A single option held the minimum tally; the cascade never ran.
    FewestVotes,
    /// Lowest summed positional support across all ballots.
    WeightedSupport,
    /// Lowest first-round tally among the remaining tied options.
    FirstRoundTotal,
    /// First in ascending option-id order.
    Lexicographic,
}

/// The rule that decided an elimination plus the data it decided on
/// (per-option scores of the stage that settled it).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieBreak {
    /// Deciding rule.
    pub cause: TieBreakCause,
    /// Scores the deciding stage compared, keyed by option.
    pub detail: BTreeMap<String, usize>,
}

impl TieBreak {
    /// Rationale for an elimination that needed no cascade.
    #[must_use]
    pub const fn fewest_votes() -> Self {
        Self {
            cause: TieBreakCause::FewestVotes,
            detail: BTreeMap::new(),
        }
    }
}

/// An elimination decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elimination {
    /// The option leaving the race.
    pub option: String,
    /// Why it was this one.
    pub tie_break: TieBreak,
}

/// Ballot context the stages score against.
struct StageContext<'a> {
    ballots: &'a [Vec<String>],
    first_round: &'a BTreeMap<String, usize>,
}

type NarrowFn = fn(&[String], &StageContext<'_>) -> (Vec<String>, BTreeMap<String, usize>);

/// The cascade, in precedence order.
const STAGES: &[(TieBreakCause, NarrowFn)] = &[
    (TieBreakCause::WeightedSupport, narrow_weighted_support),
    (TieBreakCause::FirstRoundTotal, narrow_first_round_total),
    (TieBreakCause::Lexicographic, narrow_lexicographic),
];

/// Pick the one option to eliminate from those tied at a round's
/// minimum tally.
///
/// Returns `None` only for an empty tied set, which the engine never
/// produces. Deterministic: no stage consults iteration order of
/// anything unsorted.
#[must_use]
pub fn resolve(
    tied_at_minimum: &[String],
    ballots: &[Vec<String>],
    first_round_tallies: &BTreeMap<String, usize>,
) -> Option<Elimination> {
    if tied_at_minimum.is_empty() {
        return None;
    }
    if let [only] = tied_at_minimum {
        return Some(Elimination {
            option: only.clone(),
            tie_break: TieBreak::fewest_votes(),
        });
    }

    let ctx = StageContext {
        ballots,
        first_round: first_round_tallies,
    };

    let mut remaining: Vec<String> = tied_at_minimum.to_vec();
    remaining.sort();

    for (cause, narrow) in STAGES {
        let (narrowed, detail) = narrow(&remaining, &ctx);
        if let [loser] = narrowed.as_slice() {
            return Some(Elimination {
                option: loser.clone(),
                tie_break: TieBreak {
                    cause: *cause,
                    detail,
                },
            });
        }
        remaining = narrowed;
    }

    // The lexicographic stage always narrows to one.
    None
}

/// Keep the options with the least summed positional support.
///
/// An option at rank `i` of a ballot with `n` rankings contributes
/// `n - i`; a ballot that does not rank it contributes nothing.
fn narrow_weighted_support(
    tied: &[String],
    ctx: &StageContext<'_>,
) -> (Vec<String>, BTreeMap<String, usize>) {
    let mut scores: BTreeMap<String, usize> = tied.iter().map(|o| (o.clone(), 0)).collect();
    for ballot in ctx.ballots {
        for (idx, option) in ballot.iter().enumerate() {
            if let Some(score) = scores.get_mut(option) {
                *score += ballot.len() - idx;
            }
        }
    }
    keep_minimum(&scores)
}

/// Keep the options with the least first-round tally.
fn narrow_first_round_total(
    tied: &[String],
    ctx: &StageContext<'_>,
) -> (Vec<String>, BTreeMap<String, usize>) {
    let scores: BTreeMap<String, usize> = tied
        .iter()
        .map(|o| (o.clone(), ctx.first_round.get(o).copied().unwrap_or(0)))
        .collect();
    keep_minimum(&scores)
}

/// Keep the first option in ascending id order.
fn narrow_lexicographic(
    tied: &[String],
    _ctx: &StageContext<'_>,
) -> (Vec<String>, BTreeMap<String, usize>) {
    // Input is kept sorted by resolve().
    let first = tied.first().cloned().into_iter().collect();
    (first, BTreeMap::new())
}

fn keep_minimum(scores: &BTreeMap<String, usize>) -> (Vec<String>, BTreeMap<String, usize>) {
    let min = scores.values().copied().min().unwrap_or(0);
    let kept = scores
        .iter()
        .filter(|&(_, &s)| s == min)
        .map(|(o, _)| o.clone())
        .collect();
    (kept, scores.clone())
}
