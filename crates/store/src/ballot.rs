//! Ballot entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One voter's ranked preference list against a contest.
///
/// Rankings are an ordered, duplicate-free subset of the contest's
/// current options. A ballot is immutable except for deletion and for
/// truncation when the contest's option set shrinks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Opaque ballot identifier.
    pub id: String,

    /// Contest this ballot belongs to.
    pub contest_id: String,

    /// Ranked option labels, most preferred first.
    pub rankings: Vec<String>,

    /// Voter name, if the voter gave one.
    pub voter_name: Option<String>,

    /// When the ballot was cast.
    pub created_at: DateTime<Utc>,
}

impl Ballot {
    /// Strip rankings that are no longer in `options`, preserving the
    /// order of the rest. Returns whether anything was removed.
    pub fn retain_options(&mut self, options: &[String]) -> bool {
        let before = self.rankings.len();
        self.rankings.retain(|r| options.contains(r));
        self.rankings.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_options_preserves_order() {
        let mut ballot = Ballot {
            id: "b1".to_string(),
            contest_id: "c1".to_string(),
            rankings: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            voter_name: None,
            created_at: Utc::now(),
        };
        let removed = ballot.retain_options(&["c".to_string(), "a".to_string()]);
        assert!(removed);
        assert_eq!(ballot.rankings, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_retain_options_noop() {
        let mut ballot = Ballot {
            id: "b1".to_string(),
            contest_id: "c1".to_string(),
            rankings: vec!["a".to_string()],
            voter_name: None,
            created_at: Utc::now(),
        };
        assert!(!ballot.retain_options(&["a".to_string(), "b".to_string()]));
        assert_eq!(ballot.rankings, vec!["a".to_string()]);
    }
}
