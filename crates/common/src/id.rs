//! ID generation utilities.
//!
//! Two kinds of identifiers live here: opaque entity IDs (ballots,
//! credentials) and the human-readable contest identifiers built from a
//! title/date template.

use std::future::Future;

use chrono::{DateTime, Utc};
use ulid::Ulid;
use uuid::Uuid;

use crate::error::AppResult;

/// Maximum length of a contest identifier.
pub const MAX_CONTEST_ID_LEN: usize = 32;

/// Minimum length of a contest identifier.
pub const MIN_CONTEST_ID_LEN: usize = 3;

/// Default identifier template.
pub const DEFAULT_ID_TEMPLATE: &str = "{title}-{close-mm-dd-yyyy}";

/// Literal used when a title slugifies to nothing.
const SLUG_FALLBACK: &str = "contest";

/// Attempts with numeric suffixes before falling back to a timestamp.
const UNIQUE_RETRY_CEILING: u32 = 50;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are lexicographically sortable and shorter than UUIDs when
    /// represented as strings.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate an opaque admin credential.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // UUID v4 for tokens (no time component)
        Uuid::new_v4().simple().to_string()
    }
}

/// Normalize a string into the contest identifier alphabet `[a-z0-9-]`.
///
/// Lowercases, collapses whitespace/underscore runs to a single dash,
/// strips everything else outside the alphabet, collapses repeated
/// dashes, and trims leading/trailing dashes. An input that normalizes
/// to nothing yields a fixed fallback literal.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_dash = true; // suppress leading dashes
    for ch in input.to_lowercase().chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            if !last_dash {
                out.push('-');
                last_dash = true;
            }
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_dash = false;
        }
        // anything else is outside the alphabet and dropped
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        out
    }
}

/// Build a candidate contest identifier from a title, dates, and an
/// optional template.
///
/// Supported tokens: `{title}`, `{close-mm-dd-yyyy}`, `{close-yyyy-mm-dd}`,
/// `{start-mm-dd-yyyy}`, `{start-yyyy-mm-dd}`. Start tokens expand to
/// nothing when no start time is given. The expanded result is normalized
/// through the slug alphabet and truncated to the identifier cap.
#[must_use]
pub fn build_id(
    title: &str,
    close_at: DateTime<Utc>,
    start_at: Option<DateTime<Utc>>,
    format: Option<&str>,
) -> String {
    let template = format.unwrap_or(DEFAULT_ID_TEMPLATE);

    let expanded = template
        .replace("{title}", &slugify(title))
        .replace("{close-mm-dd-yyyy}", &close_at.format("%m-%d-%Y").to_string())
        .replace("{close-yyyy-mm-dd}", &close_at.format("%Y-%m-%d").to_string())
        .replace(
            "{start-mm-dd-yyyy}",
            &start_at.map_or_else(String::new, |s| s.format("%m-%d-%Y").to_string()),
        )
        .replace(
            "{start-yyyy-mm-dd}",
            &start_at.map_or_else(String::new, |s| s.format("%Y-%m-%d").to_string()),
        );

    let mut slug = slugify(&expanded);
    if slug.len() < MIN_CONTEST_ID_LEN {
        slug = format!("{slug}-{SLUG_FALLBACK}");
    }
    slug.truncate(MAX_CONTEST_ID_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Resolve a candidate identifier to one the store does not know yet.
///
/// Appends `-2`, `-3`, ... (truncating the base so the result respects
/// the identifier cap) until `exists` reports no collision. After a
/// bounded number of attempts a timestamp suffix guarantees termination.
pub async fn unique_id<F, Fut>(candidate: &str, exists: F) -> AppResult<String>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    if !exists(candidate.to_string()).await? {
        return Ok(candidate.to_string());
    }

    for n in 2..=UNIQUE_RETRY_CEILING {
        let attempt = with_suffix(candidate, &n.to_string());
        if !exists(attempt.clone()).await? {
            return Ok(attempt);
        }
    }

    // Collision storm. A second-resolution timestamp ends the search.
    let stamp = Utc::now().timestamp().to_string();
    Ok(with_suffix(candidate, &stamp))
}

/// Append `-{suffix}` to `base`, truncating `base` so the result fits
/// the identifier cap.
fn with_suffix(base: &str, suffix: &str) -> String {
    let keep = MAX_CONTEST_ID_LEN.saturating_sub(suffix.len() + 1);
    let mut head = base[..base.len().min(keep)].to_string();
    while head.ends_with('-') {
        head.pop();
    }
    format!("{head}-{suffix}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn close_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_ne!(id1, id2);
        assert_eq!(id1, id1.to_lowercase());
    }

    #[test]
    fn test_generate_token() {
        let id_gen = IdGenerator::new();
        let token = id_gen.generate_token();

        assert_eq!(token.len(), 32); // Simple UUID without hyphens
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Board Election"), "board-election");
        assert_eq!(slugify("  lots   of\tspace "), "lots-of-space");
        assert_eq!(slugify("snake_case_title"), "snake-case-title");
    }

    #[test]
    fn test_slugify_strips_and_collapses() {
        assert_eq!(slugify("Q1: budget (final)!"), "q1-budget-final");
        assert_eq!(slugify("--a----b--"), "a-b");
        assert_eq!(slugify("Ünïcödé"), "ncd");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify(""), "contest");
        assert_eq!(slugify("!!! ***"), "contest");
    }

    #[test]
    fn test_build_id_default_template() {
        let id = build_id("Board Election", close_at(), None, None);
        assert_eq!(id, "board-election-03-09-2024");
    }

    #[test]
    fn test_build_id_custom_template() {
        let id = build_id(
            "Weekly Lunch",
            close_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 18, 0, 0).unwrap()),
            Some("{title}-{start-yyyy-mm-dd}"),
        );
        assert_eq!(id, "weekly-lunch-2024-03-02");
    }

    #[test]
    fn test_build_id_start_tokens_empty_without_start() {
        let id = build_id("Lunch", close_at(), None, Some("{title}-{start-yyyy-mm-dd}"));
        assert_eq!(id, "lunch");
    }

    #[test]
    fn test_build_id_respects_cap() {
        let id = build_id(
            "an extremely long contest title that keeps going",
            close_at(),
            None,
            None,
        );
        assert!(id.len() <= MAX_CONTEST_ID_LEN);
        assert!(!id.ends_with('-'));
    }

    #[test]
    fn test_build_id_pads_tiny_slug() {
        let id = build_id("ab", close_at(), None, Some("{title}"));
        assert_eq!(id, "ab-contest");
        assert!(id.len() >= MIN_CONTEST_ID_LEN);
    }

    #[tokio::test]
    async fn test_unique_id_no_collision() {
        let id = unique_id("board-election", |_| async { Ok(false) })
            .await
            .unwrap();
        assert_eq!(id, "board-election");
    }

    #[tokio::test]
    async fn test_unique_id_appends_counter() {
        let taken = ["poll", "poll-2", "poll-3"];
        let id = unique_id("poll", |cand| async move {
            Ok(taken.contains(&cand.as_str()))
        })
        .await
        .unwrap();
        assert_eq!(id, "poll-4");
    }

    #[tokio::test]
    async fn test_unique_id_truncates_for_suffix() {
        let base = "a".repeat(MAX_CONTEST_ID_LEN);
        let long = base.clone();
        let id = unique_id(&base, move |cand| {
            let long = long.clone();
            async move { Ok(cand == long) }
        })
        .await
        .unwrap();
        assert!(id.len() <= MAX_CONTEST_ID_LEN);
        assert!(id.ends_with("-2"));
    }

    #[tokio::test]
    async fn test_unique_id_timestamp_fallback_terminates() {
        // Everything with a numeric suffix collides.
        let id = unique_id("poll", |cand| async move {
            Ok(!cand.contains(&Utc::now().timestamp().to_string()))
        })
        .await
        .unwrap();
        assert!(id.len() <= MAX_CONTEST_ID_LEN);
        assert!(id.starts_with("poll-"));
    }
}
