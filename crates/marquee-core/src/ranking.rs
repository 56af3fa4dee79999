//! Top-commented movies within a date range.
//!
//! # Ranking Algorithm
//!
//! 1. Ask the store for per-movie comment counts inside the range.
//! 2. Drop movies with no comments.
//! 3. Sort by count (desc), then IMDb id (asc).
//! 4. Keep the first `limit` rows (a tie across the cut is not extended).
//! 5. Assign competition ranks: ties share the rank of their first row,
//!    the next distinct count takes its 1-based position. Counts
//!    `[2, 2, 1]` rank as `[1, 1, 3]`.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};

use crate::models::{CommentTally, RankedMovieEntry};
use crate::store::{Store, StoreError};
use crate::validation::{ValidationError, REQUIRED};

/// Number of rows in the top-commented listing.
pub const TOP_MOVIES_LIMIT: usize = 5;

/// Format of the `date_after` / `date_before` parameters.
pub const DATE_PARAM_FORMAT: &str = "%Y-%m-%d";

const WRONG_DATE_FORMAT: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

/// An inclusive range of calendar days (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub after: NaiveDate,
    pub before: NaiveDate,
}

impl DateRange {
    pub fn new(after: NaiveDate, before: NaiveDate) -> Self {
        Self { after, before }
    }

    /// Parse both bounds. Both are required; problems with either are
    /// reported together.
    pub fn from_params(
        date_after: Option<&str>,
        date_before: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();
        let after = parse_bound(&mut errors, "date_after", date_after);
        let before = parse_bound(&mut errors, "date_before", date_before);
        match (after, before) {
            (Some(after), Some(before)) if errors.is_empty() => Ok(Self { after, before }),
            _ => Err(errors),
        }
    }

    /// Half-open instant interval `[after 00:00, (before + 1 day) 00:00)`.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.after.and_time(NaiveTime::MIN).and_utc();
        let end = self
            .before
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_add_signed(TimeDelta::days(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        (start, end)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds();
        ts >= start && ts < end
    }
}

fn parse_bound(
    errors: &mut ValidationError,
    name: &str,
    raw: Option<&str>,
) -> Option<NaiveDate> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => {
            errors.add(name, REQUIRED);
            None
        }
        Some(s) => match NaiveDate::parse_from_str(s, DATE_PARAM_FORMAT) {
            Ok(d) => Some(d),
            Err(_) => {
                errors.add(name, WRONG_DATE_FORMAT);
                None
            }
        },
    }
}

/// Order tallies, cap them at `limit`, and assign competition ranks.
pub fn rank_top(mut tallies: Vec<CommentTally>, limit: usize) -> Vec<RankedMovieEntry> {
    tallies.retain(|t| t.total_comments > 0);
    tallies.sort_by(|a, b| {
        b.total_comments
            .cmp(&a.total_comments)
            .then(a.imdb_id.cmp(&b.imdb_id))
    });
    tallies.truncate(limit);
    assign_ranks(tallies)
}

/// Competition ranking over tallies already sorted by count descending.
pub fn assign_ranks(sorted: Vec<CommentTally>) -> Vec<RankedMovieEntry> {
    let mut ranked: Vec<RankedMovieEntry> = Vec::with_capacity(sorted.len());
    for (i, tally) in sorted.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev) if prev.total_comments == tally.total_comments => prev.rank,
            _ => i + 1,
        };
        ranked.push(RankedMovieEntry {
            imdb_id: tally.imdb_id,
            total_comments: tally.total_comments,
            rank,
        });
    }
    ranked
}

/// The `limit` most commented movies in `range`, ranked.
pub async fn top_commented<S: Store + ?Sized>(
    store: &S,
    range: &DateRange,
    limit: usize,
) -> Result<Vec<RankedMovieEntry>, StoreError> {
    let (start, end) = range.bounds();
    let tallies = store.comment_counts(start, end).await?;
    Ok(rank_top(tallies, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Movie, NewComment};
    use crate::store::memory::InMemoryStore;
    use chrono::TimeZone;

    fn tally(id: &str, n: i64) -> CommentTally {
        CommentTally {
            imdb_id: id.to_string(),
            total_comments: n,
        }
    }

    fn ranks(entries: &[RankedMovieEntry]) -> Vec<usize> {
        entries.iter().map(|e| e.rank).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ties_share_rank_and_next_jumps() {
        let ranked = rank_top(vec![tally("a", 1), tally("b", 2), tally("c", 2)], 5);
        assert_eq!(ranks(&ranked), vec![1, 1, 3]);
        let counts: Vec<i64> = ranked.iter().map(|e| e.total_comments).collect();
        assert_eq!(counts, vec![2, 2, 1]);
    }

    #[test]
    fn test_longer_tie_groups() {
        let ranked = rank_top(
            vec![
                tally("a", 5),
                tally("b", 3),
                tally("c", 3),
                tally("d", 3),
                tally("e", 1),
            ],
            5,
        );
        assert_eq!(ranks(&ranked), vec![1, 2, 2, 2, 5]);
    }

    #[test]
    fn test_ties_broken_by_imdb_id() {
        let ranked = rank_top(vec![tally("tt9", 2), tally("tt1", 2), tally("tt5", 2)], 5);
        let ids: Vec<&str> = ranked.iter().map(|e| e.imdb_id.as_str()).collect();
        assert_eq!(ids, vec!["tt1", "tt5", "tt9"]);
        assert_eq!(ranks(&ranked), vec![1, 1, 1]);
    }

    #[test]
    fn test_strict_cap_across_tie() {
        let tallies = (1..=7).map(|i| tally(&format!("tt{}", i), 1)).collect();
        let ranked = rank_top(tallies, TOP_MOVIES_LIMIT);
        assert_eq!(ranked.len(), 5);
        assert!(ranked.iter().all(|e| e.rank == 1));
        assert_eq!(ranked[4].imdb_id, "tt5");
    }

    #[test]
    fn test_zero_counts_dropped() {
        let ranked = rank_top(vec![tally("a", 0), tally("b", 1)], 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].imdb_id, "b");
    }

    #[test]
    fn test_missing_bound_named() {
        let err = DateRange::from_params(Some("2024-01-01"), None).unwrap_err();
        assert_eq!(err.messages("date_before").unwrap(), [REQUIRED]);
        assert!(err.messages("date_after").is_none());
    }

    #[test]
    fn test_both_bounds_reported() {
        let err = DateRange::from_params(Some("01/02/2024"), Some("")).unwrap_err();
        assert_eq!(err.messages("date_after").unwrap(), [WRONG_DATE_FORMAT]);
        assert_eq!(err.messages("date_before").unwrap(), [REQUIRED]);
    }

    #[test]
    fn test_range_is_inclusive_of_whole_days() {
        let range = DateRange::from_params(Some("2024-03-02"), Some("2024-03-03")).unwrap();
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap()));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap()));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 3, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn test_top_commented_filters_range() {
        let store = InMemoryStore::new();
        for id in ["tt1", "tt2", "tt3"] {
            store.insert_movie(&Movie::sample(id)).await.unwrap();
        }
        let add = |movie: &str, day: u32| NewComment {
            movie: movie.to_string(),
            text: "x".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 8, 30, 0).unwrap(),
        };
        for c in [
            add("tt1", 10),
            add("tt2", 10),
            add("tt2", 11),
            add("tt2", 20),
            add("tt3", 20),
        ] {
            store.insert_comment(&c).await.unwrap();
        }

        let range = DateRange::new(date(2024, 3, 10), date(2024, 3, 11));
        let top = top_commented(&store, &range, TOP_MOVIES_LIMIT).await.unwrap();
        assert_eq!(
            top,
            vec![
                RankedMovieEntry {
                    imdb_id: "tt2".to_string(),
                    total_comments: 2,
                    rank: 1
                },
                RankedMovieEntry {
                    imdb_id: "tt1".to_string(),
                    total_comments: 1,
                    rank: 2
                },
            ]
        );
    }
}
