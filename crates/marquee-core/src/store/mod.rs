//! Storage abstraction for Marquee.
//!
//! The [`Store`] trait defines the persistence operations needed by the
//! catalog and ranking logic, enabling pluggable backends (SQLite in the
//! application crate, [`memory::InMemoryStore`] for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Comment, CommentTally, Movie, NewComment};
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A movie with this IMDb id is already stored.
    #[error("movie already exists: {0}")]
    DuplicateMovie(String),
    /// A comment referenced a movie that is not stored.
    #[error("movie not found: {0}")]
    MovieNotFound(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Exact-match filters for movie listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub year: Option<i64>,
    pub imdb_id: Option<String>,
}

impl MovieFilter {
    /// Build a filter from query parameters. Empty values are ignored.
    pub fn from_params(
        title: Option<&str>,
        year: Option<&str>,
        imdb_id: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);

        let year = match year.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(s) => Some(
                s.parse::<i64>()
                    .map_err(|_| ValidationError::field("year", "Enter a number."))?,
            ),
        };

        Ok(Self {
            title: non_empty(title),
            year,
            imdb_id: non_empty(imdb_id),
        })
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        self.title.as_ref().map_or(true, |t| *t == movie.title)
            && self.year.map_or(true, |y| y == movie.year)
            && self.imdb_id.as_ref().map_or(true, |id| *id == movie.imdb_id)
    }
}

/// Movie fields a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    ImdbId,
    Title,
    Year,
    Rated,
    Released,
    Runtime,
    Metascore,
    ImdbRating,
    ImdbVotes,
    Type,
    Dvd,
    BoxOffice,
    Production,
}

impl SortField {
    pub const ALL: [SortField; 13] = [
        SortField::ImdbId,
        SortField::Title,
        SortField::Year,
        SortField::Rated,
        SortField::Released,
        SortField::Runtime,
        SortField::Metascore,
        SortField::ImdbRating,
        SortField::ImdbVotes,
        SortField::Type,
        SortField::Dvd,
        SortField::BoxOffice,
        SortField::Production,
    ];

    /// Field name as exposed in the API and used as the column name.
    pub fn name(self) -> &'static str {
        match self {
            SortField::ImdbId => "imdb_id",
            SortField::Title => "title",
            SortField::Year => "year",
            SortField::Rated => "rated",
            SortField::Released => "released",
            SortField::Runtime => "runtime",
            SortField::Metascore => "metascore",
            SortField::ImdbRating => "imdb_rating",
            SortField::ImdbVotes => "imdb_votes",
            SortField::Type => "type",
            SortField::Dvd => "dvd",
            SortField::BoxOffice => "box_office",
            SortField::Production => "production",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn compare(self, a: &Movie, b: &Movie) -> Ordering {
        match self {
            SortField::ImdbId => a.imdb_id.cmp(&b.imdb_id),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Year => a.year.cmp(&b.year),
            SortField::Rated => a.rated.cmp(&b.rated),
            SortField::Released => a.released.cmp(&b.released),
            SortField::Runtime => a.runtime.cmp(&b.runtime),
            SortField::Metascore => a.metascore.cmp(&b.metascore),
            SortField::ImdbRating => a.imdb_rating.cmp(&b.imdb_rating),
            SortField::ImdbVotes => a.imdb_votes.cmp(&b.imdb_votes),
            SortField::Type => a.kind.cmp(&b.kind),
            SortField::Dvd => a.dvd.cmp(&b.dvd),
            SortField::BoxOffice => a.box_office.cmp(&b.box_office),
            SortField::Production => a.production.cmp(&b.production),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

/// Parse an `ordering` parameter such as `-year,title`.
///
/// Unknown field names are skipped.
pub fn parse_ordering(raw: &str) -> Vec<SortKey> {
    raw.split(',')
        .map(str::trim)
        .filter_map(|term| {
            let (descending, name) = match term.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, term),
            };
            SortField::from_name(name).map(|field| SortKey { field, descending })
        })
        .collect()
}

/// Compare two movies by `keys`, falling back to `imdb_id` ascending.
pub fn compare_movies(keys: &[SortKey], a: &Movie, b: &Movie) -> Ordering {
    keys.iter()
        .map(|k| {
            let ord = k.field.compare(a, b);
            if k.descending {
                ord.reverse()
            } else {
                ord
            }
        })
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| a.imdb_id.cmp(&b.imdb_id))
}

/// Abstract storage backend for Marquee.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_movie`](Store::insert_movie) | Insert a new movie; duplicates are rejected |
/// | [`get_movie`](Store::get_movie) | Fetch a movie by IMDb id |
/// | [`count_movies`](Store::count_movies) / [`list_movies`](Store::list_movies) | Filtered, ordered movie listing |
/// | [`delete_movie`](Store::delete_movie) | Delete a movie and its comments |
/// | [`insert_comment`](Store::insert_comment) | Insert a comment, assigning its id |
/// | [`count_comments`](Store::count_comments) / [`list_comments`](Store::list_comments) | Comment listing, optionally per movie |
/// | [`comment_counts`](Store::comment_counts) | Per-movie comment counts inside a time interval |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a movie. Fails with [`StoreError::DuplicateMovie`] if the
    /// IMDb id is taken; nothing is written in that case.
    async fn insert_movie(&self, movie: &Movie) -> Result<(), StoreError>;

    async fn get_movie(&self, imdb_id: &str) -> Result<Option<Movie>, StoreError>;

    async fn count_movies(&self, filter: &MovieFilter) -> Result<usize, StoreError>;

    /// Movies matching `filter`, ordered by `ordering` then `imdb_id`.
    async fn list_movies(
        &self,
        filter: &MovieFilter,
        ordering: &[SortKey],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Movie>, StoreError>;

    /// Delete a movie together with its comments. Returns whether it existed.
    async fn delete_movie(&self, imdb_id: &str) -> Result<bool, StoreError>;

    /// Insert a comment. Fails with [`StoreError::MovieNotFound`] if the
    /// parent movie is not stored.
    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, StoreError>;

    async fn count_comments(&self, movie: Option<&str>) -> Result<usize, StoreError>;

    /// Comments ordered by id, optionally restricted to one movie.
    async fn list_comments(
        &self,
        movie: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>, StoreError>;

    /// Comment count per movie for comments created in `[start, end)`.
    /// Movies without comments in the interval are omitted.
    async fn comment_counts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CommentTally>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ordering() {
        let keys = parse_ordering("-year, title,bogus,-");
        assert_eq!(
            keys,
            vec![
                SortKey {
                    field: SortField::Year,
                    descending: true
                },
                SortKey {
                    field: SortField::Title,
                    descending: false
                },
            ]
        );
        assert!(parse_ordering("").is_empty());
    }

    #[test]
    fn test_filter_from_params() {
        let f = MovieFilter::from_params(Some("Heat"), Some(" 1995 "), Some("")).unwrap();
        assert_eq!(f.title.as_deref(), Some("Heat"));
        assert_eq!(f.year, Some(1995));
        assert_eq!(f.imdb_id, None);

        let err = MovieFilter::from_params(None, Some("199x"), None).unwrap_err();
        assert_eq!(err.messages("year").unwrap(), ["Enter a number."]);
    }

    #[test]
    fn test_sort_field_names_round_trip() {
        for field in SortField::ALL {
            assert_eq!(SortField::from_name(field.name()), Some(field));
        }
    }
}
