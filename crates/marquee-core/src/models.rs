//! Core data models shared by the store, the normalizer, and the HTTP layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A movie as stored by Marquee, keyed by its IMDb identifier.
///
/// `imdb_rating` stays textual because OMDb reports `"N/A"` for unrated
/// titles. `ratings` is opaque structured data passed through from OMDb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub imdb_id: String,
    pub title: String,
    pub year: i64,
    pub rated: String,
    pub released: NaiveDate,
    pub runtime: String,
    pub genre: Vec<String>,
    pub director: String,
    pub writer: String,
    pub actors: String,
    pub plot: String,
    pub language: Vec<String>,
    pub country: Vec<String>,
    pub awards: String,
    pub poster: String,
    pub ratings: serde_json::Value,
    pub metascore: i64,
    pub imdb_rating: String,
    pub imdb_votes: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub dvd: NaiveDate,
    pub box_office: String,
    pub production: String,
    pub website: String,
}

/// A user comment attached to exactly one movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// IMDb id of the parent movie.
    pub movie: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A comment about to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub movie: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Number of comments a movie received inside a date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTally {
    pub imdb_id: String,
    pub total_comments: i64,
}

/// One row of the top-commented listing. Computed per query, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedMovieEntry {
    pub imdb_id: String,
    pub total_comments: i64,
    pub rank: usize,
}

#[cfg(test)]
impl Movie {
    /// A fully populated movie for tests.
    pub(crate) fn sample(imdb_id: &str) -> Self {
        Movie {
            imdb_id: imdb_id.to_string(),
            title: "TestMovie".to_string(),
            year: 2018,
            rated: "PG-13".to_string(),
            released: NaiveDate::from_ymd_opt(2018, 6, 1).unwrap(),
            runtime: "65 min".to_string(),
            genre: vec!["Action".to_string(), "Sci-Fi".to_string()],
            director: "Kowalski".to_string(),
            writer: "John Smith".to_string(),
            actors: "Joseph Marshall, Ian King".to_string(),
            plot: "Some twisted plot".to_string(),
            language: vec!["English".to_string()],
            country: vec!["USA".to_string()],
            awards: "Won 2 Oscars.".to_string(),
            poster: "some-poster-path".to_string(),
            ratings: serde_json::json!([]),
            metascore: 65,
            imdb_rating: "5.9".to_string(),
            imdb_votes: 54951,
            kind: "movie".to_string(),
            dvd: NaiveDate::from_ymd_opt(2018, 8, 11).unwrap(),
            box_office: "$512,841".to_string(),
            production: "Some company".to_string(),
            website: "some-website".to_string(),
        }
    }
}
