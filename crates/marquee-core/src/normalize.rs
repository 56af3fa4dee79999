//! Normalization of OMDb records into [`Movie`]s.
//!
//! OMDb answers a title lookup with a flat JSON object whose values are
//! almost all strings, using its own field names (`Title`, `imdbID`,
//! `imdbVotes`, …). [`normalize`] validates that object and reshapes it into
//! the internal schema:
//!
//! | External | Treatment |
//! |----------|-----------|
//! | `Year`, `Metascore` | decimal text → integer |
//! | `imdbVotes` | thousands separators removed, then → integer |
//! | `Released`, `DVD` | `01 Jun 2018` → calendar date |
//! | `Genre`, `Language`, `Country` | `"Action, Sci-Fi"` → `["Action", "Sci-Fi"]` |
//! | `Ratings` | passed through unchanged |
//! | everything else | trimmed, non-blank text |
//!
//! All fields are required. Failures are collected for every field and
//! reported together, keyed by the external field name.

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::Movie;
use crate::validation::{
    ValidationError, NOT_AN_INTEGER, NOT_A_STRING, NOT_BLANK, NOT_NULL, REQUIRED,
};

/// A raw OMDb response body.
pub type ExternalRecord = serde_json::Map<String, Value>;

/// `strftime` format of OMDb dates (`01 Jun 2018`).
pub const EXTERNAL_DATE_FORMAT: &str = "%d %b %Y";

const WRONG_DATE_FORMAT: &str =
    "Date has wrong format. Use one of these formats instead: DD [Jan-Dec] YYYY.";

/// External (OMDb) field name → internal [`Movie`] field name.
pub const EXTERNAL_FIELDS: [(&str, &str); 24] = [
    ("Title", "title"),
    ("Year", "year"),
    ("Rated", "rated"),
    ("Released", "released"),
    ("Runtime", "runtime"),
    ("Genre", "genre"),
    ("Director", "director"),
    ("Writer", "writer"),
    ("Actors", "actors"),
    ("Plot", "plot"),
    ("Language", "language"),
    ("Country", "country"),
    ("Awards", "awards"),
    ("Poster", "poster"),
    ("Ratings", "ratings"),
    ("Metascore", "metascore"),
    ("imdbRating", "imdb_rating"),
    ("imdbVotes", "imdb_votes"),
    ("imdbID", "imdb_id"),
    ("Type", "type"),
    ("DVD", "dvd"),
    ("BoxOffice", "box_office"),
    ("Production", "production"),
    ("Website", "website"),
];

/// Internal name for an OMDb field.
pub fn internal_name(external: &str) -> Option<&'static str> {
    EXTERNAL_FIELDS
        .iter()
        .find(|(ext, _)| *ext == external)
        .map(|(_, int)| *int)
}

/// OMDb name for an internal field.
pub fn external_name(internal: &str) -> Option<&'static str> {
    EXTERNAL_FIELDS
        .iter()
        .find(|(_, int)| *int == internal)
        .map(|(ext, _)| *ext)
}

/// Validate an OMDb record and reshape it into a [`Movie`].
///
/// The record is only read. Keys outside [`EXTERNAL_FIELDS`] (such as
/// `Response`) are ignored.
pub fn normalize(record: &ExternalRecord) -> Result<Movie, ValidationError> {
    let mut r = FieldReader::new(record);

    let title = r.text("Title", Some(255));
    let year = r.integer("Year");
    let rated = r.text("Rated", Some(63));
    let released = r.date("Released");
    let runtime = r.text("Runtime", Some(63));
    let genre = r.list("Genre", 1023);
    let director = r.text("Director", Some(255));
    let writer = r.text("Writer", Some(255));
    let actors = r.text("Actors", Some(255));
    let plot = r.text("Plot", None);
    let language = r.list("Language", 1023);
    let country = r.list("Country", 1023);
    let awards = r.text("Awards", Some(255));
    let poster = r.text("Poster", Some(255));
    let ratings = r.json("Ratings");
    let metascore = r.integer("Metascore");
    let imdb_rating = r.text("imdbRating", Some(63));
    let imdb_votes = r.votes("imdbVotes");
    let imdb_id = r.text("imdbID", Some(63));
    let kind = r.text("Type", Some(63));
    let dvd = r.date("DVD");
    let box_office = r.text("BoxOffice", Some(63));
    let production = r.text("Production", Some(255));
    let website = r.text("Website", Some(255));

    r.errors.into_result(())?;

    let movie = (|| -> Option<Movie> {
        Some(Movie {
            imdb_id: imdb_id?,
            title: title?,
            year: year?,
            rated: rated?,
            released: released?,
            runtime: runtime?,
            genre: genre?,
            director: director?,
            writer: writer?,
            actors: actors?,
            plot: plot?,
            language: language?,
            country: country?,
            awards: awards?,
            poster: poster?,
            ratings: ratings?,
            metascore: metascore?,
            imdb_rating: imdb_rating?,
            imdb_votes: imdb_votes?,
            kind: kind?,
            dvd: dvd?,
            box_office: box_office?,
            production: production?,
            website: website?,
        })
    })();

    movie.ok_or_else(|| ValidationError::field("non_field_errors", "Incomplete record."))
}

/// Split an OMDb comma list and trim every element.
pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}

/// Reads typed fields out of a record, accumulating per-field errors.
struct FieldReader<'a> {
    record: &'a ExternalRecord,
    errors: ValidationError,
}

impl<'a> FieldReader<'a> {
    fn new(record: &'a ExternalRecord) -> Self {
        Self {
            record,
            errors: ValidationError::new(),
        }
    }

    fn present(&mut self, name: &str) -> Option<&'a Value> {
        match self.record.get(name) {
            None => {
                self.errors.add(name, REQUIRED);
                None
            }
            Some(Value::Null) => {
                self.errors.add(name, NOT_NULL);
                None
            }
            Some(v) => Some(v),
        }
    }

    fn text(&mut self, name: &str, max_len: Option<usize>) -> Option<String> {
        let raw = match self.present(name)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.errors.add(name, NOT_A_STRING);
                return None;
            }
        };
        if raw.is_empty() {
            self.errors.add(name, NOT_BLANK);
            return None;
        }
        if let Some(max) = max_len {
            if raw.chars().count() > max {
                self.errors.add(
                    name,
                    format!("Ensure this field has no more than {} characters.", max),
                );
                return None;
            }
        }
        Some(raw)
    }

    fn integer(&mut self, name: &str) -> Option<i64> {
        let value = self.present(name)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(name, NOT_AN_INTEGER);
        }
        parsed
    }

    /// Vote counts arrive as `"54,951"`.
    fn votes(&mut self, name: &str) -> Option<i64> {
        let value = self.present(name)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.replace(',', "").trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(name, NOT_AN_INTEGER);
        }
        parsed
    }

    fn date(&mut self, name: &str) -> Option<NaiveDate> {
        let parsed = match self.present(name)? {
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), EXTERNAL_DATE_FORMAT).ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(name, WRONG_DATE_FORMAT);
        }
        parsed
    }

    fn list(&mut self, name: &str, max_len: usize) -> Option<Vec<String>> {
        self.text(name, Some(max_len)).map(|s| split_list(&s))
    }

    fn json(&mut self, name: &str) -> Option<Value> {
        self.present(name).cloned()
    }
}

/// Whole floats inside the `i64` range. `i64::MAX as f64` rounds up to
/// 2^63, so the upper bound is exclusive.
fn whole_i64(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}
