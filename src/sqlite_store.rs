//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the `movies` / `comments` schema
//! created by [`crate::migrate`]. The movie primary key and the comment
//! foreign key do the duplicate and existence checks.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use marquee_core::models::{Comment, CommentTally, Movie, NewComment};
use marquee_core::store::{MovieFilter, SortKey, Store, StoreError};

use crate::config::Config;
use crate::{db, migrate};

const MOVIE_COLUMNS: &str = "imdb_id, title, year, rated, released, runtime, genre, director, \
     writer, actors, plot, language, country, awards, poster, ratings, metascore, imdb_rating, \
     imdb_votes, type, dvd, box_office, production, website";

const STORED_DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.into())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value)
        .context("failed to encode column as JSON")
        .map_err(StoreError::from)
}

fn from_json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> anyhow::Result<T> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).with_context(|| format!("column {} holds invalid JSON", column))
}

fn date_column(row: &SqliteRow, column: &str) -> anyhow::Result<NaiveDate> {
    let raw: String = row.try_get(column)?;
    NaiveDate::parse_from_str(&raw, STORED_DATE_FORMAT)
        .with_context(|| format!("column {} holds invalid date '{}'", column, raw))
}

fn movie_from_row(row: &SqliteRow) -> anyhow::Result<Movie> {
    Ok(Movie {
        imdb_id: row.try_get("imdb_id")?,
        title: row.try_get("title")?,
        year: row.try_get("year")?,
        rated: row.try_get("rated")?,
        released: date_column(row, "released")?,
        runtime: row.try_get("runtime")?,
        genre: from_json(row, "genre")?,
        director: row.try_get("director")?,
        writer: row.try_get("writer")?,
        actors: row.try_get("actors")?,
        plot: row.try_get("plot")?,
        language: from_json(row, "language")?,
        country: from_json(row, "country")?,
        awards: row.try_get("awards")?,
        poster: row.try_get("poster")?,
        ratings: from_json(row, "ratings")?,
        metascore: row.try_get("metascore")?,
        imdb_rating: row.try_get("imdb_rating")?,
        imdb_votes: row.try_get("imdb_votes")?,
        kind: row.try_get("type")?,
        dvd: date_column(row, "dvd")?,
        box_office: row.try_get("box_office")?,
        production: row.try_get("production")?,
        website: row.try_get("website")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> anyhow::Result<Comment> {
    let ts: i64 = row.try_get("created_at")?;
    Ok(Comment {
        id: row.try_get("id")?,
        movie: row.try_get("movie_id")?,
        text: row.try_get("text")?,
        created_at: DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| anyhow!("comment timestamp out of range: {}", ts))?,
    })
}

fn push_movie_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &MovieFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(title) = &filter.title {
        qb.push(" AND title = ").push_bind(title.clone());
    }
    if let Some(year) = filter.year {
        qb.push(" AND year = ").push_bind(year);
    }
    if let Some(imdb_id) = &filter.imdb_id {
        qb.push(" AND imdb_id = ").push_bind(imdb_id.clone());
    }
}

/// `ORDER BY` terms for `keys`. Column names come from the fixed
/// [`marquee_core::store::SortField`] set, never from user input.
fn order_clause(keys: &[SortKey]) -> String {
    let mut terms: Vec<String> = keys
        .iter()
        .map(|k| {
            let dir = if k.descending { "DESC" } else { "ASC" };
            format!("\"{}\" {}", k.field.name(), dir)
        })
        .collect();
    terms.push("imdb_id ASC".to_string());
    terms.join(", ")
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_movie(&self, movie: &Movie) -> Result<(), StoreError> {
        let genre = to_json(&movie.genre)?;
        let language = to_json(&movie.language)?;
        let country = to_json(&movie.country)?;
        let ratings = to_json(&movie.ratings)?;

        let result = sqlx::query(&format!(
            "INSERT INTO movies ({}) VALUES \
             (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            MOVIE_COLUMNS
        ))
        .bind(&movie.imdb_id)
        .bind(&movie.title)
        .bind(movie.year)
        .bind(&movie.rated)
        .bind(movie.released.format(STORED_DATE_FORMAT).to_string())
        .bind(&movie.runtime)
        .bind(genre)
        .bind(&movie.director)
        .bind(&movie.writer)
        .bind(&movie.actors)
        .bind(&movie.plot)
        .bind(language)
        .bind(country)
        .bind(&movie.awards)
        .bind(&movie.poster)
        .bind(ratings)
        .bind(movie.metascore)
        .bind(&movie.imdb_rating)
        .bind(movie.imdb_votes)
        .bind(&movie.kind)
        .bind(movie.dvd.format(STORED_DATE_FORMAT).to_string())
        .bind(&movie.box_office)
        .bind(&movie.production)
        .bind(&movie.website)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateMovie(movie.imdb_id.clone()))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn get_movie(&self, imdb_id: &str) -> Result<Option<Movie>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM movies WHERE imdb_id = ?",
            MOVIE_COLUMNS
        ))
        .bind(imdb_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => Ok(Some(movie_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn count_movies(&self, filter: &MovieFilter) -> Result<usize, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM movies");
        push_movie_filter(&mut qb, filter);
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(count as usize)
    }

    async fn list_movies(
        &self,
        filter: &MovieFilter,
        ordering: &[SortKey],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Movie>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM movies", MOVIE_COLUMNS));
        push_movie_filter(&mut qb, filter);
        qb.push(" ORDER BY ")
            .push(order_clause(ordering))
            .push(" LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(backend)?;
        let movies = rows
            .iter()
            .map(movie_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(movies)
    }

    async fn delete_movie(&self, imdb_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM movies WHERE imdb_id = ?")
            .bind(imdb_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, StoreError> {
        let created_at = comment.created_at.timestamp();
        let result = sqlx::query(
            "INSERT INTO comments (movie_id, text, created_at) VALUES (?, ?, ?)",
        )
        .bind(&comment.movie)
        .bind(&comment.text)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Comment {
                id: done.last_insert_rowid(),
                movie: comment.movie.clone(),
                text: comment.text.clone(),
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or(comment.created_at),
            }),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(StoreError::MovieNotFound(comment.movie.clone()))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn count_comments(&self, movie: Option<&str>) -> Result<usize, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE (? IS NULL OR movie_id = ?)")
                .bind(movie)
                .bind(movie)
                .fetch_one(&self.pool)
                .await
                .map_err(backend)?;
        Ok(count as usize)
    }

    async fn list_comments(
        &self,
        movie: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, movie_id, text, created_at
            FROM comments
            WHERE (? IS NULL OR movie_id = ?)
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(movie)
        .bind(movie)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let comments = rows
            .iter()
            .map(comment_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(comments)
    }

    async fn comment_counts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CommentTally>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT movie_id, COUNT(*) AS total_comments
            FROM comments
            WHERE created_at >= ? AND created_at < ?
            GROUP BY movie_id
            "#,
        )
        .bind(start.timestamp())
        .bind(end.timestamp())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut tallies = Vec::with_capacity(rows.len());
        for row in &rows {
            tallies.push(CommentTally {
                imdb_id: row.try_get("movie_id").map_err(backend)?,
                total_comments: row.try_get("total_comments").map_err(backend)?,
            });
        }
        Ok(tallies)
    }
}
