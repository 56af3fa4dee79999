//! In-memory [`Store`] implementation for tests.
//!
//! Uses `BTreeMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Behaves like the SQLite store: duplicate ids are rejected, comments need
//! an existing movie, and deleting a movie removes its comments.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Comment, CommentTally, Movie, NewComment};

use super::{compare_movies, MovieFilter, SortKey, Store, StoreError};

#[derive(Default)]
struct Tables {
    movies: BTreeMap<String, Movie>,
    comments: Vec<Comment>,
    next_comment_id: i64,
}

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend(anyhow!("in-memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend(anyhow!("in-memory store lock poisoned")))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_movie(&self, movie: &Movie) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.movies.contains_key(&movie.imdb_id) {
            return Err(StoreError::DuplicateMovie(movie.imdb_id.clone()));
        }
        tables.movies.insert(movie.imdb_id.clone(), movie.clone());
        Ok(())
    }

    async fn get_movie(&self, imdb_id: &str) -> Result<Option<Movie>, StoreError> {
        Ok(self.read()?.movies.get(imdb_id).cloned())
    }

    async fn count_movies(&self, filter: &MovieFilter) -> Result<usize, StoreError> {
        Ok(self
            .read()?
            .movies
            .values()
            .filter(|m| filter.matches(m))
            .count())
    }

    async fn list_movies(
        &self,
        filter: &MovieFilter,
        ordering: &[SortKey],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Movie>, StoreError> {
        let tables = self.read()?;
        let mut movies: Vec<&Movie> = tables
            .movies
            .values()
            .filter(|m| filter.matches(m))
            .collect();
        movies.sort_by(|a, b| compare_movies(ordering, a, b));
        Ok(movies
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_movie(&self, imdb_id: &str) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let existed = tables.movies.remove(imdb_id).is_some();
        tables.comments.retain(|c| c.movie != imdb_id);
        Ok(existed)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, StoreError> {
        let mut tables = self.write()?;
        if !tables.movies.contains_key(&comment.movie) {
            return Err(StoreError::MovieNotFound(comment.movie.clone()));
        }
        tables.next_comment_id += 1;
        let stored = Comment {
            id: tables.next_comment_id,
            movie: comment.movie.clone(),
            text: comment.text.clone(),
            created_at: comment.created_at,
        };
        tables.comments.push(stored.clone());
        Ok(stored)
    }

    async fn count_comments(&self, movie: Option<&str>) -> Result<usize, StoreError> {
        Ok(self
            .read()?
            .comments
            .iter()
            .filter(|c| movie.map_or(true, |m| c.movie == m))
            .count())
    }

    async fn list_comments(
        &self,
        movie: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>, StoreError> {
        // Ids are assigned in insertion order, so the vector is already sorted.
        Ok(self
            .read()?
            .comments
            .iter()
            .filter(|c| movie.map_or(true, |m| c.movie == m))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn comment_counts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CommentTally>, StoreError> {
        let tables = self.read()?;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for c in &tables.comments {
            if c.created_at >= start && c.created_at < end {
                *counts.entry(c.movie.as_str()).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(imdb_id, total_comments)| CommentTally {
                imdb_id: imdb_id.to_string(),
                total_comments,
            })
            .collect())
    }
}
