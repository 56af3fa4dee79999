//! Catalog operations: fetching movies, adding comments, and paginated
//! listings.
//!
//! These functions work entirely through the [`Store`] and [`MovieSource`]
//! traits. Both the CLI and the HTTP server delegate to them.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Comment, Movie, NewComment};
use crate::normalize::normalize;
use crate::pagination::{InvalidPage, Page, PageRequest};
use crate::source::{LookupError, MovieSource};
use crate::store::{MovieFilter, SortKey, Store, StoreError};
use crate::validation::{ValidationError, NOT_BLANK, REQUIRED};

pub const MISSING_TITLE: &str = "The url parameter \"title\" is missing.";
pub const DUPLICATE_MOVIE: &str = "movie with this imdb id already exists.";
pub const UNKNOWN_MOVIE_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("The url parameter \"title\" is missing.")]
    MissingTitle,
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("invalid data: {0}")]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    InvalidPage(#[from] InvalidPage),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Look a title up, normalize the record, and store the movie.
///
/// One lookup is made. The store is written only after normalization
/// succeeds, so a failure at any stage leaves it untouched. A movie that is
/// already stored is reported as an `imdb_id` validation error.
pub async fn fetch_movie<Src, S>(
    source: &Src,
    store: &S,
    title: &str,
) -> Result<Movie, CatalogError>
where
    Src: MovieSource + ?Sized,
    S: Store + ?Sized,
{
    let title = title.trim();
    if title.is_empty() {
        return Err(CatalogError::MissingTitle);
    }

    let record = source.lookup_title(title).await?;
    let movie = normalize(&record)?;

    match store.insert_movie(&movie).await {
        Ok(()) => Ok(movie),
        Err(StoreError::DuplicateMovie(_)) => {
            Err(ValidationError::field("imdb_id", DUPLICATE_MOVIE).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Validate and store a comment stamped with the current time.
pub async fn add_comment<S: Store + ?Sized>(
    store: &S,
    movie: Option<&str>,
    text: Option<&str>,
) -> Result<Comment, CatalogError> {
    add_comment_at(store, movie, text, now_seconds()).await
}

/// Like [`add_comment`] with an explicit creation time.
pub async fn add_comment_at<S: Store + ?Sized>(
    store: &S,
    movie: Option<&str>,
    text: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<Comment, CatalogError> {
    let mut errors = ValidationError::new();

    let movie = match movie.map(str::trim) {
        None | Some("") => {
            errors.add("movie", REQUIRED);
            None
        }
        Some(id) => match store.get_movie(id).await? {
            Some(m) => Some(m.imdb_id),
            None => {
                errors.add("movie", invalid_pk(id));
                None
            }
        },
    };

    let text = match text {
        None => {
            errors.add("text", REQUIRED);
            None
        }
        Some(t) if t.trim().is_empty() => {
            errors.add("text", NOT_BLANK);
            None
        }
        Some(t) => Some(t.to_string()),
    };

    let (movie, text) = match (movie, text) {
        (Some(m), Some(t)) if errors.is_empty() => (m, t),
        _ => return Err(errors.into()),
    };

    let new = NewComment {
        movie,
        text,
        created_at,
    };
    match store.insert_comment(&new).await {
        Ok(c) => Ok(c),
        // Deleted between the existence check and the insert.
        Err(StoreError::MovieNotFound(id)) => {
            Err(ValidationError::field("movie", invalid_pk(&id)).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// One page of movies matching `filter`, ordered by `ordering`.
pub async fn list_movies<S: Store + ?Sized>(
    store: &S,
    filter: &MovieFilter,
    ordering: &[SortKey],
    page: &PageRequest,
) -> Result<Page<Movie>, CatalogError> {
    let count = store.count_movies(filter).await?;
    let window = page.window(count)?;
    let results = store
        .list_movies(filter, ordering, window.offset, window.limit)
        .await?;
    Ok(Page::new(count, window, results))
}

/// One page of comments, optionally restricted to an existing movie.
pub async fn list_comments<S: Store + ?Sized>(
    store: &S,
    movie: Option<&str>,
    page: &PageRequest,
) -> Result<Page<Comment>, CatalogError> {
    let movie = movie.filter(|m| !m.is_empty());
    if let Some(id) = movie {
        if store.get_movie(id).await?.is_none() {
            return Err(ValidationError::field("movie", UNKNOWN_MOVIE_CHOICE).into());
        }
    }

    let count = store.count_comments(movie).await?;
    let window = page.window(count)?;
    let results = store
        .list_comments(movie, window.offset, window.limit)
        .await?;
    Ok(Page::new(count, window, results))
}

fn invalid_pk(id: &str) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

/// Current time truncated to whole seconds, the precision comments are
/// stored with.
fn now_seconds() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}
