//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/movies/` | Paginated movies; filters `title`, `year`, `imdb_id`; `ordering` |
//! | `POST` | `/movies/` | Fetch a movie from OMDb by `title` and store it |
//! | `GET`  | `/comments/` | Paginated comments; filter `movie` |
//! | `POST` | `/comments/` | Add a comment (`movie`, `text`) |
//! | `GET`  | `/top/` | Most commented movies between `date_after` and `date_before` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Collection routes answer with and without the trailing slash. Request
//! bodies may be JSON, `application/x-www-form-urlencoded` or
//! `multipart/form-data`; any other non-empty body is rejected with 415.
//!
//! # Error Contract
//!
//! | Failure | Status | Body |
//! |---------|--------|------|
//! | Validation | 400 | `{"field": ["message", ...]}` |
//! | Missing title | 400 | `"The url parameter \"title\" is missing."` |
//! | Unsupported body | 415 | `{"detail": "Unsupported media type ..."}` |
//! | OMDb miss | 404 | `"Movie not found!"` (OMDb's own message) |
//! | Bad page | 404 | `{"detail": "Invalid page."}` |
//! | OMDb unreachable | 502 | `{"error": {"code": "bad_gateway", "message": ...}}` |
//! | Storage failure | 500 | `{"error": {"code": "internal", "message": ...}}` |
//!
//! Infrastructure causes are logged, never echoed to the client.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use marquee_core::catalog::{self, CatalogError, MISSING_TITLE};
use marquee_core::models::{Comment, Movie, RankedMovieEntry};
use marquee_core::pagination::{InvalidPage, Page, PageRequest};
use marquee_core::ranking::{self, DateRange};
use marquee_core::source::{LookupError, MovieSource};
use marquee_core::store::{parse_ordering, MovieFilter, Store, StoreError};
use marquee_core::validation::ValidationError;

use crate::config::Config;
use crate::omdb::OmdbClient;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn Store>,
    source: Arc<dyn MovieSource>,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>, source: Arc<dyn MovieSource>) -> Self {
        Self {
            config,
            store,
            source,
        }
    }
}

/// Starts the HTTP server on `[server].bind`.
///
/// Opens the database (creating the schema if needed) and the OMDb client,
/// then serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(config).await?);
    let source: Arc<dyn MovieSource> = Arc::new(OmdbClient::new(&config.omdb)?);
    let state = AppState::new(Arc::new(config.clone()), store, source);

    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!(addr = %bind_addr, "marquee listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// All routes, with CORS and request tracing applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/movies", get(handle_list_movies).post(handle_create_movie))
        .route("/movies/", get(handle_list_movies).post(handle_create_movie))
        .route("/comments", get(handle_list_comments).post(handle_create_comment))
        .route("/comments/", get(handle_list_comments).post(handle_create_comment))
        .route("/top", get(handle_top))
        .route("/top/", get(handle_top))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// Coded error body for infrastructure failures.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
}

#[derive(Debug)]
enum ErrorPayload {
    /// A bare JSON string.
    Message(String),
    /// `{"field": ["message", ...]}`
    Fields(ValidationError),
    /// `{"detail": "..."}`
    Detail(String),
    Coded {
        code: &'static str,
        message: &'static str,
    },
}

/// Handler error that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    payload: ErrorPayload,
}

impl AppError {
    fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            payload: ErrorPayload::Message(message.into()),
        }
    }

    fn detail(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            payload: ErrorPayload::Detail(detail.into()),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            payload: ErrorPayload::Coded {
                code: "internal",
                message: "internal server error",
            },
        }
    }

    fn bad_gateway() -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            payload: ErrorPayload::Coded {
                code: "bad_gateway",
                message: "movie database unavailable",
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.payload {
            ErrorPayload::Message(message) => (self.status, Json(message)).into_response(),
            ErrorPayload::Fields(errors) => (self.status, Json(errors)).into_response(),
            ErrorPayload::Detail(detail) => {
                (self.status, Json(serde_json::json!({ "detail": detail }))).into_response()
            }
            ErrorPayload::Coded { code, message } => (
                self.status,
                Json(ErrorBody {
                    error: ErrorDetail { code, message },
                }),
            )
                .into_response(),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(errors: ValidationError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            payload: ErrorPayload::Fields(errors),
        }
    }
}

impl From<InvalidPage> for AppError {
    fn from(err: InvalidPage) -> Self {
        Self::detail(StatusCode::NOT_FOUND, err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "store failure");
        Self::internal()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MissingTitle => Self::message(StatusCode::BAD_REQUEST, MISSING_TITLE),
            CatalogError::Lookup(LookupError::NotFound(message)) => {
                Self::message(StatusCode::NOT_FOUND, message)
            }
            CatalogError::Lookup(LookupError::Transport(cause)) => {
                error!(cause = %cause, "movie source unreachable");
                Self::bad_gateway()
            }
            CatalogError::Invalid(errors) => errors.into(),
            CatalogError::InvalidPage(err) => err.into(),
            CatalogError::Store(err) => err.into(),
        }
    }
}

// ============ Request helpers ============

/// Last value of a query parameter.
fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn page_request(state: &AppState, params: &[(String, String)]) -> Result<PageRequest, AppError> {
    let pagination = &state.config.pagination;
    Ok(PageRequest::from_params(
        param(params, "page"),
        param(params, "page_size"),
        pagination.page_size,
        pagination.max_page_size,
    )?)
}

/// Fields of a JSON, urlencoded or multipart form body.
///
/// Scalars are kept as text; nulls, arrays and objects are dropped, so they
/// read as missing. Multipart file parts are skipped. An empty body of any
/// content type yields no fields; other content types are a 415.
struct BodyFields(HashMap<String, String>);

impl BodyFields {
    fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl<S> FromRequest<S> for BodyFields
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| AppError::detail(StatusCode::BAD_REQUEST, e.body_text()))?;
            let Value::Object(map) = body else {
                return Err(AppError::detail(
                    StatusCode::BAD_REQUEST,
                    "Expected a JSON object.",
                ));
            };
            let fields = map
                .into_iter()
                .filter_map(|(k, v)| match v {
                    Value::String(s) => Some((k, s)),
                    Value::Number(n) => Some((k, n.to_string())),
                    Value::Bool(b) => Some((k, b.to_string())),
                    _ => None,
                })
                .collect();
            Ok(Self(fields))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| AppError::detail(StatusCode::BAD_REQUEST, e.body_text()))?;
            Ok(Self(pairs.into_iter().collect()))
        } else if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::detail(StatusCode::BAD_REQUEST, e.body_text()))?;
            let mut fields = HashMap::new();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| AppError::detail(StatusCode::BAD_REQUEST, e.body_text()))?
            {
                let Some(name) = field.name().map(str::to_owned) else {
                    continue;
                };
                if field.file_name().is_some() {
                    continue;
                }
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::detail(StatusCode::BAD_REQUEST, e.body_text()))?;
                fields.insert(name, value);
            }
            Ok(Self(fields))
        } else {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::detail(StatusCode::BAD_REQUEST, e.body_text()))?;
            if body.is_empty() {
                return Ok(Self(HashMap::new()));
            }
            Err(AppError::detail(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("Unsupported media type \"{}\" in request.", content_type),
            ))
        }
    }
}

/// Builds absolute `next` / `previous` links from the request's `Host`
/// header, path, and query (minus `page`).
struct PageLinks<'a> {
    base: Option<reqwest::Url>,
    params: &'a [(String, String)],
}

impl<'a> PageLinks<'a> {
    fn new(headers: &HeaderMap, uri: &Uri, params: &'a [(String, String)]) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        let base = reqwest::Url::parse(&format!("http://{}{}", host, uri.path())).ok();
        Self { base, params }
    }

    fn to_page(&self, number: usize) -> Option<String> {
        let mut url = self.base.clone()?;
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in self.params.iter().filter(|(k, _)| k != "page") {
                query.append_pair(k, v);
            }
            if number > 1 {
                query.append_pair("page", &number.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Some(url.to_string())
    }
}

/// Paginated response body.
#[derive(Serialize)]
struct PageBody<T> {
    count: usize,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<T>,
}

impl<T> PageBody<T> {
    fn new(page: Page<T>, links: &PageLinks<'_>) -> Self {
        let next = page
            .has_next()
            .then(|| links.to_page(page.number + 1))
            .flatten();
        let previous = page
            .has_previous()
            .then(|| links.to_page(page.number - 1))
            .flatten();
        Self {
            count: page.count,
            next,
            previous,
            results: page.results,
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ /movies/ ============

async fn handle_list_movies(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<PageBody<Movie>>, AppError> {
    let filter = MovieFilter::from_params(
        param(&params, "title"),
        param(&params, "year"),
        param(&params, "imdb_id"),
    )?;
    let ordering = param(&params, "ordering")
        .map(parse_ordering)
        .unwrap_or_default();
    let page = page_request(&state, &params)?;

    let page = catalog::list_movies(state.store.as_ref(), &filter, &ordering, &page).await?;
    Ok(Json(PageBody::new(page, &PageLinks::new(&headers, &uri, &params))))
}

async fn handle_create_movie(
    State(state): State<AppState>,
    fields: BodyFields,
) -> Result<(StatusCode, Json<Movie>), AppError> {
    let title = fields.get("title").unwrap_or_default();
    let movie = catalog::fetch_movie(state.source.as_ref(), state.store.as_ref(), title).await?;
    info!(imdb_id = %movie.imdb_id, title = %movie.title, "movie stored");
    Ok((StatusCode::CREATED, Json(movie)))
}

// ============ /comments/ ============

async fn handle_list_comments(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<PageBody<Comment>>, AppError> {
    let page = page_request(&state, &params)?;
    let page = catalog::list_comments(state.store.as_ref(), param(&params, "movie"), &page).await?;
    Ok(Json(PageBody::new(page, &PageLinks::new(&headers, &uri, &params))))
}

async fn handle_create_comment(
    State(state): State<AppState>,
    fields: BodyFields,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment =
        catalog::add_comment(state.store.as_ref(), fields.get("movie"), fields.get("text")).await?;
    info!(id = comment.id, movie = %comment.movie, "comment stored");
    Ok((StatusCode::CREATED, Json(comment)))
}

// ============ GET /top/ ============

async fn handle_top(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<RankedMovieEntry>>, AppError> {
    let range = DateRange::from_params(
        param(&params, "date_after"),
        param(&params, "date_before"),
    )?;
    let top = ranking::top_commented(state.store.as_ref(), &range, state.config.top.limit).await?;
    Ok(Json(top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_missing_title_is_bare_string() {
        let (status, body) = render(CatalogError::MissingTitle.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, Value::String("The url parameter \"title\" is missing.".into()));
    }

    #[tokio::test]
    async fn test_lookup_miss_carries_message() {
        let err = CatalogError::Lookup(LookupError::NotFound("Movie not found!".into()));
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!("Movie not found!"));
    }

    #[tokio::test]
    async fn test_infrastructure_errors_are_generic() {
        let err = CatalogError::Lookup(LookupError::Transport("dns error: secret-host".into()));
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "bad_gateway");
        assert!(!body.to_string().contains("secret-host"));

        let err = StoreError::Backend(anyhow::anyhow!("disk I/O error"));
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal");
    }

    #[tokio::test]
    async fn test_validation_and_page_bodies() {
        let err = ValidationError::field("text", "This field is required.");
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"text": ["This field is required."]}));

        let (status, body) = render(InvalidPage.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"detail": "Invalid page."}));
    }

    #[test]
    fn test_page_links_keep_other_params() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "testserver".parse().unwrap());
        let uri: Uri = "/movies/?title=Heat&page=2".parse().unwrap();
        let params = pairs(&[("title", "Heat"), ("page", "2")]);
        let links = PageLinks::new(&headers, &uri, &params);

        assert_eq!(
            links.to_page(3).unwrap(),
            "http://testserver/movies/?title=Heat&page=3"
        );
        assert_eq!(links.to_page(1).unwrap(), "http://testserver/movies/?title=Heat");
    }

    #[test]
    fn test_first_page_link_has_no_query() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "127.0.0.1:8000".parse().unwrap());
        let uri: Uri = "/comments/?page=2".parse().unwrap();
        let params = pairs(&[("page", "2")]);
        let links = PageLinks::new(&headers, &uri, &params);
        assert_eq!(links.to_page(1).unwrap(), "http://127.0.0.1:8000/comments/");
    }

    #[test]
    fn test_param_takes_last_value() {
        let params = pairs(&[("movie", "tt1"), ("movie", "tt2")]);
        assert_eq!(param(&params, "movie"), Some("tt2"));
        assert_eq!(param(&params, "page"), None);
    }
}
