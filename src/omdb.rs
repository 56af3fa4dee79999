//! OMDb (Open Movie Database) API client.
//!
//! One `GET {base_url}/?apikey=KEY&t=TITLE` per lookup, no retries. OMDb
//! reports failures such as `Invalid API key!` inside a JSON body with
//! `"Response": "False"`, sometimes alongside a non-200 status, so the body
//! is interpreted regardless of the HTTP status.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use marquee_core::normalize::ExternalRecord;
use marquee_core::source::{check_response, LookupError, MovieSource};

use crate::config::OmdbConfig;

pub struct OmdbClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(config: &OmdbConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("marquee/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build OMDb HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/", config.base_url.trim_end_matches('/')),
            api_key,
        })
    }

    async fn request(&self, title: &str) -> Result<Value, LookupError> {
        // without_url(): the request URL carries the API key.
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("apikey", self.api_key.as_str()), ("t", title)])
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        debug!(title, status = %status, "OMDb responded");

        response.json::<Value>().await.map_err(|e| {
            LookupError::Transport(format!(
                "unreadable response body (HTTP {}): {}",
                status,
                e.without_url()
            ))
        })
    }
}

#[async_trait]
impl MovieSource for OmdbClient {
    async fn lookup_title(&self, title: &str) -> Result<ExternalRecord, LookupError> {
        let outcome = self.request(title).await.and_then(check_response);
        match &outcome {
            Ok(record) => {
                let imdb_id = record.get("imdbID").and_then(Value::as_str).unwrap_or("?");
                info!(title, imdb_id, "OMDb lookup matched");
            }
            Err(LookupError::NotFound(message)) => {
                info!(title, message = %message, "OMDb lookup missed");
            }
            Err(LookupError::Transport(cause)) => {
                warn!(title, cause = %cause, "OMDb lookup failed");
            }
        }
        outcome
    }
}
