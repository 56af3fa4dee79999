//! External movie source abstraction.
//!
//! A [`MovieSource`] looks a movie up by exact title and returns the raw
//! [`ExternalRecord`]. The OMDb HTTP client in the application crate is the
//! production implementation.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::normalize::ExternalRecord;

/// Message used when the source reports a failure without an `Error` text.
pub const DEFAULT_LOOKUP_ERROR: &str = "Omdb Api Error.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The source answered, but reported no match (or another failure)
    /// through its status marker. Carries the source's message.
    #[error("{0}")]
    NotFound(String),
    /// The source could not be reached or answered with something that is
    /// not a JSON object.
    #[error("movie source unavailable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait MovieSource: Send + Sync {
    /// Look a movie up by exact title. Exactly one outbound request.
    async fn lookup_title(&self, title: &str) -> Result<ExternalRecord, LookupError>;
}

/// Interpret an OMDb response body.
///
/// Success requires a JSON object whose `Response` marker is the string
/// `"True"`; anything else with an object body is a miss.
pub fn check_response(body: Value) -> Result<ExternalRecord, LookupError> {
    let record = match body {
        Value::Object(map) => map,
        other => {
            return Err(LookupError::Transport(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    if record.get("Response").and_then(Value::as_str) == Some("True") {
        return Ok(record);
    }

    let message = record
        .get("Error")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LOOKUP_ERROR);
    Err(LookupError::NotFound(message.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
