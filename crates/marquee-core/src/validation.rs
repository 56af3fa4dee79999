//! Structured, per-field validation errors.
//!
//! Every user-facing validation failure in Marquee (request parameters,
//! OMDb record fields) is reported as a map from field name to one or more
//! messages. The HTTP layer serializes the map as-is, so clients see
//! `{"date_before": ["This field is required."]}`.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_AN_INTEGER: &str = "A valid integer is required.";

/// Field name → messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error with a single message on a single field.
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.add(name, message);
        err
    }

    pub fn add(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(name.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for `name`, if any.
    pub fn messages(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// `Ok(value)` when nothing was recorded, `Err(self)` otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, messages) in &self.fields {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", name, messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_accumulate_per_field() {
        let mut err = ValidationError::new();
        err.add("Year", NOT_AN_INTEGER);
        err.add("Title", REQUIRED);
        err.add("Year", "second");
        assert_eq!(err.messages("Year").unwrap().len(), 2);
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["Title", "Year"]);
    }

    #[test]
    fn test_serializes_as_field_map() {
        let err = ValidationError::field("date_before", REQUIRED);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "date_before": ["This field is required."] })
        );
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationError::new().into_result(3).unwrap(), 3);
        assert!(ValidationError::field("x", REQUIRED).into_result(3).is_err());
    }
}
