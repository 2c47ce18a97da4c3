//! Typed extraction from untyped tool arguments
//!
//! Absent values (missing key or JSON `null`) are tolerated by the optional
//! extractors; anything present must have the right shape.

use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::backend::QueryOptions;
use crate::promtime::{DurationError, Timestamp, parse_duration, parse_timestamp};

/// Why an argument could not be converted
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Required parameter absent
    #[error("missing required parameter '{field}'")]
    Missing {
        /// Parameter name
        field: &'static str,
    },

    /// Parameter present with the wrong JSON type
    #[error("parameter '{field}' must be {expected}, got {found}")]
    WrongType {
        /// Parameter name
        field: &'static str,
        /// Expected JSON type
        expected: &'static str,
        /// Actual JSON type
        found: &'static str,
    },

    /// Array parameter with a non-string element
    #[error("parameter '{field}' element {index} must be a string, got {found}")]
    InvalidElement {
        /// Parameter name
        field: &'static str,
        /// Offending position
        index: usize,
        /// Actual JSON type
        found: &'static str,
    },

    /// String that is not RFC-3339
    #[error("parameter '{field}' is not an RFC-3339 timestamp: {source}")]
    InvalidTimestamp {
        /// Parameter name
        field: &'static str,
        /// Parser error
        #[source]
        source: chrono::ParseError,
    },

    /// String that is not a duration literal
    #[error("parameter '{field}' is not a valid duration: {source}")]
    InvalidDuration {
        /// Parameter name
        field: &'static str,
        /// Parser error
        #[source]
        source: DurationError,
    },
}

impl ExtractionError {
    /// Name of the offending parameter
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Missing { field }
            | Self::WrongType { field, .. }
            | Self::InvalidElement { field, .. }
            | Self::InvalidTimestamp { field, .. }
            | Self::InvalidDuration { field, .. } => *field,
        }
    }
}

/// JSON type name used in error messages
fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_str<'a>(field: &'static str, value: &'a Value) -> Result<&'a str, ExtractionError> {
    value.as_str().ok_or(ExtractionError::WrongType {
        field,
        expected: "a string",
        found: value_type_name(value),
    })
}

/// Optional RFC-3339 timestamp; absent yields `None`.
pub fn extract_timestamp(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<Timestamp>, ExtractionError> {
    let Some(value) = present(value) else {
        return Ok(None);
    };
    let s = as_str(field, value)?;
    parse_timestamp(s)
        .map(Some)
        .map_err(|source| ExtractionError::InvalidTimestamp { field, source })
}

/// Optional Prometheus duration literal; absent yields `None`.
pub fn extract_duration(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<Duration>, ExtractionError> {
    let Some(value) = present(value) else {
        return Ok(None);
    };
    let s = as_str(field, value)?;
    parse_duration(s)
        .map(Some)
        .map_err(|source| ExtractionError::InvalidDuration { field, source })
}

/// Array of strings, order preserved. Absence is an error.
pub fn extract_string_array(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Vec<String>, ExtractionError> {
    let value = present(value).ok_or(ExtractionError::Missing { field })?;
    let items = value.as_array().ok_or(ExtractionError::WrongType {
        field,
        expected: "an array of strings",
        found: value_type_name(value),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or(ExtractionError::InvalidElement {
                    field,
                    index,
                    found: value_type_name(item),
                })
        })
        .collect()
}

/// `timeout` and `limit` evaluation options.
///
/// A malformed `timeout` fails. A `limit` that is not a non-negative integer
/// is logged and dropped.
pub fn extract_options(args: &Arguments) -> Result<QueryOptions, ExtractionError> {
    let timeout = extract_duration("timeout", args.get("timeout"))?;

    let limit = args.get("limit").and_then(|value| {
        let limit = value.as_u64();
        if limit.is_none() {
            info!(limit = %value, "Unable to parse limit, ignoring");
        }
        limit
    });

    Ok(QueryOptions { timeout, limit })
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Argument bundle of a single tool invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Empty bundle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `tools/call` `arguments` value.
    ///
    /// `null` is treated as an empty bundle; any other non-object is rejected.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::new()),
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Raw value of `name`; JSON `null` counts as absent
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        present(self.0.get(name))
    }

    /// Required string parameter
    pub fn required_str(&self, field: &'static str) -> Result<String, ExtractionError> {
        let value = self.get(field).ok_or(ExtractionError::Missing { field })?;
        as_str(field, value).map(str::to_string)
    }

    /// Required RFC-3339 timestamp
    pub fn required_timestamp(&self, field: &'static str) -> Result<Timestamp, ExtractionError> {
        extract_timestamp(field, self.get(field))?.ok_or(ExtractionError::Missing { field })
    }

    /// Optional RFC-3339 timestamp
    pub fn optional_timestamp(
        &self,
        field: &'static str,
    ) -> Result<Option<Timestamp>, ExtractionError> {
        extract_timestamp(field, self.get(field))
    }

    /// Required duration literal
    pub fn required_duration(&self, field: &'static str) -> Result<Duration, ExtractionError> {
        extract_duration(field, self.get(field))?.ok_or(ExtractionError::Missing { field })
    }

    /// Required array of strings
    pub fn required_string_array(
        &self,
        field: &'static str,
    ) -> Result<Vec<String>, ExtractionError> {
        extract_string_array(field, self.get(field))
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
