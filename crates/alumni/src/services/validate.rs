//! Input validation shared by the services and the importer.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{FieldError, Result, ServiceError};
use crate::filter::params::parse_int;
use crate::model::is_valid_id;

pub const NAME_MAX: usize = 140;
pub const DESCRIPTION_MAX: usize = 2000;
pub const STUDENT_NAME_MAX: usize = 200;
pub const STUDENT_DESCRIPTION_MAX: usize = 4000;
pub const PHONE_MAX: usize = 40;
pub const PASSWORD_MIN: usize = 6;
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 3000;

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub fn is_valid_email(value: &str) -> bool {
    RE_EMAIL.is_match(value)
}

/// Trims and lowercases; blank becomes `None`.
pub fn normalize_email(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_lowercase())
    }
}

/// Collects field errors so a request reports every problem at once.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// A trimmed, non-blank string of at most `max` characters.
    pub fn required(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) -> String {
        let value = value.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            self.fail(field, message);
        } else {
            self.max_len(field, value, max);
        }
        value.to_string()
    }

    /// A trimmed string of at most `max` characters; missing is empty.
    pub fn optional(&mut self, field: &str, value: Option<&str>, max: usize) -> String {
        let value = value.map(str::trim).unwrap_or_default();
        self.max_len(field, value, max);
        value.to_string()
    }

    /// [`Checks::required`] for a patch: an absent field stays `None`.
    pub fn required_if_present(
        &mut self,
        field: &str,
        value: Option<&str>,
        max: usize,
        message: &str,
    ) -> Option<String> {
        value.map(|v| self.required(field, Some(v), max, message))
    }

    pub fn optional_if_present(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        value.map(|v| self.optional(field, Some(v), max))
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.fail(field, format!("{} must be at most {} characters", field, max));
        }
    }

    /// An integer year in 1900..=3000.
    pub fn year(&mut self, field: &str, value: Option<&str>) -> i32 {
        match value
            .and_then(parse_int)
            .and_then(|y| i32::try_from(y).ok())
            .filter(|y| (MIN_YEAR..=MAX_YEAR).contains(y))
        {
            Some(year) => year,
            None => {
                self.fail(field, "Valid year is required");
                0
            }
        }
    }

    /// A well-formed entity id.
    pub fn id(&mut self, field: &str, value: Option<&str>) -> String {
        let value = value.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            self.fail(field, format!("{} is required", field));
        } else if !is_valid_id(value) {
            self.fail(field, format!("Invalid {}", field));
        }
        value.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::fields(self.errors))
        }
    }
}

/// Rejects a malformed path id before it reaches the store.
pub fn path_id(entity: &str, id: &str) -> Result<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(ServiceError::invalid(format!("Invalid {} id", entity)))
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Accepts a string, number or bool as text. Null and absent are `None`.
///
/// Form submissions send every value as a string while JSON clients send
/// numbers; both land in the same payload type.
pub fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

/// Like [`lenient_string`] but keeps explicit `null` apart from absence:
/// absent → `None`, null → `Some(None)`. Use with `#[serde(default)]`.
pub fn nullable_string<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(value_to_string(Value::deserialize(deserializer)?)))
}
