//! Small value types shared by the store, the filter resolver and the
//! services.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Largest integer a JSON client can round-trip without precision loss.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    /// Lenient parse for form and spreadsheet input: case-insensitive,
    /// blank means the default.
    pub fn normalize(value: &str) -> Option<Gender> {
        let value = value.trim();
        if value.is_empty() {
            Some(Gender::default())
        } else if value.eq_ignore_ascii_case("male") {
            Some(Gender::Male)
        } else if value.eq_ignore_ascii_case("female") {
            Some(Gender::Female)
        } else {
            None
        }
    }
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Male
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ();

    /// Exact match only; callers trim first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            _ => Err(()),
        }
    }
}

impl ToSql for Gender {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Gender {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// Employment facet of the student filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmploymentStatus {
    #[default]
    All,
    Employed,
    Unemployed,
}

impl EmploymentStatus {
    /// Unknown values fall back to `All`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "employed" => EmploymentStatus::Employed,
            "unemployed" => EmploymentStatus::Unemployed,
            _ => EmploymentStatus::All,
        }
    }

    pub fn label(has_job: bool) -> &'static str {
        if has_job {
            "Employed"
        } else {
            "Unemployed"
        }
    }
}

/// Generates a new opaque entity identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Returns true when `value` has the shape of an entity identifier.
pub fn is_valid_id(value: &str) -> bool {
    uuid::Uuid::parse_str(value.trim()).is_ok()
}

/// Formats a timestamp the way it is stored: RFC 3339, UTC, milliseconds.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

/// Parses a strictly positive integer made only of ASCII digits.
///
/// Rejects signs, decimals, exponents and anything above
/// [`MAX_SAFE_INTEGER`].
pub fn parse_positive_integer(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match value.parse::<i64>() {
        Ok(n) if (1..=MAX_SAFE_INTEGER).contains(&n) => Some(n),
        _ => None,
    }
}
