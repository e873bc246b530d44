//! Student filter resolution.
//!
//! A [`StudentQuery`] holds the loosely-typed criteria a client sent.
//! [`resolve`] turns it into a [`StudentMatch`]: concrete class and batch id
//! sets plus job, gender, search and date constraints, ready to be rendered
//! into SQL with [`StudentMatch::to_sql`].

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::model::{format_timestamp, parse_positive_integer, EmploymentStatus, Gender};

pub mod params;
mod resolver;
pub mod sql;

pub use params::QueryParams;
pub use resolver::resolve;
pub use sql::SqlFilter;

/// Raw student filter criteria as received from a client.
///
/// Id lists keep every non-empty value the client sent, valid or not: a
/// criterion that was supplied but names nothing must still narrow the
/// result to nothing.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StudentQuery {
    pub faculty_ids: Vec<String>,
    pub department_ids: Vec<String>,
    pub class_ids: Vec<String>,
    pub batch_ids: Vec<String>,
    pub batch_years: Vec<String>,
    pub job_ids: Vec<String>,
    pub genders: Vec<String>,
    pub employment_status: EmploymentStatus,
    pub search: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub include_deleted: bool,
}

impl StudentQuery {
    pub fn from_params(params: &QueryParams) -> Self {
        Self {
            faculty_ids: params.list("facultyIds"),
            department_ids: params.list("departmentIds"),
            class_ids: params.list("classIds"),
            batch_ids: params.list("batchIds"),
            batch_years: params.list("batchYears"),
            job_ids: params.list("jobIds"),
            genders: params.list("genders"),
            employment_status: params
                .get("employmentStatus")
                .map(EmploymentStatus::parse)
                .unwrap_or_default(),
            search: params.get("search").map(str::to_string),
            date_from: params.get("dateFrom").map(str::to_string),
            date_to: params.get("dateTo").map(str::to_string),
            include_deleted: params.bool("includeDeleted", false),
        }
    }

    /// True when any faculty, department or class criterion was supplied.
    pub fn has_hierarchy_criteria(&self) -> bool {
        !self.faculty_ids.is_empty() || !self.department_ids.is_empty() || !self.class_ids.is_empty()
    }

    pub fn has_batch_criteria(&self) -> bool {
        !self.batch_ids.is_empty() || !self.batch_years.is_empty()
    }
}

/// How the job reference constrains the match.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum JobConstraint {
    #[default]
    Any,
    Employed,
    Unemployed,
    /// Job reference must be one of these ids.
    In(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    pub text: String,
    /// Set when the text is also a valid student number.
    pub student_id: Option<i64>,
}

/// A resolved, store-ready student filter.
///
/// `None` id sets mean "no restriction"; `Some(empty)` means nothing can
/// match.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StudentMatch {
    pub include_deleted: bool,
    pub class_ids: Option<BTreeSet<String>>,
    pub batch_ids: Option<BTreeSet<String>>,
    pub job: JobConstraint,
    pub genders: Vec<Gender>,
    pub search: Option<SearchTerm>,
    pub created_from: Option<String>,
    pub created_to: Option<String>,
}

/// Keeps known genders, deduplicated and in a fixed order.
pub(crate) fn parse_genders(values: &[String]) -> Vec<Gender> {
    let wanted: BTreeSet<Gender> = values.iter().filter_map(|v| v.trim().parse().ok()).collect();
    wanted.into_iter().collect()
}

pub(crate) fn parse_search(raw: Option<&str>) -> Option<SearchTerm> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }
    Some(SearchTerm {
        text: text.to_string(),
        student_id: parse_positive_integer(text),
    })
}

fn parse_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc).date_naive());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|at| at.date())
}

fn start_of_day(day: NaiveDate) -> String {
    format_timestamp(Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
}

fn end_of_day(day: NaiveDate) -> String {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    format_timestamp(Utc.from_utc_datetime(&day.and_time(last)))
}

/// Resolves the creation-date bounds to inclusive timestamps.
///
/// Bounds are whole UTC days. Unparsable bounds are ignored and reversed
/// bounds are swapped.
pub(crate) fn date_range(from: Option<&str>, to: Option<&str>) -> (Option<String>, Option<String>) {
    let mut from = from.and_then(parse_day);
    let mut to = to.and_then(parse_day);
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            from = Some(t);
            to = Some(f);
        }
    }
    (from.map(start_of_day), to.map(end_of_day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_from_params_reads_every_facet() {
        let params = QueryParams::from_pairs([
            ("facultyIds", "f1,f2"),
            ("batchYears[]", "2020"),
            ("genders", "Female"),
            ("employmentStatus", "employed"),
            ("search", " ada "),
            ("includeDeleted", "true"),
        ]);
        let query = StudentQuery::from_params(&params);
        assert_eq!(query.faculty_ids, vec!["f1", "f2"]);
        assert_eq!(query.batch_years, vec!["2020"]);
        assert_eq!(query.genders, vec!["Female"]);
        assert_eq!(query.employment_status, EmploymentStatus::Employed);
        assert_eq!(query.search.as_deref(), Some("ada"));
        assert!(query.include_deleted);
        assert!(query.has_hierarchy_criteria());
        assert!(query.has_batch_criteria());
    }

    #[test]
    fn genders_drop_unknown_values() {
        let genders = parse_genders(&["Female".into(), "Other".into(), "Male".into(), "Female".into()]);
        assert_eq!(genders, vec![Gender::Male, Gender::Female]);
    }

    #[test]
    fn digit_search_also_targets_student_id() {
        let term = parse_search(Some("7")).unwrap();
        assert_eq!(term.student_id, Some(7));
        assert_eq!(parse_search(Some("ada")).unwrap().student_id, None);
        assert_eq!(parse_search(Some("  ")), None);
    }

    #[test]
    fn date_range_expands_whole_days() {
        let (from, to) = date_range(Some("2024-03-01"), Some("2024-03-31"));
        assert_eq!(from.as_deref(), Some("2024-03-01T00:00:00.000Z"));
        assert_eq!(to.as_deref(), Some("2024-03-31T23:59:59.999Z"));
    }

    #[test]
    fn date_range_swaps_reversed_bounds() {
        let (from, to) = date_range(Some("2024-03-31"), Some("2024-03-01"));
        assert_eq!(from.as_deref(), Some("2024-03-01T00:00:00.000Z"));
        assert_eq!(to.as_deref(), Some("2024-03-31T23:59:59.999Z"));
    }

    #[test]
    fn date_range_accepts_rfc3339_and_single_bounds() {
        let (from, to) = date_range(Some("2024-05-06T15:30:00+02:00"), None);
        assert_eq!(from.as_deref(), Some("2024-05-06T00:00:00.000Z"));
        assert_eq!(to, None);

        let (from, to) = date_range(Some("garbage"), Some("2024-01-01"));
        assert_eq!(from, None);
        assert_eq!(to.as_deref(), Some("2024-01-01T23:59:59.999Z"));
    }
}
