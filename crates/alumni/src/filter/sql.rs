//! Renders a [`StudentMatch`] into a parameterized SQL `WHERE` clause.

use std::collections::BTreeSet;

use rusqlite::types::ToSql;

use super::{JobConstraint, StudentMatch};
use crate::db::{placeholders, UNICODE_LOWER};
use crate::sanitize::escape_like;

/// Accumulated SQL conditions plus their numbered parameters.
///
/// Placeholders are numbered in push order, so callers can keep appending
/// parameters (for `LIMIT`/`OFFSET`) after the filter is rendered.
#[derive(Default)]
pub struct SqlFilter {
    conditions: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl SqlFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` as the next parameter and returns its placeholder.
    pub fn bind<T: ToSql + 'static>(&mut self, value: T) -> String {
        self.params.push(Box::new(value));
        format!("?{}", self.params.len())
    }

    pub fn push(&mut self, condition: String) {
        self.conditions.push(condition);
    }

    /// `column IN (...)`; an empty set becomes a condition nothing satisfies.
    pub fn push_in(&mut self, column: &str, values: &BTreeSet<String>) {
        if values.is_empty() {
            self.conditions.push("0".to_string());
            return;
        }
        let list = placeholders(self.params.len() + 1, values.len());
        for value in values {
            self.params.push(Box::new(value.clone()));
        }
        self.conditions.push(format!("{} IN ({})", column, list));
    }

    /// `WHERE a AND b ...`, or an empty string when unconstrained.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

impl StudentMatch {
    /// Renders this match against the students table aliased as `alias`.
    pub fn to_sql(&self, alias: &str) -> SqlFilter {
        let mut filter = SqlFilter::new();

        if !self.include_deleted {
            filter.push(format!("{alias}.is_deleted = 0"));
        }
        if let Some(ref class_ids) = self.class_ids {
            filter.push_in(&format!("{alias}.class_id"), class_ids);
        }
        if let Some(ref batch_ids) = self.batch_ids {
            filter.push_in(&format!("{alias}.batch_id"), batch_ids);
        }
        match &self.job {
            JobConstraint::Any => {}
            JobConstraint::Employed => filter.push(format!("{alias}.job_id IS NOT NULL")),
            JobConstraint::Unemployed => filter.push(format!("{alias}.job_id IS NULL")),
            JobConstraint::In(job_ids) => filter.push_in(&format!("{alias}.job_id"), job_ids),
        }
        if !self.genders.is_empty() {
            let genders: BTreeSet<String> =
                self.genders.iter().map(|g| g.as_str().to_string()).collect();
            filter.push_in(&format!("{alias}.gender"), &genders);
        }
        if let Some(ref search) = self.search {
            let pattern = filter.bind(format!("%{}%", escape_like(&search.text.to_lowercase())));
            let mut alternatives = vec![
                format!("{UNICODE_LOWER}({alias}.name) LIKE {pattern} ESCAPE '\\'"),
                format!("{UNICODE_LOWER}(COALESCE({alias}.email, '')) LIKE {pattern} ESCAPE '\\'"),
            ];
            if let Some(student_id) = search.student_id {
                let placeholder = filter.bind(student_id);
                alternatives.push(format!("{alias}.student_id = {placeholder}"));
            }
            filter.push(format!("({})", alternatives.join(" OR ")));
        }
        if let Some(ref from) = self.created_from {
            let placeholder = filter.bind(from.clone());
            filter.push(format!("{alias}.created_at >= {placeholder}"));
        }
        if let Some(ref to) = self.created_to {
            let placeholder = filter.bind(to.clone());
            filter.push(format!("{alias}.created_at <= {placeholder}"));
        }

        filter
    }
}
