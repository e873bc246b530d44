use std::collections::BTreeSet;

use super::{date_range, parse_genders, parse_search, JobConstraint, StudentMatch, StudentQuery};
use crate::db::{batch_repo, class_repo, department_repo, Database, DatabaseError};
use crate::filter::params::parse_int;
use crate::model::{is_valid_id, EmploymentStatus};

/// Keeps well-formed ids, deduplicated and sorted.
fn valid_ids(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| is_valid_id(v))
        .map(str::to_string)
        .collect()
}

/// Resolves raw criteria into a concrete match.
///
/// The result depends only on the set of criteria supplied, never on the
/// order they arrived in.
pub fn resolve(db: &Database, query: &StudentQuery) -> Result<StudentMatch, DatabaseError> {
    let class_ids = if query.has_hierarchy_criteria() {
        Some(resolve_class_ids(db, query)?)
    } else {
        None
    };

    let batch_ids = if query.has_batch_criteria() {
        let years: BTreeSet<i32> = query
            .batch_years
            .iter()
            .filter_map(|y| parse_int(y))
            .filter_map(|y| i32::try_from(y).ok())
            .collect();
        Some(batch_repo::ids_matching(db, &valid_ids(&query.batch_ids), &years)?)
    } else {
        None
    };

    let job = if !query.job_ids.is_empty() {
        JobConstraint::In(valid_ids(&query.job_ids))
    } else {
        match query.employment_status {
            EmploymentStatus::Employed => JobConstraint::Employed,
            EmploymentStatus::Unemployed => JobConstraint::Unemployed,
            EmploymentStatus::All => JobConstraint::Any,
        }
    };

    let (created_from, created_to) =
        date_range(query.date_from.as_deref(), query.date_to.as_deref());

    Ok(StudentMatch {
        include_deleted: query.include_deleted,
        class_ids,
        batch_ids,
        job,
        genders: parse_genders(&query.genders),
        search: parse_search(query.search.as_deref()),
        created_from,
        created_to,
    })
}

/// Cascades faculty → department → class selections into class ids.
fn resolve_class_ids(db: &Database, query: &StudentQuery) -> Result<BTreeSet<String>, DatabaseError> {
    let department_ids = valid_ids(&query.department_ids);

    let departments = if !query.faculty_ids.is_empty() {
        let under_faculties = department_repo::ids_by_faculties(db, &valid_ids(&query.faculty_ids))?;
        if query.department_ids.is_empty() {
            Some(under_faculties)
        } else {
            Some(&under_faculties & &department_ids)
        }
    } else if !query.department_ids.is_empty() {
        Some(department_ids)
    } else {
        None
    };

    let classes = if query.class_ids.is_empty() {
        None
    } else {
        Some(valid_ids(&query.class_ids))
    };

    class_repo::ids_matching(db, classes.as_ref(), departments.as_ref())
}
