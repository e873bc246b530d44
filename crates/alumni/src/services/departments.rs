use serde::Deserialize;

use crate::db::department_repo::{self, DepartmentRow};
use crate::db::{class_repo, faculty_repo, Database};
use crate::error::{Result, ServiceError};
use crate::model::{new_id, timestamp_now};
use crate::services::validate::{lenient_string, path_id, Checks, DESCRIPTION_MAX, NAME_MAX};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub department_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub faculty_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

/// Departments by name, optionally within one faculty. A malformed
/// faculty id matches nothing.
pub fn list(db: &Database, faculty_id: Option<&str>) -> Result<Vec<DepartmentRow>> {
    Ok(department_repo::list(db, faculty_id.filter(|f| !f.trim().is_empty()))?)
}

pub fn get(db: &Database, id: &str) -> Result<DepartmentRow> {
    path_id("department", id)?;
    department_repo::find_by_id(db, id)?.ok_or_else(|| ServiceError::not_found("Department"))
}

fn require_faculty(db: &Database, faculty_id: &str) -> Result<()> {
    match faculty_repo::find_by_id(db, faculty_id)? {
        Some(_) => Ok(()),
        None => Err(ServiceError::not_found("Faculty")),
    }
}

pub fn create(db: &Database, payload: &DepartmentPayload) -> Result<DepartmentRow> {
    let mut checks = Checks::new();
    let name = checks.required(
        "departmentName",
        payload.department_name.as_deref(),
        NAME_MAX,
        "Department name is required",
    );
    let faculty_id = checks.id("facultyId", payload.faculty_id.as_deref());
    let description = checks.optional("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    require_faculty(db, &faculty_id)?;

    let now = timestamp_now();
    let department = DepartmentRow {
        id: new_id(),
        name,
        faculty_id,
        description,
        created_at: now.clone(),
        updated_at: now,
        faculty: None,
    };
    department_repo::insert(db, &department)?;
    tracing::info!(id = %department.id, "Department created");
    get(db, &department.id)
}

pub fn update(db: &Database, id: &str, payload: &DepartmentPayload) -> Result<DepartmentRow> {
    let mut department = get(db, id)?;

    let mut checks = Checks::new();
    let name = checks.required_if_present(
        "departmentName",
        payload.department_name.as_deref(),
        NAME_MAX,
        "Department name is required",
    );
    let faculty_id = payload
        .faculty_id
        .as_deref()
        .map(|f| checks.id("facultyId", Some(f)));
    let description =
        checks.optional_if_present("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    if let Some(faculty_id) = faculty_id {
        require_faculty(db, &faculty_id)?;
        department.faculty_id = faculty_id;
    }
    if let Some(name) = name {
        department.name = name;
    }
    if let Some(description) = description {
        department.description = description;
    }
    department.updated_at = timestamp_now();
    department_repo::update(db, &department)?;
    get(db, id)
}

/// Refuses while any class still belongs to the department.
pub fn delete(db: &Database, id: &str) -> Result<()> {
    get(db, id)?;
    if class_repo::count_by_department(db, id)? > 0 {
        return Err(ServiceError::Conflict(
            "Cannot delete department with classes. Delete classes first.".to_string(),
        ));
    }
    department_repo::delete(db, id)?;
    tracing::info!(id, "Department deleted");
    Ok(())
}
