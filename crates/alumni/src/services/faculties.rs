use serde::Deserialize;

use crate::db::faculty_repo::{self, FacultyRow};
use crate::db::{department_repo, Database};
use crate::error::{Result, ServiceError};
use crate::model::{new_id, timestamp_now};
use crate::services::validate::{lenient_string, path_id, Checks, DESCRIPTION_MAX, NAME_MAX};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub faculty_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

pub fn list(db: &Database) -> Result<Vec<FacultyRow>> {
    Ok(faculty_repo::list(db)?)
}

pub fn get(db: &Database, id: &str) -> Result<FacultyRow> {
    path_id("faculty", id)?;
    faculty_repo::find_by_id(db, id)?.ok_or_else(|| ServiceError::not_found("Faculty"))
}

pub fn create(db: &Database, payload: &FacultyPayload) -> Result<FacultyRow> {
    let mut checks = Checks::new();
    let name = checks.required(
        "facultyName",
        payload.faculty_name.as_deref(),
        NAME_MAX,
        "Faculty name is required",
    );
    let description = checks.optional("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    let now = timestamp_now();
    let faculty = FacultyRow {
        id: new_id(),
        name,
        description,
        created_at: now.clone(),
        updated_at: now,
    };
    faculty_repo::insert(db, &faculty)?;
    tracing::info!(id = %faculty.id, "Faculty created");
    Ok(faculty)
}

pub fn update(db: &Database, id: &str, payload: &FacultyPayload) -> Result<FacultyRow> {
    let mut faculty = get(db, id)?;

    let mut checks = Checks::new();
    let name = checks.required_if_present(
        "facultyName",
        payload.faculty_name.as_deref(),
        NAME_MAX,
        "Faculty name is required",
    );
    let description =
        checks.optional_if_present("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    if let Some(name) = name {
        faculty.name = name;
    }
    if let Some(description) = description {
        faculty.description = description;
    }
    faculty.updated_at = timestamp_now();
    faculty_repo::update(db, &faculty)?;
    Ok(faculty)
}

/// Refuses while any department still belongs to the faculty.
pub fn delete(db: &Database, id: &str) -> Result<()> {
    get(db, id)?;
    if department_repo::count_by_faculty(db, id)? > 0 {
        return Err(ServiceError::Conflict(
            "Cannot delete faculty with departments. Delete departments first.".to_string(),
        ));
    }
    faculty_repo::delete(db, id)?;
    tracing::info!(id, "Faculty deleted");
    Ok(())
}
