use serde::Deserialize;

use crate::db::class_repo::{self, ClassFilter, ClassRow};
use crate::db::student_repo::{self, Reference};
use crate::db::{department_repo, Database};
use crate::error::{Result, ServiceError};
use crate::model::{new_id, timestamp_now};
use crate::services::validate::{lenient_string, path_id, Checks, DESCRIPTION_MAX, NAME_MAX};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub department_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

pub fn list(db: &Database, filter: &ClassFilter) -> Result<Vec<ClassRow>> {
    let filter = ClassFilter {
        department_id: filter.department_id.clone().filter(|d| !d.trim().is_empty()),
        faculty_id: filter.faculty_id.clone().filter(|f| !f.trim().is_empty()),
    };
    Ok(class_repo::list(db, &filter)?)
}

pub fn get(db: &Database, id: &str) -> Result<ClassRow> {
    path_id("class", id)?;
    class_repo::find_by_id(db, id)?.ok_or_else(|| ServiceError::not_found("Class"))
}

fn require_department(db: &Database, department_id: &str) -> Result<()> {
    match department_repo::find_by_id(db, department_id)? {
        Some(_) => Ok(()),
        None => Err(ServiceError::not_found("Department")),
    }
}

pub fn create(db: &Database, payload: &ClassPayload) -> Result<ClassRow> {
    let mut checks = Checks::new();
    let name = checks.required(
        "className",
        payload.class_name.as_deref(),
        NAME_MAX,
        "Class name is required",
    );
    let department_id = checks.id("departmentId", payload.department_id.as_deref());
    let description = checks.optional("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    require_department(db, &department_id)?;

    let now = timestamp_now();
    let class = ClassRow {
        id: new_id(),
        name,
        department_id,
        description,
        created_at: now.clone(),
        updated_at: now,
        department: None,
    };
    class_repo::insert(db, &class)?;
    tracing::info!(id = %class.id, "Class created");
    get(db, &class.id)
}

pub fn update(db: &Database, id: &str, payload: &ClassPayload) -> Result<ClassRow> {
    let mut class = get(db, id)?;

    let mut checks = Checks::new();
    let name = checks.required_if_present(
        "className",
        payload.class_name.as_deref(),
        NAME_MAX,
        "Class name is required",
    );
    let department_id = payload
        .department_id
        .as_deref()
        .map(|d| checks.id("departmentId", Some(d)));
    let description =
        checks.optional_if_present("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    if let Some(department_id) = department_id {
        require_department(db, &department_id)?;
        class.department_id = department_id;
    }
    if let Some(name) = name {
        class.name = name;
    }
    if let Some(description) = description {
        class.description = description;
    }
    class.updated_at = timestamp_now();
    class_repo::update(db, &class)?;
    get(db, id)
}

/// Refuses while any non-deleted student is in the class.
pub fn delete(db: &Database, id: &str) -> Result<()> {
    get(db, id)?;
    if student_repo::count_active_referencing(db, Reference::Class, id)? > 0 {
        return Err(ServiceError::Conflict(
            "Cannot delete class with students. Move/delete students first.".to_string(),
        ));
    }
    class_repo::delete(db, id)?;
    tracing::info!(id, "Class deleted");
    Ok(())
}
