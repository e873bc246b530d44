use serde::Deserialize;

use crate::db::job_repo::{self, JobRow};
use crate::db::student_repo::{self, Reference};
use crate::db::Database;
use crate::error::{Result, ServiceError};
use crate::model::{new_id, timestamp_now};
use crate::services::validate::{lenient_string, path_id, Checks, DESCRIPTION_MAX, NAME_MAX};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

pub fn list(db: &Database) -> Result<Vec<JobRow>> {
    Ok(job_repo::list(db)?)
}

pub fn get(db: &Database, id: &str) -> Result<JobRow> {
    path_id("job", id)?;
    job_repo::find_by_id(db, id)?.ok_or_else(|| ServiceError::not_found("Job"))
}

/// Job names are unique regardless of case.
fn ensure_name_free(db: &Database, name: &str, own_id: Option<&str>) -> Result<()> {
    match job_repo::find_by_name(db, name)? {
        Some(existing) if Some(existing.id.as_str()) != own_id => Err(ServiceError::Conflict(
            format!("Job \"{}\" already exists", existing.name),
        )),
        _ => Ok(()),
    }
}

pub fn create(db: &Database, payload: &JobPayload) -> Result<JobRow> {
    let mut checks = Checks::new();
    let name = checks.required("jobName", payload.job_name.as_deref(), NAME_MAX, "Job name is required");
    let description = checks.optional("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    ensure_name_free(db, &name, None)?;

    let now = timestamp_now();
    let job = JobRow {
        id: new_id(),
        name,
        description,
        created_at: now.clone(),
        updated_at: now,
    };
    job_repo::insert(db, &job)?;
    tracing::info!(id = %job.id, "Job created");
    Ok(job)
}

pub fn update(db: &Database, id: &str, payload: &JobPayload) -> Result<JobRow> {
    let mut job = get(db, id)?;

    let mut checks = Checks::new();
    let name = checks.required_if_present(
        "jobName",
        payload.job_name.as_deref(),
        NAME_MAX,
        "Job name is required",
    );
    let description =
        checks.optional_if_present("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    if let Some(name) = name {
        ensure_name_free(db, &name, Some(id))?;
        job.name = name;
    }
    if let Some(description) = description {
        job.description = description;
    }
    job.updated_at = timestamp_now();
    job_repo::update(db, &job)?;
    Ok(job)
}

/// Refuses while any non-deleted student holds the job.
pub fn delete(db: &Database, id: &str) -> Result<()> {
    get(db, id)?;
    if student_repo::count_active_referencing(db, Reference::Job, id)? > 0 {
        return Err(ServiceError::Conflict(
            "Cannot delete job that is assigned to students. Update students first.".to_string(),
        ));
    }
    job_repo::delete(db, id)?;
    tracing::info!(id, "Job deleted");
    Ok(())
}
