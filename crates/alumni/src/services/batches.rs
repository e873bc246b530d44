use serde::Deserialize;

use crate::db::batch_repo::{self, BatchRow};
use crate::db::student_repo::{self, Reference};
use crate::db::Database;
use crate::error::{Result, ServiceError};
use crate::model::{new_id, timestamp_now};
use crate::services::validate::{lenient_string, path_id, Checks, DESCRIPTION_MAX, NAME_MAX};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub batch_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

/// Batches, newest year first.
pub fn list(db: &Database) -> Result<Vec<BatchRow>> {
    Ok(batch_repo::list(db)?)
}

pub fn get(db: &Database, id: &str) -> Result<BatchRow> {
    path_id("batch", id)?;
    batch_repo::find_by_id(db, id)?.ok_or_else(|| ServiceError::not_found("Batch"))
}

pub fn create(db: &Database, payload: &BatchPayload) -> Result<BatchRow> {
    let mut checks = Checks::new();
    let name = checks.required(
        "batchName",
        payload.batch_name.as_deref(),
        NAME_MAX,
        "Batch name is required",
    );
    let year = checks.year("year", payload.year.as_deref());
    let description = checks.optional("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    let now = timestamp_now();
    let batch = BatchRow {
        id: new_id(),
        name,
        year,
        description,
        created_at: now.clone(),
        updated_at: now,
    };
    batch_repo::insert(db, &batch)?;
    tracing::info!(id = %batch.id, year, "Batch created");
    Ok(batch)
}

pub fn update(db: &Database, id: &str, payload: &BatchPayload) -> Result<BatchRow> {
    let mut batch = get(db, id)?;

    let mut checks = Checks::new();
    let name = checks.required_if_present(
        "batchName",
        payload.batch_name.as_deref(),
        NAME_MAX,
        "Batch name is required",
    );
    let year = payload
        .year
        .as_deref()
        .map(|y| checks.year("year", Some(y)));
    let description =
        checks.optional_if_present("description", payload.description.as_deref(), DESCRIPTION_MAX);
    checks.finish()?;

    if let Some(name) = name {
        batch.name = name;
    }
    if let Some(year) = year {
        batch.year = year;
    }
    if let Some(description) = description {
        batch.description = description;
    }
    batch.updated_at = timestamp_now();
    batch_repo::update(db, &batch)?;
    Ok(batch)
}

/// Refuses while any non-deleted student is in the batch.
pub fn delete(db: &Database, id: &str) -> Result<()> {
    get(db, id)?;
    if student_repo::count_active_referencing(db, Reference::Batch, id)? > 0 {
        return Err(ServiceError::Conflict(
            "Cannot delete batch with students. Move/delete students first.".to_string(),
        ));
    }
    batch_repo::delete(db, id)?;
    tracing::info!(id, "Batch deleted");
    Ok(())
}
