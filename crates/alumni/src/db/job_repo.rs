//! Job repository: CRUD operations for the `jobs` table.
//!
//! Job names are unique without regard to ASCII case.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    pub id: String,
    #[serde(rename = "jobName")]
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![job.id, job.name, job.description, job.created_at, job.updated_at],
        )?;
        Ok(())
    })
}

/// Updates an existing job row. All fields except `id` and `created_at` are overwritten.
pub fn update(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
            params![job.id, job.name, job.description, job.updated_at],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds a job by name, ignoring ASCII case.
pub fn find_by_name(db: &Database, name: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM jobs WHERE name = ?1 COLLATE NOCASE",
                params![name],
                JobRow::from_row,
            )
            .optional()?)
    })
}

/// Lists jobs ordered by name.
pub fn list(db: &Database) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs ORDER BY name ASC")?;
        let rows = stmt
            .query_map([], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Maps lowercased job names to ids, for spreadsheet import lookups.
pub fn ids_by_lowercase_name(db: &Database) -> Result<HashMap<String, String>, DatabaseError> {
    Ok(list(db)?
        .into_iter()
        .map(|job| (job.name.trim().to_lowercase(), job.id))
        .collect())
}

pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| Ok(conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])? > 0))
}
