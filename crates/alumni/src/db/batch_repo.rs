//! Batch repository: CRUD operations for the `batches` table.

use std::collections::BTreeSet;

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{placeholders, Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRow {
    pub id: String,
    #[serde(rename = "batchName")]
    pub name: String,
    pub year: i32,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl BatchRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            year: row.get("year")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub fn insert(db: &Database, batch: &BatchRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO batches (id, name, year, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                batch.id,
                batch.name,
                batch.year,
                batch.description,
                batch.created_at,
                batch.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn update(db: &Database, batch: &BatchRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE batches SET name = ?2, year = ?3, description = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                batch.id,
                batch.name,
                batch.year,
                batch.description,
                batch.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<BatchRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM batches WHERE id = ?1",
                params![id],
                BatchRow::from_row,
            )
            .optional()?)
    })
}

/// Lists batches, newest year first.
pub fn list(db: &Database) -> Result<Vec<BatchRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM batches ORDER BY year DESC")?;
        let rows = stmt
            .query_map([], BatchRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| Ok(conn.execute("DELETE FROM batches WHERE id = ?1", params![id])? > 0))
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM batches", [], |r| r.get(0))?))
}

/// Ids of batches whose id is listed in `ids` or whose year is listed in
/// `years`.
pub fn ids_matching(
    db: &Database,
    ids: &BTreeSet<String>,
    years: &BTreeSet<i32>,
) -> Result<BTreeSet<String>, DatabaseError> {
    if ids.is_empty() && years.is_empty() {
        return Ok(BTreeSet::new());
    }

    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if !ids.is_empty() {
            conditions.push(format!(
                "id IN ({})",
                placeholders(param_values.len() + 1, ids.len())
            ));
            for id in ids {
                param_values.push(Box::new(id.clone()));
            }
        }
        if !years.is_empty() {
            conditions.push(format!(
                "year IN ({})",
                placeholders(param_values.len() + 1, years.len())
            ));
            for year in years {
                param_values.push(Box::new(*year));
            }
        }

        let sql = format!("SELECT id FROM batches WHERE {}", conditions.join(" OR "));
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let found = stmt
            .query_map(params_ref.as_slice(), |r| r.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(found)
    })
}
