//! Department repository: CRUD operations for the `departments` table.

use std::collections::BTreeSet;

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{placeholders, Database, DatabaseError};

/// Faculty fields embedded in department and class payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultySummary {
    pub id: String,
    pub faculty_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRow {
    pub id: String,
    #[serde(rename = "departmentName")]
    pub name: String,
    pub faculty_id: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    /// Populated on reads; `None` if the faculty no longer exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty: Option<FacultySummary>,
}

const SELECT_POPULATED: &str = "SELECT d.*, f.name AS faculty_name
     FROM departments d LEFT JOIN faculties f ON f.id = d.faculty_id";

impl DepartmentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let faculty_id: String = row.get("faculty_id")?;
        let faculty_name: Option<String> = row.get("faculty_name")?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            faculty: faculty_name.map(|faculty_name| FacultySummary {
                id: faculty_id.clone(),
                faculty_name,
            }),
            faculty_id,
        })
    }
}

pub fn insert(db: &Database, department: &DepartmentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO departments (id, name, faculty_id, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                department.id,
                department.name,
                department.faculty_id,
                department.description,
                department.created_at,
                department.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn update(db: &Database, department: &DepartmentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE departments SET name = ?2, faculty_id = ?3, description = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                department.id,
                department.name,
                department.faculty_id,
                department.description,
                department.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<DepartmentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!("{} WHERE d.id = ?1", SELECT_POPULATED);
        Ok(conn
            .query_row(&sql, params![id], DepartmentRow::from_row)
            .optional()?)
    })
}

/// Lists departments ordered by name, optionally limited to one faculty.
pub fn list(db: &Database, faculty_id: Option<&str>) -> Result<Vec<DepartmentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let rows = match faculty_id {
            Some(faculty_id) => {
                let sql = format!(
                    "{} WHERE d.faculty_id = ?1 ORDER BY d.name ASC",
                    SELECT_POPULATED
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![faculty_id], DepartmentRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let sql = format!("{} ORDER BY d.name ASC", SELECT_POPULATED);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], DepartmentRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    })
}

pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| Ok(conn.execute("DELETE FROM departments WHERE id = ?1", params![id])? > 0))
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM departments", [], |r| r.get(0))?))
}

pub fn count_by_faculty(db: &Database, faculty_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM departments WHERE faculty_id = ?1",
            params![faculty_id],
            |r| r.get(0),
        )?)
    })
}

/// Ids of every department that belongs to one of `faculty_ids`.
pub fn ids_by_faculties(
    db: &Database,
    faculty_ids: &BTreeSet<String>,
) -> Result<BTreeSet<String>, DatabaseError> {
    if faculty_ids.is_empty() {
        return Ok(BTreeSet::new());
    }
    db.with_conn(|conn| {
        let sql = format!(
            "SELECT id FROM departments WHERE faculty_id IN ({})",
            placeholders(1, faculty_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(rusqlite::params_from_iter(faculty_ids.iter()), |r| {
                r.get::<_, String>(0)
            })?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(ids)
    })
}
