//! Class repository: CRUD operations for the `classes` table.

use std::collections::BTreeSet;

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::department_repo::FacultySummary;
use super::{placeholders, Database, DatabaseError};

/// Department fields embedded in class payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub id: String,
    pub department_name: String,
    pub faculty_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty: Option<FacultySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRow {
    pub id: String,
    #[serde(rename = "className")]
    pub name: String,
    pub department_id: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentSummary>,
}

const SELECT_POPULATED: &str = "SELECT c.*, d.name AS department_name, d.faculty_id AS faculty_id,
            f.name AS faculty_name
     FROM classes c
     LEFT JOIN departments d ON d.id = c.department_id
     LEFT JOIN faculties f ON f.id = d.faculty_id";

impl ClassRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let department_id: String = row.get("department_id")?;
        let department_name: Option<String> = row.get("department_name")?;
        let faculty_id: Option<String> = row.get("faculty_id")?;
        let faculty_name: Option<String> = row.get("faculty_name")?;

        let department = match (department_name, faculty_id) {
            (Some(department_name), Some(faculty_id)) => Some(DepartmentSummary {
                id: department_id.clone(),
                department_name,
                faculty: faculty_name.map(|faculty_name| FacultySummary {
                    id: faculty_id.clone(),
                    faculty_name,
                }),
                faculty_id,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            department_id,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            department,
        })
    }
}

/// Optional narrowing for class listings.
#[derive(Debug, Default, Clone)]
pub struct ClassFilter {
    pub department_id: Option<String>,
    pub faculty_id: Option<String>,
}

pub fn insert(db: &Database, class: &ClassRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO classes (id, name, department_id, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                class.id,
                class.name,
                class.department_id,
                class.description,
                class.created_at,
                class.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn update(db: &Database, class: &ClassRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE classes SET name = ?2, department_id = ?3, description = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                class.id,
                class.name,
                class.department_id,
                class.description,
                class.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<ClassRow>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!("{} WHERE c.id = ?1", SELECT_POPULATED);
        Ok(conn.query_row(&sql, params![id], ClassRow::from_row).optional()?)
    })
}

/// Lists classes ordered by name. Department and faculty narrowing combine.
pub fn list(db: &Database, filter: &ClassFilter) -> Result<Vec<ClassRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

        if let Some(ref department_id) = filter.department_id {
            conditions.push(format!("c.department_id = ?{}", param_values.len() + 1));
            param_values.push(department_id);
        }
        if let Some(ref faculty_id) = filter.faculty_id {
            conditions.push(format!("d.faculty_id = ?{}", param_values.len() + 1));
            param_values.push(faculty_id);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("{} {} ORDER BY c.name ASC", SELECT_POPULATED, where_clause);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(param_values.as_slice(), ClassRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| Ok(conn.execute("DELETE FROM classes WHERE id = ?1", params![id])? > 0))
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM classes", [], |r| r.get(0))?))
}

pub fn count_by_department(db: &Database, department_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM classes WHERE department_id = ?1",
            params![department_id],
            |r| r.get(0),
        )?)
    })
}

/// Ids of existing classes matching every supplied restriction.
///
/// `ids` keeps only the listed classes, `department_ids` keeps only classes
/// under the listed departments. With neither restriction nothing matches.
pub fn ids_matching(
    db: &Database,
    ids: Option<&BTreeSet<String>>,
    department_ids: Option<&BTreeSet<String>>,
) -> Result<BTreeSet<String>, DatabaseError> {
    if ids.is_none() && department_ids.is_none() {
        return Ok(BTreeSet::new());
    }
    if ids.is_some_and(|s| s.is_empty()) || department_ids.is_some_and(|s| s.is_empty()) {
        return Ok(BTreeSet::new());
    }

    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<&String> = Vec::new();

        if let Some(ids) = ids {
            conditions.push(format!(
                "id IN ({})",
                placeholders(param_values.len() + 1, ids.len())
            ));
            param_values.extend(ids.iter());
        }
        if let Some(department_ids) = department_ids {
            conditions.push(format!(
                "department_id IN ({})",
                placeholders(param_values.len() + 1, department_ids.len())
            ));
            param_values.extend(department_ids.iter());
        }

        let sql = format!("SELECT id FROM classes WHERE {}", conditions.join(" AND "));
        let mut stmt = conn.prepare(&sql)?;
        let found = stmt
            .query_map(rusqlite::params_from_iter(param_values), |r| {
                r.get::<_, String>(0)
            })?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(found)
    })
}
