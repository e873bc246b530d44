//! Faculty repository: CRUD operations for the `faculties` table.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyRow {
    pub id: String,
    #[serde(rename = "facultyName")]
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl FacultyRow {
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

pub fn insert(db: &Database, faculty: &FacultyRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO faculties (id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                faculty.id,
                faculty.name,
                faculty.description,
                faculty.created_at,
                faculty.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn update(db: &Database, faculty: &FacultyRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE faculties SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
            params![faculty.id, faculty.name, faculty.description, faculty.updated_at],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<FacultyRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM faculties WHERE id = ?1",
                params![id],
                FacultyRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists every faculty ordered by name.
pub fn list(db: &Database) -> Result<Vec<FacultyRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM faculties ORDER BY name ASC, created_at ASC")?;
        let rows = stmt
            .query_map([], FacultyRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a faculty. Returns false when no row matched.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| Ok(conn.execute("DELETE FROM faculties WHERE id = ?1", params![id])? > 0))
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM faculties", [], |r| r.get(0))?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_faculty(id: &str, name: &str) -> FacultyRow {
        FacultyRow {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        insert(&db, &sample_faculty("f1", "Engineering")).unwrap();

        let found = find_by_id(&db, "f1").unwrap().unwrap();
        assert_eq!(found.name, "Engineering");
        assert!(find_by_id(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let db = test_db();
        insert(&db, &sample_faculty("f1", "Science")).unwrap();
        insert(&db, &sample_faculty("f2", "Arts")).unwrap();

        let names: Vec<String> = list(&db).unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Arts", "Science"]);
        assert_eq!(count(&db).unwrap(), 2);
    }

    #[test]
    fn test_update_and_delete() {
        let db = test_db();
        let mut faculty = sample_faculty("f1", "Science");
        insert(&db, &faculty).unwrap();

        faculty.description = "Natural sciences".to_string();
        update(&db, &faculty).unwrap();
        assert_eq!(
            find_by_id(&db, "f1").unwrap().unwrap().description,
            "Natural sciences"
        );

        assert!(delete(&db, "f1").unwrap());
        assert!(!delete(&db, "f1").unwrap());
    }

    #[test]
    fn test_serializes_api_field_names() {
        let json = serde_json::to_value(sample_faculty("f1", "Science")).unwrap();
        assert_eq!(json["facultyName"], "Science");
        assert!(json.get("createdAt").is_some());
    }
}
