//! Student repository: CRUD, filtered listing and soft delete for the
//! `students` table.

use std::collections::BTreeSet;

use rusqlite::types::{FromSql, ToSql};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::class_repo::DepartmentSummary;
use super::department_repo::FacultySummary;
use super::{placeholders, Database, DatabaseError};
use crate::filter::StudentMatch;
use crate::model::Gender;

/// A raw student row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub id: String,
    pub student_id: i64,
    pub name: String,
    pub gender: Gender,
    pub email: Option<String>,
    pub phone_number: String,
    pub class_id: String,
    pub batch_id: String,
    pub job_id: Option<String>,
    pub photo_image: String,
    pub description: String,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl StudentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            student_id: row.get("student_id")?,
            name: row.get("name")?,
            gender: row.get("gender")?,
            email: row.get("email")?,
            phone_number: row.get("phone_number")?,
            class_id: row.get("class_id")?,
            batch_id: row.get("batch_id")?,
            job_id: row.get("job_id")?,
            photo_image: row.get("photo_image")?,
            description: row.get("description")?,
            is_deleted: row.get("is_deleted")?,
            deleted_at: row.get("deleted_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub id: String,
    pub class_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub id: String,
    pub batch_name: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub job_name: String,
}

/// A student with its class hierarchy, batch and job resolved.
///
/// References that point at deleted entities resolve to `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    #[serde(flatten)]
    pub student: StudentRow,
    pub class: Option<ClassSummary>,
    pub batch: Option<BatchSummary>,
    pub job: Option<JobSummary>,
}

impl StudentRecord {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let student = StudentRow::from_row(row)?;

        let faculty = match (
            row.get::<_, Option<String>>("faculty_ref")?,
            row.get::<_, Option<String>>("faculty_name")?,
        ) {
            (Some(id), Some(faculty_name)) => Some(FacultySummary { id, faculty_name }),
            _ => None,
        };
        let department = match (
            row.get::<_, Option<String>>("department_ref")?,
            row.get::<_, Option<String>>("department_name")?,
            row.get::<_, Option<String>>("faculty_ref")?,
        ) {
            (Some(id), Some(department_name), Some(faculty_id)) => Some(DepartmentSummary {
                id,
                department_name,
                faculty_id,
                faculty,
            }),
            _ => None,
        };
        let class = row
            .get::<_, Option<String>>("class_name")?
            .map(|class_name| ClassSummary {
                id: student.class_id.clone(),
                class_name,
                department,
            });
        let batch = match (
            row.get::<_, Option<String>>("batch_name")?,
            row.get::<_, Option<i32>>("batch_year")?,
        ) {
            (Some(batch_name), Some(year)) => Some(BatchSummary {
                id: student.batch_id.clone(),
                batch_name,
                year,
            }),
            _ => None,
        };
        let job = match (&student.job_id, row.get::<_, Option<String>>("job_name")?) {
            (Some(id), Some(job_name)) => Some(JobSummary {
                id: id.clone(),
                job_name,
            }),
            _ => None,
        };

        Ok(Self {
            student,
            class,
            batch,
            job,
        })
    }

    pub fn faculty_name(&self) -> Option<&str> {
        let department = self.class.as_ref()?.department.as_ref()?;
        department.faculty.as_ref().map(|f| f.faculty_name.as_str())
    }

    pub fn department_name(&self) -> Option<&str> {
        self.class
            .as_ref()?
            .department
            .as_ref()
            .map(|d| d.department_name.as_str())
    }
}

const SELECT_POPULATED: &str = "SELECT s.*,
            c.name AS class_name,
            d.id AS department_ref, d.name AS department_name,
            f.id AS faculty_ref, f.name AS faculty_name,
            b.name AS batch_name, b.year AS batch_year,
            j.name AS job_name
     FROM students s
     LEFT JOIN classes c ON c.id = s.class_id
     LEFT JOIN departments d ON d.id = c.department_id
     LEFT JOIN faculties f ON f.id = d.faculty_id
     LEFT JOIN batches b ON b.id = s.batch_id
     LEFT JOIN jobs j ON j.id = s.job_id";

/// Which reference a dependent-count check looks at.
#[derive(Debug, Clone, Copy)]
pub enum Reference {
    Class,
    Batch,
    Job,
}

impl Reference {
    fn column(&self) -> &'static str {
        match self {
            Reference::Class => "class_id",
            Reference::Batch => "batch_id",
            Reference::Job => "job_id",
        }
    }
}

/// Inserts a student on an already-locked connection (used inside
/// transactions).
pub fn insert_with(conn: &Connection, student: &StudentRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO students (id, student_id, name, gender, email, phone_number, class_id,
         batch_id, job_id, photo_image, description, is_deleted, deleted_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            student.id,
            student.student_id,
            student.name,
            student.gender,
            student.email,
            student.phone_number,
            student.class_id,
            student.batch_id,
            student.job_id,
            student.photo_image,
            student.description,
            student.is_deleted,
            student.deleted_at,
            student.created_at,
            student.updated_at,
        ],
    )?;
    Ok(())
}

pub fn insert(db: &Database, student: &StudentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_with(conn, student))
}

/// Overwrites every mutable column. `created_at` and the delete state are
/// left alone.
pub fn update(db: &Database, student: &StudentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE students SET student_id = ?2, name = ?3, gender = ?4, email = ?5,
             phone_number = ?6, class_id = ?7, batch_id = ?8, job_id = ?9, photo_image = ?10,
             description = ?11, updated_at = ?12
             WHERE id = ?1",
            params![
                student.id,
                student.student_id,
                student.name,
                student.gender,
                student.email,
                student.phone_number,
                student.class_id,
                student.batch_id,
                student.job_id,
                student.photo_image,
                student.description,
                student.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a student by id, deleted or not.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<StudentRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!("{} WHERE s.id = ?1", SELECT_POPULATED);
        Ok(conn
            .query_row(&sql, params![id], StudentRecord::from_row)
            .optional()?)
    })
}

/// Queries students under `filter`, newest first, returning
/// (page, total_count).
pub fn query(
    db: &Database,
    filter: &StudentMatch,
    limit: u64,
    offset: u64,
) -> Result<(Vec<StudentRecord>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut sql_filter = filter.to_sql("s");
        let where_clause = sql_filter.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM students s {}", where_clause);
        let total: u64 = conn.query_row(&count_sql, sql_filter.params().as_slice(), |r| {
            r.get(0)
        })?;

        let limit_ph = sql_filter.bind(limit as i64);
        let offset_ph = sql_filter.bind(offset as i64);
        let query_sql = format!(
            "{} {} ORDER BY s.created_at DESC, s.student_id DESC LIMIT {} OFFSET {}",
            SELECT_POPULATED, where_clause, limit_ph, offset_ph
        );
        let mut stmt = conn.prepare(&query_sql)?;
        let rows = stmt
            .query_map(sql_filter.params().as_slice(), StudentRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Every student under `filter`, newest first.
pub fn query_all(db: &Database, filter: &StudentMatch) -> Result<Vec<StudentRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let sql_filter = filter.to_sql("s");
        let sql = format!(
            "{} {} ORDER BY s.created_at DESC, s.student_id DESC",
            SELECT_POPULATED,
            sql_filter.where_clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(sql_filter.params().as_slice(), StudentRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Other non-deleted students sharing the batch or class of `student`.
pub fn related(
    db: &Database,
    student: &StudentRow,
    limit: u64,
) -> Result<Vec<StudentRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!(
            "{} WHERE s.is_deleted = 0 AND s.id != ?1 AND (s.batch_id = ?2 OR s.class_id = ?3)
             ORDER BY s.created_at DESC LIMIT ?4",
            SELECT_POPULATED
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![student.id, student.batch_id, student.class_id, limit as i64],
                StudentRecord::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Marks a student deleted. Returns false when no row matched.
pub fn soft_delete(db: &Database, id: &str, at: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE students SET is_deleted = 1, deleted_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![id, at],
        )?;
        Ok(changed > 0)
    })
}

pub fn restore(db: &Database, id: &str, at: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE students SET is_deleted = 0, deleted_at = NULL, updated_at = ?2 WHERE id = ?1",
            params![id, at],
        )?;
        Ok(changed > 0)
    })
}

/// Permanently removes a student.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| Ok(conn.execute("DELETE FROM students WHERE id = ?1", params![id])? > 0))
}

/// Soft- or hard-deletes every student under `filter`. Returns the number
/// of affected rows.
pub fn delete_matching(
    db: &Database,
    filter: &StudentMatch,
    force: bool,
    at: &str,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let mut sql_filter = filter.to_sql("s");
        let subquery = format!("SELECT s.id FROM students s {}", sql_filter.where_clause());
        let sql = if force {
            format!("DELETE FROM students WHERE id IN ({})", subquery)
        } else {
            let at_ph = sql_filter.bind(at.to_string());
            format!(
                "UPDATE students SET is_deleted = 1, deleted_at = {at_ph}, updated_at = {at_ph}
                 WHERE id IN ({subquery})"
            )
        };
        let changed = conn.execute(&sql, sql_filter.params().as_slice())?;
        Ok(changed as u64)
    })
}

/// True if another student (any delete state) already holds `student_id`.
pub fn student_id_taken(
    db: &Database,
    student_id: i64,
    exclude_id: Option<&str>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM students WHERE student_id = ?1 AND id != COALESCE(?2, '')",
            params![student_id, exclude_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}

/// Counts non-deleted students pointing at `id` through `reference`.
pub fn count_active_referencing(
    db: &Database,
    reference: Reference,
    id: &str,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!(
            "SELECT COUNT(*) FROM students WHERE is_deleted = 0 AND {} = ?1",
            reference.column()
        );
        Ok(conn.query_row(&sql, params![id], |r| r.get(0))?)
    })
}

/// Keys per `IN (...)` lookup. Keeps bulk imports far below SQLite's
/// bound-parameter limit.
pub(crate) const LOOKUP_CHUNK: usize = 500;

/// The subset of `student_ids` already stored, in any delete state.
pub fn existing_student_ids(
    conn: &Connection,
    student_ids: &BTreeSet<i64>,
) -> Result<BTreeSet<i64>, DatabaseError> {
    existing_in(conn, "student_id", student_ids, LOOKUP_CHUNK)
}

/// The subset of `emails` already stored, in any delete state.
pub fn existing_emails(
    conn: &Connection,
    emails: &BTreeSet<String>,
) -> Result<BTreeSet<String>, DatabaseError> {
    existing_in(conn, "email", emails, LOOKUP_CHUNK)
}

fn existing_in<T>(
    conn: &Connection,
    column: &str,
    keys: &BTreeSet<T>,
    chunk: usize,
) -> Result<BTreeSet<T>, DatabaseError>
where
    T: ToSql + FromSql + Ord,
{
    let keys: Vec<&T> = keys.iter().collect();
    let mut found = BTreeSet::new();
    for batch in keys.chunks(chunk.max(1)) {
        let sql = format!(
            "SELECT {column} FROM students WHERE {column} IN ({})",
            placeholders(1, batch.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(batch.iter().copied()), |r| r.get(0))?;
        for row in rows {
            found.insert(row?);
        }
    }
    Ok(found)
}
