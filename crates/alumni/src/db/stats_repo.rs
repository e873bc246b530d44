//! Student aggregation queries.
//!
//! Every function counts students under a resolved [`StudentMatch`] and
//! returns raw grouped rows. Shaping into chart series happens in
//! `crate::analytics`.

use rusqlite::Row;

use super::{Database, DatabaseError};
use crate::filter::StudentMatch;
use crate::model::Gender;

const EMPLOYED: &str = "SUM(CASE WHEN s.job_id IS NOT NULL THEN 1 ELSE 0 END)";
const MALE: &str = "SUM(CASE WHEN s.gender = 'Male' THEN 1 ELSE 0 END)";
const FEMALE: &str = "SUM(CASE WHEN s.gender = 'Female' THEN 1 ELSE 0 END)";

const JOIN_HIERARCHY: &str = "JOIN classes c ON c.id = s.class_id
     JOIN departments d ON d.id = c.department_id
     JOIN faculties f ON f.id = d.faculty_id";

/// Label used for students without a job reference.
pub const UNEMPLOYED_LABEL: &str = "Unemployed";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub total: u64,
    pub employed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearCount {
    pub year: i32,
    pub total: u64,
    pub employed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenderCount {
    pub gender: Gender,
    pub total: u64,
    pub employed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearGender {
    pub year: i32,
    pub male: u64,
    pub female: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobGender {
    pub job_name: String,
    pub male: u64,
    pub female: u64,
    pub total: u64,
}

/// A count grouped by a named entity (faculty, department, class).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    pub id: String,
    pub name: String,
    pub total: u64,
    pub employed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

/// Row counts of the reference tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceTotals {
    pub faculties: u64,
    pub departments: u64,
    pub classes: u64,
    pub batches: u64,
}

/// Runs one grouped query. `build` receives the rendered `WHERE` clause.
fn grouped<T, B, F>(
    db: &Database,
    filter: &StudentMatch,
    build: B,
    map: F,
) -> Result<Vec<T>, DatabaseError>
where
    B: FnOnce(&str) -> String,
    F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
{
    db.with_conn(|conn| {
        let sql_filter = filter.to_sql("s");
        let sql = build(&sql_filter.where_clause());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(sql_filter.params().as_slice(), map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn totals(db: &Database, filter: &StudentMatch) -> Result<Totals, DatabaseError> {
    let rows = grouped(
        db,
        filter,
        |w| format!("SELECT COUNT(*), COALESCE({EMPLOYED}, 0) FROM students s {w}"),
        |r| {
            Ok(Totals {
                total: r.get(0)?,
                employed: r.get(1)?,
            })
        },
    )?;
    Ok(rows.into_iter().next().unwrap_or_default())
}

/// Counts per batch year, ascending. Years without students are absent.
pub fn by_batch_year(db: &Database, filter: &StudentMatch) -> Result<Vec<YearCount>, DatabaseError> {
    grouped(
        db,
        filter,
        |w| {
            format!(
                "SELECT b.year, COUNT(*), {EMPLOYED} FROM students s
                 JOIN batches b ON b.id = s.batch_id {w}
                 GROUP BY b.year ORDER BY b.year ASC"
            )
        },
        |r| {
            Ok(YearCount {
                year: r.get(0)?,
                total: r.get(1)?,
                employed: r.get(2)?,
            })
        },
    )
}

pub fn by_gender(db: &Database, filter: &StudentMatch) -> Result<Vec<GenderCount>, DatabaseError> {
    grouped(
        db,
        filter,
        |w| {
            format!(
                "SELECT s.gender, COUNT(*), {EMPLOYED} FROM students s {w}
                 GROUP BY s.gender ORDER BY s.gender ASC"
            )
        },
        |r| {
            Ok(GenderCount {
                gender: r.get(0)?,
                total: r.get(1)?,
                employed: r.get(2)?,
            })
        },
    )
}

pub fn gender_by_batch_year(
    db: &Database,
    filter: &StudentMatch,
) -> Result<Vec<YearGender>, DatabaseError> {
    grouped(
        db,
        filter,
        |w| {
            format!(
                "SELECT b.year, {MALE}, {FEMALE} FROM students s
                 JOIN batches b ON b.id = s.batch_id {w}
                 GROUP BY b.year ORDER BY b.year ASC"
            )
        },
        |r| {
            Ok(YearGender {
                year: r.get(0)?,
                male: r.get(1)?,
                female: r.get(2)?,
            })
        },
    )
}

/// Gender split per job name; students without a job are grouped under
/// [`UNEMPLOYED_LABEL`].
pub fn gender_by_job(db: &Database, filter: &StudentMatch) -> Result<Vec<JobGender>, DatabaseError> {
    grouped(
        db,
        filter,
        |w| {
            format!(
                "SELECT COALESCE(j.name, '{UNEMPLOYED_LABEL}') AS job_name, {MALE}, {FEMALE}, COUNT(*)
                 FROM students s LEFT JOIN jobs j ON j.id = s.job_id {w}
                 GROUP BY job_name"
            )
        },
        |r| {
            Ok(JobGender {
                job_name: r.get(0)?,
                male: r.get(1)?,
                female: r.get(2)?,
                total: r.get(3)?,
            })
        },
    )
}

pub fn by_job(db: &Database, filter: &StudentMatch) -> Result<Vec<LabelCount>, DatabaseError> {
    grouped(
        db,
        filter,
        |w| {
            format!(
                "SELECT COALESCE(j.name, '{UNEMPLOYED_LABEL}') AS job_name, COUNT(*)
                 FROM students s LEFT JOIN jobs j ON j.id = s.job_id {w}
                 GROUP BY job_name"
            )
        },
        |r| {
            Ok(LabelCount {
                label: r.get(0)?,
                count: r.get(1)?,
            })
        },
    )
}

/// Which level of the class hierarchy to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Faculty,
    Department,
    Class,
}

impl Level {
    fn columns(&self) -> (&'static str, &'static str) {
        match self {
            Level::Faculty => ("f.id", "f.name"),
            Level::Department => ("d.id", "d.name"),
            Level::Class => ("c.id", "c.name"),
        }
    }
}

/// Counts per faculty, department or class. Students whose hierarchy is
/// broken (a referenced row was deleted) are not counted.
pub fn by_level(
    db: &Database,
    filter: &StudentMatch,
    level: Level,
) -> Result<Vec<GroupCount>, DatabaseError> {
    let (id, name) = level.columns();
    grouped(
        db,
        filter,
        |w| {
            format!(
                "SELECT {id}, {name}, COUNT(*), {EMPLOYED} FROM students s
                 {JOIN_HIERARCHY} {w}
                 GROUP BY {id}, {name}"
            )
        },
        |r| {
            Ok(GroupCount {
                id: r.get(0)?,
                name: r.get(1)?,
                total: r.get(2)?,
                employed: r.get(3)?,
            })
        },
    )
}

pub fn reference_totals(db: &Database) -> Result<ReferenceTotals, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.query_row(
            "SELECT (SELECT COUNT(*) FROM faculties), (SELECT COUNT(*) FROM departments),
                    (SELECT COUNT(*) FROM classes), (SELECT COUNT(*) FROM batches)",
            [],
            |r| {
                Ok(ReferenceTotals {
                    faculties: r.get(0)?,
                    departments: r.get(1)?,
                    classes: r.get(2)?,
                    batches: r.get(3)?,
                })
            },
        )?)
    })
}
