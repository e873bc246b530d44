//! Full JSON dump of the reference data and active students.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::admin_repo::{self, AdminRow};
use crate::db::batch_repo::{self, BatchRow};
use crate::db::class_repo::{self, ClassFilter, ClassRow};
use crate::db::department_repo::{self, DepartmentRow};
use crate::db::faculty_repo::{self, FacultyRow};
use crate::db::job_repo::{self, JobRow};
use crate::db::student_repo::{self, StudentRecord};
use crate::db::Database;
use crate::error::{ReportError, Result};
use crate::filter::StudentMatch;
use crate::model::format_timestamp;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub exported_at: String,
    pub admins: Vec<AdminRow>,
    pub faculties: Vec<FacultyRow>,
    pub departments: Vec<DepartmentRow>,
    pub classes: Vec<ClassRow>,
    pub batches: Vec<BatchRow>,
    pub jobs: Vec<JobRow>,
    pub students: Vec<StudentRecord>,
}

/// A rendered backup file ready to be downloaded.
#[derive(Debug, Clone)]
pub struct BackupFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Collects the dump. Password hashes never leave the admin table.
pub fn collect(db: &Database, now: DateTime<Utc>) -> Result<Backup> {
    Ok(Backup {
        exported_at: format_timestamp(now),
        admins: admin_repo::list(db)?,
        faculties: faculty_repo::list(db)?,
        departments: department_repo::list(db, None)?,
        classes: class_repo::list(db, &ClassFilter::default())?,
        batches: batch_repo::list(db)?,
        jobs: job_repo::list(db)?,
        students: student_repo::query_all(db, &StudentMatch::default())?,
    })
}

pub fn backup_file(db: &Database, now: DateTime<Utc>) -> Result<BackupFile> {
    let backup = collect(db, now)?;
    let bytes = serde_json::to_vec_pretty(&backup).map_err(ReportError::from)?;
    tracing::info!(
        students = backup.students.len(),
        faculties = backup.faculties.len(),
        "Backup exported"
    );
    Ok(BackupFile {
        filename: format!("alumni-backup-{}.json", now.format("%Y-%m-%d")),
        bytes,
    })
}
