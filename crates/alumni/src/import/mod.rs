//! Bulk student import from an xlsx upload.
//!
//! Every row of the first worksheet becomes a student in one shared class
//! and batch. Rows that fail validation or collide with an existing
//! student are skipped with a reason; the rest are committed together.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::db::student_repo::{self, StudentRow};
use crate::db::{batch_repo, class_repo, department_repo, faculty_repo, job_repo, Database};
use crate::error::{Result, ServiceError};
use crate::model::{is_valid_id, new_id, parse_positive_integer, timestamp_now, Gender};
use crate::services::validate::{
    is_valid_email, normalize_email, Checks, PHONE_MAX, STUDENT_DESCRIPTION_MAX, STUDENT_NAME_MAX,
};
use crate::xlsx::{read_first_sheet, SheetRow};

mod template;

pub use template::{import_template, TEMPLATE_FILENAME};

/// Largest accepted upload.
pub const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

/// The class and batch every imported row is assigned to, plus the
/// faculty and department they must sit under. Values arrive as raw form
/// fields.
#[derive(Debug, Clone, Default)]
pub struct ImportTarget {
    pub faculty_id: Option<String>,
    pub department_id: Option<String>,
    pub class_id: Option<String>,
    pub batch_id: Option<String>,
}

/// An uploaded workbook.
#[derive(Debug, Clone, Copy)]
pub struct ImportFile<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InvalidStudentId,
    MissingName,
    InvalidGender,
    InvalidEmail,
    ValueTooLong,
    DuplicateStudentId,
    DuplicateEmail,
}

impl SkipReason {
    pub fn message(&self) -> &'static str {
        match self {
            SkipReason::InvalidStudentId => "Missing/invalid studentId (positive integer only)",
            SkipReason::MissingName => "Missing required name",
            SkipReason::InvalidGender => "Invalid gender (use Male/Female)",
            SkipReason::InvalidEmail => "Invalid email format",
            SkipReason::ValueTooLong => "Value exceeds maximum length",
            SkipReason::DuplicateStudentId => "Duplicate studentId",
            SkipReason::DuplicateEmail => "Duplicate email",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub row: u32,
    pub code: SkipReason,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported: usize,
    pub skipped: usize,
    pub class_name: String,
    pub batch_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub skipped_rows: Vec<SkippedRow>,
}

impl ImportReport {
    pub fn message(&self) -> String {
        format!("Imported {} students", self.summary.imported)
    }

    fn skip(&mut self, row: u32, code: SkipReason) {
        self.skipped_rows.push(SkippedRow {
            row,
            code,
            reason: code.message().to_string(),
        });
        self.summary.skipped += 1;
    }
}

/// Column positions found in the header row.
struct Columns {
    student_id: usize,
    name: usize,
    gender: Option<usize>,
    email: Option<usize>,
    phone_number: Option<usize>,
    job_name: Option<usize>,
    description: Option<usize>,
}

impl Columns {
    fn from_header(header: &SheetRow) -> Option<Self> {
        let positions: HashMap<String, usize> = header
            .cells
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_header(h), i))
            .filter(|(h, _)| !h.is_empty())
            .collect();
        let find = |key: &str| positions.get(key).copied();
        Some(Self {
            student_id: find("studentid")?,
            name: find("name")?,
            gender: find("gender"),
            email: find("email"),
            phone_number: find("phonenumber"),
            job_name: find("jobname"),
            description: find("description"),
        })
    }
}

/// Lowercases and drops whitespace, `_` and `-`.
fn normalize_header(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn cell(row: &SheetRow, column: Option<usize>) -> &str {
    column
        .and_then(|i| row.cells.get(i))
        .map(|s| s.trim())
        .unwrap_or_default()
}

/// A row that passed field validation and still needs dedupe.
struct Candidate {
    row: u32,
    student_id: i64,
    name: String,
    gender: Gender,
    email: Option<String>,
    phone_number: String,
    job_id: Option<String>,
    description: String,
}

fn validate_row(
    row: &SheetRow,
    columns: &Columns,
    jobs: &HashMap<String, String>,
) -> std::result::Result<Candidate, SkipReason> {
    let student_id =
        parse_positive_integer(cell(row, Some(columns.student_id))).ok_or(SkipReason::InvalidStudentId)?;

    let name = cell(row, Some(columns.name));
    if name.is_empty() {
        return Err(SkipReason::MissingName);
    }

    let gender = Gender::normalize(cell(row, columns.gender)).ok_or(SkipReason::InvalidGender)?;

    let email = normalize_email(cell(row, columns.email));
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(SkipReason::InvalidEmail);
        }
    }

    let phone_number = cell(row, columns.phone_number);
    let description = cell(row, columns.description);
    if name.chars().count() > STUDENT_NAME_MAX
        || phone_number.chars().count() > PHONE_MAX
        || description.chars().count() > STUDENT_DESCRIPTION_MAX
    {
        return Err(SkipReason::ValueTooLong);
    }

    let job_name = cell(row, columns.job_name).to_lowercase();
    let job_id = if job_name.is_empty() {
        None
    } else {
        jobs.get(&job_name).cloned()
    };

    Ok(Candidate {
        row: row.number,
        student_id,
        name: name.to_string(),
        gender,
        email,
        phone_number: phone_number.to_string(),
        job_id,
        description: description.to_string(),
    })
}

/// Checks the target ids and loads the class and batch names.
fn resolve_target(db: &Database, target: &ImportTarget) -> Result<(String, String, String, String)> {
    let mut checks = Checks::new();
    let required = |value: &Option<String>| value.as_deref().map(str::trim).unwrap_or_default().to_string();
    let faculty_id = required(&target.faculty_id);
    let department_id = required(&target.department_id);
    let class_id = required(&target.class_id);
    let batch_id = required(&target.batch_id);
    for (field, value) in [
        ("facultyId", &faculty_id),
        ("departmentId", &department_id),
        ("classId", &class_id),
        ("batchId", &batch_id),
    ] {
        if value.is_empty() {
            checks.fail(field, format!("{} is required", field));
        }
    }
    checks.finish()?;

    if ![&faculty_id, &department_id, &class_id, &batch_id]
        .iter()
        .all(|id| is_valid_id(id))
    {
        return Err(ServiceError::invalid(
            "Invalid faculty/department/class/batch selection",
        ));
    }

    let faculty = faculty_repo::find_by_id(db, &faculty_id)?.ok_or_else(|| ServiceError::not_found("Faculty"))?;
    let department = department_repo::find_by_id(db, &department_id)?
        .ok_or_else(|| ServiceError::not_found("Department"))?;
    let class = class_repo::find_by_id(db, &class_id)?.ok_or_else(|| ServiceError::not_found("Class"))?;
    let batch = batch_repo::find_by_id(db, &batch_id)?.ok_or_else(|| ServiceError::not_found("Batch"))?;

    if department.faculty_id != faculty.id {
        return Err(ServiceError::invalid(
            "Selected department does not belong to selected faculty",
        ));
    }
    if class.department_id != department.id {
        return Err(ServiceError::invalid(
            "Selected class does not belong to selected department",
        ));
    }

    Ok((class.id, class.name, batch.id, batch.name))
}

fn check_file(file: Option<ImportFile<'_>>) -> Result<ImportFile<'_>> {
    let file = file
        .filter(|f| !f.bytes.is_empty())
        .ok_or_else(|| ServiceError::invalid("Import file is required"))?;
    if !file.file_name.to_ascii_lowercase().ends_with(".xlsx") {
        return Err(ServiceError::invalid("Only .xlsx files are allowed"));
    }
    if file.bytes.len() > MAX_IMPORT_BYTES {
        return Err(ServiceError::invalid("Import file must be 10 MB or smaller"));
    }
    Ok(file)
}

/// Imports the students in `file` into the class and batch named by
/// `target`.
///
/// Returns the report on partial success. When no row could be imported
/// the report travels inside [`ServiceError::ImportRejected`].
pub fn import_students(
    db: &Database,
    target: &ImportTarget,
    file: Option<ImportFile<'_>>,
) -> Result<ImportReport> {
    let (class_id, class_name, batch_id, batch_name) = resolve_target(db, target)?;
    let file = check_file(file)?;

    let _span = tracing::info_span!("import_students", size = file.bytes.len()).entered();

    let rows = read_first_sheet(file.bytes).map_err(|e| {
        tracing::warn!(error = %e, "Unreadable import workbook");
        ServiceError::invalid("Invalid Excel file. Please upload a valid .xlsx file")
    })?;
    let mut rows = rows.into_iter().filter(|r| !r.is_blank());
    let header = rows
        .next()
        .ok_or_else(|| ServiceError::invalid("Excel file is empty. Add at least one data row"))?;
    let data: Vec<SheetRow> = rows.collect();
    if data.is_empty() {
        return Err(ServiceError::invalid(
            "Excel file is empty. Add at least one data row",
        ));
    }
    let columns = Columns::from_header(&header).ok_or_else(|| {
        ServiceError::invalid(r#"Template error: "studentId" and "name" columns are required"#)
    })?;

    let jobs = job_repo::ids_by_lowercase_name(db)?;

    let mut report = ImportReport {
        summary: ImportSummary {
            total_rows: data.len(),
            imported: 0,
            skipped: 0,
            class_name,
            batch_name,
        },
        skipped_rows: Vec::new(),
    };

    let mut candidates = Vec::with_capacity(data.len());
    for row in &data {
        match validate_row(row, &columns, &jobs) {
            Ok(candidate) => candidates.push(candidate),
            Err(reason) => report.skip(row.number, reason),
        }
    }

    let now = timestamp_now();
    let mut report = db.with_transaction(|conn| -> Result<ImportReport> {
        let ids: BTreeSet<i64> = candidates.iter().map(|c| c.student_id).collect();
        let emails: BTreeSet<String> = candidates.iter().filter_map(|c| c.email.clone()).collect();
        let mut taken_ids: HashSet<i64> = student_repo::existing_student_ids(conn, &ids)?.into_iter().collect();
        let mut taken_emails: HashSet<String> =
            student_repo::existing_emails(conn, &emails)?.into_iter().collect();

        for candidate in candidates {
            if taken_ids.contains(&candidate.student_id) {
                report.skip(candidate.row, SkipReason::DuplicateStudentId);
                continue;
            }
            if candidate.email.as_ref().is_some_and(|e| taken_emails.contains(e)) {
                report.skip(candidate.row, SkipReason::DuplicateEmail);
                continue;
            }

            let student = StudentRow {
                id: new_id(),
                student_id: candidate.student_id,
                name: candidate.name,
                gender: candidate.gender,
                email: candidate.email,
                phone_number: candidate.phone_number,
                class_id: class_id.clone(),
                batch_id: batch_id.clone(),
                job_id: candidate.job_id,
                photo_image: String::new(),
                description: candidate.description,
                is_deleted: false,
                deleted_at: None,
                created_at: now.clone(),
                updated_at: now.clone(),
            };

            match student_repo::insert_with(conn, &student) {
                Ok(()) => {
                    taken_ids.insert(student.student_id);
                    if let Some(email) = student.email {
                        taken_emails.insert(email);
                    }
                    report.summary.imported += 1;
                }
                Err(e) if e.is_unique_violation() => {
                    let email_clash = matches!(
                        e.constraint(),
                        Some(crate::db::Constraint::Unique { ref columns, .. }) if columns.iter().any(|c| c == "email")
                    );
                    let code = if email_clash {
                        SkipReason::DuplicateEmail
                    } else {
                        SkipReason::DuplicateStudentId
                    };
                    report.skip(candidate.row, code);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(report)
    })?;
    report.skipped_rows.sort_by_key(|s| s.row);

    tracing::info!(
        imported = report.summary.imported,
        skipped = report.summary.skipped,
        "Student import finished"
    );

    if report.summary.imported == 0 {
        return Err(ServiceError::ImportRejected {
            message: "No valid rows to import".to_string(),
            report: Box::new(report),
        });
    }
    Ok(report)
}
