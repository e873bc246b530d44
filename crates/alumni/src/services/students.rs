//! Student records: paged listing, detail with related students, dual-mode
//! delete and bulk delete by class filter.

use serde::{Deserialize, Serialize};

use crate::db::batch_repo::{self, BatchRow};
use crate::db::class_repo::{self, ClassFilter, ClassRow};
use crate::db::department_repo::{self, DepartmentRow};
use crate::db::faculty_repo::{self, FacultyRow};
use crate::db::job_repo::{self, JobRow};
use crate::db::student_repo::{self, StudentRecord, StudentRow};
use crate::db::Database;
use crate::error::{Result, ServiceError};
use crate::filter::params::parse_int;
use crate::filter::{resolve, StudentQuery};
use crate::model::{new_id, parse_positive_integer, timestamp_now, Gender};
use crate::sanitize::redact_email;
use crate::services::validate::{
    is_valid_email, lenient_string, normalize_email, nullable_string, path_id, Checks, PHONE_MAX,
    STUDENT_DESCRIPTION_MAX, STUDENT_NAME_MAX,
};

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const RELATED_LIMIT: u64 = 6;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub class_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub batch_id: Option<String>,
    /// Absent leaves the job alone; null or blank clears it.
    #[serde(default, deserialize_with = "nullable_string")]
    pub job_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub photo_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    /// Parses raw `page`/`limit` values. Out-of-range values are clamped,
    /// unparsable ones fall back to the defaults.
    pub fn request(page: Option<&str>, limit: Option<&str>) -> (u64, u64) {
        let page = page
            .and_then(parse_int)
            .map(|p| p.max(1) as u64)
            .unwrap_or(1);
        let limit = limit
            .and_then(parse_int)
            .map(|l| l.clamp(1, MAX_PAGE_SIZE as i64) as u64)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        (page, limit)
    }

    fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit).max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentPage {
    pub data: Vec<StudentRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDetail {
    pub data: StudentRecord,
    pub related: Vec<StudentRecord>,
}

/// Result of a bulk delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDeleteOutcome {
    pub message: String,
    pub affected: u64,
}

/// Every reference list, for building filter controls.
#[derive(Debug, Clone, Serialize)]
pub struct StudentFilters {
    pub faculties: Vec<FacultyRow>,
    pub departments: Vec<DepartmentRow>,
    pub classes: Vec<ClassRow>,
    pub batches: Vec<BatchRow>,
    pub jobs: Vec<JobRow>,
}

pub fn list(db: &Database, query: &StudentQuery, page: u64, limit: u64) -> Result<StudentPage> {
    let filter = resolve(db, query)?;
    let offset = (page - 1).saturating_mul(limit);
    let (data, total) = student_repo::query(db, &filter, limit, offset)?;
    Ok(StudentPage {
        data,
        pagination: Pagination::new(page, limit, total),
    })
}

/// Loads a student that has not been soft-deleted.
fn find_active(db: &Database, id: &str) -> Result<StudentRecord> {
    path_id("student", id)?;
    student_repo::find_by_id(db, id)?
        .filter(|r| !r.student.is_deleted)
        .ok_or_else(|| ServiceError::not_found("Student"))
}

pub fn get(db: &Database, id: &str) -> Result<StudentDetail> {
    let data = find_active(db, id)?;
    let related = student_repo::related(db, &data.student, RELATED_LIMIT)?;
    Ok(StudentDetail { data, related })
}

fn require_class(db: &Database, id: &str) -> Result<()> {
    class_repo::find_by_id(db, id)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::not_found("Class"))
}

fn require_batch(db: &Database, id: &str) -> Result<()> {
    batch_repo::find_by_id(db, id)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::not_found("Batch"))
}

/// Blank clears the job. Anything else must name an existing job.
fn job_reference(checks: &mut Checks, value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    Some(checks.id("jobId", Some(value)))
}

fn require_job(db: &Database, id: &Option<String>) -> Result<()> {
    match id {
        Some(id) => job_repo::find_by_id(db, id)?
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("Job")),
        None => Ok(()),
    }
}

fn check_gender(checks: &mut Checks, value: Option<&str>) -> Gender {
    match Gender::normalize(value.unwrap_or_default()) {
        Some(gender) => gender,
        None => {
            checks.fail("gender", "Gender must be Male or Female");
            Gender::default()
        }
    }
}

fn check_email(checks: &mut Checks, value: Option<&str>) -> Option<String> {
    let email = normalize_email(value.unwrap_or_default());
    if let Some(email) = &email {
        if !is_valid_email(email) {
            checks.fail("email", "Valid email is required");
        }
    }
    email
}

fn ensure_student_id_free(db: &Database, student_id: i64, own_id: Option<&str>) -> Result<()> {
    if student_repo::student_id_taken(db, student_id, own_id)? {
        return Err(ServiceError::Conflict(format!(
            "studentId {} already exists",
            student_id
        )));
    }
    Ok(())
}

/// Creates a student. `photo_url` is a photo already stored for this
/// request and wins over any `photoImage` in the payload.
pub fn create(
    db: &Database,
    payload: &StudentPayload,
    photo_url: Option<String>,
) -> Result<StudentRecord> {
    let mut checks = Checks::new();
    let student_id = payload.student_id.as_deref().and_then(parse_positive_integer);
    if student_id.is_none() {
        checks.fail(
            "studentId",
            "studentId is required and must be a positive integer",
        );
    }
    let name = checks.required("name", payload.name.as_deref(), STUDENT_NAME_MAX, "Name is required");
    let gender = check_gender(&mut checks, payload.gender.as_deref());
    let email = check_email(&mut checks, payload.email.as_deref());
    let phone_number = checks.optional("phoneNumber", payload.phone_number.as_deref(), PHONE_MAX);
    let class_id = checks.id("classId", payload.class_id.as_deref());
    let batch_id = checks.id("batchId", payload.batch_id.as_deref());
    let job_id = job_reference(&mut checks, payload.job_id.clone().flatten().as_deref());
    let description = checks.optional(
        "description",
        payload.description.as_deref(),
        STUDENT_DESCRIPTION_MAX,
    );
    checks.finish()?;
    let Some(student_id) = student_id else {
        return Err(ServiceError::invalid(
            "studentId is required and must be a positive integer",
        ));
    };

    require_class(db, &class_id)?;
    require_batch(db, &batch_id)?;
    require_job(db, &job_id)?;
    ensure_student_id_free(db, student_id, None)?;

    let now = timestamp_now();
    let student = StudentRow {
        id: new_id(),
        student_id,
        name,
        gender,
        email,
        phone_number,
        class_id,
        batch_id,
        job_id,
        photo_image: photo_url
            .or_else(|| payload.photo_image.clone())
            .map(|p| p.trim().to_string())
            .unwrap_or_default(),
        description,
        is_deleted: false,
        deleted_at: None,
        created_at: now.clone(),
        updated_at: now,
    };
    student_repo::insert(db, &student)?;
    tracing::info!(
        id = %student.id,
        student_id,
        email = %student.email.as_deref().map(redact_email).unwrap_or_default(),
        "Student created"
    );
    find_active(db, &student.id)
}

/// Applies the fields present in `payload`.
pub fn update(
    db: &Database,
    id: &str,
    payload: &StudentPayload,
    photo_url: Option<String>,
) -> Result<StudentRecord> {
    let mut student = find_active(db, id)?.student;

    let mut checks = Checks::new();
    let student_id = match payload.student_id.as_deref() {
        Some(raw) => {
            let parsed = parse_positive_integer(raw);
            if parsed.is_none() {
                checks.fail("studentId", "studentId must be a positive integer");
            }
            parsed
        }
        None => None,
    };
    let name = checks.required_if_present(
        "name",
        payload.name.as_deref(),
        STUDENT_NAME_MAX,
        "Name is required",
    );
    let gender = payload
        .gender
        .as_deref()
        .map(|g| check_gender(&mut checks, Some(g)));
    let email = payload
        .email
        .as_deref()
        .map(|e| check_email(&mut checks, Some(e)));
    let phone_number =
        checks.optional_if_present("phoneNumber", payload.phone_number.as_deref(), PHONE_MAX);
    let class_id = payload
        .class_id
        .as_deref()
        .map(|c| checks.id("classId", Some(c)));
    let batch_id = payload
        .batch_id
        .as_deref()
        .map(|b| checks.id("batchId", Some(b)));
    let job_id = payload
        .job_id
        .as_ref()
        .map(|j| job_reference(&mut checks, j.as_deref()));
    let description = checks.optional_if_present(
        "description",
        payload.description.as_deref(),
        STUDENT_DESCRIPTION_MAX,
    );
    checks.finish()?;

    if let Some(student_id) = student_id {
        if student_id != student.student_id {
            ensure_student_id_free(db, student_id, Some(id))?;
        }
        student.student_id = student_id;
    }
    if let Some(class_id) = class_id {
        require_class(db, &class_id)?;
        student.class_id = class_id;
    }
    if let Some(batch_id) = batch_id {
        require_batch(db, &batch_id)?;
        student.batch_id = batch_id;
    }
    if let Some(job_id) = job_id {
        require_job(db, &job_id)?;
        student.job_id = job_id;
    }
    if let Some(name) = name {
        student.name = name;
    }
    if let Some(gender) = gender {
        student.gender = gender;
    }
    if let Some(email) = email {
        student.email = email;
    }
    if let Some(phone_number) = phone_number {
        student.phone_number = phone_number;
    }
    if let Some(description) = description {
        student.description = description;
    }
    if let Some(photo) = photo_url.or_else(|| payload.photo_image.clone()) {
        student.photo_image = photo.trim().to_string();
    }
    student.updated_at = timestamp_now();

    student_repo::update(db, &student)?;
    find_active(db, id)
}

/// Soft-deletes a student, or removes it for good when `force` is set.
/// A forced delete also reaches students that are already soft-deleted.
pub fn delete(db: &Database, id: &str, force: bool) -> Result<()> {
    path_id("student", id)?;
    let existing = student_repo::find_by_id(db, id)?
        .filter(|r| force || !r.student.is_deleted)
        .ok_or_else(|| ServiceError::not_found("Student"))?;

    if force {
        student_repo::delete(db, id)?;
    } else {
        student_repo::soft_delete(db, id, &timestamp_now())?;
    }
    tracing::info!(id, student_id = existing.student.student_id, force, "Student deleted");
    Ok(())
}

pub fn restore(db: &Database, id: &str) -> Result<StudentRecord> {
    path_id("student", id)?;
    if !student_repo::restore(db, id, &timestamp_now())? {
        return Err(ServiceError::not_found("Student"));
    }
    tracing::info!(id, "Student restored");
    student_repo::find_by_id(db, id)?.ok_or_else(|| ServiceError::not_found("Student"))
}

/// Deletes every student in the classes selected by the faculty,
/// department and class criteria of `query`. Other facets are ignored.
pub fn delete_by_filter(db: &Database, query: &StudentQuery, force: bool) -> Result<BulkDeleteOutcome> {
    if !query.has_hierarchy_criteria() {
        return Err(ServiceError::invalid(
            "Select at least one faculty, department, or class filter before delete",
        ));
    }

    let scope = StudentQuery {
        faculty_ids: query.faculty_ids.clone(),
        department_ids: query.department_ids.clone(),
        class_ids: query.class_ids.clone(),
        include_deleted: force,
        ..StudentQuery::default()
    };
    let filter = resolve(db, &scope)?;
    if filter.class_ids.as_ref().is_some_and(|ids| ids.is_empty()) {
        return Ok(BulkDeleteOutcome {
            message: "No students matched selected class filters".to_string(),
            affected: 0,
        });
    }

    let affected = student_repo::delete_matching(db, &filter, force, &timestamp_now())?;
    tracing::info!(affected, force, "Bulk student delete");
    Ok(BulkDeleteOutcome {
        message: if force {
            "Filtered students deleted permanently".to_string()
        } else {
            "Filtered students deleted".to_string()
        },
        affected,
    })
}

pub fn filters(db: &Database) -> Result<StudentFilters> {
    Ok(StudentFilters {
        faculties: faculty_repo::list(db)?,
        departments: department_repo::list(db, None)?,
        classes: class_repo::list(db, &ClassFilter::default())?,
        batches: batch_repo::list(db)?,
        jobs: job_repo::list(db)?,
    })
}
