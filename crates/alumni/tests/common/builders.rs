#![allow(dead_code)]

use alumni::db::batch_repo::BatchRow;
use alumni::db::class_repo::ClassRow;
use alumni::db::department_repo::DepartmentRow;
use alumni::db::faculty_repo::FacultyRow;
use alumni::db::job_repo::JobRow;
use alumni::db::student_repo::StudentRecord;
use alumni::services::batches::{self, BatchPayload};
use alumni::services::classes::{self, ClassPayload};
use alumni::services::departments::{self, DepartmentPayload};
use alumni::services::faculties::{self, FacultyPayload};
use alumni::services::jobs::{self, JobPayload};
use alumni::services::students::{self, StudentPayload};
use alumni::xlsx::{Cell, Workbook};
use alumni::Database;

/// One faculty, department, class and batch, created in that order.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    pub faculty: FacultyRow,
    pub department: DepartmentRow,
    pub class: ClassRow,
    pub batch: BatchRow,
}

/// Builds a [`Hierarchy`].
///
/// ```ignore
/// let h = HierarchyBuilder::new("Engineering")
///     .department("Civil")
///     .class("CE-1")
///     .batch_year(2022)
///     .create(&db);
/// ```
pub struct HierarchyBuilder {
    faculty: String,
    department: String,
    class: String,
    batch_year: i32,
}

impl HierarchyBuilder {
    pub fn new(faculty: &str) -> Self {
        Self {
            faculty: faculty.to_string(),
            department: format!("{faculty} Department"),
            class: format!("{faculty} Class"),
            batch_year: 2022,
        }
    }

    pub fn department(mut self, name: &str) -> Self {
        self.department = name.to_string();
        self
    }

    pub fn class(mut self, name: &str) -> Self {
        self.class = name.to_string();
        self
    }

    pub fn batch_year(mut self, year: i32) -> Self {
        self.batch_year = year;
        self
    }

    pub fn create(self, db: &Database) -> Hierarchy {
        let faculty = faculty(db, &self.faculty);
        let department = departments::create(
            db,
            &DepartmentPayload {
                department_name: Some(self.department),
                faculty_id: Some(faculty.id.clone()),
                ..Default::default()
            },
        )
        .expect("Failed to create department");
        let class = classes::create(
            db,
            &ClassPayload {
                class_name: Some(self.class),
                department_id: Some(department.id.clone()),
                ..Default::default()
            },
        )
        .expect("Failed to create class");
        let batch = batch(db, self.batch_year);

        Hierarchy {
            faculty,
            department,
            class,
            batch,
        }
    }
}

pub fn faculty(db: &Database, name: &str) -> FacultyRow {
    faculties::create(
        db,
        &FacultyPayload {
            faculty_name: Some(name.to_string()),
            ..Default::default()
        },
    )
    .expect("Failed to create faculty")
}

/// Creates `Batch {year}`, or returns the existing batch for that year.
pub fn batch(db: &Database, year: i32) -> BatchRow {
    if let Some(existing) = batches::list(db)
        .expect("Failed to list batches")
        .into_iter()
        .find(|b| b.year == year)
    {
        return existing;
    }
    batches::create(
        db,
        &BatchPayload {
            batch_name: Some(format!("Batch {year}")),
            year: Some(year.to_string()),
            ..Default::default()
        },
    )
    .expect("Failed to create batch")
}

pub fn job(db: &Database, name: &str) -> JobRow {
    jobs::create(
        db,
        &JobPayload {
            job_name: Some(name.to_string()),
            ..Default::default()
        },
    )
    .expect("Failed to create job")
}

/// Builds a student payload placed in a [`Hierarchy`].
pub struct StudentBuilder {
    payload: StudentPayload,
}

impl StudentBuilder {
    pub fn new(student_id: i64, name: &str, place: &Hierarchy) -> Self {
        Self {
            payload: StudentPayload {
                student_id: Some(student_id.to_string()),
                name: Some(name.to_string()),
                class_id: Some(place.class.id.clone()),
                batch_id: Some(place.batch.id.clone()),
                ..Default::default()
            },
        }
    }

    pub fn gender(mut self, gender: &str) -> Self {
        self.payload.gender = Some(gender.to_string());
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.payload.email = Some(email.to_string());
        self
    }

    pub fn job(mut self, job: &JobRow) -> Self {
        self.payload.job_id = Some(Some(job.id.clone()));
        self
    }

    pub fn batch(mut self, batch: &BatchRow) -> Self {
        self.payload.batch_id = Some(batch.id.clone());
        self
    }

    pub fn payload(self) -> StudentPayload {
        self.payload
    }

    pub fn create(self, db: &Database) -> StudentRecord {
        students::create(db, &self.payload, None).expect("Failed to create student")
    }
}

/// An import workbook: a bold header row followed by `rows`.
pub fn import_workbook(header: &[&str], rows: &[Vec<&str>]) -> Vec<u8> {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Students Import");
    sheet.push_bold_row(header.iter().copied());
    for row in rows {
        sheet.push_row(row.iter().map(|v| Cell::from(*v)));
    }
    book.to_bytes().expect("Failed to write workbook")
}
