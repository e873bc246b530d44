//! Spreadsheet import against a file-backed store.

mod common;

use alumni::import::{self, ImportFile, ImportTarget, SkipReason};
use alumni::services::students;
use alumni::{ErrorKind, ServiceError, StudentQuery};
use common::{import_workbook, Hierarchy, HierarchyBuilder, StudentBuilder, TestHarness};

fn target(place: &Hierarchy) -> ImportTarget {
    ImportTarget {
        faculty_id: Some(place.faculty.id.clone()),
        department_id: Some(place.department.id.clone()),
        class_id: Some(place.class.id.clone()),
        batch_id: Some(place.batch.id.clone()),
    }
}

fn upload<'a>(name: &'a str, bytes: &'a [u8]) -> Option<ImportFile<'a>> {
    Some(ImportFile {
        file_name: name,
        bytes,
    })
}

#[test]
fn second_row_with_same_student_id_is_skipped() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").class("CE-1").create(&harness.db);
    let bytes = import_workbook(
        &["studentId", "name", "email"],
        &[
            vec!["1001", "Ada", "ada@example.com"],
            vec!["1001", "Ada Twin", ""],
            vec!["1002", "Grace", ""],
        ],
    );

    let report =
        import::import_students(&harness.db, &target(&place), upload("batch.xlsx", &bytes)).unwrap();

    assert_eq!(report.summary.total_rows, 3);
    assert_eq!(report.summary.imported, 2);
    assert_eq!(report.summary.class_name, "CE-1");
    assert_eq!(report.skipped_rows.len(), 1);
    assert_eq!(report.skipped_rows[0].row, 3);
    assert_eq!(report.skipped_rows[0].code, SkipReason::DuplicateStudentId);

    let reopened = harness.reopen();
    let page = students::list(&reopened, &StudentQuery::default(), 1, 25).unwrap();
    assert_eq!(page.pagination.total, 2);
    assert!(page.data.iter().all(|r| r.student.class_id == place.class.id));
}

#[test]
fn rows_clashing_with_stored_students_are_skipped() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    StudentBuilder::new(7, "Existing", &place)
        .email("taken@example.com")
        .create(&harness.db);
    let bytes = import_workbook(
        &["Student ID", "Name", "Email"],
        &[
            vec!["7", "Same Id", ""],
            vec!["8", "Same Mail", "TAKEN@example.com"],
            vec!["9", "Fresh", ""],
        ],
    );

    let report =
        import::import_students(&harness.db, &target(&place), upload("batch.xlsx", &bytes)).unwrap();

    let codes: Vec<(u32, SkipReason)> = report.skipped_rows.iter().map(|s| (s.row, s.code)).collect();
    assert_eq!(
        codes,
        vec![
            (2, SkipReason::DuplicateStudentId),
            (3, SkipReason::DuplicateEmail),
        ]
    );
    assert_eq!(report.summary.imported, 1);
}

#[test]
fn in_file_and_soft_deleted_duplicates_are_both_skipped() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    let ghost = StudentBuilder::new(50, "Ghost", &place)
        .email("gone@example.com")
        .create(&harness.db);
    students::delete(&harness.db, &ghost.student.id, false).unwrap();

    let bytes = import_workbook(
        &["studentId", "name", "email"],
        &[
            vec!["50", "Ghost Id", ""],
            vec!["51", "Ghost Mail", "GONE@example.com"],
            vec!["52", "First", "dup@example.com"],
            vec!["52", "Second", ""],
            vec!["53", "Third", "dup@example.com"],
            vec!["54", "Fresh", ""],
        ],
    );

    let report =
        import::import_students(&harness.db, &target(&place), upload("batch.xlsx", &bytes)).unwrap();

    let codes: Vec<(u32, SkipReason)> = report.skipped_rows.iter().map(|s| (s.row, s.code)).collect();
    assert_eq!(
        codes,
        vec![
            (2, SkipReason::DuplicateStudentId),
            (3, SkipReason::DuplicateEmail),
            (5, SkipReason::DuplicateStudentId),
            (6, SkipReason::DuplicateEmail),
        ]
    );
    assert_eq!(report.summary.imported, 2);
    assert_eq!(report.summary.skipped, 4);

    let all = StudentQuery {
        include_deleted: true,
        ..Default::default()
    };
    let page = students::list(&harness.db, &all, 1, 25).unwrap();
    let mut stored: Vec<i64> = page.data.iter().map(|r| r.student.student_id).collect();
    stored.sort();
    assert_eq!(stored, vec![50, 52, 54]);
}

#[test]
fn large_imports_check_duplicates_in_chunks() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    StudentBuilder::new(1_500, "Existing", &place).create(&harness.db);

    let ids: Vec<String> = (1..=2_000).map(|i| i.to_string()).collect();
    let rows: Vec<Vec<&str>> = ids.iter().map(|id| vec![id.as_str(), "Alum"]).collect();
    let bytes = import_workbook(&["studentId", "name"], &rows);

    let report =
        import::import_students(&harness.db, &target(&place), upload("batch.xlsx", &bytes)).unwrap();

    assert_eq!(report.summary.imported, 1_999);
    assert_eq!(report.skipped_rows.len(), 1);
    assert_eq!(report.skipped_rows[0].row, 1_501);
    assert_eq!(report.skipped_rows[0].code, SkipReason::DuplicateStudentId);
}

#[test]
fn nothing_importable_rejects_with_the_report() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    let bytes = import_workbook(&["studentId", "name"], &[vec!["x", "Bad"], vec!["2", ""]]);

    let err = import::import_students(&harness.db, &target(&place), upload("batch.xlsx", &bytes))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BadRequest);
    match err {
        ServiceError::ImportRejected { message, report } => {
            assert_eq!(message, "No valid rows to import");
            assert_eq!(report.summary.skipped, 2);
        }
        other => panic!("Unexpected error: {other:?}"),
    }
    let page = students::list(&harness.db, &StudentQuery::default(), 1, 25).unwrap();
    assert_eq!(page.pagination.total, 0);
}

#[test]
fn upload_and_target_are_checked_first() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    let other = HierarchyBuilder::new("Science").create(&harness.db);
    let bytes = import_workbook(&["studentId", "name"], &[vec!["1", "Ada"]]);

    let cases = [
        (target(&place), upload("batch.csv", &bytes), "Only .xlsx files are allowed"),
        (target(&place), None, "Import file is required"),
        (
            target(&place),
            upload("batch.xlsx", b"not a zip"),
            "Invalid Excel file. Please upload a valid .xlsx file",
        ),
        (
            ImportTarget {
                department_id: Some(other.department.id.clone()),
                ..target(&place)
            },
            upload("batch.xlsx", &bytes),
            "Selected department does not belong to selected faculty",
        ),
    ];

    for (target, file, expected) in cases {
        let err = import::import_students(&harness.db, &target, file).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest, "{expected}");
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn template_reads_back_as_an_import_header() {
    let template = import::import_template().unwrap();
    let rows = alumni::xlsx::read_first_sheet(&template).unwrap();
    assert!(!rows.is_empty());
}
