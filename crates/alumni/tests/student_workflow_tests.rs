//! Student records end to end through the services on a file-backed store.

mod common;

use alumni::services::students::{self, StudentPayload};
use alumni::{ErrorKind, QueryParams, StudentQuery};
use common::{HierarchyBuilder, StudentBuilder, TestHarness};

fn query(pairs: &[(&str, &str)]) -> StudentQuery {
    StudentQuery::from_params(&QueryParams::from_pairs(pairs.iter().copied()))
}

fn student_ids(db: &alumni::Database, query: &StudentQuery) -> Vec<i64> {
    let mut ids: Vec<i64> = students::list(db, query, 1, 100)
        .unwrap()
        .data
        .into_iter()
        .map(|r| r.student.student_id)
        .collect();
    ids.sort();
    ids
}

#[test]
fn records_survive_reopening_the_store() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    StudentBuilder::new(1001, "Ada Lovelace", &place)
        .gender("female")
        .email("ADA@Example.com")
        .create(&harness.db);

    let reopened = harness.reopen();
    let page = students::list(&reopened, &StudentQuery::default(), 1, 25).unwrap();

    assert_eq!(page.pagination.total, 1);
    let record = &page.data[0];
    assert_eq!(record.student.email.as_deref(), Some("ada@example.com"));
    assert_eq!(record.class.as_ref().unwrap().class_name, place.class.name);
    assert_eq!(record.batch.as_ref().unwrap().year, 2022);
}

#[test]
fn student_id_must_be_a_free_positive_integer() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Science").create(&harness.db);
    StudentBuilder::new(1001, "First", &place).create(&harness.db);

    let duplicate = students::create(
        &harness.db,
        &StudentBuilder::new(1001, "Second", &place).payload(),
        None,
    )
    .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::Conflict);
    assert_eq!(duplicate.to_string(), "studentId 1001 already exists");

    for bad in ["0", "-4", "12a", "1.5"] {
        let payload = StudentPayload {
            student_id: Some(bad.to_string()),
            ..StudentBuilder::new(1, "Bad", &place).payload()
        };
        let err = students::create(&harness.db, &payload, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest, "studentId {bad:?}");
    }
}

#[test]
fn unknown_class_or_batch_is_not_found() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Arts").create(&harness.db);
    let mut other = place.clone();
    other.class.id = alumni::model::new_id();

    let err = students::create(
        &harness.db,
        &StudentBuilder::new(5, "Lost", &other).payload(),
        None,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn soft_delete_hides_until_restored() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    let kept = StudentBuilder::new(1, "Kept", &place).create(&harness.db);
    let removed = StudentBuilder::new(2, "Removed", &place).create(&harness.db);

    students::delete(&harness.db, &removed.student.id, false).unwrap();

    assert_eq!(student_ids(&harness.db, &StudentQuery::default()), vec![1]);
    assert_eq!(
        students::get(&harness.db, &removed.student.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    // The studentId stays reserved while the record is only soft-deleted.
    let reuse = students::create(
        &harness.db,
        &StudentBuilder::new(2, "Reuse", &place).payload(),
        None,
    );
    assert_eq!(reuse.unwrap_err().kind(), ErrorKind::Conflict);

    let restored = students::restore(&harness.db, &removed.student.id).unwrap();
    assert!(!restored.student.is_deleted);
    assert_eq!(student_ids(&harness.db, &StudentQuery::default()), vec![1, 2]);

    students::delete(&harness.db, &kept.student.id, true).unwrap();
    assert_eq!(
        students::restore(&harness.db, &kept.student.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn search_matches_name_email_or_exact_student_id() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    StudentBuilder::new(7, "Ada", &place).create(&harness.db);
    StudentBuilder::new(17, "Bob", &place).create(&harness.db);
    StudentBuilder::new(20, "Agent 007", &place).create(&harness.db);
    StudentBuilder::new(21, "Carol", &place)
        .email("carol7@example.com")
        .create(&harness.db);

    assert_eq!(student_ids(&harness.db, &query(&[("search", "7")])), vec![7, 20, 21]);
    assert_eq!(student_ids(&harness.db, &query(&[("search", "ADA")])), vec![7]);
}

#[test]
fn search_folds_case_beyond_ascii() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    StudentBuilder::new(1, "Élodie Durand", &place).create(&harness.db);
    StudentBuilder::new(2, "ÖMER Şahin", &place).create(&harness.db);

    for needle in ["Élodie", "élodie", "ÉLODIE", "durand"] {
        assert_eq!(
            student_ids(&harness.db, &query(&[("search", needle)])),
            vec![1],
            "search {needle:?}"
        );
    }
    assert_eq!(student_ids(&harness.db, &query(&[("search", "ömer ş")])), vec![2]);
}

#[test]
fn hierarchy_filters_commute_with_each_other() {
    let harness = TestHarness::new();
    let engineering = HierarchyBuilder::new("Engineering")
        .department("Civil")
        .class("CE-1")
        .create(&harness.db);
    let science = HierarchyBuilder::new("Science")
        .department("Physics")
        .class("PH-1")
        .batch_year(2023)
        .create(&harness.db);
    StudentBuilder::new(1, "Civil One", &engineering).create(&harness.db);
    StudentBuilder::new(2, "Physics One", &science).create(&harness.db);

    let faculty = ("facultyIds", engineering.faculty.id.as_str());
    let department = ("departmentIds", engineering.department.id.as_str());
    let forward = student_ids(&harness.db, &query(&[faculty, department]));
    let backward = student_ids(&harness.db, &query(&[department, faculty]));
    assert_eq!(forward, vec![1]);
    assert_eq!(forward, backward);

    // A department outside the selected faculty leaves nothing.
    let mismatched = query(&[faculty, ("departmentIds", science.department.id.as_str())]);
    assert!(student_ids(&harness.db, &mismatched).is_empty());

    let by_year = query(&[("batchYears", "2023")]);
    assert_eq!(student_ids(&harness.db, &by_year), vec![2]);
}

#[test]
fn job_ids_win_over_employment_status() {
    let harness = TestHarness::new();
    let place = HierarchyBuilder::new("Engineering").create(&harness.db);
    let engineer = common::job(&harness.db, "Engineer");
    StudentBuilder::new(1, "Employed", &place).job(&engineer).create(&harness.db);
    StudentBuilder::new(2, "Idle", &place).create(&harness.db);

    assert_eq!(
        student_ids(&harness.db, &query(&[("employmentStatus", "unemployed")])),
        vec![2]
    );
    assert_eq!(
        student_ids(
            &harness.db,
            &query(&[("employmentStatus", "unemployed"), ("jobIds", engineer.id.as_str())])
        ),
        vec![1]
    );
}

#[test]
fn bulk_delete_requires_hierarchy_criteria() {
    let harness = TestHarness::new();
    let engineering = HierarchyBuilder::new("Engineering").create(&harness.db);
    let science = HierarchyBuilder::new("Science").create(&harness.db);
    StudentBuilder::new(1, "One", &engineering).create(&harness.db);
    StudentBuilder::new(2, "Two", &engineering).create(&harness.db);
    StudentBuilder::new(3, "Three", &science).create(&harness.db);

    let err = students::delete_by_filter(&harness.db, &query(&[("genders", "Male")]), false)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let outcome = students::delete_by_filter(
        &harness.db,
        &query(&[("facultyIds", engineering.faculty.id.as_str())]),
        false,
    )
    .unwrap();
    assert_eq!(outcome.affected, 2);
    assert_eq!(outcome.message, "Filtered students deleted");
    assert_eq!(student_ids(&harness.db, &StudentQuery::default()), vec![3]);

    // A forced pass also removes the rows soft-deleted above.
    let outcome = students::delete_by_filter(
        &harness.db,
        &query(&[("classIds", engineering.class.id.as_str())]),
        true,
    )
    .unwrap();
    assert_eq!(outcome.affected, 2);
    assert_eq!(outcome.message, "Filtered students deleted permanently");
}
