use alumni::config::ServerConfig;
use alumni::services::admins;
use alumni::xlsx::{Cell, Workbook};
use alumni::Database;
use alumni_server::{build_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    token: String,
    _dir: TempDir,
}

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn header(&self, name: header::HeaderName) -> String {
        self.headers
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default()
    }
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            jwt_secret: Some("test-secret".to_string()),
            uploads_dir: dir.path().join("uploads"),
            ..ServerConfig::default()
        };
        let db = Database::open_in_memory().unwrap();
        admins::ensure_bootstrap_admin(&db, &config.bootstrap_admin).unwrap();
        let router = build_router(AppState::new(config, db).unwrap());

        let mut app = TestApp {
            router,
            token: String::new(),
            _dir: dir,
        };
        let reply = app
            .send(
                "POST",
                "/api/auth/login",
                Some(json!({ "email": "admin@alumni.local", "password": "Admin@123" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        app.token = reply.json()["token"].as_str().unwrap().to_string();
        app
    }

    async fn call(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.token.is_empty() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.call(request.unwrap()).await
    }

    async fn create(&self, uri: &str, body: Value) -> String {
        let reply = self.send("POST", uri, Some(body)).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&reply.body));
        reply.json()["data"]["id"].as_str().unwrap().to_string()
    }

    /// Faculty → department → class plus a batch. Returns
    /// `(faculty, department, class, batch)` ids.
    async fn seed_hierarchy(&self) -> (String, String, String, String) {
        let faculty = self.create("/api/faculties", json!({ "facultyName": "Engineering" })).await;
        let department = self
            .create(
                "/api/departments",
                json!({ "departmentName": "Computer Science", "facultyId": faculty }),
            )
            .await;
        let class = self
            .create("/api/classes", json!({ "className": "CS-A", "departmentId": department }))
            .await;
        let batch = self
            .create("/api/batches", json!({ "batchName": "Batch 2024", "year": 2024 }))
            .await;
        (faculty, department, class, batch)
    }
}

fn multipart(boundary: &str, fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[tokio::test]
async fn health_is_public() {
    let mut app = TestApp::new().await;
    app.token.clear();
    let reply = app.send("GET", "/api/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let mut app = TestApp::new().await;

    app.token.clear();
    let reply = app.send("GET", "/api/faculties", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["message"], "Not authorized");

    app.token = "not-a-token".to_string();
    let reply = app.send("GET", "/api/faculties", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["message"], "Token invalid or expired");
}

#[tokio::test]
async fn login_failures() {
    let app = TestApp::new().await;
    let reply = app
        .send(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "admin@alumni.local", "password": "wrong" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["message"], "Invalid credentials");

    let reply = app
        .send("POST", "/api/auth/login", Some(json!({ "email": "nope" })))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let body = reply.json();
    assert_eq!(body["message"], "Validation error");
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn me_and_password_change() {
    let app = TestApp::new().await;
    let reply = app.send("GET", "/api/auth/me", None).await;
    assert_eq!(reply.json()["admin"]["email"], "admin@alumni.local");

    let reply = app
        .send(
            "PUT",
            "/api/admin/me/password",
            Some(json!({ "currentPassword": "Admin@123", "newPassword": "s3cret!" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["message"], "Password updated successfully");

    let reply = app
        .send(
            "PUT",
            "/api/admin/change-password",
            Some(json!({ "currentPassword": "Admin@123", "newPassword": "another" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["message"], "Current password is incorrect");
}

#[tokio::test]
async fn department_delete_is_blocked_by_classes() {
    let app = TestApp::new().await;
    let (_, department, class, _) = app.seed_hierarchy().await;

    let reply = app.send("DELETE", &format!("/api/departments/{department}"), None).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(
        reply.json()["message"],
        "Cannot delete department with classes. Delete classes first."
    );

    let reply = app.send("DELETE", &format!("/api/classes/{class}"), None).await;
    assert_eq!(reply.json()["message"], "Class deleted");
    let reply = app.send("DELETE", &format!("/api/departments/{department}"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["message"], "Department deleted");
}

#[tokio::test]
async fn classes_list_with_populated_parents() {
    let app = TestApp::new().await;
    let (faculty, _, _, _) = app.seed_hierarchy().await;

    let reply = app.send("GET", &format!("/api/classes?facultyId={faculty}"), None).await;
    let body = reply.json();
    let classes = body["data"].as_array().unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0]["department"]["departmentName"], "Computer Science");
}

#[tokio::test]
async fn student_lifecycle() {
    let app = TestApp::new().await;
    let (_, _, class, batch) = app.seed_hierarchy().await;

    let student = app
        .create(
            "/api/students",
            json!({ "studentId": "1001", "name": "Ada Lovelace", "classId": class, "batchId": batch }),
        )
        .await;

    let reply = app
        .send(
            "POST",
            "/api/students",
            Some(json!({ "studentId": 1001, "name": "Copy", "classId": class, "batchId": batch })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.json()["message"], "studentId 1001 already exists");

    let reply = app
        .send(
            "POST",
            "/api/students",
            Some(json!({ "studentId": "-4", "name": "Bad", "classId": class, "batchId": batch })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.send("GET", "/api/students?search=ada&limit=10", None).await;
    let body = reply.json();
    assert_eq!(body["pagination"], json!({ "page": 1, "limit": 10, "total": 1, "pages": 1 }));

    let reply = app.send("DELETE", &format!("/api/students/{student}"), None).await;
    assert_eq!(reply.json()["message"], "Student deleted");
    let reply = app.send("GET", &format!("/api/students/{student}"), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app.send("PATCH", &format!("/api/students/{student}/restore"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = app.send("GET", &format!("/api/students/{student}"), None).await;
    assert_eq!(reply.json()["data"]["studentId"], 1001);

    let reply = app
        .send("DELETE", &format!("/api/students/{student}?force=true"), None)
        .await;
    assert_eq!(reply.json()["message"], "Student deleted permanently");
}

#[tokio::test]
async fn rejected_student_leaves_no_photo_behind() {
    let app = TestApp::new().await;
    let (_, _, class, batch) = app.seed_hierarchy().await;
    let photos = app._dir.path().join("uploads").join("students");
    let stored = || std::fs::read_dir(&photos).map(|d| d.count()).unwrap_or(0);

    let png: &[u8] = &[0x89, b'P', b'N', b'G'];
    let post = |student_id: &str| {
        let boundary = "alumni-photo-boundary";
        let body = multipart(
            boundary,
            &[
                ("studentId", student_id),
                ("name", "Pictured"),
                ("classId", class.as_str()),
                ("batchId", batch.as_str()),
            ],
            Some(("photo", "face.png", png)),
        );
        Request::builder()
            .method("POST")
            .uri("/api/students")
            .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    };

    let reply = app.call(post("700")).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&reply.body));
    assert!(reply.json()["data"]["photoImage"]
        .as_str()
        .unwrap()
        .contains("/uploads/students/student-"));
    assert_eq!(stored(), 1);

    let reply = app.call(post("700")).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(stored(), 1);
}

#[tokio::test]
async fn bulk_delete_requires_hierarchy_filter() {
    let app = TestApp::new().await;
    let (_, _, class, batch) = app.seed_hierarchy().await;
    app.create(
        "/api/students",
        json!({ "studentId": 1, "name": "One", "classId": class, "batchId": batch }),
    )
    .await;

    let reply = app.send("DELETE", "/api/students", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.json()["message"],
        "Select at least one faculty, department, or class filter before delete"
    );

    let reply = app.send("DELETE", &format!("/api/students?classIds={class}"), None).await;
    assert_eq!(reply.json(), json!({ "message": "Filtered students deleted", "affected": 1 }));
}

#[tokio::test]
async fn import_reports_skipped_rows() {
    let app = TestApp::new().await;
    let (faculty, department, class, batch) = app.seed_hierarchy().await;

    let mut book = Workbook::new();
    let sheet = book.add_sheet("Students Import");
    sheet.push_bold_row(["studentId", "name", "gender"]);
    sheet.push_row(["501", "First", "Male"].map(Cell::from));
    sheet.push_row(["501", "Second", "Female"].map(Cell::from));
    sheet.push_row(["502", "Third", ""].map(Cell::from));
    let bytes = book.to_bytes().unwrap();

    let boundary = "alumni-test-boundary";
    let body = multipart(
        boundary,
        &[
            ("facultyId", faculty.as_str()),
            ("departmentId", department.as_str()),
            ("classId", class.as_str()),
            ("batchId", batch.as_str()),
        ],
        Some(("file", "students.xlsx", &bytes)),
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/students/import")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let reply = app.call(request).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&reply.body));

    let body = reply.json();
    assert_eq!(body["message"], "Imported 2 students");
    assert_eq!(body["summary"]["imported"], 2);
    assert_eq!(body["summary"]["className"], "CS-A");
    assert_eq!(body["skippedRows"][0]["row"], 3);
    assert_eq!(body["skippedRows"][0]["reason"], "Duplicate studentId");
}

#[tokio::test]
async fn downloads_carry_attachment_headers() {
    let app = TestApp::new().await;

    let reply = app.send("GET", "/api/reports/students?format=csv", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.header(header::CONTENT_TYPE), "text/csv; charset=utf-8");
    assert!(reply.header(header::CONTENT_DISPOSITION).contains("students-"));

    let reply = app.send("GET", "/api/reports/students?format=docx", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["message"], "Invalid format. Use csv, xlsx, or pdf.");

    let reply = app.send("GET", "/api/students/import-template", None).await;
    assert_eq!(reply.header(header::CONTENT_TYPE), alumni::xlsx::CONTENT_TYPE);
    assert!(reply.body.starts_with(b"PK"));

    let reply = app.send("GET", "/api/settings/backup", None).await;
    assert!(reply.header(header::CONTENT_DISPOSITION).contains("alumni-backup-"));
    assert_eq!(reply.json()["admins"][0]["email"], "admin@alumni.local");
}

#[tokio::test]
async fn exports_stream_complete_documents() {
    let app = TestApp::new().await;
    let (_, _, class, batch) = app.seed_hierarchy().await;
    for (id, name) in [(1, "Élodie Durand"), (2, "Grace Hopper")] {
        app.create(
            "/api/students",
            json!({ "studentId": id, "name": name, "classId": class, "batchId": batch }),
        )
        .await;
    }

    let reply = app.send("GET", "/api/reports/students?format=xlsx&search=%C3%89LODIE", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.header(header::CONTENT_TYPE), alumni::xlsx::CONTENT_TYPE);
    let rows = alumni::xlsx::read_first_sheet(&reply.body).unwrap();
    let names: Vec<&str> = rows[3..].iter().map(|r| r.cells[1].as_str()).collect();
    assert_eq!(names, vec!["Élodie Durand"]);

    let reply = app.send("GET", "/api/reports/students?format=csv", None).await;
    let text = String::from_utf8(reply.body).unwrap();
    assert_eq!(text.lines().count(), 3);

    let reply = app.send("GET", "/api/reports/students?format=pdf", None).await;
    assert_eq!(reply.header(header::CONTENT_TYPE), "application/pdf");
    assert!(reply.body.starts_with(b"%PDF-1.5"));
    let tail = &reply.body[reply.body.len().saturating_sub(16)..];
    assert!(tail.windows(5).any(|w| w == b"%%EOF"));
}

#[tokio::test]
async fn dashboard_rejects_out_of_range_years() {
    let app = TestApp::new().await;
    let reply = app.send("GET", "/api/analytics/dashboard?startYear=1200", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.send("GET", "/api/analytics/dashboard", None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_routes_are_404() {
    let app = TestApp::new().await;
    let reply = app.send("GET", "/api/nope", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["message"], "Not Found - /api/nope");
}
