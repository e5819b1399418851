use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use hiretrack::auth::{hash_password, issue_token, TokenConfig};
use hiretrack::config::{AppConfig, OwnershipMode};
use hiretrack::entities::{candidate, user};
use hiretrack::{create_app, AppState};
use http_body_util::BodyExt;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use serde_json::{json, Value};
use std::path::Path;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn config(upload_dir: &Path) -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: SECRET.to_string(),
        token_ttl_hours: 1,
        upload_dir: upload_dir.to_path_buf(),
        skills_max_len: 1000,
        import_batch_size: 200,
        ownership: OwnershipMode::Enabled,
        run_migrations: false,
        // The governor needs connect info that oneshot requests lack
        rate_limit_burst: 0,
        upload_ttl_hours: 0,
    }
}

fn app_with(db: DatabaseConnection, upload_dir: &Path) -> Router {
    app_scoped(db, upload_dir, true)
}

fn app_scoped(db: DatabaseConnection, upload_dir: &Path, schema_has_ownership: bool) -> Router {
    create_app(AppState::new(db, &config(upload_dir), schema_has_ownership))
}

/// One rendered entry per statement the mock connection saw.
fn statement_log(db: DatabaseConnection) -> Vec<String> {
    db.into_transaction_log().iter().map(|t| format!("{:?}", t)).collect()
}

fn exec_result(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

fn get(uri: &str, user_id: i32) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(user_id))
        .body(Body::empty())
        .unwrap()
}

fn staged_names(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn bearer(user_id: i32) -> String {
    let tokens = TokenConfig {
        secret: SECRET.to_string(),
        ttl_hours: 1,
    };
    format!("Bearer {}", issue_token(&tokens, user_id).unwrap())
}

fn json_request(method: &str, uri: &str, user_id: Option<i32>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = user_id {
        builder = builder.header(header::AUTHORIZATION, bearer(id));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn multipart_request(user_id: i32, file_name: &str, contents: &str) -> Request<Body> {
    let boundary = "hiretrack-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: text/csv\r\n\r\n{contents}\r\n--{b}--\r\n",
        b = boundary,
        name = file_name,
        contents = contents,
    );
    Request::builder()
        .method("POST")
        .uri("/api/uploads")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .header(header::AUTHORIZATION, bearer(user_id))
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn candidate_model(id: i32, name: &str, scores: [i32; 4]) -> candidate::Model {
    candidate::Model {
        id,
        name: Some(name.to_string()),
        role: Some("Engineer".to_string()),
        email: None,
        mobile_number: None,
        skills: Some("rust, sql".to_string()),
        years_of_experience: 3.0,
        score_1: scores[0],
        score_2: scores[1],
        score_3: scores[2],
        score_4: scores[3],
        owner_id: Some(1),
    }
}

fn user_model(email: &str, password: &str) -> user::Model {
    user::Model {
        id: 5,
        name: "Riya".to_string(),
        email: email.to_string(),
        password_hash: hash_password(password),
        created_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let response = app_with(empty_db(), dir.path())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Service is healthy");
}

#[tokio::test]
async fn candidate_routes_require_a_token() {
    let dir = tempfile::tempdir().unwrap();
    let response = app_with(empty_db(), dir.path())
        .oneshot(Request::builder().uri("/api/candidates").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Authorization"));
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let foreign = TokenConfig {
        secret: "someone-else".to_string(),
        ttl_hours: 1,
    };
    let token = issue_token(&foreign, 1).unwrap();

    let response = app_with(empty_db(), dir.path())
        .oneshot(
            Request::builder()
                .uri("/api/candidates")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_includes_prediction_and_filters_on_it() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            candidate_model(1, "Asha", [20, 20, 20, 20]),
            candidate_model(2, "Ben", [10, 10, 0, 0]),
        ]])
        .into_connection();

    let response = app_with(db, dir.path())
        .oneshot(
            Request::builder()
                .uri("/api/candidates?min_prediction=50")
                .header(header::AUTHORIZATION, bearer(1))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "Asha");
    assert_eq!(list[0]["prediction"], 100);
}

#[tokio::test]
async fn missing_candidate_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<candidate::Model>::new()])
        .into_connection();

    let response = app_with(db, dir.path())
        .oneshot(
            Request::builder()
                .uri("/api/candidates/42")
                .header(header::AUTHORIZATION, bearer(1))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_someone_elses_candidate_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let response = app_with(db, dir.path())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/candidates/7")
                .header(header::AUTHORIZATION, bearer(2))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_scores_reject_values_off_the_scale() {
    let dir = tempfile::tempdir().unwrap();
    let request = json_request(
        "POST",
        "/api/candidates/scores",
        Some(1),
        json!({ "ids": [1, 2], "scores": { "score_1": 15 } }),
    );

    let response = app_with(empty_db(), dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_scores_report_updated_count() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 2,
        }])
        .into_connection();
    let request = json_request(
        "POST",
        "/api/candidates/scores",
        Some(1),
        json!({ "ids": [1, 2], "scores": { "score_2": 20, "score_4": 10 } }),
    );

    let response = app_with(db, dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["updated"], 2);
}

#[tokio::test]
async fn import_rows_reports_inserted_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 2,
        }])
        .into_connection();
    let request = json_request(
        "POST",
        "/api/candidates/import",
        Some(1),
        json!({
            "rows": [
                { "Candidate Name": "Asha", "Mobile No": "98765", "Score 1": 20 },
                { "cntname": "Ben", "Experience (yrs)": "n/a" },
                "not a row"
            ]
        }),
    );

    let response = app_with(db, dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["inserted_count"], 2);
    assert_eq!(body["skipped_rows"], 1);
    assert!(body["diagnostics"].as_array().unwrap().iter().any(|d| d["kind"] == "defaulted"));
}

#[tokio::test]
async fn import_without_valid_rows_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let request = json_request("POST", "/api/candidates/import", Some(1), json!({ "rows": [] }));

    let response = app_with(empty_db(), dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No valid rows to import");
}

#[tokio::test]
async fn login_with_unknown_email_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let request = json_request(
        "POST",
        "/api/auth/login",
        None,
        json!({ "email": "nobody@example.com", "password": "whatever1" }),
    );

    let response = app_with(db, dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_returns_a_usable_token() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user_model("riya@example.com", "correct-horse")]])
        .into_connection();
    let request = json_request(
        "POST",
        "/api/auth/login",
        None,
        json!({ "email": "Riya@Example.com ", "password": "correct-horse" }),
    );

    let response = app_with(db, dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], 5);
    let tokens = TokenConfig {
        secret: SECRET.to_string(),
        ttl_hours: 1,
    };
    let caller = hiretrack::auth::verify_token(&tokens, body["token"].as_str().unwrap()).unwrap();
    assert_eq!(caller.id, 5);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user_model("riya@example.com", "correct-horse")]])
        .into_connection();
    let request = json_request(
        "POST",
        "/api/auth/login",
        None,
        json!({ "email": "riya@example.com", "password": "battery-staple" }),
    );

    let response = app_with(db, dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_validates_before_touching_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let request = json_request(
        "POST",
        "/api/auth/signup",
        None,
        json!({ "name": "Riya", "email": "not-an-email", "password": "long-enough" }),
    );

    let response = app_with(empty_db(), dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_with_taken_email_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user_model("riya@example.com", "correct-horse")]])
        .into_connection();
    let request = json_request(
        "POST",
        "/api/auth/signup",
        None,
        json!({ "name": "Riya", "email": "riya@example.com", "password": "long-enough" }),
    );

    let response = app_with(db, dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "Conflict: User already exists");
}

#[tokio::test]
async fn discarded_upload_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(empty_db(), dir.path());

    let response = app
        .clone()
        .oneshot(multipart_request(1, "people.csv", "Name,Email\nAsha,asha@example.com\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let staged = body_json(response).await;
    assert_eq!(staged["status"], "pending");
    assert_eq!(staged["row_count"], 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    let file_id = staged["file_id"].as_str().unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/uploads/{}", file_id))
                .header(header::AUTHORIZATION, bearer(1))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn another_user_cannot_confirm_an_upload() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(empty_db(), dir.path());

    let response = app
        .clone()
        .oneshot(multipart_request(1, "people.csv", "Name\nAsha\n"))
        .await
        .unwrap();
    let file_id = body_json(response).await["file_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/uploads/{}/confirm", file_id),
            Some(2),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn confirmed_upload_is_imported_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 2,
        }])
        .into_connection();
    let app = app_with(db, dir.path());

    let response = app
        .clone()
        .oneshot(multipart_request(3, "people.csv", "Full Name,Score 2\nAsha,10\nBen,20\n"))
        .await
        .unwrap();
    let file_id = body_json(response).await["file_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/uploads/{}/confirm", file_id),
            Some(3),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "imported");
    assert_eq!(body["inserted_count"], 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn unsupported_upload_type_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let response = app_with(empty_db(), dir.path())
        .oneshot(multipart_request(1, "people.pdf", "%PDF-1.4"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn concurrent_confirms_import_an_upload_once() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec_result(2), exec_result(2)])
        .into_connection();
    let app = app_with(db.clone(), dir.path());

    let response = app
        .clone()
        .oneshot(multipart_request(3, "people.csv", "Full Name\nAsha\nBen\n"))
        .await
        .unwrap();
    let file_id = body_json(response).await["file_id"].as_str().unwrap().to_string();
    let uri = format!("/api/uploads/{}/confirm", file_id);

    let (first, second) = tokio::join!(
        app.clone().oneshot(json_request("POST", &uri, Some(3), json!({}))),
        app.clone().oneshot(json_request("POST", &uri, Some(3), json!({}))),
    );
    let mut statuses = [first.unwrap().status().as_u16(), second.unwrap().status().as_u16()];
    statuses.sort();

    assert_eq!(statuses, [200, 404]);
    let inserts = statement_log(db).iter().filter(|s| s.contains("INSERT")).count();
    assert_eq!(inserts, 1);
    assert!(staged_names(dir.path()).is_empty());
}

#[tokio::test]
async fn failed_confirm_without_committed_rows_stays_pending() {
    let dir = tempfile::tempdir().unwrap();
    // No exec results queued, so the first batch insert fails
    let app = app_with(empty_db(), dir.path());

    let response = app
        .clone()
        .oneshot(multipart_request(3, "people.csv", "Full Name\nAsha\n"))
        .await
        .unwrap();
    let file_id = body_json(response).await["file_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/uploads/{}/confirm", file_id),
            Some(3),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Import failed: 0 rows were inserted before the failure"
    );
    assert_eq!(staged_names(dir.path()), vec![format!("3-{}.csv", file_id)]);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/uploads/{}", file_id))
                .header(header::AUTHORIZATION, bearer(3))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn list_is_scoped_to_the_owner_only_when_the_schema_has_one() {
    for scoped in [true, false] {
        let dir = tempfile::tempdir().unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![candidate_model(1, "Asha", [20, 20, 0, 0])]])
            .into_connection();

        let response = app_scoped(db.clone(), dir.path(), scoped)
            .oneshot(get("/api/candidates", 9))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let log = statement_log(db);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].contains("owner_id"), scoped, "{}", log[0]);
    }
}

#[tokio::test]
async fn list_pages_in_sql_unless_filtering_on_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![candidate_model(6, "Asha", [0, 0, 0, 0])]])
        .into_connection();

    let response = app_with(db.clone(), dir.path())
        .oneshot(get("/api/candidates?limit=10&offset=5", 1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    // The database already applied the window, so the row is not skipped again
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let log = statement_log(db);
    assert!(log[0].contains("LIMIT"), "{}", log[0]);
    assert!(log[0].contains("OFFSET"), "{}", log[0]);
}

#[tokio::test]
async fn update_is_partial_and_scoped() {
    for scoped in [true, false] {
        let dir = tempfile::tempdir().unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_result(1)])
            .append_query_results([vec![candidate_model(4, "Asha", [10, 10, 10, 10])]])
            .into_connection();

        let response = app_scoped(db.clone(), dir.path(), scoped)
            .oneshot(json_request("PUT", "/api/candidates/4", Some(1), json!({ "role": "Lead" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["prediction"], 50);

        let log = statement_log(db);
        assert_eq!(log.len(), 2);
        assert!(log[0].contains("UPDATE"), "{}", log[0]);
        assert!(log[0].contains("role"));
        assert!(!log[0].contains("skills"));
        assert_eq!(log[0].contains("owner_id"), scoped, "{}", log[0]);
        assert_eq!(log[1].contains("owner_id"), scoped, "{}", log[1]);
    }
}

#[tokio::test]
async fn update_rejects_invalid_values_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let db = empty_db();
    let app = app_with(db.clone(), dir.path());

    let response = app
        .clone()
        .oneshot(json_request("PUT", "/api/candidates/4", Some(1), json!({ "score_3": 15 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/candidates/4",
            Some(1),
            json!({ "skills": "x".repeat(1001) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(statement_log(db).is_empty());
}

#[tokio::test]
async fn delete_and_bulk_scores_are_scoped() {
    for scoped in [true, false] {
        let dir = tempfile::tempdir().unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_result(1), exec_result(2)])
            .into_connection();
        let app = app_scoped(db.clone(), dir.path(), scoped);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/candidates/7")
                    .header(header::AUTHORIZATION, bearer(2))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/candidates/scores",
                Some(2),
                json!({ "ids": [1, 2], "scores": { "score_1": 20 } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let log = statement_log(db);
        assert_eq!(log.len(), 2);
        assert!(log[0].contains("DELETE"), "{}", log[0]);
        assert!(log[1].contains("UPDATE"), "{}", log[1]);
        for statement in &log {
            assert_eq!(statement.contains("owner_id"), scoped, "{}", statement);
        }
    }
}

#[tokio::test]
async fn create_stamps_the_owner_only_when_the_schema_has_one() {
    for scoped in [true, false] {
        let dir = tempfile::tempdir().unwrap();
        let created = candidate_model(11, "Asha", [20, 0, 0, 0]);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![created.clone()], vec![created]])
            .into_connection();

        let response = app_scoped(db.clone(), dir.path(), scoped)
            .oneshot(json_request(
                "POST",
                "/api/candidates",
                Some(1),
                json!({ "name": "Asha", "score_1": 20 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["id"], 11);
        assert_eq!(body["prediction"], 25);

        let log = statement_log(db);
        assert!(log[0].contains("INSERT"), "{}", log[0]);
        assert_eq!(log[0].contains("owner_id"), scoped, "{}", log[0]);
    }
}

#[tokio::test]
async fn create_requires_a_name_and_valid_scores() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(empty_db(), dir.path());

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/candidates", Some(1), json!({ "name": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/candidates",
            Some(1),
            json!({ "name": "Asha", "score_2": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn export_selected_ids_as_csv() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            candidate_model(1, "Asha", [20, 20, 20, 20]),
            candidate_model(3, "Ben", [0, 0, 0, 0]),
        ]])
        .into_connection();

    let response = app_with(db.clone(), dir.path())
        .oneshot(get("/api/candidates/export?ids=1,3", 1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("id,name,role"));
    assert!(lines.next().unwrap().starts_with("1,Asha,"));
    assert!(lines.next().unwrap().ends_with(",0"));

    let log = statement_log(db);
    assert!(log[0].contains("IN"), "{}", log[0]);
    assert!(log[0].contains("owner_id"), "{}", log[0]);
}

#[tokio::test]
async fn export_rejects_malformed_ids() {
    let dir = tempfile::tempdir().unwrap();
    let response = app_with(empty_db(), dir.path())
        .oneshot(get("/api/candidates/export?ids=1,two", 1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
