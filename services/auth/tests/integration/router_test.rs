use axum::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase};
use serde_json::{Value, json};
use uuid::Uuid;

use financehub_auth::handlers::auth::X_CONFIRM_SECRET;
use financehub_auth::infra::jwks::{HttpKeySetFetcher, JWKS_CACHE_TTL};
use financehub_auth::router::build_router;
use financehub_auth::state::AppState;
use financehub_auth::usecase::external_token::ExternalTokenValidator;
use financehub_testing::auth::{MockIdentity, TEST_EXTERNAL_SECRET, TEST_ISSUER, bearer};

/// State whose database is unreachable: anything that touches storage answers 500,
/// everything decided before storage is exercised for real.
fn offline_state() -> AppState {
    AppState {
        db: DatabaseConnection::Disconnected,
        production: false,
        validator: ExternalTokenValidator {
            secret: Some(TEST_EXTERNAL_SECRET.to_owned()),
            audience: None,
            trusted_issuers: vec![TEST_ISSUER.to_owned()],
            keys: HttpKeySetFetcher::new(JWKS_CACHE_TTL).unwrap(),
        },
        mail_from: "noreply@financehub.com".to_owned(),
        identity_provider: None,
        confirm_user_secret: None,
    }
}

/// State whose database answers every query with an error.
fn failing_db_state() -> AppState {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([DbErr::Custom("connection refused".to_owned())])
        .into_connection();
    AppState {
        db,
        ..offline_state()
    }
}

fn server(state: AppState) -> TestServer {
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn should_answer_healthz_with_request_id() {
    let response = server(offline_state()).get("/healthz").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let id = response.header("x-request-id");
    assert!(id.to_str().unwrap().parse::<Uuid>().is_ok());
}

#[tokio::test]
async fn should_report_not_ready_without_database() {
    let response = server(offline_state()).get("/readyz").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn should_reject_malformed_email_on_send_code() {
    let response = server(offline_state())
        .post("/api/auth/send-code")
        .json(&json!({ "email": "not-an-email" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn should_hide_storage_detail_on_send_code() {
    let response = server(failing_db_state())
        .post("/api/auth/send-code")
        .json(&json!({ "email": "alice@example.com" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["kind"], "STORAGE_ERROR");
    assert_eq!(body["message"], "internal error");
    assert!(!body.to_string().contains("connection refused"));
}

#[tokio::test]
async fn should_reject_non_numeric_code_on_verify() {
    let response = server(offline_state())
        .post("/api/auth/verify-code")
        .json(&json!({ "email": "alice@example.com", "code": "12ab56" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn should_require_bearer_token_on_validate() {
    let response = server(offline_state()).get("/api/auth/validate").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_reject_forged_token_on_sync_profile() {
    let token = MockIdentity::new(Uuid::new_v4(), "alice@example.com").sign("wrong-secret");

    let response = server(offline_state())
        .post("/api/auth/sync-profile")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["kind"], "UNAUTHORIZED");
}

#[tokio::test]
async fn should_validate_registration_fields() {
    let response = server(offline_state())
        .post("/api/auth/register")
        .json(&json!({ "nome": "Bob", "email": "bob@example.com", "password": "123" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn should_report_registration_not_configured_without_identity_provider() {
    let response = server(offline_state())
        .post("/api/auth/register")
        .json(&json!({ "nome": "Bob", "email": "bob@example.com", "password": "s3cret!" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(response.json::<Value>()["kind"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn should_require_matching_confirm_secret() {
    let mut state = offline_state();
    state.confirm_user_secret = Some("let-me-in".to_owned());

    let response = server(state)
        .post("/api/auth/confirm-user")
        .add_header(
            HeaderName::from_static(X_CONFIRM_SECRET),
            HeaderValue::from_static("guess"),
        )
        .json(&json!({ "email": "alice@example.com" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_disable_confirm_user_in_production_without_secret() {
    let mut state = offline_state();
    state.production = true;

    let response = server(state)
        .post("/api/auth/confirm-user")
        .json(&json!({ "email": "alice@example.com" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(response.json::<Value>()["kind"], "NOT_CONFIGURED");
}
