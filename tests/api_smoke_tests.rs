//! HTTP surface smoke tests over the in-memory backends.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use kasilend_server::auth::AuthService;
use kasilend_server::domain::money;
use kasilend_server::engine::LoanEngine;
use kasilend_server::routes::api_router;
use kasilend_server::services::{AuditLog, StokvelaService, UserService};
use kasilend_server::state::AppState;
use kasilend_server::storage::MemoryDocumentStore;
use kasilend_server::store::MemoryStore;

fn test_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let audit = AuditLog::new(store.clone());
    let users = Arc::new(UserService::new(store.clone(), audit.clone()));
    let auth = Arc::new(AuthService::new(
        users.clone(),
        audit.clone(),
        "test-secret".to_string(),
        900,
        7,
    ));
    let stokvela = Arc::new(StokvelaService::new(store.clone()));
    let engine = Arc::new(LoanEngine::new(
        store,
        Arc::new(MemoryDocumentStore::new()),
        audit.clone(),
        money::DEFAULT_INTEREST_RATE,
        "loan-documents".to_string(),
    ));
    api_router(AppState::new(engine, users, auth, stokvela, audit))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_connected_store() {
    let app = test_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
}

#[tokio::test]
async fn preview_computes_the_flat_rate_return() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::get("/api/loans/preview?amount=1000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_return"], json!("1399.90"));
    assert_eq!(body["formatted"], "R1399.90");
}

#[tokio::test]
async fn preview_rejects_non_positive_amounts() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::get("/api/loans/preview?amount=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn signup_signin_and_me_round_trip() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signup",
            json!({
                "email": "sipho@example.com",
                "password": "a-strong-password",
                "full_name": "Sipho Dlamini",
                "gender": "male",
                "cellphone": "0731234567"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let signup = body_json(response).await;
    assert_eq!(signup["user"]["email"], "sipho@example.com");
    // Standard role by default.
    assert_eq!(signup["user"]["role"], 3);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signin",
            json!({ "email": "sipho@example.com", "password": "a-strong-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tokens = body_json(response).await;
    let access_token = tokens["access_token"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::get("/api/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["email"], "sipho@example.com");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = test_app();
    app.clone()
        .oneshot(post_json(
            "/api/auth/signup",
            json!({
                "email": "sipho@example.com",
                "password": "a-strong-password",
                "full_name": "Sipho Dlamini",
                "gender": "male",
                "cellphone": "0731234567"
            }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            "/api/auth/signin",
            json!({ "email": "sipho@example.com", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn decisions_require_a_token_and_the_admin_role() {
    let app = test_app();
    let loan_id = uuid::Uuid::new_v4();

    // No token at all.
    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/api/loans/{}/approve", loan_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A standard user's token.
    app.clone()
        .oneshot(post_json(
            "/api/auth/signup",
            json!({
                "email": "sipho@example.com",
                "password": "a-strong-password",
                "full_name": "Sipho Dlamini",
                "gender": "male",
                "cellphone": "0731234567"
            }),
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signin",
            json!({ "email": "sipho@example.com", "password": "a-strong-password" }),
        ))
        .await
        .unwrap();
    let tokens = body_json(response).await;
    let access_token = tokens["access_token"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::post(format!("/api/loans/{}/approve", loan_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "AUTHORIZATION_ERROR");
}

#[tokio::test]
async fn unknown_loan_is_not_found() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::get(format!("/api/loans/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = test_app();
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}
