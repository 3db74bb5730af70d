//! Registration when the process only holds the JWT public key
//!
//! Runs in its own test binary: JWT keys are process-wide and can be
//! installed once.

use actix_web::{http::StatusCode, test, web, App};
use blog_service::db::{InMemoryStore, UserRepository};
use blog_service::{configure_routes, AppState};
use crypto_core::jwt;
use crypto_core::test_keys::TEST_PUBLIC_KEY;
use serde_json::json;
use std::sync::Arc;

#[actix_web::test]
async fn registration_without_signing_key_stores_nothing() {
    jwt::initialize_jwt_validation_only(TEST_PUBLIC_KEY.trim()).unwrap();
    assert!(!jwt::can_issue_tokens());

    let store = Arc::new(InMemoryStore::new());
    let state = web::Data::new(AppState::in_memory(store.clone()));
    let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

    let payload = json!({
        "email": "late@example.com",
        "password": "reader-pass-42",
        "password_confirm": "reader-pass-42"
    });

    // Retrying must keep failing the same way rather than turning into 409.
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    let stored = store.find_by_email("late@example.com").await.unwrap();
    assert!(stored.is_none());
}
