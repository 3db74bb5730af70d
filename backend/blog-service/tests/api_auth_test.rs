//! Account registration, login and token refresh over HTTP

mod common;

use actix_web::{http::StatusCode, test, App};
use blog_service::configure_routes;
use common::seeded_context;
use serde_json::{json, Value};

#[actix_web::test]
async fn register_login_and_refresh() {
    let ctx = seeded_context().await;
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "email": "Reader@Example.com",
            "password": "reader-pass-42",
            "password_confirm": "reader-pass-42",
            "full_name": "Avid Reader"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], "reader@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["tokens"]["access"].is_string());

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": "reader@example.com", "password": "reader-pass-42" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let access = body["tokens"]["access"].as_str().unwrap().to_string();
    let refresh = body["tokens"]["refresh"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh": refresh }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["access"].is_string());

    // The issued access token works against the authenticated scope.
    let req = test::TestRequest::get()
        .uri("/api/v1/user/purchased-posts")
        .insert_header(("Authorization", format!("Bearer {access}")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 0);
}

#[actix_web::test]
async fn duplicate_registration_conflicts() {
    let ctx = seeded_context().await;
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure_routes)).await;

    let payload = json!({
        "email": "twice@example.com",
        "password": "reader-pass-42",
        "password_confirm": "reader-pass-42"
    });
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "email": "TWICE@example.com",
            "password": "reader-pass-42",
            "password_confirm": "reader-pass-42"
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn weak_password_is_a_field_error() {
    let ctx = seeded_context().await;
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "email": "weak@example.com",
            "password": "12345678",
            "password_confirm": "12345678"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["password"].is_array());
}

#[actix_web::test]
async fn mismatched_confirmation_is_rejected_before_storing() {
    let ctx = seeded_context().await;
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "email": "typo@example.com",
            "password": "reader-pass-42",
            "password_confirm": "reader-pass-24"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["password_confirm"].is_array());

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": "typo@example.com", "password": "reader-pass-42" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn wrong_password_is_unauthorized() {
    let ctx = seeded_context().await;
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "email": "login@example.com",
            "password": "reader-pass-42",
            "password_confirm": "reader-pass-42"
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    for (email, password) in [
        ("login@example.com", "wrong-pass-99"),
        ("nobody@example.com", "reader-pass-42"),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{email}");
    }
}

#[actix_web::test]
async fn access_token_cannot_be_used_to_refresh() {
    let ctx = seeded_context().await;
    let reader = ctx.reader("swap@example.com").await;
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure_routes)).await;

    let access = crypto_core::jwt::generate_access_token(reader.id, &reader.email).unwrap();
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh": access }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
