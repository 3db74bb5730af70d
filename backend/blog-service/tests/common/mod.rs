//! Shared setup for HTTP-level tests
//!
//! Each test gets its own seeded in-memory store so purchases and accounts
//! never leak between tests.
#![allow(dead_code)]

use actix_web::web;
use blog_service::db::{InMemoryStore, PostRepository, PurchaseLedger, UserRepository};
use blog_service::models::{NewUser, User};
use blog_service::AppState;
use rust_decimal::Decimal;
use std::sync::Arc;

pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub state: web::Data<AppState>,
}

pub async fn seeded_context() -> TestContext {
    crypto_core::test_keys::init_test_keys();

    let store = Arc::new(InMemoryStore::seeded().await.expect("seed store"));
    let state = web::Data::new(AppState::in_memory(store.clone()));
    TestContext { store, state }
}

impl TestContext {
    pub async fn reader(&self, email: &str) -> User {
        self.store
            .create_user(NewUser {
                email: email.to_string(),
                full_name: "Test Reader".to_string(),
                password_hash: "not-used".to_string(),
            })
            .await
            .expect("create reader")
    }

    pub async fn post_id(&self, slug: &str) -> i64 {
        self.store
            .find_published_by_slug(slug)
            .await
            .expect("lookup post")
            .unwrap_or_else(|| panic!("seeded post {slug} missing"))
            .id
    }

    pub async fn purchase(&self, user: &User, slug: &str, amount: Decimal) {
        let post_id = self.post_id(slug).await;
        self.store
            .record_purchase(user.id, post_id, amount)
            .await
            .expect("record purchase");
    }
}

pub fn bearer_for(user: &User) -> (&'static str, String) {
    let token = crypto_core::jwt::generate_access_token(user.id, &user.email)
        .expect("issue access token");
    ("Authorization", format!("Bearer {token}"))
}
