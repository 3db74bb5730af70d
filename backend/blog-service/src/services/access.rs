/// Access service - purchase checks for the authenticated reader
use crate::access::{AccessEvaluator, Identity};
use crate::app_state::AppState;
use crate::db::{PostRepository, PurchaseLedger};
use crate::error::{AppError, Result};
use crate::models::PurchasedPost;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct CheckAccessResponse {
    pub post_id: i64,
    pub has_access: bool,
    pub purchase_required: bool,
    pub price: Decimal,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct PurchasedPostsResponse {
    pub count: usize,
    pub results: Vec<PurchasedPost>,
}

pub struct AccessService {
    posts: Arc<dyn PostRepository>,
    ledger: Arc<dyn PurchaseLedger>,
    evaluator: AccessEvaluator,
}

impl AccessService {
    pub fn new(state: &AppState) -> Self {
        Self {
            posts: state.posts.clone(),
            ledger: state.ledger.clone(),
            evaluator: state.evaluator.clone(),
        }
    }

    pub async fn check_access(&self, user_id: Uuid, post_id: i64) -> Result<CheckAccessResponse> {
        let post = self
            .posts
            .find_published_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if post.is_free {
            return Err(AppError::field(
                "post_id",
                "This post is free and doesn't require purchase.",
            ));
        }

        let decision = self
            .evaluator
            .evaluate(&Identity::User(user_id), Some(&post))
            .await?;

        Ok(CheckAccessResponse {
            post_id: decision.post_id,
            has_access: decision.has_access,
            purchase_required: decision.purchase_required,
            price: decision.price,
            title: post.title,
            slug: post.slug,
        })
    }

    pub async fn purchased_posts(&self, user_id: Uuid) -> Result<PurchasedPostsResponse> {
        let results = self.ledger.purchased_posts(user_id).await?;
        Ok(PurchasedPostsResponse {
            count: results.len(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    #[tokio::test]
    async fn check_access_reflects_purchases() {
        let store = Arc::new(InMemoryStore::seeded().await.unwrap());
        let service = AccessService::new(&AppState::in_memory(store.clone()));
        let reader = Uuid::new_v4();
        let post = store
            .find_published_by_slug("django-saas-architecture")
            .await
            .unwrap()
            .unwrap();

        let before = service.check_access(reader, post.id).await.unwrap();
        assert!(!before.has_access);
        assert!(before.purchase_required);
        assert_eq!(before.price.to_string(), "49.00");

        store.record_purchase(reader, post.id, post.price).await.unwrap();
        let after = service.check_access(reader, post.id).await.unwrap();
        assert!(after.has_access);
        assert_eq!(after.slug, "django-saas-architecture");

        let purchased = service.purchased_posts(reader).await.unwrap();
        assert_eq!(purchased.count, 1);
    }

    #[tokio::test]
    async fn free_post_is_a_field_error() {
        let store = Arc::new(InMemoryStore::seeded().await.unwrap());
        let service = AccessService::new(&AppState::in_memory(store.clone()));
        let free = store
            .find_published_by_slug("getting-started-with-django")
            .await
            .unwrap()
            .unwrap();

        let err = service.check_access(Uuid::new_v4(), free.id).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref e) if e.contains_key("post_id")));
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let store = Arc::new(InMemoryStore::seeded().await.unwrap());
        let service = AccessService::new(&AppState::in_memory(store));

        let err = service.check_access(Uuid::new_v4(), 123).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
