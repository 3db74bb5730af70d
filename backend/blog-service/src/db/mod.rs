/// Database access layer
///
/// Handlers and services talk to storage only through the traits below.
/// Two implementations exist:
/// - PostgreSQL repositories (`post_repo`, `purchase_repo`, `taxonomy_repo`, `user_repo`)
/// - `memory::InMemoryStore`, used for local runs and the HTTP tests
pub mod memory;
pub mod pool;
pub mod post_repo;
pub mod purchase_repo;
pub mod taxonomy_repo;
pub mod user_repo;

pub use memory::InMemoryStore;
pub use pool::{create_pool, DbConfig};
pub use post_repo::PgPostRepository;
pub use purchase_repo::PgPurchaseLedger;
pub use taxonomy_repo::PgTaxonomyRepository;
pub use user_repo::PgUserRepository;

use crate::error::{AppError, Result};
use crate::models::{Category, NewUser, Post, PostType, Purchase, PurchasedPost, Tag, User};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::migrate::Migrator;
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Sort order for post listings. Ties always break on newest id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrdering {
    #[default]
    PublishedDesc,
    PublishedAsc,
    TitleAsc,
    TitleDesc,
    PriceAsc,
    PriceDesc,
}

impl FromStr for PostOrdering {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "-published_at" => Ok(PostOrdering::PublishedDesc),
            "published_at" => Ok(PostOrdering::PublishedAsc),
            "title" => Ok(PostOrdering::TitleAsc),
            "-title" => Ok(PostOrdering::TitleDesc),
            "price" => Ok(PostOrdering::PriceAsc),
            "-price" => Ok(PostOrdering::PriceDesc),
            other => Err(AppError::field(
                "ordering",
                format!("'{other}' is not a valid ordering."),
            )),
        }
    }
}

/// Filters for published post listings.
#[derive(Debug, Clone)]
pub struct PostQuery {
    pub is_free: Option<bool>,
    pub is_featured: Option<bool>,
    pub post_type: Option<PostType>,
    /// Match any of these categories (a parent plus its subcategories)
    pub category_ids: Option<Vec<i64>>,
    pub tag_id: Option<i64>,
    /// Case-insensitive substring over title and excerpt
    pub search: Option<String>,
    /// Also search the content body
    pub search_content: bool,
    pub ordering: PostOrdering,
    pub limit: i64,
    pub offset: i64,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            is_free: None,
            is_featured: None,
            post_type: None,
            category_ids: None,
            tag_id: None,
            search: None,
            search_content: false,
            ordering: PostOrdering::default(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// One page of results plus the unpaginated total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Published post by slug; drafts resolve to `None`.
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Published post by id; drafts resolve to `None`.
    async fn find_published_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn list_published(&self, query: &PostQuery) -> Result<Page<Post>>;

    /// Storage reachability for readiness probes.
    async fn ping(&self) -> Result<()>;
}

/// Record of which readers paid for which posts.
///
/// Duplicate purchases of the same post are allowed and never revoke access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseLedger: Send + Sync {
    async fn has_purchased(&self, user_id: Uuid, post_id: i64) -> Result<bool>;

    /// Subset of `post_ids` the user has purchased.
    async fn purchased_among(&self, user_id: Uuid, post_ids: &[i64]) -> Result<HashSet<i64>>;

    /// One entry per purchased post (earliest purchase), newest first.
    async fn purchased_posts(&self, user_id: Uuid) -> Result<Vec<PurchasedPost>>;

    async fn record_purchase(&self, user_id: Uuid, post_id: i64, amount: Decimal)
        -> Result<Purchase>;
}

#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    /// Active categories with published post counts.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Active category by slug.
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    async fn subcategory_ids(&self, parent_id: i64) -> Result<Vec<i64>>;

    /// All tags with published post counts, ordered by name.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

/// Clamp a requested page into `[1, MAX_PAGE_SIZE]` x `[0, ..)`.
pub fn clamp_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
