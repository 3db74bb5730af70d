/// HTTP handlers for blog-service
///
/// - Posts: listings, detail views, search, featured and latest
/// - Taxonomy: category tree, tags and their post listings
/// - Access: purchase checks for the authenticated reader
/// - Auth: register, login and token refresh
pub mod access;
pub mod auth;
pub mod health;
pub mod posts;
pub mod taxonomy;

pub use access::{check_access, purchased_posts};
pub use auth::{login, refresh, register};
pub use health::{health_check, liveness_check, readiness_check};
pub use posts::{
    featured_posts, get_free_post, get_paid_post, get_post, latest_posts, list_free_posts,
    list_paid_posts, list_posts, search_posts,
};
pub use taxonomy::{category_posts, list_categories, list_tags, tag_posts};
