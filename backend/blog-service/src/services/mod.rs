/// Business logic layer for blog-service
///
/// - Post service: listings, detail views, search and discovery
/// - Access service: purchase checks and the purchased-posts listing
/// - Auth service: registration, login and token refresh
/// - Taxonomy service: category tree and tags
pub mod access;
pub mod auth;
pub mod posts;
pub mod taxonomy;

pub use access::AccessService;
pub use auth::AuthService;
pub use posts::{ListParams, PostScope, PostService};
pub use taxonomy::TaxonomyService;
