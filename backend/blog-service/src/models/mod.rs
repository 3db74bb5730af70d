/// Data models for blog-service
///
/// - Post: free or paid article with category, tags and author resolved
/// - Category / Tag: taxonomy used for navigation and filtering
/// - User: reader accounts for JWT auth
/// - Purchase: ledger entries granting access to paid posts
pub mod category;
pub mod post;
pub mod purchase;
pub mod tag;
pub mod user;

pub use category::{build_tree, Category, CategoryNode};
pub use post::{
    normalize_price, slugify, validate_pricing, Author, CategoryRef, Post, PostStatus, PostType,
    TagRef,
};
pub use purchase::{Purchase, PurchasedPost};
pub use tag::Tag;
pub use user::{NewUser, User, UserResponse};
