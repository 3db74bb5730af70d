use super::AccessDecision;
use crate::models::{Author, CategoryRef, Post, PostType, TagRef};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Replaces the body of a post the caller has not unlocked.
pub const LOCKED_CONTENT_MARKER: &str = "[Content locked - Purchase required]";

/// Full post as returned by the detail endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<TagRef>,
    pub author: Option<Author>,
    pub post_type: PostType,
    pub is_free: bool,
    pub price: Decimal,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reading_time: u32,
    pub seo_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub get_seo_title: String,
    pub get_meta_description: String,
    pub get_keywords_list: Vec<String>,
    pub is_accessible: bool,
    pub purchase_required: bool,
}

/// Listing entry. Carries no content body.
#[derive(Debug, Clone, Serialize)]
pub struct PostListItem {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub cover_image: Option<String>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<TagRef>,
    pub author: Option<Author>,
    pub post_type: PostType,
    pub is_free: bool,
    pub price: Decimal,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub reading_time: u32,
    pub is_accessible: bool,
}

/// Shape a post for a detail response.
///
/// Without access only `content` changes; every other field is kept.
pub fn project(post: &Post, decision: &AccessDecision) -> PostView {
    let content = if decision.has_access {
        post.content.clone()
    } else {
        LOCKED_CONTENT_MARKER.to_string()
    };

    PostView {
        id: post.id,
        title: post.title.clone(),
        slug: post.slug.clone(),
        excerpt: post.excerpt.clone(),
        content,
        cover_image: post.cover_image.clone(),
        category: post.category.clone(),
        tags: post.tags.clone(),
        author: post.author.clone(),
        post_type: post.post_type,
        is_free: post.is_free,
        price: post.price,
        is_featured: post.is_featured,
        published_at: post.published_at,
        created_at: post.created_at,
        updated_at: post.updated_at,
        reading_time: post.reading_time(),
        seo_title: post.seo_title.clone(),
        meta_description: post.meta_description.clone(),
        meta_keywords: post.meta_keywords.clone(),
        get_seo_title: post.seo_title().to_string(),
        get_meta_description: post.meta_description().to_string(),
        get_keywords_list: post.keywords(),
        is_accessible: decision.has_access,
        purchase_required: decision.purchase_required,
    }
}

pub fn project_list_item(post: &Post, decision: &AccessDecision) -> PostListItem {
    PostListItem {
        id: post.id,
        title: post.title.clone(),
        slug: post.slug.clone(),
        excerpt: post.excerpt.clone(),
        cover_image: post.cover_image.clone(),
        category: post.category.clone(),
        tags: post.tags.clone(),
        author: post.author.clone(),
        post_type: post.post_type,
        is_free: post.is_free,
        price: post.price,
        is_featured: post.is_featured,
        published_at: post.published_at,
        reading_time: post.reading_time(),
        is_accessible: decision.has_access,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{decide, Identity};
    use crate::models::post::fixtures::post;
    use uuid::Uuid;

    fn paid_post() -> Post {
        let mut p = post(42, false, Decimal::new(2999, 2));
        p.slug = "advanced-tutorial".into();
        p.content = "Secret JWT walkthrough".into();
        p.tags = vec![TagRef {
            id: 1,
            name: "jwt".into(),
            slug: "jwt".into(),
            color: "blue".into(),
        }];
        p
    }

    #[test]
    fn locked_view_withholds_only_content() {
        let p = paid_post();
        let decision = decide(&Identity::Anonymous, &p, false);
        let view = project(&p, &decision);

        assert_eq!(view.content, LOCKED_CONTENT_MARKER);
        assert!(!view.is_accessible);
        assert!(view.purchase_required);
        assert_eq!(view.excerpt, p.excerpt);
        assert_eq!(view.tags, p.tags);
        assert_eq!(view.title, p.title);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["price"], "29.99");
        assert!(!json.to_string().contains("Secret JWT walkthrough"));
    }

    #[test]
    fn unlocked_view_has_full_content() {
        let p = paid_post();
        let decision = decide(&Identity::User(Uuid::new_v4()), &p, true);
        let view = project(&p, &decision);

        assert_eq!(view.content, "Secret JWT walkthrough");
        assert!(view.is_accessible);
        assert!(!view.purchase_required);
    }

    #[test]
    fn projection_is_idempotent() {
        let p = paid_post();
        let decision = decide(&Identity::Anonymous, &p, false);
        let first = serde_json::to_value(project(&p, &decision)).unwrap();
        let second = serde_json::to_value(project(&p, &decision)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn list_items_never_carry_content() {
        let p = paid_post();
        let decision = decide(&Identity::User(Uuid::new_v4()), &p, true);
        let json = serde_json::to_value(project_list_item(&p, &decision)).unwrap();

        assert!(json.get("content").is_none());
        assert_eq!(json["is_free"], false);
        assert_eq!(json["price"], "29.99");
        assert_eq!(json["excerpt"], "Short summary");
        assert_eq!(json["is_accessible"], true);
    }
}
