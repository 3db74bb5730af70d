//! In-memory storage backend
//!
//! Implements every repository trait over maps guarded by a single
//! `tokio::sync::RwLock`. Used for `STORAGE_BACKEND=memory` and by the
//! HTTP integration tests.

use super::{
    Page, PostOrdering, PostQuery, PostRepository, PurchaseLedger, TaxonomyRepository,
    UserRepository,
};
use crate::error::{AppError, Result};
use crate::models::{
    normalize_price, slugify, validate_pricing, Author, Category, CategoryRef, NewUser, Post,
    PostStatus, PostType, Purchase, PurchasedPost, Tag, TagRef, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredPost {
    post: Post,
    category_id: Option<i64>,
    tag_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
struct StoredTag {
    id: i64,
    name: String,
    slug: String,
    color: String,
}

#[derive(Default)]
struct Tables {
    posts: BTreeMap<i64, StoredPost>,
    categories: BTreeMap<i64, Category>,
    tags: BTreeMap<i64, StoredTag>,
    users: HashMap<Uuid, User>,
    purchases: Vec<Purchase>,
    next_post_id: i64,
    next_category_id: i64,
    next_tag_id: i64,
    next_purchase_id: i64,
}

impl Tables {
    fn published(&self) -> impl Iterator<Item = &StoredPost> {
        self.posts.values().filter(|p| p.post.is_published())
    }

    fn category_ref(&self, id: i64) -> Option<CategoryRef> {
        self.categories.get(&id).map(|c| CategoryRef {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
            parent_id: c.parent_id,
        })
    }

    fn tag_refs(&self, ids: &[i64]) -> Vec<TagRef> {
        let mut tags: Vec<TagRef> = ids
            .iter()
            .filter_map(|id| self.tags.get(id))
            .map(|t| TagRef {
                id: t.id,
                name: t.name.clone(),
                slug: t.slug.clone(),
                color: t.color.clone(),
            })
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    /// Post with its category and tags as they are now.
    fn resolve(&self, stored: &StoredPost) -> Post {
        let mut post = stored.post.clone();
        post.category = stored.category_id.and_then(|id| self.category_ref(id));
        post.tags = self.tag_refs(&stored.tag_ids);
        post
    }

    fn category_with_count(&self, category: &Category) -> Category {
        let posts_count = self
            .published()
            .filter(|p| p.category_id == Some(category.id))
            .count() as i64;
        Category {
            posts_count,
            ..category.clone()
        }
    }

    fn tag_with_count(&self, tag: &StoredTag) -> Tag {
        let posts_count = self
            .published()
            .filter(|p| p.tag_ids.contains(&tag.id))
            .count() as i64;
        Tag {
            id: tag.id,
            name: tag.name.clone(),
            slug: tag.slug.clone(),
            color: tag.color.clone(),
            posts_count,
        }
    }
}

/// Builder for posts inserted into an [`InMemoryStore`].
#[derive(Debug, Clone)]
pub struct NewPost {
    title: String,
    slug: Option<String>,
    excerpt: String,
    content: String,
    is_free: bool,
    price: Decimal,
    post_type: PostType,
    status: PostStatus,
    is_featured: bool,
    published_at: Option<DateTime<Utc>>,
    category_slug: Option<String>,
    tag_slugs: Vec<String>,
    author: Option<Author>,
    meta_keywords: Option<String>,
}

impl NewPost {
    /// Published free tutorial.
    pub fn free(title: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            slug: None,
            excerpt: String::new(),
            content: content.to_string(),
            is_free: true,
            price: Decimal::ZERO,
            post_type: PostType::Tutorial,
            status: PostStatus::Published,
            is_featured: false,
            published_at: None,
            category_slug: None,
            tag_slugs: Vec::new(),
            author: None,
            meta_keywords: None,
        }
    }

    /// Published paid tutorial.
    pub fn paid(title: &str, content: &str, price: Decimal) -> Self {
        Self {
            is_free: false,
            price,
            ..Self::free(title, content)
        }
    }

    pub fn with_slug(mut self, slug: &str) -> Self {
        self.slug = Some(slug.to_string());
        self
    }

    pub fn excerpt(mut self, excerpt: &str) -> Self {
        self.excerpt = excerpt.to_string();
        self
    }

    pub fn article(mut self) -> Self {
        self.post_type = PostType::Article;
        self
    }

    pub fn draft(mut self) -> Self {
        self.status = PostStatus::Draft;
        self
    }

    pub fn featured(mut self) -> Self {
        self.is_featured = true;
        self
    }

    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn in_category(mut self, slug: &str) -> Self {
        self.category_slug = Some(slug.to_string());
        self
    }

    pub fn tagged(mut self, slug: &str) -> Self {
        self.tag_slugs.push(slug.to_string());
        self
    }

    pub fn keywords(mut self, keywords: &str) -> Self {
        self.meta_keywords = Some(keywords.to_string());
        self
    }

    pub fn by(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }
}

/// Storage backend kept entirely in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_category(
        &self,
        name: &str,
        parent_id: Option<i64>,
        sort_order: i32,
    ) -> Result<Category> {
        let mut tables = self.tables.write().await;
        let slug = slugify(name);
        if tables.categories.values().any(|c| c.slug == slug) {
            return Err(AppError::Conflict(format!("category '{slug}' already exists")));
        }
        if let Some(parent) = parent_id {
            if !tables.categories.contains_key(&parent) {
                return Err(AppError::field("parent", "Unknown parent category."));
            }
        }

        tables.next_category_id += 1;
        let category = Category {
            id: tables.next_category_id,
            name: name.to_string(),
            slug,
            parent_id,
            sort_order,
            is_active: true,
            posts_count: 0,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    pub async fn set_category_active(&self, id: i64, is_active: bool) -> Result<()> {
        let mut tables = self.tables.write().await;
        let category = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;
        category.is_active = is_active;
        Ok(())
    }

    pub async fn insert_tag(&self, name: &str, color: &str) -> Result<Tag> {
        let mut tables = self.tables.write().await;
        let slug = slugify(name);
        if tables.tags.values().any(|t| t.slug == slug) {
            return Err(AppError::Conflict(format!("tag '{slug}' already exists")));
        }

        tables.next_tag_id += 1;
        let tag = StoredTag {
            id: tables.next_tag_id,
            name: name.to_string(),
            slug,
            color: color.to_string(),
        };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tables.tag_with_count(&tag))
    }

    pub async fn insert_post(&self, new_post: NewPost) -> Result<Post> {
        validate_pricing(new_post.is_free, new_post.price)?;

        let mut tables = self.tables.write().await;
        let slug = new_post.slug.unwrap_or_else(|| slugify(&new_post.title));
        if slug.is_empty() {
            return Err(AppError::field("slug", "This field may not be blank."));
        }
        if tables.posts.values().any(|p| p.post.slug == slug) {
            return Err(AppError::Conflict(format!("post '{slug}' already exists")));
        }

        let category_id = match &new_post.category_slug {
            Some(cat_slug) => Some(
                tables
                    .categories
                    .values()
                    .find(|c| &c.slug == cat_slug)
                    .map(|c| c.id)
                    .ok_or_else(|| AppError::field("category", "Unknown category."))?,
            ),
            None => None,
        };
        let tag_ids = new_post
            .tag_slugs
            .iter()
            .map(|tag_slug| {
                tables
                    .tags
                    .values()
                    .find(|t| &t.slug == tag_slug)
                    .map(|t| t.id)
                    .ok_or_else(|| AppError::field("tags", "Unknown tag."))
            })
            .collect::<Result<Vec<i64>>>()?;

        let now = Utc::now();
        let published_at = match new_post.status {
            PostStatus::Published => Some(new_post.published_at.unwrap_or(now)),
            PostStatus::Draft => None,
        };

        tables.next_post_id += 1;
        let post = Post {
            id: tables.next_post_id,
            slug,
            title: new_post.title,
            excerpt: new_post.excerpt,
            content: new_post.content,
            cover_image: None,
            status: new_post.status,
            published_at,
            created_at: now,
            updated_at: now,
            is_featured: new_post.is_featured,
            is_free: new_post.is_free,
            price: normalize_price(new_post.price),
            post_type: new_post.post_type,
            seo_title: None,
            meta_description: None,
            meta_keywords: new_post.meta_keywords,
            reading_time_override: None,
            category: None,
            tags: Vec::new(),
            author: new_post.author,
        };

        let stored = StoredPost {
            post,
            category_id,
            tag_ids,
        };
        let resolved = tables.resolve(&stored);
        tables.posts.insert(stored.post.id, stored);
        Ok(resolved)
    }

    /// Store populated with a small catalogue for local runs.
    pub async fn seeded() -> Result<Self> {
        let store = Self::new();

        let django = store.insert_category("Django", None, 0).await?;
        store
            .insert_category("Django REST Framework", Some(django.id), 0)
            .await?;
        store.insert_category("Python", None, 1).await?;

        store.insert_tag("django", "green").await?;
        store.insert_tag("jwt", "blue").await?;
        store.insert_tag("architecture", "purple").await?;

        let author = Author {
            id: Uuid::new_v4(),
            email: "editor@blog.local".to_string(),
            full_name: "Blog Editor".to_string(),
        };
        let now = Utc::now();

        store
            .insert_post(
                NewPost::free(
                    "Getting Started with Django",
                    "Install Django, create a project and run the development server.",
                )
                .excerpt("A first Django project from scratch.")
                .in_category("django")
                .tagged("django")
                .keywords("django, beginners")
                .published_at(now - Duration::days(10))
                .by(author.clone()),
            )
            .await?;

        store
            .insert_post(
                NewPost::paid(
                    "Advanced Tutorial",
                    "Token authentication with JWT, refresh rotation and permission classes.",
                    Decimal::new(2999, 2),
                )
                .with_slug("advanced-tutorial")
                .excerpt("JWT authentication for Django REST Framework APIs.")
                .in_category("django-rest-framework")
                .tagged("django")
                .tagged("jwt")
                .featured()
                .published_at(now - Duration::days(3))
                .by(author.clone()),
            )
            .await?;

        store
            .insert_post(
                NewPost::paid(
                    "Django SaaS Architecture",
                    "Multi-tenant schemas, billing boundaries and background workers.",
                    Decimal::new(49, 0),
                )
                .excerpt("Structuring a subscription product on Django.")
                .article()
                .in_category("django")
                .tagged("architecture")
                .featured()
                .published_at(now - Duration::days(1))
                .by(author.clone()),
            )
            .await?;

        store
            .insert_post(
                NewPost::free("Async Views Preview", "Work in progress.")
                    .in_category("django")
                    .draft()
                    .by(author),
            )
            .await?;

        Ok(store)
    }
}

fn matches(query: &PostQuery, stored: &StoredPost) -> bool {
    let post = &stored.post;
    if query.is_free.is_some_and(|f| f != post.is_free) {
        return false;
    }
    if query.is_featured.is_some_and(|f| f != post.is_featured) {
        return false;
    }
    if query.post_type.is_some_and(|t| t != post.post_type) {
        return false;
    }
    if let Some(ids) = &query.category_ids {
        match stored.category_id {
            Some(id) if ids.contains(&id) => {}
            _ => return false,
        }
    }
    if let Some(tag_id) = query.tag_id {
        if !stored.tag_ids.contains(&tag_id) {
            return false;
        }
    }
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let term = term.to_lowercase();
        let hit = post.title.to_lowercase().contains(&term)
            || post.excerpt.to_lowercase().contains(&term)
            || (query.search_content && post.content.to_lowercase().contains(&term));
        if !hit {
            return false;
        }
    }
    true
}

fn sort_posts(posts: &mut [&StoredPost], ordering: PostOrdering) {
    posts.sort_by(|a, b| {
        let (a, b) = (&a.post, &b.post);
        let primary = match ordering {
            // None sorts last in both directions
            PostOrdering::PublishedDesc => match (a.published_at, b.published_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (x, y) => y.is_none().cmp(&x.is_none()).reverse(),
            },
            PostOrdering::PublishedAsc => match (a.published_at, b.published_at) {
                (Some(x), Some(y)) => x.cmp(&y),
                (x, y) => y.is_none().cmp(&x.is_none()).reverse(),
            },
            PostOrdering::TitleAsc => a.title.cmp(&b.title),
            PostOrdering::TitleDesc => b.title.cmp(&a.title),
            PostOrdering::PriceAsc => a.price.cmp(&b.price),
            PostOrdering::PriceDesc => b.price.cmp(&a.price),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        let post = tables
            .published()
            .find(|p| p.post.slug == slug)
            .map(|p| tables.resolve(p));
        Ok(post)
    }

    async fn find_published_by_id(&self, id: i64) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .get(&id)
            .filter(|p| p.post.is_published())
            .map(|p| tables.resolve(p)))
    }

    async fn list_published(&self, query: &PostQuery) -> Result<Page<Post>> {
        let tables = self.tables.read().await;
        let mut hits: Vec<&StoredPost> = tables.published().filter(|p| matches(query, p)).collect();
        sort_posts(&mut hits, query.ordering);

        let total = hits.len() as i64;
        let items = hits
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .map(|p| tables.resolve(p))
            .collect();

        Ok(Page { items, total })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl PurchaseLedger for InMemoryStore {
    async fn has_purchased(&self, user_id: Uuid, post_id: i64) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .iter()
            .any(|p| p.user_id == user_id && p.post_id == post_id))
    }

    async fn purchased_among(&self, user_id: Uuid, post_ids: &[i64]) -> Result<HashSet<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id && post_ids.contains(&p.post_id))
            .map(|p| p.post_id)
            .collect())
    }

    async fn purchased_posts(&self, user_id: Uuid) -> Result<Vec<PurchasedPost>> {
        let tables = self.tables.read().await;

        let mut first: HashMap<i64, &Purchase> = HashMap::new();
        for purchase in tables.purchases.iter().filter(|p| p.user_id == user_id) {
            first
                .entry(purchase.post_id)
                .and_modify(|existing| {
                    if purchase.purchased_at < existing.purchased_at {
                        *existing = purchase;
                    }
                })
                .or_insert(purchase);
        }

        let mut entries: Vec<PurchasedPost> = first
            .into_values()
            .filter_map(|purchase| {
                let stored = tables.posts.get(&purchase.post_id)?;
                Some(PurchasedPost {
                    id: purchase.id,
                    post_id: purchase.post_id,
                    post_title: stored.post.title.clone(),
                    post_slug: stored.post.slug.clone(),
                    paid_at: purchase.purchased_at,
                    total_amount: purchase.amount,
                })
            })
            .collect();
        entries.sort_by(|a, b| b.paid_at.cmp(&a.paid_at).then_with(|| b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn record_purchase(
        &self,
        user_id: Uuid,
        post_id: i64,
        amount: Decimal,
    ) -> Result<Purchase> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post_id) {
            return Err(AppError::NotFound(format!("post {post_id}")));
        }

        tables.next_purchase_id += 1;
        let purchase = Purchase {
            id: tables.next_purchase_id,
            user_id,
            post_id,
            amount: normalize_price(amount),
            purchased_at: Utc::now(),
        };
        tables.purchases.push(purchase.clone());
        tracing::info!(%user_id, post_id, "purchase recorded");
        Ok(purchase)
    }
}

#[async_trait]
impl TaxonomyRepository for InMemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| c.is_active)
            .map(|c| tables.category_with_count(c))
            .collect();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(categories)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .find(|c| c.is_active && c.slug == slug)
            .map(|c| tables.category_with_count(c)))
    }

    async fn subcategory_ids(&self, parent_id: i64) -> Result<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .filter(|c| c.is_active && c.parent_id == Some(parent_id))
            .map(|c| c.id)
            .collect())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tags
            .values()
            .map(|t| tables.tag_with_count(t))
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tags
            .values()
            .find(|t| t.slug == slug)
            .map(|t| tables.tag_with_count(t)))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&new_user.email))
        {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            full_name: new_user.full_name,
            password_hash: new_user.password_hash,
            date_joined: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_store_hides_drafts() {
        let store = InMemoryStore::seeded().await.unwrap();

        let page = store.list_published(&PostQuery::default()).await.unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.iter().all(|p| p.is_published()));
        assert!(store
            .find_published_by_slug("async-views-preview")
            .await
            .unwrap()
            .is_none());

        let paid = store
            .find_published_by_slug("advanced-tutorial")
            .await
            .unwrap()
            .unwrap();
        assert!(!paid.is_free);
        assert_eq!(paid.price.to_string(), "29.99");
        assert_eq!(paid.tags.len(), 2);
    }

    #[tokio::test]
    async fn rejects_inconsistent_pricing() {
        let store = InMemoryStore::new();
        let err = store
            .insert_post(NewPost::paid("Broken", "body", Decimal::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        store.insert_post(NewPost::free("Once", "body")).await.unwrap();
        let err = store
            .insert_post(NewPost::free("Once", "again"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn filters_order_and_paginate() {
        let store = InMemoryStore::seeded().await.unwrap();

        let query = PostQuery {
            is_free: Some(false),
            ordering: PostOrdering::PriceAsc,
            ..PostQuery::default()
        };
        let page = store.list_published(&query).await.unwrap();
        let slugs: Vec<&str> = page.items.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["advanced-tutorial", "django-saas-architecture"]);

        let query = PostQuery {
            search: Some("JWT".into()),
            ..PostQuery::default()
        };
        let page = store.list_published(&query).await.unwrap();
        assert_eq!(page.total, 1);

        let query = PostQuery {
            limit: 1,
            offset: 1,
            ..PostQuery::default()
        };
        let page = store.list_published(&query).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].slug, "advanced-tutorial");
    }

    #[tokio::test]
    async fn duplicate_purchases_collapse() {
        let store = InMemoryStore::seeded().await.unwrap();
        let post = store
            .find_published_by_slug("advanced-tutorial")
            .await
            .unwrap()
            .unwrap();
        let user = Uuid::new_v4();

        assert!(!store.has_purchased(user, post.id).await.unwrap());
        let first = store
            .record_purchase(user, post.id, post.price)
            .await
            .unwrap();
        store
            .record_purchase(user, post.id, post.price)
            .await
            .unwrap();

        assert!(store.has_purchased(user, post.id).await.unwrap());
        let listed = store.purchased_posts(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[0].post_slug, "advanced-tutorial");
    }

    #[tokio::test]
    async fn category_counts_and_children() {
        let store = InMemoryStore::seeded().await.unwrap();
        let django = store.find_category_by_slug("django").await.unwrap().unwrap();
        assert_eq!(django.posts_count, 2);

        let children = store.subcategory_ids(django.id).await.unwrap();
        assert_eq!(children.len(), 1);

        store.set_category_active(children[0], false).await.unwrap();
        assert!(store.subcategory_ids(django.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn emails_are_unique_ignoring_case() {
        let store = InMemoryStore::new();
        let new_user = NewUser {
            email: "reader@example.com".into(),
            full_name: "Reader".into(),
            password_hash: "hash".into(),
        };
        store.create_user(new_user.clone()).await.unwrap();

        let err = store
            .create_user(NewUser {
                email: "READER@example.com".into(),
                ..new_user
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store
            .find_by_email("Reader@Example.com")
            .await
            .unwrap()
            .is_some());
    }
}
