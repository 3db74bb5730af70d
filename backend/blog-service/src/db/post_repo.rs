use super::{Page, PostOrdering, PostQuery, PostRepository};
use crate::error::{AppError, Result};
use crate::models::{normalize_price, Author, CategoryRef, Post, PostType, TagRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use uuid::Uuid;

const POST_SELECT: &str = r#"
    SELECT p.id, p.slug, p.title, p.excerpt, p.content, p.cover_image, p.status,
           p.published_at, p.created_at, p.updated_at, p.is_featured, p.is_free, p.price,
           p.post_type, p.seo_title, p.meta_description, p.meta_keywords,
           p.reading_time_override,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
           c.parent_id AS category_parent_id,
           u.id AS author_id, u.email AS author_email, u.full_name AS author_full_name
    FROM posts p
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN users u ON u.id = p.author_id
"#;

#[derive(Debug, FromRow)]
struct PostRow {
    id: i64,
    slug: String,
    title: String,
    excerpt: String,
    content: String,
    cover_image: Option<String>,
    status: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_featured: bool,
    is_free: bool,
    price: Decimal,
    post_type: String,
    seo_title: Option<String>,
    meta_description: Option<String>,
    meta_keywords: Option<String>,
    reading_time_override: Option<i32>,
    category_id: Option<i64>,
    category_name: Option<String>,
    category_slug: Option<String>,
    category_parent_id: Option<i64>,
    author_id: Option<Uuid>,
    author_email: Option<String>,
    author_full_name: Option<String>,
}

impl PostRow {
    fn into_post(self, tags: Vec<TagRef>) -> Result<Post> {
        let category = match (self.category_id, self.category_name, self.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(CategoryRef {
                id,
                name,
                slug,
                parent_id: self.category_parent_id,
            }),
            _ => None,
        };
        let author = match (self.author_id, self.author_email) {
            (Some(id), Some(email)) => Some(Author {
                id,
                email,
                full_name: self.author_full_name.unwrap_or_default(),
            }),
            _ => None,
        };
        let post_type = self
            .post_type
            .parse::<PostType>()
            .map_err(|_| AppError::Internal(format!("unknown post type '{}'", self.post_type)))?;

        Ok(Post {
            id: self.id,
            slug: self.slug,
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            cover_image: self.cover_image,
            status: self.status.parse()?,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_featured: self.is_featured,
            is_free: self.is_free,
            price: normalize_price(self.price),
            post_type,
            seo_title: self.seo_title,
            meta_description: self.meta_description,
            meta_keywords: self.meta_keywords,
            reading_time_override: self.reading_time_override,
            category,
            tags,
            author,
        })
    }
}

#[derive(Debug, FromRow)]
struct PostTagRow {
    post_id: i64,
    id: i64,
    name: String,
    slug: String,
    color: String,
}

/// PostgreSQL-backed post repository
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn tags_for(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<TagRef>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT pt.post_id, t.id, t.name, t.slug, t.color
            FROM post_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_post: HashMap<i64, Vec<TagRef>> = HashMap::new();
        for row in rows {
            by_post.entry(row.post_id).or_default().push(TagRef {
                id: row.id,
                name: row.name,
                slug: row.slug,
                color: row.color,
            });
        }
        Ok(by_post)
    }

    async fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<Post>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut tags = self.tags_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let post_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_post(post_tags)
            })
            .collect()
    }

    async fn find_one(&self, column: &str, bind: FindBy<'_>) -> Result<Option<Post>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(POST_SELECT);
        qb.push(" WHERE p.status = 'published' AND p.");
        qb.push(column);
        qb.push(" = ");
        match bind {
            FindBy::Slug(slug) => qb.push_bind(slug.to_string()),
            FindBy::Id(id) => qb.push_bind(id),
        };

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

enum FindBy<'a> {
    Slug(&'a str),
    Id(i64),
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
    qb.push(" WHERE p.status = 'published'");

    if let Some(is_free) = query.is_free {
        qb.push(" AND p.is_free = ").push_bind(is_free);
    }
    if let Some(is_featured) = query.is_featured {
        qb.push(" AND p.is_featured = ").push_bind(is_featured);
    }
    if let Some(post_type) = query.post_type {
        qb.push(" AND p.post_type = ").push_bind(post_type.as_str());
    }
    if let Some(category_ids) = &query.category_ids {
        qb.push(" AND p.category_id = ANY(")
            .push_bind(category_ids.clone())
            .push(")");
    }
    if let Some(tag_id) = query.tag_id {
        qb.push(" AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ")
            .push_bind(tag_id)
            .push(")");
    }
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.excerpt ILIKE ")
            .push_bind(pattern.clone());
        if query.search_content {
            qb.push(" OR p.content ILIKE ").push_bind(pattern);
        }
        qb.push(")");
    }
}

fn order_clause(ordering: PostOrdering) -> &'static str {
    match ordering {
        PostOrdering::PublishedDesc => " ORDER BY p.published_at DESC NULLS LAST, p.id DESC",
        PostOrdering::PublishedAsc => " ORDER BY p.published_at ASC NULLS LAST, p.id DESC",
        PostOrdering::TitleAsc => " ORDER BY p.title ASC, p.id DESC",
        PostOrdering::TitleDesc => " ORDER BY p.title DESC, p.id DESC",
        PostOrdering::PriceAsc => " ORDER BY p.price ASC, p.id DESC",
        PostOrdering::PriceDesc => " ORDER BY p.price DESC, p.id DESC",
    }
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        self.find_one("slug", FindBy::Slug(slug)).await
    }

    async fn find_published_by_id(&self, id: i64) -> Result<Option<Post>> {
        self.find_one("id", FindBy::Id(id)).await
    }

    async fn list_published(&self, query: &PostQuery) -> Result<Page<Post>> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM posts p");
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build()
            .fetch_one(&self.pool)
            .await?
            .get::<i64, _>("count");

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(POST_SELECT);
        push_filters(&mut qb, query);
        qb.push(order_clause(query.ordering));
        qb.push(" LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: self.hydrate(rows).await?,
            total,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        assert_eq!(escape_like("django"), "django");
    }

    #[test]
    fn filters_render_expected_sql() {
        let query = PostQuery {
            is_free: Some(false),
            tag_id: Some(3),
            search: Some("jwt".into()),
            search_content: true,
            ..PostQuery::default()
        };
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT 1 FROM posts p");
        push_filters(&mut qb, &query);
        let sql = qb.sql();

        assert!(sql.contains("p.status = 'published'"));
        assert!(sql.contains("p.is_free = $1"));
        assert!(sql.contains("pt.tag_id = $2"));
        assert!(sql.contains("p.content ILIKE $5"));
    }
}
