use super::TaxonomyRepository;
use crate::error::Result;
use crate::models::{Category, Tag};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    parent_id: Option<i64>,
    sort_order: i32,
    is_active: bool,
    posts_count: i64,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            parent_id: row.parent_id,
            sort_order: row.sort_order,
            is_active: row.is_active,
            posts_count: row.posts_count,
        }
    }
}

#[derive(Debug, FromRow)]
struct TagRow {
    id: i64,
    name: String,
    slug: String,
    color: String,
    posts_count: i64,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            slug: row.slug,
            color: row.color,
            posts_count: row.posts_count,
        }
    }
}

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.name, c.slug, c.parent_id, c.sort_order, c.is_active,
           (SELECT COUNT(*) FROM posts p
             WHERE p.category_id = c.id AND p.status = 'published') AS posts_count
    FROM categories c
"#;

const TAG_SELECT: &str = r#"
    SELECT t.id, t.name, t.slug, t.color,
           (SELECT COUNT(*) FROM post_tags pt
              JOIN posts p ON p.id = pt.post_id
             WHERE pt.tag_id = t.id AND p.status = 'published') AS posts_count
    FROM tags t
"#;

/// Categories and tags stored in PostgreSQL
#[derive(Clone)]
pub struct PgTaxonomyRepository {
    pool: PgPool,
}

impl PgTaxonomyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaxonomyRepository for PgTaxonomyRepository {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let sql = format!("{CATEGORY_SELECT} WHERE c.is_active ORDER BY c.sort_order, c.name");
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!("{CATEGORY_SELECT} WHERE c.is_active AND c.slug = $1");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Category::from))
    }

    async fn subcategory_ids(&self, parent_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT id FROM categories WHERE parent_id = $1 AND is_active ORDER BY id",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let sql = format!("{TAG_SELECT} ORDER BY t.name");
        let rows = sqlx::query_as::<_, TagRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let sql = format!("{TAG_SELECT} WHERE t.slug = $1");
        let row = sqlx::query_as::<_, TagRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Tag::from))
    }
}
