/// Post service - listing, detail and discovery queries gated by access
use crate::access::{project, project_list_item, AccessEvaluator, Identity, PostListItem, PostView};
use crate::app_state::AppState;
use crate::db::{clamp_page, PostOrdering, PostQuery, PostRepository, TaxonomyRepository};
use crate::error::{AppError, Result};
use crate::models::{Post, PostType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SEARCH_LIMIT: i64 = 20;
pub const FEATURED_LIMIT: i64 = 10;
pub const LATEST_DEFAULT_LIMIT: i64 = 10;
pub const LATEST_MAX_LIMIT: i64 = 50;

/// Query string accepted by every post listing.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub post_type: Option<String>,
    pub is_free: Option<bool>,
    pub is_featured: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
    pub results: Vec<PostListItem>,
}

/// Unpaginated discovery results (search, featured, latest).
#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<PostListItem>,
}

/// Which posts a route exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Free,
    Paid,
}

impl PostScope {
    fn is_free(self) -> Option<bool> {
        match self {
            PostScope::All => None,
            PostScope::Free => Some(true),
            PostScope::Paid => Some(false),
        }
    }

    fn admits(self, post: &Post) -> bool {
        self.is_free().map_or(true, |free| post.is_free == free)
    }
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    taxonomy: Arc<dyn TaxonomyRepository>,
    evaluator: AccessEvaluator,
}

impl PostService {
    pub fn new(state: &AppState) -> Self {
        Self {
            posts: state.posts.clone(),
            taxonomy: state.taxonomy.clone(),
            evaluator: state.evaluator.clone(),
        }
    }

    /// Paginated listing. The scope overrides any `is_free` in the params.
    pub async fn list(
        &self,
        identity: &Identity,
        params: &ListParams,
        scope: PostScope,
    ) -> Result<PostListResponse> {
        let mut query = self.build_query(params).await?;
        if let Some(free) = scope.is_free() {
            query.is_free = Some(free);
        }
        self.run_list(identity, query).await
    }

    /// Published post by slug, shaped for the caller.
    ///
    /// Locked paid posts still resolve (200) with the content withheld.
    pub async fn detail(&self, identity: &Identity, slug: &str, scope: PostScope) -> Result<PostView> {
        let post = self
            .posts
            .find_published_by_slug(slug)
            .await?
            .filter(|post| scope.admits(post))
            .ok_or_else(|| AppError::NotFound(format!("No post matches '{slug}'")))?;

        let decision = self.evaluator.evaluate(identity, Some(&post)).await?;
        Ok(project(&post, &decision))
    }

    /// Title, excerpt and content search. `kind` is `free`, `paid` or anything
    /// else for both.
    pub async fn search(
        &self,
        identity: &Identity,
        term: &str,
        kind: Option<&str>,
    ) -> Result<ResultsResponse> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(ResultsResponse { results: Vec::new() });
        }

        let query = PostQuery {
            is_free: match kind {
                Some("free") => Some(true),
                Some("paid") => Some(false),
                _ => None,
            },
            search: Some(term.to_string()),
            search_content: true,
            limit: SEARCH_LIMIT,
            ..PostQuery::default()
        };
        self.run_results(identity, query).await
    }

    pub async fn featured(&self, identity: &Identity) -> Result<ResultsResponse> {
        let query = PostQuery {
            is_featured: Some(true),
            limit: FEATURED_LIMIT,
            ..PostQuery::default()
        };
        self.run_results(identity, query).await
    }

    pub async fn latest(&self, identity: &Identity, limit: Option<i64>) -> Result<ResultsResponse> {
        let query = PostQuery {
            ordering: PostOrdering::PublishedDesc,
            limit: limit
                .unwrap_or(LATEST_DEFAULT_LIMIT)
                .clamp(1, LATEST_MAX_LIMIT),
            ..PostQuery::default()
        };
        self.run_results(identity, query).await
    }

    /// Posts in a category or any of its subcategories.
    pub async fn category_posts(
        &self,
        identity: &Identity,
        slug: &str,
        params: &ListParams,
    ) -> Result<PostListResponse> {
        let category = self
            .taxonomy
            .find_category_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No category matches '{slug}'")))?;

        let mut query = self.build_query(params).await?;
        query.category_ids = Some(self.category_family(category.id).await?);
        self.run_list(identity, query).await
    }

    pub async fn tag_posts(
        &self,
        identity: &Identity,
        slug: &str,
        params: &ListParams,
    ) -> Result<PostListResponse> {
        let tag = self
            .taxonomy
            .find_tag_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No tag matches '{slug}'")))?;

        let mut query = self.build_query(params).await?;
        query.tag_id = Some(tag.id);
        self.run_list(identity, query).await
    }

    async fn category_family(&self, category_id: i64) -> Result<Vec<i64>> {
        let mut ids = vec![category_id];
        ids.extend(self.taxonomy.subcategory_ids(category_id).await?);
        Ok(ids)
    }

    /// Translate query-string params, resolving taxonomy slugs.
    async fn build_query(&self, params: &ListParams) -> Result<PostQuery> {
        let (limit, offset) = clamp_page(params.limit, params.offset);

        let post_type = params
            .post_type
            .as_deref()
            .map(str::parse::<PostType>)
            .transpose()?;
        let ordering = params
            .ordering
            .as_deref()
            .map(str::parse::<PostOrdering>)
            .transpose()?
            .unwrap_or_default();

        let category_ids = match params.category.as_deref() {
            Some(slug) => {
                let category = self
                    .taxonomy
                    .find_category_by_slug(slug)
                    .await?
                    .ok_or_else(|| {
                        AppError::field("category", format!("Unknown category '{slug}'."))
                    })?;
                Some(self.category_family(category.id).await?)
            }
            None => None,
        };

        let tag_id = match params.tag.as_deref() {
            Some(slug) => Some(
                self.taxonomy
                    .find_tag_by_slug(slug)
                    .await?
                    .ok_or_else(|| AppError::field("tag", format!("Unknown tag '{slug}'.")))?
                    .id,
            ),
            None => None,
        };

        Ok(PostQuery {
            is_free: params.is_free,
            is_featured: params.is_featured,
            post_type,
            category_ids,
            tag_id,
            search: params.search.clone(),
            search_content: false,
            ordering,
            limit,
            offset,
        })
    }

    async fn project_page(&self, identity: &Identity, posts: &[Post]) -> Result<Vec<PostListItem>> {
        let decisions = self.evaluator.evaluate_many(identity, posts).await?;
        Ok(posts
            .iter()
            .zip(decisions.iter())
            .map(|(post, decision)| project_list_item(post, decision))
            .collect())
    }

    async fn run_list(&self, identity: &Identity, query: PostQuery) -> Result<PostListResponse> {
        let page = self.posts.list_published(&query).await?;
        let results = self.project_page(identity, &page.items).await?;

        Ok(PostListResponse {
            count: page.total,
            limit: query.limit,
            offset: query.offset,
            has_more: query.offset + (results.len() as i64) < page.total,
            results,
        })
    }

    async fn run_results(&self, identity: &Identity, query: PostQuery) -> Result<ResultsResponse> {
        let page = self.posts.list_published(&query).await?;
        let results = self.project_page(identity, &page.items).await?;
        Ok(ResultsResponse { results })
    }
}
