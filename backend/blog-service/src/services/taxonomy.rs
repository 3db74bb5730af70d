/// Taxonomy service - category tree and tag listing
use crate::app_state::AppState;
use crate::db::TaxonomyRepository;
use crate::error::Result;
use crate::models::{build_tree, CategoryNode, Tag};
use std::sync::Arc;

pub struct TaxonomyService {
    taxonomy: Arc<dyn TaxonomyRepository>,
}

impl TaxonomyService {
    pub fn new(state: &AppState) -> Self {
        Self {
            taxonomy: state.taxonomy.clone(),
        }
    }

    /// Active top-level categories with their active subcategories nested.
    pub async fn category_tree(&self) -> Result<Vec<CategoryNode>> {
        let categories = self.taxonomy.list_categories().await?;
        Ok(build_tree(&categories))
    }

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        self.taxonomy.list_tags().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    #[tokio::test]
    async fn seeded_tree_and_tags() {
        let store = Arc::new(InMemoryStore::seeded().await.unwrap());
        let service = TaxonomyService::new(&AppState::in_memory(store));

        let tree = service.category_tree().await.unwrap();
        let top: Vec<&str> = tree.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(top, vec!["django", "python"]);
        assert_eq!(tree[0].subcategories[0].slug, "django-rest-framework");
        assert_eq!(tree[0].subcategories[0].posts_count, 1);

        let tags = service.tags().await.unwrap();
        let jwt = tags.iter().find(|t| t.slug == "jwt").unwrap();
        assert_eq!(jwt.posts_count, 1);
    }
}
