use serde::Serialize;

/// Stored category row plus its published post count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub sort_order: i32,
    pub is_active: bool,
    pub posts_count: i64,
}

impl Category {
    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Category as returned by the API, with active children nested.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent: Option<i64>,
    pub posts_count: i64,
    pub is_active: bool,
    pub subcategories: Vec<CategoryNode>,
}

impl CategoryNode {
    fn leaf(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            parent: category.parent_id,
            posts_count: category.posts_count,
            is_active: category.is_active,
            subcategories: Vec::new(),
        }
    }
}

/// Arrange active categories as parents with their subcategories.
///
/// Both levels are ordered by `(sort_order, name)`. Children whose parent is
/// inactive or missing are dropped along with it.
pub fn build_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let mut active: Vec<&Category> = categories.iter().filter(|c| c.is_active).collect();
    active.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.name.cmp(&b.name))
    });

    active
        .iter()
        .filter(|c| c.is_parent())
        .map(|parent| {
            let mut node = CategoryNode::leaf(parent);
            node.subcategories = active
                .iter()
                .filter(|c| c.parent_id == Some(parent.id))
                .map(|child| CategoryNode::leaf(child))
                .collect();
            node
        })
        .collect()
}
