use serde::Serialize;

/// Tag with its published post count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Tailwind color name used by the frontend badge
    pub color: String,
    pub posts_count: i64,
}
