/// Purchase-gated access control
///
/// - `evaluator`: decides whether a caller may read a post's full content
/// - `projector`: shapes a post for the response, withholding the body when locked
pub mod evaluator;
pub mod projector;

pub use evaluator::{decide, AccessEvaluator};
pub use projector::{project, project_list_item, PostListItem, PostView, LOCKED_CONTENT_MARKER};

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Who is asking. Resolved once per request and passed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(Uuid),
}

impl Identity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::Anonymous => None,
            Identity::User(id) => Some(*id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User(_))
    }
}

/// Outcome of evaluating one post for one identity. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub post_id: i64,
    pub has_access: bool,
    pub purchase_required: bool,
    pub price: Decimal,
}

impl AccessDecision {
    pub(crate) fn new(post_id: i64, has_access: bool, price: Decimal) -> Self {
        Self {
            post_id,
            has_access,
            purchase_required: !has_access,
            price,
        }
    }

    pub fn outcome(&self) -> &'static str {
        if self.has_access {
            "granted"
        } else {
            "locked"
        }
    }
}
