use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// One completed payment for a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub id: i64,
    pub user_id: Uuid,
    pub post_id: i64,
    pub amount: Decimal,
    pub purchased_at: DateTime<Utc>,
}

/// Entry of the caller's purchased posts listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchasedPost {
    /// Purchase identifier
    pub id: i64,
    pub post_id: i64,
    pub post_title: String,
    pub post_slug: String,
    pub paid_at: DateTime<Utc>,
    pub total_amount: Decimal,
}
