use super::PurchaseLedger;
use crate::error::{AppError, Result};
use crate::models::{normalize_price, Purchase, PurchasedPost};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct PurchaseRow {
    id: i64,
    user_id: Uuid,
    post_id: i64,
    amount: Decimal,
    purchased_at: DateTime<Utc>,
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        Purchase {
            id: row.id,
            user_id: row.user_id,
            post_id: row.post_id,
            amount: normalize_price(row.amount),
            purchased_at: row.purchased_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PurchasedPostRow {
    id: i64,
    post_id: i64,
    post_title: String,
    post_slug: String,
    paid_at: DateTime<Utc>,
    total_amount: Decimal,
}

/// Purchase ledger stored in the `purchases` table
#[derive(Clone)]
pub struct PgPurchaseLedger {
    pool: PgPool,
}

impl PgPurchaseLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseLedger for PgPurchaseLedger {
    async fn has_purchased(&self, user_id: Uuid, post_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM purchases WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn purchased_among(&self, user_id: Uuid, post_ids: &[i64]) -> Result<HashSet<i64>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT post_id FROM purchases WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn purchased_posts(&self, user_id: Uuid) -> Result<Vec<PurchasedPost>> {
        let rows = sqlx::query_as::<_, PurchasedPostRow>(
            r#"
            SELECT * FROM (
                SELECT DISTINCT ON (pu.post_id)
                       pu.id, pu.post_id, p.title AS post_title, p.slug AS post_slug,
                       pu.purchased_at AS paid_at, pu.amount AS total_amount
                FROM purchases pu
                JOIN posts p ON p.id = pu.post_id
                WHERE pu.user_id = $1
                ORDER BY pu.post_id, pu.purchased_at ASC, pu.id ASC
            ) first_purchase
            ORDER BY paid_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PurchasedPost {
                id: row.id,
                post_id: row.post_id,
                post_title: row.post_title,
                post_slug: row.post_slug,
                paid_at: row.paid_at,
                total_amount: normalize_price(row.total_amount),
            })
            .collect())
    }

    async fn record_purchase(
        &self,
        user_id: Uuid,
        post_id: i64,
        amount: Decimal,
    ) -> Result<Purchase> {
        let row = sqlx::query_as::<_, PurchaseRow>(
            r#"
            INSERT INTO purchases (user_id, post_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, post_id, amount, purchased_at
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| purchase_insert_error(e, post_id))?;

        tracing::info!(%user_id, post_id, "purchase recorded");
        Ok(row.into())
    }
}

/// SQLSTATE for a foreign key violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// A purchase referencing a missing post is `NotFound`, as in the memory store.
fn purchase_insert_error(err: sqlx::Error, post_id: i64) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            return AppError::NotFound(format!("post {post_id}"));
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::fmt;

    #[derive(Debug)]
    struct PgCode(&'static str);

    impl fmt::Display for PgCode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "database error {}", self.0)
        }
    }

    impl std::error::Error for PgCode {}

    impl DatabaseError for PgCode {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                FOREIGN_KEY_VIOLATION => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    #[test]
    fn missing_post_maps_to_not_found() {
        let err = purchase_insert_error(sqlx::Error::Database(Box::new(PgCode("23503"))), 42);
        assert!(matches!(err, AppError::NotFound(ref msg) if msg == "post 42"));
    }

    #[test]
    fn other_failures_stay_database_errors() {
        let err = purchase_insert_error(sqlx::Error::Database(Box::new(PgCode("40001"))), 42);
        assert!(matches!(err, AppError::DatabaseError(_)));

        let err = purchase_insert_error(sqlx::Error::RowNotFound, 42);
        assert!(!matches!(err, AppError::NotFound(_)));
    }
}
