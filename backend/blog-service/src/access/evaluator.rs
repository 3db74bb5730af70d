use super::{AccessDecision, Identity};
use crate::db::PurchaseLedger;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::Post;
use std::sync::Arc;

/// Per-post access rule.
///
/// `purchased` is only consulted for a paid post and an authenticated caller.
pub fn decide(identity: &Identity, post: &Post, purchased: bool) -> AccessDecision {
    let has_access = match (post.is_free, identity) {
        (true, _) => true,
        (false, Identity::Anonymous) => false,
        (false, Identity::User(_)) => purchased,
    };
    AccessDecision::new(post.id, has_access, post.price)
}

/// Decides whether an identity may read a post's full content.
///
/// Holds no state of its own; every call reads the ledger afresh.
#[derive(Clone)]
pub struct AccessEvaluator {
    ledger: Arc<dyn PurchaseLedger>,
}

impl AccessEvaluator {
    pub fn new(ledger: Arc<dyn PurchaseLedger>) -> Self {
        Self { ledger }
    }

    /// Evaluate a single post. The ledger is only read for a paid post and
    /// an authenticated caller.
    pub async fn evaluate(&self, identity: &Identity, post: Option<&Post>) -> Result<AccessDecision> {
        let post = post.ok_or_else(|| {
            AppError::InvalidInput("access evaluation requires a post".to_string())
        })?;

        let purchased = match identity {
            Identity::User(user_id) if !post.is_free => {
                metrics::record_ledger_lookup("single");
                self.ledger.has_purchased(*user_id, post.id).await?
            }
            _ => false,
        };

        let decision = decide(identity, post, purchased);
        metrics::record_decision(decision.outcome(), post.is_free);
        tracing::debug!(
            post_id = post.id,
            has_access = decision.has_access,
            authenticated = identity.is_authenticated(),
            "access evaluated"
        );
        Ok(decision)
    }

    /// Evaluate a page of posts with at most one ledger query.
    ///
    /// Decisions are returned in the order of `posts`.
    pub async fn evaluate_many(
        &self,
        identity: &Identity,
        posts: &[Post],
    ) -> Result<Vec<AccessDecision>> {
        let paid_ids: Vec<i64> = posts.iter().filter(|p| !p.is_free).map(|p| p.id).collect();

        let purchased = match identity {
            Identity::User(user_id) if !paid_ids.is_empty() => {
                metrics::record_ledger_lookup("batch");
                self.ledger.purchased_among(*user_id, &paid_ids).await?
            }
            _ => Default::default(),
        };

        Ok(posts
            .iter()
            .map(|post| {
                let decision = decide(identity, post, purchased.contains(&post.id));
                metrics::record_decision(decision.outcome(), post.is_free);
                decision
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockPurchaseLedger;
    use crate::models::post::fixtures::post;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn evaluator(ledger: MockPurchaseLedger) -> AccessEvaluator {
        AccessEvaluator::new(Arc::new(ledger))
    }

    #[tokio::test]
    async fn free_post_is_open_to_everyone_without_ledger() {
        let mut ledger = MockPurchaseLedger::new();
        ledger.expect_has_purchased().never();
        let evaluator = evaluator(ledger);
        let free = post(1, true, Decimal::ZERO);

        for identity in [Identity::Anonymous, Identity::User(Uuid::new_v4())] {
            let decision = evaluator.evaluate(&identity, Some(&free)).await.unwrap();
            assert!(decision.has_access);
            assert!(!decision.purchase_required);
            assert_eq!(decision.price.to_string(), "0.00");
        }
    }

    #[tokio::test]
    async fn paid_post_is_locked_for_anonymous() {
        let mut ledger = MockPurchaseLedger::new();
        ledger.expect_has_purchased().never();
        let paid = post(123, false, Decimal::new(2999, 2));

        let decision = evaluator(ledger)
            .evaluate(&Identity::Anonymous, Some(&paid))
            .await
            .unwrap();

        assert_eq!(
            decision,
            AccessDecision {
                post_id: 123,
                has_access: false,
                purchase_required: true,
                price: Decimal::new(2999, 2),
            }
        );
    }

    #[tokio::test]
    async fn paid_post_follows_the_ledger() {
        let buyer = Uuid::new_v4();
        let browser = Uuid::new_v4();
        let mut ledger = MockPurchaseLedger::new();
        ledger
            .expect_has_purchased()
            .with(eq(buyer), eq(7))
            .returning(|_, _| Ok(true));
        ledger
            .expect_has_purchased()
            .with(eq(browser), eq(7))
            .returning(|_, _| Ok(false));
        let evaluator = evaluator(ledger);
        let paid = post(7, false, Decimal::new(49, 0));

        let bought = evaluator
            .evaluate(&Identity::User(buyer), Some(&paid))
            .await
            .unwrap();
        assert!(bought.has_access);
        assert!(!bought.purchase_required);

        let not_bought = evaluator
            .evaluate(&Identity::User(browser), Some(&paid))
            .await
            .unwrap();
        assert!(!not_bought.has_access);
        assert!(not_bought.purchase_required);
        assert_eq!(not_bought.price.to_string(), "49.00");
    }

    #[tokio::test]
    async fn evaluation_is_repeatable() {
        let user = Uuid::new_v4();
        let mut ledger = MockPurchaseLedger::new();
        ledger
            .expect_has_purchased()
            .times(2)
            .returning(|_, _| Ok(true));
        let evaluator = evaluator(ledger);
        let paid = post(9, false, Decimal::new(1000, 2));

        let first = evaluator.evaluate(&Identity::User(user), Some(&paid)).await.unwrap();
        let second = evaluator.evaluate(&Identity::User(user), Some(&paid)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_post_is_invalid_input() {
        let evaluator = evaluator(MockPurchaseLedger::new());
        let err = evaluator
            .evaluate(&Identity::Anonymous, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn ledger_failures_propagate() {
        let mut ledger = MockPurchaseLedger::new();
        ledger
            .expect_has_purchased()
            .returning(|_, _| Err(AppError::DatabaseError("connection reset".into())));
        let paid = post(3, false, Decimal::new(500, 2));

        let err = evaluator(ledger)
            .evaluate(&Identity::User(Uuid::new_v4()), Some(&paid))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn batch_queries_ledger_once_for_paid_posts() {
        let user = Uuid::new_v4();
        let mut ledger = MockPurchaseLedger::new();
        ledger
            .expect_purchased_among()
            .withf(move |u, ids| *u == user && ids.to_vec() == vec![2, 3])
            .times(1)
            .returning(|_, _| Ok(HashSet::from([3])));
        let posts = vec![
            post(1, true, Decimal::ZERO),
            post(2, false, Decimal::new(2999, 2)),
            post(3, false, Decimal::new(4900, 2)),
        ];

        let decisions = evaluator(ledger)
            .evaluate_many(&Identity::User(user), &posts)
            .await
            .unwrap();

        let access: Vec<bool> = decisions.iter().map(|d| d.has_access).collect();
        assert_eq!(access, vec![true, false, true]);
    }

    #[tokio::test]
    async fn batch_for_anonymous_skips_ledger() {
        let mut ledger = MockPurchaseLedger::new();
        ledger.expect_purchased_among().never();
        let posts = vec![post(1, true, Decimal::ZERO), post(2, false, Decimal::ONE)];

        let decisions = evaluator(ledger)
            .evaluate_many(&Identity::Anonymous, &posts)
            .await
            .unwrap();
        assert!(decisions[0].has_access);
        assert!(decisions[1].purchase_required);
    }
}
