//! Central application state
//!
//! Every handler reaches storage through the trait objects held here, so the
//! PostgreSQL and in-memory backends are interchangeable.

use crate::access::AccessEvaluator;
use crate::db::{
    InMemoryStore, PgPostRepository, PgPurchaseLedger, PgTaxonomyRepository, PgUserRepository,
    PostRepository, PurchaseLedger, TaxonomyRepository, UserRepository,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostRepository>,
    pub ledger: Arc<dyn PurchaseLedger>,
    pub taxonomy: Arc<dyn TaxonomyRepository>,
    pub users: Arc<dyn UserRepository>,
    pub evaluator: AccessEvaluator,
    /// Backend name reported by readiness checks
    pub backend: &'static str,
}

impl AppState {
    pub fn postgres(pool: PgPool) -> Self {
        let ledger: Arc<dyn PurchaseLedger> = Arc::new(PgPurchaseLedger::new(pool.clone()));
        Self {
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            evaluator: AccessEvaluator::new(ledger.clone()),
            ledger,
            taxonomy: Arc::new(PgTaxonomyRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool)),
            backend: "postgres",
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        let ledger: Arc<dyn PurchaseLedger> = store.clone();
        Self {
            posts: store.clone(),
            evaluator: AccessEvaluator::new(ledger.clone()),
            ledger,
            taxonomy: store.clone(),
            users: store,
            backend: "memory",
        }
    }
}
