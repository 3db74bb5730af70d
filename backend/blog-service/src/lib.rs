/// Blog Service Library
///
/// JSON API for a blog with free and paid posts. Paid content is returned in
/// full only to readers with a recorded purchase; everyone else receives the
/// post metadata with the body withheld.
///
/// # Modules
///
/// - `access`: access decisions and response projection for paid content
/// - `handlers`: HTTP request handlers
/// - `services`: business logic layer
/// - `db`: repository traits with PostgreSQL and in-memory implementations
/// - `models`: posts, taxonomy, users and purchases
/// - `middleware`: JWT authentication, identity extraction and request metrics
/// - `security`: password hashing
/// - `error`: error types and HTTP mapping
/// - `config`: configuration management
/// - `metrics`: Prometheus collectors
pub mod access;
pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;
pub mod startup;

pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, Result};
pub use routes::configure_routes;
