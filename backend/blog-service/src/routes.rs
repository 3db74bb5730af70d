//! Route configuration
//!
//! Public post and taxonomy routes resolve an optional identity per request;
//! the `/user` scope requires a Bearer access token.

use crate::error::AppError;
use crate::handlers;
use crate::metrics::serve_metrics;
use crate::middleware::JwtAuthMiddleware;
use actix_web::web;

/// Configure all routes for the application
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/metrics", web::get().to(serve_metrics))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(handlers::health_check))
                .route("/health/ready", web::get().to(handlers::readiness_check))
                .route("/health/live", web::get().to(handlers::liveness_check))
                .configure(routes::posts::configure)
                .configure(routes::taxonomy::configure)
                .configure(routes::user::configure)
                .configure(routes::auth::configure),
        );
}

/// Malformed JSON bodies surface as 400 with the usual error body.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

mod routes {
    use super::*;

    pub mod posts {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            // Fixed segments must be registered before `/{slug}`.
            cfg.service(
                web::scope("/posts")
                    .route("", web::get().to(handlers::list_posts))
                    .route("/free", web::get().to(handlers::list_free_posts))
                    .route("/paid", web::get().to(handlers::list_paid_posts))
                    .route("/search", web::get().to(handlers::search_posts))
                    .route("/featured", web::get().to(handlers::featured_posts))
                    .route("/latest", web::get().to(handlers::latest_posts))
                    .route("/free/{slug}", web::get().to(handlers::get_free_post))
                    .route("/paid/{slug}", web::get().to(handlers::get_paid_post))
                    .route("/{slug}", web::get().to(handlers::get_post)),
            );
        }
    }

    pub mod taxonomy {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.route("/categories", web::get().to(handlers::list_categories))
                .route(
                    "/categories/{slug}/posts",
                    web::get().to(handlers::category_posts),
                )
                .route("/tags", web::get().to(handlers::list_tags))
                .route("/tags/{slug}/posts", web::get().to(handlers::tag_posts));
        }
    }

    pub mod user {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/user")
                    .wrap(JwtAuthMiddleware)
                    .route("/check-access", web::post().to(handlers::check_access))
                    .route("/purchased-posts", web::get().to(handlers::purchased_posts)),
            );
        }
    }

    pub mod auth {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::register))
                    .route("/login", web::post().to(handlers::login))
                    .route("/refresh", web::post().to(handlers::refresh)),
            );
        }
    }
}
