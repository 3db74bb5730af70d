//! Startup initialization for blog-service
//!
//! ```text
//! Phase 1: Configure   logging, JWT keys
//! Phase 2: Connect     storage backend (+ migrations / seed data)
//! Phase 3: Run         HTTP server until a shutdown signal
//! ```

use crate::app_state::AppState;
use crate::config::{Config, StorageBackend};
use crate::db::{create_pool, InMemoryStore, MIGRATOR};
use anyhow::Context;
use crypto_core::jwt;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// PHASE 1: Configuration & Logging
// ============================================================================

/// Initialize logging. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_logging() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,blog_service=debug,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Load JWT keys from the environment.
///
/// With both keys the service issues and validates tokens; with only the
/// public key it validates but cannot register or log readers in.
pub fn init_jwt() -> anyhow::Result<()> {
    match jwt::load_signing_keys() {
        Ok((private_key, public_key)) => {
            jwt::initialize_jwt_keys(&private_key, &public_key)
                .context("Failed to initialize JWT keys")?;
            info!("JWT signing and validation keys loaded");
        }
        Err(signing_err) => match jwt::load_validation_key() {
            Ok(public_key) => {
                jwt::initialize_jwt_validation_only(&public_key)
                    .context("Failed to initialize JWT validation key")?;
                warn!("JWT private key not configured ({signing_err}); token issuing disabled");
            }
            Err(err) => {
                warn!("JWT keys not configured ({err}); authenticated requests will be rejected");
            }
        },
    }
    Ok(())
}

// ============================================================================
// PHASE 2: Storage
// ============================================================================

pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database)
                .await
                .context("Failed to connect to database")?;

            if config.storage.run_migrations {
                MIGRATOR
                    .run(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                info!("Database migrations completed");
            }

            Ok(AppState::postgres(pool))
        }
        StorageBackend::Memory => {
            let store = if config.storage.seed {
                let store = InMemoryStore::seeded()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to seed sample data: {e}"))?;
                info!("In-memory store seeded with sample posts");
                store
            } else {
                InMemoryStore::new()
            };
            warn!("Using in-memory storage; data is lost on restart");
            Ok(AppState::in_memory(Arc::new(store)))
        }
    }
}

// ============================================================================
// PHASE 3: Shutdown
// ============================================================================

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
