use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use blog_service::{configure_routes, middleware, startup, Config};
use std::io;

/// Blog Service
///
/// Serves `/api/v1` on `BLOG_SERVICE_PORT` (default 8000) backed by either
/// PostgreSQL or the in-memory store (`STORAGE_BACKEND`).
#[actix_web::main]
async fn main() -> io::Result<()> {
    // Container healthcheck: `blog-service healthcheck`
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "healthcheck" || cmd == "healthcheck-http" {
                let port = std::env::var("BLOG_SERVICE_PORT").unwrap_or_else(|_| "8000".into());
                let url = format!("http://127.0.0.1:{port}/api/v1/health/live");
                match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => return Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"));
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"));
                    }
                }
            }
        }
    }

    dotenvy::dotenv().ok();
    startup::init_logging();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    startup::init_jwt().map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{e:#}")))?;

    let state = startup::build_state(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{e:#}")))?;
    tracing::info!(backend = state.backend, "Storage ready");

    let state = web::Data::new(state);
    let cors_config = config.cors.clone();
    let bind_addr = (config.app.host.clone(), config.app.port);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in cors_config.origins() {
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(middleware::MetricsMiddleware)
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(configure_routes)
    })
    .bind(&bind_addr)?
    .disable_signals()
    .run();

    tracing::info!("Listening on {}:{}", bind_addr.0, bind_addr.1);

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(res) => res?,
                Err(e) => return Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
            }
        }
        _ = startup::shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
        }
    }

    tracing::info!("blog-service shut down");
    Ok(())
}
