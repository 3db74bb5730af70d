use crate::app_state::AppState;
use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    storage: String,
}

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

/// Quick health check against the post store
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let storage = match state.posts.ping().await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    HttpResponse::Ok().json(HealthResponse {
        status: if storage == "healthy" { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: storage.to_string(),
    })
}

/// Readiness: 200 when storage answers, 503 otherwise
pub async fn readiness_check(state: web::Data<AppState>) -> impl Responder {
    let start = Instant::now();
    let storage_check = match state.posts.ping().await {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: format!("{} storage reachable", state.backend),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(error = %e, backend = state.backend, "readiness check failed");
            ComponentCheck {
                status: ComponentStatus::Unhealthy,
                message: format!("{} storage unreachable", state.backend),
                latency_ms: Some(start.elapsed().as_millis() as u64),
            }
        }
    };

    let status = storage_check.status;
    let ready = matches!(status, ComponentStatus::Healthy);
    let mut checks = HashMap::new();
    checks.insert(state.backend.to_string(), storage_check);

    let response = ReadinessResponse {
        ready,
        status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
