/// Purchase access handlers (authenticated)
use crate::app_state::AppState;
use crate::error::Result;
use crate::middleware::UserId;
use crate::services::AccessService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CheckAccessRequest {
    #[validate(
        required(message = "This field is required."),
        range(min = 1, message = "A valid post id is required.")
    )]
    pub post_id: Option<i64>,
}

/// Whether the caller has purchased a paid post
pub async fn check_access(
    state: web::Data<AppState>,
    user_id: UserId,
    req: web::Json<CheckAccessRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let post_id = req.post_id.unwrap_or_default();

    let response = AccessService::new(&state)
        .check_access(user_id.0, post_id)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// The caller's purchases, newest first
pub async fn purchased_posts(
    state: web::Data<AppState>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let response = AccessService::new(&state)
        .purchased_posts(user_id.0)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}
