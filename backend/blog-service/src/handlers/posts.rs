/// Post handlers - public listing and detail endpoints
///
/// Every endpoint accepts an optional Bearer token; paid content is unlocked
/// only for readers with a recorded purchase.
use crate::access::Identity;
use crate::app_state::AppState;
use crate::error::Result;
use crate::services::{ListParams, PostScope, PostService};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    pub limit: Option<i64>,
}

async fn list_scoped(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<ListParams>,
    scope: PostScope,
) -> Result<HttpResponse> {
    let response = PostService::new(&state)
        .list(&identity, &params, scope)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn detail_scoped(
    state: web::Data<AppState>,
    identity: Identity,
    slug: web::Path<String>,
    scope: PostScope,
) -> Result<HttpResponse> {
    let view = PostService::new(&state)
        .detail(&identity, &slug, scope)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// All published posts
pub async fn list_posts(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    list_scoped(state, identity, params, PostScope::All).await
}

pub async fn list_free_posts(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    list_scoped(state, identity, params, PostScope::Free).await
}

pub async fn list_paid_posts(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    list_scoped(state, identity, params, PostScope::Paid).await
}

/// Any published post; locked paid posts still return 200
pub async fn get_post(
    state: web::Data<AppState>,
    identity: Identity,
    slug: web::Path<String>,
) -> Result<HttpResponse> {
    detail_scoped(state, identity, slug, PostScope::All).await
}

pub async fn get_free_post(
    state: web::Data<AppState>,
    identity: Identity,
    slug: web::Path<String>,
) -> Result<HttpResponse> {
    detail_scoped(state, identity, slug, PostScope::Free).await
}

pub async fn get_paid_post(
    state: web::Data<AppState>,
    identity: Identity,
    slug: web::Path<String>,
) -> Result<HttpResponse> {
    detail_scoped(state, identity, slug, PostScope::Paid).await
}

pub async fn search_posts(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse> {
    let response = PostService::new(&state)
        .search(&identity, &params.q, params.kind.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn featured_posts(
    state: web::Data<AppState>,
    identity: Identity,
) -> Result<HttpResponse> {
    let response = PostService::new(&state).featured(&identity).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn latest_posts(
    state: web::Data<AppState>,
    identity: Identity,
    params: web::Query<LatestParams>,
) -> Result<HttpResponse> {
    let response = PostService::new(&state)
        .latest(&identity, params.limit)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}
