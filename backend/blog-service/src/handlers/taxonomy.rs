/// Category and tag handlers
use crate::access::Identity;
use crate::app_state::AppState;
use crate::error::Result;
use crate::services::{ListParams, PostService, TaxonomyService};
use actix_web::{web, HttpResponse};

pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse> {
    let tree = TaxonomyService::new(&state).category_tree().await?;
    Ok(HttpResponse::Ok().json(tree))
}

pub async fn category_posts(
    state: web::Data<AppState>,
    identity: Identity,
    slug: web::Path<String>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let response = PostService::new(&state)
        .category_posts(&identity, &slug, &params)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn list_tags(state: web::Data<AppState>) -> Result<HttpResponse> {
    let tags = TaxonomyService::new(&state).tags().await?;
    Ok(HttpResponse::Ok().json(tags))
}

pub async fn tag_posts(
    state: web::Data<AppState>,
    identity: Identity,
    slug: web::Path<String>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let response = PostService::new(&state)
        .tag_posts(&identity, &slug, &params)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}
