//! HTTP read surface for ranked listings.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::TrendingPage;
use crate::services::RecommendService;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_size")]
    pub size: usize,
}

fn default_page() -> usize {
    1
}

fn default_size() -> usize {
    20
}

/// GET /api/recommend/trending
async fn trending(
    service: web::Data<Arc<RecommendService>>,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    let items = service.get_trending(query.page, query.size).await;
    HttpResponse::Ok().json(TrendingPage {
        items,
        page: query.page.max(1),
        size: query.size,
    })
}

/// GET /api/recommend/user/{user_id}
async fn recommended(
    service: web::Data<Arc<RecommendService>>,
    user_id: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    let items = service
        .get_recommended(*user_id, query.page, query.size)
        .await;
    HttpResponse::Ok().json(TrendingPage {
        items,
        page: query.page.max(1),
        size: query.size,
    })
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/recommend")
            .route("/trending", web::get().to(trending))
            .route("/user/{user_id}", web::get().to(recommended)),
    );
}
