//! API Handlers
//! ルーティングと各ドメインのハンドラ群

use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use serde::Serialize;

use crate::AppState;

pub mod analytics;
pub mod auth;
pub mod commercial;
pub mod projects;
pub mod technical;

// ========================================
// ヘルスチェック
// ========================================

/// 生成ドキュメント/エクスポートの共通レスポンス
#[derive(Serialize)]
pub struct DocumentResponse {
    pub success: bool,
    pub filename: String,
    pub filepath: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "quotation-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ========================================
// ルーター構築
// ========================================

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        // 認証
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/logout", post(auth::logout))
        // プロジェクト
        .route("/api/projects", get(projects::list_projects).post(projects::create_project))
        .route("/api/projects/:id", get(projects::get_project).delete(projects::delete_project))
        .route("/api/projects/:id/status", put(projects::update_status))
        .route("/api/projects/:id/requirements", put(projects::save_requirements))
        .route("/api/projects/check/:number", get(projects::check_quotation))
        .route("/api/customers/search", get(projects::search_customers))
        // 商用見積
        .route(
            "/api/quotes/:qn/commercial",
            get(commercial::get_quote).post(commercial::save_quote),
        )
        .route("/api/quotes/:qn/commercial/document", post(commercial::create_document))
        .route("/api/quotes/:qn/terms", get(commercial::get_terms).post(commercial::save_terms))
        .route(
            "/api/quotes/:qn/conditions",
            get(commercial::get_conditions).post(commercial::save_conditions),
        )
        .route(
            "/api/terms/options",
            get(commercial::get_term_options).post(commercial::add_term_option),
        )
        // 技術見積
        .route("/api/quotes/:qn/technical", get(technical::get_quotes))
        .route("/api/quotes/:qn/technical/document", post(technical::create_document))
        .route("/api/quotes/:qn/technical/:req_key", post(technical::save_quote))
        // 分析
        .route("/api/analytics/product", get(analytics::product_view))
        .route("/api/analytics/finance", get(analytics::finance_view))
        .route("/api/analytics/customer", get(analytics::customer_view))
        .route("/api/analytics/combined", get(analytics::combined_view))
        .route("/api/analytics/export", get(analytics::export))
}
