use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

use quotation_server::handlers;
use quotation_server::{db, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ログ初期化
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let pool = db::init_db(&db::db_url_for_path(&config.db_path)).await?;
    let state = AppState::new(pool, config.clone());

    // ルーター構築
    let app = handlers::api_router()
        // 生成したドキュメント/エクスポートの配信
        .nest_service("/files", ServeDir::new(&config.data_dir))
        .layer(CorsLayer::permissive())
        .with_state(state);

    info!("🚀 Quotation Server listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
