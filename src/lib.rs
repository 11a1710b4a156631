//! Quotation Server
//! 見積管理（顧客要求 → 商用/技術見積 → ドキュメント出力 → 分析）の
//! バックエンド。状態は SQLite、生成物はデータディレクトリ配下。

use std::path::PathBuf;
use std::sync::Arc;

pub mod analytics;
pub mod commercial;
pub mod conditions;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod render;
pub mod requirements;
pub mod schema;
pub mod search;
pub mod technical;
pub mod terms;

// ========================================
// 設定
// ========================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite ファイルパス
    pub db_path: String,
    /// 生成ドキュメント・エクスポートの保存先
    pub data_dir: PathBuf,
    pub bind_addr: String,
    /// 登録を許可するメールドメイン
    pub email_domain: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "quotation.db".to_string(),
            data_dir: PathBuf::from("data"),
            bind_addr: "0.0.0.0:3000".to_string(),
            email_domain: "example.com".to_string(),
        }
    }
}

impl AppConfig {
    /// 環境変数から読み込む。未設定の項目は既定値
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            db_path: std::env::var("QUOTE_DB_PATH").unwrap_or(default.db_path),
            data_dir: std::env::var("QUOTE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.data_dir),
            bind_addr: std::env::var("QUOTE_BIND_ADDR").unwrap_or(default.bind_addr),
            email_domain: std::env::var("QUOTE_EMAIL_DOMAIN").unwrap_or(default.email_domain),
        }
    }
}

// ========================================
// 共有状態
// ========================================

#[derive(Clone)]
pub struct AppState {
    pub db: db::DbPool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: db::DbPool, config: AppConfig) -> Self {
        AppState { db, config: Arc::new(config) }
    }
}
