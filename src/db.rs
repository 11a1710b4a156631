//! Database Module
//! SQLite を使用した users/customers/projects/見積の管理

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use tracing::info;

/// データベース接続プール
pub type DbPool = Pool<Sqlite>;

/// データベースを初期化
pub async fn init_db(db_url: &str) -> Result<DbPool> {
    info!("Initializing database: {}", db_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    // スキーマ作成
    create_schema(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// ファイルパスから接続文字列を作る（無ければ作成する）
pub fn db_url_for_path(db_path: &str) -> String {
    format!("sqlite:{}?mode=rwc", db_path)
}

/// スキーマ作成
pub async fn create_schema(pool: &DbPool) -> Result<()> {
    // users テーブル
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT,
            region TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at_ms INTEGER
        )
    "#)
    .execute(pool)
    .await?;

    // customers テーブル（サジェスト用のマスタ）
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            email TEXT,
            phone TEXT,
            city TEXT,
            created_at_ms INTEGER
        )
    "#)
    .execute(pool)
    .await?;

    // projects テーブル（1 プロジェクト = 1 見積番号）
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quotation_number TEXT NOT NULL UNIQUE,
            customer_name TEXT NOT NULL,
            requirements_data TEXT,
            quote_status TEXT NOT NULL DEFAULT 'Budgetary',
            created_at_ms INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL
        )
    "#)
    .execute(pool)
    .await?;

    // commercial_quotations テーブル（見積番号ごとに 1 行）
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS commercial_quotations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quotation_number TEXT NOT NULL UNIQUE,
            to_addr TEXT,
            attn TEXT,
            email_to TEXT,
            your_inquiry_ref TEXT,
            pages INTEGER,
            your_partner TEXT,
            mobile_no TEXT,
            fax_no TEXT,
            email_partner TEXT,
            inquiry_date TEXT,
            quotation_date TEXT,
            items TEXT,
            terms TEXT,
            general_conditions TEXT,
            subtotal REAL NOT NULL DEFAULT 0,
            tax_amount REAL NOT NULL DEFAULT 0,
            total_amount REAL NOT NULL DEFAULT 0,
            created_at_ms INTEGER,
            updated_at_ms INTEGER
        )
    "#)
    .execute(pool)
    .await?;

    // technical_quotations テーブル（要求 1 件につき 1 行）
    sqlx::query(r#"
        CREATE TABLE IF NOT EXISTS technical_quotations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quotation_number TEXT NOT NULL,
            requirement_key TEXT NOT NULL,
            part_type TEXT,
            technical_data TEXT,
            created_at_ms INTEGER,
            updated_at_ms INTEGER,
            UNIQUE(quotation_number, requirement_key)
        )
    "#)
    .execute(pool)
    .await?;

    // インデックス作成
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_projects_customer ON projects(customer_name)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(quote_status)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_technical_number ON technical_quotations(quotation_number)")
        .execute(pool).await?;

    Ok(())
}

/// 現在時刻 (epoch ms)
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
