//! Data Models
//! User / Customer / Project などの永続化行と共通レスポンス型

use serde::{Deserialize, Serialize};

// ========================================
// User
// ========================================

/// User (DB row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub region: Option<String>,
    pub is_active: i64,
    pub created_at_ms: Option<i64>,
}

/// ログイン結果（パスワードハッシュは返さない）
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub region: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(u: &User) -> Self {
        UserProfile {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            full_name: u.full_name.clone(),
            region: u.region.clone(),
        }
    }
}

// ========================================
// Customer
// ========================================

/// Customer (DB row)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub created_at_ms: Option<i64>,
}

/// 顧客サジェスト（検索レスポンス用）
#[derive(Debug, Serialize)]
pub struct CustomerSuggestion {
    pub id: i64,
    pub name: String,
}

// ========================================
// Project
// ========================================

/// Project (DB row) — 1 プロジェクト = 1 見積番号
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub quotation_number: String,
    pub customer_name: String,
    /// 顧客要求一覧の JSON 配列（文字列のまま保持）
    pub requirements_data: Option<String>,
    /// Budgetary | Active | Won | Lost
    pub quote_status: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// Project 詳細レスポンス
#[derive(Debug, Serialize)]
pub struct ProjectData {
    pub id: i64,
    pub quotation_number: String,
    pub customer_name: String,
    pub requirements_data: String,
    pub quote_status: String,
    pub date_created: String,
    pub last_modified: String,
}

impl From<&Project> for ProjectData {
    fn from(p: &Project) -> Self {
        ProjectData {
            id: p.id,
            quotation_number: p.quotation_number.clone(),
            customer_name: p.customer_name.clone(),
            requirements_data: p.requirements_data.clone().unwrap_or_else(|| "[]".to_string()),
            quote_status: p.quote_status.clone(),
            date_created: format_date(p.created_at_ms),
            last_modified: format_date(p.updated_at_ms),
        }
    }
}

/// epoch ms → YYYY-MM-DD
pub fn format_date(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

// ========================================
// Commercial / Technical quotation rows
// ========================================

/// CommercialQuotation (DB row)
/// ヘッダ・明細 JSON・条件書テキストを 1 行で保持する
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommercialQuotationRow {
    pub id: i64,
    pub quotation_number: String,
    pub to_addr: Option<String>,
    pub attn: Option<String>,
    pub email_to: Option<String>,
    pub your_inquiry_ref: Option<String>,
    pub pages: Option<i64>,
    pub your_partner: Option<String>,
    pub mobile_no: Option<String>,
    pub fax_no: Option<String>,
    pub email_partner: Option<String>,
    pub inquiry_date: Option<String>,
    pub quotation_date: Option<String>,
    /// 明細行の JSON 配列
    pub items: Option<String>,
    /// 取引条件テキスト（terms コーデックの出力形式）
    pub terms: Option<String>,
    /// 一般条件テキスト（conditions コーデックの出力形式）
    pub general_conditions: Option<String>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub created_at_ms: Option<i64>,
    pub updated_at_ms: Option<i64>,
}

/// TechnicalQuotation (DB row) — 要求 1 件につき 1 行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TechnicalQuotationRow {
    pub id: i64,
    pub quotation_number: String,
    /// 要求の id 文字列。id の無い旧データは部品タイプ文字列が入る
    pub requirement_key: String,
    pub part_type: Option<String>,
    /// TechnicalQuoteData の JSON
    pub technical_data: Option<String>,
    pub created_at_ms: Option<i64>,
    pub updated_at_ms: Option<i64>,
}

// ========================================
// 共通レスポンス
// ========================================

/// {success: true, message} だけの汎用レスポンス
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

impl AckResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        AckResponse { success: true, message: message.into() }
    }
}
