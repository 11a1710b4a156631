//! 商用見積ハンドラ
//! 見積本体・取引条件・一般条件の読み書きとドキュメント出力。
//! 保存時は total_price と sr_no をサーバー側で再計算してから永続化する。

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::projects::fetch_project_by_number;
use super::DocumentResponse;
use crate::commercial::CommercialQuoteState;
use crate::conditions::{self, Condition};
use crate::db;
use crate::error::{error_response, AppError, HandlerResult};
use crate::models::{AckResponse, CommercialQuotationRow};
use crate::render;
use crate::requirements::RequirementList;
use crate::terms::TermsModel;
use crate::AppState;

const DEFAULT_TAX_RATE: f64 = 0.18;

// ========================================
// リクエスト / レスポンス型
// ========================================

#[derive(Debug, Serialize)]
pub struct CommercialQuoteResponse {
    pub success: bool,
    pub quote: CommercialQuoteState,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    /// false = 保存済みが無く、プロジェクトの要求から初期化した
    pub is_saved: bool,
}

#[derive(Deserialize)]
pub struct SaveQuoteRequest {
    pub quote: CommercialQuoteState,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
}

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}

#[derive(Serialize)]
pub struct SaveQuoteResponse {
    pub success: bool,
    pub message: String,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
}

#[derive(Serialize)]
pub struct TermsResponse {
    pub success: bool,
    /// 番号付きテキスト形式
    pub terms: String,
    pub model: TermsModel,
}

#[derive(Serialize)]
pub struct ConditionsResponse {
    pub success: bool,
    pub conditions: Vec<Condition>,
    pub text: String,
}

#[derive(Deserialize)]
pub struct ConditionsRequest {
    pub conditions: Vec<Condition>,
}

#[derive(Serialize)]
pub struct TermOptionsResponse {
    pub success: bool,
    pub options: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
pub struct AddTermOptionRequest {
    pub field: String,
    pub option: String,
}

// ========================================
// 行 ↔ 編集状態の変換
// ========================================

fn state_from_row(row: &CommercialQuotationRow) -> CommercialQuoteState {
    let items = row
        .items
        .as_deref()
        .map(|json| serde_json::from_str(json).unwrap_or_default())
        .unwrap_or_default();
    CommercialQuoteState {
        to: row.to_addr.clone().unwrap_or_default(),
        attn: row.attn.clone().unwrap_or_default(),
        email_to: row.email_to.clone().unwrap_or_default(),
        your_inquiry_ref: row.your_inquiry_ref.clone().unwrap_or_default(),
        pages: row.pages.unwrap_or(1),
        your_partner: row.your_partner.clone().unwrap_or_default(),
        mobile_no: row.mobile_no.clone().unwrap_or_default(),
        fax_no: row.fax_no.clone().unwrap_or_default(),
        email_partner: row.email_partner.clone().unwrap_or_default(),
        inquiry_date: row.inquiry_date.clone().unwrap_or_default(),
        quotation_date: row.quotation_date.clone().unwrap_or_default(),
        items,
    }
}

async fn fetch_row(
    state: &AppState,
    quotation_number: &str,
) -> Result<Option<CommercialQuotationRow>, AppError> {
    let row = sqlx::query_as("SELECT * FROM commercial_quotations WHERE quotation_number = ?")
        .bind(quotation_number)
        .fetch_optional(&state.db)
        .await?;
    Ok(row)
}

// ========================================
// 見積本体
// ========================================

/// 商用見積の取得。保存済みが無ければプロジェクトの要求から初期化する
pub async fn get_quote(
    State(state): State<AppState>,
    Path(quotation_number): Path<String>,
) -> HandlerResult<CommercialQuoteResponse> {
    if let Some(row) = fetch_row(&state, &quotation_number).await? {
        let quote = state_from_row(&row);
        return Ok(Json(CommercialQuoteResponse {
            success: true,
            quote,
            subtotal: row.subtotal,
            tax_amount: row.tax_amount,
            total_amount: row.total_amount,
            is_saved: true,
        }));
    }

    let project = fetch_project_by_number(&state, &quotation_number).await?;
    let requirements =
        RequirementList::from_json(project.requirements_data.as_deref().unwrap_or("[]"));
    let mut quote =
        CommercialQuoteState::from_requirements(requirements.items(), &project.customer_name);
    quote.to = project.customer_name.clone();
    quote.quotation_date = crate::models::format_date(db::now_ms());

    Ok(Json(CommercialQuoteResponse {
        success: true,
        quote,
        subtotal: 0.0,
        tax_amount: 0.0,
        total_amount: 0.0,
        is_saved: false,
    }))
}

/// 商用見積の保存（upsert）
pub async fn save_quote(
    State(state): State<AppState>,
    Path(quotation_number): Path<String>,
    Json(payload): Json<SaveQuoteRequest>,
) -> HandlerResult<SaveQuoteResponse> {
    let project = fetch_project_by_number(&state, &quotation_number).await?;

    let mut quote = payload.quote;
    quote.recompute_totals();
    let subtotal = quote.subtotal();
    let tax_amount = subtotal * payload.tax_rate;
    let total_amount = subtotal + tax_amount;

    let items_json = serde_json::to_string(&quote.items)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let now = db::now_ms();

    sqlx::query(
        r#"
        INSERT INTO commercial_quotations (
            quotation_number, to_addr, attn, email_to, your_inquiry_ref, pages,
            your_partner, mobile_no, fax_no, email_partner, inquiry_date, quotation_date,
            items, subtotal, tax_amount, total_amount, created_at_ms, updated_at_ms
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(quotation_number) DO UPDATE SET
            to_addr = excluded.to_addr,
            attn = excluded.attn,
            email_to = excluded.email_to,
            your_inquiry_ref = excluded.your_inquiry_ref,
            pages = excluded.pages,
            your_partner = excluded.your_partner,
            mobile_no = excluded.mobile_no,
            fax_no = excluded.fax_no,
            email_partner = excluded.email_partner,
            inquiry_date = excluded.inquiry_date,
            quotation_date = excluded.quotation_date,
            items = excluded.items,
            subtotal = excluded.subtotal,
            tax_amount = excluded.tax_amount,
            total_amount = excluded.total_amount,
            updated_at_ms = excluded.updated_at_ms
        "#,
    )
    .bind(&quotation_number)
    .bind(&quote.to)
    .bind(&quote.attn)
    .bind(&quote.email_to)
    .bind(&quote.your_inquiry_ref)
    .bind(quote.pages)
    .bind(&quote.your_partner)
    .bind(&quote.mobile_no)
    .bind(&quote.fax_no)
    .bind(&quote.email_partner)
    .bind(&quote.inquiry_date)
    .bind(&quote.quotation_date)
    .bind(&items_json)
    .bind(subtotal)
    .bind(tax_amount)
    .bind(total_amount)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await
    .map_err(AppError::Backend)?;

    // プロジェクトの最終更新も動かす
    sqlx::query("UPDATE projects SET updated_at_ms = ? WHERE id = ?")
        .bind(now)
        .bind(project.id)
        .execute(&state.db)
        .await
        .map_err(AppError::Backend)?;

    info!("Commercial quote saved: {}", quotation_number);
    Ok(Json(SaveQuoteResponse {
        success: true,
        message: "Commercial quote saved".to_string(),
        subtotal,
        tax_amount,
        total_amount,
    }))
}

// ========================================
// 取引条件 / 一般条件
// ========================================

/// 取引条件の取得。未保存なら社内標準の既定値
pub async fn get_terms(
    State(state): State<AppState>,
    Path(quotation_number): Path<String>,
) -> HandlerResult<TermsResponse> {
    fetch_project_by_number(&state, &quotation_number).await?;
    let row = fetch_row(&state, &quotation_number).await?;

    let text = row
        .and_then(|r| r.terms)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| TermsModel::default().encode());
    let model = TermsModel::decode(&text);
    Ok(Json(TermsResponse { success: true, terms: text, model }))
}

/// 取引条件の保存。構造化モデルを受けてテキスト形式で永続化する
pub async fn save_terms(
    State(state): State<AppState>,
    Path(quotation_number): Path<String>,
    Json(model): Json<TermsModel>,
) -> HandlerResult<AckResponse> {
    fetch_project_by_number(&state, &quotation_number).await?;
    let text = model.encode();
    upsert_text_column(&state, &quotation_number, "terms", &text).await?;
    Ok(Json(AckResponse::ok("Terms saved")))
}

/// 一般条件の取得。未保存または解釈不能なら既定の 12 節
pub async fn get_conditions(
    State(state): State<AppState>,
    Path(quotation_number): Path<String>,
) -> HandlerResult<ConditionsResponse> {
    fetch_project_by_number(&state, &quotation_number).await?;
    let row = fetch_row(&state, &quotation_number).await?;

    let stored = row.and_then(|r| r.general_conditions).unwrap_or_default();
    let conditions = conditions::decode(&stored);
    let text = conditions::encode(&conditions);
    Ok(Json(ConditionsResponse { success: true, conditions, text }))
}

/// 一般条件の保存
pub async fn save_conditions(
    State(state): State<AppState>,
    Path(quotation_number): Path<String>,
    Json(payload): Json<ConditionsRequest>,
) -> HandlerResult<AckResponse> {
    fetch_project_by_number(&state, &quotation_number).await?;
    let text = conditions::encode(&payload.conditions);
    upsert_text_column(&state, &quotation_number, "general_conditions", &text).await?;
    Ok(Json(AckResponse::ok("General conditions saved")))
}

async fn upsert_text_column(
    state: &AppState,
    quotation_number: &str,
    column: &str,
    text: &str,
) -> Result<(), (StatusCode, Json<crate::error::ErrorResponse>)> {
    // column は呼び出し側の固定文字列のみ
    let sql = format!(
        r#"
        INSERT INTO commercial_quotations (quotation_number, {col}, created_at_ms, updated_at_ms)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(quotation_number) DO UPDATE SET
            {col} = excluded.{col},
            updated_at_ms = excluded.updated_at_ms
        "#,
        col = column
    );
    let now = db::now_ms();
    sqlx::query(&sql)
        .bind(quotation_number)
        .bind(text)
        .bind(now)
        .bind(now)
        .execute(&state.db)
        .await
        .map_err(AppError::Backend)?;
    Ok(())
}

// ========================================
// 条件ドロップダウンの選択肢
// ========================================

fn default_term_options() -> BTreeMap<String, Vec<String>> {
    let defaults = TermsModel::default();
    let mut options = BTreeMap::new();
    options.insert(
        "payment".to_string(),
        vec![
            defaults.payment.clone(),
            "50% Advance, 50% against Proforma Invoice".to_string(),
            "100% Against 45 Days Credit".to_string(),
        ],
    );
    options.insert(
        "priceBasis".to_string(),
        vec![defaults.price_basis.clone(), "FOR Destination Basis".to_string()],
    );
    options.insert(
        "pfCharges".to_string(),
        vec![defaults.pf_charges.clone(), "Inclusive".to_string()],
    );
    options.insert(
        "insurance".to_string(),
        vec![defaults.insurance.clone(), "Covered by us up to destination".to_string()],
    );
    options.insert(
        "deliveryPeriod".to_string(),
        vec![
            defaults.delivery_period.clone(),
            "10-12 weeks from date of technically and commercially clear PO".to_string(),
        ],
    );
    options.insert("warranty".to_string(), vec![defaults.warranty.clone()]);
    options
}

fn options_path(state: &AppState) -> std::path::PathBuf {
    state.config.data_dir.join("term_options.json")
}

async fn load_term_options(state: &AppState) -> BTreeMap<String, Vec<String>> {
    match tokio::fs::read_to_string(options_path(state)).await {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|_| default_term_options()),
        Err(_) => default_term_options(),
    }
}

/// ドロップダウン選択肢の取得
pub async fn get_term_options(
    State(state): State<AppState>,
) -> HandlerResult<TermOptionsResponse> {
    let options = load_term_options(&state).await;
    Ok(Json(TermOptionsResponse { success: true, options }))
}

/// 選択肢の追加（重複は無視）。ファイルに永続化する
pub async fn add_term_option(
    State(state): State<AppState>,
    Json(payload): Json<AddTermOptionRequest>,
) -> HandlerResult<AckResponse> {
    let option = payload.option.trim();
    if payload.field.trim().is_empty() || option.is_empty() {
        return Err(AppError::validation("Field and option are required").into());
    }

    let mut options = load_term_options(&state).await;
    let entries = options.entry(payload.field.clone()).or_default();
    if !entries.iter().any(|o| o == option) {
        entries.push(option.to_string());
    }

    let json = serde_json::to_string_pretty(&options)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    tokio::fs::create_dir_all(&state.config.data_dir)
        .await
        .map_err(AppError::Storage)?;
    tokio::fs::write(options_path(&state), json)
        .await
        .map_err(AppError::Storage)?;

    Ok(Json(AckResponse::ok("Option added")))
}

// ========================================
// ドキュメント出力
// ========================================

/// 印刷用ドキュメントを生成してデータディレクトリへ保存する
pub async fn create_document(
    State(state): State<AppState>,
    Path(quotation_number): Path<String>,
) -> HandlerResult<DocumentResponse> {
    let project = fetch_project_by_number(&state, &quotation_number).await?;
    let row = fetch_row(&state, &quotation_number).await?;

    let (quote, terms_text, conditions_text) = match row {
        Some(row) => {
            let quote = state_from_row(&row);
            (quote, row.terms.unwrap_or_default(), row.general_conditions.unwrap_or_default())
        }
        None => {
            let requirements =
                RequirementList::from_json(project.requirements_data.as_deref().unwrap_or("[]"));
            let quote = CommercialQuoteState::from_requirements(
                requirements.items(),
                &project.customer_name,
            );
            (quote, String::new(), String::new())
        }
    };

    let terms = if terms_text.trim().is_empty() {
        TermsModel::default()
    } else {
        TermsModel::decode(&terms_text)
    };
    let conditions = conditions::decode(&conditions_text);

    let html = render::commercial_document_html(&quotation_number, &quote, &terms, &conditions);
    let (filename, path) = render::write_document(&state.config.data_dir, "commercial", &html)
        .await
        .map_err(AppError::Storage)?;

    info!("Commercial document created: {}", filename);
    Ok(Json(DocumentResponse {
        success: true,
        filename,
        filepath: path.to_string_lossy().to_string(),
    }))
}
