//! 技術見積ハンドラ
//! 要求 1 件につき 1 レコード。キーは要求 id 文字列、id の無い旧データは
//! 部品タイプ文字列で引く。

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::projects::fetch_project_by_number;
use super::DocumentResponse;
use crate::db;
use crate::error::{error_response, AppError, HandlerResult};
use crate::models::{AckResponse, TechnicalQuotationRow};
use crate::render;
use crate::requirements::RequirementList;
use crate::technical::{self, TechnicalQuoteData};
use crate::AppState;

// ========================================
// リクエスト / レスポンス型
// ========================================

#[derive(Serialize)]
pub struct TechnicalQuoteEntry {
    pub requirement_key: String,
    pub part_type: String,
    /// 完了率 (0-100)
    pub progress: u8,
    pub data: TechnicalQuoteData,
}

#[derive(Serialize)]
pub struct TechnicalQuotesResponse {
    pub success: bool,
    pub quotes: Vec<TechnicalQuoteEntry>,
}

#[derive(Deserialize)]
pub struct SaveTechnicalRequest {
    pub part_type: String,
    pub data: TechnicalQuoteData,
}

#[derive(Serialize)]
pub struct SaveTechnicalResponse {
    pub success: bool,
    pub message: String,
    pub progress: u8,
}

// ========================================
// ハンドラ
// ========================================

async fn fetch_rows(
    state: &AppState,
    quotation_number: &str,
) -> Result<Vec<TechnicalQuotationRow>, AppError> {
    let rows =
        sqlx::query_as("SELECT * FROM technical_quotations WHERE quotation_number = ?")
            .bind(quotation_number)
            .fetch_all(&state.db)
            .await?;
    Ok(rows)
}

fn saved_data<'a>(
    rows: &'a [TechnicalQuotationRow],
    key: &str,
    part_type: &str,
) -> Option<&'a TechnicalQuotationRow> {
    // id キーを優先し、旧データの部品タイプキーへフォールバック
    rows.iter()
        .find(|r| r.requirement_key == key)
        .or_else(|| rows.iter().find(|r| r.requirement_key == part_type))
}

/// 見積番号に属する技術見積を要求ごとにまとめて返す
pub async fn get_quotes(
    State(state): State<AppState>,
    Path(quotation_number): Path<String>,
) -> HandlerResult<TechnicalQuotesResponse> {
    let project = fetch_project_by_number(&state, &quotation_number).await?;
    let requirements =
        RequirementList::from_json(project.requirements_data.as_deref().unwrap_or("[]"));
    let rows = fetch_rows(&state, &quotation_number).await?;

    let mut quotes = Vec::new();
    for requirement in requirements.items() {
        let key = technical::quote_key(requirement);
        let existing = saved_data(&rows, &key, &requirement.part_type).and_then(|row| {
            row.technical_data
                .as_deref()
                .and_then(|json| serde_json::from_str(json).ok())
        });
        let data = TechnicalQuoteData::load(requirement, existing.as_ref());
        quotes.push(TechnicalQuoteEntry {
            requirement_key: key,
            progress: technical::progress(&requirement.part_type, &data.technical_fields),
            part_type: requirement.part_type.clone(),
            data,
        });
    }

    Ok(Json(TechnicalQuotesResponse { success: true, quotes }))
}

/// 技術見積の保存（要求キー単位の upsert）
pub async fn save_quote(
    State(state): State<AppState>,
    Path((quotation_number, requirement_key)): Path<(String, String)>,
    Json(payload): Json<SaveTechnicalRequest>,
) -> HandlerResult<SaveTechnicalResponse> {
    fetch_project_by_number(&state, &quotation_number).await?;
    if payload.part_type.trim().is_empty() {
        return Err(AppError::validation("Part type is required").into());
    }

    let data_json = serde_json::to_string(&payload.data)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let now = db::now_ms();

    sqlx::query(
        r#"
        INSERT INTO technical_quotations (quotation_number, requirement_key, part_type, technical_data, created_at_ms, updated_at_ms)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(quotation_number, requirement_key) DO UPDATE SET
            part_type = excluded.part_type,
            technical_data = excluded.technical_data,
            updated_at_ms = excluded.updated_at_ms
        "#,
    )
    .bind(&quotation_number)
    .bind(&requirement_key)
    .bind(&payload.part_type)
    .bind(&data_json)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await
    .map_err(AppError::Backend)?;

    let progress = technical::progress(&payload.part_type, &payload.data.technical_fields);
    info!("Technical quote saved: {} / {}", quotation_number, requirement_key);
    Ok(Json(SaveTechnicalResponse {
        success: true,
        message: "Technical quote saved".to_string(),
        progress,
    }))
}

/// 印刷用ドキュメントを生成してデータディレクトリへ保存する
pub async fn create_document(
    State(state): State<AppState>,
    Path(quotation_number): Path<String>,
) -> HandlerResult<DocumentResponse> {
    let project = fetch_project_by_number(&state, &quotation_number).await?;
    let requirements =
        RequirementList::from_json(project.requirements_data.as_deref().unwrap_or("[]"));
    let rows = fetch_rows(&state, &quotation_number).await?;

    let mut sections = Vec::new();
    for requirement in requirements.items() {
        let key = technical::quote_key(requirement);
        let existing = saved_data(&rows, &key, &requirement.part_type).and_then(|row| {
            row.technical_data
                .as_deref()
                .and_then(|json| serde_json::from_str(json).ok())
        });
        let data = TechnicalQuoteData::load(requirement, existing.as_ref());
        sections.push((requirement.part_type.clone(), data));
    }

    let html = render::technical_document_html(
        &quotation_number,
        &project.customer_name,
        &sections,
    );
    let (filename, path) = render::write_document(&state.config.data_dir, "technical", &html)
        .await
        .map_err(AppError::Storage)?;

    info!("Technical document created: {}", filename);
    Ok(Json(DocumentResponse {
        success: true,
        filename,
        filepath: path.to_string_lossy().to_string(),
    }))
}
