//! 分析ハンドラ
//! projects と commercial_quotations を結合して取得し、analytics モジュール
//! の純関数で各ビューの形に畳み込む。製品タイプはプロジェクト先頭要求の
//! 部品タイプから導出する（無ければ "Unknown"）。

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::DocumentResponse;
use crate::analytics::{self, AnalyticsFilters, QuoteRecord};
use crate::error::{error_response, AppError, HandlerResult};
use crate::requirements::Requirement;
use crate::AppState;

// ========================================
// レコード取得
// ========================================

fn product_type_of(requirements_data: Option<&str>) -> String {
    let parsed: Vec<Requirement> =
        serde_json::from_str(requirements_data.unwrap_or("[]")).unwrap_or_default();
    parsed
        .first()
        .map(|r| r.part_type.clone())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

async fn fetch_records(state: &AppState) -> Result<Vec<QuoteRecord>, AppError> {
    let rows: Vec<(String, String, String, Option<String>, i64, Option<f64>)> = sqlx::query_as(
        r#"
        SELECT p.quotation_number, p.customer_name, p.quote_status,
               p.requirements_data, p.created_at_ms, c.total_amount
        FROM projects p
        LEFT JOIN commercial_quotations c ON c.quotation_number = p.quotation_number
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(number, customer, status, requirements, created_at_ms, total)| QuoteRecord {
            quotation_number: number,
            customer_name: customer,
            quote_status: status,
            product_type: product_type_of(requirements.as_deref()),
            total_amount: total.unwrap_or(0.0),
            created_at_ms,
        })
        .collect())
}

async fn filtered_records(
    state: &AppState,
    filters: &AnalyticsFilters,
) -> Result<Vec<QuoteRecord>, AppError> {
    let records = fetch_records(state).await?;
    let today = chrono::Utc::now().date_naive();
    Ok(analytics::apply_filters(&records, filters, today))
}

// ========================================
// ビュー
// ========================================

/// 製品ビュー
pub async fn product_view(
    State(state): State<AppState>,
    Query(filters): Query<AnalyticsFilters>,
) -> HandlerResult<serde_json::Value> {
    let records = filtered_records(&state, &filters).await?;
    let summary = analytics::product_summary(&records);
    Ok(Json(json!({ "success": true, "data": summary })))
}

/// 財務ビュー
pub async fn finance_view(
    State(state): State<AppState>,
    Query(filters): Query<AnalyticsFilters>,
) -> HandlerResult<serde_json::Value> {
    let records = filtered_records(&state, &filters).await?;
    let summary = analytics::finance_summary(&records);
    Ok(Json(json!({ "success": true, "data": summary })))
}

/// 顧客ビュー
pub async fn customer_view(
    State(state): State<AppState>,
    Query(filters): Query<AnalyticsFilters>,
) -> HandlerResult<serde_json::Value> {
    let records = filtered_records(&state, &filters).await?;
    let summary = analytics::customer_summary(&records);
    Ok(Json(json!({ "success": true, "data": summary })))
}

/// 横断ビュー（見出し KPI のみ）
pub async fn combined_view(
    State(state): State<AppState>,
    Query(filters): Query<AnalyticsFilters>,
) -> HandlerResult<serde_json::Value> {
    let records = filtered_records(&state, &filters).await?;
    let kpis = analytics::combined_summary(&records);
    Ok(Json(json!({ "success": true, "kpis": kpis })))
}

// ========================================
// エクスポート
// ========================================

#[derive(Deserialize)]
pub struct ExportQuery {
    /// csv | json
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(flatten)]
    pub filters: AnalyticsFilters,
}

fn default_format() -> String {
    "csv".to_string()
}

/// フィルタ適用済みレコードをファイルに書き出す
pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> HandlerResult<DocumentResponse> {
    let records = filtered_records(&state, &query.filters).await?;

    let (extension, body) = match query.format.as_str() {
        "csv" => ("csv", analytics::to_csv(&records)),
        "json" => {
            let rows: Vec<serde_json::Value> = records
                .iter()
                .map(|r| {
                    json!({
                        "quotation_number": r.quotation_number,
                        "customer_name": r.customer_name,
                        "quote_status": r.quote_status,
                        "product_type": r.product_type,
                        "total_amount": r.total_amount,
                        "created": crate::models::format_date(r.created_at_ms),
                    })
                })
                .collect();
            let body = serde_json::to_string_pretty(&rows)
                .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            ("json", body)
        }
        other => {
            return Err(AppError::validation(format!("Unsupported format: {}", other)).into());
        }
    };

    tokio::fs::create_dir_all(&state.config.data_dir)
        .await
        .map_err(AppError::Storage)?;
    let filename = format!("quotes_export_{}.{}", uuid::Uuid::new_v4(), extension);
    let path = state.config.data_dir.join(&filename);
    tokio::fs::write(&path, body).await.map_err(AppError::Storage)?;

    info!("Analytics export created: {}", filename);
    Ok(Json(DocumentResponse {
        success: true,
        filename,
        filepath: path.to_string_lossy().to_string(),
    }))
}
