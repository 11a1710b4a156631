//! プロジェクトハンドラ
//! 見積番号 1 つにつきプロジェクト 1 件。顧客要求は JSON のまま
//! requirements_data 列に保持する。

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db;
use crate::error::{error_response, AppError, HandlerResult};
use crate::models::{AckResponse, CustomerSuggestion, Project, ProjectData};
use crate::requirements::{Requirement, RequirementList};
use crate::AppState;

const QUOTE_STATUSES: [&str; 4] = ["Budgetary", "Active", "Won", "Lost"];

// ========================================
// リクエスト / レスポンス型
// ========================================

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub quotation_number: String,
    pub customer_name: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub success: bool,
    pub project: ProjectData,
}

#[derive(Deserialize)]
pub struct ProjectListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub search: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

#[derive(Serialize)]
pub struct ProjectListResponse {
    pub success: bool,
    pub projects: Vec<ProjectData>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub quote_status: String,
}

#[derive(Deserialize)]
pub struct RequirementsRequest {
    pub requirements: Vec<Requirement>,
}

#[derive(Serialize)]
pub struct CheckResponse {
    pub success: bool,
    pub exists: bool,
}

#[derive(Deserialize)]
pub struct CustomerSearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct CustomerSearchResponse {
    pub success: bool,
    pub customers: Vec<CustomerSuggestion>,
}

// ========================================
// ハンドラ
// ========================================

/// プロジェクト作成。見積番号は全体で一意
pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> HandlerResult<ProjectResponse> {
    let quotation_number = payload.quotation_number.trim();
    let customer_name = payload.customer_name.trim();
    if quotation_number.is_empty() {
        return Err(AppError::validation("Quotation number is required").into());
    }
    if customer_name.is_empty() {
        return Err(AppError::validation("Customer name is required").into());
    }

    let exists: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM projects WHERE quotation_number = ?")
            .bind(quotation_number)
            .fetch_optional(&state.db)
            .await
            .map_err(AppError::Backend)?;
    if exists.is_some() {
        return Err(AppError::validation("Quotation number already exists").into());
    }

    let now = db::now_ms();
    let initial_requirements = RequirementList::new()
        .to_json()
        .unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        r#"
        INSERT INTO projects (quotation_number, customer_name, requirements_data, quote_status, created_at_ms, updated_at_ms)
        VALUES (?, ?, ?, 'Budgetary', ?, ?)
        "#,
    )
    .bind(quotation_number)
    .bind(customer_name)
    .bind(&initial_requirements)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await
    .map_err(AppError::Backend)?;

    // 顧客マスタにも登録（既存なら無視）
    sqlx::query("INSERT OR IGNORE INTO customers (name, created_at_ms) VALUES (?, ?)")
        .bind(customer_name)
        .bind(now)
        .execute(&state.db)
        .await
        .map_err(AppError::Backend)?;

    let project: Project = sqlx::query_as("SELECT * FROM projects WHERE quotation_number = ?")
        .bind(quotation_number)
        .fetch_one(&state.db)
        .await
        .map_err(AppError::Backend)?;

    info!("Project created: {}", quotation_number);
    Ok(Json(ProjectResponse { success: true, project: ProjectData::from(&project) }))
}

/// プロジェクト一覧（ページング + 見積番号/顧客名の部分一致検索）
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> HandlerResult<ProjectListResponse> {
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, 100);
    let pattern = format!("%{}%", query.search.as_deref().unwrap_or("").trim());

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM projects WHERE quotation_number LIKE ? OR customer_name LIKE ?",
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_one(&state.db)
    .await
    .map_err(AppError::Backend)?;

    let rows: Vec<Project> = sqlx::query_as(
        r#"
        SELECT * FROM projects
        WHERE quotation_number LIKE ? OR customer_name LIKE ?
        ORDER BY updated_at_ms DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(page_size)
    .bind((page - 1) * page_size)
    .fetch_all(&state.db)
    .await
    .map_err(AppError::Backend)?;

    Ok(Json(ProjectListResponse {
        success: true,
        projects: rows.iter().map(ProjectData::from).collect(),
        total,
        page,
        page_size,
    }))
}

/// プロジェクト詳細
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<ProjectResponse> {
    let project = fetch_project(&state, id).await?;
    Ok(Json(ProjectResponse { success: true, project: ProjectData::from(&project) }))
}

/// プロジェクト削除。付随する商用/技術見積も消す
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<AckResponse> {
    let project = fetch_project(&state, id).await?;

    sqlx::query("DELETE FROM commercial_quotations WHERE quotation_number = ?")
        .bind(&project.quotation_number)
        .execute(&state.db)
        .await
        .map_err(AppError::Backend)?;
    sqlx::query("DELETE FROM technical_quotations WHERE quotation_number = ?")
        .bind(&project.quotation_number)
        .execute(&state.db)
        .await
        .map_err(AppError::Backend)?;
    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(AppError::Backend)?;

    info!("Project deleted: {}", project.quotation_number);
    Ok(Json(AckResponse::ok("Project deleted")))
}

/// 見積ステータス更新
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusRequest>,
) -> HandlerResult<AckResponse> {
    if !QUOTE_STATUSES.contains(&payload.quote_status.as_str()) {
        return Err(AppError::validation("Invalid quote status").into());
    }
    let result = sqlx::query("UPDATE projects SET quote_status = ?, updated_at_ms = ? WHERE id = ?")
        .bind(&payload.quote_status)
        .bind(db::now_ms())
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(AppError::Backend)?;
    if result.rows_affected() == 0 {
        return Err(error_response(StatusCode::NOT_FOUND, "Project not found".to_string()));
    }
    Ok(Json(AckResponse::ok("Status updated")))
}

/// 顧客要求の保存。id は位置から振り直して正規化してから永続化する
pub async fn save_requirements(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RequirementsRequest>,
) -> HandlerResult<AckResponse> {
    let list = RequirementList::from_items(payload.requirements);
    let json = list
        .to_json()
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let result =
        sqlx::query("UPDATE projects SET requirements_data = ?, updated_at_ms = ? WHERE id = ?")
            .bind(&json)
            .bind(db::now_ms())
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(AppError::Backend)?;
    if result.rows_affected() == 0 {
        return Err(error_response(StatusCode::NOT_FOUND, "Project not found".to_string()));
    }
    Ok(Json(AckResponse::ok("Requirements saved")))
}

/// 見積番号の存在チェック（新規作成フォームの即時検証用）
pub async fn check_quotation(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> HandlerResult<CheckResponse> {
    let exists: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM projects WHERE quotation_number = ?")
            .bind(&number)
            .fetch_optional(&state.db)
            .await
            .map_err(AppError::Backend)?;
    Ok(Json(CheckResponse { success: true, exists: exists.is_some() }))
}

/// 顧客名サジェスト。空クエリは空の結果
pub async fn search_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerSearchQuery>,
) -> HandlerResult<CustomerSearchResponse> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(CustomerSearchResponse { success: true, customers: Vec::new() }));
    }

    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM customers WHERE name LIKE ? ORDER BY name LIMIT 10")
            .bind(format!("%{}%", q))
            .fetch_all(&state.db)
            .await
            .map_err(AppError::Backend)?;

    Ok(Json(CustomerSearchResponse {
        success: true,
        customers: rows
            .into_iter()
            .map(|(id, name)| CustomerSuggestion { id, name })
            .collect(),
    }))
}

pub(crate) async fn fetch_project(state: &AppState, id: i64) -> Result<Project, (StatusCode, Json<crate::error::ErrorResponse>)> {
    let project: Option<Project> = sqlx::query_as("SELECT * FROM projects WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(AppError::Backend)?;
    project.ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Project not found".to_string()))
}

/// 見積番号からプロジェクトを引く（商用/技術見積ハンドラ共用）
pub(crate) async fn fetch_project_by_number(
    state: &AppState,
    quotation_number: &str,
) -> Result<Project, (StatusCode, Json<crate::error::ErrorResponse>)> {
    let project: Option<Project> =
        sqlx::query_as("SELECT * FROM projects WHERE quotation_number = ?")
            .bind(quotation_number)
            .fetch_optional(&state.db)
            .await
            .map_err(AppError::Backend)?;
    project.ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Project not found".to_string()))
}
