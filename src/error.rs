//! エラー分類
//! Validation = 入力不備（フィールド横に表示、致命的ではない）
//! Selection  = 行選択が前提の操作（操作中断、状態は変更しない）
//! Backend    = 永続化/外部呼び出しの失敗（ローカル状態は変更しない）
//!
//! コーデックのパース失敗はエラーにせずデフォルトへフォールバックする。

use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Selection(String),

    #[error("DB error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("{0}")]
    Storage(#[from] std::io::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn selection(msg: impl Into<String>) -> Self {
        AppError::Selection(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Selection(_) => StatusCode::BAD_REQUEST,
            AppError::Backend(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Backend(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// エラーレスポンス生成
pub fn error_response(status: StatusCode, message: String) -> (StatusCode, Json<ErrorResponse>) {
    warn!("API Error: {}", message);
    (status, Json(ErrorResponse { success: false, error: message }))
}

impl From<AppError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: AppError) -> Self {
        error_response(err.status(), err.to_string())
    }
}

pub type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;
