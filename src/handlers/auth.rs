//! 認証ハンドラ
//! セッションは持たない（クライアント側で保持）。パスワードは
//! ソルト付き SHA256 を "salt$hash" 形式で保存する。

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::db;
use crate::error::{error_response, AppError, HandlerResult};
use crate::models::{AckResponse, User, UserProfile};
use crate::AppState;

// ========================================
// パスワードハッシュ
// ========================================

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let salt = hex::encode(salt);
    let hash = digest(&salt, password);
    format!("{}${}", salt, hash)
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, hash)) => digest(salt, password) == hash,
        None => false,
    }
}

// ========================================
// リクエスト / レスポンス型
// ========================================

#[derive(Deserialize)]
pub struct LoginRequest {
    /// ユーザー名またはメールアドレス
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

// ========================================
// ハンドラ
// ========================================

/// ログイン
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> HandlerResult<LoginResponse> {
    let user: Option<User> = sqlx::query_as(
        "SELECT * FROM users WHERE (username = ? OR email = ?) AND is_active = 1",
    )
    .bind(&payload.username)
    .bind(&payload.username)
    .fetch_optional(&state.db)
    .await
    .map_err(AppError::Backend)?;

    let Some(user) = user else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid username or password".to_string(),
        ));
    };

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid username or password".to_string(),
        ));
    }

    info!("User logged in: {}", user.username);
    Ok(Json(LoginResponse { success: true, user: UserProfile::from(&user) }))
}

/// ユーザー登録
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> HandlerResult<AckResponse> {
    if payload.username.trim().is_empty() {
        return Err(AppError::validation("Username is required").into());
    }
    if payload.password.len() < 6 {
        return Err(AppError::validation("Password must be at least 6 characters").into());
    }
    if payload.password != payload.confirm_password {
        return Err(AppError::validation("Passwords do not match").into());
    }
    let domain_suffix = format!("@{}", state.config.email_domain);
    if !payload.email.to_lowercase().ends_with(&domain_suffix) {
        return Err(AppError::validation("Please use your company email address").into());
    }

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = ? OR email = ?")
            .bind(&payload.username)
            .bind(&payload.email)
            .fetch_optional(&state.db)
            .await
            .map_err(AppError::Backend)?;
    if existing.is_some() {
        return Err(AppError::validation("Username or email already exists").into());
    }

    sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, full_name, region, is_active, created_at_ms)
        VALUES (?, ?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(hash_password(&payload.password))
    .bind(&payload.full_name)
    .bind(&payload.region)
    .bind(db::now_ms())
    .execute(&state.db)
    .await
    .map_err(AppError::Backend)?;

    info!("User registered: {}", payload.username);
    Ok(Json(AckResponse::ok("Registration successful")))
}

/// ログアウト（サーバー側の状態は無いので記録だけ）
pub async fn logout() -> Json<AckResponse> {
    Json(AckResponse::ok("Logged out"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trip_verifies() {
        let stored = hash_password("secret123");
        assert!(verify_password("secret123", &stored));
        assert!(!verify_password("secret124", &stored));
    }

    #[test]
    fn hashes_are_salted_per_call() {
        assert_ne!(hash_password("secret123"), hash_password("secret123"));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("anything", "no-dollar-separator"));
    }
}
