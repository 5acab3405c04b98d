use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ErrorResponse;
use crate::usecase::get_env_variable::GetEnvVariableError;
use crate::usecase::list_env_variables::ListEnvVariablesError;
use crate::usecase::seed_env_variables::SeedEnvVariablesError;
use crate::usecase::sync_cache::SyncCacheError;
use crate::usecase::update_env_variable::UpdateEnvVariableError;

fn not_found(key: &str) -> Response {
    let err = ErrorResponse::new(
        "ENV_KEY_NOT_FOUND",
        &format!("指定された環境変数が見つかりません: {}", key),
    );
    (StatusCode::NOT_FOUND, Json(err)).into_response()
}

fn validation(msg: &str) -> Response {
    let err = ErrorResponse::new("ENV_VALIDATION_FAILED", msg);
    (StatusCode::BAD_REQUEST, Json(err)).into_response()
}

fn timeout(msg: &str) -> Response {
    tracing::warn!(error = %msg, "store timeout");
    let err = ErrorResponse::new("ENV_STORE_TIMEOUT", msg);
    (StatusCode::GATEWAY_TIMEOUT, Json(err)).into_response()
}

fn internal(msg: &str) -> Response {
    tracing::error!(error = %msg, "internal error");
    let err = ErrorResponse::new("ENV_INTERNAL_ERROR", msg);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response()
}

/// ListEnvVariablesError を HTTP レスポンスに変換する。
impl IntoResponse for ListEnvVariablesError {
    fn into_response(self) -> Response {
        match self {
            ListEnvVariablesError::Timeout(msg) => timeout(&msg),
            ListEnvVariablesError::Internal(msg) => internal(&msg),
        }
    }
}

/// GetEnvVariableError を HTTP レスポンスに変換する。
impl IntoResponse for GetEnvVariableError {
    fn into_response(self) -> Response {
        match self {
            GetEnvVariableError::NotFound(key) => not_found(&key),
            GetEnvVariableError::Validation(msg) => validation(&msg),
            GetEnvVariableError::Timeout(msg) => timeout(&msg),
            GetEnvVariableError::Internal(msg) => internal(&msg),
        }
    }
}

/// UpdateEnvVariableError を HTTP レスポンスに変換する。
impl IntoResponse for UpdateEnvVariableError {
    fn into_response(self) -> Response {
        match self {
            UpdateEnvVariableError::NotFound(key) => not_found(&key),
            UpdateEnvVariableError::Validation(msg) => validation(&msg),
            UpdateEnvVariableError::Timeout(msg) => timeout(&msg),
            UpdateEnvVariableError::Internal(msg) => internal(&msg),
        }
    }
}

/// SyncCacheError を HTTP レスポンスに変換する。
impl IntoResponse for SyncCacheError {
    fn into_response(self) -> Response {
        match self {
            SyncCacheError::CacheUnavailable(msg) => {
                tracing::warn!(error = %msg, "cache sync failed");
                let err = ErrorResponse::new("ENV_CACHE_UNAVAILABLE", &msg);
                (StatusCode::SERVICE_UNAVAILABLE, Json(err)).into_response()
            }
            SyncCacheError::Timeout(msg) => timeout(&msg),
            SyncCacheError::Internal(msg) => internal(&msg),
        }
    }
}

/// SeedEnvVariablesError を HTTP レスポンスに変換する。
impl IntoResponse for SeedEnvVariablesError {
    fn into_response(self) -> Response {
        match self {
            SeedEnvVariablesError::Timeout(msg) => timeout(&msg),
            e => internal(&e.to_string()),
        }
    }
}

/// JSON ボディの解析失敗を 400 に変換する。
pub fn json_rejection(rejection: JsonRejection) -> Response {
    validation(&rejection.body_text())
}
