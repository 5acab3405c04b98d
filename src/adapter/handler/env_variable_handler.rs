use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::OpenApi;

use super::error::json_rejection;
use super::{ApiDoc, AppState, ErrorResponse};
use crate::domain::entity::env_variable::{EnvVariable, EnvVariableList};
use crate::domain::repository::EnvVariableRepository;
use crate::usecase::get_env_variable::GetEnvVariableError;
use crate::usecase::list_env_variables::ListEnvVariablesError;
use crate::usecase::seed_env_variables::SeedEnvVariablesError;
use crate::usecase::sync_cache::SyncCacheError;
use crate::usecase::update_env_variable::UpdateEnvVariableInput;

/// PUT /api/env/{key} のリクエストボディ。
/// description: null は省略と同じ扱い（変更しない）。
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateEnvVariableRequest {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// 管理操作のレスポンス。
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OperationResponse {
    pub message: String,
    pub count: usize,
}

#[utoipa::path(get, path = "/healthz", responses((status = 200, description = "Health check OK")))]
pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Ready"),
        (status = 503, description = "Database unreachable"),
    )
)]
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.repo.ping().await.is_ok();
    // キャッシュ障害時もストア直読みで応答できるため degraded 扱い
    let cache_ok = state.repo.cache_healthy().await;

    let status = if db_ok { "ready" } else { "not_ready" };
    let code = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "checks": {
                "database": if db_ok { "ok" } else { "error" },
                "cache": if cache_ok { "ok" } else { "degraded" },
            }
        })),
    )
}

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    get,
    path = "/api/env",
    tag = "env",
    responses(
        (status = 200, description = "All environment variables", body = EnvVariableList),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
        (status = 504, description = "Store timeout", body = ErrorResponse),
    )
)]
pub async fn list_env_variables(
    State(state): State<AppState>,
) -> Result<Json<EnvVariableList>, ListEnvVariablesError> {
    let list = state.list_env_variables_uc.execute().await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/api/env/{key}",
    tag = "env",
    params(("key" = String, Path, description = "Environment variable key")),
    responses(
        (status = 200, description = "Environment variable found", body = EnvVariable),
        (status = 404, description = "Key not found", body = ErrorResponse),
    )
)]
pub async fn get_env_variable(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EnvVariable>, GetEnvVariableError> {
    let entry = state.get_env_variable_uc.execute(&key).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    put,
    path = "/api/env/{key}",
    tag = "env",
    params(("key" = String, Path, description = "Environment variable key")),
    request_body = UpdateEnvVariableRequest,
    responses(
        (status = 200, description = "Updated", body = EnvVariable),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Key not found", body = ErrorResponse),
        (status = 504, description = "Store timeout", body = ErrorResponse),
    )
)]
pub async fn update_env_variable(
    State(state): State<AppState>,
    Path(key): Path<String>,
    payload: Result<Json<UpdateEnvVariableRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(rejection),
    };

    let input = UpdateEnvVariableInput {
        key,
        value: req.value,
        description: req.description,
    };

    match state.update_env_variable_uc.execute(&input).await {
        Ok(entry) => {
            tracing::info!(key = %entry.key, "env variable updated");
            (StatusCode::OK, Json(entry)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/env/sync/cache",
    tag = "env",
    responses(
        (status = 200, description = "Cache rebuilt from store", body = OperationResponse),
        (status = 503, description = "Cache unavailable", body = ErrorResponse),
    )
)]
pub async fn sync_cache(
    State(state): State<AppState>,
) -> Result<Json<OperationResponse>, SyncCacheError> {
    let count = state.sync_cache_uc.execute().await?;
    Ok(Json(OperationResponse {
        message: "cache synchronized from store".to_string(),
        count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/env/load/env-file",
    tag = "env",
    responses(
        (status = 200, description = "Missing keys loaded from env file", body = OperationResponse),
        (status = 500, description = "Load failed", body = ErrorResponse),
    )
)]
pub async fn load_env_file(
    State(state): State<AppState>,
) -> Result<Json<OperationResponse>, SeedEnvVariablesError> {
    let count = state.seed_env_variables_uc.load_from_env_file().await?;
    Ok(Json(OperationResponse {
        message: "environment variables loaded from env file".to_string(),
        count,
    }))
}
