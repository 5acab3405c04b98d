pub mod env_variable_handler;
pub mod error;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::adapter::repository::CachedEnvVariableRepository;
use crate::usecase::{
    GetEnvVariableUseCase, ListEnvVariablesUseCase, SeedEnvVariablesUseCase, SyncCacheUseCase,
    UpdateEnvVariableUseCase,
};

/// AppState はアプリケーション全体の共有状態を表す。
#[derive(Clone)]
pub struct AppState {
    pub list_env_variables_uc: Arc<ListEnvVariablesUseCase>,
    pub get_env_variable_uc: Arc<GetEnvVariableUseCase>,
    pub update_env_variable_uc: Arc<UpdateEnvVariableUseCase>,
    pub sync_cache_uc: Arc<SyncCacheUseCase>,
    pub seed_env_variables_uc: Arc<SeedEnvVariablesUseCase>,
    pub repo: Arc<CachedEnvVariableRepository>,
}

impl AppState {
    pub fn new(
        repo: Arc<CachedEnvVariableRepository>,
        seed_env_variables_uc: Arc<SeedEnvVariablesUseCase>,
    ) -> Self {
        Self {
            list_env_variables_uc: Arc::new(ListEnvVariablesUseCase::new(repo.clone())),
            get_env_variable_uc: Arc::new(GetEnvVariableUseCase::new(repo.clone())),
            update_env_variable_uc: Arc::new(UpdateEnvVariableUseCase::new(repo.clone())),
            sync_cache_uc: Arc::new(SyncCacheUseCase::new(repo.clone())),
            seed_env_variables_uc,
            repo,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        env_variable_handler::healthz,
        env_variable_handler::readyz,
        env_variable_handler::list_env_variables,
        env_variable_handler::get_env_variable,
        env_variable_handler::update_env_variable,
        env_variable_handler::sync_cache,
        env_variable_handler::load_env_file,
    ),
    components(schemas(
        crate::domain::entity::env_variable::EnvVariable,
        crate::domain::entity::env_variable::EnvVariableList,
        env_variable_handler::UpdateEnvVariableRequest,
        env_variable_handler::OperationResponse,
        ErrorResponse,
        ErrorBody,
        ErrorDetail,
    )),
    tags((name = "env", description = "Runtime environment variables")),
)]
pub struct ApiDoc;

/// REST API ルーターを構築する。
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health / Readiness / API docs
        .route("/healthz", get(env_variable_handler::healthz))
        .route("/readyz", get(env_variable_handler::readyz))
        .route("/api-docs/openapi.json", get(env_variable_handler::openapi_json))
        // 管理操作（固定セグメントは動的な {key} より先に定義する）
        .route("/api/env/sync/cache", post(env_variable_handler::sync_cache))
        .route("/api/env/load/env-file", post(env_variable_handler::load_env_file))
        // Env variable endpoints
        .route("/api/env", get(env_variable_handler::list_env_variables))
        .route(
            "/api/env/{key}",
            get(env_variable_handler::get_env_variable).put(env_variable_handler::update_env_variable),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 許可オリジンから CORS レイヤーを構築する。空の場合は None。
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "invalid CORS origin ignored");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods([Method::GET, Method::PUT, Method::POST, Method::OPTIONS])
            .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
            .allow_credentials(true),
    )
}

/// ErrorResponse は統一エラーレスポンス。
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
    pub details: Vec<ErrorDetail>,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorDetail {
    pub field: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self::with_details(code, message, vec![])
    }

    pub fn with_details(code: &str, message: &str, details: Vec<ErrorDetail>) -> Self {
        Self {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
                request_id: uuid::Uuid::new_v4().to_string(),
                details,
            },
        }
    }
}
