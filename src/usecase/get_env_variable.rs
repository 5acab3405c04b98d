use std::sync::Arc;

use crate::domain::entity::env_variable::EnvVariable;
use crate::domain::repository::{is_store_timeout, EnvVariableRepository};
use crate::domain::service::EnvVariableDomainService;

/// GetEnvVariableError は環境変数取得に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum GetEnvVariableError {
    #[error("env variable not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// GetEnvVariableUseCase は環境変数取得ユースケース。
pub struct GetEnvVariableUseCase {
    repo: Arc<dyn EnvVariableRepository>,
}

impl GetEnvVariableUseCase {
    pub fn new(repo: Arc<dyn EnvVariableRepository>) -> Self {
        Self { repo }
    }

    /// key で環境変数を取得する。
    pub async fn execute(&self, key: &str) -> Result<EnvVariable, GetEnvVariableError> {
        EnvVariableDomainService::validate_key(key)
            .map_err(|e| GetEnvVariableError::Validation(e.to_string()))?;

        self.repo
            .find_by_key(key)
            .await
            .map_err(|e| {
                if is_store_timeout(&e) {
                    GetEnvVariableError::Timeout(e.to_string())
                } else {
                    GetEnvVariableError::Internal(e.to_string())
                }
            })?
            .ok_or_else(|| GetEnvVariableError::NotFound(key.to_string()))
    }
}
