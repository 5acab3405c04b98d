use std::sync::Arc;

use crate::domain::entity::env_variable::{EnvVariable, EnvVariablePatch};
use crate::domain::repository::{is_store_timeout, EnvVariableRepository};
use crate::domain::service::EnvVariableDomainService;

/// UpdateEnvVariableError は環境変数更新に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum UpdateEnvVariableError {
    #[error("env variable not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// UpdateEnvVariableInput は環境変数更新のリクエストを表す。
/// None のフィールドは変更しない。
#[derive(Debug, Clone)]
pub struct UpdateEnvVariableInput {
    pub key: String,
    pub value: Option<String>,
    pub description: Option<String>,
}

/// UpdateEnvVariableUseCase は環境変数更新ユースケース。
/// ストアへの書き込みが成功した後にキャッシュが invalidate される（リポジトリ側で処理）。
pub struct UpdateEnvVariableUseCase {
    repo: Arc<dyn EnvVariableRepository>,
}

impl UpdateEnvVariableUseCase {
    pub fn new(repo: Arc<dyn EnvVariableRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(
        &self,
        input: &UpdateEnvVariableInput,
    ) -> Result<EnvVariable, UpdateEnvVariableError> {
        EnvVariableDomainService::validate_key(&input.key)
            .map_err(|e| UpdateEnvVariableError::Validation(e.to_string()))?;

        let patch = EnvVariablePatch {
            value: input.value.clone(),
            description: input.description.clone(),
        };
        if patch.is_empty() {
            return Err(UpdateEnvVariableError::Validation(
                "at least one of value or description is required".to_string(),
            ));
        }

        self.repo
            .update(&input.key, &patch)
            .await
            .map_err(|e| {
                if is_store_timeout(&e) {
                    UpdateEnvVariableError::Timeout(e.to_string())
                } else {
                    UpdateEnvVariableError::Internal(e.to_string())
                }
            })?
            .ok_or_else(|| UpdateEnvVariableError::NotFound(input.key.clone()))
    }
}
