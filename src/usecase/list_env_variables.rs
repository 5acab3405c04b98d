use std::sync::Arc;

use crate::domain::entity::env_variable::EnvVariableList;
use crate::domain::repository::{is_store_timeout, EnvVariableRepository};

/// ListEnvVariablesError は環境変数一覧取得に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum ListEnvVariablesError {
    #[error("store timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// ListEnvVariablesUseCase は環境変数一覧取得ユースケース。
pub struct ListEnvVariablesUseCase {
    repo: Arc<dyn EnvVariableRepository>,
}

impl ListEnvVariablesUseCase {
    pub fn new(repo: Arc<dyn EnvVariableRepository>) -> Self {
        Self { repo }
    }

    /// 全件を挿入順で取得する。部分的な結果は返さない。
    pub async fn execute(&self) -> Result<EnvVariableList, ListEnvVariablesError> {
        let items = self.repo.list_all().await.map_err(|e| {
            if is_store_timeout(&e) {
                ListEnvVariablesError::Timeout(e.to_string())
            } else {
                ListEnvVariablesError::Internal(e.to_string())
            }
        })?;
        Ok(EnvVariableList::from(items))
    }
}
