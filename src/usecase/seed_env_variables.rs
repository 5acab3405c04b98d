use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::entity::env_variable::EnvVariable;
use crate::domain::repository::{is_store_timeout, EnvVariableRepository};
use crate::domain::service::EnvVariableDomainService;
use crate::infrastructure::config::ManagedVariable;
use crate::infrastructure::env_file::{self, EnvFileError};

/// SeedEnvVariablesError は初期投入に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum SeedEnvVariablesError {
    #[error(transparent)]
    EnvFile(#[from] EnvFileError),

    #[error("store timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for SeedEnvVariablesError {
    fn from(e: anyhow::Error) -> Self {
        if is_store_timeout(&e) {
            Self::Timeout(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

/// SeedResult は各入力元から新規に登録した件数を表す。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SeedResult {
    pub from_env_file: usize,
    pub managed: usize,
}

/// SeedEnvVariablesUseCase は .env ファイルと管理対象のデフォルト値から
/// ストアに未登録の key だけを登録するユースケース。既存の値は上書きしない。
pub struct SeedEnvVariablesUseCase {
    repo: Arc<dyn EnvVariableRepository>,
    env_file_path: PathBuf,
    managed: Vec<ManagedVariable>,
}

impl SeedEnvVariablesUseCase {
    pub fn new(
        repo: Arc<dyn EnvVariableRepository>,
        env_file_path: impl Into<PathBuf>,
        managed: Vec<ManagedVariable>,
    ) -> Self {
        Self {
            repo,
            env_file_path: env_file_path.into(),
            managed,
        }
    }

    pub async fn execute(&self) -> Result<SeedResult, SeedEnvVariablesError> {
        let from_env_file = self.load_from_env_file().await?;
        let managed = self.ensure_managed().await?;
        Ok(SeedResult {
            from_env_file,
            managed,
        })
    }

    /// .env ファイルから未登録の key を登録する。空の値は無視する。
    pub async fn load_from_env_file(&self) -> Result<usize, SeedEnvVariablesError> {
        let vars = env_file::load(&self.env_file_path)?;

        let mut inserted = 0;
        for (key, value) in vars {
            if value.is_empty() {
                continue;
            }
            if let Err(e) = EnvVariableDomainService::validate_env_key(&key) {
                warn!(key = %key, error = %e, "env file key skipped");
                continue;
            }
            if self
                .repo
                .create_if_absent(&EnvVariable::new(key, value, None))
                .await?
            {
                inserted += 1;
            }
        }

        info!(
            path = %self.env_file_path.display(),
            inserted,
            "environment variables loaded from env file"
        );
        Ok(inserted)
    }

    /// 管理対象の key が無ければデフォルト値で登録する。
    pub async fn ensure_managed(&self) -> Result<usize, SeedEnvVariablesError> {
        let mut inserted = 0;
        for managed in &self.managed {
            if let Err(e) = EnvVariableDomainService::validate_env_key(&managed.key) {
                warn!(key = %managed.key, error = %e, "managed runtime key skipped");
                continue;
            }
            let entry = EnvVariable::new(
                managed.key.clone(),
                managed.default.clone(),
                managed.description.clone(),
            );
            if self.repo.create_if_absent(&entry).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
