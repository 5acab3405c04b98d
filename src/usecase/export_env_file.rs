use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::repository::{is_store_timeout, EnvVariableRepository};
use crate::infrastructure::env_file::{self, EnvFileError};

/// ExportEnvFileError は .env ファイルへの書き出しに関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum ExportEnvFileError {
    #[error(transparent)]
    EnvFile(#[from] EnvFileError),

    #[error("store timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// ExportResult は書き出し結果を表す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub count: usize,
    pub backup: Option<PathBuf>,
}

/// ExportEnvFileUseCase はストアの全件を .env ファイルへ書き出すユースケース。
/// 終了処理から呼ばれる。
pub struct ExportEnvFileUseCase {
    repo: Arc<dyn EnvVariableRepository>,
    path: PathBuf,
    backup: bool,
}

impl ExportEnvFileUseCase {
    pub fn new(repo: Arc<dyn EnvVariableRepository>, path: impl Into<PathBuf>, backup: bool) -> Self {
        Self {
            repo,
            path: path.into(),
            backup,
        }
    }

    /// ストアが空の場合は既存ファイルを残したまま何もしない。
    pub async fn execute(&self) -> Result<ExportResult, ExportEnvFileError> {
        let entries = self.repo.list_all().await.map_err(|e| {
            if is_store_timeout(&e) {
                ExportEnvFileError::Timeout(e.to_string())
            } else {
                ExportEnvFileError::Internal(e.to_string())
            }
        })?;

        if entries.is_empty() {
            return Ok(ExportResult {
                count: 0,
                backup: None,
            });
        }

        let vars: BTreeMap<String, String> = entries
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect();
        let backup = env_file::export(&self.path, &vars, self.backup)?;

        Ok(ExportResult {
            count: vars.len(),
            backup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::repository::env_variable_memory::InMemoryEnvVariableRepository;
    use crate::domain::entity::env_variable::EnvVariable;
    use crate::domain::repository::env_variable_repository::MockEnvVariableRepository;

    #[tokio::test]
    async fn test_export_writes_sorted_file_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "OLD=1\n").unwrap();

        let repo = Arc::new(InMemoryEnvVariableRepository::with_entries(vec![
            EnvVariable::new("ZETA", "z", None),
            EnvVariable::new("ALPHA", "a b", None),
        ]));
        let uc = ExportEnvFileUseCase::new(repo, &path, true);

        let result = uc.execute().await.unwrap();

        assert_eq!(result.count, 2);
        assert!(result.backup.is_some());
        let written = std::fs::read_to_string(&path).unwrap();
        let alpha = written.find("ALPHA=\"a b\"").unwrap();
        let zeta = written.find("ZETA=z").unwrap();
        assert!(alpha < zeta);
    }

    #[tokio::test]
    async fn test_export_empty_store_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "OLD=1\n").unwrap();

        let uc = ExportEnvFileUseCase::new(Arc::new(InMemoryEnvVariableRepository::new()), &path, true);
        let result = uc.execute().await.unwrap();

        assert_eq!(result.count, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "OLD=1\n");
    }

    #[tokio::test]
    async fn test_export_store_error() {
        let mut mock = MockEnvVariableRepository::new();
        mock.expect_list_all()
            .returning(|| Err(anyhow::anyhow!("connection refused")));

        let uc = ExportEnvFileUseCase::new(Arc::new(mock), "unused.env", false);
        assert!(matches!(
            uc.execute().await.unwrap_err(),
            ExportEnvFileError::Internal(_)
        ));
    }
}
