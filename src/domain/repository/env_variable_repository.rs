use async_trait::async_trait;

use crate::domain::entity::env_variable::{EnvVariable, EnvVariablePatch};

/// StoreTimeoutError はストア呼び出しがタイムアウトしたことを表す。
/// anyhow::Error に包んで返し、ユースケース層で downcast して判別する。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("store operation '{operation}' timed out after {timeout_ms}ms")]
pub struct StoreTimeoutError {
    pub operation: &'static str,
    pub timeout_ms: u64,
}

/// anyhow::Error がストアのタイムアウトかどうかを判定する。
pub fn is_store_timeout(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StoreTimeoutError>().is_some()
}

/// EnvVariableRepository は環境変数の永続化のためのリポジトリトレイト。
/// 正となるストア（PostgreSQL）と、それをキャッシュでラップした実装の両方がこのトレイトを実装する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnvVariableRepository: Send + Sync {
    /// key で環境変数を取得する。
    async fn find_by_key(&self, key: &str) -> anyhow::Result<Option<EnvVariable>>;

    /// 全件を挿入順で取得する。
    async fn list_all(&self) -> anyhow::Result<Vec<EnvVariable>>;

    /// 部分更新を適用する。key が存在しない場合は None を返す。
    /// 同一 key への更新は行単位でアトミックに直列化される。
    async fn update(
        &self,
        key: &str,
        patch: &EnvVariablePatch,
    ) -> anyhow::Result<Option<EnvVariable>>;

    /// key が未登録の場合のみ挿入する（シード用の管理操作）。
    /// 挿入した場合は true を返す。
    async fn create_if_absent(&self, entry: &EnvVariable) -> anyhow::Result<bool>;

    /// ストアへの疎通を確認する。
    async fn ping(&self) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_repository_find_by_key() {
        let mut mock = MockEnvVariableRepository::new();
        mock.expect_find_by_key()
            .withf(|key| key == "FEATURE_X")
            .returning(|_| Ok(Some(EnvVariable::new("FEATURE_X", "off", None))));

        let found = mock.find_by_key("FEATURE_X").await.unwrap();
        assert_eq!(found.unwrap().value, "off");
    }

    #[tokio::test]
    async fn test_mock_repository_update_missing_returns_none() {
        let mut mock = MockEnvVariableRepository::new();
        mock.expect_update().returning(|_, _| Ok(None));

        let patch = EnvVariablePatch {
            value: Some("on".to_string()),
            description: None,
        };
        let result = mock.update("missing-key", &patch).await.unwrap();
        assert!(result.is_none());
    }
}
