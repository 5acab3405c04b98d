use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::entity::env_variable::{EnvVariable, EnvVariablePatch};
use crate::domain::repository::EnvVariableRepository;

/// InMemoryEnvVariableRepository は開発用・テスト用のインメモリ環境変数ストア。
/// DATABASE_URL も database 設定も無い場合に使用する。
pub struct InMemoryEnvVariableRepository {
    entries: RwLock<Vec<EnvVariable>>,
}

impl InMemoryEnvVariableRepository {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn with_entries(entries: Vec<EnvVariable>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl Default for InMemoryEnvVariableRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnvVariableRepository for InMemoryEnvVariableRepository {
    async fn find_by_key(&self, key: &str) -> anyhow::Result<Option<EnvVariable>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| e.key == key).cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<EnvVariable>> {
        let entries = self.entries.read().await;
        Ok(entries.clone())
    }

    async fn update(
        &self,
        key: &str,
        patch: &EnvVariablePatch,
    ) -> anyhow::Result<Option<EnvVariable>> {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.key == key) {
            Some(e) => {
                e.apply(patch, Utc::now());
                Ok(Some(e.clone()))
            }
            None => Ok(None),
        }
    }

    async fn create_if_absent(&self, entry: &EnvVariable) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.key == entry.key) {
            return Ok(false);
        }
        entries.push(entry.clone());
        Ok(true)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let repo = InMemoryEnvVariableRepository::default();
        let all = tokio_test::block_on(repo.list_all()).unwrap();
        assert!(all.is_empty());
        tokio_test::assert_ok!(tokio_test::block_on(repo.ping()));
    }

    #[tokio::test]
    async fn test_create_if_absent_keeps_existing() {
        let repo = InMemoryEnvVariableRepository::new();
        let first = EnvVariable::new("FEATURE_X", "off", None);
        let second = EnvVariable::new("FEATURE_X", "on", None);

        assert!(repo.create_if_absent(&first).await.unwrap());
        assert!(!repo.create_if_absent(&second).await.unwrap());

        let found = repo.find_by_key("FEATURE_X").await.unwrap().unwrap();
        assert_eq!(found.value, "off");
    }

    #[tokio::test]
    async fn test_list_all_in_insertion_order() {
        let repo = InMemoryEnvVariableRepository::new();
        for key in ["ZETA", "ALPHA", "MID"] {
            repo.create_if_absent(&EnvVariable::new(key, "v", None))
                .await
                .unwrap();
        }

        let keys: Vec<String> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["ZETA", "ALPHA", "MID"]);
    }

    #[tokio::test]
    async fn test_update_partial_patch() {
        let repo = InMemoryEnvVariableRepository::with_entries(vec![EnvVariable::new(
            "FEATURE_X",
            "off",
            Some("toggle".to_string()),
        )]);
        let before = repo.find_by_key("FEATURE_X").await.unwrap().unwrap();

        let updated = repo
            .update(
                "FEATURE_X",
                &EnvVariablePatch {
                    value: Some("on".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.value, "on");
        assert_eq!(updated.description.as_deref(), Some("toggle"));
        assert!(updated.updated_at > before.updated_at);
        assert_eq!(updated.created_at, before.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let repo = InMemoryEnvVariableRepository::new();
        let result = repo
            .update("missing-key", &EnvVariablePatch::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
