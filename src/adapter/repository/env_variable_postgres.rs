use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::entity::env_variable::{EnvVariable, EnvVariablePatch};
use crate::domain::repository::EnvVariableRepository;

/// EnvVariablePostgresRepository は EnvVariableRepository の PostgreSQL 実装。
/// 挿入順は seq (BIGSERIAL) 列で保持する。
pub struct EnvVariablePostgresRepository {
    pool: PgPool,
}

impl EnvVariablePostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// PostgreSQL の行から EnvVariable を構築するヘルパー。
fn row_to_env_variable(row: sqlx::postgres::PgRow) -> Result<EnvVariable, sqlx::Error> {
    Ok(EnvVariable {
        key: row.try_get("key")?,
        value: row.try_get("value")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl EnvVariableRepository for EnvVariablePostgresRepository {
    async fn find_by_key(&self, key: &str) -> anyhow::Result<Option<EnvVariable>> {
        let row = sqlx::query(
            r#"
            SELECT key, value, description, created_at, updated_at
            FROM env_variables
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_env_variable(row)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> anyhow::Result<Vec<EnvVariable>> {
        let rows = sqlx::query(
            r#"
            SELECT key, value, description, created_at, updated_at
            FROM env_variables
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(row_to_env_variable)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    async fn update(
        &self,
        key: &str,
        patch: &EnvVariablePatch,
    ) -> anyhow::Result<Option<EnvVariable>> {
        // 単一の UPDATE ... RETURNING で行ロックを取り、同一 key への更新を直列化する。
        // updated_at は時計が進んでいなくても直前の値より 1 マイクロ秒以上大きくする。
        let row = sqlx::query(
            r#"
            UPDATE env_variables
            SET value = COALESCE($1, value),
                description = COALESCE($2, description),
                updated_at = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')
            WHERE key = $3
            RETURNING key, value, description, created_at, updated_at
            "#,
        )
        .bind(&patch.value)
        .bind(&patch.description)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_env_variable(row)?)),
            None => Ok(None),
        }
    }

    async fn create_if_absent(&self, entry: &EnvVariable) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO env_variables (key, value, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.value)
        .bind(&entry.description)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
