use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, Script};

use super::{CacheError, EnvVariableCache};
use crate::domain::entity::env_variable::EnvVariable;

/// 環境変数エントリのキー prefix。
const ENV_PREFIX: &str = "env:";
/// 世代カウンタと全件ミラーのキー。エントリとは prefix が異なるため衝突しない。
const GENERATION_KEY: &str = "env-meta:generation";
const SNAPSHOT_KEY: &str = "env-meta:all";
/// clear 時の SCAN 1 回あたりの走査件数の目安。
const SCAN_BATCH_SIZE: usize = 500;

/// 世代が一致する場合のみ KEYS[2..] に ARGV[3..] を書き込む。
/// KEYS[1] = 世代キー, ARGV[1] = 観測した世代, ARGV[2] = TTL(ms, 0 は無期限)
const CONDITIONAL_SET_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if current == false then current = '0' end
if current ~= ARGV[1] then return 0 end
local ttl = tonumber(ARGV[2])
for i = 2, #KEYS do
  if ttl > 0 then
    redis.call('SET', KEYS[i], ARGV[i + 1], 'PX', ttl)
  else
    redis.call('SET', KEYS[i], ARGV[i + 1])
  end
end
return 1
";

/// Redis をバックエンドとする環境変数キャッシュ。
///
/// ConnectionManager により切断時は自動で再接続する。
/// 各エントリは JSON で保存し、TTL を付与して陳腐化の上限を設ける。
#[derive(Clone)]
pub struct RedisEnvVariableCache {
    conn: ConnectionManager,
    ttl: Duration,
    conditional_set: Script,
}

impl RedisEnvVariableCache {
    /// Redis URL から RedisEnvVariableCache を作成する。
    ///
    /// # Arguments
    /// * `url` - Redis 接続 URL（例: "redis://127.0.0.1:6379/0"）
    /// * `ttl` - エントリの有効期間
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(map_redis_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self {
            conn,
            ttl,
            conditional_set: Script::new(CONDITIONAL_SET_SCRIPT),
        })
    }

    fn entry_key(key: &str) -> String {
        format!("{}{}", ENV_PREFIX, key)
    }

    fn ttl_millis(&self) -> u64 {
        u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX)
    }

    /// エントリキーを SCAN で走査しながら削除する。KEYS と異なり Redis をブロックしない。
    async fn delete_entry_keys(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", ENV_PREFIX);
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;
            if !keys.is_empty() {
                let _: () = conn.del(keys).await.map_err(map_redis_error)?;
            }
            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }

    async fn conditional_set(
        &self,
        pairs: Vec<(String, String)>,
        generation: u64,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.conditional_set.prepare_invoke();
        invocation
            .key(GENERATION_KEY)
            .arg(generation.to_string())
            .arg(self.ttl_millis());
        for (key, value) in &pairs {
            invocation.key(key).arg(value);
        }
        let applied: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(applied == 1)
    }
}

#[async_trait]
impl EnvVariableCache for RedisEnvVariableCache {
    async fn generation(&self) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        let generation: Option<u64> = conn.get(GENERATION_KEY).await.map_err(map_redis_error)?;
        Ok(generation.unwrap_or(0))
    }

    async fn get(&self, key: &str) -> Result<Option<EnvVariable>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(Self::entry_key(key))
            .await
            .map_err(map_redis_error)?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Option<Vec<EnvVariable>>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(SNAPSHOT_KEY).await.map_err(map_redis_error)?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, entry: &EnvVariable, generation: u64) -> Result<bool, CacheError> {
        let pairs = vec![(Self::entry_key(&entry.key), serde_json::to_string(entry)?)];
        self.conditional_set(pairs, generation).await
    }

    async fn put_all(&self, entries: &[EnvVariable], generation: u64) -> Result<bool, CacheError> {
        let mut pairs = Vec::with_capacity(entries.len() + 1);
        pairs.push((SNAPSHOT_KEY.to_string(), serde_json::to_string(entries)?));
        for entry in entries {
            pairs.push((Self::entry_key(&entry.key), serde_json::to_string(entry)?));
        }
        self.conditional_set(pairs, generation).await
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // 世代の更新とエントリ削除を MULTI/EXEC でまとめて適用する
        let _: () = redis::pipe()
            .atomic()
            .incr(GENERATION_KEY, 1)
            .ignore()
            .del(Self::entry_key(key))
            .ignore()
            .del(SNAPSHOT_KEY)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // 先に世代を進めるので、走査中に古い世代で書き込まれるエントリは無い
        let _: () = redis::pipe()
            .atomic()
            .incr(GENERATION_KEY, 1)
            .ignore()
            .del(SNAPSHOT_KEY)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        self.delete_entry_keys().await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

fn map_redis_error(err: RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_redis_error() {
        let err = map_redis_error(RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )));
        match err {
            CacheError::Unavailable(msg) => assert!(msg.contains("connection refused")),
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_entry_key_format() {
        assert_eq!(RedisEnvVariableCache::entry_key("FEATURE_X"), "env:FEATURE_X");
    }

    #[test]
    fn test_meta_keys_do_not_collide_with_entries() {
        assert!(!GENERATION_KEY.starts_with(ENV_PREFIX));
        assert!(!SNAPSHOT_KEY.starts_with(ENV_PREFIX));
    }
}
