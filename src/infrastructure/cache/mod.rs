//! 環境変数キャッシュ層。
//!
//! キャッシュは PostgreSQL 上の env_variables テーブルのミラーであり、書き込みは常に
//! ストアを先に確定させてからキャッシュを invalidate する。読み込み側はストアを読む前に
//! `generation()` を取得し、その世代のまま変化していない場合にだけ `put` / `put_all` が反映される。
//! これにより、読み込み中に発生した更新の古い値がキャッシュに書き戻されることはない。

pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::domain::entity::env_variable::EnvVariable;

pub use memory::InMemoryEnvVariableCache;
pub use self::redis::RedisEnvVariableCache;

/// CacheError はキャッシュ操作の失敗を表す。
/// 呼び出し側はキャッシュを迂回してストアを直接参照する。
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation timed out")]
    Timeout,

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// EnvVariableCache は環境変数キャッシュのトレイト。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnvVariableCache: Send + Sync {
    /// 現在のキャッシュ世代を返す。invalidate / clear のたびに増加する。
    async fn generation(&self) -> Result<u64, CacheError>;

    /// key に対応するエントリを取得する。キャッシュミスの場合は None。
    async fn get(&self, key: &str) -> Result<Option<EnvVariable>, CacheError>;

    /// 全件ミラーが揃っている場合のみ挿入順の一覧を返す。
    async fn list_all(&self) -> Result<Option<Vec<EnvVariable>>, CacheError>;

    /// 世代が一致する場合のみエントリを格納する。格納した場合は true。
    async fn put(&self, entry: &EnvVariable, generation: u64) -> Result<bool, CacheError>;

    /// 世代が一致する場合のみ全件ミラーを格納する。格納した場合は true。
    async fn put_all(&self, entries: &[EnvVariable], generation: u64) -> Result<bool, CacheError>;

    /// key のエントリと全件ミラーを破棄し、世代を進める。
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// すべてのエントリを破棄し、世代を進める。
    async fn clear(&self) -> Result<(), CacheError>;

    /// キャッシュへの疎通を確認する。
    async fn ping(&self) -> Result<(), CacheError>;
}
