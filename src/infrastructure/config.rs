use serde::Deserialize;

use super::database::DatabaseConfig;

/// Config はアプリケーション全体の設定を表す。
#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub env_file: EnvFileConfig,
    #[serde(default)]
    pub runtime_env: RuntimeEnvConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// AppConfig はアプリケーション基本設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

/// ServerConfig はサーバー設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS で許可するオリジン。空の場合は CORS ヘッダーを付与しない。
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// CacheBackend はキャッシュの実装を選択する。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

/// CacheConfig はキャッシュ層の設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_cache_max_capacity")]
    pub max_capacity: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_cache_max_capacity() -> u64 {
    10_000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_timeout_ms() -> u64 {
    500
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            max_capacity: default_cache_max_capacity(),
            ttl_secs: default_cache_ttl_secs(),
            timeout_ms: default_cache_timeout_ms(),
            redis_url: None,
        }
    }
}

/// StoreConfig は永続ストア呼び出しのタイムアウトとリトライ設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_read_retries() -> u32 {
    1
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_store_timeout_ms(),
            read_retries: default_read_retries(),
        }
    }
}

/// ReconcileConfig はキャッシュ整合性回復タスクの設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
}

fn default_reconcile_interval_secs() -> u64 {
    60
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_reconcile_interval_secs(),
        }
    }
}

/// EnvFileConfig は起動時の .env 読み込みと終了時のエクスポート設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct EnvFileConfig {
    #[serde(default = "default_env_file_path")]
    pub path: String,
    #[serde(default = "default_true")]
    pub load_on_startup: bool,
    #[serde(default = "default_true")]
    pub export_on_shutdown: bool,
    #[serde(default = "default_true")]
    pub backup: bool,
}

fn default_env_file_path() -> String {
    ".env".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EnvFileConfig {
    fn default() -> Self {
        Self {
            path: default_env_file_path(),
            load_on_startup: true,
            export_on_shutdown: true,
            backup: true,
        }
    }
}

/// ManagedVariable は起動時に必ず存在させる実行時環境変数を表す。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagedVariable {
    pub key: String,
    pub default: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// RuntimeEnvConfig は管理対象の実行時環境変数の一覧を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeEnvConfig {
    #[serde(default = "default_managed")]
    pub managed: Vec<ManagedVariable>,
}

fn default_managed() -> Vec<ManagedVariable> {
    vec![
        ManagedVariable {
            key: "CORS_ORIGINS".to_string(),
            default: "http://localhost:3000".to_string(),
            description: Some("Comma separated list of origins allowed for CORS".to_string()),
        },
        ManagedVariable {
            key: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
            default: "30".to_string(),
            description: Some("Access token expiration (minutes)".to_string()),
        },
    ]
}

impl Default for RuntimeEnvConfig {
    fn default() -> Self {
        Self {
            managed: default_managed(),
        }
    }
}

/// LogConfig はログ出力形式を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// "json" または "text"。
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

impl Config {
    /// YAML ファイルから設定を読み込む。
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// 設定ファイルパスから設定を読み込む。
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 環境変数による上書きを適用する。
    /// DATABASE_URL は main で直接参照するため、ここでは REDIS_URL のみ扱う。
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("REDIS_URL") {
            if !url.is_empty() {
                self.cache.redis_url = Some(url);
                self.cache.backend = CacheBackend::Redis;
            }
        }
    }
}
