/// キーの最大長。env_variables.key 列の VARCHAR(255) に合わせる。
pub const MAX_KEY_LENGTH: usize = 255;

/// DomainError はドメイン層のバリデーションエラーを表す。
#[derive(Debug, PartialEq, Eq)]
pub enum DomainError {
    EmptyKey,
    KeyTooLong(usize),
    InvalidKeyCharacters(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "key is required"),
            Self::KeyTooLong(len) => write!(
                f,
                "key must be at most {} characters, got {}",
                MAX_KEY_LENGTH, len
            ),
            Self::InvalidKeyCharacters(key) => write!(
                f,
                "invalid key '{}' (only alphanumeric and underscore allowed)",
                key
            ),
        }
    }
}

impl std::error::Error for DomainError {}

/// EnvVariableDomainService は環境変数キーに関するドメインルールを提供する。
pub struct EnvVariableDomainService;

impl EnvVariableDomainService {
    /// API 経由で受け取ったキーの長さを検証する。
    pub fn validate_key(key: &str) -> Result<(), DomainError> {
        if key.is_empty() {
            return Err(DomainError::EmptyKey);
        }
        let len = key.chars().count();
        if len > MAX_KEY_LENGTH {
            return Err(DomainError::KeyTooLong(len));
        }
        Ok(())
    }

    /// .env ファイルおよびシードで使うキーの書式を検証する。
    /// 英数字とアンダースコアのみ許可する。
    pub fn validate_env_key(key: &str) -> Result<(), DomainError> {
        Self::validate_key(key)?;
        if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DomainError::InvalidKeyCharacters(key.to_string()));
        }
        Ok(())
    }
}
