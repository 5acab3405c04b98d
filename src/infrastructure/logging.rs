use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// 環境ごとのデフォルトログレベル。
pub fn default_level(env: &str) -> &'static str {
    match env {
        "dev" => "debug",
        "staging" => "info",
        _ => "warn",
    }
}

/// init_logger は環境に応じたログ設定でトレーシングサブスクライバーを初期化する。
/// RUST_LOG が設定されている場合はそちらを優先する。
/// format が "text" の場合はテキスト形式、それ以外は JSON 形式で出力する。
pub fn init_logger(env: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(env)));

    let registry = tracing_subscriber::registry().with(filter);

    if format == "text" {
        registry.with(fmt::layer().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().json().with_target(true))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_by_environment() {
        assert_eq!(default_level("dev"), "debug");
        assert_eq!(default_level("staging"), "info");
        assert_eq!(default_level("prod"), "warn");
        assert_eq!(default_level(""), "warn");
    }
}
