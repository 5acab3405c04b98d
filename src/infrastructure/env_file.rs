//! .env ファイルの読み込みと書き出し。
//!
//! 起動時は .env からストアに未登録の key だけを取り込み、終了時はストアの全件を
//! .env に書き戻す。既存ファイルは `<path>.backup.<YYYYmmdd_HHMMSS>` に退避する。
//! 読み込みの構文 (クォート、複数行の値、行末コメント、変数展開) は dotenvy に従う。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use tracing::{info, warn};

/// EnvFileError は .env ファイル操作のエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum EnvFileError {
    #[error("failed to read env file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("failed to write env file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 裸のままでは dotenv 構文として読み戻せない文字。
const QUOTE_TRIGGERS: [char; 7] = [' ', '\t', '$', '#', '"', '\'', '\\'];

/// 値を dotenv 構文で読み戻せる形に変換する。
///
/// シングルクォート内は展開もエスケープも行われないため、`'` と改行を含まない値は
/// シングルクォートで囲む。それ以外はダブルクォートで囲み、特殊文字をエスケープする。
fn quote_if_needed(value: &str) -> String {
    if !value.contains(&QUOTE_TRIGGERS[..]) && !value.contains('\n') {
        return value.to_string();
    }
    if !value.contains('\'') && !value.contains('\n') {
        return format!("'{value}'");
    }
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '$' => escaped.push_str("\\$"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    format!("\"{escaped}\"")
}

/// key 昇順で .env 形式の文字列を生成する。
pub fn render(vars: &BTreeMap<String, String>, exported_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str("# Environment Variables\n");
    out.push_str(&format!(
        "# Exported from Database at {}\n",
        exported_at.to_rfc3339()
    ));
    out.push_str("# DO NOT EDIT MANUALLY - Changes will be overwritten\n\n");

    for (key, value) in vars {
        out.push_str(key);
        out.push('=');
        out.push_str(&quote_if_needed(value));
        out.push('\n');
    }
    out
}

/// バックアップファイルのパスを生成する。
pub fn backup_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".backup.{}", at.format("%Y%m%d_%H%M%S")));
    PathBuf::from(name)
}

/// 全件を .env ファイルへ書き出す。backup が true で既存ファイルがあれば先に退避する。
/// 退避した場合はバックアップのパスを返す。
pub fn export(
    path: &Path,
    vars: &BTreeMap<String, String>,
    backup: bool,
) -> Result<Option<PathBuf>, EnvFileError> {
    let mut backed_up = None;
    if backup && path.exists() {
        let target = backup_path(path, Local::now());
        std::fs::rename(path, &target).map_err(|source| EnvFileError::Write {
            path: target.clone(),
            source,
        })?;
        info!(backup = %target.display(), "existing env file backed up");
        backed_up = Some(target);
    }

    std::fs::write(path, render(vars, Utc::now())).map_err(|source| EnvFileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), count = vars.len(), "environment variables exported");

    Ok(backed_up)
}

/// .env ファイルを読み込んで key と値の組を返す。ファイルが無い場合は空を返す。
///
/// 構文エラーの行は警告を出して読み飛ばす。重複した key は後勝ちだが、
/// 並び順は最初に現れた位置を保つ。
pub fn load(path: &Path) -> Result<Vec<(String, String)>, EnvFileError> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => {
            warn!(path = %path.display(), "env file not found, nothing to load");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(EnvFileError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut vars: Vec<(String, String)> = Vec::new();
    for item in iter {
        let (key, value) = match item {
            Ok(pair) => pair,
            Err(dotenvy::Error::LineParse(line, index)) => {
                warn!(
                    path = %path.display(),
                    line = %line,
                    index,
                    "invalid env file line skipped"
                );
                continue;
            }
            Err(source) => {
                return Err(EnvFileError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        match vars.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => vars.push((key, value)),
        }
    }

    Ok(vars)
}
