use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// EnvVariable は実行時に編集可能な環境変数 1 件を表すドメインエンティティ。
/// key は作成後に変更できない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
pub struct EnvVariable {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnvVariable {
    /// 新規エントリを作成する。created_at と updated_at は同じ時刻になる。
    pub fn new(key: impl Into<String>, value: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            value: value.into(),
            description,
            created_at: now,
            updated_at: now,
        }
    }

    /// patch を適用する。省略されたフィールドは変更しない。
    /// updated_at は直前の値より必ず大きくなる。
    pub fn apply(&mut self, patch: &EnvVariablePatch, now: DateTime<Utc>) {
        if let Some(ref value) = patch.value {
            self.value.clone_from(value);
        }
        if let Some(ref description) = patch.description {
            self.description = Some(description.clone());
        }
        self.updated_at = next_updated_at(self.updated_at, now);
    }
}

/// 時計が進んでいない場合でも updated_at を 1 マイクロ秒進める。
/// PostgreSQL の timestamptz 精度に合わせてマイクロ秒単位で扱う。
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let bumped = previous + chrono::Duration::microseconds(1);
    if now > previous {
        now
    } else {
        bumped
    }
}

/// EnvVariablePatch は部分更新の内容を表す。None のフィールドは変更しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVariablePatch {
    pub value: Option<String>,
    pub description: Option<String>,
}

impl EnvVariablePatch {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.description.is_none()
    }
}

/// EnvVariableList は一覧取得のレスポンス形状 `{ total, items }` を表す。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
pub struct EnvVariableList {
    pub total: usize,
    pub items: Vec<EnvVariable>,
}

impl From<Vec<EnvVariable>> for EnvVariableList {
    fn from(items: Vec<EnvVariable>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry() -> EnvVariable {
        EnvVariable::new("FEATURE_X", "off", Some("toggle".to_string()))
    }

    #[test]
    fn test_new_sets_equal_timestamps() {
        let entry = make_entry();
        assert_eq!(entry.key, "FEATURE_X");
        assert_eq!(entry.value, "off");
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[test]
    fn test_apply_value_only_keeps_description() {
        let mut entry = make_entry();
        let patch = EnvVariablePatch {
            value: Some("on".to_string()),
            description: None,
        };

        entry.apply(&patch, Utc::now());

        assert_eq!(entry.value, "on");
        assert_eq!(entry.description.as_deref(), Some("toggle"));
    }

    #[test]
    fn test_apply_description_only_keeps_value() {
        let mut entry = make_entry();
        let patch = EnvVariablePatch {
            value: None,
            description: Some("feature toggle".to_string()),
        };

        entry.apply(&patch, Utc::now());

        assert_eq!(entry.value, "off");
        assert_eq!(entry.description.as_deref(), Some("feature toggle"));
    }

    #[test]
    fn test_apply_strictly_increases_updated_at_with_stale_clock() {
        let mut entry = make_entry();
        let before = entry.updated_at;
        // 時計が巻き戻ったケース
        let stale_now = before - chrono::Duration::seconds(10);

        entry.apply(&EnvVariablePatch::default(), stale_now);

        assert!(entry.updated_at > before);
        assert!(entry.updated_at >= entry.created_at);
    }

    #[test]
    fn test_next_updated_at_uses_clock_when_ahead() {
        let previous = Utc::now();
        let now = previous + chrono::Duration::seconds(1);
        assert_eq!(next_updated_at(previous, now), now);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(EnvVariablePatch::default().is_empty());
        assert!(!EnvVariablePatch {
            value: Some(String::new()),
            description: None,
        }
        .is_empty());
    }

    #[test]
    fn test_list_from_vec_counts_items() {
        let list = EnvVariableList::from(vec![make_entry()]);
        assert_eq!(list.total, 1);
        assert_eq!(list.items[0].key, "FEATURE_X");
    }

    #[test]
    fn test_serialization_shape() {
        let entry = EnvVariable::new("CORS_ORIGINS", "http://localhost:3000", None);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["key"], "CORS_ORIGINS");
        assert_eq!(json["value"], "http://localhost:3000");
        assert!(json["description"].is_null());
        assert!(json["created_at"].is_string());
        assert!(json["updated_at"].is_string());
    }
}
