//! ホテルドキュメントモデル
//!
//! ドキュメントストア側のホテルスナップショットと、変更通知の
//! before/afterペアから変更種別を判定するロジックを提供する。

use serde::{Deserialize, Serialize};

/// ホテルドキュメントのスナップショット
///
/// ドキュメントストアが保持するホテル1件分の状態。
/// 同期に必要なのは`services`のみで、その他のフィールドは
/// `extra`に保持したまま素通しする。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HotelDocument {
    /// ホテルが提供するサービス名のリスト
    ///
    /// フィールド自体が存在しないドキュメントは空リストとして扱う
    /// （全関連付けのクリアに相当）。
    #[serde(default)]
    pub services: Vec<String>,

    /// 同期対象外のその他フィールド
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// ドキュメント変更通知
///
/// 変更イベント1件分のペイロード。`before`/`after`はそれぞれ
/// 変更前後のスナップショットで、存在しない側は`null`。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentChange {
    /// ホテル識別子（ドキュメントキー）
    pub hotel_id: String,

    /// 変更前のスナップショット（新規作成時はnull）
    #[serde(default)]
    pub before: Option<HotelDocument>,

    /// 変更後のスナップショット（削除時はnull）
    #[serde(default)]
    pub after: Option<HotelDocument>,
}

/// 変更種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// 新規作成（before: なし → after: あり）
    Created,
    /// 更新（before: あり → after: あり）
    Updated,
    /// 削除（before: あり → after: なし）
    Deleted,
}

impl ChangeKind {
    /// before/afterペアから変更種別を判定する
    ///
    /// 両方とも存在しない通知は処理対象外として`None`を返す。
    pub fn classify(
        before: Option<&HotelDocument>,
        after: Option<&HotelDocument>,
    ) -> Option<ChangeKind> {
        match (before, after) {
            (None, Some(_)) => Some(ChangeKind::Created),
            (Some(_), Some(_)) => Some(ChangeKind::Updated),
            (Some(_), None) => Some(ChangeKind::Deleted),
            (None, None) => None,
        }
    }
}

impl DocumentChange {
    /// この変更の種別を判定する
    pub fn kind(&self) -> Option<ChangeKind> {
        ChangeKind::classify(self.before.as_ref(), self.after.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// テスト用のHotelDocumentを作成
    fn doc(services: &[&str]) -> HotelDocument {
        HotelDocument {
            services: services.iter().map(|s| s.to_string()).collect(),
            extra: serde_json::Map::new(),
        }
    }

    // ==================== 変更種別判定テスト ====================

    #[test]
    fn test_classify_created() {
        let after = doc(&["wifi"]);
        assert_eq!(
            ChangeKind::classify(None, Some(&after)),
            Some(ChangeKind::Created)
        );
    }

    #[test]
    fn test_classify_updated() {
        let before = doc(&["wifi"]);
        let after = doc(&["wifi", "pool"]);
        assert_eq!(
            ChangeKind::classify(Some(&before), Some(&after)),
            Some(ChangeKind::Updated)
        );
    }

    #[test]
    fn test_classify_deleted() {
        let before = doc(&["wifi"]);
        assert_eq!(
            ChangeKind::classify(Some(&before), None),
            Some(ChangeKind::Deleted)
        );
    }

    #[test]
    fn test_classify_both_absent_is_none() {
        assert_eq!(ChangeKind::classify(None, None), None);
    }

    #[test]
    fn test_document_change_kind() {
        let change = DocumentChange {
            hotel_id: "H1".to_string(),
            before: Some(doc(&["wifi"])),
            after: None,
        };
        assert_eq!(change.kind(), Some(ChangeKind::Deleted));
    }

    // ==================== デシリアライズテスト ====================

    /// servicesと無関係なフィールドを含むドキュメントを受理できることを確認
    #[test]
    fn test_document_deserializes_with_extra_fields() {
        let json = r#"{"services":["wifi","pool"],"name":"グランドホテル","stars":5}"#;
        let parsed: HotelDocument = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.services, vec!["wifi", "pool"]);
        assert_eq!(parsed.extra.get("stars"), Some(&serde_json::json!(5)));
    }

    /// servicesフィールドがないドキュメントは空リストになることを確認
    #[test]
    fn test_document_without_services_defaults_to_empty() {
        let json = r#"{"name":"ビジネスホテル"}"#;
        let parsed: HotelDocument = serde_json::from_str(json).unwrap();

        assert!(parsed.services.is_empty());
    }

    /// 変更通知のbefore/afterがnullでもデシリアライズできることを確認
    #[test]
    fn test_change_deserializes_with_null_snapshots() {
        let json = r#"{"hotel_id":"H1","before":null,"after":{"services":["spa"]}}"#;
        let parsed: DocumentChange = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.hotel_id, "H1");
        assert!(parsed.before.is_none());
        assert_eq!(parsed.after.unwrap().services, vec!["spa"]);
    }

    /// before/afterフィールド自体が省略されてもデシリアライズできることを確認
    #[test]
    fn test_change_deserializes_with_missing_snapshots() {
        let json = r#"{"hotel_id":"H2"}"#;
        let parsed: DocumentChange = serde_json::from_str(json).unwrap();

        assert!(parsed.before.is_none());
        assert!(parsed.after.is_none());
        assert_eq!(parsed.kind(), None);
    }
}
