//! 変更ディスパッチャー
//!
//! ドキュメント変更通知を分類し、シンクロナイザーの再構築または
//! 削除経路に振り分ける。イベント経路のエラーは呼び出し元に
//! 伝播させず、すべてログに記録して握りつぶす（イベント源への
//! 再送は行われない）。

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::application::synchronizer::AssociationSynchronizer;
use crate::domain::{ChangeKind, DocumentChange};

/// 変更ディスパッチャー
pub struct ChangeDispatcher {
    synchronizer: Arc<AssociationSynchronizer>,
}

impl ChangeDispatcher {
    /// 新しいChangeDispatcherを作成
    pub fn new(synchronizer: Arc<AssociationSynchronizer>) -> Self {
        Self { synchronizer }
    }

    /// 変更通知を処理する
    ///
    /// afterが存在しなければ削除、存在すれば全置換の再構築を行う。
    /// beforeは分類以外には使用しない（差分計算はしない）。
    pub async fn on_change(&self, change: &DocumentChange) {
        let hotel_id = change.hotel_id.as_str();

        let Some(kind) = change.kind() else {
            warn!(hotel_id = hotel_id, "before/afterともに存在しない変更通知をスキップ");
            return;
        };

        match kind {
            ChangeKind::Deleted => {
                info!(hotel_id = hotel_id, "ドキュメント削除を検出");
                if let Err(e) = self.synchronizer.remove(hotel_id).await {
                    error!(hotel_id = hotel_id, error = %e, "削除同期に失敗（イベントは破棄）");
                }
            }
            ChangeKind::Created | ChangeKind::Updated => {
                let service_names: &[String] = change
                    .after
                    .as_ref()
                    .map(|doc| doc.services.as_slice())
                    .unwrap_or(&[]);

                info!(
                    hotel_id = hotel_id,
                    service_count = service_names.len(),
                    "ドキュメント書き込みを検出"
                );

                match self.synchronizer.reconcile(hotel_id, service_names).await {
                    Ok(outcome) if outcome.failure_count > 0 => {
                        warn!(
                            hotel_id = hotel_id,
                            failure_count = outcome.failure_count,
                            "一部の関連付け同期に失敗（部分的な結果が残る）"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(hotel_id = hotel_id, error = %e, "再構築に失敗（イベントは破棄）");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HotelDocument;
    use crate::infrastructure::SqliteRelationalStore;
    use tempfile::tempdir;

    /// テスト用のストアとディスパッチャーを作成
    async fn create_dispatcher() -> (
        tempfile::TempDir,
        Arc<SqliteRelationalStore>,
        ChangeDispatcher,
    ) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = Arc::new(
            SqliteRelationalStore::new(&db_path.to_string_lossy())
                .await
                .unwrap(),
        );
        let sync = Arc::new(AssociationSynchronizer::new(store.clone()));
        let dispatcher = ChangeDispatcher::new(sync);
        (dir, store, dispatcher)
    }

    fn doc(services: &[&str]) -> HotelDocument {
        HotelDocument {
            services: services.iter().map(|s| s.to_string()).collect(),
            extra: serde_json::Map::new(),
        }
    }

    fn hotel_exists(store: &SqliteRelationalStore, hotel_id: &str) -> bool {
        let conn = store.write_connection();
        let conn = conn.lock().unwrap();
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM hotels WHERE hotel_id = ?1",
                [hotel_id],
                |row| row.get(0),
            )
            .unwrap();
        count > 0
    }

    fn association_count(store: &SqliteRelationalStore, hotel_id: &str) -> i32 {
        let conn = store.write_connection();
        let conn = conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM hotels_services WHERE hotel_id = ?1",
            [hotel_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    /// 新規作成通知でホテルと関連付けが作成されることを確認
    #[tokio::test]
    async fn test_created_change_builds_rows() {
        let (_dir, store, dispatcher) = create_dispatcher().await;

        let change = DocumentChange {
            hotel_id: "H1".to_string(),
            before: None,
            after: Some(doc(&["wifi", "pool"])),
        };
        dispatcher.on_change(&change).await;

        assert!(hotel_exists(&store, "H1"));
        assert_eq!(association_count(&store, "H1"), 2);
    }

    /// 更新通知で関連付けが全置換されることを確認
    #[tokio::test]
    async fn test_updated_change_replaces_associations() {
        let (_dir, store, dispatcher) = create_dispatcher().await;

        let created = DocumentChange {
            hotel_id: "H1".to_string(),
            before: None,
            after: Some(doc(&["wifi", "pool"])),
        };
        dispatcher.on_change(&created).await;

        let updated = DocumentChange {
            hotel_id: "H1".to_string(),
            before: Some(doc(&["wifi", "pool"])),
            after: Some(doc(&["spa"])),
        };
        dispatcher.on_change(&updated).await;

        assert_eq!(association_count(&store, "H1"), 1);
    }

    /// 削除通知でホテルと関連付けが消えることを確認
    #[tokio::test]
    async fn test_deleted_change_removes_rows() {
        let (_dir, store, dispatcher) = create_dispatcher().await;

        let created = DocumentChange {
            hotel_id: "H1".to_string(),
            before: None,
            after: Some(doc(&["wifi"])),
        };
        dispatcher.on_change(&created).await;

        let deleted = DocumentChange {
            hotel_id: "H1".to_string(),
            before: Some(doc(&["wifi"])),
            after: None,
        };
        dispatcher.on_change(&deleted).await;

        assert!(!hotel_exists(&store, "H1"));
        assert_eq!(association_count(&store, "H1"), 0);
    }

    /// before/afterともに存在しない通知が何も変更しないことを確認
    #[tokio::test]
    async fn test_empty_change_is_skipped() {
        let (_dir, store, dispatcher) = create_dispatcher().await;

        let change = DocumentChange {
            hotel_id: "H1".to_string(),
            before: None,
            after: None,
        };
        dispatcher.on_change(&change).await;

        assert!(!hotel_exists(&store, "H1"));
    }

    /// servicesフィールドのないafterが全関連付けのクリアになることを確認
    #[tokio::test]
    async fn test_after_without_services_clears_associations() {
        let (_dir, store, dispatcher) = create_dispatcher().await;

        let created = DocumentChange {
            hotel_id: "H1".to_string(),
            before: None,
            after: Some(doc(&["wifi"])),
        };
        dispatcher.on_change(&created).await;

        let cleared = DocumentChange {
            hotel_id: "H1".to_string(),
            before: Some(doc(&["wifi"])),
            after: Some(doc(&[])),
        };
        dispatcher.on_change(&cleared).await;

        assert!(hotel_exists(&store, "H1"));
        assert_eq!(association_count(&store, "H1"), 0);
    }
}
