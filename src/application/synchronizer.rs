//! 関連付けシンクロナイザー
//!
//! ドキュメントの現在状態に合わせて、ホテル行とその関連付けを
//! 全置換方式で再構築する。差分計算は行わず、毎回すべての関連付けを
//! 削除してから作り直す。hotels / hotels_servicesへの書き込みは
//! このシンクロナイザーのみが行う。

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use futures::future;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use crate::application::service_registry::ServiceRegistry;
use crate::infrastructure::{SqliteRelationalStore, StoreError};

/// 再構築の結果
///
/// サービス別の関連付け処理の成功/失敗件数を保持する。
/// 一部失敗してもロールバックは行わないため、部分的な同期結果が
/// そのまま残ることがある（次回の書き込みで整合する）。
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// upsertに成功した関連付け数
    pub association_count: usize,
    /// 失敗した関連付け数（ログに記録済み）
    pub failure_count: usize,
}

impl ReconcileOutcome {
    /// 新しいReconcileOutcomeを作成
    pub fn new() -> Self {
        Self::default()
    }
}

/// 関連付けシンクロナイザー
///
/// 同一ホテルに対する再構築・削除はホテル識別子ごとのロックで直列化し、
/// 連続するドキュメント書き込みのdelete-then-insertが交錯しないようにする。
/// 異なるホテル同士は並行して処理できる。
pub struct AssociationSynchronizer {
    store: Arc<SqliteRelationalStore>,
    registry: ServiceRegistry,
    /// ホテル識別子ごとの直列化ロック
    hotel_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AssociationSynchronizer {
    /// 新しいAssociationSynchronizerを作成
    pub fn new(store: Arc<SqliteRelationalStore>) -> Self {
        Self {
            registry: ServiceRegistry::new(store.clone()),
            store,
            hotel_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// ホテル識別子ごとのロックを取得する
    async fn lock_hotel(&self, hotel_id: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self
                .hotel_locks
                .lock()
                .expect("ホテルロックマップの取得に失敗（Mutex poisoned）");
            locks
                .entry(hotel_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }

    /// ホテルの関連付けをドキュメント状態に合わせて再構築する
    ///
    /// 1. ホテル行をupsert（現在時刻をupdated_atに刻印）
    /// 2. 既存の関連付けを全削除（全置換方式）
    /// 3. 各サービス名の解決+upsertを並行実行し、全件の完了を待つ
    ///
    /// 入力の重複名は事前に排除せず、それぞれupsertを試みる。
    /// サービス別の失敗はログに記録して件数に集計し、成功分は残す。
    /// ホテルupsert・全削除の失敗はErrとして伝播する。
    pub async fn reconcile(
        &self,
        hotel_id: &str,
        service_names: &[String],
    ) -> Result<ReconcileOutcome, StoreError> {
        let _guard = self.lock_hotel(hotel_id).await;

        let now = Utc::now().timestamp();

        self.store.upsert_hotel(hotel_id, now).await?;
        let cleared = self.store.clear_associations(hotel_id).await?;
        debug!(
            hotel_id = hotel_id,
            cleared = cleared,
            service_count = service_names.len(),
            "既存の関連付けを削除"
        );

        // サービス別の解決+upsertを並行実行し、全件の完了を待つ
        let tasks = service_names
            .iter()
            .map(|name| self.link_service(hotel_id, name, now));
        let results = future::join_all(tasks).await;

        let mut outcome = ReconcileOutcome::new();
        for (name, result) in service_names.iter().zip(results) {
            match result {
                Ok(()) => outcome.association_count += 1,
                Err(e) => {
                    error!(
                        hotel_id = hotel_id,
                        service_name = %name,
                        error = %e,
                        "関連付けのupsertに失敗"
                    );
                    outcome.failure_count += 1;
                }
            }
        }

        info!(
            hotel_id = hotel_id,
            association_count = outcome.association_count,
            failure_count = outcome.failure_count,
            "関連付けの再構築が完了"
        );

        Ok(outcome)
    }

    /// 1サービス分の解決+upsertチェーン
    async fn link_service(
        &self,
        hotel_id: &str,
        name: &str,
        updated_at: i64,
    ) -> Result<(), StoreError> {
        let service_id = self.registry.resolve(name).await?;
        self.store
            .upsert_association(hotel_id, service_id, updated_at)
            .await
    }

    /// ホテル行とその全関連付けを削除する
    ///
    /// ドキュメント削除時に使用する。ホテル行を先に削除し、その成否に
    /// 関わらず関連付けの削除も試行する。いずれかが失敗した場合は
    /// ログに記録したうえでErrを返す（イベント経路側で握りつぶされる）。
    pub async fn remove(&self, hotel_id: &str) -> Result<(), StoreError> {
        let _guard = self.lock_hotel(hotel_id).await;

        let hotel_result = self.store.delete_hotel(hotel_id).await;
        if let Err(e) = &hotel_result {
            error!(hotel_id = hotel_id, error = %e, "ホテル行の削除に失敗");
        }

        let assoc_result = self.store.clear_associations(hotel_id).await;
        if let Err(e) = &assoc_result {
            error!(hotel_id = hotel_id, error = %e, "関連付けの削除に失敗");
        }

        let deleted = hotel_result?;
        assoc_result?;

        info!(hotel_id = hotel_id, deleted = deleted, "ホテルを削除");
        Ok(())
    }
}
