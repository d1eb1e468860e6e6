//! サービス名レジストリ
//!
//! サービス名を安定した識別子に解決する。未登録の名前は初回参照時に
//! 行を作成する。servicesテーブルへの書き込みはこのレジストリのみが行う。

use std::sync::Arc;

use tracing::debug;

use crate::infrastructure::{ServiceId, SqliteRelationalStore, StoreError};

/// サービス名レジストリ
///
/// 名前→識別子の解決を提供する。同名の行は決して重複しない
/// （ストアのUNIQUE制約と挿入時の収束処理で保証される）。
pub struct ServiceRegistry {
    store: Arc<SqliteRelationalStore>,
}

impl ServiceRegistry {
    /// 新しいServiceRegistryを作成
    pub fn new(store: Arc<SqliteRelationalStore>) -> Self {
        Self { store }
    }

    /// サービス名を識別子に解決する
    ///
    /// 大文字小文字を区別する完全一致で既存行を検索し、なければ新規作成する。
    /// ストアエラーはそのまま呼び出し元に伝播する（内部で再試行しない）。
    pub async fn resolve(&self, name: &str) -> Result<ServiceId, StoreError> {
        if let Some(id) = self.store.find_service_by_name(name).await? {
            return Ok(id);
        }

        // 競合しても単一行に収束する（store側のON CONFLICT DO NOTHING + 再SELECT）
        let id = self.store.insert_service(name).await?;
        debug!(service_name = name, service_id = id, "サービスを新規登録");

        Ok(id)
    }
}
