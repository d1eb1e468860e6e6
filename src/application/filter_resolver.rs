//! サービスフィルターリゾルバー
//!
//! 要求されたサービス名のセットをすべて保有するホテルを返す。
//! 空の入力はストアに触れる前に検証エラーで弾く。

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::{FilterValidationError, ServiceFilter};
use crate::infrastructure::{SqliteRelationalStore, StoreError};

/// フィルター解決エラー
#[derive(Debug, Error)]
pub enum FilterResolverError {
    /// 入力が不正（空の要求セット）
    #[error("検索条件が不正です: {0}")]
    InvalidInput(#[from] FilterValidationError),

    /// ストアエラー
    #[error("ストアエラー: {0}")]
    Store(#[from] StoreError),
}

/// サービスフィルターリゾルバー
///
/// 候補の取得はストアの結合クエリで行い、AND条件の最終判定
/// （要求セットのスーパーセット判定）はドメインロジックに委ねる。
pub struct FilterResolver {
    store: Arc<SqliteRelationalStore>,
}

impl FilterResolver {
    /// 新しいFilterResolverを作成
    pub fn new(store: Arc<SqliteRelationalStore>) -> Self {
        Self { store }
    }

    /// 要求された全サービスを保有するホテルの識別子一覧を返す
    ///
    /// 結果は重複なし。順序は保証しない（現実装は候補行の初出順）。
    pub async fn filter_hotels(&self, required: &[String]) -> Result<Vec<String>, FilterResolverError> {
        // 空の要求セットはストアに触れずに弾く
        ServiceFilter::validate(required)?;

        let rows = self.store.candidate_hotel_services(required).await?;
        let matched = ServiceFilter::matching_hotels(&rows, required);

        debug!(
            required_count = required.len(),
            candidate_rows = rows.len(),
            matched_count = matched.len(),
            "フィルター解決が完了"
        );

        Ok(matched)
    }
}
