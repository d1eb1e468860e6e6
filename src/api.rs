//! HTTP APIレイヤー
//!
//! ホテル検索と変更通知受信のためのaxumルーターを提供する。
//! - ホテル検索 (POST /hotels/search)
//! - 変更通知の受信 (POST /changes)
//! - ヘルスチェック (GET /health)

pub mod auth;
pub mod error;

pub use auth::{auth_middleware, AuthConfig};
pub use error::{ApiError, ApiErrorBody};

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::{ChangeDispatcher, FilterResolver, FilterResolverError};
use crate::domain::DocumentChange;

/// バックエンド一式
///
/// ストアに接続済みのリゾルバーとディスパッチャーを保持する。
/// 設定が欠落している環境ではNoneのままルーターを構築できる。
#[derive(Clone)]
pub struct Backend {
    /// フィルター検索
    pub resolver: Arc<FilterResolver>,
    /// 変更通知の処理
    pub dispatcher: Arc<ChangeDispatcher>,
}

/// アプリケーション状態
///
/// ルーター全体で共有される状態を保持する。
#[derive(Clone)]
pub struct AppState {
    /// 認証設定
    pub auth_config: AuthConfig,
    /// バックエンド（設定欠落時はNone）
    pub backend: Option<Backend>,
}

/// ホテル検索リクエストのボディ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHotelsRequest {
    /// 要求するサービス名のリスト（AND条件）
    #[serde(default)]
    pub services: Vec<String>,
}

/// ホテル検索レスポンスの1件分
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HotelSummary {
    /// ホテル識別子
    pub hotel_id: String,
}

/// ヘルスチェックエンドポイント
///
/// サーバーの死活確認用。認証不要。
async fn health() -> &'static str {
    "OK"
}

/// ホテル検索エンドポイント (POST /hotels/search)
///
/// 要求された全サービスを保有するホテルの一覧を返す。
///
/// # Returns
/// - 200 OK: 検索結果（JSON配列、空もありうる）
/// - 422 Unprocessable Entity: 検索条件が空、またはバックエンド設定が欠落
/// - 500 Internal Server Error: ストアエラー（診断trace付き）
async fn search_hotels_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchHotelsRequest>,
) -> Response {
    tracing::info!(
        service_count = request.services.len(),
        "ホテル検索リクエストを受信"
    );

    let Some(backend) = &state.backend else {
        tracing::error!("バックエンドが設定されていないため検索できません");
        return ApiError::configuration_missing("ストアの接続設定がありません").into_response();
    };

    match backend.resolver.filter_hotels(&request.services).await {
        Ok(hotel_ids) => {
            tracing::info!(count = hotel_ids.len(), "検索結果を返却");
            let summaries: Vec<HotelSummary> = hotel_ids
                .into_iter()
                .map(|hotel_id| HotelSummary { hotel_id })
                .collect();
            Json(summaries).into_response()
        }
        Err(FilterResolverError::InvalidInput(e)) => {
            tracing::warn!(error = %e, "不正な検索条件");
            ApiError::invalid_input(format!("検索条件が不正です: {}", e)).into_response()
        }
        Err(FilterResolverError::Store(e)) => {
            tracing::error!(error = %e, "ホテル検索エラー");
            ApiError::internal_error(format!("ストアエラー: {}", e))
                .with_trace(format!("{:?}", e))
                .into_response()
        }
    }
}

/// 変更通知エンドポイント (POST /changes)
///
/// ドキュメントの変更通知を受け取り、関連付けの同期を行う。
/// 同期エラーはログに記録して握りつぶすため、ボディがJSONとして
/// 解釈できる限り常に200を返す（通知元への再送は発生しない）。
///
/// # Returns
/// - 200 OK: 通知を受理（処理が失敗してもログのみ）
/// - 400 Bad Request: ボディがJSONとして不正
async fn change_handler(
    State(state): State<AppState>,
    Json(change): Json<DocumentChange>,
) -> StatusCode {
    tracing::info!(hotel_id = %change.hotel_id, "変更通知を受信");

    let Some(backend) = &state.backend else {
        tracing::error!(
            hotel_id = %change.hotel_id,
            "バックエンドが設定されていないため変更通知を破棄"
        );
        return StatusCode::OK;
    };

    backend.dispatcher.on_change(&change).await;
    StatusCode::OK
}

/// ルーターを構築する
///
/// 全エンドポイントのルーティングを定義し、認証ミドルウェアを適用する。
/// /healthエンドポイントは認証をバイパスする（auth_middleware内で処理）。
/// TraceLayerによりリクエスト/レスポンスの構造化ログを自動記録する。
///
/// # Arguments
/// * `auth_config` - 認証設定
/// * `backend` - バックエンド一式（設定欠落時はNone）
pub fn create_router(auth_config: AuthConfig, backend: Option<Backend>) -> Router {
    let state = AppState {
        auth_config: auth_config.clone(),
        backend,
    };

    Router::new()
        .route("/health", get(health))
        .route("/hotels/search", post(search_hotels_handler))
        .route("/changes", post(change_handler))
        .layer(middleware::from_fn_with_state(auth_config, auth_middleware))
        // リクエストトレーシングレイヤー（method, path, status, latencyを自動記録）
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
