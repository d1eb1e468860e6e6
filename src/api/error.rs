//! APIエラーハンドリング
//!
//! 統一されたエラーレスポンス形式を提供する。
//! すべてのエラーはJSON形式で返却され、`error`と`message`フィールドを含む。
//! ストア障害時は診断用の`trace`フィールドを追加で含むことがある。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// APIエラーレスポンスのボディ
///
/// JSON形式で`error`（エラー種別）と`message`（詳細メッセージ）を含む。
/// `trace`は内部エラー時のみ付与される診断情報。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    /// エラー種別（例: "bad_request", "unauthorized", "invalid_input", "internal_error"）
    pub error: String,
    /// 詳細なエラーメッセージ
    pub message: String,
    /// 診断用トレース（内部エラー時のみ）
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace: Option<String>,
}

/// APIエラー
///
/// 統一されたエラーレスポンス形式。
/// ステータスコードとJSON形式のエラーボディを含む。
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTPステータスコード
    status: StatusCode,
    /// エラーレスポンスボディ
    body: ApiErrorBody,
}

impl ApiError {
    /// 新しいApiErrorを作成
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                error: error.into(),
                message: message.into(),
                trace: None,
            },
        }
    }

    /// 400 Bad Requestエラーを作成
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    /// 401 Unauthorizedエラーを作成
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    /// 422 Unprocessable Entityエラー（不正な検索条件）を作成
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_input", message)
    }

    /// 422 Unprocessable Entityエラー（バックエンド設定の欠落）を作成
    pub fn configuration_missing(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "configuration_missing",
            message,
        )
    }

    /// 500 Internal Server Errorを作成
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// 診断用トレースを付与する
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.body.trace = Some(trace.into());
        self
    }

    /// エラー種別を取得
    pub fn error(&self) -> &str {
        &self.body.error
    }

    /// エラーメッセージを取得
    pub fn message(&self) -> &str {
        &self.body.message
    }

    /// ステータスコードを取得
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
