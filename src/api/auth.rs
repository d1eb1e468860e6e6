//! 認証ミドルウェア
//!
//! APIトークンによる認証を提供する。
//! - Authorizationヘッダーからトークンを抽出
//! - 環境変数に設定されたトークンと照合
//! - /healthエンドポイントは認証をバイパス
//! - 不正なトークン時は401 Unauthorized（JSON形式）を返却

use crate::api::error::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// 認証設定
///
/// APIトークンを保持する構造体。
/// axumのStateとして共有される。
#[derive(Clone)]
pub struct AuthConfig {
    /// APIトークン（環境変数から取得）
    pub api_token: String,
}

impl AuthConfig {
    /// 新しいAuthConfigを作成
    ///
    /// # Arguments
    /// * `api_token` - APIトークン
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
        }
    }
}

/// 認証ミドルウェア
///
/// リクエストのAuthorizationヘッダーを検証する。
/// /healthエンドポイントは認証をバイパスする。
///
/// # Authorization Header Format
/// `Bearer <token>` または `<token>`
///
/// # Returns
/// - 認証成功時: 次のハンドラーにリクエストを渡す
/// - 認証失敗時: 401 Unauthorized（JSON形式）を返す
pub async fn auth_middleware(
    State(config): State<AuthConfig>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // /healthエンドポイントは認証をバイパス
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    // Authorizationヘッダーを取得
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    // トークンを抽出
    let token = match auth_header {
        Some(header) => {
            // "Bearer <token>" または "<token>" 形式をサポート
            if let Some(token) = header.strip_prefix("Bearer ") {
                token.trim()
            } else {
                header.trim()
            }
        }
        None => {
            tracing::warn!(
                path = %request.uri().path(),
                "認証ヘッダーがありません"
            );
            return ApiError::unauthorized("Authorizationヘッダーが必要です").into_response();
        }
    };

    // トークンを検証
    if token == config.api_token {
        next.run(request).await
    } else {
        tracing::warn!(
            path = %request.uri().path(),
            "無効なAPIトークン"
        );
        ApiError::unauthorized("APIトークンが無効です").into_response()
    }
}
