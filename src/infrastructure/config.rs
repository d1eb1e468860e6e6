// 同期サービス設定
//
// 環境変数から取得する外部設定を管理する。
// アクセス資格情報とストア接続先の両方が揃わない限りサービスは起動しない。

use thiserror::Error;

/// 設定エラー
#[derive(Debug, Error)]
pub enum SyncConfigError {
    /// 必須の環境変数が設定されていない
    #[error("必須の環境変数が設定されていません: {0}")]
    MissingEnvVar(String),
}

/// 同期サービスの設定
///
/// # フィールド
/// - `api_token`: APIトークン（Authorizationヘッダー照合に使用）
/// - `database_path`: リレーショナルストアのデータベースファイルパス
#[derive(Debug, Clone)]
pub struct SyncConfig {
    api_token: String,
    database_path: String,
}

impl SyncConfig {
    /// 新しい設定を作成
    pub fn new(api_token: impl Into<String>, database_path: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            database_path: database_path.into(),
        }
    }

    /// 環境変数から設定を読み込み
    ///
    /// # 環境変数
    /// - `API_TOKEN`: APIトークン（必須）
    /// - `DB_PATH`: データベースファイルのパス（必須）
    ///
    /// # 戻り値
    /// - `Ok(SyncConfig)`: 設定が正常に読み込まれた
    /// - `Err(SyncConfigError)`: 必須の環境変数が設定されていない
    pub fn from_env() -> Result<Self, SyncConfigError> {
        let api_token = std::env::var("API_TOKEN")
            .map_err(|_| SyncConfigError::MissingEnvVar("API_TOKEN".to_string()))?;

        let database_path = std::env::var("DB_PATH")
            .map_err(|_| SyncConfigError::MissingEnvVar("DB_PATH".to_string()))?;

        Ok(Self {
            api_token,
            database_path,
        })
    }

    /// APIトークンを取得
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// データベースパスを取得
    pub fn database_path(&self) -> &str {
        &self.database_path
    }
}
