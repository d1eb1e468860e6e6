//! ホテル検索用HTTP APIサーバー
//!
//! 本バイナリは以下の機能を提供する:
//! - ホテル検索 (POST /hotels/search)
//! - ドキュメント変更通知の受信 (POST /changes)
//! - ヘルスチェック (GET /health)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;

use hotel_sync_api::api::{create_router, AuthConfig, Backend};
use hotel_sync_api::application::{AssociationSynchronizer, ChangeDispatcher, FilterResolver};
use hotel_sync_api::infrastructure::{init_logging, SqliteRelationalStore, SyncConfig};

/// シャットダウンシグナルを待機する
///
/// SIGTERMまたはCtrl+C (SIGINT) を待機し、いずれかを受信したらリターンする。
/// axum::serve の with_graceful_shutdown() と組み合わせて使用することで、
/// 新規リクエストの受付停止と処理中リクエストの完了待機を実現する。
///
/// # Panics
/// シグナルハンドラーの登録に失敗した場合はパニックする。
async fn shutdown_signal() {
    // Ctrl+C (SIGINT) を待機
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Ctrl+C シグナルハンドラーの登録に失敗しました");
    };

    // SIGTERM を待機 (Unix系OSのみ)
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM シグナルハンドラーの登録に失敗しました")
            .recv()
            .await;
    };

    // Windows等の非Unix環境ではSIGTERMは利用不可
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C (SIGINT) を受信しました。graceful shutdownを開始します");
        }
        _ = terminate => {
            tracing::info!("SIGTERM を受信しました。graceful shutdownを開始します");
        }
    }
}

/// メイン関数
///
/// トレーシングを初期化し、HTTPサーバーを起動する。
/// サーバーはlocalhost:8080でリッスンし、リバースプロキシからの
/// リクエストを受け付ける。SIGTERMまたはCtrl+Cを受信すると
/// graceful shutdownを実行し、処理中のリクエスト完了を待ってから
/// SQLiteコネクションを正常にクローズする。
///
/// # 環境変数
/// - `API_TOKEN`: APIトークン（必須）
/// - `DB_PATH`: データベースファイルのパス（必須）
/// - `RUST_LOG`: ログレベル（デフォルト: info）
#[tokio::main]
async fn main() {
    // 構造化ログの初期化
    init_logging();

    tracing::info!("ホテル同期APIサーバーを起動します");

    // 環境変数から設定を読み込む（欠落時は起動失敗）
    let config = SyncConfig::from_env().expect("環境変数からの設定読み込みに失敗しました");
    let auth_config = AuthConfig::new(config.api_token());
    tracing::info!("データベースパス: {}", config.database_path());

    // SQLiteリレーショナルストアを初期化
    let store = Arc::new(
        SqliteRelationalStore::new(config.database_path())
            .await
            .expect("SQLiteストアの初期化に失敗しました"),
    );
    tracing::info!("SQLiteストアを初期化しました");

    let synchronizer = Arc::new(AssociationSynchronizer::new(store.clone()));
    let backend = Backend {
        resolver: Arc::new(FilterResolver::new(store.clone())),
        dispatcher: Arc::new(ChangeDispatcher::new(synchronizer)),
    };

    let app = create_router(auth_config, Some(backend));

    // localhost:8080でリッスン（リバースプロキシ用）
    let addr = SocketAddr::from(([127, 0, 0, 1], 8080));
    tracing::info!("リッスン開始: {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("アドレスのバインドに失敗しました");

    // graceful shutdownを有効にしてサーバーを起動
    // shutdown_signal()がシグナルを受信すると:
    // 1. 新規コネクションの受付を停止
    // 2. 処理中のリクエストの完了を待機
    // 3. サーバーが終了し、SQLiteコネクション（Arc<SqliteRelationalStore>）が自動的にドロップされる
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("サーバーの起動に失敗しました");

    tracing::info!("サーバーが正常に停止しました");
}
