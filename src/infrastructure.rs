// インフラ層モジュール
pub mod config;
pub mod logging;
pub mod store;

// 再エクスポート
pub use config::{SyncConfig, SyncConfigError};
pub use logging::init_logging;
pub use store::{ServiceId, SqliteRelationalStore, StoreError};
