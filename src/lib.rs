// ドメイン層モジュール
pub mod domain;

// アプリケーション層モジュール
pub mod application;

// インフラ層モジュール
pub mod infrastructure;

// HTTP APIモジュール
pub mod api;
