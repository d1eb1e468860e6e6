// ドメイン層モジュール
pub mod document;
pub mod service_filter;

// 再エクスポート
pub use document::{ChangeKind, DocumentChange, HotelDocument};
pub use service_filter::{FilterValidationError, ServiceFilter};
