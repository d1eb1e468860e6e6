// アプリケーション層モジュール
pub mod change_dispatcher;
pub mod filter_resolver;
pub mod service_registry;
pub mod synchronizer;

// 再エクスポート
pub use change_dispatcher::ChangeDispatcher;
pub use filter_resolver::{FilterResolver, FilterResolverError};
pub use service_registry::ServiceRegistry;
pub use synchronizer::{AssociationSynchronizer, ReconcileOutcome};
