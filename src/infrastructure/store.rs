//! SQLiteリレーショナルストア
//!
//! hotels / services / hotels_services の3テーブルを保持する。
//! - 書き込み: 専用の単一接続（Arc<Mutex<Connection>>）
//! - 読み取り: deadpool-sqliteによるasync接続プール

use std::sync::{Arc, Mutex};

use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;

/// サービス識別子（ストアが採番する）
pub type ServiceId = i64;

/// ストアエラー
#[derive(Debug, Error)]
pub enum StoreError {
    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// プール取得エラー
    #[error("プールエラー: {0}")]
    Pool(String),

    /// 接続構築エラー
    #[error("接続構築エラー: {0}")]
    Build(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<deadpool_sqlite::BuildError> for StoreError {
    fn from(err: deadpool_sqlite::BuildError) -> Self {
        StoreError::Build(err.to_string())
    }
}

impl From<deadpool_sqlite::PoolError> for StoreError {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<deadpool_sqlite::InteractError> for StoreError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// SQLiteデータベースのスキーマを定義するSQL
const SCHEMA_SQL: &str = r#"
-- WALモード設定
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;

-- 外部キー制約を有効化
PRAGMA foreign_keys=ON;

-- ホテルテーブル（ドキュメントキーをそのまま主キーに使用）
CREATE TABLE IF NOT EXISTS hotels (
    hotel_id TEXT PRIMARY KEY,
    updated_at INTEGER NOT NULL       -- UNIXタイムスタンプ
);

-- サービステーブル（名前で一意、削除されない）
CREATE TABLE IF NOT EXISTS services (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- ホテル・サービス関連付けテーブル
CREATE TABLE IF NOT EXISTS hotels_services (
    hotel_id TEXT NOT NULL,
    service_id INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,      -- UNIXタイムスタンプ
    PRIMARY KEY (hotel_id, service_id),
    FOREIGN KEY (hotel_id) REFERENCES hotels(hotel_id) ON DELETE CASCADE,
    FOREIGN KEY (service_id) REFERENCES services(id)
);

-- インデックス定義
CREATE INDEX IF NOT EXISTS idx_hotels_services_hotel_id ON hotels_services(hotel_id);
CREATE INDEX IF NOT EXISTS idx_hotels_services_service_id ON hotels_services(service_id);
"#;

/// SQLiteリレーショナルストア
///
/// - 書き込み: 専用の単一接続（Arc<Mutex<Connection>>）
/// - 読み取り: deadpool-sqliteによるasync接続プール
pub struct SqliteRelationalStore {
    /// 書き込み専用接続（低頻度のため単一接続で十分）
    write_conn: Arc<Mutex<Connection>>,
    /// 読み取り用async接続プール
    read_pool: Pool,
}

impl SqliteRelationalStore {
    /// 新しいSqliteRelationalStoreを作成
    ///
    /// データベースファイルを開き、スキーマを初期化する。
    /// WALモードを有効にし、書き込み用単一接続と読み取り用プールを構成する。
    ///
    /// # Arguments
    /// * `db_path` - データベースファイルのパス
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        // 書き込み用接続を作成し、スキーマを初期化
        let write_conn = Connection::open(db_path)?;
        write_conn.execute_batch(SCHEMA_SQL)?;

        // 読み取り用プールを作成（最大4接続）
        // builder()はInfallibleを返すためexpectを使用
        let cfg = Config::new(db_path);
        let read_pool = cfg
            .builder(Runtime::Tokio1)
            .expect("Config builder should not fail")
            .max_size(4)
            .build()?;

        Ok(Self {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
        })
    }

    /// 書き込み用接続を取得（テスト・内部用）
    #[allow(dead_code)]
    pub(crate) fn write_connection(&self) -> Arc<Mutex<Connection>> {
        self.write_conn.clone()
    }

    /// ホテル行をupsertする
    ///
    /// 既存行があればupdated_atのみ更新する。冪等。
    ///
    /// # Arguments
    /// * `hotel_id` - ホテル識別子
    /// * `updated_at` - 最終更新時刻（UNIXタイムスタンプ）
    pub async fn upsert_hotel(&self, hotel_id: &str, updated_at: i64) -> Result<(), StoreError> {
        let hotel_id = hotel_id.to_string();
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .expect("ホテルupsert時の書き込み接続ロック取得に失敗（Mutex poisoned）");

            conn.execute(
                "INSERT INTO hotels (hotel_id, updated_at) VALUES (?1, ?2)
                 ON CONFLICT(hotel_id) DO UPDATE SET updated_at = excluded.updated_at",
                rusqlite::params![&hotel_id, updated_at],
            )?;

            Ok(())
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }

    /// ホテル行を削除する
    ///
    /// 関連付けは外部キー制約のCASCADE設定により自動削除される。
    ///
    /// # Returns
    /// * `Ok(true)` - 削除した
    /// * `Ok(false)` - ホテルが存在しなかった
    pub async fn delete_hotel(&self, hotel_id: &str) -> Result<bool, StoreError> {
        let hotel_id = hotel_id.to_string();
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .expect("ホテル削除時の書き込み接続ロック取得に失敗（Mutex poisoned）");

            let rows_affected =
                conn.execute("DELETE FROM hotels WHERE hotel_id = ?1", [&hotel_id])?;

            Ok(rows_affected > 0)
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }

    /// ホテルの全関連付けを削除する
    ///
    /// 全置換同期の前段として使用する。
    ///
    /// # Returns
    /// 削除した関連付け行数
    pub async fn clear_associations(&self, hotel_id: &str) -> Result<usize, StoreError> {
        let hotel_id = hotel_id.to_string();
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .expect("関連付け削除時の書き込み接続ロック取得に失敗（Mutex poisoned）");

            let rows_affected = conn.execute(
                "DELETE FROM hotels_services WHERE hotel_id = ?1",
                [&hotel_id],
            )?;

            Ok(rows_affected)
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }

    /// 関連付け行をupsertする
    ///
    /// 既存行があればupdated_atのみ更新する。冪等。
    pub async fn upsert_association(
        &self,
        hotel_id: &str,
        service_id: ServiceId,
        updated_at: i64,
    ) -> Result<(), StoreError> {
        let hotel_id = hotel_id.to_string();
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .expect("関連付けupsert時の書き込み接続ロック取得に失敗（Mutex poisoned）");

            conn.execute(
                "INSERT INTO hotels_services (hotel_id, service_id, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(hotel_id, service_id) DO UPDATE SET updated_at = excluded.updated_at",
                rusqlite::params![&hotel_id, service_id, updated_at],
            )?;

            Ok(())
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }

    /// サービスを名前で検索する（大文字小文字を区別する完全一致）
    ///
    /// # Returns
    /// * `Ok(Some(ServiceId))` - 既存サービスの識別子
    /// * `Ok(None)` - 該当する名前のサービスが存在しない
    pub async fn find_service_by_name(&self, name: &str) -> Result<Option<ServiceId>, StoreError> {
        let name = name.to_string();
        let conn = self.read_pool.get().await?;

        conn.interact(move |conn| {
            let id = conn
                .query_row("SELECT id FROM services WHERE name = ?1", [&name], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(id)
        })
        .await?
    }

    /// サービス行を挿入し、識別子を返す
    ///
    /// `ON CONFLICT(name) DO NOTHING`と再SELECTの組み合わせにより、
    /// 同名の挿入が競合しても単一行に収束する（重複行は作られない）。
    pub async fn insert_service(&self, name: &str) -> Result<ServiceId, StoreError> {
        let name = name.to_string();
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .expect("サービス挿入時の書き込み接続ロック取得に失敗（Mutex poisoned）");

            conn.execute(
                "INSERT INTO services (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                [&name],
            )?;

            // 挿入の有無に関わらず既存行の識別子を返す
            let id: ServiceId =
                conn.query_row("SELECT id FROM services WHERE name = ?1", [&name], |row| {
                    row.get(0)
                })?;

            Ok(id)
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }

    /// フィルター候補ホテルの関連付け一覧を取得する
    ///
    /// `required`のいずれか1つ以上を保有するホテルについて、そのホテルの
    /// 全関連付けを(hotel_id, サービス名)ペアとして返す。
    /// AND条件の最終判定は呼び出し側のドメインロジックで行う。
    pub async fn candidate_hotel_services(
        &self,
        required: &[String],
    ) -> Result<Vec<(String, String)>, StoreError> {
        let required = required.to_vec();
        let conn = self.read_pool.get().await?;

        conn.interact(move |conn| Self::execute_candidate_query(conn, &required))
            .await?
    }

    /// 候補クエリを実行（内部用）
    ///
    /// 要求サービス名の数だけINプレースホルダーを動的に構築する。
    fn execute_candidate_query(
        conn: &Connection,
        required: &[String],
    ) -> Result<Vec<(String, String)>, StoreError> {
        let placeholders: Vec<String> = (1..=required.len()).map(|i| format!("?{}", i)).collect();

        let sql = format!(
            "SELECT hs.hotel_id, s.name \
             FROM hotels_services hs \
             INNER JOIN services s ON s.id = hs.service_id \
             INNER JOIN hotels h ON h.hotel_id = hs.hotel_id \
             WHERE hs.hotel_id IN ( \
                 SELECT hs2.hotel_id FROM hotels_services hs2 \
                 INNER JOIN services s2 ON s2.id = hs2.service_id \
                 WHERE s2.name IN ({}))",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            required.iter().map(|p| p as &dyn rusqlite::ToSql).collect();

        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
