mod from_row;
pub mod queries;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::auth::AdminAuth;
use crate::messages::Locale;
use crate::store::CouponStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CouponStore>,
    pub auth: AdminAuth,
    pub default_locale: Locale,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch("PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL;")
    });
    Pool::builder().max_size(8).build(manager)
}

pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS coupons (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT '',
            used INTEGER NOT NULL DEFAULT 0,
            used_by TEXT NOT NULL DEFAULT '',
            used_date TEXT NOT NULL DEFAULT '',
            note TEXT NOT NULL DEFAULT '',
            valid_from TEXT NOT NULL DEFAULT '',
            valid_to TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Not unique: callers check for an existing code before inserting.
        CREATE INDEX IF NOT EXISTS idx_coupons_code ON coupons(code);
        "#,
    )
}
