//! Test database setup
#![allow(dead_code)]

use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Once;

static INIT_SYNC: Once = Once::new();

/// Initialize synchronous global state (hasher, session cache)
fn init_sync_globals() {
    INIT_SYNC.call_once(|| {
        canvass::session::init();
    });
}

/// Opens a fresh in-memory database with every table created.
/// Each call gets its own database, so tests never see each other's rows.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    init_sync_globals();

    let db = canvass::db::connect("sqlite::memory:").await?;
    canvass::db::create_schema(&db).await?;
    canvass::role::ensure_builtin_roles(&db).await?;
    Ok(db)
}
