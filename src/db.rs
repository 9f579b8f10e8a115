//! Database connection pool and schema bootstrap.

use crate::orm::{
    answer_options, answers, questions, responses, roles, sessions, surveys, user_roles, users,
};
use once_cell::sync::OnceCell;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Returns the global connection pool.
/// Panics if `init_db` has not completed.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL.get().expect("Database pool is not initialized.")
}

/// Opens a connection to `url`.
/// In-memory SQLite is pinned to one connection, because every pooled
/// connection would otherwise see its own empty database.
pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url.to_owned());
    if url.starts_with("sqlite::memory:") {
        opt.max_connections(1).min_connections(1);
    }
    opt.sqlx_logging(false);
    Database::connect(opt).await
}

/// Connects the global pool and creates missing tables.
/// Panics on failure; the application cannot run without a database.
pub async fn init_db(url: String) {
    let db = connect(&url)
        .await
        .expect("Failed to connect to the database.");
    create_schema(&db)
        .await
        .expect("Failed to create the database schema.");

    if DB_POOL.set(db).is_err() {
        log::warn!("init_db called more than once; keeping the first pool");
    }
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}

/// Creates every table from the entity definitions, parents first.
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, roles::Entity).await?;
    create_table(db, &schema, user_roles::Entity).await?;
    create_table(db, &schema, sessions::Entity).await?;
    create_table(db, &schema, surveys::Entity).await?;
    create_table(db, &schema, questions::Entity).await?;
    create_table(db, &schema, answer_options::Entity).await?;
    create_table(db, &schema, responses::Entity).await?;
    create_table(db, &schema, answers::Entity).await?;

    log::debug!("Database schema verified");
    Ok(())
}
