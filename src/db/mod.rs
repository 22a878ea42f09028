//! Persistent storage plumbing supporting both Postgres and SQLite databases.
//!
//! Production deployments point `DATABASE_URL` at Postgres; the test suite
//! runs the same schema and queries against `sqlite::memory:`.

use std::sync::Once;

use chrono::{SecondsFormat, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

/// Re-export of the generic connection pool type.
pub type Pool = AnyPool;

static INSTALL_DRIVERS: Once = Once::new();

/// Create a database agnostic connection pool.
pub async fn connection_pool(url: &str, max_connections: u32) -> Result<Pool, sqlx::Error> {
    INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

    let pool: Pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;

    Ok(pool)
}

/// Create the schema when not existing. The DDL diverges between backends
/// only where identity columns require dialect-specific syntax.
pub async fn init_schema(pool: &Pool, url: &str) -> Result<(), sqlx::Error> {
    let ddl = if url.starts_with("sqlite") {
        include_str!("schema_sqlite.sql")
    } else {
        include_str!("schema_postgres.sql")
    };

    for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Current UTC time as fixed-width RFC 3339 text. Timestamps are stored in
/// this format so lexicographic ordering equals chronological ordering on
/// both backends.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
