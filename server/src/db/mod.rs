//! Database pool initialization.
//!
//! SYSTEM CONTEXT
//! ==============
//! The schema (users, sessions, boards) is owned by the application that
//! issues credentials and saves scenes. The hub only reads it, so startup
//! creates the shared SQLx pool and runs no migrations.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Initialize the `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
