//! The `PostgreSQL` pool behind the turn store.
//!
//! Pool sizing comes straight from the `infrastructure` section of the
//! game config. Every turn operation borrows a connection for one
//! statement, so `acquire_timeout_ms` bounds how long a request can wait
//! when all connections are busy.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use wts_core::config::InfrastructureConfig;

use crate::error::DbError;

/// Owns the connection pool for the lifetime of the server.
#[derive(Debug, Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Open a pool to `infra.postgres_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] for a malformed URL and
    /// [`DbError::Postgres`] if no connection can be established.
    pub async fn connect(infra: &InfrastructureConfig) -> Result<Self, DbError> {
        let target: PgConnectOptions = infra
            .postgres_url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("bad postgres_url: {e}")))?;

        let pool = pool_options(infra).connect_with(target).await?;
        tracing::info!(
            max_connections = infra.max_connections,
            acquire_timeout_ms = infra.acquire_timeout_ms,
            "Turn store pool ready"
        );
        Ok(Self { pool })
    }

    /// Create the `turns` table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if a migration fails.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Turn schema up to date");
        Ok(())
    }

    /// The shared pool, for handing to [`PgTurnStore`](crate::PgTurnStore).
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Wait for in-flight statements and close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Turn store pool closed");
    }
}

fn pool_options(infra: &InfrastructureConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(infra.max_connections)
        .acquire_timeout(Duration::from_millis(infra.acquire_timeout_ms))
}
