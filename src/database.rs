use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Database manager for persistent state storage
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Initialize database with automatic migrations
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        // An in-memory database lives as long as its single connection
        let in_memory = config.url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        info!(url = %config.url, "Connecting to database");
        let pool = pool_options.connect_with(options).await?;

        let manager = Self { pool };
        if config.auto_migrate {
            manager.migrate().await?;
        }
        Ok(manager)
    }

    /// In-memory database with the schema applied. Used by tests and demos.
    pub async fn in_memory() -> Result<Self> {
        Self::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            auto_migrate: true,
            ..DatabaseConfig::default()
        })
        .await
    }

    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get database pool for queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a transaction that holds the write lock before its first read.
    ///
    /// A deferred transaction upgrades its shared lock on the first write, and
    /// SQLite answers a contended upgrade with `SQLITE_BUSY` instead of waiting.
    /// Writers that read-then-write must start here so they queue on the busy
    /// timeout and see the previous writer's commit.
    pub async fn begin_write(&self) -> sqlx::Result<Transaction<'static, Sqlite>> {
        begin_write(&self.pool).await
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

/// [`DatabaseManager::begin_write`] for code that only holds the pool.
pub async fn begin_write(pool: &SqlitePool) -> sqlx::Result<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE").await
}
