//! # voyage-db
//!
//! Storage layer for Voyage. Owns the relational store handle and the engines
//! that keep it consistent:
//! - **repository**: row-level queries (vacations, follow registry)
//! - **images**: image asset lifecycle on local disk or S3
//! - **catalog**: vacation create/update/delete/get
//! - **coordinator**: follow/unfollow with an atomic follower count
//! - **listing**: filtered, paginated projections and statistics

pub mod catalog;
pub mod coordinator;
pub mod health;
pub mod images;
pub mod listing;
pub mod repository;
pub mod storage;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use voyage_common::config::DatabaseConfig;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Shared store handle, cloned into every engine.
#[derive(Clone, Debug)]
pub struct Database {
    pub pool: AnyPool,
}

impl Database {
    /// Connect to the configured store (PostgreSQL or SQLite).
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        tracing::info!("Connecting to database...");
        let mut options = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections);

        // A writer that finds the SQLite lock taken waits instead of failing
        // with `database is locked`.
        if is_sqlite(&config.url) {
            let pragma = format!("PRAGMA busy_timeout = {}", config.busy_timeout_ms);
            options = options.after_connect(move |conn, _meta| {
                let pragma = pragma.clone();
                Box::pin(async move {
                    sqlx::query(pragma.as_str()).execute(conn).await?;
                    Ok(())
                })
            });
        }

        let pool = options.connect(&config.url).await?;
        tracing::info!("Connected to database");

        Ok(Self { pool })
    }

    /// Private in-memory SQLite store with the schema applied.
    ///
    /// A single connection is kept alive for the lifetime of the pool; every
    /// other connection would see its own empty database.
    pub async fn connect_in_memory() -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");
        MIGRATOR.run(&self.pool).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_sqlite(url: &str) -> bool {
    url.starts_with("sqlite:")
}
