#[cfg(test)]
mod tests;

pub mod models;
pub mod queries;

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::debug;

use crate::Result;

pub type DbPool = Pool<Sqlite>;

const SCHEMA: &str = include_str!("schema.sql");

/// Handle to the SQLite store behind all collections.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Opens the database at `path`, creating the file if missing, and
    /// ensures the schema exists.
    #[inline]
    pub async fn connect(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.init().await?;
        debug!("database ready at {path}");
        Ok(database)
    }

    /// Creates tables and unique key indexes. Idempotent; runs on every
    /// startup.
    #[inline]
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
