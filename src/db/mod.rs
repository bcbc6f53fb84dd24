//! Database module for HMIS
//!
//! This module handles database connections, migrations and the per-resource
//! queries used by the API handlers.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::auth::{hash_password, Role};
use crate::config::{AuthConfig, DatabaseConfig};

pub mod queries;

/// Start a transaction that holds SQLite's write lock from its first
/// statement. Concurrent writers queue on the busy timeout instead of
/// failing with SQLITE_BUSY when a read lock is upgraded.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE write_lock SET taken_at = ? WHERE id = 1")
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// A private in-memory database. Every connection to `sqlite::memory:`
    /// opens a fresh database, so the pool is pinned to one connection that
    /// is never reaped.
    pub async fn connect_in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Create the first administrator when the users table is empty.
    /// Returns true if an account was created.
    pub async fn bootstrap_admin(&self, auth: &AuthConfig) -> anyhow::Result<bool> {
        let Some(password) = auth.bootstrap_admin_password.as_deref() else {
            return Ok(false);
        };

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(false);
        }

        let password_hash = hash_password(password)?;
        queries::users::insert_user(
            &self.pool,
            &auth.bootstrap_admin_username,
            &password_hash,
            "System Administrator",
            None,
            Role::Admin,
            None,
        )
        .await?;

        info!(username = %auth.bootstrap_admin_username, "Bootstrap administrator created");
        Ok(true)
    }
}
