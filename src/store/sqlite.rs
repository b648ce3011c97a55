//! SQLite witness source.
//!
//! Reads the `cbgm` table produced by the database population step:
//!
//! ```sql
//! CREATE TABLE cbgm (variant_unit TEXT, witness TEXT, label TEXT, parent TEXT, ...)
//! ```
//!
//! ## Configuration
//!
//! - `FLOW_DATABASE_URL`: SQLite connection string (e.g. `sqlite:///tmp/cbgm.db`), required
//! - `FLOW_DB_MAX_CONNECTIONS`: Maximum pool size (default: 4)
//! - `FLOW_DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//!
//! Unset or blank pool settings take their defaults; anything else that does
//! not parse is rejected.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::time::Duration;

use crate::config::{parse_number, ConfigError};
use crate::types::{NominalParent, VariantUnit, WitnessRow};
use super::WitnessSource;

/// Configuration for the SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 4).
    pub max_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
}

impl SqliteConfig {
    /// Configuration for `database_url` with default pool settings.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 4,
            connect_timeout_secs: 10,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("FLOW_DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("FLOW_DATABASE_URL"))?;

        let max_connections = parse_number("FLOW_DB_MAX_CONNECTIONS", lookup("FLOW_DB_MAX_CONNECTIONS"), 4)?;
        if max_connections == 0 {
            return Err(ConfigError::invalid("FLOW_DB_MAX_CONNECTIONS", "0", "must be at least 1"));
        }

        Ok(Self {
            database_url,
            max_connections,
            connect_timeout_secs: parse_number(
                "FLOW_DB_CONNECT_TIMEOUT_SECS",
                lookup("FLOW_DB_CONNECT_TIMEOUT_SECS"),
                10,
            )?,
        })
    }

    /// Open the connection pool.
    pub async fn connect(&self) -> Result<SqlitePool, sqlx::Error> {
        tracing::info!(
            database_url = %self.database_url,
            max_connections = self.max_connections,
            connect_timeout_secs = self.connect_timeout_secs,
            "Opening SQLite connection pool"
        );

        SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .connect(&self.database_url)
            .await
    }
}

/// Witness source backed by the `cbgm` table.
#[derive(Debug, Clone)]
pub struct SqliteWitnessSource {
    pool: SqlitePool,
}

impl SqliteWitnessSource {
    /// Wrap an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect using the given configuration.
    pub async fn connect(config: &SqliteConfig) -> Result<Self, sqlx::Error> {
        Ok(Self::new(config.connect().await?))
    }

    /// The underlying pool, shared with the coherence provider.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl WitnessSource for SqliteWitnessSource {
    type Error = sqlx::Error;

    async fn witnesses_for_unit(&self, unit: &VariantUnit) -> Result<Vec<WitnessRow>, Self::Error> {
        let rows = sqlx::query(
            r#"
            SELECT witness, label, parent
            FROM cbgm
            WHERE variant_unit = ?1
            ORDER BY rowid
            "#,
        )
        .bind(unit.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| -> Result<WitnessRow, sqlx::Error> {
                let witness: String = r.try_get("witness")?;
                let label: String = r.try_get("label")?;
                let parent: Option<String> = r.try_get("parent")?;
                Ok(WitnessRow::new(
                    witness,
                    label,
                    NominalParent::from_label(parent.as_deref()),
                ))
            })
            .collect()
    }

    async fn variant_units(&self) -> Result<Vec<VariantUnit>, Self::Error> {
        let rows = sqlx::query(
            r#"
            SELECT variant_unit
            FROM cbgm
            GROUP BY variant_unit
            ORDER BY MIN(rowid)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("variant_unit").map(VariantUnit::new))
            .collect()
    }
}
