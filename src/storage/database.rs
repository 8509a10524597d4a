use std::path::{Path, PathBuf};
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Embedded schema migrations, applied in order and tracked by number.
const MIGRATIONS: &[(i32, &str, &str)] = &[(
    1,
    "001_usage_views",
    include_str!("../../migrations/001_usage_views.sql"),
)];

/// Connection manager for the local usage mirror.
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open (creating if needed) the mirror at `db_path` and run migrations.
    pub async fn open(db_path: &Path, max_connections: u32) -> Result<Self> {
        info!("Opening usage mirror at: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            path: db_path.to_path_buf(),
        };

        db.run_migrations().await?;

        info!("Usage mirror ready");
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a clone of the connection pool
    pub fn get_pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_database_version().await?;
        debug!("Current mirror schema version: {}", current_version);

        for (number, name, sql) in MIGRATIONS {
            if *number <= current_version {
                debug!("Skipping migration {} (already applied)", name);
                continue;
            }

            info!("Applying migration: {}", name);
            sqlx::query(sql).execute(&self.pool).await.map_err(|e| {
                error!("Failed to apply migration {}: {}", name, e);
                Error::Database(e)
            })?;

            self.update_database_version(*number).await?;
        }

        Ok(())
    }

    pub async fn get_database_version(&self) -> Result<i32> {
        let table_exists = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='app_settings'",
        )
        .fetch_optional(&self.pool)
        .await?
        .is_some();

        if !table_exists {
            return Ok(0);
        }

        let version: Option<String> =
            sqlx::query_scalar("SELECT value FROM app_settings WHERE key = 'database_version'")
                .fetch_optional(&self.pool)
                .await?;

        match version {
            Some(version_str) => version_str.parse().map_err(|e| {
                Error::Database(sqlx::Error::Decode(
                    format!("Invalid database version: {}", e).into(),
                ))
            }),
            None => Ok(0),
        }
    }

    async fn update_database_version(&self, version: i32) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO app_settings (key, value, updated_at) VALUES ('database_version', ?, unixepoch())",
        )
        .bind(version.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Row counts per mirrored view, for `init` and import summaries.
    pub async fn get_statistics(&self) -> Result<MirrorStatistics> {
        Ok(MirrorStatistics {
            query_history: self.count_rows("query_history").await?,
            query_attribution_history: self.count_rows("query_attribution_history").await?,
            cortex_functions_usage: self
                .count_rows("cortex_functions_query_usage_history")
                .await?,
            cortex_analyst_usage: self.count_rows("cortex_analyst_usage_history").await?,
        })
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("Usage mirror connection closed");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorStatistics {
    pub query_history: u64,
    pub query_attribution_history: u64,
    pub cortex_functions_usage: u64,
    pub cortex_analyst_usage: u64,
}
