//! Database connection pool and initialization.

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use tracing::info;

use crate::{
    error::{DbError, DbResult},
    sqlite_runtime::create_file_pool,
};

/// Pool wrapper for the section content database
#[derive(Debug, Clone)]
pub struct GddDbPool {
    pool: SqlitePool,
    db_path: Option<PathBuf>,
}

impl GddDbPool {
    /// Open (or create) the database file and run migrations.
    pub async fn open(db_path: &Path) -> DbResult<Self> {
        info!("Initializing database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let pool = create_file_pool(db_path, 5).await?;
        Self::run_migrations(&pool).await?;

        info!("Database initialized");
        Ok(Self {
            pool,
            db_path: Some(db_path.to_path_buf()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// File backing the pool, `None` for in-memory databases.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub(crate) async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;

        info!("Database migrations completed");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Wrap an existing, already migrated pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            db_path: None,
        }
    }
}
