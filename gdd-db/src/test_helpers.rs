//! Test helpers for the section content database.

use crate::{db::GddDbPool, error::DbResult, sqlite_runtime::create_in_memory_pool};

/// Create a migrated in-memory database
pub async fn create_test_pool() -> DbResult<GddDbPool> {
    let pool = create_in_memory_pool(1).await?;
    GddDbPool::run_migrations(&pool).await?;
    Ok(GddDbPool::from_pool(pool))
}
