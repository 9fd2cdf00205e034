//! Section content storage.

use chrono::{DateTime, Utc};
use gdd_core::{AllSectionsContent, SectionContent};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Stored content of one section of one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub game_id: String,
    pub section_slug: String,
    pub content: SectionContent,
    /// Starts at 1 and grows by one on every save
    pub version: i64,
    pub last_edited_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Section content repository
pub struct SectionContentRepository;

impl SectionContentRepository {
    /// Content of one section, empty when nothing was saved yet.
    pub async fn get(pool: &SqlitePool, game_id: &str, section_slug: &str) -> DbResult<SectionContent> {
        Ok(Self::get_record(pool, game_id, section_slug)
            .await?
            .map(|record| record.content)
            .unwrap_or_default())
    }

    /// Full record of one section, if it exists.
    pub async fn get_record(
        pool: &SqlitePool,
        game_id: &str,
        section_slug: &str,
    ) -> DbResult<Option<SectionRecord>> {
        let row = sqlx::query_as::<_, SectionRow>(
            "SELECT game_id, section_slug, content, version, last_edited_by, created_at, updated_at
             FROM section_contents
             WHERE game_id = ? AND section_slug = ?",
        )
        .bind(game_id)
        .bind(section_slug)
        .fetch_optional(pool)
        .await?;

        row.map(SectionRecord::try_from).transpose()
    }

    /// Content of every section of a game that has at least one saved field.
    pub async fn get_all(pool: &SqlitePool, game_id: &str) -> DbResult<AllSectionsContent> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT section_slug, content
             FROM section_contents
             WHERE game_id = ?
             ORDER BY section_slug ASC",
        )
        .bind(game_id)
        .fetch_all(pool)
        .await?;

        let mut all = AllSectionsContent::new();
        for (slug, raw) in rows {
            let content: SectionContent = serde_json::from_str(&raw)?;
            if !content.is_empty() {
                all.insert(slug, content);
            }
        }
        Ok(all)
    }

    /// Replace a section's content, creating the row on first save.
    ///
    /// With `expected_version`, the write only happens when the stored version
    /// (0 for a missing row) matches; otherwise [`DbError::VersionConflict`]
    /// is returned and nothing changes. `None` overwrites unconditionally.
    pub async fn save(
        pool: &SqlitePool,
        game_id: &str,
        section_slug: &str,
        content: &SectionContent,
        editor_user_id: &str,
        expected_version: Option<i64>,
    ) -> DbResult<SaveOutcome> {
        let json = serde_json::to_string(content)?;
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        // Take the write lock up front; a deferred read cannot upgrade in WAL mode.
        let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

        let current: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM section_contents WHERE game_id = ? AND section_slug = ?",
        )
        .bind(game_id)
        .bind(section_slug)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(expected) = expected_version {
            let actual = current.unwrap_or(0);
            if actual != expected {
                debug!(
                    game_id,
                    section_slug, expected, actual, "Rejected section save on version mismatch"
                );
                return Err(DbError::VersionConflict { expected, actual });
            }
        }

        let version: i64 = sqlx::query_scalar(
            "INSERT INTO section_contents
                (game_id, section_slug, content, version, last_edited_by, created_at, updated_at)
             VALUES (?, ?, ?, 1, ?, ?, ?)
             ON CONFLICT(game_id, section_slug) DO UPDATE SET
                content = excluded.content,
                version = section_contents.version + 1,
                last_edited_by = excluded.last_edited_by,
                updated_at = excluded.updated_at
             RETURNING version",
        )
        .bind(game_id)
        .bind(section_slug)
        .bind(&json)
        .bind(editor_user_id)
        .bind(now_ms)
        .bind(now_ms)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            game_id,
            section_slug,
            version,
            fields = content.len(),
            "Saved section content"
        );

        Ok(SaveOutcome {
            version,
            updated_at: millis_to_datetime(now_ms)?,
        })
    }

    /// Remove every section of a game. Returns the number of rows deleted.
    pub async fn delete_for_game(pool: &SqlitePool, game_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM section_contents WHERE game_id = ?")
            .bind(game_id)
            .execute(pool)
            .await?;

        let removed = result.rows_affected();
        info!(game_id, removed, "Deleted section content for game");
        Ok(removed)
    }
}

fn millis_to_datetime(ms: i64) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DbError::CorruptRecord(format!("timestamp out of range: {ms}")))
}

#[derive(Debug, sqlx::FromRow)]
struct SectionRow {
    game_id: String,
    section_slug: String,
    content: String,
    version: i64,
    last_edited_by: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SectionRow> for SectionRecord {
    type Error = DbError;

    fn try_from(row: SectionRow) -> Result<Self, Self::Error> {
        Ok(SectionRecord {
            content: serde_json::from_str(&row.content)?,
            created_at: millis_to_datetime(row.created_at)?,
            updated_at: millis_to_datetime(row.updated_at)?,
            game_id: row.game_id,
            section_slug: row.section_slug,
            version: row.version,
            last_edited_by: row.last_edited_by,
        })
    }
}
