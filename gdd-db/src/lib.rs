//! gdd-db: SQLite storage for game design document section content.
//!
//! One row per `(game_id, section_slug)`, holding the section's subsection
//! map as JSON together with a version counter used for optimistic saves.

pub mod db;
pub mod error;
pub mod section_contents;
mod sqlite_runtime;

pub use db::GddDbPool;
pub use error::{DbError, DbResult};
pub use section_contents::{SaveOutcome, SectionContentRepository, SectionRecord};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
