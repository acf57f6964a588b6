use thiserror::Error;

use crate::logic::patch::PatchError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures of repository operations. A missing row is not an error here;
/// lookups return `Option` and deletes/patches return whether a row was hit.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid patch document: {0}")]
    InvalidPatch(#[from] PatchError),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
