//! Persistence of samples and fit artifacts.
//!
//! The curve session only talks to the [`SampleStore`] trait. The SQLite
//! implementation lives on [`Database`], the process-wide persistence handle
//! that is opened once and releases its connection when dropped.

use crate::domain::{FanId, FitArtifact, Sample};
use crate::error::ErrorKind;

pub mod sqlite;

pub use sqlite::Database;

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown fan model id {0}.")]
    UnknownModel(FanId),

    #[error("{entity} '{key}' already exists.")]
    Duplicate { entity: &'static str, key: String },

    #[error("{entity} '{key}' is still in use and cannot be deleted.")]
    InUse { entity: &'static str, key: String },

    #[error("Corrupt stored {what}: {message}")]
    Corrupt { what: &'static str, message: String },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::UnknownModel(_) => ErrorKind::PreconditionViolation,
            StoreError::Duplicate { .. } | StoreError::InUse { .. } => ErrorKind::ValidationWarning,
            StoreError::Corrupt { .. } | StoreError::Sqlite(_) | StoreError::Json(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Record-oriented storage for one fan model's samples and its fit artifact.
///
/// Every call is committed on its own; there is no transaction spanning a
/// `save_samples` and a `replace_fit`.
pub trait SampleStore {
    /// Stored samples in insertion order; empty when none were saved.
    fn load_samples(&self, fan_id: FanId) -> Result<Vec<Sample>, StoreError>;

    /// Replace the stored sample list.
    fn save_samples(&self, fan_id: FanId, samples: &[Sample]) -> Result<(), StoreError>;

    /// Upsert the single fit artifact of the model, overwriting any prior one.
    fn replace_fit(&self, fan_id: FanId, artifact: &FitArtifact) -> Result<(), StoreError>;

    /// The current fit artifact, if one was committed.
    fn load_fit(&self, fan_id: FanId) -> Result<Option<FitArtifact>, StoreError>;
}
