//! Shared workflow used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core steps:
//! open database -> resolve model -> open session -> fit
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::PathBuf;

use tracing::debug;

use crate::config::AppConfig;
use crate::domain::{FanModel, FitArtifact, FitResult};
use crate::error::{AppError, ErrorKind};
use crate::fit::FitError;
use crate::registry::ModelRegistry;
use crate::report::ModelReport;
use crate::session::CurveSession;
use crate::store::{Database, SampleStore};

/// Configuration plus the open database for one process run.
pub struct Workspace {
    pub config: AppConfig,
    pub db: Database,
}

impl Workspace {
    /// Load configuration and open the database, `db_override` taking
    /// precedence over `FANDB_PATH`.
    pub fn open(mut config: AppConfig, db_override: Option<PathBuf>) -> Result<Self, AppError> {
        if let Some(path) = db_override {
            config.db_path = path;
        }
        let db = Database::open(&config.db_path)?;
        debug!(path = %config.db_path.display(), "workspace ready");
        Ok(Self { config, db })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            config: AppConfig {
                db_path: PathBuf::from(":memory:"),
                default_degree: 2,
                log_filter: None,
            },
            db: Database::open_in_memory().expect("in-memory database"),
        }
    }

    pub fn registry(&self) -> ModelRegistry<'_> {
        ModelRegistry::new(&self.db)
    }

    pub fn open_session(&self, model_number: &str) -> Result<CurveSession, AppError> {
        let model = self.registry().resolve(model_number)?;
        Ok(CurveSession::open(&self.db, model)?)
    }

    /// The committed fit of `model`, if any.
    pub fn stored_fit(&self, model: &FanModel) -> Result<Option<FitArtifact>, AppError> {
        Ok(self.db.load_fit(model.id)?)
    }

    /// Gather stored data of each model for a report, in the given order.
    pub fn model_reports(&self, model_numbers: &[String]) -> Result<Vec<ModelReport>, AppError> {
        let registry = self.registry();
        model_numbers
            .iter()
            .map(|number| {
                let model = registry.resolve(number)?;
                let samples = self.db.load_samples(model.id)?;
                let fit = self.db.load_fit(model.id)?;
                Ok(ModelReport { model, samples, fit })
            })
            .collect()
    }
}

/// Fit the session's current table for display.
///
/// User-recoverable failures (too few samples) come back as `Ok(Err(message))`
/// so front-ends can show them without aborting.
pub fn preview(session: &CurveSession, degree: usize) -> Result<Result<FitResult, String>, AppError> {
    match session.preview_fit(degree) {
        Ok(fit) => Ok(Ok(fit)),
        Err(err) if is_recoverable(&err) => Ok(Err(err.to_string())),
        Err(err) => Err(err.into()),
    }
}

fn is_recoverable(err: &FitError) -> bool {
    matches!(err.kind(), ErrorKind::ValidationWarning | ErrorKind::IllConditioned)
}
