//! Editable sample table for one fan model.
//!
//! A [`CurveSession`] is a plain value owned by the caller. It loads the stored
//! samples of a model, accepts row edits in memory and, on commit, fits the
//! current table and writes samples and fit artifact back to a [`SampleStore`].
//!
//! The commit performs two independent writes (samples, then fit). There is no
//! rollback: when the second write fails the stored samples are newer than the
//! stored fit until the commit is retried. This is logged and reported as
//! [`SessionError::FitNotPersisted`].

use tracing::{info, warn};

use crate::domain::{FanModel, FitResult, Sample};
use crate::error::ErrorKind;
use crate::fit::{FitError, fit};
use crate::plot::{PreviewError, render_preview};
use crate::store::{SampleStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Row {index} is out of range (table has {len} rows).")]
    RowOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error("Samples were saved but the fit was not ({0}). Commit again to bring them back in sync.")]
    FitNotPersisted(#[source] StoreError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::RowOutOfRange { .. } => ErrorKind::PreconditionViolation,
            SessionError::Fit(e) => e.kind(),
            SessionError::Store(e) => e.kind(),
            SessionError::Preview(_) | SessionError::FitNotPersisted(_) => ErrorKind::Internal,
        }
    }
}

/// Table column of a sample row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    FlowRate,
    Pressure,
}

impl Column {
    pub fn title(self) -> &'static str {
        match self {
            Column::FlowRate => "Flow Rate (m³/s)",
            Column::Pressure => "Pressure (Pa)",
        }
    }
}

/// One editable row. Cells are `None` while missing or unparseable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleRow {
    pub flow_rate: Option<f64>,
    pub pressure: Option<f64>,
}

impl SampleRow {
    pub fn new(flow_rate: f64, pressure: f64) -> Self {
        Self {
            flow_rate: Some(flow_rate),
            pressure: Some(pressure),
        }
    }

    pub fn get(&self, column: Column) -> Option<f64> {
        match column {
            Column::FlowRate => self.flow_rate,
            Column::Pressure => self.pressure,
        }
    }

    /// The row as a sample, if both cells hold finite numbers.
    pub fn sample(&self) -> Option<Sample> {
        let s = Sample::new(self.flow_rate?, self.pressure?);
        s.is_finite().then_some(s)
    }
}

impl From<Sample> for SampleRow {
    fn from(s: Sample) -> Self {
        SampleRow::new(s.flow_rate, s.pressure)
    }
}

/// Coerce a cell's text to a number; blank, unparseable or non-finite text is
/// a missing cell.
pub fn parse_cell(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// In-memory working set of samples for one fan model.
#[derive(Debug, Clone)]
pub struct CurveSession {
    model: FanModel,
    rows: Vec<SampleRow>,
    dirty: bool,
}

impl CurveSession {
    /// Load the stored samples of `model`.
    pub fn open(store: &impl SampleStore, model: FanModel) -> Result<Self, SessionError> {
        let rows = load_rows(store, &model)?;
        Ok(Self {
            model,
            rows,
            dirty: false,
        })
    }

    /// Move the session to another model. Unsaved edits are dropped.
    pub fn switch_to(&mut self, store: &impl SampleStore, model: FanModel) -> Result<(), SessionError> {
        if self.dirty {
            info!(from = %self.model.model_number, to = %model.model_number, "discarding unsaved edits");
        }
        // Load first so a failed switch leaves the current session intact.
        let rows = load_rows(store, &model)?;
        self.model = model;
        self.rows = rows;
        self.dirty = false;
        Ok(())
    }

    /// Throw away unsaved edits and reload from the store.
    pub fn discard(&mut self, store: &impl SampleStore) -> Result<(), SessionError> {
        self.rows = load_rows(store, &self.model)?;
        self.dirty = false;
        Ok(())
    }

    pub fn model(&self) -> &FanModel {
        &self.model
    }

    pub fn rows(&self) -> &[SampleRow] {
        &self.rows
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn add_row(&mut self, flow_rate: f64, pressure: f64) {
        self.push_row(SampleRow::new(flow_rate, pressure));
    }

    /// Append a row that may still have missing cells.
    pub fn push_row(&mut self, row: SampleRow) {
        self.rows.push(row);
        self.dirty = true;
    }

    /// Replace the whole table (e.g. after a CSV import).
    pub fn replace_rows(&mut self, rows: Vec<SampleRow>) {
        self.rows = rows;
        self.dirty = true;
    }

    /// Overwrite the given cells of row `index`; `None` leaves a cell unchanged.
    pub fn edit_row(
        &mut self,
        index: usize,
        flow_rate: Option<f64>,
        pressure: Option<f64>,
    ) -> Result<(), SessionError> {
        let row = self.row_mut(index)?;
        if let Some(v) = flow_rate {
            row.flow_rate = Some(v);
        }
        if let Some(v) = pressure {
            row.pressure = Some(v);
        }
        self.dirty = true;
        Ok(())
    }

    /// Set one cell from user text; text that is not a number clears the cell.
    pub fn set_cell(&mut self, index: usize, column: Column, text: &str) -> Result<(), SessionError> {
        let value = parse_cell(text);
        let row = self.row_mut(index)?;
        match column {
            Column::FlowRate => row.flow_rate = value,
            Column::Pressure => row.pressure = value,
        }
        self.dirty = true;
        Ok(())
    }

    pub fn delete_row(&mut self, index: usize) -> Result<SampleRow, SessionError> {
        self.check_index(index)?;
        self.dirty = true;
        Ok(self.rows.remove(index))
    }

    /// Complete rows in table order. Incomplete rows are skipped silently.
    pub fn samples(&self) -> Vec<Sample> {
        self.rows.iter().filter_map(SampleRow::sample).collect()
    }

    /// Fit the current table without persisting anything.
    pub fn preview_fit(&self, degree: usize) -> Result<FitResult, FitError> {
        fit(&self.samples(), degree)
    }

    /// Fit the current table and persist samples and fit artifact.
    ///
    /// Nothing is written when the fit or the preview fails.
    pub fn commit_fit(&mut self, store: &impl SampleStore, degree: usize) -> Result<FitResult, SessionError> {
        let samples = self.samples();
        let result = fit(&samples, degree)?;
        let preview = render_preview(&samples, &result)?;
        let artifact = result.to_artifact(Some(preview));

        store.save_samples(self.model.id, &samples)?;
        if let Err(err) = store.replace_fit(self.model.id, &artifact) {
            warn!(
                model = %self.model.model_number,
                error = %err,
                "samples saved but fit artifact was not; stored fit is stale"
            );
            return Err(SessionError::FitNotPersisted(err));
        }

        self.dirty = false;
        info!(
            model = %self.model.model_number,
            degree,
            n = samples.len(),
            equation = %artifact.equation,
            "committed fit"
        );
        Ok(result)
    }

    fn check_index(&self, index: usize) -> Result<(), SessionError> {
        if index < self.rows.len() {
            Ok(())
        } else {
            Err(SessionError::RowOutOfRange {
                index,
                len: self.rows.len(),
            })
        }
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut SampleRow, SessionError> {
        self.check_index(index)?;
        Ok(&mut self.rows[index])
    }
}

fn load_rows(store: &impl SampleStore, model: &FanModel) -> Result<Vec<SampleRow>, SessionError> {
    Ok(store
        .load_samples(model.id)?
        .into_iter()
        .map(SampleRow::from)
        .collect())
}
