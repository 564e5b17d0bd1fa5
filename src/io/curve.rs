//! Curve JSON export.
//!
//! Curve JSON is the portable representation of a fitted curve:
//! - model number + polynomial (degree, coefficients, equation)
//! - fit diagnostics
//! - a precomputed grid over the fitted flow range for quick plotting

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{FitQuality, FitResult};
use crate::error::AppError;

/// Points in the exported grid.
const GRID_POINTS: usize = 101;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub flow_rate: Vec<f64>,
    pub pressure: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub model_number: String,
    pub degree: usize,
    /// Highest degree first.
    pub coefficients: Vec<f64>,
    pub equation: String,
    pub fit_quality: FitQuality,
    pub grid: CurveGrid,
}

impl CurveFile {
    pub fn new(model_number: &str, fit: &FitResult) -> Self {
        let (flow_rate, pressure) = fit.dense_curve(GRID_POINTS).into_iter().unzip();
        Self {
            tool: "fan".to_string(),
            model_number: model_number.to_string(),
            degree: fit.degree,
            coefficients: fit.coefficients.clone(),
            equation: fit.equation(),
            fit_quality: fit.quality.clone(),
            grid: CurveGrid { flow_rate, pressure },
        }
    }
}

pub fn write_curve_json(path: &Path, model_number: &str, fit: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &CurveFile::new(model_number, fit))
        .map_err(|e| AppError::new(4, format!("Failed to write curve JSON: {e}")))?;
    Ok(())
}
