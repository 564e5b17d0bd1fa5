//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - edited in-memory by a curve session
//! - persisted by the sample store (samples and fit artifacts as JSON)
//! - exported to CSV/JSON and rendered into reports

use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lowest polynomial degree the fitter accepts.
pub const MIN_DEGREE: usize = 1;

/// Highest polynomial degree the fitter accepts.
pub const MAX_DEGREE: usize = 7;

/// Impeller speeds offered for direct-drive fans (rpm).
pub const DIRECT_DRIVE_SPEEDS: [u32; 4] = [720, 960, 1440, 2880];

/// Upper bound for belt-driven impeller speeds (rpm).
pub const BELT_SPEED_MAX: u32 = 5000;

/// Blade angles offered by the catalogue (degrees).
pub const BLADE_ANGLES: [u32; 9] = [5, 10, 15, 20, 25, 30, 35, 40, 45];

/// Database row id of a fan model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FanId(pub i64);

impl fmt::Display for FanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database row id of a brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrandId(pub i64);

/// A fan manufacturer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

/// How the impeller is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DriveTrain {
    /// Impeller mounted on the motor shaft; speed follows the motor pole count.
    #[value(name = "direct")]
    DirectDrive,
    /// Impeller driven through a belt; any speed up to `BELT_SPEED_MAX`.
    #[value(name = "belt")]
    BeltTransmission,
}

impl DriveTrain {
    /// Human-readable label for terminal output and reports.
    pub fn display_name(self) -> &'static str {
        match self {
            DriveTrain::DirectDrive => "Direct Drive",
            DriveTrain::BeltTransmission => "Belt Transmission",
        }
    }

    /// Stable label used in the database.
    pub fn as_db_str(self) -> &'static str {
        match self {
            DriveTrain::DirectDrive => "direct_drive",
            DriveTrain::BeltTransmission => "belt_transmission",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "direct_drive" => Some(DriveTrain::DirectDrive),
            "belt_transmission" => Some(DriveTrain::BeltTransmission),
            _ => None,
        }
    }

    /// Whether `speed` is a valid impeller speed for this drive train.
    pub fn accepts_speed(self, speed: u32) -> bool {
        match self {
            DriveTrain::DirectDrive => DIRECT_DRIVE_SPEEDS.contains(&speed),
            DriveTrain::BeltTransmission => speed <= BELT_SPEED_MAX,
        }
    }
}

/// The editable attributes of a fan model (everything except identity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanSpec {
    /// Model group, e.g. `AXF`.
    pub group: String,
    /// Brand name (must reference an existing brand).
    pub brand: String,
    /// Impeller speed (rpm).
    pub speed_rpm: u32,
    /// Blade angle (degrees).
    pub blade_angle_deg: u32,
    pub drive_train: DriveTrain,
}

impl FanSpec {
    /// Derive the model number: `{group}-{speed}rpm-{blade_angle}°`.
    pub fn derived_model_number(&self) -> String {
        format!(
            "{}-{}rpm-{}°",
            self.group.trim(),
            self.speed_rpm,
            self.blade_angle_deg
        )
    }

    /// Check the field rules of the model form.
    ///
    /// Returns a user-facing message for the first rule that fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.group.trim().is_empty() {
            return Err("Model group is required.".to_string());
        }
        if self.brand.trim().is_empty() {
            return Err("Brand is required.".to_string());
        }
        if !self.drive_train.accepts_speed(self.speed_rpm) {
            return Err(match self.drive_train {
                DriveTrain::DirectDrive => format!(
                    "Direct drive speed must be one of {:?} rpm (got {}).",
                    DIRECT_DRIVE_SPEEDS, self.speed_rpm
                ),
                DriveTrain::BeltTransmission => format!(
                    "Belt transmission speed must be between 0 and {BELT_SPEED_MAX} rpm (got {}).",
                    self.speed_rpm
                ),
            });
        }
        if !BLADE_ANGLES.contains(&self.blade_angle_deg) {
            return Err(format!(
                "Blade angle must be one of {:?} degrees (got {}).",
                BLADE_ANGLES, self.blade_angle_deg
            ));
        }
        Ok(())
    }
}

/// A stored fan model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanModel {
    pub id: FanId,
    pub model_number: String,
    pub spec: FanSpec,
}

/// One measured operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Volumetric flow rate (m³/s).
    pub flow_rate: f64,
    /// Static pressure (Pa).
    pub pressure: f64,
}

impl Sample {
    pub fn new(flow_rate: f64, pressure: f64) -> Self {
        Self { flow_rate, pressure }
    }

    pub fn is_finite(&self) -> bool {
        self.flow_rate.is_finite() && self.pressure.is_finite()
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub r_squared: f64,
    pub bic: f64,
    pub n: usize,
}

/// Output of a successful polynomial fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub degree: usize,
    /// Coefficients ordered highest degree first.
    pub coefficients: Vec<f64>,
    /// Flow-rate range covered by the fitted samples.
    pub flow_min: f64,
    pub flow_max: f64,
    pub quality: FitQuality,
}

/// Media type of a stored preview image.
///
/// Previews are always rendered as SVG; the type is stored alongside the bytes
/// so a stored row can be rejected when it holds anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Svg,
}

impl MediaType {
    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Svg => "image/svg+xml",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Svg => "svg",
        }
    }

    pub fn from_mime(value: &str) -> Option<Self> {
        match value {
            "image/svg+xml" => Some(MediaType::Svg),
            _ => None,
        }
    }
}

/// A rendered preview of a fit, kept as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

/// The persisted result of a fit. At most one exists per fan model.
#[derive(Debug, Clone, PartialEq)]
pub struct FitArtifact {
    pub degree: usize,
    /// Coefficients ordered highest degree first.
    pub coefficients: Vec<f64>,
    pub equation: String,
    pub preview: Option<PreviewImage>,
    pub fitted_at: DateTime<Utc>,
}
