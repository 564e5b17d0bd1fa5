//! Command-line parsing for the fan curve manager.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! registry, session and fitting code. Handlers live in `crate::app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DriveTrain, FanSpec, Sample};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fan", version, about = "Fan performance data and curve fitting")]
pub struct Cli {
    /// SQLite database file (overrides FANDB_PATH).
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage fan brands.
    #[command(subcommand)]
    Brand(BrandCommand),
    /// Manage fan models.
    #[command(subcommand)]
    Model(ModelCommand),
    /// Edit the performance samples of a model, fit a curve and optionally save it.
    Curve(CurveArgs),
    /// Render a Markdown report for one or more models.
    Report(ReportArgs),
    /// Launch the interactive curve editor.
    Tui(TuiArgs),
}

#[derive(Debug, Subcommand)]
pub enum BrandCommand {
    /// List all brands.
    List,
    /// Add a brand.
    Add { name: String },
    /// Rename a brand.
    Rename { old: String, new: String },
    /// Delete a brand that no fan model uses.
    Delete { name: String },
}

#[derive(Debug, Subcommand)]
pub enum ModelCommand {
    /// List all fan models.
    List,
    /// Show one model with its stored fit.
    Show { model: String },
    /// Add a fan model.
    Add(ModelArgs),
    /// Update a fan model in place.
    Update {
        /// Current model number.
        model: String,
        #[command(flatten)]
        fields: ModelArgs,
    },
    /// Delete a fan model with its samples and fit.
    Delete { model: String },
}

/// Fields of the fan model form.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Model group, e.g. AXF.
    #[arg(long)]
    pub group: String,

    /// Brand name (must already exist).
    #[arg(long)]
    pub brand: String,

    /// Impeller speed in rpm (direct drive: 720, 960, 1440 or 2880; belt: 0-5000).
    #[arg(long)]
    pub speed: u32,

    /// Blade angle in degrees (5-45, step 5).
    #[arg(long = "blade-angle")]
    pub blade_angle: u32,

    #[arg(long, value_enum, default_value_t = DriveTrain::DirectDrive)]
    pub drive: DriveTrain,

    /// Use this model number instead of `{group}-{speed}rpm-{angle}°`.
    #[arg(long = "model-number")]
    pub model_number: Option<String>,
}

impl ModelArgs {
    pub fn spec(&self) -> FanSpec {
        FanSpec {
            group: self.group.clone(),
            brand: self.brand.clone(),
            speed_rpm: self.speed,
            blade_angle_deg: self.blade_angle,
            drive_train: self.drive,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct CurveArgs {
    /// Model number. Prompts with a list when omitted.
    pub model: Option<String>,

    /// Polynomial degree (1-7). Defaults to FANDB_DEFAULT_DEGREE, or the
    /// advised degree with --advise.
    #[arg(short = 'd', long)]
    pub degree: Option<usize>,

    /// Replace the table with the rows of a `flow_rate,pressure` CSV.
    #[arg(long, value_name = "CSV")]
    pub import: Option<PathBuf>,

    /// Append a sample; repeatable.
    #[arg(long = "add", value_name = "FLOW,PRESSURE", value_parser = parse_sample)]
    pub add: Vec<Sample>,

    /// Delete a row by index (after --import and --add); repeatable.
    #[arg(long = "delete", value_name = "INDEX")]
    pub delete: Vec<usize>,

    /// Fit every admissible degree and recommend one by BIC.
    #[arg(long)]
    pub advise: bool,

    /// Save the samples and the fitted curve.
    #[arg(long)]
    pub commit: bool,

    /// Write the samples to CSV.
    #[arg(long = "export-samples", value_name = "CSV")]
    pub export_samples: Option<PathBuf>,

    /// Write the fitted curve (coefficients + grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Model numbers to include, in order.
    #[arg(required = true)]
    pub models: Vec<String>,

    /// Output Markdown file; figures are written next to it.
    #[arg(long, value_name = "MD")]
    pub out: PathBuf,

    #[arg(long, default_value = "Fan Performance Data")]
    pub title: String,

    #[arg(long, default_value = "")]
    pub project: String,

    #[arg(long = "project-number", default_value = "")]
    pub project_number: String,

    #[arg(long = "doc-number", default_value = "")]
    pub doc_number: String,

    #[arg(long, default_value = "")]
    pub customer: String,

    #[arg(long = "prepared-by", default_value = "")]
    pub prepared_by: String,

    /// Revision code shown on the title block and in the revision table.
    #[arg(long, default_value = "0")]
    pub revision: String,

    #[arg(long = "revision-note", default_value = "First issue")]
    pub revision_note: String,

    #[arg(long, default_value = "")]
    pub originator: String,

    #[arg(long, default_value = "")]
    pub reviewed: String,

    #[arg(long, default_value = "")]
    pub engineer: String,
}

#[derive(Debug, Args, Clone, Default)]
pub struct TuiArgs {
    /// Model number to open first.
    #[arg(long)]
    pub model: Option<String>,
}

/// Parse `FLOW,PRESSURE` into a sample.
pub fn parse_sample(text: &str) -> Result<Sample, String> {
    let (flow, pressure) = text
        .split_once(',')
        .ok_or_else(|| format!("expected FLOW,PRESSURE (got '{text}')"))?;
    let num = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{}' is not a finite number", s.trim()))
    };
    Ok(Sample::new(num(flow)?, num(pressure)?))
}
