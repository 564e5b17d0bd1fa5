//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - catalogue records (`Brand`, `FanModel`, `FanSpec`, `DriveTrain`)
//! - measured operating points (`Sample`)
//! - fit outputs (`FitResult`, `FitQuality`) and the persisted `FitArtifact`

pub mod types;

pub use types::*;
