//! Curve fitting.
//!
//! Responsibilities:
//!
//! - least-squares polynomial fit of pressure against flow rate
//! - display formatting of the fitted equation
//! - degree recommendation using BIC + guardrails

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
