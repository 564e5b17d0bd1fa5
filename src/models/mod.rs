//! Polynomial model evaluation.
//!
//! Models are implemented as small, pure functions so that the fitter, the
//! plots and the exports all evaluate curves the same way.

pub mod polynomial;

pub use polynomial::*;
