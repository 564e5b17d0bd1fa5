//! Mathematical utilities: least squares and evaluation grids.

pub mod grid;
pub mod ols;

pub use grid::*;
pub use ols::*;
