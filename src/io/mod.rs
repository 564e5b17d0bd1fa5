//! Input/output helpers.
//!
//! - CSV import of sample tables (`ingest`)
//! - CSV export of samples (`export`)
//! - curve JSON export (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
