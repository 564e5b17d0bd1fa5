//! `fan-curves` library crate.
//!
//! The binary (`fan`) is a thin wrapper around this library so that:
//!
//! - the registry, session and fitting logic is testable without a terminal
//! - the CLI and the TUI share one workflow (`app::pipeline`)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod registry;
pub mod report;
pub mod session;
pub mod store;
pub mod tui;
