//! `quake-fusion` library crate.
//!
//! The binary (`quake`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the predictor can be embedded in a long-running service
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod features;
pub mod io;
pub mod math;
pub mod models;
pub mod predict;
pub mod report;
