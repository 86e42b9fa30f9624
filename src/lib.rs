//! `junction-fit` library crate.
//!
//! Fits tunneling-junction current-density models (Simmons, BDR) to measured
//! I-V data with Levenberg–Marquardt and reports parameter covariances.
//!
//! The binary (`jfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the models and the fitting engine are reusable on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
