//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model variants and their parameter records (`ModelKind`, `SimmonsParams`, `BdrParams`)
//! - measured samples (`MeasurementSeries`)
//! - fit outputs (`FitResult`, `FitQuality`, `FitFile`)

pub mod types;

pub use types::*;
