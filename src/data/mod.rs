//! Measurement sources other than CSV files on disk.

pub mod synth;

pub use synth::*;
