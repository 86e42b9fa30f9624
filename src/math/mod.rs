//! Numerical utilities: finite differences, covariance estimation, grids.

pub mod covariance;
pub mod grid;
pub mod jacobian;

pub use covariance::*;
pub use grid::*;
pub use jacobian::*;
