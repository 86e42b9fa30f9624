//! Tunneling current-density models.
//!
//! Models are implemented as small, pure, vectorized functions so that fitting
//! code can stay generic over the `CurrentDensityModel` trait.

pub mod bdr;
pub mod model;
pub mod simmons;

pub use bdr::*;
pub use model::*;
pub use simmons::*;

/// Current-density prefactor shared by both variants.
pub const PREFACTOR: f64 = 1e5;

/// Exponential decay constant shared by both variants.
pub const DECAY: f64 = 10.0;

/// Clamp a negative effective barrier to zero.
///
/// NaN passes through unchanged.
#[inline]
pub(crate) fn clamp_barrier(effective: f64) -> f64 {
    if effective < 0.0 { 0.0 } else { effective }
}

/// `A * v * exp(-B * s * sqrt(effective))` for an already clamped barrier.
#[inline]
pub(crate) fn tunneling_current(v: f64, effective: f64, thickness: f64) -> f64 {
    PREFACTOR * v * (-DECAY * thickness * effective.sqrt()).exp()
}
