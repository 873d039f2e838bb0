//! Dense 3x3 linear algebra and robust statistics.

pub mod dmat3;
pub mod statistics;

pub use dmat3::DMat3;

/// Gaussian sigma to FWHM conversion factor.
///
/// For a Gaussian distribution, FWHM = 2√(2ln2) × σ ≈ 2.3548 × σ.
pub const SIGMA_TO_FWHM: f64 = 2.354_820_045_030_949;

/// Convert Gaussian sigma to FWHM.
#[inline]
pub fn sigma_to_fwhm(sigma: f64) -> f64 {
    sigma * SIGMA_TO_FWHM
}
