//! Pixel to sky mapping through an external world coordinate system.
//!
//! Projection math lives with whoever parses the image header; this module
//! only defines the seam and the lookups the fitters need.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::ellipse::Ellipse;

/// Equatorial position in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub ra: f64,
    pub dec: f64,
}

impl SkyPosition {
    pub const fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }
}

/// A world coordinate system bound to one image.
pub trait WorldCoordinates {
    /// Sky position of a pixel, or `None` outside the projection's domain.
    fn pixel_to_sky(&self, pixel: DVec2) -> Option<SkyPosition>;

    fn sky_to_pixel(&self, sky: SkyPosition) -> Option<DVec2>;

    /// Whether the underlying header described a usable solution.
    fn is_valid(&self) -> bool;
}

/// Sky position of a fitted ellipse's center.
///
/// `None` when `wcs` is not valid or the center is not finite.
pub fn sky_center<W: WorldCoordinates + ?Sized>(ellipse: &Ellipse, wcs: &W) -> Option<SkyPosition> {
    if !wcs.is_valid() {
        tracing::debug!("Skipping sky lookup: WCS is not valid");
        return None;
    }
    let center = ellipse.center();
    if !center.is_finite() {
        return None;
    }
    wcs.pixel_to_sky(center)
}
