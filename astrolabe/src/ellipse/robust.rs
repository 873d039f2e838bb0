//! Iterative ellipse refit with outlier rejection.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::{Ellipse, Error, MIN_POINTS};
use crate::math::statistics::{median_mut, percentile_68_mut};

/// Lower bound on the deviation scale used for clipping.
const MIN_DEVIATION: f64 = 1e-6;

/// Configuration for [`fit_robust`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EllipseFitConfig {
    /// Points whose normalized radius is further than `clip_factor` times the
    /// 68th-percentile absolute deviation from the median radius are dropped.
    pub clip_factor: f64,
    /// Maximum number of fits, the initial one included.
    pub max_iterations: usize,
}

impl Default for EllipseFitConfig {
    fn default() -> Self {
        Self {
            clip_factor: 2.4,
            max_iterations: 20,
        }
    }
}

impl EllipseFitConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.clip_factor.is_finite() && self.clip_factor > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "clip_factor must be positive and finite, got {}",
                self.clip_factor
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of [`fit_robust`].
#[derive(Debug, Clone, PartialEq)]
pub struct RobustFit {
    pub ellipse: Ellipse,
    /// Indices into the input of the points used by the final fit.
    pub inliers: Vec<usize>,
    /// Number of fits performed.
    pub iterations: usize,
}

impl RobustFit {
    /// Number of input points rejected as outliers.
    pub fn rejected(&self, total: usize) -> usize {
        total - self.inliers.len()
    }
}

/// Fit an ellipse to `points`, repeatedly dropping outliers and refitting.
///
/// Each round scores points by [`Ellipse::normalized_radius`] and keeps those
/// within `clip_factor` robust deviations of the median. Stops when a round
/// rejects nothing, after `max_iterations` fits, or when a refit would use
/// fewer than five points. A failed refit keeps the previous ellipse.
///
/// Fails only when `config` is invalid or the initial fit fails.
pub fn fit_robust(points: &[DVec2], config: &EllipseFitConfig) -> Result<RobustFit, Error> {
    config.validate()?;

    let mut ellipse = Ellipse::fit(points)?;
    let mut inliers: Vec<usize> = (0..points.len()).collect();
    let mut iterations = 1;

    let mut radii = Vec::with_capacity(points.len());
    let mut scratch = Vec::with_capacity(points.len());
    let mut subset = Vec::with_capacity(points.len());

    while iterations < config.max_iterations {
        radii.clear();
        radii.extend(inliers.iter().map(|&i| ellipse.normalized_radius(points[i])));

        scratch.clear();
        scratch.extend_from_slice(&radii);
        let Some(median) = median_mut(&mut scratch) else {
            break;
        };

        scratch.clear();
        scratch.extend(radii.iter().map(|r| (r - median).abs()));
        let Some(deviation) = percentile_68_mut(&mut scratch) else {
            break;
        };
        let limit = config.clip_factor * deviation.max(MIN_DEVIATION);

        let kept: Vec<usize> = inliers
            .iter()
            .zip(&radii)
            .filter(|(_, r)| (*r - median).abs() <= limit)
            .map(|(&i, _)| i)
            .collect();

        if kept.len() == inliers.len() {
            break;
        }
        if kept.len() < MIN_POINTS {
            tracing::debug!(
                kept = kept.len(),
                "Robust ellipse fit: too few points left after rejection"
            );
            break;
        }

        subset.clear();
        subset.extend(kept.iter().map(|&i| points[i]));
        match Ellipse::fit(&subset) {
            Ok(refit) => ellipse = refit,
            Err(err) => {
                tracing::warn!(%err, kept = kept.len(), "Robust ellipse refit failed");
                break;
            }
        }
        inliers = kept;
        iterations += 1;
    }

    tracing::debug!(
        points = points.len(),
        inliers = inliers.len(),
        iterations,
        "Robust ellipse fit"
    );

    Ok(RobustFit {
        ellipse,
        inliers,
        iterations,
    })
}
