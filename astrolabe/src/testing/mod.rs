#![allow(dead_code)]

//! Synthetic data generators shared by unit tests.

use glam::DVec2;

/// `n` points evenly spaced in parameter around an ellipse whose major axis
/// is rotated counter-clockwise by `theta`.
pub fn ellipse_points(center: DVec2, semi_major: f64, semi_minor: f64, theta: f64, n: usize) -> Vec<DVec2> {
    let (st, ct) = theta.sin_cos();
    (0..n)
        .map(|i| {
            let (sp, cp) = (std::f64::consts::TAU * i as f64 / n as f64).sin_cos();
            let (u, v) = (semi_major * cp, semi_minor * sp);
            center + DVec2::new(u * ct - v * st, u * st + v * ct)
        })
        .collect()
}

/// Deterministic pseudo-noise of magnitude `amplitude` added to each point.
pub fn jitter(points: &[DVec2], amplitude: f64) -> Vec<DVec2> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let i = i as f64;
            *p + amplitude * DVec2::new((i * 12.9898 + 1.0).sin(), (i * 78.233).cos())
        })
        .collect()
}

/// Samples of `peak * exp(-0.5 * ((x - mu) / sigma)^2)` at each `x`.
pub fn gaussian_profile(peak: f64, mu: f64, sigma: f64, xs: &[f64]) -> Vec<f64> {
    xs.iter()
        .map(|&x| {
            let z = (x - mu) / sigma;
            peak * (-0.5 * z * z).exp()
        })
        .collect()
}
