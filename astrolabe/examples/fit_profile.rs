//! Example: Measure a synthetic star
//!
//! Renders an elliptical Gaussian star on a small cutout, smooths it, traces
//! the half-maximum isophote along rays from the brightest pixel, fits an
//! ellipse to that isophote and a Gaussian to the radial profile.
//!
//! An optional YAML or JSON analysis config may be passed as the first
//! argument.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example fit_profile -- analysis.yaml
//! ```

use std::env;
use std::time::Instant;

use astrolabe::prelude::*;
use glam::DVec2;

const WIDTH: usize = 96;
const HEIGHT: usize = 72;
const RAYS: usize = 48;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::log_setup::setup_logging("info", "logs", "fit_profile");

    let config = match env::args().nth(1) {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    let mut cutout = render_star(DVec2::new(50.0, 34.0), 6.0, 3.5, 0.4, 1000.0);
    let start = Instant::now();
    blur(&mut cutout, WIDTH, HEIGHT, 1.5)?;
    tracing::info!(elapsed_us = start.elapsed().as_micros(), "Cutout smoothed");

    let (peak_index, peak) = cutout
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, v)| if v > best.1 { (i, v) } else { best });
    let origin = DVec2::new((peak_index % WIDTH) as f64, (peak_index / WIDTH) as f64);

    let isophote = trace_isophote(&cutout, origin, peak * 0.5);
    let fit = fit_robust(&isophote, &config.ellipse)?;
    tracing::info!(
        points = isophote.len(),
        rejected = fit.rejected(isophote.len()),
        iterations = fit.iterations,
        center = ?fit.ellipse.center(),
        semi_major = format!("{:.2}", fit.ellipse.semi_major()),
        semi_minor = format!("{:.2}", fit.ellipse.semi_minor()),
        orientation = format!("{:.3}", fit.ellipse.orientation()),
        "Isophote fitted"
    );

    // Profile along the fitted major axis.
    let center = fit.ellipse.center();
    let (sin, cos) = fit.ellipse.orientation().sin_cos();
    let (radii, flux): (Vec<f64>, Vec<f32>) = (-20..=20)
        .filter_map(|step| {
            let r = step as f64 * 0.5;
            sample(&cutout, center + r * DVec2::new(cos, sin)).map(|v| (r, v))
        })
        .unzip();

    let seed = Gaussian::new(peak as f64, 0.0, fit.ellipse.semi_major());
    let mut fitter = GaussianFitter::new(&radii, &flux, Some(seed), config.gaussian)?;
    let start = Instant::now();
    let profile = fitter.run()?;
    tracing::info!(
        generations = profile.generations,
        converged = profile.converged,
        peak = format!("{:.1}", profile.gaussian.peak),
        fwhm = format!("{:.2}", profile.gaussian.fwhm()),
        elapsed_ms = start.elapsed().as_millis(),
        "Profile fitted"
    );

    Ok(())
}

fn render_star(center: DVec2, sigma_major: f64, sigma_minor: f64, theta: f64, peak: f64) -> Vec<f32> {
    let (st, ct) = theta.sin_cos();
    (0..WIDTH * HEIGHT)
        .map(|i| {
            let d = DVec2::new((i % WIDTH) as f64, (i / WIDTH) as f64) - center;
            let u = (d.x * ct + d.y * st) / sigma_major;
            let v = (-d.x * st + d.y * ct) / sigma_minor;
            (peak * (-0.5 * (u * u + v * v)).exp()) as f32
        })
        .collect()
}

/// Nearest-pixel value, `None` off the cutout.
fn sample(cutout: &[f32], p: DVec2) -> Option<f32> {
    let (x, y) = (p.x.round(), p.y.round());
    if x < 0.0 || y < 0.0 || x >= WIDTH as f64 || y >= HEIGHT as f64 {
        return None;
    }
    Some(cutout[y as usize * WIDTH + x as usize])
}

/// First point along each ray where the cutout drops below `level`.
fn trace_isophote(cutout: &[f32], origin: DVec2, level: f32) -> Vec<DVec2> {
    (0..RAYS)
        .filter_map(|k| {
            let (sin, cos) = (std::f64::consts::TAU * k as f64 / RAYS as f64).sin_cos();
            let direction = DVec2::new(cos, sin);
            (1..200)
                .map(|step| origin + direction * (step as f64 * 0.25))
                .find(|&p| sample(cutout, p).is_none_or(|v| v < level))
        })
        .collect()
}
