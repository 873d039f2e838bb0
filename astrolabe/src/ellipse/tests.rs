use std::f64::consts::FRAC_PI_2;

use glam::DVec2;

use super::*;
use crate::testing::{ellipse_points, jitter};

fn assert_rel(actual: f64, expected: f64, tol: f64) {
    assert!(
        ((actual - expected) / expected).abs() < tol,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// Direct fit
// ============================================================================

#[test]
fn test_axis_aligned_ellipse_recovered() {
    let points = ellipse_points(DVec2::ZERO, 5.0, 3.0, 0.0, 12);

    let mut ellipse = Ellipse::default();
    ellipse.set_from_points(&points).unwrap();

    let [semi_y, semi_x] = ellipse.semi();
    assert_rel(semi_x, 5.0, 1e-6);
    assert_rel(semi_y, 3.0, 1e-6);
    assert!(ellipse.angle().abs() < 1e-9, "angle {}", ellipse.angle());
    assert_eq!(ellipse.b(), 0.0);
    assert!(ellipse.center().length() < 1e-9);
}

#[test]
fn test_rotated_offset_ellipse_recovered() {
    let center = DVec2::new(120.0, 80.0);
    let points = ellipse_points(center, 8.0, 4.0, 0.5, 20);

    let ellipse = Ellipse::fit(&points).unwrap();

    assert_rel(ellipse.semi_major(), 8.0, 1e-6);
    assert_rel(ellipse.semi_minor(), 4.0, 1e-6);
    assert!((ellipse.center() - center).length() < 1e-6);
    assert!((ellipse.orientation() - 0.5).abs() < 1e-6);
    // The stored frame rotation undoes the tilt.
    assert!((ellipse.angle() + 0.5).abs() < 1e-6);
}

#[test]
fn test_orientation_beyond_quarter_turn() {
    // Frame rotation is limited to ±π/4; the major axis lands on the frame's
    // Y axis and orientation accounts for it.
    let points = ellipse_points(DVec2::new(3.0, -2.0), 6.0, 2.0, 1.2, 30);

    let ellipse = Ellipse::fit(&points).unwrap();

    let [semi_y, semi_x] = ellipse.semi();
    assert_rel(semi_y, 6.0, 1e-6);
    assert_rel(semi_x, 2.0, 1e-6);
    assert!((ellipse.angle() - (FRAC_PI_2 - 1.2)).abs() < 1e-6);
    assert!((ellipse.orientation() - 1.2).abs() < 1e-6);
}

#[test]
fn test_negative_orientation() {
    let points = ellipse_points(DVec2::new(-15.0, 7.5), 9.0, 5.0, -0.3, 16);
    let ellipse = Ellipse::fit(&points).unwrap();
    assert!((ellipse.orientation() + 0.3).abs() < 1e-6);
    assert!((ellipse.center() - DVec2::new(-15.0, 7.5)).length() < 1e-6);
}

#[test]
fn test_five_points_determine_ellipse() {
    let points = ellipse_points(DVec2::new(10.0, 20.0), 5.0, 3.0, 0.7, 5);
    let ellipse = Ellipse::fit(&points).unwrap();
    assert_rel(ellipse.semi_major(), 5.0, 1e-6);
    assert_rel(ellipse.semi_minor(), 3.0, 1e-6);
    assert!((ellipse.orientation() - 0.7).abs() < 1e-6);
}

#[test]
fn test_far_from_origin_circle() {
    let points = ellipse_points(DVec2::new(1000.0, 800.0), 8.0, 8.0, 0.0, 16);
    let ellipse = Ellipse::fit(&points).unwrap();
    assert_rel(ellipse.semi_major(), 8.0, 1e-6);
    assert_rel(ellipse.semi_minor(), 8.0, 1e-6);
    assert!((ellipse.center() - DVec2::new(1000.0, 800.0)).length() < 1e-6);
}

#[test]
fn test_normalized_radius() {
    let center = DVec2::new(4.0, -1.0);
    let points = ellipse_points(center, 7.0, 3.0, 0.9, 24);
    let ellipse = Ellipse::fit(&points).unwrap();

    for p in &points {
        assert!((ellipse.normalized_radius(*p) - 1.0).abs() < 1e-6);
    }
    assert!(ellipse.normalized_radius(center) < 1e-6);

    let halfway = center + 0.5 * (points[3] - center);
    assert!((ellipse.normalized_radius(halfway) - 0.5).abs() < 1e-6);
}

#[test]
fn test_coefficients_satisfy_conic_in_frame() {
    let points = ellipse_points(DVec2::new(2.0, 3.0), 4.0, 2.5, 0.2, 10);
    let ellipse = Ellipse::fit(&points).unwrap();
    let [a, b, c, d, e, f] = ellipse.coefficients();
    assert_eq!(b, 0.0);

    let (st, ct) = ellipse.angle().sin_cos();
    let scale = a.abs().max(c.abs());
    for p in &points {
        let x = ct * p.x - st * p.y;
        let y = st * p.x + ct * p.y;
        let residual = a * x * x + c * y * y + d * x + e * y + f;
        assert!(residual.abs() < 1e-6 * scale, "residual {residual}");
    }
}

#[test]
fn test_noisy_points_fit_closely() {
    let points = jitter(&ellipse_points(DVec2::new(40.0, 30.0), 6.0, 3.0, 0.4, 48), 0.02);
    let ellipse = Ellipse::fit(&points).unwrap();
    assert!((ellipse.semi_major() - 6.0).abs() < 0.05);
    assert!((ellipse.semi_minor() - 3.0).abs() < 0.05);
    assert!((ellipse.orientation() - 0.4).abs() < 0.02);
}

// ============================================================================
// Degenerate input
// ============================================================================

#[test]
fn test_too_few_points_rejected() {
    let points = ellipse_points(DVec2::ZERO, 5.0, 3.0, 0.0, 4);
    assert_eq!(Ellipse::fit(&points), Err(Error::TooFewPoints(4)));
    assert_eq!(Ellipse::fit(&[]), Err(Error::TooFewPoints(0)));
}

#[test]
fn test_collinear_points_rejected() {
    let points: Vec<DVec2> = (0..8)
        .map(|i| DVec2::new(i as f64, 2.0 * i as f64 + 1.0))
        .collect();
    assert_eq!(Ellipse::fit(&points), Err(Error::DegeneratePointSet));

    let coincident = vec![DVec2::new(3.0, 4.0); 6];
    assert_eq!(Ellipse::fit(&coincident), Err(Error::DegeneratePointSet));
}

#[test]
fn test_non_finite_point_rejected() {
    let mut points = ellipse_points(DVec2::ZERO, 5.0, 3.0, 0.0, 8);
    points[5].y = f64::NAN;
    assert_eq!(
        Ellipse::fit(&points),
        Err(Error::NonFinitePoint { index: 5 })
    );
}

fn parabola_points() -> Vec<DVec2> {
    (-4..=4)
        .map(|i| DVec2::new(i as f64, (i * i) as f64))
        .collect()
}

#[test]
fn test_parabola_points_report_no_valid_ellipse() {
    assert_eq!(Ellipse::fit(&parabola_points()), Err(Error::NoValidEllipse));
}

#[test]
fn test_parallel_lines_report_no_valid_ellipse() {
    let points: Vec<DVec2> = (0..7)
        .flat_map(|i| {
            let x = i as f64 - 3.0;
            [DVec2::new(x, 1.0), DVec2::new(x, -1.0)]
        })
        .collect();
    assert_eq!(Ellipse::fit(&points), Err(Error::NoValidEllipse));
}

#[test]
fn test_elongated_ellipse_still_fits() {
    let points = ellipse_points(DVec2::new(3.0, -2.0), 40.0, 1.0, 0.2, 64);
    let ellipse = Ellipse::fit(&points).unwrap();
    assert_rel(ellipse.semi_major(), 40.0, 1e-4);
    assert_rel(ellipse.semi_minor(), 1.0, 1e-4);
}

#[test]
fn test_failed_fit_leaves_receiver_unchanged() {
    let good = ellipse_points(DVec2::new(1.0, 1.0), 5.0, 3.0, 0.0, 12);
    let mut ellipse = Ellipse::default();
    ellipse.set_from_points(&good).unwrap();
    let before = ellipse;

    let err = ellipse.set_from_points(&good[..3]).unwrap_err();
    assert_eq!(err, Error::TooFewPoints(3));
    assert_eq!(ellipse, before);
}

#[test]
fn test_zeroed_ellipse_is_not_valid() {
    let ellipse = Ellipse::default();
    assert!(!ellipse.is_valid());
    assert!(ellipse.semi().iter().all(|s| !s.is_finite()));
}

// ============================================================================
// Robust fit
// ============================================================================

fn points_with_outliers() -> Vec<DVec2> {
    let mut points = jitter(&ellipse_points(DVec2::new(40.0, 30.0), 6.0, 3.0, 0.4, 48), 0.02);
    points.extend([
        DVec2::new(49.0, 31.0),
        DVec2::new(38.0, 37.0),
        DVec2::new(41.0, 22.0),
    ]);
    points
}

#[test]
fn test_robust_fit_rejects_outliers() {
    let points = points_with_outliers();

    let plain = Ellipse::fit(&points).unwrap();
    assert!((plain.semi_minor() - 3.0).abs() > 0.5, "outliers should distort the plain fit");

    let robust = fit_robust(&points, &EllipseFitConfig::default()).unwrap();

    assert_eq!(robust.rejected(points.len()), 3);
    assert!(robust.inliers.iter().all(|&i| i < 48));
    assert!(robust.iterations >= 2);

    let ellipse = robust.ellipse;
    assert!((ellipse.semi_major() - 6.0).abs() < 0.05);
    assert!((ellipse.semi_minor() - 3.0).abs() < 0.05);
    assert!((ellipse.center() - DVec2::new(40.0, 30.0)).length() < 0.02);
    assert!((ellipse.orientation() - 0.4).abs() < 0.02);
}

#[test]
fn test_robust_fit_single_iteration_is_plain_fit() {
    let points = points_with_outliers();
    let config = EllipseFitConfig {
        max_iterations: 1,
        ..Default::default()
    };

    let robust = fit_robust(&points, &config).unwrap();

    assert_eq!(robust.iterations, 1);
    assert_eq!(robust.inliers.len(), points.len());
    assert_eq!(robust.ellipse, Ellipse::fit(&points).unwrap());
}

#[test]
fn test_robust_fit_clean_points_keep_all() {
    let points = ellipse_points(DVec2::new(5.0, 5.0), 4.0, 2.0, -0.6, 30);
    let robust = fit_robust(&points, &EllipseFitConfig::default()).unwrap();
    assert_eq!(robust.inliers.len(), 30);
    assert_eq!(robust.iterations, 1);
}

#[test]
fn test_robust_fit_propagates_initial_error() {
    let points = ellipse_points(DVec2::ZERO, 5.0, 3.0, 0.0, 3);
    assert_eq!(
        fit_robust(&points, &EllipseFitConfig::default()),
        Err(Error::TooFewPoints(3))
    );
    assert_eq!(
        fit_robust(&parabola_points(), &EllipseFitConfig::default()),
        Err(Error::NoValidEllipse)
    );
}

#[test]
fn test_robust_config_validation() {
    let bad_clip = EllipseFitConfig {
        clip_factor: 0.0,
        ..Default::default()
    };
    assert!(matches!(bad_clip.validate(), Err(Error::InvalidConfig(_))));

    let bad_iterations = EllipseFitConfig {
        max_iterations: 0,
        ..Default::default()
    };
    assert!(matches!(
        bad_iterations.validate(),
        Err(Error::InvalidConfig(_))
    ));

    assert!(EllipseFitConfig::default().validate().is_ok());
}
