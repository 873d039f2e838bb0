//! Direct least-squares ellipse fitting (Fitzgibbon et al., 1999).
//!
//! The fit solves the constrained eigenproblem `S·a = λ·C·a` in closed form on
//! 3x3 blocks of the scatter matrix:
//!
//! 1. Shift the points to their centroid and scale them so the mean distance
//!    from it is √2.
//! 2. Accumulate the quartic (`S1`), cubic (`S2`) and quadratic (`S3`)
//!    moment blocks.
//! 3. Reduce to `A = C⁻¹·(S1 + S2·U)` with `U = -S3⁻¹·S2ᵀ`.
//! 4. Take the eigenvector of `A` with the smallest positive discriminant
//!    `4ac - b²` (the only elliptical root), recover `d, e, f` through `U`,
//!    and undo the normalization.
//! 5. Rotate the conic into its own frame so that `b == 0`.
//!
//! [`fit_robust`] wraps the direct fit with iterative outlier rejection.

mod robust;

#[cfg(test)]
mod tests;

use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};

use glam::DVec2;
use thiserror::Error;

use crate::math::DMat3;

pub use robust::{fit_robust, EllipseFitConfig, RobustFit};

/// Fewest points accepted by the fit.
pub const MIN_POINTS: usize = 5;

/// Relative threshold on the point covariance determinant below which a
/// point set is treated as collinear.
const COLLINEAR_EPSILON: f64 = 1e-12;

/// Smallest accepted `(4ac - b²) / (a² + c²)` for the winning root. Anything
/// flatter is a parabola or a pair of lines carried over the origin by
/// rounding.
const MIN_ELLIPTICITY: f64 = 1e-6;

/// Inverse of the ellipse constraint matrix `[[0,0,2],[0,-1,0],[2,0,0]]`.
const CONSTRAINT_INVERSE: DMat3 =
    DMat3::from_rows([0.0, 0.0, 0.5], [0.0, -1.0, 0.0], [0.5, 0.0, 0.0]);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Ellipse fit needs at least {MIN_POINTS} points, got {0}")]
    TooFewPoints(usize),

    #[error("Point {index} has non-finite coordinates")]
    NonFinitePoint { index: usize },

    #[error("Points are collinear or coincident")]
    DegeneratePointSet,

    #[error("Quadratic moment matrix is singular")]
    SingularMoments,

    #[error("No eigenvector of the reduced system describes an ellipse")]
    NoValidEllipse,

    #[error("Invalid ellipse fit config: {0}")]
    InvalidConfig(String),
}

/// An ellipse as conic coefficients in its own rotated frame.
///
/// A point `(x, y)` is mapped into the ellipse frame by rotating it by
/// `angle`: `X = cos·x - sin·y`, `Y = sin·x + cos·y`. In that frame the ellipse
/// is `a·X² + c·Y² + d·X + e·Y + f = 0`; `b` is kept for completeness and is
/// zero after a fit.
///
/// Created zeroed and filled by [`Ellipse::set_from_points`] (or built
/// directly by [`Ellipse::fit`]). A zeroed ellipse is not valid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ellipse {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    angle: f64,
}

impl Ellipse {
    /// Fit an ellipse to `points`.
    pub fn fit(points: &[DVec2]) -> Result<Self, Error> {
        validate_points(points)?;
        let norm = Normalization::from_points(points)?;

        let (s1, s2, s3) = scatter_blocks(points, &norm);
        let Some(s3_inv) = s3.inverse() else {
            tracing::warn!(points = points.len(), "Ellipse fit: singular quadratic moments");
            return Err(Error::SingularMoments);
        };
        let u = -(s3_inv * s2.transpose());
        let reduced = CONSTRAINT_INVERSE * (s1 + s2 * u);

        let Some(abc) = elliptical_root(&reduced) else {
            tracing::warn!(points = points.len(), "Ellipse fit: no elliptical root");
            return Err(Error::NoValidEllipse);
        };
        let def = u.mul_vec(abc);

        let conic = norm.denormalize([abc[0], abc[1], abc[2], def[0], def[1], def[2]]);
        let ellipse = Self::from_conic(conic);
        if !ellipse.is_valid() {
            tracing::warn!(points = points.len(), ?ellipse, "Ellipse fit: degenerate shape");
            return Err(Error::NoValidEllipse);
        }

        tracing::debug!(
            points = points.len(),
            center = ?ellipse.center(),
            semi = ?ellipse.semi(),
            angle = ellipse.angle,
            "Ellipse fit"
        );
        Ok(ellipse)
    }

    /// Replace `self` with the best-fit ellipse through `points`.
    ///
    /// On error `self` is left unchanged.
    pub fn set_from_points(&mut self, points: &[DVec2]) -> Result<(), Error> {
        *self = Self::fit(points)?;
        Ok(())
    }

    /// Rotate a general conic `[a, b, c, d, e, f]` into its own frame.
    fn from_conic([a, b, c, d, e, f]: [f64; 6]) -> Self {
        let t = if b == 0.0 { 0.0 } else { (b / (c - a)).atan() / 2.0 };
        let (st, ct) = t.sin_cos();

        Self {
            a: a * ct * ct - b * ct * st + c * st * st,
            b: 0.0,
            c: a * st * st + b * ct * st + c * ct * ct,
            d: d * ct - e * st,
            e: d * st + e * ct,
            f,
            angle: t,
        }
    }

    #[inline]
    pub fn a(&self) -> f64 {
        self.a
    }

    #[inline]
    pub fn b(&self) -> f64 {
        self.b
    }

    #[inline]
    pub fn c(&self) -> f64 {
        self.c
    }

    #[inline]
    pub fn d(&self) -> f64 {
        self.d
    }

    #[inline]
    pub fn e(&self) -> f64 {
        self.e
    }

    #[inline]
    pub fn f(&self) -> f64 {
        self.f
    }

    /// Rotation from image axes into the ellipse frame, in `[-π/4, π/4]`.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// `[a, b, c, d, e, f]`.
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Semi-axis lengths `[along Y, along X]` of the ellipse frame.
    ///
    /// Non-finite when the coefficients do not describe a real ellipse.
    pub fn semi(&self) -> [f64; 2] {
        let num = self.numerator();
        [
            (num / (4.0 * self.a * self.c * self.c)).sqrt(),
            (num / (4.0 * self.a * self.a * self.c)).sqrt(),
        ]
    }

    fn numerator(&self) -> f64 {
        -4.0 * self.f * self.a * self.c + self.c * self.d * self.d + self.a * self.e * self.e
    }

    /// Center in image coordinates.
    pub fn center(&self) -> DVec2 {
        let x0 = -self.d / (2.0 * self.a);
        let y0 = -self.e / (2.0 * self.c);
        let (st, ct) = self.angle.sin_cos();
        DVec2::new(ct * x0 + st * y0, -st * x0 + ct * y0)
    }

    pub fn semi_major(&self) -> f64 {
        let [sy, sx] = self.semi();
        sx.max(sy)
    }

    pub fn semi_minor(&self) -> f64 {
        let [sy, sx] = self.semi();
        sx.min(sy)
    }

    /// Counter-clockwise angle of the major axis from the image X axis,
    /// in `(-π/2, π/2]`.
    pub fn orientation(&self) -> f64 {
        let [sy, sx] = self.semi();
        let theta = if sx >= sy { -self.angle } else { FRAC_PI_2 - self.angle };
        if theta > FRAC_PI_2 {
            theta - PI
        } else if theta <= -FRAC_PI_2 {
            theta + PI
        } else {
            theta
        }
    }

    /// Elliptical radius of `point`: 1 on the ellipse, 0 at its center.
    pub fn normalized_radius(&self, point: DVec2) -> f64 {
        let [sy, sx] = self.semi();
        let delta = point - self.center();
        let (st, ct) = self.angle.sin_cos();
        let x = (ct * delta.x - st * delta.y) / sx;
        let y = (st * delta.x + ct * delta.y) / sy;
        (x * x + y * y).sqrt()
    }

    /// Whether both semi-axes are finite and positive and the center is finite.
    pub fn is_valid(&self) -> bool {
        self.semi().iter().all(|s| s.is_finite() && *s > 0.0) && self.center().is_finite()
    }
}

// ============================================================================
// Fit internals
// ============================================================================

fn validate_points(points: &[DVec2]) -> Result<(), Error> {
    if points.len() < MIN_POINTS {
        return Err(Error::TooFewPoints(points.len()));
    }
    if let Some(index) = points.iter().position(|p| !p.is_finite()) {
        return Err(Error::NonFinitePoint { index });
    }
    Ok(())
}

/// Similarity transform `p' = scale·(p - mean)` applied before the fit.
#[derive(Debug, Clone, Copy)]
struct Normalization {
    mean: DVec2,
    scale: f64,
}

impl Normalization {
    fn from_points(points: &[DVec2]) -> Result<Self, Error> {
        let n = points.len() as f64;
        let mean = points.iter().copied().sum::<DVec2>() / n;

        let (mut sxx, mut sxy, mut syy, mut dist) = (0.0, 0.0, 0.0, 0.0);
        for p in points {
            let d = *p - mean;
            sxx += d.x * d.x;
            sxy += d.x * d.y;
            syy += d.y * d.y;
            dist += d.length();
        }

        let spread = sxx + syy;
        if spread <= 0.0 || sxx * syy - sxy * sxy <= COLLINEAR_EPSILON * spread * spread {
            return Err(Error::DegeneratePointSet);
        }

        Ok(Self {
            mean,
            scale: SQRT_2 * n / dist,
        })
    }

    #[inline]
    fn apply(&self, p: DVec2) -> DVec2 {
        (p - self.mean) * self.scale
    }

    /// Map a conic fitted in normalized coordinates back to image coordinates.
    fn denormalize(&self, [a, b, c, d, e, f]: [f64; 6]) -> [f64; 6] {
        let s = self.scale;
        let s2 = s * s;
        let DVec2 { x: mx, y: my } = self.mean;
        [
            a * s2,
            b * s2,
            c * s2,
            -2.0 * a * s2 * mx - b * s2 * my + d * s,
            -b * s2 * mx - 2.0 * c * s2 * my + e * s,
            a * s2 * mx * mx + b * s2 * mx * my + c * s2 * my * my - d * s * mx - e * s * my + f,
        ]
    }
}

/// Quartic, cubic and quadratic blocks of the scatter matrix of the design
/// rows `[x², xy, y², x, y, 1]`.
fn scatter_blocks(points: &[DVec2], norm: &Normalization) -> (DMat3, DMat3, DMat3) {
    let mut s1 = DMat3::ZERO;
    let mut s2 = DMat3::ZERO;
    let mut s3 = DMat3::ZERO;

    for p in points {
        let q = norm.apply(*p);
        let quad = [q.x * q.x, q.x * q.y, q.y * q.y];
        let lin = [q.x, q.y, 1.0];
        for i in 0..3 {
            for j in 0..3 {
                s1[(i, j)] += quad[i] * quad[j];
                s2[(i, j)] += quad[i] * lin[j];
                s3[(i, j)] += lin[i] * lin[j];
            }
        }
    }

    (s1, s2, s3)
}

/// The `(a, b, c)` eigenvector of `reduced` with the smallest positive
/// discriminant `4ac - b²`.
///
/// Eigenvalues whose null vector cannot be eliminated stably are skipped. A
/// winner below [`MIN_ELLIPTICITY`] is rejected.
fn elliptical_root(reduced: &DMat3) -> Option<[f64; 3]> {
    let eigenvalues = reduced.eigenvalues()?;

    let (v, cond) = eigenvalues
        .iter()
        .filter_map(|&lambda| reduced.shift_diagonal(lambda).null_vector())
        .map(|v| (v, 4.0 * v[0] * v[2] - v[1] * v[1]))
        .filter(|(_, cond)| *cond > 0.0)
        .min_by(|x, y| x.1.total_cmp(&y.1))?;

    let ellipticity = cond / (v[0] * v[0] + v[2] * v[2]);
    if ellipticity < MIN_ELLIPTICITY {
        tracing::debug!(ellipticity, "Ellipse fit: root is too flat");
        return None;
    }
    Some(v)
}
