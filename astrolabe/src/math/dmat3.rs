//! Row-major 3x3 matrix of f64 values with the closed-form routines used by
//! the conic fitter.

use std::f64::consts::PI;
use std::ops::{Add, Index, IndexMut, Mul, Neg};

/// Relative threshold below which a determinant or elimination pivot is
/// treated as zero.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Row-major 3x3 matrix of f64 values.
///
/// ```text
/// | m[0] m[1] m[2] |
/// | m[3] m[4] m[5] |
/// | m[6] m[7] m[8] |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DMat3 {
    data: [f64; 9],
}

impl DMat3 {
    pub const ZERO: DMat3 = DMat3 { data: [0.0; 9] };

    #[inline]
    pub const fn identity() -> Self {
        Self {
            data: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }

    #[inline]
    pub const fn from_rows(row0: [f64; 3], row1: [f64; 3], row2: [f64; 3]) -> Self {
        Self {
            data: [
                row0[0], row0[1], row0[2], row1[0], row1[1], row1[2], row2[0], row2[1], row2[2],
            ],
        }
    }

    /// Element at `(row, col)`.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * 3 + col]
    }

    #[inline]
    pub fn row(&self, row: usize) -> [f64; 3] {
        [
            self.data[row * 3],
            self.data[row * 3 + 1],
            self.data[row * 3 + 2],
        ]
    }

    #[inline]
    pub fn transpose(&self) -> DMat3 {
        let d = &self.data;
        DMat3 {
            data: [d[0], d[3], d[6], d[1], d[4], d[7], d[2], d[5], d[8]],
        }
    }

    #[inline]
    pub fn scale(&self, k: f64) -> DMat3 {
        DMat3 {
            data: self.data.map(|v| v * k),
        }
    }

    #[inline]
    pub fn trace(&self) -> f64 {
        self.data[0] + self.data[4] + self.data[8]
    }

    /// `self - lambda * I`.
    #[inline]
    pub fn shift_diagonal(&self, lambda: f64) -> DMat3 {
        let mut out = *self;
        out.data[0] -= lambda;
        out.data[4] -= lambda;
        out.data[8] -= lambda;
        out
    }

    /// Largest absolute entry.
    #[inline]
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0f64, |m, v| m.max(v.abs()))
    }

    #[inline]
    pub fn mul_mat(&self, rhs: &DMat3) -> DMat3 {
        let a = &self.data;
        let b = &rhs.data;
        DMat3 {
            data: [
                a[0] * b[0] + a[1] * b[3] + a[2] * b[6],
                a[0] * b[1] + a[1] * b[4] + a[2] * b[7],
                a[0] * b[2] + a[1] * b[5] + a[2] * b[8],
                a[3] * b[0] + a[4] * b[3] + a[5] * b[6],
                a[3] * b[1] + a[4] * b[4] + a[5] * b[7],
                a[3] * b[2] + a[4] * b[5] + a[5] * b[8],
                a[6] * b[0] + a[7] * b[3] + a[8] * b[6],
                a[6] * b[1] + a[7] * b[4] + a[8] * b[7],
                a[6] * b[2] + a[7] * b[5] + a[8] * b[8],
            ],
        }
    }

    #[inline]
    pub fn mul_vec(&self, v: [f64; 3]) -> [f64; 3] {
        let d = &self.data;
        [
            d[0] * v[0] + d[1] * v[1] + d[2] * v[2],
            d[3] * v[0] + d[4] * v[1] + d[5] * v[2],
            d[6] * v[0] + d[7] * v[1] + d[8] * v[2],
        ]
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        let d = &self.data;
        d[0] * (d[4] * d[8] - d[5] * d[7]) - d[1] * (d[3] * d[8] - d[5] * d[6])
            + d[2] * (d[3] * d[7] - d[4] * d[6])
    }

    /// Matrix inverse, or `None` if singular.
    ///
    /// Singularity is judged relative to the cube of the largest entry, so the
    /// test is independent of the units the matrix was built in.
    pub fn inverse(&self) -> Option<DMat3> {
        let det = self.determinant();
        let scale = self.max_abs();
        if !det.is_finite() || scale == 0.0 || det.abs() <= SINGULAR_EPSILON * scale.powi(3) {
            return None;
        }
        let inv_det = 1.0 / det;
        let d = &self.data;
        Some(DMat3 {
            data: [
                (d[4] * d[8] - d[5] * d[7]) * inv_det,
                (d[2] * d[7] - d[1] * d[8]) * inv_det,
                (d[1] * d[5] - d[2] * d[4]) * inv_det,
                (d[5] * d[6] - d[3] * d[8]) * inv_det,
                (d[0] * d[8] - d[2] * d[6]) * inv_det,
                (d[2] * d[3] - d[0] * d[5]) * inv_det,
                (d[3] * d[7] - d[4] * d[6]) * inv_det,
                (d[1] * d[6] - d[0] * d[7]) * inv_det,
                (d[0] * d[4] - d[1] * d[3]) * inv_det,
            ],
        })
    }

    /// The three eigenvalues via the trigonometric closed form.
    ///
    /// Exact for matrices with real spectra. The determinant argument of
    /// `acos` is clamped to `[-2, 2]` to absorb rounding overshoot. Returns
    /// `None` when the spread `p` is not a positive finite number (a multiple
    /// of the identity, or a matrix whose spectrum is not real).
    pub fn eigenvalues(&self) -> Option<[f64; 3]> {
        let q = self.trace() / 3.0;
        let k = self.shift_diagonal(q);
        let p = (k.mul_mat(&k).trace() / 6.0).sqrt();
        if !p.is_finite() || p <= 0.0 {
            return None;
        }
        let d = k.scale(1.0 / p).determinant().clamp(-2.0, 2.0);
        let phi = (d / 2.0).acos() / 3.0;

        Some([
            q + 2.0 * p * phi.cos(),
            q + 2.0 * p * (phi + 2.0 * PI / 3.0).cos(),
            q + 2.0 * p * (phi + 4.0 * PI / 3.0).cos(),
        ])
    }

    /// Unit vector spanning the null space of a rank-2 matrix.
    ///
    /// Eliminates with the third row, then the second, fixing the first
    /// component to one before normalizing. Returns `None` when either pivot
    /// is negligible relative to the matrix scale, i.e. when the null vector
    /// has no first component or the two rows are dependent.
    pub fn null_vector(&self) -> Option<[f64; 3]> {
        let g = &self.data;
        let tol = SINGULAR_EPSILON * self.max_abs();

        if g[8].abs() <= tol {
            return None;
        }
        let k1 = -g[6] / g[8];
        let k2 = -g[7] / g[8];

        let denom = g[4] + g[5] * k2;
        if denom.abs() <= tol {
            return None;
        }
        let y = -(g[3] + g[5] * k1) / denom;
        let z = k1 + k2 * y;
        let n = (1.0 + y * y + z * z).sqrt();

        let v = [1.0 / n, y / n, z / n];
        v.iter().all(|c| c.is_finite()).then_some(v)
    }
}

impl Default for DMat3 {
    #[inline]
    fn default() -> Self {
        Self::ZERO
    }
}

impl Index<(usize, usize)> for DMat3 {
    type Output = f64;
    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * 3 + col]
    }
}

impl IndexMut<(usize, usize)> for DMat3 {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * 3 + col]
    }
}

impl Add for DMat3 {
    type Output = DMat3;
    #[inline]
    fn add(self, rhs: DMat3) -> DMat3 {
        let mut data = self.data;
        for (a, b) in data.iter_mut().zip(rhs.data.iter()) {
            *a += b;
        }
        DMat3 { data }
    }
}

impl Neg for DMat3 {
    type Output = DMat3;
    #[inline]
    fn neg(self) -> DMat3 {
        self.scale(-1.0)
    }
}

impl Mul for DMat3 {
    type Output = DMat3;
    #[inline]
    fn mul(self, rhs: DMat3) -> DMat3 {
        self.mul_mat(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-10;

    fn sorted(mut v: [f64; 3]) -> [f64; 3] {
        v.sort_by(|a, b| a.total_cmp(b));
        v
    }

    #[test]
    fn test_inverse_round_trips_to_identity() {
        let m = DMat3::from_rows([4.0, 7.0, 2.0], [3.0, 6.0, 1.0], [2.0, 5.0, 3.0]);
        let inv = m.inverse().unwrap();
        let id = m * inv;
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((id.at(r, c) - expected).abs() < EPS, "({r},{c}) = {}", id.at(r, c));
            }
        }
    }

    #[test]
    fn test_inverse_rejects_singular_at_any_scale() {
        let m = DMat3::from_rows([1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [1.0, 0.0, 1.0]);
        assert!(m.inverse().is_none());
        assert!(m.scale(1e9).inverse().is_none());
        assert!(DMat3::ZERO.inverse().is_none());
    }

    #[test]
    fn test_transpose_and_trace() {
        let m = DMat3::from_rows([1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]);
        let t = m.transpose();
        assert_eq!(t.row(0), [1.0, 4.0, 7.0]);
        assert_eq!(t[(2, 1)], 6.0);
        assert_eq!(m.trace(), 15.0);
        assert_eq!(m.shift_diagonal(1.0).trace(), 12.0);
    }

    #[test]
    fn test_eigenvalues_diagonal() {
        let m = DMat3::from_rows([3.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 7.0]);
        let ev = sorted(m.eigenvalues().unwrap());
        assert!((ev[0] + 1.0).abs() < EPS);
        assert!((ev[1] - 3.0).abs() < EPS);
        assert!((ev[2] - 7.0).abs() < EPS);
    }

    #[test]
    fn test_eigenvalues_symmetric() {
        // Eigenvalues of this matrix are 1, 3 and 5.
        let m = DMat3::from_rows([2.0, 1.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.0, 5.0]);
        let ev = sorted(m.eigenvalues().unwrap());
        assert!((ev[0] - 1.0).abs() < 1e-9);
        assert!((ev[1] - 3.0).abs() < 1e-9);
        assert!((ev[2] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_eigenvalues_of_scaled_identity_is_none() {
        assert!(DMat3::identity().scale(5.0).eigenvalues().is_none());
    }

    #[test]
    fn test_null_vector_satisfies_equation() {
        let m = DMat3::from_rows([2.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 4.0]);
        for lambda in m.eigenvalues().unwrap() {
            let g = m.shift_diagonal(lambda);
            let v = g.null_vector().unwrap();
            let r = g.mul_vec(v);
            let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            assert!((norm - 1.0).abs() < EPS);
            for c in r {
                assert!(c.abs() < 1e-8, "residual {c} for lambda {lambda}");
            }
        }
    }

    #[test]
    fn test_null_vector_guards_zero_pivot() {
        let g = DMat3::from_rows([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]);
        assert!(g.null_vector().is_none());

        // Dependent second row.
        let g = DMat3::from_rows([1.0, 0.0, 1.0], [0.0, 0.0, 0.0], [1.0, 0.0, 1.0]);
        assert!(g.null_vector().is_none());
    }
}
