//! Recursive (IIR) Gaussian blur.
//!
//! A fourth-order recursive filter run forwards and backwards along each row
//! approximates a Gaussian whose width is set by the radius. Each pass writes
//! its result transposed, so running the same pass twice (with width and
//! height swapped) blurs both axes and returns the image to its original
//! orientation. Cost per pixel is constant regardless of radius.


use super::{check_dimensions, Error, Sample};

/// Radii below this are clamped before computing coefficients.
const MIN_SIGMA: f64 = 0.5;

/// Recursive filter coefficients for one blur radius.
///
/// `a0, a1` drive the forward (causal) recursion, `a2, a3` the backward one,
/// and `b1, b2` are the feedback terms shared by both. The corner
/// coefficients are the steady-state response to a constant edge value and
/// seed each recursion so that borders do not darken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IirCoefficients {
    pub a0: f32,
    pub a1: f32,
    pub a2: f32,
    pub a3: f32,
    pub b1: f32,
    pub b2: f32,
    pub left_corner: f32,
    pub right_corner: f32,
}

impl IirCoefficients {
    /// Coefficients for a Gaussian of standard deviation `radius`.
    ///
    /// Radii under 0.5 are treated as 0.5.
    pub fn from_radius(radius: f64) -> Self {
        let sigma = radius.max(MIN_SIGMA);

        let alpha = (0.726f64 * 0.726).exp() / sigma;
        let g1 = (-alpha).exp();
        let g2 = (-2.0 * alpha).exp();
        let k = (1.0 - g1) * (1.0 - g1) / (1.0 + 2.0 * alpha * g1 - g2);

        let a0 = k;
        let a1 = k * (alpha - 1.0) * g1;
        let a2 = k * (alpha + 1.0) * g1;
        let a3 = -k * g2;
        let b1 = 2.0 * g1;
        let b2 = -g2;
        let gain = 1.0 - b1 - b2;

        Self {
            a0: a0 as f32,
            a1: a1 as f32,
            a2: a2 as f32,
            a3: a3 as f32,
            b1: b1 as f32,
            b2: b2 as f32,
            left_corner: ((a0 + a1) / gain) as f32,
            right_corner: ((a2 + a3) / gain) as f32,
        }
    }
}

/// Reusable working memory for [`blur_with_scratch`].
///
/// Holds the per-row line buffer and the transposed intermediate image.
/// Buffers grow on demand and are never shrunk.
#[derive(Debug, Default, Clone)]
pub struct BlurScratch {
    line: Vec<f32>,
    transposed: Vec<f32>,
}

impl BlurScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch pre-sized for a `width`x`height` image.
    pub fn with_size(width: usize, height: usize) -> Self {
        let mut scratch = Self::default();
        scratch.prepare(width, height);
        scratch
    }

    fn prepare(&mut self, width: usize, height: usize) {
        let line_len = width.max(height);
        if self.line.len() < line_len {
            self.line.resize(line_len, 0.0);
        }
        let len = width * height;
        if self.transposed.len() < len {
            self.transposed.resize(len, 0.0);
        }
    }
}

/// Blur `buffer` in place with a Gaussian of standard deviation `radius`.
///
/// A zero or NaN radius leaves the buffer untouched. Allocates scratch
/// buffers per call; use [`blur_with_scratch`] to reuse them.
pub fn blur<T: Sample>(buffer: &mut [T], width: usize, height: usize, radius: f64) -> Result<(), Error> {
    let mut scratch = BlurScratch::new();
    blur_with_scratch(buffer, width, height, radius, &mut scratch)
}

/// [`blur`] using caller-provided working memory.
pub fn blur_with_scratch<T: Sample>(
    buffer: &mut [T],
    width: usize,
    height: usize,
    radius: f64,
    scratch: &mut BlurScratch,
) -> Result<(), Error> {
    check_dimensions(buffer.len(), width, height)?;

    if radius == 0.0 || radius.is_nan() {
        return Ok(());
    }
    if radius < 0.0 || radius.is_infinite() {
        return Err(Error::InvalidRadius(radius));
    }
    if buffer.is_empty() {
        return Ok(());
    }

    let coeff = IirCoefficients::from_radius(radius);
    scratch.prepare(width, height);
    let BlurScratch { line, transposed } = scratch;
    let transposed = &mut transposed[..width * height];

    // Horizontal pass into the transposed image, then the same pass over its
    // rows (the original columns) back into the buffer.
    transpose_pass(buffer, transposed, line, &coeff, width, height);
    transpose_pass(transposed, buffer, line, &coeff, height, width);

    Ok(())
}

/// Filter each row of `src` forwards and backwards and write the sum to the
/// matching column of `out`.
///
/// `src` is `width`x`height`; `out` is `height`x`width`.
fn transpose_pass<S: Sample, D: Sample>(
    src: &[S],
    out: &mut [D],
    line: &mut [f32],
    c: &IirCoefficients,
    width: usize,
    height: usize,
) {
    debug_assert_eq!(src.len(), width * height);
    debug_assert_eq!(out.len(), width * height);
    debug_assert!(line.len() >= width);

    for (i, row) in src.chunks_exact(width).enumerate() {
        let first = row[0].to_f32();
        let last = row[width - 1].to_f32();

        // left to right
        let mut prev_src = first;
        let mut prev_prev_out = first * c.left_corner;
        let mut prev_out = prev_prev_out;
        for (slot, sample) in line[..width].iter_mut().zip(row) {
            let curr_src = sample.to_f32();
            let curr_out = curr_src * c.a0 + prev_src * c.a1 + prev_out * c.b1 + prev_prev_out * c.b2;
            prev_prev_out = prev_out;
            prev_out = curr_out;
            prev_src = curr_src;
            *slot = curr_out;
        }

        // right to left; the input lags one sample behind the output index
        let mut prev_src = last;
        let mut curr_src = last;
        let mut prev_prev_out = last * c.right_corner;
        let mut prev_out = prev_prev_out;
        for j in (0..width).rev() {
            let curr_out = curr_src * c.a2 + prev_src * c.a3 + prev_out * c.b1 + prev_prev_out * c.b2;
            prev_prev_out = prev_out;
            prev_out = curr_out;
            prev_src = curr_src;
            curr_src = row[j].to_f32();

            out[j * height + i] = D::from_f32(line[j] + curr_out);
        }
    }
}
