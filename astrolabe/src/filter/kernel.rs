//! Convolution kernel matrix.

use super::Error;

/// A validated rectangular kernel with odd width and height.
///
/// Taps are stored row-major. The center tap is at `(width / 2, height / 2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    taps: Vec<f64>,
    width: usize,
    height: usize,
}

impl Kernel {
    /// Build a kernel from row-major taps.
    pub fn new(width: usize, height: usize, taps: Vec<f64>) -> Result<Self, Error> {
        if width == 0 || height == 0 || taps.is_empty() {
            return Err(Error::EmptyKernel);
        }
        if width.checked_mul(height) != Some(taps.len()) {
            return Err(Error::KernelSizeMismatch {
                width,
                height,
                got: taps.len(),
            });
        }
        if width % 2 == 0 || height % 2 == 0 {
            return Err(Error::EvenKernel { width, height });
        }
        Ok(Self {
            taps,
            width,
            height,
        })
    }

    /// Build a kernel from a 2D coefficient array.
    ///
    /// Every row must have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, Error> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        if width == 0 {
            return Err(Error::EmptyKernel);
        }

        let mut taps = Vec::with_capacity(width * height);
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != width {
                return Err(Error::RaggedKernel {
                    row,
                    expected: width,
                    got: r.len(),
                });
            }
            taps.extend_from_slice(r);
        }

        Self::new(width, height, taps)
    }

    /// The 1x1 kernel `[[1]]`.
    pub fn identity() -> Self {
        Self {
            taps: vec![1.0],
            width: 1,
            height: 1,
        }
    }

    /// A `size`x`size` averaging kernel whose taps sum to one.
    pub fn box_filter(size: usize) -> Result<Self, Error> {
        if size == 0 {
            return Err(Error::EmptyKernel);
        }
        let tap = 1.0 / (size * size) as f64;
        Self::new(size, size, vec![tap; size * size])
    }

    /// A normalized 2D Gaussian kernel.
    ///
    /// Radius is `ceil(3 * sigma)`, capturing 99.7% of the profile. Built as
    /// the outer product of the 1D kernel, so it sums to one.
    pub fn gaussian(sigma: f64) -> Result<Self, Error> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(Error::InvalidKernelParameter(format!(
                "gaussian sigma must be positive and finite, got {sigma}"
            )));
        }

        let too_large = || {
            Error::InvalidKernelParameter(format!("gaussian sigma {sigma} gives a kernel too large to allocate"))
        };
        let radius = (3.0 * sigma).ceil();
        if radius >= usize::MAX as f64 {
            return Err(too_large());
        }
        let radius = radius as usize;
        let size = radius
            .checked_mul(2)
            .and_then(|d| d.checked_add(1))
            .ok_or_else(too_large)?;
        let tap_count = size.checked_mul(size).ok_or_else(too_large)?;

        let mut taps = Vec::new();
        taps.try_reserve_exact(tap_count).map_err(|_| too_large())?;

        let two_sigma_sq = 2.0 * sigma * sigma;

        let mut line: Vec<f64> = (0..size)
            .map(|i| {
                let x = i as f64 - radius as f64;
                (-x * x / two_sigma_sq).exp()
            })
            .collect();
        let sum: f64 = line.iter().sum();
        for v in &mut line {
            *v /= sum;
        }

        for &ky in &line {
            taps.extend(line.iter().map(|&kx| ky * kx));
        }

        Self::new(size, size, taps)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Tap at column `cx`, row `cy`.
    #[inline]
    pub fn get(&self, cx: usize, cy: usize) -> f64 {
        debug_assert!(cx < self.width && cy < self.height);
        self.taps[cy * self.width + cx]
    }

    /// Row `cy` of the kernel.
    #[inline]
    pub fn row(&self, cy: usize) -> &[f64] {
        &self.taps[cy * self.width..(cy + 1) * self.width]
    }

    #[inline]
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// Offsets of the center tap from the top-left corner: `(width / 2, height / 2)`.
    #[inline]
    pub fn center(&self) -> (usize, usize) {
        (self.width / 2, self.height / 2)
    }
}
