//! Image-space filters over flat row-major sample grids.
//!
//! - [`convolution`]: arbitrary 2D kernel convolution, computed in f64.
//! - [`blur`]: recursive (IIR) Gaussian blur whose cost does not depend on radius.

pub mod blur;
pub mod convolution;
pub mod kernel;

use thiserror::Error;

pub use kernel::Kernel;

/// Errors raised while validating filter inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Kernel has no taps")]
    EmptyKernel,

    #[error("Kernel row {row} has {got} taps, expected {expected}")]
    RaggedKernel {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Kernel dimensions must be odd, got {width}x{height}")]
    EvenKernel { width: usize, height: usize },

    #[error("Kernel tap count {got} does not match {width}x{height}")]
    KernelSizeMismatch {
        width: usize,
        height: usize,
        got: usize,
    },

    #[error("Invalid kernel parameter: {0}")]
    InvalidKernelParameter(String),

    #[error("Grid has {got} samples, expected {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        got: usize,
    },

    #[error("Blur radius must be finite and non-negative, got {0}")]
    InvalidRadius(f64),
}

pub(crate) fn check_dimensions(len: usize, width: usize, height: usize) -> Result<(), Error> {
    if width.checked_mul(height) != Some(len) {
        return Err(Error::DimensionMismatch {
            width,
            height,
            got: len,
        });
    }
    Ok(())
}

/// A pixel sample type the blur can read and write.
///
/// Samples widen to `f32` for the recursion. Writing back casts for floating
/// point types; integer types round to nearest and saturate at their range.
pub trait Sample: Copy + Send + Sync + 'static {
    fn to_f32(self) -> f32;
    fn from_f32(value: f32) -> Self;
}

macro_rules! impl_sample_float {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                #[inline]
                fn to_f32(self) -> f32 {
                    self as f32
                }

                #[inline]
                fn from_f32(value: f32) -> Self {
                    value as $t
                }
            }
        )*
    };
}

macro_rules! impl_sample_int {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                #[inline]
                fn to_f32(self) -> f32 {
                    self as f32
                }

                #[inline]
                fn from_f32(value: f32) -> Self {
                    // `as` saturates out-of-range values and maps NaN to zero.
                    value.round() as $t
                }
            }
        )*
    };
}

impl_sample_float!(f32, f64);
impl_sample_int!(u8, u16, u32, i8, i16, i32);
