//! Astrolabe - point-source characterization for astronomical images.
//!
//! This library provides the numerical core used to measure stars and other
//! compact sources:
//! - 2D kernel convolution and a recursive (IIR) Gaussian blur
//! - Direct least-squares ellipse fitting with iterative outlier rejection
//! - A generic genetic optimizer
//! - 1D Gaussian profile fitting built on that optimizer
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use astrolabe::{AnalysisConfig, Ellipse, GaussianFitter, blur};
//!
//! let config = AnalysisConfig::from_file("analysis.yaml")?;
//!
//! // Smooth the cutout before tracing an isophote
//! blur(&mut cutout, width, height, 2.0)?;
//!
//! // Fit the isophote
//! let ellipse = Ellipse::fit(&isophote)?;
//! println!("semi axes {:?} at {:?}", ellipse.semi(), ellipse.center());
//!
//! // Fit the radial profile
//! let mut fitter = GaussianFitter::new(&radii, &flux, None, config.gaussian)?;
//! let fit = fitter.run()?;
//! println!("FWHM {:.2}", fit.gaussian.fwhm());
//! ```

pub mod config;
pub mod ellipse;
pub mod filter;
pub mod gaussian_fit;
pub mod math;
pub mod optimizer;
pub mod wcs;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude;

// ============================================================================
// Filters
// ============================================================================

pub use filter::blur::{blur, blur_with_scratch, BlurScratch, IirCoefficients};
pub use filter::convolution::{convolve, convolve_mirrored};
pub use filter::{Error as FilterError, Kernel, Sample};

// ============================================================================
// Ellipse fitting
// ============================================================================

pub use ellipse::{
    fit_robust,
    Ellipse,
    // Configuration
    EllipseFitConfig,
    Error as EllipseError,
    RobustFit,
};

// ============================================================================
// Optimization
// ============================================================================

pub use optimizer::{
    Candidate, Error as OptimizerError, Optimizer, OptimizerConfig, Problem,
};

// ============================================================================
// Gaussian profile fitting
// ============================================================================

pub use gaussian_fit::{
    Error as GaussianFitError,
    Gaussian,
    // Configuration
    GaussianFitConfig,
    GaussianFit,
    GaussianFitter,
};

// ============================================================================
// Sky coordinates
// ============================================================================

pub use wcs::{sky_center, SkyPosition, WorldCoordinates};

// ============================================================================
// Configuration
// ============================================================================

pub use config::{AnalysisConfig, Error as ConfigError};
