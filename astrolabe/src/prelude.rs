//! Prelude module for convenient imports.
//!
//! Re-exports the types and functions most analyses touch.
//!
//! # Usage
//!
//! ```rust,ignore
//! use astrolabe::prelude::*;
//! ```

// Filters
pub use crate::{blur, convolve, convolve_mirrored, BlurScratch, Kernel};

// Ellipse fitting
pub use crate::{fit_robust, Ellipse, EllipseFitConfig, RobustFit};

// Profile fitting
pub use crate::{Gaussian, GaussianFit, GaussianFitConfig, GaussianFitter};

// Optimization
pub use crate::{Optimizer, OptimizerConfig, Problem};

// Sky coordinates and configuration
pub use crate::{sky_center, AnalysisConfig, SkyPosition, WorldCoordinates};
