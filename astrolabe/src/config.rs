//! Analysis settings as loaded from a YAML or JSON file.

use std::path::{Path, PathBuf};

use common::{FileExtensionError, FileFormat, SerdeFormatError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ellipse::{self, EllipseFitConfig};
use crate::gaussian_fit::{self, GaussianFitConfig};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extension(#[from] FileExtensionError),

    #[error(transparent)]
    Format(#[from] SerdeFormatError),

    #[error(transparent)]
    Ellipse(#[from] ellipse::Error),

    #[error(transparent)]
    GaussianFit(#[from] gaussian_fit::Error),
}

/// Settings for every fitter, each section falling back to its defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub ellipse: EllipseFitConfig,
    pub gaussian: GaussianFitConfig,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.ellipse.validate()?;
        self.gaussian.validate()?;
        Ok(())
    }

    /// Parse and validate `text` in the given format.
    pub fn from_str(text: &str, format: FileFormat) -> Result<Self, Error> {
        let config: Self = common::deserialize(text, format)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let format = FileFormat::from_file_name(&path.to_string_lossy())?;
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_str(&text, format)?;
        tracing::info!(path = %path.display(), "Loaded analysis config");
        Ok(config)
    }

    pub fn to_string(&self, format: FileFormat) -> Result<String, Error> {
        Ok(common::serialize(self, format)?)
    }
}
