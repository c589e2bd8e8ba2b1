// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all pipeline-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::calibrate::CalibrateArgsError;
use crate::{io::GlobError, params::CalibrateError};

/// The *only* publicly visible error from the pipeline.
#[derive(Error, Debug)]
pub enum GustoError {
    /// An error related to calibration arguments.
    #[error("{0}\n\nSee `gusto calibrate --help` for the available arguments.")]
    Calibrate(String),

    /// An error related to band configuration.
    #[error("{0}\n\nBand parameters are set in the band1 and band2 tables of an argument file.")]
    Band(String),

    /// An error related to argument files.
    #[error("{0}")]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<CalibrateArgsError> for GustoError {
    fn from(e: CalibrateArgsError) -> Self {
        let s = e.to_string();
        match e {
            CalibrateArgsError::NoInputDir
            | CalibrateArgsError::NoOutputDir
            | CalibrateArgsError::UnknownLevel(_)
            | CalibrateArgsError::BackwardsLevels { .. }
            | CalibrateArgsError::BadScanRange(_)
            | CalibrateArgsError::InvalidDriftMethod(_) => Self::Calibrate(s),
            CalibrateArgsError::Band(_) => Self::Band(s),
        }
    }
}

impl From<CalibrateError> for GustoError {
    fn from(e: CalibrateError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<GlobError> for GustoError {
    fn from(e: GlobError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<std::io::Error> for GustoError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<toml::ser::Error> for GustoError {
    fn from(e: toml::ser::Error) -> Self {
        Self::ArgFile(format!("Couldn't serialise arguments to toml: {e}"))
    }
}
