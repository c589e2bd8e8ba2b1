// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Calibration software for the GUSTO balloon-borne observatory. Level 0.8
//! spectra of the [NII] and [CII] bands are calibrated to antenna temperatures
//! (level 0.9) with the Y-factor method and a drift correction from
//! bracketing reference scans.
//!
//! <https://www.astro.arizona.edu/gusto/>

pub mod band;
pub mod calibrate;
mod cli;
mod constants;
mod io;
pub mod masked;
mod params;
pub mod spectra;

#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

/// Should progress bars be drawn? This should only ever be enabled by CLI code.
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);

// Re-exports.
pub use band::{Band, BandConfig, BandConfigs};
pub use calibrate::{calibrate_mixer, DriftMethod, MixerCalibration};
pub use cli::{Gusto, GustoError};
pub use masked::{Masked, MaskedSpectra, MaskedSpectrum};
pub use spectra::{ScanType, SpectrumBatch};
