// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-band instrument parameters.
//!
//! GUSTO has two bands with their own sky temperature and their own set of
//! known-bad spectrometer pixels. Nothing here is global; a [`BandConfig`] is
//! handed to whatever needs it.


use std::{ops::Range, path::Path};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Files from this spectrometer belong to band 2; everything else is band 1.
const BAND_2_FILE_MARKER: &str = "ACS3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum Band {
    /// \[NII\] at 1461 GHz.
    #[strum(serialize = "B1")]
    B1,

    /// \[CII\] at 1900 GHz.
    #[strum(serialize = "B2")]
    B2,
}

impl Band {
    /// Work out which band a level 0.8 file belongs to from its name.
    pub fn from_filename(file: &Path) -> Band {
        let is_band_2 = file
            .file_name()
            .and_then(|f| f.to_str())
            .map(|f| f.contains(BAND_2_FILE_MARKER))
            .unwrap_or(false);
        if is_band_2 {
            Band::B2
        } else {
            Band::B1
        }
    }

    /// The default parameters of this band.
    pub fn default_config(self) -> BandConfig {
        match self {
            Band::B1 => BandConfig {
                band: self,
                line: "NII".to_string(),
                rest_freq_ghz: 1461.131406,
                t_sky: 33.5,
                bad_pixel_ranges: vec![23..50, 65..71, 100..103, 163..170, 198..206, 300..511],
                pixel_cut: 300,
                tsys_window: 200..400,
            },
            Band::B2 => BandConfig {
                band: self,
                line: "CII".to_string(),
                rest_freq_ghz: 1900.5369,
                t_sky: 45.0,
                bad_pixel_ranges: vec![
                    20..83,
                    132..138,
                    200..205,
                    265..274,
                    323..340,
                    399..407,
                    498..509,
                ],
                pixel_cut: 600,
                tsys_window: 200..400,
            },
        }
    }
}

/// Everything about a band needed to calibrate its spectra.
#[derive(Debug, Clone, PartialEq)]
pub struct BandConfig {
    pub band: Band,

    /// The name of the spectral line observed in this band.
    pub line: String,

    /// The rest frequency of the line \[GHz\].
    pub rest_freq_ghz: f64,

    /// The sky temperature at the observed wavelength \[K\].
    pub t_sky: f64,

    /// Spectrometer pixels known to be bad. These are flagged in every
    /// spectrum before calibration.
    pub bad_pixel_ranges: Vec<Range<usize>>,

    /// Every pixel at or above this index is flagged.
    pub pixel_cut: usize,

    /// The channels over which the effective system temperature is averaged
    /// for reporting.
    pub tsys_window: Range<usize>,
}

/// User overrides of a band's defaults. Ranges are given as `[start, end]`
/// pairs; `end` is exclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandOverrides {
    pub t_sky: Option<f64>,
    pub bad_pixel_ranges: Option<Vec<[usize; 2]>>,
    pub pixel_cut: Option<usize>,
    pub tsys_window: Option<[usize; 2]>,
}

impl BandOverrides {
    /// Prefer `self`'s values over `other`'s.
    pub fn merge(self, other: Self) -> Self {
        Self {
            t_sky: self.t_sky.or(other.t_sky),
            bad_pixel_ranges: self.bad_pixel_ranges.or(other.bad_pixel_ranges),
            pixel_cut: self.pixel_cut.or(other.pixel_cut),
            tsys_window: self.tsys_window.or(other.tsys_window),
        }
    }

    /// Apply these overrides to a band's default configuration.
    pub fn apply(&self, band: Band) -> Result<BandConfig, BandConfigError> {
        let mut config = band.default_config();
        if let Some(t_sky) = self.t_sky {
            if !t_sky.is_finite() || t_sky < 0.0 {
                return Err(BandConfigError::SkyTemperature { band, t_sky });
            }
            config.t_sky = t_sky;
        }
        if let Some(ranges) = &self.bad_pixel_ranges {
            config.bad_pixel_ranges = ranges
                .iter()
                .map(|&[start, end]| to_range(band, start, end))
                .collect::<Result<_, _>>()?;
        }
        if let Some(pixel_cut) = self.pixel_cut {
            config.pixel_cut = pixel_cut;
        }
        if let Some([start, end]) = self.tsys_window {
            config.tsys_window = to_range(band, start, end)?;
        }
        Ok(config)
    }
}

fn to_range(band: Band, start: usize, end: usize) -> Result<Range<usize>, BandConfigError> {
    if start > end {
        return Err(BandConfigError::BackwardsRange { band, start, end });
    }
    Ok(start..end)
}

/// The configuration of both bands.
#[derive(Debug, Clone, PartialEq)]
pub struct BandConfigs {
    pub b1: BandConfig,
    pub b2: BandConfig,
}

impl BandConfigs {
    pub fn new(b1: &BandOverrides, b2: &BandOverrides) -> Result<BandConfigs, BandConfigError> {
        Ok(BandConfigs {
            b1: b1.apply(Band::B1)?,
            b2: b2.apply(Band::B2)?,
        })
    }

    pub fn get(&self, band: Band) -> &BandConfig {
        match band {
            Band::B1 => &self.b1,
            Band::B2 => &self.b2,
        }
    }

    /// Get the configuration appropriate for a level 0.8 file.
    pub fn for_file(&self, file: &Path) -> &BandConfig {
        self.get(Band::from_filename(file))
    }
}

impl Default for BandConfigs {
    fn default() -> Self {
        BandConfigs {
            b1: Band::B1.default_config(),
            b2: Band::B2.default_config(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BandConfigError {
    #[error("Band {band}: the sky temperature must be a non-negative number, but got {t_sky}")]
    SkyTemperature { band: Band, t_sky: f64 },

    #[error("Band {band}: the pixel range [{start}, {end}] runs backwards")]
    BackwardsRange { band: Band, start: usize, end: usize },
}
