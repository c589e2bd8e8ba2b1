// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Flagging spectrometer pixels that are known to be bad.

use serde::{Deserialize, Serialize};

use crate::{band::BandConfig, masked::MaskedSpectra};

/// The default number of channels either side of a bad range used to
/// interpolate over it.
pub const DEFAULT_SPIKE_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpikeOptions {
    /// Replace the flux of bad ranges with a linear interpolation of their
    /// valid neighbours, rather than leaving them flagged.
    pub interpolate: bool,

    /// How many channels either side of a bad range may be used for the
    /// interpolation.
    pub width: usize,
}

impl Default for SpikeOptions {
    fn default() -> Self {
        SpikeOptions {
            interpolate: false,
            width: DEFAULT_SPIKE_WIDTH,
        }
    }
}

/// Flag the band's bad pixel ranges and every channel at or above its pixel
/// cut in every spectrum.
///
/// If interpolation is requested, each bad range of each spectrum is instead
/// filled from the nearest valid channels within `width` channels of either
/// side. Ranges without any valid neighbour stay flagged. Channels beyond the
/// pixel cut are never interpolated.
pub fn despike(spectra: &mut MaskedSpectra, band: &BandConfig, options: &SpikeOptions) {
    let num_chans = spectra.num_chans();
    let pixel_cut = band.pixel_cut.min(num_chans);
    let ranges: Vec<(usize, usize)> = band
        .bad_pixel_ranges
        .iter()
        .map(|r| (r.start.min(pixel_cut), r.end.min(pixel_cut)))
        .filter(|(lo, hi)| lo < hi)
        .collect();

    for (mut data, mut valid) in spectra
        .data
        .outer_iter_mut()
        .zip(spectra.valid.outer_iter_mut())
    {
        valid
            .slice_mut(ndarray::s![pixel_cut..])
            .fill(false);
        for &(lo, hi) in &ranges {
            valid.slice_mut(ndarray::s![lo..hi]).fill(false);
        }

        if !options.interpolate {
            continue;
        }
        for &(lo, hi) in &ranges {
            let left = (lo.saturating_sub(options.width)..lo)
                .rev()
                .find(|&i| valid[i]);
            let right = (hi..(hi + options.width).min(pixel_cut)).find(|&i| valid[i]);
            let interpolated = |i: usize| -> Option<f64> {
                match (left, right) {
                    (Some(l), Some(r)) => {
                        let frac = (i - l) as f64 / (r - l) as f64;
                        Some(data[l] * (1.0 - frac) + data[r] * frac)
                    }
                    (Some(l), None) => Some(data[l]),
                    (None, Some(r)) => Some(data[r]),
                    (None, None) => None,
                }
            };
            let fill: Vec<(usize, f64)> = (lo..hi)
                .filter_map(|i| interpolated(i).map(|v| (i, v)))
                .collect();
            for (i, v) in fill {
                data[i] = v;
                valid[i] = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::prelude::*;

    use super::*;
    use crate::{
        band::{Band, BandOverrides},
        masked::Masked,
    };

    fn band(ranges: Vec<[usize; 2]>, pixel_cut: usize) -> BandConfig {
        BandOverrides {
            bad_pixel_ranges: Some(ranges),
            pixel_cut: Some(pixel_cut),
            ..Default::default()
        }
        .apply(Band::B1)
        .unwrap()
    }

    fn ramp(num_rows: usize, num_chans: usize) -> MaskedSpectra {
        Masked::from_data(Array2::from_shape_fn((num_rows, num_chans), |(_, c)| {
            c as f64
        }))
    }

    #[test]
    fn ranges_and_cut_are_flagged() {
        let mut spectra = ramp(3, 20);
        despike(&mut spectra, &band(vec![[2, 5], [8, 9]], 15), &SpikeOptions::default());
        for row in spectra.valid().outer_iter() {
            let flagged: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|(_, v)| !**v)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(flagged, vec![2, 3, 4, 8, 15, 16, 17, 18, 19]);
        }
        // Values are untouched.
        assert_abs_diff_eq!(spectra.data()[[1, 3]], 3.0);
    }

    #[test]
    fn default_bands_flag_their_tables() {
        let mut spectra = ramp(1, 1024);
        despike(&mut spectra, &Band::B2.default_config(), &SpikeOptions::default());
        assert!(!spectra.valid()[[0, 20]]);
        assert!(!spectra.valid()[[0, 82]]);
        assert!(spectra.valid()[[0, 83]]);
        assert!(!spectra.valid()[[0, 600]]);
        assert!(spectra.valid()[[0, 599]]);
        assert_eq!(spectra.num_valid(), 600 - 63 - 6 - 5 - 9 - 17 - 8 - 11);
    }

    #[test]
    fn interpolation_over_a_range() {
        let mut spectra = ramp(2, 20);
        // Spike in the middle of a ramp.
        spectra.data.slice_mut(s![.., 5..8]).fill(1000.0);
        let options = SpikeOptions {
            interpolate: true,
            width: 2,
        };
        despike(&mut spectra, &band(vec![[5, 8]], 18), &options);
        for row in 0..2 {
            for c in 5..8 {
                assert!(spectra.valid()[[row, c]]);
                assert_abs_diff_eq!(spectra.data()[[row, c]], c as f64, epsilon = 1e-12);
            }
            assert!(!spectra.valid()[[row, 18]]);
        }
    }

    #[test]
    fn interpolation_needs_neighbours() {
        let mut spectra = ramp(1, 20);
        spectra.valid.slice_mut(s![.., 0..12]).fill(false);
        let options = SpikeOptions {
            interpolate: true,
            width: 2,
        };
        // No valid neighbours at all for the first range; only a right-hand
        // neighbour for the second.
        despike(&mut spectra, &band(vec![[3, 5], [12, 14]], 20), &options);
        assert!(!spectra.valid()[[0, 3]]);
        assert!(!spectra.valid()[[0, 4]]);
        assert!(spectra.valid()[[0, 12]]);
        assert_abs_diff_eq!(spectra.data()[[0, 12]], 14.0);
        assert_abs_diff_eq!(spectra.data()[[0, 13]], 14.0);
    }
}
