// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Spectrometer records, as read from a level 0.8 file.


use ndarray::prelude::*;
use strum_macros::{Display, EnumIter, EnumString};

use crate::masked::{MaskedSpectra, MaskedSpectrum};

/// What a spectrometer integration was looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString)]
pub enum ScanType {
    /// Sky reference.
    #[strum(serialize = "REF")]
    Ref,

    /// Heated reference load plus sky.
    #[strum(serialize = "REFHOT")]
    RefHot,

    /// Heated load only.
    #[strum(serialize = "HOT")]
    Hot,

    /// On-the-fly science scan.
    #[strum(serialize = "OTF")]
    Otf,
}

/// All the records of a single file. Each field is a column; every column has
/// the same number of rows.
#[derive(Debug, Clone)]
pub struct SpectrumBatch {
    /// The detector that produced each spectrum.
    pub mixers: Vec<i32>,

    pub scan_ids: Vec<i32>,

    /// `None` if the scan type isn't one we know about. These rows are never
    /// used for calibration.
    pub scan_types: Vec<Option<ScanType>>,

    /// \[seconds since the UNIX epoch\]
    pub unix_times: Vec<f64>,

    /// The physical temperature of the hot load \[K\].
    pub t_hots: Vec<f64>,

    /// Non-zero values indicate a bad spectrum.
    pub row_flags: Vec<i32>,

    /// The flux of every channel of every spectrum. Channels flagged in the
    /// file's channel mask are invalid.
    pub spectra: MaskedSpectra,
}

/// A view of one row of a [`SpectrumBatch`].
#[derive(Debug, Clone, Copy)]
pub struct SpectrumRecord<'a> {
    pub mixer: i32,
    pub scan_id: i32,
    pub scan_type: Option<ScanType>,
    pub unix_time: f64,
    pub t_hot: f64,
    pub row_flag: i32,
    pub flux: ArrayView1<'a, f64>,
    pub channel_valid: ArrayView1<'a, bool>,
}

impl SpectrumRecord<'_> {
    /// Is this row usable at all?
    pub fn is_valid(&self) -> bool {
        self.row_flag == 0
    }

    /// Does this row belong to the mixer, have the scan type and not have a
    /// row flag?
    pub fn matches(&self, mixer: i32, scan_type: ScanType) -> bool {
        self.is_valid() && self.mixer == mixer && self.scan_type == Some(scan_type)
    }
}

impl SpectrumBatch {
    pub fn num_rows(&self) -> usize {
        self.mixers.len()
    }

    pub fn num_chans(&self) -> usize {
        self.spectra.num_chans()
    }

    pub fn record(&self, i_row: usize) -> SpectrumRecord<'_> {
        SpectrumRecord {
            mixer: self.mixers[i_row],
            scan_id: self.scan_ids[i_row],
            scan_type: self.scan_types[i_row],
            unix_time: self.unix_times[i_row],
            t_hot: self.t_hots[i_row],
            row_flag: self.row_flags[i_row],
            flux: self.spectra.data.row(i_row),
            channel_valid: self.spectra.valid.row(i_row),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = SpectrumRecord<'_>> + '_ {
        (0..self.num_rows()).map(|i_row| self.record(i_row))
    }

    /// The unique mixers in this batch, in ascending order.
    pub fn unique_mixers(&self) -> Vec<i32> {
        let mut mixers = self.mixers.clone();
        mixers.sort_unstable();
        mixers.dedup();
        mixers
    }

    /// Get the indices of all valid rows belonging to the mixer and scan type.
    /// If a scan ID is given, only rows with that scan ID are returned.
    pub fn select_rows(&self, mixer: i32, scan_type: ScanType, scan_id: Option<i32>) -> Vec<usize> {
        self.records()
            .enumerate()
            .filter(|(_, r)| r.matches(mixer, scan_type))
            .filter(|(_, r)| scan_id.map(|id| id == r.scan_id).unwrap_or(true))
            .map(|(i_row, _)| i_row)
            .collect()
    }

    /// The number of rows with the scan type, regardless of mixer or flags.
    pub fn count_scan_type(&self, scan_type: ScanType) -> usize {
        self.scan_types
            .iter()
            .filter(|t| **t == Some(scan_type))
            .count()
    }

    /// The channel-wise mean spectrum of the given rows.
    pub fn mean_spectrum(&self, rows: &[usize]) -> MaskedSpectrum {
        self.spectra.mean_over_rows(rows)
    }

    /// The mean time of the given rows. `None` if there are no rows.
    pub fn mean_time(&self, rows: &[usize]) -> Option<f64> {
        mean_of(rows.iter().map(|&i| self.unix_times[i]))
    }

    /// The mean hot-load temperature of the given rows. `None` if there are no
    /// rows.
    pub fn mean_t_hot(&self, rows: &[usize]) -> Option<f64> {
        mean_of(rows.iter().map(|&i| self.t_hots[i]))
    }
}

fn mean_of<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
