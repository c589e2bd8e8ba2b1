// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Grouping HOT-load spectra in time.
//!
//! HOT scans are interleaved with OTF scans. The gain drift of the receiver
//! between two HOT scans is modelled by linearly interpolating the HOT spectra
//! in time.

use std::collections::BTreeMap;

use log::trace;

use crate::{
    masked::MaskedSpectrum,
    spectra::{ScanType, SpectrumBatch},
};

/// The HOT scans of a single mixer, ordered by time.
#[derive(Debug, Clone)]
pub struct HotGroups {
    /// The scan ID of each group.
    pub scan_ids: Vec<i32>,

    /// The mean time of each group \[UNIX seconds\]. Ascending.
    pub times: Vec<f64>,

    /// The channel-wise mean HOT spectrum of each group.
    pub spectra: Vec<MaskedSpectrum>,

    /// For every row of the batch, the index `g` of the enclosing pair of HOT
    /// groups `(g, g + 1)`.
    pub assignments: Vec<usize>,

    /// Is there a HOT group after the last OTF spectrum of the mixer?
    pub trailing_hot: bool,
}

impl HotGroups {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The index `g` of the pair of groups `(g, g + 1)` enclosing `time`.
    /// Times before the first group use the first pair, and times after the
    /// last group use the last pair. With a single group this is always 0.
    pub fn enclosing_pair(&self, time: f64) -> usize {
        let last_pair = self.len().saturating_sub(2);
        // The number of groups at or before this time.
        let num_before = self.times.partition_point(|&t| t <= time);
        num_before.saturating_sub(1).min(last_pair)
    }

    /// Interpolate the HOT spectrum at `time` between the pair of groups
    /// `(pair, pair + 1)`. The interpolation fraction is clamped to [0, 1], so
    /// this never extrapolates.
    pub fn interpolate(&self, pair: usize, time: f64) -> MaskedSpectrum {
        if pair + 1 >= self.len() {
            return self.spectra[pair.min(self.len() - 1)].clone();
        }
        let (t0, t1) = (self.times[pair], self.times[pair + 1]);
        let frac = if t1 > t0 {
            ((time - t0) / (t1 - t0)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if frac == 0.0 {
            return self.spectra[pair].clone();
        }
        if frac == 1.0 {
            return self.spectra[pair + 1].clone();
        }
        &(&self.spectra[pair] * (1.0 - frac)) + &(&self.spectra[pair + 1] * frac)
    }

    /// The HOT spectrum at `time`, interpolated between its enclosing pair.
    pub fn at_time(&self, time: f64) -> MaskedSpectrum {
        self.interpolate(self.enclosing_pair(time), time)
    }

    /// The HOT spectrum for a row of the batch, interpolated between the
    /// row's assigned pair.
    pub fn for_row(&self, batch: &SpectrumBatch, i_row: usize) -> MaskedSpectrum {
        self.interpolate(self.assignments[i_row], batch.unix_times[i_row])
    }
}

/// Group the mixer's valid HOT spectra by scan ID. `None` if there are no
/// valid HOT spectra.
pub fn group_hots(mixer: i32, batch: &SpectrumBatch) -> Option<HotGroups> {
    let mut rows_by_scan: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for i_row in batch.select_rows(mixer, ScanType::Hot, None) {
        rows_by_scan
            .entry(batch.scan_ids[i_row])
            .or_default()
            .push(i_row);
    }

    let mut groups: Vec<(f64, i32, MaskedSpectrum)> = rows_by_scan
        .into_iter()
        .filter_map(|(scan_id, rows)| {
            let time = batch.mean_time(&rows)?;
            Some((time, scan_id, batch.mean_spectrum(&rows)))
        })
        .collect();
    if groups.is_empty() {
        return None;
    }
    groups.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut scan_ids = Vec::with_capacity(groups.len());
    let mut times = Vec::with_capacity(groups.len());
    let mut spectra = Vec::with_capacity(groups.len());
    for (time, scan_id, spectrum) in groups {
        times.push(time);
        scan_ids.push(scan_id);
        spectra.push(spectrum);
    }

    let last_otf_time = batch
        .select_rows(mixer, ScanType::Otf, None)
        .into_iter()
        .map(|i_row| batch.unix_times[i_row])
        .reduce(f64::max);
    let trailing_hot = match (last_otf_time, times.last()) {
        (Some(otf), Some(&hot)) => hot > otf,
        _ => false,
    };

    let mut hots = HotGroups {
        scan_ids,
        times,
        spectra,
        assignments: vec![],
        trailing_hot,
    };
    hots.assignments = batch
        .unix_times
        .iter()
        .map(|&t| hots.enclosing_pair(t))
        .collect();
    trace!(
        "Mixer {mixer}: {} HOT groups (scans {:?}), trailing HOT: {}",
        hots.len(),
        hots.scan_ids,
        hots.trailing_hot
    );

    Some(hots)
}
