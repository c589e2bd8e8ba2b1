// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Converting OTF spectra to antenna temperatures, correcting for receiver
//! drift between the bracketing calibration scans.

use ndarray::prelude::*;
use strum_macros::{Display, EnumIter};

use super::{hots::HotGroups, tsys::TsysEstimate};
use crate::{
    masked::{Masked, MaskedSpectra, MaskedSpectrum},
    spectra::SpectrumBatch,
};

/// How the reference spectrum of an OTF spectrum is formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DriftMethod {
    /// Interpolate the bracketing REF spectra in time.
    #[default]
    #[strum(serialize = "REF-only (method 1)")]
    RefOnly,

    /// Normalise the OTF and REF spectra by time-interpolated HOT spectra
    /// before differencing.
    #[strum(serialize = "HOT-assisted (method 2)")]
    HotAssisted,
}

impl DriftMethod {
    /// The number users know this method by.
    pub fn number(self) -> u8 {
        match self {
            DriftMethod::RefOnly => 1,
            DriftMethod::HotAssisted => 2,
        }
    }
}

impl TryFrom<u8> for DriftMethod {
    type Error = u8;

    fn try_from(n: u8) -> Result<Self, u8> {
        match n {
            1 => Ok(DriftMethod::RefOnly),
            2 => Ok(DriftMethod::HotAssisted),
            _ => Err(n),
        }
    }
}

/// The weights given to the "before" and "after" calibration scans for a
/// spectrum between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationWeights {
    pub before: f64,
    pub after: f64,
}

/// Linear interpolation weights for time `t` between the bracket times `tb`
/// and `ta`. `t` is clamped into the bracket, so the weights are always in
/// [0, 1]. If the bracket has no width, all weight goes to "before".
pub fn interpolation_weights(t: f64, tb: f64, ta: f64) -> InterpolationWeights {
    let span = ta - tb;
    if span.is_nan() || span <= 0.0 {
        return InterpolationWeights {
            before: 1.0,
            after: 0.0,
        };
    }
    let t = t.clamp(tb, ta);
    InterpolationWeights {
        before: (ta - t) / span,
        after: (t - tb) / span,
    }
}

/// The reference used to remove drift.
#[derive(Debug, Clone, Copy)]
pub enum DriftReference<'a> {
    RefOnly,
    HotAssisted(&'a HotGroups),
}

/// Calibrated OTF spectra.
#[derive(Debug, Clone)]
pub struct CalibratedSpectra {
    /// The batch row that each calibrated spectrum came from.
    pub rows: Vec<usize>,

    /// Antenna temperatures \[K\]. One row per entry of `rows`.
    pub antenna_temp: MaskedSpectra,

    /// The effective system temperature of each spectrum \[K\].
    pub tsys_eff: MaskedSpectra,

    /// Valid OTF rows of the mixer whose scan couldn't be calibrated. Ascending.
    pub uncalibrated: Vec<usize>,
}

impl CalibratedSpectra {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Join the calibrated spectra of many OTF blocks. `None` if there are no
    /// blocks.
    pub fn concat(blocks: Vec<CalibratedSpectra>) -> Option<CalibratedSpectra> {
        let num_chans = blocks.first()?.antenna_temp.num_chans();
        let num_rows = blocks.iter().map(|b| b.len()).sum();
        let mut out = CalibratedSpectra {
            rows: Vec::with_capacity(num_rows),
            antenna_temp: Masked::new(
                Array2::zeros((num_rows, num_chans)),
                Array2::from_elem((num_rows, num_chans), false),
            ),
            tsys_eff: Masked::new(
                Array2::zeros((num_rows, num_chans)),
                Array2::from_elem((num_rows, num_chans), false),
            ),
            uncalibrated: vec![],
        };
        for block in blocks {
            out.uncalibrated.extend_from_slice(&block.uncalibrated);
            for (i, &row) in block.rows.iter().enumerate() {
                let i_out = out.rows.len();
                out.antenna_temp
                    .assign_row(i_out, &block.antenna_temp.row(i));
                out.tsys_eff.assign_row(i_out, &block.tsys_eff.row(i));
                out.rows.push(row);
            }
        }
        Some(out)
    }

    /// The mean effective system temperature of every spectrum over a
    /// channel window. `None` for spectra with no valid channels in the
    /// window.
    pub fn mean_tsys_in_window(&self, window: std::ops::Range<usize>) -> Vec<Option<f64>> {
        let num_chans = self.tsys_eff.num_chans();
        let window = window.start.min(num_chans)..window.end.min(num_chans);
        (0..self.len())
            .map(|i| {
                let row = self.tsys_eff.row(i);
                Masked::new(
                    row.data().slice(s![window.clone()]).to_owned(),
                    row.valid().slice(s![window.clone()]).to_owned(),
                )
                .mean()
            })
            .collect()
    }
}

/// Calibrate the OTF spectra in `otf_rows` of the batch against the
/// bracketing system temperature estimates.
///
/// Channels that are invalid in an OTF spectrum, or in any of the spectra it
/// is combined with, or that become degenerate (e.g. a division by zero), are
/// invalid in the output.
pub fn correct_drift(
    batch: &SpectrumBatch,
    otf_rows: &[usize],
    before: &TsysEstimate,
    after: &TsysEstimate,
    reference: DriftReference,
) -> CalibratedSpectra {
    let (tb, ta) = (before.time(), after.time());

    // With HOT spectra, the REF spectra are normalised by the HOT spectrum at
    // their own bracket time.
    let (ref_before, ref_after): (MaskedSpectrum, MaskedSpectrum) = match reference {
        DriftReference::RefOnly => (before.reference.clone(), after.reference.clone()),
        DriftReference::HotAssisted(hots) => (
            &before.reference / &hots.at_time(tb),
            &after.reference / &hots.at_time(ta),
        ),
    };

    let num_chans = batch.num_chans();
    let num_rows = otf_rows.len();
    let mut antenna_temp = Masked::new(
        Array2::zeros((num_rows, num_chans)),
        Array2::from_elem((num_rows, num_chans), false),
    );
    let mut tsys_eff = antenna_temp.clone();

    for (i_out, &i_row) in otf_rows.iter().enumerate() {
        let t = batch.unix_times[i_row];
        let w = interpolation_weights(t, tb, ta);
        let row_tsys = &(&before.tsys * w.before) + &(&after.tsys * w.after);
        let sp_ref = &(&ref_before * w.before) + &(&ref_after * w.after);

        let otf = batch.spectra.row(i_row);
        let otf = match reference {
            DriftReference::RefOnly => otf,
            DriftReference::HotAssisted(hots) => &otf / &hots.for_row(batch, i_row),
        };

        // Ta = 2 Tsys (OTF - REF) / REF
        let ta_row = &(&(&row_tsys * 2.0) * &(&otf - &sp_ref)) / &sp_ref;
        antenna_temp.assign_row(i_out, &ta_row);
        tsys_eff.assign_row(i_out, &row_tsys);
    }

    CalibratedSpectra {
        rows: otf_rows.to_vec(),
        antenna_temp,
        tsys_eff,
        uncalibrated: vec![],
    }
}
