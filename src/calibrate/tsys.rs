// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! System temperatures from the Y-factor method.
//!
//! Each OTF scan is bracketed by calibration scans; a calibration scan has REF
//! spectra (looking at the sky) and REFHOT spectra (looking at the sky and the
//! hot load) sharing one scan ID. For a hot load at physical temperature
//! `T_hot`, sky temperature `T_sky` and `Y = REFHOT / REF`,
//!
//! `T_sys = (T_hot - T_sky * Y) / (Y - 1)`.

use itertools::Itertools;
use log::trace;

use super::classify::{classify_scans, ScanGroups};
use crate::{
    masked::MaskedSpectrum,
    spectra::{ScanType, SpectrumBatch},
};

/// Everything derived from one calibration scan.
#[derive(Debug, Clone)]
pub struct TsysEstimate {
    /// The scan ID of the REF and REFHOT spectra.
    pub scan_id: i32,

    /// The mean REF spectrum.
    pub reference: MaskedSpectrum,

    /// The mean REFHOT spectrum.
    pub ref_hot: MaskedSpectrum,

    /// The mean physical temperature of the hot load during the REFHOT
    /// spectra \[K\].
    pub t_hot: f64,

    /// The mean time of the REF spectra \[UNIX seconds\].
    pub ref_time: f64,

    /// The mean time of the REFHOT spectra \[UNIX seconds\].
    pub ref_hot_time: f64,

    /// REFHOT / REF.
    pub y_factor: MaskedSpectrum,

    /// The system temperature spectrum \[K\]. Channels where the Y factor is 1
    /// are invalid.
    pub tsys: MaskedSpectrum,
}

impl TsysEstimate {
    /// The time this estimate applies to: halfway between the REF and REFHOT
    /// mean times.
    pub fn time(&self) -> f64 {
        (self.ref_time + self.ref_hot_time) / 2.0
    }
}

/// Why a system temperature couldn't be determined.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InsufficientData {
    #[error("Not enough scan types for processing; missing {}. Scans: {groups}", .missing.iter().join(", "))]
    MissingScanTypes {
        missing: Vec<ScanType>,
        groups: ScanGroups,
    },

    #[error("REFHOT scans don't bracket OTF scan {otf_scan} (REFHOTs before: [{}], after: [{}])", .before.iter().join(", "), .after.iter().join(", "))]
    NoBracket {
        otf_scan: i32,
        before: Vec<i32>,
        after: Vec<i32>,
    },

    #[error("Calibration scan {scan_id} has no valid {scan_type} spectra")]
    EmptyCalibrationScan { scan_id: i32, scan_type: ScanType },

    #[error("Drift correction with HOT spectra was requested, but there are no valid HOT spectra")]
    NoHots,

    #[error("OTF scan {otf_scan} has no valid spectra")]
    NoOtfSpectra { otf_scan: i32 },
}

/// The result of trying to find system temperatures around an OTF scan.
#[derive(Debug, Clone)]
pub enum TsysSolution {
    Solved {
        before: TsysEstimate,
        after: TsysEstimate,
    },
    InsufficientData(InsufficientData),
}

/// Find the calibration scans that bracket `otf_scan` and derive system
/// temperatures from each of them. `t_sky` is the sky temperature at the
/// observed wavelength \[K\].
pub fn solve_tsys(mixer: i32, batch: &SpectrumBatch, otf_scan: i32, t_sky: f64) -> TsysSolution {
    let groups = classify_scans(mixer, batch);
    let missing = groups.missing();
    if !missing.is_empty() {
        return TsysSolution::InsufficientData(InsufficientData::MissingScanTypes {
            missing,
            groups,
        });
    }

    let before = groups.ref_hots.range(..otf_scan).next_back();
    let after = groups
        .ref_hots
        .range(otf_scan..)
        .find(|&&id| id > otf_scan);
    let (before, after) = match (before, after) {
        (Some(&b), Some(&a)) => (b, a),
        _ => {
            return TsysSolution::InsufficientData(InsufficientData::NoBracket {
                otf_scan,
                before: groups.ref_hots.range(..otf_scan).copied().collect(),
                after: groups
                    .ref_hots
                    .range(otf_scan..)
                    .filter(|&&id| id > otf_scan)
                    .copied()
                    .collect(),
            });
        }
    };
    trace!("Mixer {mixer}, OTF scan {otf_scan}: REFHOT brackets are {before} and {after}");

    let estimate = |scan_id| estimate_tsys(mixer, batch, scan_id, t_sky);
    match (estimate(before), estimate(after)) {
        (Ok(before), Ok(after)) => TsysSolution::Solved { before, after },
        (Err(e), _) | (_, Err(e)) => TsysSolution::InsufficientData(e),
    }
}

/// Derive a system temperature from the REF and REFHOT spectra of a single
/// calibration scan.
pub fn estimate_tsys(
    mixer: i32,
    batch: &SpectrumBatch,
    scan_id: i32,
    t_sky: f64,
) -> Result<TsysEstimate, InsufficientData> {
    let ref_rows = batch.select_rows(mixer, ScanType::Ref, Some(scan_id));
    let ref_hot_rows = batch.select_rows(mixer, ScanType::RefHot, Some(scan_id));
    let (ref_time, ref_hot_time, t_hot) = match (
        batch.mean_time(&ref_rows),
        batch.mean_time(&ref_hot_rows),
        batch.mean_t_hot(&ref_hot_rows),
    ) {
        (Some(r), Some(h), Some(t)) => (r, h, t),
        (None, _, _) => {
            return Err(InsufficientData::EmptyCalibrationScan {
                scan_id,
                scan_type: ScanType::Ref,
            })
        }
        _ => {
            return Err(InsufficientData::EmptyCalibrationScan {
                scan_id,
                scan_type: ScanType::RefHot,
            })
        }
    };

    let reference = batch.mean_spectrum(&ref_rows);
    let ref_hot = batch.mean_spectrum(&ref_hot_rows);
    let y_factor = &ref_hot / &reference;
    let tsys = y_factor_tsys(&y_factor, t_hot, t_sky);

    Ok(TsysEstimate {
        scan_id,
        reference,
        ref_hot,
        t_hot,
        ref_time,
        ref_hot_time,
        y_factor,
        tsys,
    })
}

/// `T_sys = (T_hot - T_sky * Y) / (Y - 1)`, channel-wise. Channels with `Y ==
/// 1` are invalid.
pub fn y_factor_tsys(y_factor: &MaskedSpectrum, t_hot: f64, t_sky: f64) -> MaskedSpectrum {
    let numerator = y_factor.map(|y| t_hot - t_sky * y);
    let denominator = y_factor.map(|y| y - 1.0);
    &numerator / &denominator
}
