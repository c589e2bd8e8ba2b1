// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Calibration of level 0.8 spectra to antenna temperatures.
//!
//! For each mixer, the scans are classified by type, the REFHOT scans either
//! side of each OTF scan give system temperatures through the Y-factor
//! method, and each OTF spectrum is referenced against the time-interpolated
//! REF spectra (optionally normalised by HOT spectra).

mod classify;
mod despike;
mod drift;
mod hots;
mod tsys;

pub use classify::{classify_scans, ScanGroups};
pub use despike::{despike, SpikeOptions, DEFAULT_SPIKE_WIDTH};
pub use drift::{
    correct_drift, interpolation_weights, CalibratedSpectra, DriftMethod, DriftReference,
    InterpolationWeights,
};
pub use hots::{group_hots, HotGroups};
pub use tsys::{
    estimate_tsys, solve_tsys, y_factor_tsys, InsufficientData, TsysEstimate, TsysSolution,
};

use hifitime::Epoch;
use log::{debug, trace, warn};

use crate::{
    band::BandConfig,
    spectra::{ScanType, SpectrumBatch},
};

/// The outcome of calibrating a single mixer.
#[derive(Debug, Clone)]
pub enum MixerCalibration {
    /// At least one OTF scan was calibrated.
    Calibrated(CalibratedSpectra),

    /// Nothing could be calibrated. If several OTF scans failed, this is the
    /// reason the last one failed.
    Skipped(InsufficientData),
}

/// Calibrate all OTF spectra of a mixer. Each OTF scan is calibrated against
/// its own bracketing calibration scans; scans that can't be calibrated don't
/// stop the others, and their rows are listed in
/// [`CalibratedSpectra::uncalibrated`].
pub fn calibrate_mixer(
    mixer: i32,
    batch: &SpectrumBatch,
    band: &BandConfig,
    method: DriftMethod,
) -> MixerCalibration {
    let groups = classify_scans(mixer, batch);
    trace!("Mixer {mixer}: {groups}");
    let missing = groups.missing();
    if !missing.is_empty() {
        return MixerCalibration::Skipped(InsufficientData::MissingScanTypes { missing, groups });
    }

    let hots = match method {
        DriftMethod::RefOnly => None,
        DriftMethod::HotAssisted => match group_hots(mixer, batch) {
            Some(h) => {
                if !h.trailing_hot {
                    warn!(
                        "Mixer {mixer}: no HOT scan follows the last OTF spectrum; the last HOT scan ({}) is used past {}",
                        h.scan_ids.last().copied().unwrap_or_default(),
                        Epoch::from_unix_seconds(h.times.last().copied().unwrap_or_default()),
                    );
                }
                Some(h)
            }
            None => return MixerCalibration::Skipped(InsufficientData::NoHots),
        },
    };
    let reference = match &hots {
        Some(h) => DriftReference::HotAssisted(h),
        None => DriftReference::RefOnly,
    };

    let mut blocks = Vec::with_capacity(groups.otf.len());
    let mut last_failure = None;
    let mut uncalibrated = vec![];
    for &otf_scan in &groups.otf {
        let otf_rows = batch.select_rows(mixer, ScanType::Otf, Some(otf_scan));
        if otf_rows.is_empty() {
            last_failure = Some(InsufficientData::NoOtfSpectra { otf_scan });
            continue;
        }

        let (before, after) = match solve_tsys(mixer, batch, otf_scan, band.t_sky) {
            TsysSolution::Solved { before, after } => (before, after),
            TsysSolution::InsufficientData(e) => {
                debug!("Mixer {mixer}, OTF scan {otf_scan}: {e}");
                uncalibrated.extend_from_slice(&otf_rows);
                last_failure = Some(e);
                continue;
            }
        };
        debug!(
            "Mixer {mixer}, OTF scan {otf_scan}: calibration scans {} ({}) and {} ({})",
            before.scan_id,
            Epoch::from_unix_seconds(before.time()),
            after.scan_id,
            Epoch::from_unix_seconds(after.time()),
        );

        let calibrated = correct_drift(batch, &otf_rows, &before, &after, reference);
        if log::log_enabled!(log::Level::Trace) {
            let tsys: Vec<f64> = calibrated
                .mean_tsys_in_window(band.tsys_window.clone())
                .into_iter()
                .flatten()
                .collect();
            if !tsys.is_empty() {
                trace!(
                    "Mixer {mixer}, OTF scan {otf_scan}: mean Tsys over channels {:?} is {:.1} K",
                    band.tsys_window,
                    tsys.iter().sum::<f64>() / tsys.len() as f64
                );
            }
        }
        blocks.push(calibrated);
    }

    match CalibratedSpectra::concat(blocks) {
        Some(mut c) => {
            if !uncalibrated.is_empty() {
                uncalibrated.sort_unstable();
                debug!(
                    "Mixer {mixer}: {} OTF spectra couldn't be calibrated and will be flagged",
                    uncalibrated.len()
                );
            }
            c.uncalibrated = uncalibrated;
            MixerCalibration::Calibrated(c)
        }
        // There's at least one OTF scan, so if nothing was calibrated, there
        // was a failure.
        None => MixerCalibration::Skipped(
            last_failure.unwrap_or_else(|| InsufficientData::MissingScanTypes {
                missing: vec![ScanType::Otf],
                groups,
            }),
        ),
    }
}
