// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::{
    band::BandConfigs,
    calibrate::{calibrate_mixer, despike, DriftMethod, MixerCalibration, SpikeOptions},
    constants::{HISTORY_PHRASE, MIN_CALIBRATION_ROWS, MIN_OTF_ROWS},
    io::{
        fits::{
            history_contains, l09_path, read_spectra, write_calibrated, FitsError,
            SpectraReadError, SpectraWriteError,
        },
        InputFile,
    },
    spectra::ScanType,
    PROGRESS_BARS,
};

/// Parameters needed to take level 0.8 files to level 0.9.
#[derive(Debug)]
pub(crate) struct CalibrateParams {
    /// The files to process, in the order their results are reported.
    pub(crate) inputs: Vec<InputFile>,

    /// Where the level 0.9 files go. Created if it doesn't exist.
    pub(crate) out_dir: PathBuf,

    pub(crate) method: DriftMethod,

    pub(crate) bands: BandConfigs,

    /// If `None`, spectra aren't despiked.
    pub(crate) spike_options: Option<SpikeOptions>,

    /// The number of files processed at once.
    pub(crate) num_threads: usize,
}

/// What happened to a single input file.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FileOutcome {
    /// At least one mixer was calibrated and written.
    Processed { file: PathBuf, outputs: Vec<PathBuf> },

    /// Nothing was written.
    NoOp { file: PathBuf, reason: NoOpReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NoOpReason {
    AlreadyProcessed,

    TooFewRows {
        refs: usize,
        ref_hots: usize,
        hots: usize,
        otfs: usize,
    },

    NoMixerCalibrated,
}

impl std::fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoOpReason::AlreadyProcessed => write!(f, "already processed"),
            NoOpReason::TooFewRows {
                refs,
                ref_hots,
                hots,
                otfs,
            } => write!(
                f,
                "too few rows ({refs} REF, {ref_hots} REFHOT, {hots} HOT, {otfs} OTF)"
            ),
            NoOpReason::NoMixerCalibrated => write!(f, "no mixer could be calibrated"),
        }
    }
}

/// Tallies of a whole run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub(crate) processed: usize,
    pub(crate) outputs: usize,
    pub(crate) no_ops: usize,
    pub(crate) failed: usize,
}

impl CalibrateParams {
    /// Process all of the input files on a thread pool. Files that fail are
    /// logged and counted, but don't stop the others.
    pub(crate) fn run(&self) -> Result<RunSummary, CalibrateError> {
        std::fs::create_dir_all(&self.out_dir).map_err(|err| CalibrateError::OutputDir {
            dir: self.out_dir.clone(),
            err,
        })?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .thread_name(|i| format!("calibrate-{i}"))
            .build()?;
        info!(
            "Processing {} files with {} threads",
            self.inputs.len(),
            self.num_threads
        );

        let progress = ProgressBar::with_draw_target(
            Some(self.inputs.len() as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template(
                    "{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} files ({elapsed_precise}<{eta_precise})",
                )?
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Calibrating");
        progress.tick();

        let results: Vec<Result<FileOutcome, CalibrateFileError>> = pool.install(|| {
            self.inputs
                .par_iter()
                .map(|input| {
                    let result = self.process_file(&input.path);
                    progress.inc(1);
                    result
                })
                .collect()
        });
        progress.abandon_with_message("Finished calibrating");

        let mut summary = RunSummary::default();
        for (input, result) in self.inputs.iter().zip(results) {
            match result {
                Ok(FileOutcome::Processed { file, outputs }) => {
                    info!("{}: wrote {} files", file.display(), outputs.len());
                    for output in &outputs {
                        debug!("    {}", output.display());
                    }
                    summary.processed += 1;
                    summary.outputs += outputs.len();
                }
                Ok(FileOutcome::NoOp { file, reason }) => {
                    info!("{}: nothing to do; {reason}", file.display());
                    summary.no_ops += 1;
                }
                Err(e) => {
                    warn!("{}: {e}", input.path.display());
                    summary.failed += 1;
                }
            }
        }
        info!(
            "{} files processed ({} written), {} with nothing to do, {} failed",
            summary.processed, summary.outputs, summary.no_ops, summary.failed
        );
        Ok(summary)
    }

    /// Calibrate every mixer of a single level 0.8 file, writing a level 0.9
    /// file for each mixer that could be calibrated.
    pub(crate) fn process_file(&self, file: &Path) -> Result<FileOutcome, CalibrateFileError> {
        let no_op = |reason: NoOpReason| -> Result<FileOutcome, CalibrateFileError> {
            Ok(FileOutcome::NoOp {
                file: file.to_path_buf(),
                reason,
            })
        };

        if history_contains(file, HISTORY_PHRASE)? {
            return no_op(NoOpReason::AlreadyProcessed);
        }

        let mut batch = read_spectra(file)?;
        let refs = batch.count_scan_type(ScanType::Ref);
        let ref_hots = batch.count_scan_type(ScanType::RefHot);
        let hots = batch.count_scan_type(ScanType::Hot);
        let otfs = batch.count_scan_type(ScanType::Otf);
        if refs <= MIN_CALIBRATION_ROWS
            || ref_hots <= MIN_CALIBRATION_ROWS
            || hots <= MIN_CALIBRATION_ROWS
            || otfs <= MIN_OTF_ROWS
        {
            return no_op(NoOpReason::TooFewRows {
                refs,
                ref_hots,
                hots,
                otfs,
            });
        }

        let band = self.bands.for_file(file);
        debug!("{}: band {} ({})", file.display(), band.band, band.line);
        if let Some(options) = &self.spike_options {
            despike(&mut batch.spectra, band, options);
        }

        let processed_at = Utc::now();
        let mut outputs = vec![];
        for mixer in batch.unique_mixers() {
            match calibrate_mixer(mixer, &batch, band, self.method) {
                MixerCalibration::Calibrated(calibrated) => {
                    let output = l09_path(file, &self.out_dir, mixer);
                    write_calibrated(file, &output, &calibrated, self.method, processed_at)?;
                    debug!(
                        "{}: mixer {mixer}: wrote {} calibrated spectra",
                        file.display(),
                        calibrated.len()
                    );
                    outputs.push(output);
                }
                MixerCalibration::Skipped(e) => {
                    info!("{}: mixer {mixer}: skipped; {e}", file.display());
                }
            }
        }

        if outputs.is_empty() {
            no_op(NoOpReason::NoMixerCalibrated)
        } else {
            Ok(FileOutcome::Processed {
                file: file.to_path_buf(),
                outputs,
            })
        }
    }
}

/// Errors that stop a whole run.
#[derive(Error, Debug)]
pub(crate) enum CalibrateError {
    #[error("Couldn't create the output directory {dir}: {err}")]
    OutputDir { dir: PathBuf, err: std::io::Error },

    #[error("Couldn't set up the thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    ProgressTemplate(#[from] indicatif::style::TemplateError),
}

/// Errors that stop a single file from being processed.
#[derive(Error, Debug)]
pub(crate) enum CalibrateFileError {
    #[error(transparent)]
    Read(#[from] SpectraReadError),

    #[error(transparent)]
    Write(#[from] SpectraWriteError),

    #[error(transparent)]
    Fits(#[from] FitsError),
}
