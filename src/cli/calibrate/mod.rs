// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments for taking level 0.8 spectra to level 0.9.


use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use itertools::Itertools;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use super::common::{display_warnings, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    band::{Band, BandConfigError, BandConfigs, BandOverrides},
    calibrate::{DriftMethod, SpikeOptions, DEFAULT_SPIKE_WIDTH},
    constants::{DEFAULT_RESERVED_CORES, DEFAULT_SCAN_RANGE},
    io::discover_inputs,
    params::CalibrateParams,
    GustoError,
};

/// The levels of GUSTO data. Each pipeline stage takes data from one level to
/// the next.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumIter, EnumString,
)]
pub(super) enum DataLevel {
    /// Uncalibrated spectra.
    #[strum(serialize = "0.8")]
    L08,

    /// Calibrated spectra.
    #[strum(serialize = "0.9")]
    L09,

    /// Baseline-corrected spectra.
    #[strum(serialize = "0.95")]
    L095,

    /// Coordinate-corrected spectra.
    #[strum(to_string = "1.0", serialize = "1")]
    L10,
}

impl DataLevel {
    fn description(self) -> &'static str {
        match self {
            DataLevel::L08 => "uncalibrated spectra",
            DataLevel::L09 => "calibration",
            DataLevel::L095 => "baseline fitting",
            DataLevel::L10 => "coordinate corrections",
        }
    }
}

const DEFAULT_START_LEVEL: DataLevel = DataLevel::L08;
const DEFAULT_END_LEVEL: DataLevel = DataLevel::L09;

lazy_static::lazy_static! {
    static ref DATA_LEVELS_COMMA_SEPARATED: String = DataLevel::iter().join(", ");

    static ref START_LEVEL_HELP: String =
        format!("The data level to start processing from. Possible levels: {}. Default: {DEFAULT_START_LEVEL}", *DATA_LEVELS_COMMA_SEPARATED);

    static ref END_LEVEL_HELP: String =
        format!("The data level to finish processing at. Possible levels: {}. Default: {DEFAULT_END_LEVEL}", *DATA_LEVELS_COMMA_SEPARATED);

    static ref SCAN_RANGE_HELP: String =
        format!("The first and last scan numbers to process (inclusive). Default: {} {}", DEFAULT_SCAN_RANGE[0], DEFAULT_SCAN_RANGE[1]);

    static ref DRIFT_METHOD_HELP: String =
        format!("The drift correction method. Possible methods: {}. Default: {}",
                DriftMethod::iter().map(|m| format!("{} ({m})", m.number())).join(", "),
                DriftMethod::default().number());

    static ref RESERVED_CORES_HELP: String =
        format!("The number of CPU cores to leave free. Default: {DEFAULT_RESERVED_CORES}");

    static ref SPIKE_WIDTH_HELP: String =
        format!("How many channels either side of a flagged channel are searched for valid neighbours when interpolating. Default: {DEFAULT_SPIKE_WIDTH}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct CalibrateArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The directory containing level 0.8 FITS files.
    #[clap(short = 'i', long, parse(from_os_str), help_heading = "INPUT AND OUTPUT")]
    pub(super) indir: Option<PathBuf>,

    /// The directory to write level 0.9 FITS files to. It is created if it
    /// doesn't exist.
    #[clap(short = 'o', long, parse(from_os_str), help_heading = "INPUT AND OUTPUT")]
    pub(super) outdir: Option<PathBuf>,

    #[clap(short, long, help = START_LEVEL_HELP.as_str(), help_heading = "INPUT AND OUTPUT")]
    pub(super) start_level: Option<String>,

    #[clap(short, long, help = END_LEVEL_HELP.as_str(), help_heading = "INPUT AND OUTPUT")]
    pub(super) end_level: Option<String>,

    #[clap(
        short = 'r',
        long,
        number_of_values = 2,
        value_names = &["FIRST", "LAST"],
        help = SCAN_RANGE_HELP.as_str(),
        help_heading = "INPUT AND OUTPUT"
    )]
    pub(super) scan_range: Option<Vec<u32>>,

    /// Process at most this many files (the ones with the lowest scan
    /// numbers). The default is to process all of them.
    #[clap(short = 'n', long, help_heading = "INPUT AND OUTPUT")]
    pub(super) max_files: Option<usize>,

    #[clap(short = 'm', long, help = DRIFT_METHOD_HELP.as_str(), help_heading = "CALIBRATION")]
    pub(super) drift_method: Option<u8>,

    /// Don't flag the known bad channels of each band before calibration.
    #[clap(long, help_heading = "CALIBRATION")]
    #[serde(default)]
    pub(super) no_despike: bool,

    /// Fill flagged channels with values interpolated from their valid
    /// neighbours, rather than leaving them flagged.
    #[clap(long, help_heading = "CALIBRATION")]
    #[serde(default)]
    pub(super) spike_interpolate: bool,

    #[clap(long, help = SPIKE_WIDTH_HELP.as_str(), help_heading = "CALIBRATION")]
    pub(super) spike_width: Option<usize>,

    /// Process one file at a time.
    #[clap(short, long, help_heading = "RESOURCES")]
    #[serde(default)]
    pub(super) debug: bool,

    #[clap(long, help = RESERVED_CORES_HELP.as_str(), help_heading = "RESOURCES")]
    pub(super) reserved_cores: Option<usize>,

    /// Overrides of band 1 ([NII]) parameters. Only available in argument
    /// files.
    #[clap(skip)]
    pub(super) band1: Option<BandOverrides>,

    /// Overrides of band 2 ([CII]) parameters. Only available in argument
    /// files.
    #[clap(skip)]
    pub(super) band2: Option<BandOverrides>,
}

impl CalibrateArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<CalibrateArgs, GustoError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let CalibrateArgs {
                args_file: _,
                indir,
                outdir,
                start_level,
                end_level,
                scan_range,
                max_files,
                drift_method,
                no_despike,
                spike_interpolate,
                spike_width,
                band1,
                band2,
                debug,
                reserved_cores,
            } = unpack_arg_file!(arg_file);

            Ok(CalibrateArgs {
                args_file: None,
                indir: cli_args.indir.or(indir),
                outdir: cli_args.outdir.or(outdir),
                start_level: cli_args.start_level.or(start_level),
                end_level: cli_args.end_level.or(end_level),
                scan_range: cli_args.scan_range.or(scan_range),
                max_files: cli_args.max_files.or(max_files),
                drift_method: cli_args.drift_method.or(drift_method),
                no_despike: cli_args.no_despike || no_despike,
                spike_interpolate: cli_args.spike_interpolate || spike_interpolate,
                spike_width: cli_args.spike_width.or(spike_width),
                band1: merge_band(cli_args.band1, band1),
                band2: merge_band(cli_args.band2, band2),
                debug: cli_args.debug || debug,
                reserved_cores: cli_args.reserved_cores.or(reserved_cores),
            })
        } else {
            Ok(cli_args)
        }
    }

    /// Make sense of the arguments. `None` is returned if the level range
    /// doesn't include calibration.
    pub(super) fn parse(self) -> Result<Option<CalibrateParams>, GustoError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            indir,
            outdir,
            start_level,
            end_level,
            scan_range,
            max_files,
            drift_method,
            no_despike,
            spike_interpolate,
            spike_width,
            band1,
            band2,
            debug,
            reserved_cores,
        } = self;

        let start = parse_level(start_level.as_deref(), DEFAULT_START_LEVEL)?;
        let end = parse_level(end_level.as_deref(), DEFAULT_END_LEVEL)?;
        if end < start {
            return Err(CalibrateArgsError::BackwardsLevels { start, end }.into());
        }
        for level in DataLevel::iter().filter(|l| *l > DataLevel::L09 && *l <= end) {
            format!(
                "Level {level} ({}) isn't available; skipping it",
                level.description()
            )
            .warn();
        }

        let scan_range = match scan_range.as_deref() {
            None => DEFAULT_SCAN_RANGE[0]..=DEFAULT_SCAN_RANGE[1],
            Some(&[first, last]) if first <= last => first..=last,
            Some(other) => return Err(CalibrateArgsError::BadScanRange(other.to_vec()).into()),
        };

        let method = match drift_method {
            None => DriftMethod::default(),
            Some(n) => DriftMethod::try_from(n).map_err(CalibrateArgsError::InvalidDriftMethod)?,
        };

        let spike_options = if no_despike {
            None
        } else {
            Some(SpikeOptions {
                interpolate: spike_interpolate,
                width: spike_width.unwrap_or(DEFAULT_SPIKE_WIDTH),
            })
        };

        let bands = BandConfigs::new(&band1.unwrap_or_default(), &band2.unwrap_or_default())
            .map_err(CalibrateArgsError::from)?;

        let num_threads = if debug {
            1
        } else {
            let num_cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            num_cores
                .saturating_sub(reserved_cores.unwrap_or(DEFAULT_RESERVED_CORES))
                .max(1)
        };

        let indir = indir.ok_or(CalibrateArgsError::NoInputDir)?;
        let outdir = outdir.ok_or(CalibrateArgsError::NoOutputDir)?;

        let mut printer = InfoPrinter::new("Calibrating level 0.8 spectra".into());
        printer.push_line(format!("Levels {start} to {end}").into());
        if !(start..=end).contains(&DataLevel::L09) {
            printer.push_line("Calibration isn't in the level range; nothing to do".into());
            printer.display();
            display_warnings();
            return Ok(None);
        }

        let inputs = discover_inputs(&indir, scan_range.clone(), max_files.unwrap_or(0))?;
        let mut block = vec![format!("Input directory: {}", indir.display()).into()];
        block.push(
            format!(
                "{} files with scans {} to {} (scan range {} to {})",
                inputs.len(),
                inputs.first().map(|i| i.scan_number).unwrap_or_default(),
                inputs.last().map(|i| i.scan_number).unwrap_or_default(),
                scan_range.start(),
                scan_range.end(),
            )
            .into(),
        );
        printer.push_block(block);
        printer.push_line(format!("Output directory: {}", outdir.display()).into());

        let mut block = vec![format!("Drift correction: {method}").into()];
        match &spike_options {
            None => block.push("Not despiking".into()),
            Some(SpikeOptions {
                interpolate: true,
                width,
            }) => block.push(format!("Despiking; interpolating over up to {width} channels").into()),
            Some(_) => block.push("Despiking; flagged channels stay flagged".into()),
        }
        for band in Band::iter().map(|b| bands.get(b)) {
            block.push(
                format!(
                    "{} ([{}] at {} GHz): Tsky {} K, {} bad channel ranges, channels from {} flagged",
                    band.band,
                    band.line,
                    band.rest_freq_ghz,
                    band.t_sky,
                    band.bad_pixel_ranges.len(),
                    band.pixel_cut
                )
                .into(),
            );
        }
        printer.push_block(block);
        printer.push_line(format!("Using {num_threads} threads").into());
        printer.display();
        display_warnings();

        Ok(Some(CalibrateParams {
            inputs,
            out_dir: outdir,
            method,
            bands,
            spike_options,
            num_threads,
        }))
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), GustoError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = match self.parse()? {
            Some(p) => p,
            None => return Ok(()),
        };

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run()?;
        Ok(())
    }
}

fn parse_level(level: Option<&str>, default: DataLevel) -> Result<DataLevel, CalibrateArgsError> {
    match level {
        None => Ok(default),
        Some(s) => DataLevel::from_str(s.trim())
            .map_err(|_| CalibrateArgsError::UnknownLevel(s.to_string())),
    }
}

fn merge_band(cli: Option<BandOverrides>, file: Option<BandOverrides>) -> Option<BandOverrides> {
    match (cli, file) {
        (Some(c), Some(f)) => Some(c.merge(f)),
        (c, f) => c.or(f),
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum CalibrateArgsError {
    #[error("No input directory was specified")]
    NoInputDir,

    #[error("No output directory was specified")]
    NoOutputDir,

    #[error("Unknown data level '{0}'; possible levels are: {}", *DATA_LEVELS_COMMA_SEPARATED)]
    UnknownLevel(String),

    #[error("The end level ({end}) is before the start level ({start})")]
    BackwardsLevels { start: DataLevel, end: DataLevel },

    #[error("The scan range must be two numbers with the first no bigger than the second; got {0:?}")]
    BadScanRange(Vec<u32>),

    #[error("Invalid drift correction method {0}; possible methods are 1 and 2")]
    InvalidDriftMethod(u8),

    #[error(transparent)]
    Band(#[from] BandConfigError),
}
