// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Finding level 0.8 files to process.

use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use glob::glob;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use thiserror::Error;

lazy_static! {
    /// File names look like `ACS3_02345_L08.fits`; the digits after the
    /// first underscore are the scan number.
    static ref SCAN_NUMBER_REGEX: Regex = Regex::new(r"^[^_]+_(\d+)").unwrap();
}

/// A level 0.8 file and its scan number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub scan_number: u32,
}

/// Given a glob pattern, get all of the matches from the filesystem.
pub(crate) fn get_all_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let mut entries = vec![];
    for entry in glob(g)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => return Err(GlobError::GlobCrate(e)),
        }
    }
    Ok(entries)
}

/// The scan number in a file name, if there is one.
pub fn scan_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    SCAN_NUMBER_REGEX
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Find all FITS files in `in_dir` with a scan number in `scan_range`, sorted
/// by scan number. If `max_files` is non-zero, at most that many files are
/// returned. Files without a scan number are skipped with a warning.
pub fn discover_inputs(
    in_dir: &Path,
    scan_range: RangeInclusive<u32>,
    max_files: usize,
) -> Result<Vec<InputFile>, GlobError> {
    if !in_dir.is_dir() {
        return Err(GlobError::NotADirectory(in_dir.to_path_buf()));
    }
    let pattern = in_dir.join("*.fits");
    let pattern = pattern.to_string_lossy();
    let mut inputs = vec![];
    for path in get_all_matches_from_glob(&pattern)? {
        match scan_number(&path) {
            Some(n) if scan_range.contains(&n) => inputs.push(InputFile {
                path,
                scan_number: n,
            }),
            Some(n) => debug!("{}: scan {n} is out of range", path.display()),
            None => warn!(
                "{}: couldn't work out a scan number; skipping",
                path.display()
            ),
        }
    }
    // Files with the same scan number (e.g. from different spectrometers)
    // keep their name order.
    inputs.sort_by(|a, b| {
        a.scan_number
            .cmp(&b.scan_number)
            .then_with(|| a.path.cmp(&b.path))
    });
    if max_files > 0 {
        inputs.truncate(max_files);
    }

    if inputs.is_empty() {
        return Err(GlobError::NoMatches {
            glob: pattern.into_owned(),
            first: *scan_range.start(),
            last: *scan_range.end(),
        });
    }
    Ok(inputs)
}

#[derive(Error, Debug)]
/// Error type associated with finding input files.
pub enum GlobError {
    #[error("{} isn't a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("No files matching {glob} with scan numbers {first} to {last} were found")]
    NoMatches { glob: String, first: u32, last: u32 },

    #[error(transparent)]
    GlobCrate(#[from] glob::GlobError),

    #[error(transparent)]
    PatternError(#[from] glob::PatternError),
}
