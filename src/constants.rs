// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.
 */

/// The processing level of files written by the calibration stage.
pub const PROC_LEV: f64 = 0.9;

/// Files with no more than this many REF, REFHOT or HOT rows aren't worth
/// calibrating.
pub const MIN_CALIBRATION_ROWS: usize = 3;

/// Files with no more than this many OTF rows aren't worth calibrating.
pub const MIN_OTF_ROWS: usize = 5;

/// Written to the HISTORY of every calibrated file. Input files that already
/// have it are skipped.
pub const HISTORY_PHRASE: &str = "Processed by the GUSTO L0.9 pipeline";

/// The default inclusive range of scan numbers to process.
pub const DEFAULT_SCAN_RANGE: [u32; 2] = [2000, 30000];

/// The default number of CPU cores left free for other work.
pub const DEFAULT_RESERVED_CORES: usize = 2;

/// The suffix of output file names, before the extension.
pub const L09_SUFFIX: &str = "L09";
