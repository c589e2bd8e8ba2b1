// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading level 0.8 spectrometer tables.

use std::{path::Path, str::FromStr};

use fitsio::{hdu::FitsHdu, FitsFile};
use log::{debug, trace};
use thiserror::Error;

use super::*;
use crate::{
    masked::Masked,
    spectra::{ScanType, SpectrumBatch},
};

/// The names the flux vector column may have, in order of preference.
pub const FLUX_COLUMNS: [&str; 2] = ["spec", "DATA"];

/// The HDU holding the spectrometer table (0-indexed).
pub(super) const TABLE_HDU: usize = 1;

#[derive(Error, Debug)]
pub enum SpectraReadError {
    #[error("{file}: no flux column was found; expected one of {}", FLUX_COLUMNS.join(", "))]
    NoFluxColumn { file: String },

    #[error("{file}: the flux column has {flux} channels, but CHANNEL_FLAG has {flags}")]
    ChannelMismatch {
        file: String,
        flux: usize,
        flags: usize,
    },

    #[error(transparent)]
    Fits(#[from] FitsError),
}

/// Find the name, number and number of channels of the flux column.
pub(super) fn find_flux_column(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<Option<(&'static str, c_int, usize)>, FitsError> {
    for name in FLUX_COLUMNS {
        if let Some(i_col) = fits_get_column_number(fptr, hdu, name)? {
            let repeat = column_repeat(fptr, hdu, name)?;
            return Ok(Some((name, i_col, repeat)));
        }
    }
    Ok(None)
}

/// The number of elements per row of a column.
#[track_caller]
pub(super) fn column_repeat(
    fptr: &FitsFile,
    hdu: &FitsHdu,
    column: &str,
) -> Result<usize, FitsError> {
    let (descriptions, _) = fits_get_table_info(fptr, hdu)?;
    match descriptions.iter().find(|d| d.name == column) {
        Some(d) => Ok(d.data_type.repeat),
        None => {
            let caller = std::panic::Location::caller();
            Err(FitsError::MissingColumn {
                column: column.to_string().into_boxed_str(),
                fits_filename: fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Read all of the spectra of a level 0.8 file.
///
/// Channels flagged in CHANNEL_FLAG, or that have non-finite flux, are
/// invalid. Scan types that aren't recognised are kept as `None`.
pub fn read_spectra(file: &Path) -> Result<SpectrumBatch, SpectraReadError> {
    debug!("Reading spectra from {}", file.display());
    let mut fptr = fits_open(file)?;
    let hdu = fits_open_hdu(&mut fptr, TABLE_HDU)?;
    let (_, num_rows) = fits_get_table_info(&fptr, &hdu)?;

    let mixers: Vec<i32> = fits_get_col(&mut fptr, &hdu, "MIXER")?;
    let scan_ids: Vec<i32> = fits_get_col(&mut fptr, &hdu, "scanID")?;
    let scan_types: Vec<String> = fits_get_col(&mut fptr, &hdu, "scan_type")?;
    let row_flags: Vec<i32> = fits_get_col(&mut fptr, &hdu, "ROW_FLAG")?;
    let unix_times: Vec<f64> = fits_get_col(&mut fptr, &hdu, "UNIXTIME")?;
    let t_hots: Vec<f64> = fits_get_col(&mut fptr, &hdu, "THOT")?;

    let (flux_col_name, flux_col, num_chans) = find_flux_column(&mut fptr, &hdu)?.ok_or_else(|| {
        SpectraReadError::NoFluxColumn {
            file: file.display().to_string(),
        }
    })?;
    let flag_col = fits_get_required_column_number(&mut fptr, &hdu, "CHANNEL_FLAG")?;
    let num_flags = column_repeat(&fptr, &hdu, "CHANNEL_FLAG")?;
    if num_flags != num_chans {
        return Err(SpectraReadError::ChannelMismatch {
            file: file.display().to_string(),
            flux: num_chans,
            flags: num_flags,
        });
    }
    trace!("{}: {num_rows} rows, {num_chans} channels in column {flux_col_name}", file.display());

    let flux = fits_read_vector_col::<f64>(&mut fptr, &hdu, flux_col, num_rows, num_chans)?;
    let channel_flags = fits_read_vector_col::<i32>(&mut fptr, &hdu, flag_col, num_rows, num_chans)?;

    let scan_types = scan_types
        .iter()
        .map(|s| ScanType::from_str(s.trim()).ok())
        .collect();

    Ok(SpectrumBatch {
        mixers,
        scan_ids,
        scan_types,
        unix_times,
        t_hots,
        row_flags,
        spectra: Masked::new(flux, channel_flags.mapv(|f| f == 0)),
    })
}

/// Has this file already been through the pipeline? This is the case if the
/// primary header has a HISTORY card containing `phrase`.
pub fn history_contains(file: &Path, phrase: &str) -> Result<bool, FitsError> {
    let mut fptr = fits_open(file)?;
    let hdu = fits_open_hdu(&mut fptr, 0)?;
    fits_history_contains(&mut fptr, &hdu, phrase)
}
