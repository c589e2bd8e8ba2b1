// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing level 0.9 files.
//!
//! A level 0.9 file is a copy of its level 0.8 file with the calibrated OTF
//! spectra of a single mixer written over the raw ones, and the primary
//! header stamped with the processing level and time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fitsio::{hdu::FitsHdu, FitsFile};
use log::debug;
use thiserror::Error;

use super::{read::find_flux_column, read::column_repeat, read::TABLE_HDU, *};
use crate::{
    calibrate::{CalibratedSpectra, DriftMethod},
    constants::{HISTORY_PHRASE, L09_SUFFIX, PROC_LEV},
};

#[derive(Error, Debug)]
pub enum SpectraWriteError {
    #[error("Couldn't copy {from} to {to}: {err}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        err: std::io::Error,
    },

    #[error("{file}: no flux column was found; expected one of {}", FLUX_COLUMNS.join(", "))]
    NoFluxColumn { file: PathBuf },

    #[error("{file}: the flux column has {expected} channels, but there are {got} calibrated channels")]
    ChannelMismatch {
        file: PathBuf,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Fits(#[from] FitsError),
}

/// The level 0.9 file name for a level 0.8 file and mixer:
/// `<out_dir>/<input stem>_<mixer>_L09.fits`.
pub fn l09_path(input: &Path, out_dir: &Path, mixer: i32) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    out_dir.join(format!("{stem}_{mixer}_{L09_SUFFIX}.fits"))
}

/// Copy `input` to `output` and write the calibrated spectra into the copy.
/// Invalid channels are written with a flux of 0 and a CHANNEL_FLAG of 1.
/// Uncalibrated OTF rows get a ROW_FLAG of 1 and are written as if every
/// channel were invalid. If anything goes wrong, `output` is removed.
pub fn write_calibrated(
    input: &Path,
    output: &Path,
    calibrated: &CalibratedSpectra,
    method: DriftMethod,
    processed_at: DateTime<Utc>,
) -> Result<(), SpectraWriteError> {
    std::fs::copy(input, output).map_err(|err| SpectraWriteError::Copy {
        from: input.to_path_buf(),
        to: output.to_path_buf(),
        err,
    })?;
    // Don't leave a half-written file around.
    let guard = scopeguard::guard(output.to_path_buf(), |output| {
        debug!("Removing incomplete file {}", output.display());
        let _ = std::fs::remove_file(output);
    });

    let mut fptr = fits_edit(output)?;
    let primary = fits_open_hdu(&mut fptr, 0)?;
    stamp_header(&mut fptr, &primary, processed_at)?;
    add_history(
        &mut fptr,
        &primary,
        &format!("{HISTORY_PHRASE}; drift correction {method}"),
    )?;

    let hdu = fits_open_hdu(&mut fptr, TABLE_HDU)?;
    let (_, flux_col, num_chans) =
        find_flux_column(&mut fptr, &hdu)?.ok_or_else(|| SpectraWriteError::NoFluxColumn {
            file: output.to_path_buf(),
        })?;
    let flag_col = fits_get_required_column_number(&mut fptr, &hdu, "CHANNEL_FLAG")?;
    let num_flags = column_repeat(&fptr, &hdu, "CHANNEL_FLAG")?;
    let got = calibrated.antenna_temp.num_chans();
    if num_chans != got || num_flags != got {
        return Err(SpectraWriteError::ChannelMismatch {
            file: output.to_path_buf(),
            expected: num_chans,
            got,
        });
    }

    let flux = calibrated.antenna_temp.filled(0.0);
    let flags = calibrated.antenna_temp.valid().mapv(|v| i32::from(!v));
    for (i, &i_row) in calibrated.rows.iter().enumerate() {
        let mut flux_row = flux.row(i).to_vec();
        fits_write_vector_row(&mut fptr, &hdu, flux_col, i_row, &mut flux_row)?;
        let mut flag_row = flags.row(i).to_vec();
        fits_write_vector_row(&mut fptr, &hdu, flag_col, i_row, &mut flag_row)?;
    }

    if !calibrated.uncalibrated.is_empty() {
        let row_flag_col = fits_get_required_column_number(&mut fptr, &hdu, "ROW_FLAG")?;
        let mut zeros = vec![0.0; got];
        let mut ones = vec![1_i32; got];
        for &i_row in &calibrated.uncalibrated {
            fits_write_vector_row(&mut fptr, &hdu, row_flag_col, i_row, &mut [1_i32])?;
            fits_write_vector_row(&mut fptr, &hdu, flux_col, i_row, &mut zeros)?;
            fits_write_vector_row(&mut fptr, &hdu, flag_col, i_row, &mut ones)?;
        }
    }
    drop(fptr);

    scopeguard::ScopeGuard::into_inner(guard);
    Ok(())
}

/// Write PROC_LEV, PROCDATE and PROCTIME to the primary header. If the header
/// already has a PROC_LEV, these keys are updated in place. Otherwise, a
/// "Pipeline Processing" comment and the keys are inserted after VLSR, or
/// appended if there's no VLSR.
fn stamp_header(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    processed_at: DateTime<Utc>,
) -> Result<(), FitsError> {
    let date = processed_at.format("%Y-%m-%d").to_string();
    let time = processed_at.format("%H:%M:%S%.3f").to_string();

    let proc_lev = c_string("PROC_LEV");
    let proc_lev_comment = c_string("pipeline processing level");
    let proc_date = c_string("PROCDATE");
    let proc_date_comment = c_string("Date of processing");
    let proc_time = c_string("PROCTIME");
    let proc_time_comment = c_string("Time of processing");
    let date = c_string(&date);
    let time = c_string(&time);
    let mut status = 0;

    if fits_get_optional_key::<String>(fptr, hdu, "PROC_LEV")?.is_some() {
        unsafe {
            // ffukyg = fits_update_key_fixdbl
            fitsio_sys::ffukyg(
                fptr.as_raw(),              /* I - FITS file pointer  */
                proc_lev.as_ptr(),          /* I - keyword name       */
                PROC_LEV,                   /* I - keyword value      */
                2,                          /* I - no of decimals     */
                proc_lev_comment.as_ptr(),  /* I - keyword comment    */
                &mut status,                /* IO - error status      */
            );
            // ffukys = fits_update_key_str
            fitsio_sys::ffukys(
                fptr.as_raw(),
                proc_date.as_ptr(),
                date.as_ptr(),
                proc_date_comment.as_ptr(),
                &mut status,
            );
            fitsio_sys::ffukys(
                fptr.as_raw(),
                proc_time.as_ptr(),
                time.as_ptr(),
                proc_time_comment.as_ptr(),
                &mut status,
            );
        }
        return fits_check_status(fptr, hdu, status);
    }

    let vlsr = c_string("VLSR");
    let mut card: [c_char; 81] = [0; 81];
    unsafe {
        // ffgcrd = fits_read_card. This also moves the header position to
        // just after VLSR, which is where cards get inserted.
        fitsio_sys::ffgcrd(
            fptr.as_raw(),     /* I - FITS file pointer    */
            vlsr.as_ptr(),     /* I - keyword name         */
            card.as_mut_ptr(), /* O - keyword card         */
            &mut status,       /* IO - error status        */
        );
    }
    let comment = c_string("Pipeline Processing");
    match status {
        // 202 = keyword not found
        202 => {
            debug!("No VLSR key; appending processing keys");
            status = 0;
            unsafe {
                // ffpcom = fits_write_comment
                fitsio_sys::ffpcom(fptr.as_raw(), comment.as_ptr(), &mut status);
                // ffpkyg = fits_write_key_fixdbl
                fitsio_sys::ffpkyg(
                    fptr.as_raw(),
                    proc_lev.as_ptr(),
                    PROC_LEV,
                    2,
                    proc_lev_comment.as_ptr(),
                    &mut status,
                );
                // ffpkys = fits_write_key_str
                fitsio_sys::ffpkys(
                    fptr.as_raw(),
                    proc_date.as_ptr(),
                    date.as_ptr(),
                    proc_date_comment.as_ptr(),
                    &mut status,
                );
                fitsio_sys::ffpkys(
                    fptr.as_raw(),
                    proc_time.as_ptr(),
                    time.as_ptr(),
                    proc_time_comment.as_ptr(),
                    &mut status,
                );
            }
        }
        _ => {
            fits_check_status(fptr, hdu, status)?;
            let comment_card = c_string("COMMENT Pipeline Processing");
            unsafe {
                // ffikey = fits_insert_card
                fitsio_sys::ffikey(fptr.as_raw(), comment_card.as_ptr(), &mut status);
                // ffikyg = fits_insert_key_fixdbl
                fitsio_sys::ffikyg(
                    fptr.as_raw(),
                    proc_lev.as_ptr(),
                    PROC_LEV,
                    2,
                    proc_lev_comment.as_ptr(),
                    &mut status,
                );
                // ffikys = fits_insert_key_str
                fitsio_sys::ffikys(
                    fptr.as_raw(),
                    proc_date.as_ptr(),
                    date.as_ptr(),
                    proc_date_comment.as_ptr(),
                    &mut status,
                );
                fitsio_sys::ffikys(
                    fptr.as_raw(),
                    proc_time.as_ptr(),
                    time.as_ptr(),
                    proc_time_comment.as_ptr(),
                    &mut status,
                );
            }
        }
    }
    fits_check_status(fptr, hdu, status)
}

fn add_history(fptr: &mut FitsFile, hdu: &FitsHdu, history: &str) -> Result<(), FitsError> {
    let history = c_string(history);
    let mut status = 0;
    unsafe {
        // ffphis = fits_write_history
        fitsio_sys::ffphis(
            fptr.as_raw(),      /* I - FITS file pointer  */
            history.as_ptr(),   /* I - history string     */
            &mut status,        /* IO - error status      */
        );
    }
    fits_check_status(fptr, hdu, status)
}
