// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions for reading and editing FITS files.
//!
//! The `fitsio` crate is used where it can be, but vector columns and header
//! card insertion need raw `cfitsio` calls.

mod error;
mod read;
mod write;

pub use error::FitsError;
pub use read::{history_contains, read_spectra, SpectraReadError, FLUX_COLUMNS};
pub use write::{l09_path, write_calibrated, SpectraWriteError};

use std::{
    ffi::{CStr, CString},
    fmt::Display,
    os::raw::{c_char, c_int},
    path::Path,
    ptr,
};

use fitsio::{hdu::*, tables::ConcreteColumnDescription, FitsFile};
use ndarray::prelude::*;

/// Types that can be read from and written to table columns with raw cfitsio
/// calls.
pub(crate) trait CfitsioType: Copy + Default {
    /// The cfitsio datatype code (fitsio.h).
    const DATATYPE: c_int;
}

impl CfitsioType for f64 {
    const DATATYPE: c_int = 82; // TDOUBLE
}

impl CfitsioType for i32 {
    const DATATYPE: c_int = 31; // TINT
}

/// Open a FITS file for reading.
#[track_caller]
pub(crate) fn fits_open<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::open(file.as_ref()).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Open a FITS file for editing.
#[track_caller]
pub(crate) fn fits_edit<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::edit(file.as_ref()).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Open a FITS file's HDU. This also makes it the current HDU for raw cfitsio
/// calls.
#[track_caller]
pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    hdu_description: T,
) -> Result<FitsHdu, FitsError> {
    fits_fptr.hdu(hdu_description).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{hdu_description}").into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Turn a cfitsio status code into a [`FitsError`].
#[track_caller]
pub(crate) fn fits_check_status(
    fits_fptr: &FitsFile,
    hdu: &FitsHdu,
    status: c_int,
) -> Result<(), FitsError> {
    fitsio::errors::check_status(status).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type.
#[track_caller]
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, FitsError> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(fitsio::errors::Error::Fits(fe)) if matches!(fe.status, 202 | 204) => return Ok(None),
        Err(e) => {
            let caller = std::panic::Location::caller();
            return Err(FitsError::Fitsio {
                fits_error: Box::new(e),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            });
        }
    };

    match unparsed_value.trim().parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => {
            let caller = std::panic::Location::caller();
            Err(FitsError::Parse {
                key: keyword.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Get a scalar column from a FITS file's HDU.
#[track_caller]
pub(crate) fn fits_get_col<T: fitsio::tables::ReadsCol>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    column: &str,
) -> Result<Vec<T>, FitsError> {
    hdu.read_col(fits_fptr, column).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Get the column descriptions and number of rows of a binary table HDU.
#[track_caller]
pub(crate) fn fits_get_table_info<'a>(
    fits_fptr: &FitsFile,
    hdu: &'a FitsHdu,
) -> Result<(&'a [ConcreteColumnDescription], usize), FitsError> {
    match &hdu.info {
        HduInfo::TableInfo {
            column_descriptions,
            num_rows,
        } => Ok((column_descriptions, *num_rows)),
        _ => {
            let caller = std::panic::Location::caller();
            Err(FitsError::NotTable {
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Get the (1-indexed) number of a column in the current HDU. `None` if the
/// column doesn't exist. Column names are matched case-sensitively.
#[track_caller]
pub(crate) fn fits_get_column_number(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    column: &str,
) -> Result<Option<c_int>, FitsError> {
    // A name with an interior nul can't be a column name.
    let Ok(col_name) = CString::new(column) else {
        return Ok(None);
    };
    let col_name = col_name.into_raw();
    let mut status = 0;
    let mut i_col = 0;
    unsafe {
        // ffgcno = fits_get_colnum
        fitsio_sys::ffgcno(
            fits_fptr.as_raw(), /* I - FITS file pointer                       */
            1,                  /* I - case sensitive string comparison? 0=no  */
            col_name,           /* I - input name of column (w/wildcards)      */
            &mut i_col,         /* O - number of the named column; 1=first col */
            &mut status,        /* IO - error status                           */
        );
        drop(CString::from_raw(col_name));
    }
    match status {
        // 219 = named column not found
        219 => Ok(None),
        _ => {
            fits_check_status(fits_fptr, hdu, status)?;
            Ok(Some(i_col))
        }
    }
}

/// Like [`fits_get_column_number`], but a missing column is an error.
#[track_caller]
pub(crate) fn fits_get_required_column_number(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    column: &str,
) -> Result<c_int, FitsError> {
    match fits_get_column_number(fits_fptr, hdu, column)? {
        Some(i_col) => Ok(i_col),
        None => {
            let caller = std::panic::Location::caller();
            Err(FitsError::MissingColumn {
                column: column.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Read a whole vector column into a (rows, repeat) array. cfitsio carries
/// on to the next row once a row's elements are exhausted, so this is a
/// single call.
#[track_caller]
pub(crate) fn fits_read_vector_col<T: CfitsioType>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    i_col: c_int,
    num_rows: usize,
    repeat: usize,
) -> Result<Array2<T>, FitsError> {
    let mut array = Array2::<T>::default((num_rows, repeat));
    if array.is_empty() {
        return Ok(array);
    }
    let mut status = 0;
    unsafe {
        // ffgcv = fits_read_col
        fitsio_sys::ffgcv(
            fits_fptr.as_raw(),        /* I - FITS file pointer                       */
            T::DATATYPE,               /* I - datatype of array                       */
            i_col,                     /* I - number of column to read (1 = 1st col)  */
            1,                         /* I - first row to read (1 = 1st row)         */
            1,                         /* I - first vector element to read (1 = 1st)  */
            array.len() as i64,        /* I - number of values to read                */
            ptr::null_mut(),           /* I - value for null pixels                   */
            array.as_mut_ptr().cast(), /* O - array of values that are read           */
            &mut 0,                    /* O - set to 1 if any values are null         */
            &mut status,               /* IO - error status                           */
        );
    }
    fits_check_status(fits_fptr, hdu, status)?;
    Ok(array)
}

/// Overwrite a single (0-indexed) row of a vector column.
#[track_caller]
pub(crate) fn fits_write_vector_row<T: CfitsioType>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    i_col: c_int,
    i_row: usize,
    values: &mut [T],
) -> Result<(), FitsError> {
    let mut status = 0;
    unsafe {
        // ffpcl = fits_write_col
        fitsio_sys::ffpcl(
            fits_fptr.as_raw(),         /* I - FITS file pointer                       */
            T::DATATYPE,                /* I - datatype of array                       */
            i_col,                      /* I - number of column to write (1 = 1st col) */
            i_row as i64 + 1,           /* I - first row to write (1 = 1st row)        */
            1,                          /* I - first vector element to write (1 = 1st) */
            values.len() as i64,        /* I - number of values to write               */
            values.as_mut_ptr().cast(), /* I - array of values to write                */
            &mut status,                /* IO - error status                           */
        );
    }
    fits_check_status(fits_fptr, hdu, status)
}

/// Read every card of the current HDU's header, in order.
#[track_caller]
pub(crate) fn fits_read_cards(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<Vec<String>, FitsError> {
    let mut status = 0;
    let mut num_keys = 0;
    unsafe {
        // ffghsp = fits_get_hdrspace
        fitsio_sys::ffghsp(
            fits_fptr.as_raw(), /* I - FITS file pointer                     */
            &mut num_keys,      /* O - number of keywords in the header      */
            ptr::null_mut(),    /* O - space available for more keywords     */
            &mut status,        /* IO - error status                         */
        );
    }
    fits_check_status(fits_fptr, hdu, status)?;

    let mut cards = Vec::with_capacity(num_keys.max(0) as usize);
    let mut card: [c_char; 81] = [0; 81];
    for i_key in 1..=num_keys {
        unsafe {
            // ffgrec = fits_read_record
            fitsio_sys::ffgrec(
                fits_fptr.as_raw(), /* I - FITS file pointer         */
                i_key,              /* I - number of keyword to read */
                card.as_mut_ptr(),  /* O - keyword card              */
                &mut status,        /* IO - error status             */
            );
        }
        fits_check_status(fits_fptr, hdu, status)?;
        let text = unsafe { CStr::from_ptr(card.as_ptr()) };
        cards.push(text.to_string_lossy().into_owned());
    }
    Ok(cards)
}

/// Do any HISTORY cards of the current HDU contain `phrase`?
#[track_caller]
pub(crate) fn fits_history_contains(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    phrase: &str,
) -> Result<bool, FitsError> {
    let cards = fits_read_cards(fits_fptr, hdu)?;
    Ok(cards
        .iter()
        .any(|card| card.starts_with("HISTORY") && card.contains(phrase)))
}

/// Make a C string for cfitsio. Interior nuls are dropped rather than
/// truncating the string.
pub(crate) fn c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}
