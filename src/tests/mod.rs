// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests: synthetic spectrometer data.

use std::{path::Path, str::FromStr};

use fitsio::{
    tables::{ColumnDataType, ColumnDescription},
    FitsFile,
};
use ndarray::prelude::*;

use crate::{
    masked::Masked,
    spectra::{ScanType, SpectrumBatch},
};

/// The number of channels in most synthetic spectra. Much smaller than the
/// real thing, but big enough to cover the bad-pixel tables.
pub(crate) const NUM_CHANS: usize = 64;

/// Builds a [`SpectrumBatch`] one row at a time.
pub(crate) struct BatchBuilder {
    num_chans: usize,
    mixers: Vec<i32>,
    scan_ids: Vec<i32>,
    scan_types: Vec<Option<ScanType>>,
    unix_times: Vec<f64>,
    t_hots: Vec<f64>,
    row_flags: Vec<i32>,
    fluxes: Vec<Array1<f64>>,
    channel_valid: Vec<Array1<bool>>,
}

impl BatchBuilder {
    pub(crate) fn new(num_chans: usize) -> BatchBuilder {
        BatchBuilder {
            num_chans,
            mixers: vec![],
            scan_ids: vec![],
            scan_types: vec![],
            unix_times: vec![],
            t_hots: vec![],
            row_flags: vec![],
            fluxes: vec![],
            channel_valid: vec![],
        }
    }

    /// Add a single row with a constant flux. `scan_type` is parsed like it
    /// would be from a file.
    pub(crate) fn row(
        &mut self,
        mixer: i32,
        scan_id: i32,
        scan_type: &str,
        unix_time: f64,
        t_hot: f64,
        flux: f64,
    ) -> &mut Self {
        self.mixers.push(mixer);
        self.scan_ids.push(scan_id);
        self.scan_types.push(ScanType::from_str(scan_type).ok());
        self.unix_times.push(unix_time);
        self.t_hots.push(t_hot);
        self.row_flags.push(0);
        self.fluxes.push(Array1::from_elem(self.num_chans, flux));
        self.channel_valid.push(Array1::from_elem(self.num_chans, true));
        self
    }

    /// Add `num_rows` rows, one second apart, starting at `start_time`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn scan(
        &mut self,
        mixer: i32,
        scan_id: i32,
        scan_type: &str,
        num_rows: usize,
        start_time: f64,
        t_hot: f64,
        flux: f64,
    ) -> &mut Self {
        for i in 0..num_rows {
            self.row(mixer, scan_id, scan_type, start_time + i as f64, t_hot, flux);
        }
        self
    }

    /// Set the row flag of the most recently added row.
    pub(crate) fn flag_last_row(&mut self) -> &mut Self {
        if let Some(f) = self.row_flags.last_mut() {
            *f = 1;
        }
        self
    }

    /// Flag a channel of every row added so far.
    pub(crate) fn flag_channel(&mut self, i_chan: usize) -> &mut Self {
        for valid in &mut self.channel_valid {
            valid[i_chan] = false;
        }
        self
    }

    /// Change the flux of a channel of every row added so far with this scan
    /// type.
    pub(crate) fn set_channel(&mut self, scan_type: ScanType, i_chan: usize, flux: f64) -> &mut Self {
        for (t, f) in self.scan_types.iter().zip(self.fluxes.iter_mut()) {
            if *t == Some(scan_type) {
                f[i_chan] = flux;
            }
        }
        self
    }

    pub(crate) fn build(&self) -> SpectrumBatch {
        let num_rows = self.fluxes.len();
        let mut data = Array2::zeros((num_rows, self.num_chans));
        let mut valid = Array2::from_elem((num_rows, self.num_chans), false);
        for (i_row, (f, v)) in self.fluxes.iter().zip(self.channel_valid.iter()).enumerate() {
            data.row_mut(i_row).assign(f);
            valid.row_mut(i_row).assign(v);
        }
        SpectrumBatch {
            mixers: self.mixers.clone(),
            scan_ids: self.scan_ids.clone(),
            scan_types: self.scan_types.clone(),
            unix_times: self.unix_times.clone(),
            t_hots: self.t_hots.clone(),
            row_flags: self.row_flags.clone(),
            spectra: Masked::new(data, valid),
        }
    }
}

/// Flux levels of the different scan types in [`standard_batch`].
#[derive(Clone, Copy)]
pub(crate) struct Levels {
    pub(crate) reference: f64,
    pub(crate) ref_hot: f64,
    pub(crate) hot: f64,
    pub(crate) otf: f64,
    pub(crate) t_hot: f64,
}

impl Default for Levels {
    fn default() -> Self {
        Levels {
            reference: 10.0,
            ref_hot: 20.0,
            hot: 1.0,
            otf: 15.0,
            t_hot: 300.0,
        }
    }
}

/// A typical strip for each mixer:
///
/// - scan 100: 4 REF rows (t = 0..3), then 4 REFHOT rows (t = 5..8);
/// - scan 101: 4 HOT rows (t = 10..13);
/// - scan 102: 10 OTF rows (t = 20..29);
/// - scan 103: 4 HOT rows (t = 30..33);
/// - scan 104: 4 REF rows (t = 40..43), then 4 REFHOT rows (t = 45..48).
///
/// The "before" bracket time is (1.5 + 6.5) / 2 = 4 and the "after" bracket
/// time is (41.5 + 46.5) / 2 = 44.
pub(crate) fn standard_builder(mixers: &[i32], levels: Levels) -> BatchBuilder {
    let mut builder = BatchBuilder::new(NUM_CHANS);
    for &m in mixers {
        builder
            .scan(m, 100, "REF", 4, 0.0, levels.t_hot, levels.reference)
            .scan(m, 100, "REFHOT", 4, 5.0, levels.t_hot, levels.ref_hot)
            .scan(m, 101, "HOT", 4, 10.0, levels.t_hot, levels.hot)
            .scan(m, 102, "OTF", 10, 20.0, levels.t_hot, levels.otf)
            .scan(m, 103, "HOT", 4, 30.0, levels.t_hot, levels.hot)
            .scan(m, 104, "REF", 4, 40.0, levels.t_hot, levels.reference)
            .scan(m, 104, "REFHOT", 4, 45.0, levels.t_hot, levels.ref_hot);
    }
    builder
}

pub(crate) fn standard_batch(mixers: &[i32]) -> SpectrumBatch {
    standard_builder(mixers, Levels::default()).build()
}

/// Write a batch as a level 0.8 file. The primary header gets a VLSR key
/// (unless `with_vlsr` is false) followed by an OBJECT key.
pub(crate) fn write_l08_file(
    path: &Path,
    batch: &SpectrumBatch,
    flux_column: &str,
    with_vlsr: bool,
) -> Result<(), fitsio::errors::Error> {
    let mut fptr = FitsFile::create(path).open()?;
    let primary = fptr.hdu(0)?;
    primary.write_key(&mut fptr, "TELESCOP", "GUSTO")?;
    if with_vlsr {
        primary.write_key(&mut fptr, "VLSR", 0.0)?;
    }
    primary.write_key(&mut fptr, "OBJECT", "synthetic")?;

    let num_chans = batch.num_chans();
    let columns = [
        ColumnDescription::new("MIXER")
            .with_type(ColumnDataType::Int)
            .create()?,
        ColumnDescription::new("scanID")
            .with_type(ColumnDataType::Int)
            .create()?,
        ColumnDescription::new("scan_type")
            .with_type(ColumnDataType::String)
            .that_repeats(8)
            .create()?,
        ColumnDescription::new("ROW_FLAG")
            .with_type(ColumnDataType::Int)
            .create()?,
        ColumnDescription::new("UNIXTIME")
            .with_type(ColumnDataType::Double)
            .create()?,
        ColumnDescription::new("THOT")
            .with_type(ColumnDataType::Double)
            .create()?,
        ColumnDescription::new("CHANNEL_FLAG")
            .with_type(ColumnDataType::Short)
            .that_repeats(num_chans)
            .create()?,
        ColumnDescription::new(flux_column)
            .with_type(ColumnDataType::Double)
            .that_repeats(num_chans)
            .create()?,
    ];
    let hdu = fptr.create_table("SPECTRA", &columns)?;
    hdu.write_col(&mut fptr, "MIXER", &batch.mixers)?;
    hdu.write_col(&mut fptr, "scanID", &batch.scan_ids)?;
    let scan_types: Vec<String> = batch
        .scan_types
        .iter()
        .map(|t| t.map(|t| t.to_string()).unwrap_or_else(|| "PS".to_string()))
        .collect();
    hdu.write_col(&mut fptr, "scan_type", &scan_types)?;
    hdu.write_col(&mut fptr, "ROW_FLAG", &batch.row_flags)?;
    hdu.write_col(&mut fptr, "UNIXTIME", &batch.unix_times)?;
    hdu.write_col(&mut fptr, "THOT", &batch.t_hots)?;
    let flags: Vec<i32> = batch.spectra.valid().iter().map(|&v| i32::from(!v)).collect();
    hdu.write_col(&mut fptr, "CHANNEL_FLAG", &flags)?;
    let flux: Vec<f64> = batch.spectra.data().iter().copied().collect();
    hdu.write_col(&mut fptr, flux_column, &flux)?;
    Ok(())
}
