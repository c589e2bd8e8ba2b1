// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod calibrate;
mod no_stderr;

use std::{
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use fitsio::{
    tables::{ColumnDataType, ColumnDescription},
    FitsFile,
};

const NUM_CHANS: usize = 32;

fn gusto() -> Command {
    Command::cargo_bin("gusto").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// One row of a synthetic level 0.8 file.
struct Row {
    mixer: i32,
    scan_id: i32,
    scan_type: &'static str,
    unix_time: f64,
    flux: f64,
}

/// The rows of a single mixer's strip: REF and REFHOT scans either side of an
/// OTF scan, with HOT scans in between.
fn strip(mixer: i32) -> Vec<Row> {
    let mut rows = vec![];
    let mut scan = |scan_id, scan_type, num_rows, start: f64, flux| {
        for i in 0..num_rows {
            rows.push(Row {
                mixer,
                scan_id,
                scan_type,
                unix_time: start + i as f64,
                flux,
            });
        }
    };
    scan(100, "REF", 4, 0.0, 10.0);
    scan(100, "REFHOT", 4, 5.0, 20.0);
    scan(101, "HOT", 4, 10.0, 1.0);
    scan(102, "OTF", 10, 20.0, 15.0);
    scan(103, "HOT", 4, 30.0, 1.0);
    scan(104, "REF", 4, 40.0, 10.0);
    scan(104, "REFHOT", 4, 45.0, 20.0);
    rows
}

/// Write a level 0.8 file containing a strip for each of `mixers`.
fn write_l08_file(path: &Path, mixers: &[i32]) {
    let rows: Vec<Row> = mixers.iter().flat_map(|&m| strip(m)).collect();

    let mut fptr = FitsFile::create(path).open().unwrap();
    let primary = fptr.hdu(0).unwrap();
    primary.write_key(&mut fptr, "TELESCOP", "GUSTO").unwrap();
    primary.write_key(&mut fptr, "VLSR", 0.0).unwrap();

    let column = |name: &str, data_type, repeat| {
        ColumnDescription::new(name)
            .with_type(data_type)
            .that_repeats(repeat)
            .create()
            .unwrap()
    };
    let columns = [
        column("MIXER", ColumnDataType::Int, 1),
        column("scanID", ColumnDataType::Int, 1),
        column("scan_type", ColumnDataType::String, 8),
        column("ROW_FLAG", ColumnDataType::Int, 1),
        column("UNIXTIME", ColumnDataType::Double, 1),
        column("THOT", ColumnDataType::Double, 1),
        column("CHANNEL_FLAG", ColumnDataType::Short, NUM_CHANS),
        column("spec", ColumnDataType::Double, NUM_CHANS),
    ];
    let hdu = fptr.create_table("SPECTRA", &columns).unwrap();
    let ints = |f: fn(&Row) -> i32| rows.iter().map(f).collect::<Vec<_>>();
    let doubles = |f: fn(&Row) -> f64| rows.iter().map(f).collect::<Vec<_>>();
    hdu.write_col(&mut fptr, "MIXER", &ints(|r| r.mixer)).unwrap();
    hdu.write_col(&mut fptr, "scanID", &ints(|r| r.scan_id))
        .unwrap();
    let scan_types: Vec<String> = rows.iter().map(|r| r.scan_type.to_string()).collect();
    hdu.write_col(&mut fptr, "scan_type", &scan_types).unwrap();
    hdu.write_col(&mut fptr, "ROW_FLAG", &ints(|_| 0)).unwrap();
    hdu.write_col(&mut fptr, "UNIXTIME", &doubles(|r| r.unix_time))
        .unwrap();
    hdu.write_col(&mut fptr, "THOT", &doubles(|_| 300.0))
        .unwrap();
    hdu.write_col(&mut fptr, "CHANNEL_FLAG", &vec![0_i32; rows.len() * NUM_CHANS])
        .unwrap();
    let flux: Vec<f64> = rows
        .iter()
        .flat_map(|r| std::iter::repeat(r.flux).take(NUM_CHANS))
        .collect();
    hdu.write_col(&mut fptr, "spec", &flux).unwrap();
}

/// Make an input directory with a band 2 file for each of `scans`, each with
/// mixers 2 and 3. The input directory is returned.
fn make_inputs(tmp_dir: &Path, scans: &[u32]) -> PathBuf {
    let indir = tmp_dir.join("level0.8");
    std::fs::create_dir(&indir).unwrap();
    for scan in scans {
        write_l08_file(&indir.join(format!("ACS3_{scan:05}_L08.fits")), &[2, 3]);
    }
    indir
}
