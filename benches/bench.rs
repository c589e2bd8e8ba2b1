// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::*;
use ndarray::prelude::*;

use gusto_pipeline::{calibrate_mixer, Band, DriftMethod, Masked, ScanType, SpectrumBatch};

/// The number of channels of a real spectrometer.
const NUM_CHANS: usize = 1024;

/// A strip like the ones observed: calibration scans either side of a long
/// OTF scan, for each of `num_mixers` mixers.
fn get_batch(num_mixers: i32, num_otf_rows: usize) -> SpectrumBatch {
    let scans = [
        (100, ScanType::Ref, 10, 0.0, 10.0),
        (100, ScanType::RefHot, 10, 15.0, 20.0),
        (101, ScanType::Hot, 10, 30.0, 1.0),
        (102, ScanType::Otf, num_otf_rows, 45.0, 15.0),
        (103, ScanType::Hot, 10, 1000.0, 1.0),
        (104, ScanType::Ref, 10, 1015.0, 11.0),
        (104, ScanType::RefHot, 10, 1030.0, 21.0),
    ];
    let rows: Vec<_> = (1..=num_mixers)
        .flat_map(|mixer| {
            scans
                .iter()
                .flat_map(move |&(scan_id, scan_type, num_rows, start, flux)| {
                    (0..num_rows).map(move |i| (mixer, scan_id, scan_type, start + i as f64, flux))
                })
        })
        .collect();

    let data = Array2::from_shape_fn((rows.len(), NUM_CHANS), |(i_row, i_chan)| {
        // A gentle ripple so channels differ.
        rows[i_row].4 * (1.0 + 0.01 * (i_chan as f64 / 20.0).sin())
    });
    SpectrumBatch {
        mixers: rows.iter().map(|r| r.0).collect(),
        scan_ids: rows.iter().map(|r| r.1).collect(),
        scan_types: rows.iter().map(|r| Some(r.2)).collect(),
        unix_times: rows.iter().map(|r| r.3).collect(),
        t_hots: vec![300.0; rows.len()],
        row_flags: vec![0; rows.len()],
        spectra: Masked::from_data(data),
    }
}

fn calibration(c: &mut Criterion) {
    let batch = get_batch(8, 500);
    let band = Band::B2.default_config();

    let mut group = c.benchmark_group("calibrate_mixer");
    for method in [DriftMethod::RefOnly, DriftMethod::HotAssisted] {
        group.bench_function(format!("{method}"), |b| {
            b.iter(|| calibrate_mixer(black_box(5), &batch, &band, method))
        });
    }
    group.finish();
}

criterion_group!(benches, calibration);
criterion_main!(benches);
