// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests to ensure there is no stderr output for successful commands.

use tempfile::TempDir;

use crate::{get_cmd_output, gusto, make_inputs};

#[test]
fn test_calibrate_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let indir = make_inputs(tmp_dir.path(), &[2000]);
    let outdir = tmp_dir.path().join("level0.9");

    #[rustfmt::skip]
    let cmd = gusto()
        .args([
            "calibrate",
            "--indir", &format!("{}", indir.display()),
            "--outdir", &format!("{}", outdir.display()),
        ])
        .ok();
    assert!(
        cmd.is_ok(),
        "calibrate failed on simple test data: {}",
        cmd.err().unwrap()
    );
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}

#[test]
fn test_levels_past_calibration_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let indir = make_inputs(tmp_dir.path(), &[2000]);

    #[rustfmt::skip]
    let cmd = gusto()
        .args([
            "calibrate",
            "--indir", &format!("{}", indir.display()),
            "--outdir", &format!("{}", tmp_dir.path().join("out").display()),
            "--start-level", "0.95",
            "--end-level", "1",
        ])
        .ok();
    assert!(cmd.is_ok(), "calibrate failed: {}", cmd.err().unwrap());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("isn't available; skipping it"), "{stdout}");
}
