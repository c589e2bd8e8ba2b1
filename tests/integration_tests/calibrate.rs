// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::{get_cmd_output, gusto, make_inputs};

#[test]
fn test_help() {
    let (stdout, _) = get_cmd_output(gusto().args(["calibrate", "--help"]).ok());
    assert!(stdout.contains("--indir"));
    assert!(stdout.contains("--drift-method"));
    assert!(stdout.contains("ARGUMENTS_FILE"));
}

#[test]
fn test_calibrate_writes_a_file_per_mixer() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let indir = make_inputs(tmp_dir.path(), &[2000, 2001]);
    let outdir = tmp_dir.path().join("level0.9");

    #[rustfmt::skip]
    let cmd = gusto()
        .args([
            "calibrate",
            "--indir", &format!("{}", indir.display()),
            "--outdir", &format!("{}", outdir.display()),
            "--drift-method", "2",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "calibrate failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("2 files processed (4 written)"), "{stdout}");

    for scan in [2000, 2001] {
        for mixer in [2, 3] {
            let output = outdir.join(format!("ACS3_{scan:05}_L08_{mixer}_L09.fits"));
            assert!(output.exists(), "{} is missing", output.display());
        }
    }

    // Running again over the outputs does nothing.
    #[rustfmt::skip]
    let cmd = gusto()
        .args([
            "l09",
            "-i", &format!("{}", outdir.display()),
            "-o", &format!("{}", tmp_dir.path().join("again").display()),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "calibrate failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(
        stdout.contains("0 files processed (0 written), 4 with nothing to do, 0 failed"),
        "{stdout}"
    );
}

#[test]
fn test_dry_run() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let indir = make_inputs(tmp_dir.path(), &[2345]);
    let outdir = tmp_dir.path().join("level0.9");

    #[rustfmt::skip]
    let cmd = gusto()
        .args([
            "calibrate",
            "-i", &format!("{}", indir.display()),
            "-o", &format!("{}", outdir.display()),
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok(), "calibrate failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("1 files with scans 2345 to 2345"), "{stdout}");
    assert!(!outdir.exists());
}

#[test]
fn test_save_toml() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let indir = make_inputs(tmp_dir.path(), &[2345]);
    let outdir = tmp_dir.path().join("level0.9");
    let toml = tmp_dir.path().join("args.toml");

    #[rustfmt::skip]
    let cmd = gusto()
        .args([
            "calibrate",
            "-i", &format!("{}", indir.display()),
            "-o", &format!("{}", outdir.display()),
            "-m", "2",
            "--save-toml", &format!("{}", toml.display()),
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok(), "calibrate failed: {}", cmd.err().unwrap());
    let contents = std::fs::read_to_string(&toml).unwrap();
    assert!(contents.contains("drift_method = 2"), "{contents}");

    // The saved arguments reproduce the run.
    let cmd = gusto()
        .args(["calibrate", &format!("{}", toml.display()), "--dry-run"])
        .ok();
    assert!(cmd.is_ok(), "calibrate failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("HOT-assisted"), "{stdout}");
}

#[test]
fn test_bad_levels() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let indir = make_inputs(tmp_dir.path(), &[2345]);

    #[rustfmt::skip]
    let cmd = gusto()
        .args([
            "calibrate",
            "-i", &format!("{}", indir.display()),
            "-o", &format!("{}", tmp_dir.path().display()),
            "--start-level", "0.9",
            "--end-level", "0.8",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(
        stderr.contains("The end level (0.8) is before the start level (0.9)"),
        "{stderr}"
    );
}

#[test]
fn test_missing_input_dir() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let indir = tmp_dir.path().join("nothing_here");

    #[rustfmt::skip]
    let cmd = gusto()
        .args([
            "calibrate",
            "-i", &format!("{}", indir.display()),
            "-o", &format!("{}", tmp_dir.path().display()),
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("isn't a directory"), "{stderr}");
}
