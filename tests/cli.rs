// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Black-box coverage of the `aegean` binary itself: argument parsing,
//! reading a real FITS file off disk, and the two terminal write paths
//! (`--output` catalogue, `--save_background` maps).

use std::path::Path;

use assert_cmd::Command;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use indoc::indoc;
use tempfile::tempdir;

// A small island of signal against a flat background, written out as ASCII
// art so the fixture is readable in the diff rather than a wall of floats.
// '.' is background, each digit is a multiple of the peak amplitude.
const IMAGE_ART: &str = indoc! {"
    ..........
    ..........
    ...1111...
    ..111111..
    ..119911..
    ..111111..
    ...1111...
    ..........
    ..........
    ..........
"};

fn write_test_image(path: &Path) {
    let rows: Vec<Vec<f32>> = IMAGE_ART
        .lines()
        .map(|line| {
            line.chars()
                .map(|c| match c {
                    '.' => 0.0,
                    digit => digit.to_digit(10).unwrap() as f32 * 2.0,
                })
                .collect()
        })
        .collect();
    let ny = rows.len();
    let nx = rows[0].len();

    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &[ny, nx],
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()
        .unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    hdu.write_image(&mut fptr, &flat).unwrap();

    for (key, value) in [
        ("CRPIX1", nx as f64 / 2.0),
        ("CRPIX2", ny as f64 / 2.0),
        ("CRVAL1", 150.0),
        ("CRVAL2", -30.0),
        ("CDELT1", -1.0 / 3600.0),
        ("CDELT2", 1.0 / 3600.0),
        ("CROTA2", 0.0),
    ] {
        hdu.write_key(&mut fptr, key, value).unwrap();
    }
    hdu.write_key(&mut fptr, "CTYPE1", "RA---TAN").unwrap();
}

#[test]
fn writes_a_catalogue_with_at_least_one_component() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("test.fits");
    let output = dir.path().join("catalogue.json");
    write_test_image(&input);

    Command::cargo_bin("aegean")
        .unwrap()
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--beam")
        .args(["0.01", "0.01", "0.0"])
        .arg("--rms")
        .arg("1.0")
        .assert()
        .success();

    let records: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert!(!records.is_empty());
    assert!(records[0].get("ra").is_some());
}

#[test]
fn save_background_writes_maps_instead_of_a_catalogue() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("test.fits");
    write_test_image(&input);

    Command::cargo_bin("aegean")
        .unwrap()
        .current_dir(dir.path())
        .arg(&input)
        .arg("--beam")
        .args(["0.01", "0.01", "0.0"])
        .arg("--rms")
        .arg("1.0")
        .arg("--save_background")
        .assert()
        .success();

    for name in ["aegean-background.fits", "aegean-rms.fits", "aegean-curvature.fits"] {
        assert!(dir.path().join(name).exists(), "missing {name}");
    }
    assert!(!dir.path().join("catalogue.json").exists());
}
