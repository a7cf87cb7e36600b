//! Integration test: drive the `toonify` binary end to end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::process::Command;

use image::{ImageEncoder, Rgb, RgbImage};

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("toonify-cli");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn write_input(name: &str) -> PathBuf {
    let img = RgbImage::from_fn(40, 30, |x, _| {
        if x < 20 {
            Rgb([200, 60, 40])
        } else {
            Rgb([40, 60, 200])
        }
    });
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), 40, 30, image::ExtendedColorType::Rgb8)
        .unwrap();
    let path = scratch(name);
    std::fs::write(&path, buf).unwrap();
    path
}

fn toonify() -> Command {
    Command::new(env!("CARGO_BIN_EXE_toonify"))
}

#[test]
fn writes_cartoon_and_comparison() {
    let input = write_input("split.png");
    let output = scratch("split-out.png");
    let compare = scratch("split-compare.png");

    let status = toonify()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--compare")
        .arg(&compare)
        .args(["--boost-color", "--runs", "2"])
        .status()
        .unwrap();
    assert!(status.success());

    let cartoon = image::open(&output).unwrap();
    assert_eq!((cartoon.width(), cartoon.height()), (40, 30));
    let comparison = image::open(&compare).unwrap();
    assert_eq!((comparison.width(), comparison.height()), (80, 30));
}

#[test]
fn json_diagnostics_on_stdout() {
    let input = write_input("diag.png");
    let output = scratch("diag-out.png");

    let out = toonify()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--json", "--soft-edges"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let diagnostics: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(diagnostics["summary"]["pixel_count"], 1200);
    assert!(diagnostics["soften"].is_object());
    assert!(diagnostics["boost"].is_null());
}

#[test]
fn unreadable_image_fails() {
    let input = scratch("garbage.png");
    std::fs::write(&input, b"definitely not a png").unwrap();

    let out = toonify()
        .arg(&input)
        .arg("-o")
        .arg(scratch("garbage-out.png"))
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(
        String::from_utf8_lossy(&out.stderr).contains("could not read image"),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn invalid_config_json_parameters_fail() {
    let input = write_input("invalid.png");
    let out = toonify()
        .arg(&input)
        .arg("-o")
        .arg(scratch("invalid-out.png"))
        .args(["--config-json", r#"{"median_kernel": 4}"#])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("median_kernel"));
}

#[test]
fn repeated_diagnostic_runs_reuse_the_decode() {
    let input = write_input("runs.png");
    let out = toonify()
        .arg(&input)
        .arg("-o")
        .arg(scratch("runs-out.png"))
        .args(["--diagnostics", "--runs", "3"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.matches("Pipeline Diagnostics Report").count(), 3);
    assert_eq!(stdout.matches("(cached)").count(), 2, "{stdout}");
    assert!(stdout.contains("Summary (3 runs)"));
}
