mod common;

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use image::{ImageBuffer, Luma};
use predicates::prelude::*;
use serde_json::Value;

const GRID_CONFIG: &str = r#"
[target_finder]
type = "CircleGridTargetFinder"
rows = 3
cols = 4

[node]
poll_interval_ms = 5
"#;

fn write_grid_png(path: &Path) {
    let grid = common::dot_grid(3, 4);
    ImageBuffer::<Luma<u16>, _>::from_raw(grid.width, grid.height, grid.samples)
        .expect("buffer")
        .save(path)
        .expect("save png");
}

fn sidecar(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("sidecar")).expect("json")
}

fn bin() -> Command {
    Command::cargo_bin("target-detector").expect("binary")
}

#[test]
fn requires_a_config_path() {
    bin()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--config"));
}

#[test]
fn missing_finder_type_fails_before_creating_outputs() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("detector.json");
    fs::write(&config, r#"{ "target_finder": { "rows": 3, "cols": 4 } }"#).expect("write");
    let out = tmp.path().join("out");

    bin()
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&out)
        .arg("--once")
        .assert()
        .failure()
        .stderr(predicate::str::contains("target_finder.type"));
    assert!(!out.exists());
}

#[test]
fn unknown_finder_reports_registered_names() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("detector.toml");
    fs::write(&config, "[target_finder]\ntype = \"ArucoTargetFinder\"\n").expect("write");
    let out = tmp.path().join("out");

    bin()
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&out)
        .arg("--once")
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("ArucoTargetFinder")
                .and(predicate::str::contains("CircleGridTargetFinder")),
        );
    assert!(!out.exists());
}

#[test]
fn unreadable_config_is_fatal() {
    let tmp = tempfile::tempdir().expect("tempdir");
    bin()
        .arg("--config")
        .arg(tmp.path().join("missing.json"))
        .arg("--output")
        .arg(tmp.path().join("out"))
        .assert()
        .failure();
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn sixteen_bit_input_is_published_on_both_topics() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("detector.toml");
    fs::write(&config, GRID_CONFIG).expect("write");
    let input = tmp.path().join("in");
    fs::create_dir(&input).expect("mkdir");
    write_grid_png(&input.join("frame_000.png"));
    let out = tmp.path().join("out");

    bin()
        .arg("--config")
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&out)
        .arg("--frame-id")
        .arg("cam7")
        .arg("--once")
        .assert()
        .success();

    let detected = out.join("image_detected");
    let annotated = out.join("image_annotated");
    let detected_img = image::open(detected.join("00000000.png")).expect("detected png");
    assert!(matches!(detected_img, image::DynamicImage::ImageLuma16(_)));
    let annotated_img = image::open(annotated.join("00000000.png")).expect("annotated png");
    assert!(matches!(annotated_img, image::DynamicImage::ImageRgb8(_)));
    assert_eq!(
        (annotated_img.width(), annotated_img.height()),
        (detected_img.width(), detected_img.height())
    );

    let d = sidecar(&detected.join("00000000.json"));
    let a = sidecar(&annotated.join("00000000.json"));
    assert_eq!(d["header"], a["header"]);
    assert_eq!(d["header"]["frame_id"], "cam7");
    assert_eq!(d["encoding"], "mono16");
    assert_eq!(a["encoding"], "bgr8");

    assert_eq!(fs::read_dir(&detected).expect("dir").count(), 2);
    assert_eq!(fs::read_dir(&annotated).expect("dir").count(), 2);
}

#[test]
fn frames_without_a_target_are_dropped_but_the_run_succeeds() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("detector.toml");
    fs::write(&config, GRID_CONFIG).expect("write");
    let input = tmp.path().join("in");
    fs::create_dir(&input).expect("mkdir");
    ImageBuffer::<Luma<u16>, _>::from_raw(64, 48, common::blank(64, 48))
        .expect("buffer")
        .save(input.join("a_blank.png"))
        .expect("save");
    write_grid_png(&input.join("b_grid.png"));
    let out = tmp.path().join("out");

    bin()
        .arg("--config")
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&out)
        .arg("--once")
        .assert()
        .success()
        .stderr(predicate::str::contains("dropped=1"));

    // The blank frame had seq 0; only seq 1 reaches the outputs.
    for topic in ["image_detected", "image_annotated"] {
        let dir = out.join(topic);
        assert!(dir.join("00000001.png").exists(), "{topic}");
        assert!(!dir.join("00000000.png").exists(), "{topic}");
    }
}
