//! End-to-end tests of the command line tools.

use std::path::Path;
use std::process::{Command, Output};

use calamine::{open_workbook, Data, Reader, Xlsx};
use morphometrics::AxonMorphometrics;
use test_helpers::{default_fibers, SampleDir};

fn axon_morphometrics(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_axon_morphometrics"))
        .current_dir(cwd)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run axon_morphometrics")
}

fn launch_morphometrics(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_launch_morphometrics"))
        .current_dir(cwd)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run launch_morphometrics")
}

fn image_arg(sample: &SampleDir) -> String {
    sample.image_path().to_string_lossy().into_owned()
}

#[test]
fn test_default_output_is_xlsx() {
    let sample = SampleDir::with_default_masks("nerve").unwrap();
    let image = image_arg(&sample);

    let output = axon_morphometrics(sample.path(), &["-i", &image, "-s", "0.1"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let mut workbook: Xlsx<_> = open_workbook(sample.path().join("morphometrics.xlsx")).unwrap();
    let range = workbook.worksheet_range("morphometrics").unwrap();
    assert_eq!(range.height(), default_fibers().len() + 1);
    assert_eq!(range.width(), 11);

    let mut rows = range.rows();
    let header: Vec<String> = rows.next().unwrap().iter().map(|c| c.to_string()).collect();
    assert_eq!(header, AxonMorphometrics::COLUMN_NAMES);
    for row in rows {
        // gratio is numeric for every fiber with a myelin sheath
        assert!(matches!(row[2], Data::Float(_)), "{row:?}");
    }
}

#[test]
fn test_missing_image_with_masks_present_still_exports() {
    let sample = SampleDir::with_default_masks("nerve").unwrap();
    let image = image_arg(&sample);
    std::fs::remove_file(sample.image_path()).unwrap();

    let output = axon_morphometrics(sample.path(), &["-i", &image, "-s", "0.1", "-f", "out.csv"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let mut reader = csv::Reader::from_path(sample.path().join("out.csv")).unwrap();
    assert_eq!(reader.records().count(), default_fibers().len());
}

#[test]
fn test_csv_filename_gives_csv_with_eleven_columns() {
    let sample = SampleDir::with_default_masks("nerve").unwrap();
    let image = image_arg(&sample);

    let output = axon_morphometrics(sample.path(), &["-i", &image, "-s", "0.1", "-f", "out.csv"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(!sample.path().join("out.csv.xlsx").exists());

    let mut reader = csv::Reader::from_path(sample.path().join("out.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        [
            "x0",
            "y0",
            "gratio",
            "axon_area",
            "myelin_area",
            "axon_diam",
            "myelin_thickness",
            "axonmyelin_area",
            "solidity",
            "eccentricity",
            "orientation"
        ]
    );
    let rows = reader.records().count();
    assert_eq!(rows, default_fibers().len());
}

#[test]
fn test_multi_word_filename_is_joined() {
    let sample = SampleDir::with_default_masks("nerve").unwrap();
    let image = image_arg(&sample);

    let output = axon_morphometrics(
        sample.path(),
        &["-i", &image, "-s", "0.1", "-f", "my", "results"],
    );
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(sample.path().join("my results.xlsx").exists());
}

#[test]
fn test_missing_myelin_mask_exits_3_without_output() {
    let sample = SampleDir::new("nerve").unwrap();
    sample.write_image().unwrap();
    sample.write_axon_mask(&default_fibers()).unwrap();
    let image = image_arg(&sample);

    let output = axon_morphometrics(sample.path(), &["-i", &image, "-s", "0.1"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(!sample.path().join("morphometrics.xlsx").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("myelin"));
}

#[test]
fn test_missing_pixel_size_exits_3() {
    let sample = SampleDir::with_default_masks("nerve").unwrap();
    let image = image_arg(&sample);

    let output = axon_morphometrics(sample.path(), &["-i", &image]);
    assert_eq!(output.status.code(), Some(3));
    assert!(!sample.path().join("morphometrics.xlsx").exists());
}

#[test]
fn test_pixel_size_sidecar_is_used() {
    let sample = SampleDir::with_default_masks("nerve").unwrap();
    sample.write_pixel_size("0.1").unwrap();
    let image = image_arg(&sample);

    let output = axon_morphometrics(sample.path(), &["-i", &image, "-f", "sidecar.csv"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(sample.path().join("sidecar.csv").exists());
}

#[test]
fn test_unwritable_output_exits_4() {
    let sample = SampleDir::with_default_masks("nerve").unwrap();
    let image = image_arg(&sample);
    let target = sample.path().join("no_such_dir").join("out.csv");
    let target = target.to_string_lossy().into_owned();

    let output = axon_morphometrics(sample.path(), &["-i", &image, "-s", "0.1", "-f", &target]);
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("out.csv"));
}

#[test]
fn test_launch_writes_sample_folder_outputs() {
    let sample = SampleDir::new("nerve").unwrap();
    sample.write_image().unwrap();
    let prediction = sample.write_prediction(&default_fibers()).unwrap();
    sample.write_pixel_size("0.1").unwrap();
    let image = image_arg(&sample);
    let prediction = prediction.to_string_lossy().into_owned();

    let output = launch_morphometrics(
        sample.path(),
        &["-i", &image, "-p", &prediction, "-a", "ellipse"],
    );
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    assert!(sample.path().join("axon_morphometrics.xlsx").exists());
    assert!(sample.path().join("AxonDeepSeg_map-axondiameter.png").exists());
    let aggregate =
        std::fs::read_to_string(sample.path().join("aggregate_morphometrics.txt")).unwrap();
    assert!(aggregate.contains("n_axons: 3"));
}

#[test]
fn test_launch_custom_config_thresholds() {
    let sample = SampleDir::new("nerve").unwrap();
    sample.write_image().unwrap();
    let prediction = sample.write_prediction(&default_fibers()).unwrap();
    let prediction = prediction.to_string_lossy().into_owned();
    let image = image_arg(&sample);

    // Myelin written at 127 now classifies as axon, merging each fiber
    let config_path = sample.path().join("config.json");
    std::fs::write(
        &config_path,
        r#"{ "thresholds": { "myelin_min": 50, "axon_min_exclusive": 100 }, "aggregate_file": "summary.txt" }"#,
    )
    .unwrap();
    let config = config_path.to_string_lossy().into_owned();

    let output = launch_morphometrics(
        sample.path(),
        &["-i", &image, "-p", &prediction, "-s", "0.2", "--config", &config],
    );
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let summary = std::fs::read_to_string(sample.path().join("summary.txt")).unwrap();
    assert!(summary.contains("n_axons: 3"));
    assert!(summary.contains("mvf: 0\n"));
}

#[test]
fn test_unknown_axon_shape_is_usage_error() {
    let sample = SampleDir::with_default_masks("nerve").unwrap();
    let image = image_arg(&sample);

    let output = axon_morphometrics(sample.path(), &["-i", &image, "-s", "0.1", "-a", "square"]);
    assert_eq!(output.status.code(), Some(2));
}
