//! Axon morphometrics from pre-rasterized masks
//!
//! Reads `<stem>_seg-axon.png` and `<stem>_seg-myelin.png` next to the given
//! image, resolves the pixel size from `-s` or the sidecar
//! `pixel_size_in_micrometer.txt`, and writes one spreadsheet row per axon.
//!
//! # Exit codes
//! - 0: success
//! - 3: a mask file or the pixel size is missing
//! - 4: the spreadsheet could not be written
//! - 1: any other failure

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use morphometrics::error::EXIT_FAILURE;
use morphometrics::export::normalize_output_filename;
use morphometrics::{
    run, AxonShape, MaskSource, MorphometricsConfig, MorphometricsError, OutputTarget,
    PipelineReport, PipelineRequest, RegionPropsEngine,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Compute axon morphometrics from segmentation masks",
    long_about = "Compute per-axon morphometrics from the axon and myelin masks produced by\n\
        segmentation. The masks must be named <stem>_seg-axon.png and\n\
        <stem>_seg-myelin.png and sit next to the image."
)]
struct Args {
    /// Path to the microscopy image
    #[arg(short = 'i', long)]
    imgpath: PathBuf,

    /// Pixel size in micrometers; read from pixel_size_in_micrometer.txt when absent
    #[arg(short = 's', long)]
    sizepixel: Option<f64>,

    /// Output spreadsheet name; .xlsx is appended unless it ends in .xlsx or .csv
    #[arg(short = 'f', long, num_args = 1.., default_value = "morphometrics")]
    filename: Vec<String>,

    /// Shape fitted to each axon (circle or ellipse)
    #[arg(short = 'a', long)]
    axon_shape: Option<AxonShape>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn run_cli(args: Args) -> Result<PipelineReport> {
    let config = MorphometricsConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let output = PathBuf::from(normalize_output_filename(&args.filename.join(" ")));
    let request = PipelineRequest {
        mask_source: MaskSource::RasterizedMasks {
            image: args.imgpath,
        },
        output: OutputTarget::Spreadsheet(output),
        pixel_size: args.sizepixel,
        axon_shape: args.axon_shape,
    };

    Ok(run(&config, &RegionPropsEngine::new(), request)?)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run_cli(args) {
        Ok(report) => {
            for path in &report.written {
                println!("Morphometrics of {} axons saved in {}", report.n_axons, path.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            let code = err
                .downcast_ref::<MorphometricsError>()
                .map(MorphometricsError::exit_code)
                .unwrap_or(EXIT_FAILURE);
            ExitCode::from(code)
        }
    }
}
