//! Folder-oriented morphometrics
//!
//! Thresholds a segmentation prediction into axon and myelin masks and saves
//! the per-axon spreadsheet, the aggregate summary and the diameter map next
//! to the image. The pixel size comes from `pixel_size_in_micrometer.txt` in
//! the image folder unless given with `-s`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use morphometrics::error::EXIT_FAILURE;
use morphometrics::{
    run, AxonShape, MaskSource, MorphometricsConfig, MorphometricsError, OutputTarget,
    PipelineReport, PipelineRequest, RegionPropsEngine,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Compute and save morphometrics of one sample next to its image"
)]
struct Args {
    /// Path to the microscopy image
    #[arg(short = 'i', long)]
    imgpath: PathBuf,

    /// Three-level segmentation prediction (axon > 200, myelin 50-200 by default)
    #[arg(short = 'p', long)]
    prediction: PathBuf,

    /// Pixel size in micrometers; read from pixel_size_in_micrometer.txt when absent
    #[arg(short = 's', long)]
    sizepixel: Option<f64>,

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

    let request = PipelineRequest {
        mask_source: MaskSource::Prediction {
            image: args.imgpath,
            prediction: args.prediction,
        },
        output: OutputTarget::SampleFolder,
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
            println!("Measured {} axons at {}", report.n_axons, report.pixel_size);
            for path in &report.written {
                println!("  {}", path.display());
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
