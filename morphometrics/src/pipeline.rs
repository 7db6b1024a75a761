//! The morphometrics pipeline shared by both command line tools.
//!
//! A run loads masks from a [`MaskSource`], resolves the pixel size, asks the
//! engine for measurements and writes them to an [`OutputTarget`]. All
//! expected inputs are checked before anything is written, and folder outputs
//! are committed together or not at all.

use std::path::{Path, PathBuf};

use image::GrayImage;
use log::{info, warn};

use crate::config::{AxonShape, MorphometricsConfig};
use crate::engine::{MorphometricsEngine, RegionPropsEngine};
use crate::error::{MaskKind, MorphometricsError, Result};
use crate::export::{
    aggregate_to_text, diameter_map_bytes, spreadsheet_bytes, write_morphometrics, StagedOutputs,
};
use crate::image_proc::io::{image_dimensions, load_binary_mask, load_gray_image, load_prediction};
use crate::image_proc::mask::{threshold_prediction, AxonMasks};
use crate::pixel_size::{resolve_pixel_size, PixelSize};

/// Where the axon and myelin masks come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskSource {
    /// A three-level prediction image split with the configured thresholds.
    Prediction { image: PathBuf, prediction: PathBuf },
    /// `<stem><axon suffix>` and `<stem><myelin suffix>` next to the image.
    RasterizedMasks { image: PathBuf },
}

impl MaskSource {
    pub fn image_path(&self) -> &Path {
        match self {
            MaskSource::Prediction { image, .. } | MaskSource::RasterizedMasks { image } => image,
        }
    }
}

/// Where results are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Spreadsheet, aggregate summary and diameter map in the image folder.
    SampleFolder,
    /// A single spreadsheet at the given path.
    Spreadsheet(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub mask_source: MaskSource,
    pub output: OutputTarget,
    /// Micrometers per pixel; the sidecar file is used when absent
    pub pixel_size: Option<f64>,
    /// Overrides the configured shape when set
    pub axon_shape: Option<AxonShape>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub written: Vec<PathBuf>,
    pub n_axons: usize,
    pub pixel_size: PixelSize,
}

/// Resolved output of a run, holding what that output needs.
enum Destination<'a> {
    Folder { background: GrayImage },
    Spreadsheet(&'a Path),
}

/// Folder holding the image; `.` for bare file names.
fn sample_folder(image: &Path) -> PathBuf {
    match image.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Sibling mask path `<folder>/<stem><suffix>`.
pub fn mask_path(image: &Path, suffix: &str) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    sample_folder(image).join(format!("{stem}{suffix}"))
}

fn require_mask(kind: MaskKind, path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(MorphometricsError::MissingMask { kind, path })
    }
}

fn load_masks(config: &MorphometricsConfig, source: &MaskSource) -> Result<AxonMasks> {
    match source {
        MaskSource::Prediction { prediction, .. } => {
            let prediction = load_prediction(prediction)?;
            Ok(threshold_prediction(&prediction.view(), &config.thresholds))
        }
        MaskSource::RasterizedMasks { image } => {
            let axon_path = require_mask(MaskKind::Axon, mask_path(image, &config.axon_mask_suffix))?;
            let myelin_path =
                require_mask(MaskKind::Myelin, mask_path(image, &config.myelin_mask_suffix))?;
            AxonMasks::new(load_binary_mask(&axon_path)?, load_binary_mask(&myelin_path)?)
        }
    }
}

/// Check that every expected input file is present.
fn check_inputs(config: &MorphometricsConfig, source: &MaskSource) -> Result<()> {
    if let MaskSource::RasterizedMasks { image } = source {
        require_mask(MaskKind::Axon, mask_path(image, &config.axon_mask_suffix))?;
        require_mask(MaskKind::Myelin, mask_path(image, &config.myelin_mask_suffix))?;
    }
    Ok(())
}

/// Run the pipeline for one sample.
pub fn run(
    config: &MorphometricsConfig,
    engine: &dyn MorphometricsEngine,
    request: PipelineRequest,
) -> Result<PipelineReport> {
    let image_path = request.mask_source.image_path();
    let folder = sample_folder(image_path);
    let shape = request.axon_shape.unwrap_or(config.axon_shape);

    check_inputs(config, &request.mask_source)?;
    let pixel_size = resolve_pixel_size(request.pixel_size, &folder, &config.pixel_size_file)?;
    info!("Processing {image_path:?} at {pixel_size} ({shape} fit)");

    let masks = load_masks(config, &request.mask_source)?;
    let destination = match &request.output {
        OutputTarget::SampleFolder => {
            let background = load_gray_image(image_path)?;
            masks.ensure_matches((background.height() as usize, background.width() as usize))?;
            Destination::Folder { background }
        }
        OutputTarget::Spreadsheet(path) => {
            // Only the header is read; the pixels are never needed here
            match image_dimensions(image_path) {
                Some(dim) => masks.ensure_matches(dim)?,
                None => warn!("Skipping size check against unreadable image {image_path:?}"),
            }
            Destination::Spreadsheet(path)
        }
    };
    info!(
        "Masks: {} axon pixels, {} myelin pixels",
        masks.axon.count(),
        masks.myelin.count()
    );

    let records = engine.axon_morphometrics(&masks.axon, Some(&masks.myelin), pixel_size, shape)?;

    let written = match destination {
        Destination::Spreadsheet(path) => {
            write_morphometrics(&records, path)?;
            vec![path.to_path_buf()]
        }
        Destination::Folder { background } => {
            let aggregate =
                engine.aggregate_morphometrics(&masks.axon, &masks.myelin, pixel_size, shape)?;
            let map =
                engine.draw_axon_diameter(&background, &masks.axon, &masks.myelin, pixel_size, shape)?;

            let spreadsheet = folder.join(&config.morphometrics_file);
            let map_path = folder.join(&config.diameter_map_file);
            let mut outputs = StagedOutputs::new();
            outputs.add(spreadsheet.clone(), spreadsheet_bytes(&records, &spreadsheet)?);
            outputs.add(
                folder.join(&config.aggregate_file),
                aggregate_to_text(&aggregate).into_bytes(),
            );
            outputs.add(map_path.clone(), diameter_map_bytes(&map, &map_path)?);
            outputs.commit()?
        }
    };

    info!("Done: {} axons, wrote {:?}", records.len(), written);
    Ok(PipelineReport {
        written,
        n_axons: records.len(),
        pixel_size,
    })
}

/// Compute and save morphometrics of one sample next to its image.
///
/// Masks come from thresholding `path_prediction`; the pixel size comes from
/// the sidecar file in the image folder.
pub fn launch_morphometrics_computation(
    path_img: &Path,
    path_prediction: &Path,
    axon_shape: AxonShape,
) -> Result<PipelineReport> {
    let request = PipelineRequest {
        mask_source: MaskSource::Prediction {
            image: path_img.to_path_buf(),
            prediction: path_prediction.to_path_buf(),
        },
        output: OutputTarget::SampleFolder,
        pixel_size: None,
        axon_shape: Some(axon_shape),
    };
    run(&MorphometricsConfig::default(), &RegionPropsEngine::new(), request)
}
