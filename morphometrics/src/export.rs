//! Persistence of morphometrics results.
//!
//! Every output is serialized fully in memory and staged as a temporary
//! sibling file. Staged files are renamed into place only once all of them
//! are on disk, so a failed export leaves neither truncated files nor a
//! partial set of outputs. `NaN` values are written as empty cells.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use log::{debug, info, warn};
use rust_xlsxwriter::Workbook;

use crate::engine::{AggregateMorphometrics, AxonMorphometrics};
use crate::error::{MorphometricsError, Result};

const WORKSHEET_NAME: &str = "morphometrics";

/// Spreadsheet container, chosen from the output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xlsx,
    Csv,
}

impl SpreadsheetFormat {
    /// `.csv` (any case) selects CSV; everything else is XLSX.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SpreadsheetFormat::Csv,
            _ => SpreadsheetFormat::Xlsx,
        }
    }
}

/// Append `.xlsx` unless the name already ends in `.xlsx` or `.csv`.
pub fn normalize_output_filename(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".xlsx") || lower.ends_with(".csv") {
        name.to_string()
    } else {
        format!("{name}.xlsx")
    }
}

fn cell_text(value: f32) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn csv_bytes(records: &[AxonMorphometrics]) -> std::result::Result<Vec<u8>, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(AxonMorphometrics::COLUMN_NAMES)
        .map_err(|e| e.to_string())?;
    for record in records {
        writer
            .write_record(record.values().iter().map(|&v| cell_text(v)))
            .map_err(|e| e.to_string())?;
    }
    writer.into_inner().map_err(|e| e.to_string())
}

fn xlsx_bytes(records: &[AxonMorphometrics]) -> std::result::Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(WORKSHEET_NAME)
        .map_err(|e| e.to_string())?;

    for (col, name) in AxonMorphometrics::COLUMN_NAMES.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *name)
            .map_err(|e| e.to_string())?;
    }
    for (row, record) in records.iter().enumerate() {
        for (col, value) in record.values().iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            worksheet
                .write_number(row as u32 + 1, col as u16, *value as f64)
                .map_err(|e| e.to_string())?;
        }
    }

    workbook.save_to_buffer().map_err(|e| e.to_string())
}

/// Serialize the per-axon table in the given format.
pub fn morphometrics_to_bytes(
    records: &[AxonMorphometrics],
    format: SpreadsheetFormat,
) -> std::result::Result<Vec<u8>, String> {
    match format {
        SpreadsheetFormat::Csv => csv_bytes(records),
        SpreadsheetFormat::Xlsx => xlsx_bytes(records),
    }
}

/// Serialize the per-axon table in the format selected by `path`.
pub fn spreadsheet_bytes(records: &[AxonMorphometrics], path: &Path) -> Result<Vec<u8>> {
    morphometrics_to_bytes(records, SpreadsheetFormat::from_path(path))
        .map_err(|e| MorphometricsError::export(path, e))
}

/// Aggregate statistics as `key: value` lines.
pub fn aggregate_to_text(aggregate: &AggregateMorphometrics) -> String {
    aggregate
        .entries()
        .iter()
        .map(|(key, value)| format!("{key}: {value}\n"))
        .collect()
}

/// Encode the diameter map; the image format follows the extension of `path`.
pub fn diameter_map_bytes(map: &RgbImage, path: &Path) -> Result<Vec<u8>> {
    let format = ImageFormat::from_path(path).map_err(|e| MorphometricsError::export(path, e))?;
    let mut bytes = Vec::new();
    map.write_to(&mut Cursor::new(&mut bytes), format)
        .map_err(|e| MorphometricsError::export(path, e))?;
    Ok(bytes)
}

fn staging_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| MorphometricsError::export(path, "output path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

fn remove_staged(staged: &[(PathBuf, PathBuf)]) {
    for (tmp_path, _) in staged {
        if let Err(e) = fs::remove_file(tmp_path) {
            warn!("Failed to remove staged file {tmp_path:?}: {e}");
        }
    }
}

/// Output files written together.
///
/// [`StagedOutputs::commit`] writes every file as `<name>.tmp` first. If any
/// write fails, all staged files are removed and no target is touched.
#[derive(Debug, Default)]
pub struct StagedOutputs {
    files: Vec<(PathBuf, Vec<u8>)>,
}

impl StagedOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: PathBuf, bytes: Vec<u8>) {
        self.files.push((path, bytes));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write all staged files, then rename them into place.
    ///
    /// Returns the target paths in the order they were added.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.files.len());
        for (path, bytes) in &self.files {
            let tmp_path = match staging_path(path) {
                Ok(tmp_path) => tmp_path,
                Err(e) => {
                    remove_staged(&staged);
                    return Err(e);
                }
            };
            if let Err(e) = fs::write(&tmp_path, bytes) {
                if tmp_path.exists() {
                    staged.push((tmp_path, path.clone()));
                }
                remove_staged(&staged);
                return Err(MorphometricsError::export(path, e));
            }
            staged.push((tmp_path, path.clone()));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (tmp_path, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp_path, path) {
                remove_staged(&staged[i..]);
                return Err(MorphometricsError::export(path, e));
            }
            debug!("Wrote {path:?}");
            written.push(path.clone());
        }
        Ok(written)
    }
}

/// Write one row per axon with a header of the 11 column names.
///
/// The format follows the extension of `path`.
pub fn write_morphometrics(
    records: &[AxonMorphometrics],
    path: &Path,
) -> Result<SpreadsheetFormat> {
    let format = SpreadsheetFormat::from_path(path);
    let mut outputs = StagedOutputs::new();
    outputs.add(path.to_path_buf(), spreadsheet_bytes(records, path)?);
    outputs.commit()?;
    info!(
        "Wrote {} axons to {:?} ({:?})",
        records.len(),
        path,
        format
    );
    Ok(format)
}

/// Write aggregate statistics as `key: value` lines.
pub fn write_aggregate_morphometrics(
    aggregate: &AggregateMorphometrics,
    folder: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    let path = folder.join(file_name);
    let mut outputs = StagedOutputs::new();
    outputs.add(path.clone(), aggregate_to_text(aggregate).into_bytes());
    outputs.commit()?;
    Ok(path)
}

/// Save the rendered diameter map as an image in `folder`.
pub fn save_map_of_axon_diameters(
    map: &RgbImage,
    folder: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    let path = folder.join(file_name);
    let mut outputs = StagedOutputs::new();
    outputs.add(path.clone(), diameter_map_bytes(map, &path)?);
    outputs.commit()?;
    Ok(path)
}
