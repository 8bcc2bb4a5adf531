//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Output encodings understood by the exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    /// `.csv` selects CSV; everything else, stdout included, is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Format::Csv,
            _ => Format::Json,
        }
    }
}

pub mod trajectory {
    use std::io::Write;

    use intercept_core::{Frame, Trajectory};
    use serde::Serialize;

    use crate::ExportError;

    /// CSV row: one sample per line, UTC alongside the Julian Date.
    #[derive(Debug, Serialize)]
    struct Row<'a> {
        jd: f64,
        utc: String,
        x_km: f64,
        y_km: f64,
        z_km: f64,
        vx_km_s: f64,
        vy_km_s: f64,
        vz_km_s: f64,
        frame: Frame,
        source: &'a str,
    }

    /// Write every sample as CSV with a header row.
    pub fn write_csv(writer: &mut dyn Write, trajectory: &Trajectory) -> Result<(), ExportError> {
        let mut csv = csv::Writer::from_writer(writer);
        for sample in trajectory.samples() {
            let [x_km, y_km, z_km] = sample.position_km;
            let [vx_km_s, vy_km_s, vz_km_s] = sample.velocity_km_s;
            csv.serialize(Row {
                jd: sample.epoch_jd,
                utc: intercept_core::time::format_jd(sample.epoch_jd),
                x_km,
                y_km,
                z_km,
                vx_km_s,
                vy_km_s,
                vz_km_s,
                frame: sample.frame,
                source: &sample.source,
            })?;
        }
        csv.flush()?;
        Ok(())
    }
}

pub mod json {
    use std::io::Write;

    use serde::Serialize;

    use crate::ExportError;

    /// Pretty-printed JSON followed by a newline.
    pub fn write_pretty<T: Serialize + ?Sized>(
        writer: &mut dyn Write,
        value: &T,
    ) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut *writer, value)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
