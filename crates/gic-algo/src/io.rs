//! CSV table loading and matrix export.
//!
//! A table directory holds `transformers.csv`, `lines.csv`, `substations.csv`,
//! `buses.csv`, and optionally `gen_step_ups.csv`. Headers are the record
//! field names.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};
use faer::MatRef;
use gic_core::records::GicTables;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const TRANSFORMERS_FILE: &str = "transformers.csv";
pub const LINES_FILE: &str = "lines.csv";
pub const SUBSTATIONS_FILE: &str = "substations.csv";
pub const BUSES_FILE: &str = "buses.csv";
pub const GEN_STEP_UPS_FILE: &str = "gen_step_ups.csv";

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening '{}'", path.display()))?;
    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("parsing row {} of '{}'", i + 1, path.display())))
        .collect()
}

/// Load every table from `dir`. The step-up table is optional.
pub fn load_tables(dir: &Path) -> Result<GicTables> {
    let gsu_path = dir.join(GEN_STEP_UPS_FILE);
    let tables = GicTables {
        transformers: read_records(&dir.join(TRANSFORMERS_FILE))?,
        lines: read_records(&dir.join(LINES_FILE))?,
        substations: read_records(&dir.join(SUBSTATIONS_FILE))?,
        buses: read_records(&dir.join(BUSES_FILE))?,
        gen_step_ups: if gsu_path.exists() {
            read_records(&gsu_path)?
        } else {
            Vec::new()
        },
    };
    debug!(
        dir = %dir.display(),
        transformers = tables.transformers.len(),
        lines = tables.lines.len(),
        substations = tables.substations.len(),
        buses = tables.buses.len(),
        gen_step_ups = tables.gen_step_ups.len(),
        "loaded GIC tables"
    );
    Ok(tables)
}

/// Write a dense matrix with one header per column and an optional leading
/// label column.
pub fn write_matrix_csv(
    path: &Path,
    matrix: MatRef<'_, f64>,
    headers: &[String],
    row_labels: Option<&[String]>,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }
    let mut wtr =
        Writer::from_path(path).with_context(|| format!("creating '{}'", path.display()))?;

    let mut header: Vec<String> = Vec::with_capacity(headers.len() + 1);
    if row_labels.is_some() {
        header.push("row".to_string());
    }
    header.extend(headers.iter().cloned());
    wtr.write_record(&header)?;

    for i in 0..matrix.nrows() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        if let Some(labels) = row_labels {
            record.push(labels.get(i).cloned().unwrap_or_else(|| i.to_string()));
        }
        record.extend((0..matrix.ncols()).map(|j| matrix.read(i, j).to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()
        .with_context(|| format!("flushing '{}'", path.display()))?;
    Ok(())
}
