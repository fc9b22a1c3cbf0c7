//! Input file loading for the tuning CLI.

use std::path::Path;

use anyhow::{bail, Context};
use csv::ReaderBuilder;
use serde::Deserialize;
use sw_engine::StepwiseConfig;
use sw_optimizer::SearchSpace;
use sw_types::Dataset;

/// Contents of the `--config` JSON file.
#[derive(Debug, Deserialize)]
pub struct TuningFile {
    #[serde(default)]
    pub config: StepwiseConfig,
    pub stages: Vec<SearchSpace>,
}

pub fn load_tuning_file(path: &Path) -> anyhow::Result<TuningFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tuning file {}", path.display()))?;
    let file: TuningFile = serde_json::from_str(&raw)
        .with_context(|| format!("invalid tuning file {}", path.display()))?;
    Ok(file)
}

/// Reads a headed CSV of numeric columns. The target column defaults to the
/// last one; every other column becomes a feature.
pub fn load_csv(path: &Path, target: Option<&str>) -> anyhow::Result<Dataset> {
    tracing::info!("Loading CSV data from: {}", path.display());

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open CSV file {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    if headers.len() < 2 {
        bail!("CSV needs at least one feature column and a target column");
    }
    let target_idx = match target {
        Some(name) => headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("target column '{}' not found", name))?,
        None => headers.len() - 1,
    };

    let mut features = Vec::new();
    let mut targets = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let mut row = Vec::with_capacity(headers.len() - 1);
        for (col, field) in record.iter().enumerate() {
            let value: f64 = field.parse().with_context(|| {
                format!(
                    "row {}, column '{}': '{}' is not a number",
                    line + 2,
                    &headers[col],
                    field
                )
            })?;
            if col == target_idx {
                targets.push(value);
            } else {
                row.push(value);
            }
        }
        features.push(row);
    }

    tracing::debug!("Loaded {} rows with {} features", targets.len(), headers.len() - 1);
    Ok(Dataset::new(features, targets)?)
}
