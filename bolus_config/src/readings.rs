//! Glucose readings CSV.
//!
//! Expected headers (exact, in order):
//! timestamp,value            or
//! timestamp,value,source
//!
//! Example:
//! timestamp,value,source
//! 2024-03-01T07:15:00Z,9.4,fingerstick
//! 2024-03-01T12:40:00+01:00,6.1,
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReadingRow {
    pub timestamp: DateTime<Utc>,
    /// mmol/L
    pub value: f64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub source: Option<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.trim().is_empty()))
}

pub fn load_readings_csv(path: &Path) -> eyre::Result<Vec<ReadingRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open readings CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    let accepted = actual == ["timestamp", "value"] || actual == ["timestamp", "value", "source"];
    if !accepted {
        eyre::bail!(
            "readings CSV must have headers 'timestamp,value[,source]', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ReadingRow>().enumerate() {
        match rec {
            Ok(row) => {
                if !row.value.is_finite() || row.value <= 0.0 {
                    eyre::bail!("invalid CSV row {}: value must be > 0", idx + 2);
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}
