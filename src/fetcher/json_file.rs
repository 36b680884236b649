use async_trait::async_trait;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::path::PathBuf;

use super::DataSource;
use crate::models::DataPoint;

/// Reads `<dir>/<series_id>.json`, a JSON array of `{ "date", "value" }`
/// records. Dates are `YYYY-MM-DD` or RFC 3339; `null` values are skipped.
pub struct JsonDirSource {
    dir: PathBuf,
}

#[derive(Deserialize)]
struct Record {
    #[serde(alias = "timestamp")]
    date: String,
    value: Option<f64>,
}

impl JsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn parse_records(raw: &str) -> Result<Vec<DataPoint>> {
        let records: Vec<Record> = serde_json::from_str(raw)?;

        records
            .into_iter()
            .filter_map(|r| r.value.map(|v| (r.date, v)))
            .map(|(date, value)| Ok(DataPoint::new(parse_date(&date)?, value)))
            .collect()
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| anyhow!("Invalid date: {}", raw));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Unrecognised date: {}", raw))
}

#[async_trait]
impl DataSource for JsonDirSource {
    fn name(&self) -> &str {
        "json"
    }

    async fn fetch_data(&self, series_id: &str) -> Result<Vec<DataPoint>> {
        let path = self.dir.join(format!("{}.json", series_id));
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse_records(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
