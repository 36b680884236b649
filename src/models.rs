use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};

use crate::analysis::trend::TrendLabel;
use crate::core::timeseries::TimeSeries;
use crate::error::AnalysisError;
use crate::indicators::registry::{Bucket, Category, Cluster, Region, TypeTag};

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Indicator {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub region: String,
    pub source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, FromRow)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Per-indicator output of one analysis cycle.
///
/// Created fresh on every refresh and never mutated afterwards. Any field that
/// could not be computed is `None`, and the reason is kept in `issues`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisResult {
    pub series_id: String,
    pub name: String,
    pub region: Region,
    pub bucket: Option<Bucket>,
    pub category: Option<Category>,
    pub cluster: Option<Cluster>,
    pub type_tag: Option<TypeTag>,
    /// Latest display value, `None` when it is undefined at `current_date`.
    pub current_value: Option<f64>,
    pub current_date: DateTime<Utc>,
    pub percentile_all: Option<f64>,
    pub percentile_recent: Option<f64>,
    pub trend_z: Option<f64>,
    pub trend_label: TrendLabel,
    pub unit: String,
    /// Transformed series (YoY, MoM or level) used for charting and ranking.
    pub data: TimeSeries,
    pub inverted: bool,
    pub hidden: bool,
    pub contextual: bool,
    pub issues: Vec<AnalysisError>,
}

impl AnalysisResult {
    /// Whether this indicator may feed group and composite scores.
    pub fn is_scored(&self) -> bool {
        !self.hidden && !self.contextual
    }
}

/// An indicator dropped from a batch, reported instead of aborting the load.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExcludedIndicator {
    pub series_id: String,
    pub name: String,
    pub region: Region,
    pub last_seen: Option<DateTime<Utc>>,
    pub reason: String,
}
