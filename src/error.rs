use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators::registry::Region;

/// Why a percentile, trend or transform could not be produced.
///
/// None of these abort a batch. They degrade the affected field of an
/// `AnalysisResult` to `None` and are kept alongside it.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("Insufficient history: {available} observations, {required} required")]
    InsufficientHistory { available: usize, required: usize },

    #[error("Latest observation is missing")]
    MissingLatestValue,

    #[error("No indicator configuration for {series_id} ({region})")]
    MissingConfig { series_id: String, region: Region },

    #[error("Degenerate distribution over {observations} observations (zero spread)")]
    DegenerateDistribution { observations: usize },

    #[error("Series is not strictly ascending at {at}")]
    UnorderedSeries { at: DateTime<Utc> },
}

pub type AnalysisOutcome<T> = Result<T, AnalysisError>;
