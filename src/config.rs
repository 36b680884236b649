//! Analysis settings.
//!
//! Every threshold the analytics use lives here and is passed in explicitly,
//! so tests can run against alternate values. Settings are read from TOML;
//! any field left out falls back to its default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::indicators::registry::Frequency;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Lookback for the "recent regime" percentile.
    pub recent_years: u32,
    /// Lookback for the "all-time" percentile. `None` means whole history.
    pub all_time_years: Option<u32>,
    pub min_percentile_observations: usize,
    pub min_trend_observations: usize,
    pub trend: TrendThresholds,
    pub composite: CompositeSettings,
    pub summary: SummaryThresholds,
    pub freshness: FreshnessThresholds,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            recent_years: 5,
            all_time_years: None,
            min_percentile_observations: 10,
            min_trend_observations: 12,
            trend: TrendThresholds::default(),
            composite: CompositeSettings::default(),
            summary: SummaryThresholds::default(),
            freshness: FreshnessThresholds::default(),
        }
    }
}

/// Z-score cut points for trend labels. `z > strong` is a strong move,
/// `mild < z <= strong` a mild one, and `|z| <= mild` is flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendThresholds {
    pub strong: f64,
    pub mild: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self { strong: 1.0, mild: 0.3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeSettings {
    pub min_per_category: usize,
    pub min_total: usize,
    pub weights: CompositeWeights,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            min_per_category: 2,
            min_total: 6,
            weights: CompositeWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub growth: f64,
    pub labor: f64,
    pub sentiment: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self { growth: 0.5, labor: 0.3, sentiment: 0.2 }
    }
}

/// Average-percentile cut points for Strong / Weak group summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryThresholds {
    pub strong_at: f64,
    pub weak_at: f64,
}

impl Default for SummaryThresholds {
    fn default() -> Self {
        Self { strong_at: 65.0, weak_at: 35.0 }
    }
}

/// Maximum data age, in months, before an indicator is treated as stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessThresholds {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
    pub quarterly: u32,
    pub annual: u32,
    pub irregular: u32,
}

impl Default for FreshnessThresholds {
    fn default() -> Self {
        Self {
            daily: 3,
            weekly: 4,
            monthly: 6,
            quarterly: 9,
            annual: 18,
            irregular: 12,
        }
    }
}

impl FreshnessThresholds {
    pub fn max_age_months(&self, frequency: Frequency) -> u32 {
        match frequency {
            Frequency::Daily => self.daily,
            Frequency::Weekly => self.weekly,
            Frequency::Monthly => self.monthly,
            Frequency::Quarterly => self.quarterly,
            Frequency::Annual => self.annual,
            Frequency::Irregular => self.irregular,
        }
    }
}

impl AnalysisSettings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse analysis settings")
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_toml_str(&raw)
    }
}
