use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::analysis::normalizer::trend_base;
use crate::analysis::statistics::calculate_zscore;
use crate::config::{AnalysisSettings, TrendThresholds};
use crate::core::timeseries::TimeSeries;
use crate::error::{AnalysisError, AnalysisOutcome};
use crate::indicators::registry::{Frequency, Region, Registry, TransformMethod};
use crate::models::DataPoint;

/// Momentum direction of an indicator, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    #[serde(rename = "Trend unavailable")]
    Unavailable,
    #[serde(rename = "Strong down")]
    StrongDown,
    #[serde(rename = "Mild down")]
    MildDown,
    Flat,
    #[serde(rename = "Mild up")]
    MildUp,
    #[serde(rename = "Strong up")]
    StrongUp,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Unavailable => "Trend unavailable",
            TrendLabel::StrongDown => "Strong down",
            TrendLabel::MildDown => "Mild down",
            TrendLabel::Flat => "Flat",
            TrendLabel::MildUp => "Mild up",
            TrendLabel::StrongUp => "Strong up",
        }
    }

    pub fn is_available(&self) -> bool {
        *self != TrendLabel::Unavailable
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Map a z-score to a label. Upper bounds of each band are inclusive:
/// `z == strong` is still mild, `|z| == mild` is still flat.
pub fn label_from_z(z: Option<f64>, thresholds: &TrendThresholds) -> TrendLabel {
    let Some(z) = z.filter(|z| z.is_finite()) else {
        return TrendLabel::Unavailable;
    };

    if z > thresholds.strong {
        TrendLabel::StrongUp
    } else if z > thresholds.mild {
        TrendLabel::MildUp
    } else if z < -thresholds.strong {
        TrendLabel::StrongDown
    } else if z < -thresholds.mild {
        TrendLabel::MildDown
    } else {
        TrendLabel::Flat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSignal {
    pub z: f64,
    pub label: TrendLabel,
}

/// Standardized momentum of the latest observation.
///
/// The raw series is turned into its change representation, which needs at
/// least `min_trend_observations` usable points. The latest change is scored
/// against the mean and population standard deviation of all changes.
pub fn score_trend(
    series: &TimeSeries,
    frequency: Frequency,
    method: TransformMethod,
    settings: &AnalysisSettings,
) -> AnalysisOutcome<TrendSignal> {
    let base = trend_base(series, frequency, method)?.dropna();
    let z = calculate_zscore(&base, settings.min_trend_observations)?;

    Ok(TrendSignal {
        z,
        label: label_from_z(Some(z), &settings.trend),
    })
}

/// `(z, label)` pair with failures collapsed to `(None, Unavailable)`.
pub fn trend(
    series: &TimeSeries,
    frequency: Frequency,
    method: TransformMethod,
    settings: &AnalysisSettings,
) -> (Option<f64>, TrendLabel) {
    match score_trend(series, frequency, method, settings) {
        Ok(signal) => (Some(signal.z), signal.label),
        Err(_) => (None, TrendLabel::Unavailable),
    }
}

/// One row of a long-format observation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub series_id: String,
    pub region: Region,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTrend {
    pub series_id: String,
    pub region: Region,
    pub latest_date: Option<DateTime<Utc>>,
    pub trend_z: Option<f64>,
    pub trend_label: TrendLabel,
    pub issue: Option<AnalysisError>,
}

/// Trend for every (series, region) group of a mixed observation table.
///
/// Each group is scored against its own history and its own config; z-scores
/// are never compared across groups. Groups with no config come back as
/// `MissingConfig`.
pub fn trend_by_group(
    observations: &[Observation],
    registry: &Registry,
    settings: &AnalysisSettings,
) -> Vec<GroupTrend> {
    let mut groups: BTreeMap<(String, Region), Vec<DataPoint>> = BTreeMap::new();
    for obs in observations {
        groups
            .entry((obs.series_id.clone(), obs.region))
            .or_default()
            .push(DataPoint::new(obs.timestamp, obs.value));
    }

    groups
        .into_iter()
        .map(|((series_id, region), points)| {
            let series = TimeSeries::from_unsorted(points);
            let latest_date = series.max_date();

            let outcome = registry
                .get_config(&series_id, region)
                .ok_or_else(|| AnalysisError::MissingConfig {
                    series_id: series_id.clone(),
                    region,
                })
                .and_then(|cfg| score_trend(&series, cfg.frequency, cfg.method, settings));

            let (trend_z, trend_label, issue) = match outcome {
                Ok(signal) => (Some(signal.z), signal.label, None),
                Err(e) => (None, TrendLabel::Unavailable, Some(e)),
            };

            GroupTrend { series_id, region, latest_date, trend_z, trend_label, issue }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Months, NaiveDate};

    fn month(i: usize) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2015, 1, 1)
            .unwrap()
            .checked_add_months(Months::new(i as u32))
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn monthly(values: &[f64]) -> TimeSeries {
        TimeSeries::new(
            values.iter().enumerate().map(|(i, &v)| DataPoint::new(month(i), v)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_label_boundaries() {
        let t = TrendThresholds::default();
        assert_eq!(label_from_z(Some(1.0), &t), TrendLabel::MildUp);
        assert_eq!(label_from_z(Some(1.0001), &t), TrendLabel::StrongUp);
        assert_eq!(label_from_z(Some(0.3), &t), TrendLabel::Flat);
        assert_eq!(label_from_z(Some(-0.3), &t), TrendLabel::Flat);
        assert_eq!(label_from_z(Some(-1.0), &t), TrendLabel::MildDown);
        assert_eq!(label_from_z(Some(-1.5), &t), TrendLabel::StrongDown);
        assert_eq!(label_from_z(None, &t), TrendLabel::Unavailable);
        assert_eq!(label_from_z(Some(f64::NAN), &t), TrendLabel::Unavailable);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = TrendThresholds { strong: 2.0, mild: 0.5 };
        assert_eq!(label_from_z(Some(1.5), &t), TrendLabel::MildUp);
        assert_eq!(label_from_z(Some(0.4), &t), TrendLabel::Flat);
    }

    #[test]
    fn test_constant_mom_changes_are_unavailable() {
        // 100..113: every month-over-month change is exactly 1
        let values: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        let settings = AnalysisSettings::default();
        let series = monthly(&values);

        let err = score_trend(&series, Frequency::Monthly, TransformMethod::Mom, &settings).unwrap_err();
        assert_eq!(err, AnalysisError::DegenerateDistribution { observations: 13 });
        assert_eq!(
            trend(&series, Frequency::Monthly, TransformMethod::Mom, &settings),
            (None, TrendLabel::Unavailable)
        );
    }

    #[test]
    fn test_requires_twelve_changes() {
        let settings = AnalysisSettings::default();
        // 12 points give 11 changes
        let values: Vec<f64> = (0..12).map(|i| (i * i) as f64).collect();
        let err = score_trend(&monthly(&values), Frequency::Monthly, TransformMethod::Mom, &settings)
            .unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientHistory { available: 11, required: 12 });
    }

    #[test]
    fn test_accelerating_series_is_strong_up() {
        let settings = AnalysisSettings::default();
        let values: Vec<f64> = (0..20).map(|i| (i * i) as f64).collect();
        let signal =
            score_trend(&monthly(&values), Frequency::Monthly, TransformMethod::Mom, &settings).unwrap();
        assert!(signal.z > 1.0);
        assert_eq!(signal.label, TrendLabel::StrongUp);
    }

    #[test]
    fn test_trend_by_group_scores_groups_independently() {
        let settings = AnalysisSettings::default();
        let mut observations = Vec::new();
        // Payrolls accelerating, unordered on input
        for i in (0..20).rev() {
            observations.push(Observation {
                series_id: "PAYEMS".to_string(),
                region: Region::Us,
                timestamp: month(i),
                value: (i * i) as f64,
            });
        }
        // Same id in a region with no config
        observations.push(Observation {
            series_id: "PAYEMS".to_string(),
            region: Region::Japan,
            timestamp: month(0),
            value: 1.0,
        });

        let trends = trend_by_group(&observations, Registry::builtin(), &settings);
        assert_eq!(trends.len(), 2);

        let us = trends.iter().find(|t| t.region == Region::Us).unwrap();
        assert_eq!(us.trend_label, TrendLabel::StrongUp);
        assert_eq!(us.latest_date, Some(month(19)));

        let jp = trends.iter().find(|t| t.region == Region::Japan).unwrap();
        assert_eq!(jp.trend_label, TrendLabel::Unavailable);
        assert!(matches!(jp.issue, Some(AnalysisError::MissingConfig { .. })));
    }

    #[test]
    fn test_label_serializes_as_text() {
        let json = serde_json::to_string(&TrendLabel::MildDown).unwrap();
        assert_eq!(json, "\"Mild down\"");
        assert_eq!(TrendLabel::Unavailable.to_string(), "Trend unavailable");
    }
}
