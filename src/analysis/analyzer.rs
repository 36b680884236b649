use tracing::{debug, warn};

use crate::analysis::normalizer::{ensure_latest, transform};
use crate::analysis::statistics::{calculate_percentile, round_to};
use crate::analysis::trend::{score_trend, TrendLabel};
use crate::config::AnalysisSettings;
use crate::core::timeseries::TimeSeries;
use crate::error::{AnalysisError, AnalysisOutcome};
use crate::indicators::registry::{IndicatorConfig, Region, TransformMethod};
use crate::models::AnalysisResult;

/// Full analysis of one indicator in one region.
///
/// Fails only when nothing can be shown: an empty series, or a display
/// transform without enough history. Percentile and trend failures leave the
/// field `None` and are recorded in `issues`. When the value at the latest raw
/// date is undefined, the current value, both percentiles and the trend are
/// all `None` with `MissingLatestValue`; the older display history is kept.
///
/// Without a config the reduced legacy analysis runs instead: percentiles on
/// the raw values, no trend.
pub fn analyze_indicator(
    series_id: &str,
    region: Region,
    series: &TimeSeries,
    config: Option<&IndicatorConfig>,
    settings: &AnalysisSettings,
) -> AnalysisOutcome<AnalysisResult> {
    let Some(config) = config else {
        return legacy_analyze(series_id, region, series, settings);
    };

    let raw_latest = series.last().ok_or(AnalysisError::InsufficientHistory {
        available: 0,
        required: 1,
    })?;

    let display = transform(series, config.frequency, config.method)?;
    let display_tail = display.last().ok_or(AnalysisError::MissingLatestValue)?;

    let mut issues = Vec::new();

    let current_value = record(
        ensure_latest(series, &display).map(|_| round_to(display_tail.value, 2)),
        &mut issues,
    );

    let percentile = |years: Option<u32>| {
        ensure_latest(series, &display).and_then(|_| {
            calculate_percentile(&display, years, config.inverted, settings.min_percentile_observations)
        })
    };
    let percentile_all = record(percentile(settings.all_time_years), &mut issues);
    let percentile_recent = record(percentile(Some(settings.recent_years)), &mut issues);

    let trend = record(
        score_trend(series, config.frequency, config.method, settings),
        &mut issues,
    );

    if !issues.is_empty() {
        debug!("{} ({}): degraded analysis: {:?}", series_id, region, issues);
    }

    Ok(AnalysisResult {
        series_id: series_id.to_string(),
        name: config.name.clone(),
        region,
        bucket: Some(config.bucket),
        category: Some(config.category),
        cluster: config.cluster,
        type_tag: Some(config.type_tag),
        current_value,
        current_date: raw_latest.timestamp,
        percentile_all,
        percentile_recent,
        trend_z: trend.map(|t| t.z),
        trend_label: trend.map(|t| t.label).unwrap_or(TrendLabel::Unavailable),
        unit: display_unit(series_id, config, display_tail.value),
        data: display,
        inverted: config.inverted,
        hidden: config.hidden,
        contextual: config.contextual,
        issues,
    })
}

fn legacy_analyze(
    series_id: &str,
    region: Region,
    series: &TimeSeries,
    settings: &AnalysisSettings,
) -> AnalysisOutcome<AnalysisResult> {
    warn!("{} ({}): no config found, using legacy analysis", series_id, region);

    let latest = series.last().ok_or(AnalysisError::InsufficientHistory {
        available: 0,
        required: 1,
    })?;

    let mut issues = vec![AnalysisError::MissingConfig {
        series_id: series_id.to_string(),
        region,
    }];

    let min_obs = settings.min_percentile_observations;
    let percentile_all = record(
        calculate_percentile(series, settings.all_time_years, false, min_obs),
        &mut issues,
    );
    let percentile_recent = record(
        calculate_percentile(series, Some(settings.recent_years), false, min_obs),
        &mut issues,
    );

    Ok(AnalysisResult {
        series_id: series_id.to_string(),
        name: series_id.to_string(),
        region,
        bucket: None,
        category: None,
        cluster: None,
        type_tag: None,
        current_value: latest.value.is_finite().then(|| round_to(latest.value, 2)),
        current_date: latest.timestamp,
        percentile_all,
        percentile_recent,
        trend_z: None,
        trend_label: TrendLabel::Unavailable,
        unit: "%".to_string(),
        data: series.clone(),
        inverted: false,
        hidden: false,
        contextual: false,
        issues,
    })
}

/// Keeps the value, or stores the failure (once) and yields `None`.
fn record<T>(outcome: AnalysisOutcome<T>, issues: &mut Vec<AnalysisError>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            if !issues.contains(&e) {
                issues.push(e);
            }
            None
        }
    }
}

fn display_unit(series_id: &str, config: &IndicatorConfig, latest: f64) -> String {
    match config.method {
        TransformMethod::Yoy => "% YoY".to_string(),
        TransformMethod::Mom if series_id == "PAYEMS" => "k jobs".to_string(),
        TransformMethod::Mom => "MoM".to_string(),
        TransformMethod::Level => {
            if let Some(unit) = config.unit {
                return unit.label().to_string();
            }
            let name = config.name.to_lowercase();
            let unit = if ["rate", "yield", "spread"].iter().any(|w| name.contains(w)) {
                "%"
            } else if name.contains("index") {
                "index"
            } else if latest > 1000.0 {
                "level"
            } else {
                "%"
            };
            unit.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::registry::{Registry, UnitType};
    use crate::models::DataPoint;
    use chrono::{Months, NaiveDate};

    fn monthly(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let d = start.checked_add_months(Months::new(i as u32)).unwrap();
                    DataPoint::new(d.and_hms_opt(0, 0, 0).unwrap().and_utc(), v)
                })
                .collect(),
        )
        .unwrap()
    }

    fn config(id: &str) -> IndicatorConfig {
        Registry::builtin().get_config(id, Region::Us).unwrap().clone()
    }

    #[test]
    fn test_yoy_indicator_ranks_changes() {
        // Steady 1%/month growth then a jump in the last month
        let mut values: Vec<f64> = (0..40).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        values.push(values[39] * 1.10);
        let cfg = config("CPIAUCSL");
        let series = monthly(&values);

        let result =
            analyze_indicator("CPIAUCSL", Region::Us, &series, Some(&cfg), &AnalysisSettings::default())
                .unwrap();

        assert_eq!(result.unit, "% YoY");
        assert_eq!(result.data.len(), values.len() - 12);
        assert_eq!(result.current_date, series.last().unwrap().timestamp);
        assert_eq!(result.percentile_all, Some(round_to(28.0 / 29.0 * 100.0, 1)));
        assert_eq!(result.bucket, Some(cfg.bucket));
    }

    #[test]
    fn test_inverted_indicator_flips_rank() {
        let mut values: Vec<f64> = (0..30).map(|i| 4.0 + (i % 7) as f64 * 0.1).collect();
        values.push(9.0);
        let cfg = config("UNRATE");
        assert!(cfg.inverted);

        let result =
            analyze_indicator("UNRATE", Region::Us, &monthly(&values), Some(&cfg), &AnalysisSettings::default())
                .unwrap();
        // Highest unemployment reading ranks at the bottom
        assert_eq!(result.percentile_all, Some(100.0 - round_to(30.0 / 31.0 * 100.0, 1)));
        assert_eq!(result.unit, "%");
    }

    #[test]
    fn test_payrolls_unit_and_short_history() {
        let values: Vec<f64> = (0..6).map(|i| 150_000.0 + i as f64 * 200.0).collect();
        let cfg = config("PAYEMS");

        let result =
            analyze_indicator("PAYEMS", Region::Us, &monthly(&values), Some(&cfg), &AnalysisSettings::default())
                .unwrap();
        assert_eq!(result.unit, "k jobs");
        assert_eq!(result.current_value, Some(200.0));
        assert_eq!(result.percentile_all, None);
        assert_eq!(result.trend_label, TrendLabel::Unavailable);
        assert!(result
            .issues
            .iter()
            .any(|e| matches!(e, AnalysisError::InsufficientHistory { .. })));
    }

    #[test]
    fn test_undefined_latest_yoy_is_unavailable() {
        // The last reading is compared against a zero twelve months earlier
        let mut values: Vec<f64> = (0..40).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        values[27] = 0.0;
        let cfg = config("CPIAUCSL");
        let series = monthly(&values);

        let result =
            analyze_indicator("CPIAUCSL", Region::Us, &series, Some(&cfg), &AnalysisSettings::default())
                .unwrap();

        assert_eq!(result.current_date, series.last().unwrap().timestamp);
        assert_eq!(result.current_value, None);
        assert_eq!(result.percentile_all, None);
        assert_eq!(result.percentile_recent, None);
        assert_eq!(result.trend_z, None);
        assert_eq!(result.trend_label, TrendLabel::Unavailable);
        assert_eq!(result.issues, vec![AnalysisError::MissingLatestValue]);
        // Earlier YoY history stays available for charting
        assert_eq!(result.data.max_date(), Some(series.points()[38].timestamp));
    }

    #[test]
    fn test_display_transform_failure_is_an_error() {
        let cfg = config("CPIAUCSL");
        let values: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let err = analyze_indicator("CPIAUCSL", Region::Us, &monthly(&values), Some(&cfg), &AnalysisSettings::default())
            .unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientHistory { available: 12, required: 13 });
    }

    #[test]
    fn test_legacy_path_without_config() {
        let values: Vec<f64> = (0..15).map(|i| i as f64).collect();
        let result =
            analyze_indicator("MYSTERY", Region::Uk, &monthly(&values), None, &AnalysisSettings::default())
                .unwrap();

        assert_eq!(result.trend_label, TrendLabel::Unavailable);
        assert_eq!(result.unit, "%");
        assert_eq!(result.percentile_all, Some(round_to(14.0 / 15.0 * 100.0, 1)));
        assert_eq!(
            result.issues[0],
            AnalysisError::MissingConfig { series_id: "MYSTERY".to_string(), region: Region::Uk }
        );
    }

    #[test]
    fn test_level_unit_inference() {
        let mut cfg = config("HOUST");
        assert_eq!(display_unit("HOUST", &cfg, 1400.0), "level");
        cfg.name = "Housing Price Index".to_string();
        assert_eq!(display_unit("HOUST", &cfg, 1400.0), "index");
        cfg.unit = Some(UnitType::BasisPoints);
        assert_eq!(display_unit("HOUST", &cfg, 1400.0), "bp");
    }
}
