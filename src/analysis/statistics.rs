use crate::core::timeseries::TimeSeries;
use crate::error::{AnalysisError, AnalysisOutcome};

/// Round to a fixed number of decimals (half away from zero).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Calculate Percentile Rank (0.0 - 100.0) of the latest observation.
///
/// The window keeps observations within `window_years` of the series' own
/// latest date (`None` = whole history); the latest value is part of the
/// window. Rank is the share of window values strictly below the latest,
/// rounded to one decimal. With `invert`, the result is `100 - rank`.
pub fn calculate_percentile(
    series: &TimeSeries,
    window_years: Option<u32>,
    invert: bool,
    min_observations: usize,
) -> AnalysisOutcome<f64> {
    let latest = series.last().ok_or(AnalysisError::InsufficientHistory {
        available: 0,
        required: min_observations,
    })?;
    if !latest.value.is_finite() {
        return Err(AnalysisError::MissingLatestValue);
    }
    let latest = latest.value;

    let window_data: Vec<f64> = series
        .window_years(window_years)
        .values()
        .filter(|v| v.is_finite())
        .collect();

    if window_data.len() < min_observations {
        return Err(AnalysisError::InsufficientHistory {
            available: window_data.len(),
            required: min_observations,
        });
    }

    if window_data.iter().all(|&v| v == latest) {
        return Err(AnalysisError::DegenerateDistribution { observations: window_data.len() });
    }

    // Count values strictly less than latest; ties do not move the rank
    let count_less = window_data.iter().filter(|&&v| v < latest).count();
    let rank = round_to(count_less as f64 / window_data.len() as f64 * 100.0, 1);

    Ok(if invert { 100.0 - rank } else { rank })
}

/// Mean and population standard deviation (divide by N).
pub fn calculate_mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|value| {
            let diff = mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / n;

    Some((mean, variance.sqrt()))
}

/// Calculate Z-Score of the latest value against the whole series.
/// (Latest - Mean) / StdDev, population standard deviation.
pub fn calculate_zscore(series: &TimeSeries, min_observations: usize) -> AnalysisOutcome<f64> {
    let values: Vec<f64> = series.values().filter(|v| v.is_finite()).collect();
    if values.len() < min_observations {
        return Err(AnalysisError::InsufficientHistory {
            available: values.len(),
            required: min_observations,
        });
    }

    let latest = series
        .last()
        .map(|dp| dp.value)
        .filter(|v| v.is_finite())
        .ok_or(AnalysisError::MissingLatestValue)?;

    let (mean, std_dev) = calculate_mean_std(&values).ok_or(AnalysisError::InsufficientHistory {
        available: 0,
        required: min_observations,
    })?;

    // Exact zero only; a constant series can still carry rounding noise
    if std_dev == 0.0 || !std_dev.is_finite() {
        return Err(AnalysisError::DegenerateDistribution { observations: values.len() });
    }

    Ok((latest - mean) / std_dev)
}
