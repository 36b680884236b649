use crate::core::timeseries::TimeSeries;
use crate::error::{AnalysisError, AnalysisOutcome};
use crate::indicators::registry::{Frequency, TransformMethod};

/// Display transform: the representation that gets shown and ranked.
///
/// - `Level`: series unchanged
/// - `Mom`: first difference
/// - `Yoy`: percent change (×100) against the observation one year earlier,
///   one year being `frequency.periods_per_year()` observations
///
/// Fails with `InsufficientHistory` when the series is shorter than the
/// shift plus one, and with `MissingLatestValue` when the change at the
/// series' last date is undefined.
pub fn normalize(
    series: &TimeSeries,
    frequency: Frequency,
    method: TransformMethod,
) -> AnalysisOutcome<TimeSeries> {
    let transformed = transform(series, frequency, method)?;
    ensure_latest(series, &transformed)?;
    Ok(transformed)
}

/// Same as [`normalize`] but keeps a result whose newest usable point is
/// older than the input's, e.g. when the latest YoY divides by zero.
pub fn transform(
    series: &TimeSeries,
    frequency: Frequency,
    method: TransformMethod,
) -> AnalysisOutcome<TimeSeries> {
    let transformed = match method {
        TransformMethod::Level => {
            ensure_len(series, 1)?;
            series.dropna()
        }
        TransformMethod::Mom => {
            ensure_len(series, 2)?;
            series.lagged_map(1, |cur, prev| cur - prev)
        }
        TransformMethod::Yoy => {
            let shift = frequency.periods_per_year();
            ensure_len(series, shift + 1)?;
            series.lagged_map(shift, |cur, prev| (cur / prev - 1.0) * 100.0)
        }
    };

    if transformed.is_empty() {
        return Err(AnalysisError::InsufficientHistory { available: 0, required: 1 });
    }
    Ok(transformed)
}

/// Momentum basis for the trend score.
///
/// Always a change representation, whatever the display transform:
/// - `Yoy`: ratio to one year earlier, minus one
/// - `Mom`: first difference
/// - `Level`: change over half a year of observations (at least one)
pub fn trend_base(
    series: &TimeSeries,
    frequency: Frequency,
    method: TransformMethod,
) -> AnalysisOutcome<TimeSeries> {
    let year_shift = frequency.periods_per_year();

    let (shift, base) = match method {
        TransformMethod::Yoy => (year_shift, series.lagged_map(year_shift, |cur, prev| cur / prev - 1.0)),
        TransformMethod::Mom => (1, series.lagged_map(1, |cur, prev| cur - prev)),
        TransformMethod::Level => {
            let half = (year_shift / 2).max(1);
            (half, series.lagged_map(half, |cur, prev| cur - prev))
        }
    };

    ensure_len(series, shift + 1)?;
    ensure_latest(series, &base)?;
    Ok(base)
}

/// Fails unless `derived` has a value at the last date of `raw`.
pub fn ensure_latest(raw: &TimeSeries, derived: &TimeSeries) -> AnalysisOutcome<()> {
    match (raw.max_date(), derived.max_date()) {
        (Some(raw_last), Some(derived_last)) if raw_last == derived_last => Ok(()),
        _ => Err(AnalysisError::MissingLatestValue),
    }
}

fn ensure_len(series: &TimeSeries, required: usize) -> AnalysisOutcome<()> {
    if series.len() < required {
        return Err(AnalysisError::InsufficientHistory {
            available: series.len(),
            required,
        });
    }
    Ok(())
}
