use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::normalizer::transform;
use crate::core::timeseries::{align_series, TimeSeries};
use crate::error::{AnalysisError, AnalysisOutcome};
use crate::indicators::registry::{Frequency, TransformMethod};

/// One date of an aggregate's YoY growth, split by member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionRow {
    pub timestamp: DateTime<Utc>,
    pub aggregate_yoy: f64,
    /// `(member, contribution)` in the order members were given.
    pub members: Vec<(String, f64)>,
    /// Part of the aggregate change not explained by the listed members.
    pub rest: f64,
}

/// Splits the aggregate's YoY change into member contributions.
///
/// Each member is weighted by its latest level relative to the aggregate's
/// latest level. Only dates where the aggregate and every member have a YoY
/// value are returned.
pub fn country_contributions(
    aggregate: &TimeSeries,
    members: &[(&str, &TimeSeries)],
    frequency: Frequency,
) -> AnalysisOutcome<Vec<ContributionRow>> {
    let aggregate_yoy = transform(aggregate, frequency, TransformMethod::Yoy)?;
    let aggregate_latest = aggregate
        .last()
        .map(|dp| dp.value)
        .filter(|v| v.is_finite())
        .ok_or(AnalysisError::MissingLatestValue)?;

    let mut rows: Vec<ContributionRow> = aggregate_yoy
        .points()
        .iter()
        .map(|dp| ContributionRow {
            timestamp: dp.timestamp,
            aggregate_yoy: dp.value,
            members: Vec::with_capacity(members.len()),
            rest: dp.value,
        })
        .collect();

    for (name, series) in members {
        let yoy = transform(series, frequency, TransformMethod::Yoy)?;
        let latest = series.last().map(|dp| dp.value).unwrap_or(f64::NAN);
        let weight = if aggregate_latest > 0.0 && latest.is_finite() {
            latest / aggregate_latest
        } else {
            0.0
        };

        // Both sides ascend by date, so the joined rows do too
        let joined = align_series(&aggregate_yoy, &yoy);
        rows.retain_mut(|row| {
            match joined.binary_search_by_key(&row.timestamp, |(ts, _, _)| *ts) {
                Ok(idx) => {
                    let contribution = joined[idx].2 * weight;
                    row.members.push((name.to_string(), contribution));
                    row.rest -= contribution;
                    true
                }
                Err(_) => false,
            }
        });
    }

    Ok(rows)
}
