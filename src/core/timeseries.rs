use crate::error::AnalysisError;
use crate::models::DataPoint;
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An ordered series of observations with unique, strictly ascending timestamps.
///
/// The analytics never mutate a series in place: every transform returns a
/// new `TimeSeries`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<DataPoint>", into = "Vec<DataPoint>")]
pub struct TimeSeries {
    points: Vec<DataPoint>,
}

impl TimeSeries {
    /// Validates ordering. Fails on the first timestamp that is not strictly
    /// after its predecessor.
    pub fn new(points: Vec<DataPoint>) -> Result<Self, AnalysisError> {
        if let Some(pair) = points.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(AnalysisError::UnorderedSeries { at: pair[1].timestamp });
        }
        Ok(Self { points })
    }

    /// For adapters that hand over raw rows: sorts by time and keeps the
    /// last value written for a duplicated timestamp.
    pub fn from_unsorted(points: Vec<DataPoint>) -> Self {
        let dedup: BTreeMap<DateTime<Utc>, f64> = points
            .into_iter()
            .map(|dp| (dp.timestamp, dp.value))
            .collect();

        Self {
            points: dedup
                .into_iter()
                .map(|(timestamp, value)| DataPoint { timestamp, value })
                .collect(),
        }
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&DataPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|dp| dp.value)
    }

    /// Latest timestamp in the series. Windows are anchored here rather than on
    /// the wall clock so results stay reproducible for historical data.
    pub fn max_date(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|dp| dp.timestamp)
    }

    /// Observations dated within `years` calendar years of the series' own
    /// latest timestamp (inclusive). `None` keeps the whole history.
    pub fn window_years(&self, years: Option<u32>) -> TimeSeries {
        let (Some(years), Some(anchor)) = (years, self.max_date()) else {
            return self.clone();
        };

        let cutoff = anchor
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        self.since(cutoff)
    }

    /// Observations at or after `cutoff`.
    pub fn since(&self, cutoff: DateTime<Utc>) -> TimeSeries {
        let start = self.points.partition_point(|dp| dp.timestamp < cutoff);
        TimeSeries { points: self.points[start..].to_vec() }
    }

    /// Builds a derived series by pairing every point with the point `lag`
    /// positions earlier. Pairs for which `f` yields a non-finite number are
    /// left out, so the output only holds usable observations.
    pub fn lagged_map<F>(&self, lag: usize, f: F) -> TimeSeries
    where
        F: Fn(f64, f64) -> f64,
    {
        if lag == 0 || self.points.len() <= lag {
            return TimeSeries::default();
        }

        let points = self.points[lag..]
            .iter()
            .zip(self.points.iter())
            .filter_map(|(current, previous)| {
                let value = f(current.value, previous.value);
                value.is_finite().then_some(DataPoint { timestamp: current.timestamp, value })
            })
            .collect();

        TimeSeries { points }
    }

    /// Drops non-finite values (missing observations).
    pub fn dropna(&self) -> TimeSeries {
        TimeSeries {
            points: self.points.iter().copied().filter(|dp| dp.value.is_finite()).collect(),
        }
    }
}

impl TryFrom<Vec<DataPoint>> for TimeSeries {
    type Error = AnalysisError;

    fn try_from(points: Vec<DataPoint>) -> Result<Self, Self::Error> {
        TimeSeries::new(points)
    }
}

impl From<TimeSeries> for Vec<DataPoint> {
    fn from(series: TimeSeries) -> Self {
        series.points
    }
}

/// Aligns two series on identical timestamps (inner join).
///
/// Returns a vector of tuples (timestamp, value_a, value_b).
pub fn align_series(
    series_a: &TimeSeries,
    series_b: &TimeSeries,
) -> Vec<(DateTime<Utc>, f64, f64)> {
    let map_b: BTreeMap<DateTime<Utc>, f64> = series_b
        .points()
        .iter()
        .map(|dp| (dp.timestamp, dp.value))
        .collect();

    series_a
        .points()
        .iter()
        .filter_map(|dp| map_b.get(&dp.timestamp).map(|&b| (dp.timestamp, dp.value, b)))
        .collect()
}
