use serde::Serialize;

use crate::config::SummaryThresholds;
use crate::indicators::registry::{Bucket, Cluster, Region};
use crate::models::AnalysisResult;

/// Neutral reading reported when a group has no measured percentile.
pub const NEUTRAL_PERCENTILE: f64 = 50.0;

/// Average percentile and trend of a group of indicators.
///
/// When nothing in the group was measured, the averages fall back to the
/// neutral 50 / 0 and `n_indicators` is 0. Use `measured_percentile()` when
/// the difference matters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub avg_percentile: f64,
    pub avg_trend_z: f64,
    /// Results that contributed a percentile or a trend.
    pub n_indicators: usize,
    pub n_percentile: usize,
    pub n_trend: usize,
}

impl GroupAggregate {
    pub fn measured_percentile(&self) -> Option<f64> {
        (self.n_percentile > 0).then_some(self.avg_percentile)
    }

    pub fn measured_trend_z(&self) -> Option<f64> {
        (self.n_trend > 0).then_some(self.avg_trend_z)
    }
}

/// Averages scored results matching `predicate`. Hidden and contextual
/// indicators never count.
pub fn aggregate<'a, I, P>(results: I, predicate: P) -> GroupAggregate
where
    I: IntoIterator<Item = &'a AnalysisResult>,
    P: Fn(&AnalysisResult) -> bool,
{
    let mut levels = Vec::new();
    let mut trends = Vec::new();
    let mut n_indicators = 0;

    for result in results.into_iter().filter(|r| r.is_scored() && predicate(r)) {
        let level = result.percentile_all.filter(|v| v.is_finite());
        let trend = result.trend_z.filter(|v| v.is_finite());
        if level.is_some() || trend.is_some() {
            n_indicators += 1;
        }
        levels.extend(level);
        trends.extend(trend);
    }

    GroupAggregate {
        avg_percentile: mean(&levels).unwrap_or(NEUTRAL_PERCENTILE),
        avg_trend_z: mean(&trends).unwrap_or(0.0),
        n_indicators,
        n_percentile: levels.len(),
        n_trend: trends.len(),
    }
}

pub fn bucket_aggregate(results: &[AnalysisResult], region: Region, bucket: Bucket) -> GroupAggregate {
    aggregate(results, |r| r.region == region && r.bucket == Some(bucket))
}

/// Scored results in `cluster` for a region.
///
/// Explicit cluster tags take priority. If no result in the region carries
/// the tag, membership falls back to the categories the cluster covers.
pub fn cluster_members(results: &[AnalysisResult], region: Region, cluster: Cluster) -> Vec<&AnalysisResult> {
    let in_region = || results.iter().filter(move |r| r.region == region && r.is_scored());

    let tagged: Vec<&AnalysisResult> = in_region().filter(|r| r.cluster == Some(cluster)).collect();
    if !tagged.is_empty() {
        return tagged;
    }

    let categories = cluster.fallback_categories();
    in_region()
        .filter(|r| r.category.is_some_and(|c| categories.contains(&c)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterAggregate {
    pub cluster: Cluster,
    /// Rough z-score of the average percentile: `(avg - 50) / 20`.
    pub level_z: f64,
    pub trend_z: f64,
    pub group: GroupAggregate,
}

impl ClusterAggregate {
    pub fn measured_level_z(&self) -> Option<f64> {
        self.group.measured_percentile().map(|_| self.level_z)
    }
}

pub fn cluster_aggregate(results: &[AnalysisResult], region: Region, cluster: Cluster) -> ClusterAggregate {
    let group = aggregate(cluster_members(results, region, cluster), |_| true);
    ClusterAggregate {
        cluster,
        level_z: (group.avg_percentile - NEUTRAL_PERCENTILE) / 20.0,
        trend_z: group.avg_trend_z,
        group,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryHealth {
    Strong,
    Neutral,
    Weak,
    NoData,
}

impl SummaryHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryHealth::Strong => "Strong",
            SummaryHealth::Neutral => "Neutral",
            SummaryHealth::Weak => "Weak",
            SummaryHealth::NoData => "No data",
        }
    }
}

/// Strong / Weak at or beyond the thresholds, Neutral in between.
pub fn summary_health(group: &GroupAggregate, thresholds: &SummaryThresholds) -> SummaryHealth {
    match group.measured_percentile() {
        None => SummaryHealth::NoData,
        Some(avg) if avg >= thresholds.strong_at => SummaryHealth::Strong,
        Some(avg) if avg <= thresholds.weak_at => SummaryHealth::Weak,
        Some(_) => SummaryHealth::Neutral,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::trend::TrendLabel;
    use crate::core::timeseries::TimeSeries;
    use crate::indicators::registry::Category;
    use chrono::Utc;

    fn result(
        id: &str,
        bucket: Bucket,
        category: Category,
        percentile: Option<f64>,
        trend_z: Option<f64>,
    ) -> AnalysisResult {
        AnalysisResult {
            series_id: id.to_string(),
            name: id.to_string(),
            region: Region::Us,
            bucket: Some(bucket),
            category: Some(category),
            cluster: None,
            type_tag: None,
            current_value: Some(0.0),
            current_date: Utc::now(),
            percentile_all: percentile,
            percentile_recent: percentile,
            trend_z,
            trend_label: TrendLabel::Unavailable,
            unit: "%".to_string(),
            data: TimeSeries::default(),
            inverted: false,
            hidden: false,
            contextual: false,
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_bucket_average_skips_missing_values() {
        let results = vec![
            result("A", Bucket::Leading, Category::Growth, Some(80.0), Some(1.0)),
            result("B", Bucket::Leading, Category::Growth, Some(40.0), None),
            result("C", Bucket::Leading, Category::Growth, None, None),
            result("D", Bucket::Lagging, Category::Growth, Some(10.0), Some(-2.0)),
        ];

        let agg = bucket_aggregate(&results, Region::Us, Bucket::Leading);
        assert_eq!(agg.avg_percentile, 60.0);
        assert_eq!(agg.avg_trend_z, 1.0);
        assert_eq!(agg.n_indicators, 2);
        assert_eq!(agg.n_percentile, 2);
        assert_eq!(agg.n_trend, 1);
    }

    #[test]
    fn test_empty_group_is_neutral_by_default_not_by_evidence() {
        let results = vec![result("C", Bucket::Coincident, Category::Growth, None, None)];
        let agg = bucket_aggregate(&results, Region::Us, Bucket::Coincident);
        assert_eq!(agg.avg_percentile, 50.0);
        assert_eq!(agg.avg_trend_z, 0.0);
        assert_eq!(agg.n_indicators, 0);
        assert_eq!(agg.measured_percentile(), None);

        // A measured 50 is distinguishable
        let measured = vec![result("M", Bucket::Coincident, Category::Growth, Some(50.0), None)];
        let agg = bucket_aggregate(&measured, Region::Us, Bucket::Coincident);
        assert_eq!(agg.measured_percentile(), Some(50.0));
    }

    #[test]
    fn test_hidden_and_contextual_are_excluded() {
        let mut hidden = result("H", Bucket::Leading, Category::Growth, Some(99.0), Some(3.0));
        hidden.hidden = true;
        let mut ctx = result("X", Bucket::Leading, Category::Growth, Some(1.0), Some(-3.0));
        ctx.contextual = true;
        let results = vec![hidden, ctx, result("A", Bucket::Leading, Category::Growth, Some(70.0), None)];

        let agg = bucket_aggregate(&results, Region::Us, Bucket::Leading);
        assert_eq!(agg.avg_percentile, 70.0);
        assert_eq!(agg.n_indicators, 1);
    }

    #[test]
    fn test_cluster_prefers_tags_then_falls_back_to_category() {
        let mut tagged = result("T", Bucket::Lagging, Category::Housing, Some(90.0), Some(0.5));
        tagged.cluster = Some(Cluster::InflationRates);
        let untagged = result("U", Bucket::Lagging, Category::Inflation, Some(10.0), None);
        let results = vec![tagged, untagged];

        let members = cluster_members(&results, Region::Us, Cluster::InflationRates);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].series_id, "T");

        let credit = vec![
            result("C1", Bucket::Leading, Category::Credit, Some(30.0), Some(-1.0)),
            result("C2", Bucket::Leading, Category::Market, Some(50.0), Some(0.0)),
        ];
        let agg = cluster_aggregate(&credit, Region::Us, Cluster::CreditRisk);
        assert_eq!(agg.group.n_indicators, 2);
        assert_eq!(agg.level_z, -0.5);
        assert_eq!(agg.trend_z, -0.5);
    }

    #[test]
    fn test_summary_health_thresholds() {
        let thresholds = SummaryThresholds::default();
        let at = |p: f64| GroupAggregate {
            avg_percentile: p,
            avg_trend_z: 0.0,
            n_indicators: 1,
            n_percentile: 1,
            n_trend: 0,
        };
        assert_eq!(summary_health(&at(65.0), &thresholds), SummaryHealth::Strong);
        assert_eq!(summary_health(&at(64.9), &thresholds), SummaryHealth::Neutral);
        assert_eq!(summary_health(&at(35.0), &thresholds), SummaryHealth::Weak);

        let empty = aggregate(std::iter::empty(), |_| true);
        assert_eq!(summary_health(&empty, &thresholds), SummaryHealth::NoData);
    }
}
