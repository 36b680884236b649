use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::analysis::aggregate::{bucket_aggregate, cluster_aggregate, ClusterAggregate, GroupAggregate};
use crate::analysis::analyzer::analyze_indicator;
use crate::analysis::composite::{composite_score, CompositeInput, CompositeScore};
use crate::config::{AnalysisSettings, FreshnessThresholds};
use crate::core::timeseries::TimeSeries;
use crate::fetcher::DataSource;
use crate::indicators::registry::{Bucket, Cluster, Frequency, IndicatorConfig, Region};
use crate::models::{AnalysisResult, ExcludedIndicator};

const DAYS_PER_MONTH: f64 = 30.44;

/// Everything one refresh produced. Replaced wholesale on the next refresh.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub as_of: DateTime<Utc>,
    pub results: Vec<AnalysisResult>,
    pub excluded: Vec<ExcludedIndicator>,
}

impl BatchReport {
    pub fn results_for(&self, region: Region) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(move |r| r.region == region)
    }

    pub fn bucket_aggregate(&self, region: Region, bucket: Bucket) -> GroupAggregate {
        bucket_aggregate(&self.results, region, bucket)
    }

    pub fn cluster_aggregate(&self, region: Region, cluster: Cluster) -> ClusterAggregate {
        cluster_aggregate(&self.results, region, cluster)
    }

    pub fn composite(&self, region: Region, settings: &AnalysisSettings) -> CompositeScore {
        composite_score(&CompositeInput::from_results(&self.results, region), &settings.composite)
    }
}

/// Oldest acceptable latest observation for a frequency.
pub fn freshness_cutoff(
    as_of: DateTime<Utc>,
    frequency: Frequency,
    thresholds: &FreshnessThresholds,
) -> DateTime<Utc> {
    let months = thresholds.max_age_months(frequency);
    let seconds = (months as f64 * DAYS_PER_MONTH * 86_400.0).round() as i64;
    as_of - Duration::seconds(seconds)
}

/// One indicator queued for a batch.
struct Job {
    series_id: String,
    name: String,
    region: Region,
    frequency: Frequency,
    config: Option<IndicatorConfig>,
}

impl Job {
    fn configured(config: &IndicatorConfig) -> Self {
        Job {
            series_id: config.series_id.clone(),
            name: config.name.clone(),
            region: config.region,
            frequency: config.frequency,
            config: Some(config.clone()),
        }
    }

    /// No config: legacy analysis, screened for freshness as monthly data.
    fn unconfigured(series_id: &str, region: Region) -> Self {
        Job {
            series_id: series_id.to_string(),
            name: series_id.to_string(),
            region,
            frequency: Frequency::Monthly,
            config: None,
        }
    }

    fn excluded(&self, last_seen: Option<DateTime<Utc>>, reason: String) -> ExcludedIndicator {
        ExcludedIndicator {
            series_id: self.series_id.clone(),
            name: self.name.clone(),
            region: self.region,
            last_seen,
            reason,
        }
    }
}

/// Fetches, screens and analyzes every configured indicator.
///
/// Fetch failures, empty or stale series and indicators that cannot be
/// analyzed end up in `excluded`; nothing aborts the batch. Staleness is
/// judged against `as_of`.
pub async fn run_batch(
    source: &dyn DataSource,
    configs: &[IndicatorConfig],
    settings: &AnalysisSettings,
    as_of: DateTime<Utc>,
) -> BatchReport {
    run_batch_with_unconfigured(source, configs, &[], settings, as_of).await
}

/// [`run_batch`] plus series that have no config. Those get the reduced
/// legacy analysis and carry a `MissingConfig` issue.
///
/// Analysis runs on the rayon pool from a blocking task, off the async
/// worker threads.
pub async fn run_batch_with_unconfigured(
    source: &dyn DataSource,
    configs: &[IndicatorConfig],
    unconfigured: &[(String, Region)],
    settings: &AnalysisSettings,
    as_of: DateTime<Utc>,
) -> BatchReport {
    let jobs: Vec<Job> = configs
        .iter()
        .map(Job::configured)
        .chain(unconfigured.iter().map(|(id, region)| Job::unconfigured(id, *region)))
        .collect();
    info!("Batch: analyzing {} indicators from '{}'", jobs.len(), source.name());

    let mut excluded = Vec::new();
    let mut loaded: Vec<(Job, TimeSeries)> = Vec::with_capacity(jobs.len());

    for job in jobs {
        let raw = match source.fetch_data(&job.series_id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("  > {} ({}): fetch failed: {:#}", job.series_id, job.region, e);
                excluded.push(job.excluded(None, format!("Fetch failed: {:#}", e)));
                continue;
            }
        };

        let series = TimeSeries::from_unsorted(raw).dropna();
        let Some(last_seen) = series.max_date() else {
            warn!("  > {} ({}): no observations", job.series_id, job.region);
            excluded.push(job.excluded(None, "No observations".to_string()));
            continue;
        };

        let cutoff = freshness_cutoff(as_of, job.frequency, &settings.freshness);
        if last_seen < cutoff {
            warn!("  > {} ({}): stale since {}", job.series_id, job.region, last_seen.date_naive());
            excluded.push(job.excluded(
                Some(last_seen),
                format!("Stale: no observation since {}", last_seen.date_naive()),
            ));
            continue;
        }

        debug!("  > {} ({}): {} observations", job.series_id, job.region, series.len());
        loaded.push((job, series));
    }

    let pending: Vec<ExcludedIndicator> = loaded
        .iter()
        .map(|(job, series)| job.excluded(series.max_date(), String::new()))
        .collect();

    let task_settings = settings.clone();
    let analysis = tokio::task::spawn_blocking(move || {
        loaded
            .into_par_iter()
            .map(|(job, series)| {
                let outcome = analyze_indicator(
                    &job.series_id,
                    job.region,
                    &series,
                    job.config.as_ref(),
                    &task_settings,
                );
                (job, series.max_date(), outcome)
            })
            .collect::<Vec<_>>()
    })
    .await;

    let mut results = Vec::new();
    match analysis {
        Ok(analyzed) => {
            for (job, last_seen, outcome) in analyzed {
                match outcome {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        warn!("  > {} ({}): not analyzed: {}", job.series_id, job.region, e);
                        excluded.push(job.excluded(last_seen, e.to_string()));
                    }
                }
            }
        }
        Err(e) => {
            error!("Analysis task failed: {}", e);
            excluded.extend(pending.into_iter().map(|mut ex| {
                ex.reason = format!("Analysis task failed: {}", e);
                ex
            }));
        }
    }

    info!("Batch complete: {} analyzed, {} excluded", results.len(), excluded.len());

    BatchReport { as_of, results, excluded }
}

/// Copies every configured series from `source` into the database.
/// Returns (saved, failed) counts.
pub async fn import_series(
    pool: &SqlitePool,
    source: &dyn DataSource,
    configs: &[IndicatorConfig],
) -> (usize, usize) {
    let mut success = 0;
    let mut fail = 0;

    for config in configs {
        let saved = match source.fetch_data(&config.series_id).await {
            Ok(data) => {
                let stored = crate::db::ensure_indicator(
                    pool,
                    &config.series_id,
                    &config.name,
                    config.region.as_str(),
                    source.name(),
                )
                .await;
                match stored {
                    Ok(_) => crate::db::save_historical_data(pool, &config.series_id, &data, source.name()).await,
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        match saved {
            Ok(n) => {
                debug!("  > Saved {} points for {}", n, config.series_id);
                success += 1;
            }
            Err(e) => {
                warn!("  > Import failed for {}: {:#}", config.series_id, e);
                fail += 1;
            }
        }
    }

    info!("Import complete: {} saved, {} failed", success, fail);
    (success, fail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::InMemorySource;
    use crate::indicators::registry::Registry;
    use crate::models::DataPoint;
    use chrono::{Months, TimeZone};

    fn monthly_points(start: DateTime<Utc>, values: &[f64]) -> Vec<DataPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| DataPoint::new(start + Months::new(i as u32), v))
            .collect()
    }

    fn config(id: &str) -> IndicatorConfig {
        Registry::builtin().get_config(id, Region::Us).unwrap().clone()
    }

    #[test]
    fn test_freshness_cutoff_by_frequency() {
        let as_of = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let thresholds = FreshnessThresholds::default();
        // Monthly: 6 * 30.44 = 182.64 days
        let cutoff = freshness_cutoff(as_of, config("UNRATE").frequency, &thresholds);
        assert_eq!((as_of - cutoff).num_seconds(), 15_780_096);
        // Quarterly allows older data than monthly
        assert!(freshness_cutoff(as_of, config("ECIWAG").frequency, &thresholds) < cutoff);
    }

    #[tokio::test]
    async fn test_batch_excludes_instead_of_failing() {
        let as_of = Utc.with_ymd_and_hms(2024, 12, 15, 0, 0, 0).unwrap();
        let fresh_start = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let stale_start = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let short_start = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        let values: Vec<f64> = (0..36).map(|i| 4.0 + (i % 5) as f64 * 0.1).collect();

        let source = InMemorySource::new()
            .with_series("UNRATE", monthly_points(fresh_start, &values))
            .with_series("AWHMAN", monthly_points(stale_start, &values))
            .with_series("CPIAUCSL", monthly_points(short_start, &values[..5]));

        let configs = vec![config("UNRATE"), config("AWHMAN"), config("CPIAUCSL"), config("PAYEMS")];
        let report = run_batch(&source, &configs, &AnalysisSettings::default(), as_of).await;

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].series_id, "UNRATE");
        assert_eq!(report.excluded.len(), 3);

        let stale = report.excluded.iter().find(|e| e.series_id == "AWHMAN").unwrap();
        assert_eq!(stale.last_seen, Some(stale_start + Months::new(35)));
        assert!(stale.reason.starts_with("Stale"));

        let short = report.excluded.iter().find(|e| e.series_id == "CPIAUCSL").unwrap();
        assert!(short.reason.contains("Insufficient history"));

        let missing = report.excluded.iter().find(|e| e.series_id == "PAYEMS").unwrap();
        assert_eq!(missing.last_seen, None);
    }

    #[tokio::test]
    async fn test_unconfigured_series_use_legacy_analysis() {
        let as_of = Utc.with_ymd_and_hms(2024, 12, 15, 0, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let values: Vec<f64> = (0..36).map(|i| 4.0 + (i % 5) as f64 * 0.1).collect();

        let source = InMemorySource::new()
            .with_series("UNRATE", monthly_points(start, &values))
            .with_series("UK_HOUSE_PRICES", monthly_points(start, &values));

        let unconfigured = vec![
            ("UK_HOUSE_PRICES".to_string(), Region::Uk),
            ("UK_NOT_LOADED".to_string(), Region::Uk),
        ];
        let report = run_batch_with_unconfigured(
            &source,
            &[config("UNRATE")],
            &unconfigured,
            &AnalysisSettings::default(),
            as_of,
        )
        .await;

        assert_eq!(report.results.len(), 2);
        let legacy = report.results.iter().find(|r| r.series_id == "UK_HOUSE_PRICES").unwrap();
        assert_eq!(legacy.region, Region::Uk);
        assert_eq!(legacy.bucket, None);
        assert!(legacy.percentile_all.is_some());
        assert_eq!(legacy.trend_label, crate::analysis::trend::TrendLabel::Unavailable);
        assert!(matches!(
            legacy.issues.first(),
            Some(crate::error::AnalysisError::MissingConfig { .. })
        ));

        assert_eq!(report.excluded.len(), 1);
        assert_eq!(report.excluded[0].series_id, "UK_NOT_LOADED");
        assert_eq!(report.excluded[0].name, "UK_NOT_LOADED");
    }
}
