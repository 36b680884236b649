use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use macro_cycle_lib::analysis::aggregate::summary_health;
use macro_cycle_lib::core::orchestrator::{import_series, run_batch_with_unconfigured, BatchReport};
use macro_cycle_lib::db;
use macro_cycle_lib::fetcher::{DataSource, JsonDirSource, SqliteSource};
use macro_cycle_lib::indicators::registry::{Bucket, Cluster, IndicatorConfig, Region, Registry};
use macro_cycle_lib::AnalysisSettings;

/// Percentile, trend and composite report for the macro cycle dashboard.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding one `<series_id>.json` file per indicator.
    #[arg(long)]
    json_dir: Option<PathBuf>,

    /// Data directory of the SQLite store (`indicators.db`). Falls back to DATABASE_URL.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Copy the JSON directory into the SQLite store before analysing.
    #[arg(long, requires_all = ["json_dir", "data_dir"])]
    import: bool,

    /// Analysis settings (TOML). Falls back to MACRO_SETTINGS.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Custom indicator table replacing the built-in one: a JSON array of
    /// configs, or an object keyed by series id (old-schema records accepted).
    #[arg(long)]
    indicators: Option<PathBuf>,

    /// Extra series without a config, as `ID` or `ID@REGION` (default US).
    /// They get the reduced legacy analysis. Repeatable.
    #[arg(long = "series", value_parser = parse_series_ref)]
    unconfigured: Vec<(String, Region)>,

    /// Only analyse one region (e.g. "US", "Eurozone").
    #[arg(long, value_parser = parse_region)]
    region: Option<Region>,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_region(raw: &str) -> Result<Region, String> {
    Region::parse(raw).ok_or_else(|| format!("unknown region: {}", raw))
}

fn parse_series_ref(raw: &str) -> Result<(String, Region), String> {
    match raw.split_once('@') {
        Some((id, region)) if !id.is_empty() => Ok((id.to_string(), parse_region(region)?)),
        None if !raw.is_empty() => Ok((raw.to_string(), Region::Us)),
        _ => Err(format!("invalid series: {}", raw)),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings_path = cli
        .settings
        .clone()
        .or_else(|| std::env::var("MACRO_SETTINGS").ok().map(PathBuf::from));
    let settings = match settings_path {
        Some(path) => AnalysisSettings::load(&path)?,
        None => AnalysisSettings::default(),
    };

    let registry = match &cli.indicators {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Registry::from_json(&raw)?
        }
        None => Registry::builtin().clone(),
    };

    let configs: Vec<IndicatorConfig> = registry
        .all()
        .iter()
        .filter(|c| cli.region.map_or(true, |r| c.region == r))
        .cloned()
        .collect();
    let unconfigured: Vec<(String, Region)> = cli
        .unconfigured
        .iter()
        .filter(|(_, region)| cli.region.map_or(true, |r| *region == r))
        .cloned()
        .collect();
    info!("Loaded {} indicator configs", configs.len());

    let pool = match (&cli.data_dir, std::env::var("DATABASE_URL")) {
        (Some(dir), _) => Some(db::init(dir).await?),
        (None, Ok(url)) if cli.json_dir.is_none() => Some(db::connect(&url).await?),
        _ => None,
    };

    let source: Box<dyn DataSource> = match (&cli.json_dir, &pool) {
        (Some(dir), Some(pool)) if cli.import => {
            let json = JsonDirSource::new(dir);
            let (saved, failed) = import_series(pool, &json, &configs).await;
            info!("Imported {} series ({} failed)", saved, failed);
            Box::new(SqliteSource::new(pool.clone()))
        }
        (Some(dir), _) => Box::new(JsonDirSource::new(dir)),
        (None, Some(pool)) => Box::new(SqliteSource::new(pool.clone())),
        (None, None) => bail!("No data source: pass --json-dir, --data-dir or set DATABASE_URL"),
    };

    let report = run_batch_with_unconfigured(
        source.as_ref(),
        &configs,
        &unconfigured,
        &settings,
        chrono::Utc::now(),
    )
    .await;

    if cli.json {
        print_json(&report, &settings)?;
    } else {
        print_report(&report, &settings);
    }
    Ok(())
}

fn regions(report: &BatchReport) -> BTreeSet<Region> {
    report.results.iter().map(|r| r.region).collect()
}

fn print_json(report: &BatchReport, settings: &AnalysisSettings) -> Result<()> {
    let composites: serde_json::Map<String, serde_json::Value> = regions(report)
        .into_iter()
        .map(|region| -> Result<(String, serde_json::Value)> {
            let score = report.composite(region, settings);
            Ok((region.to_string(), serde_json::to_value(score)?))
        })
        .collect::<Result<_>>()?;

    let out = serde_json::json!({
        "report": report,
        "composite": composites,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}

fn print_report(report: &BatchReport, settings: &AnalysisSettings) {
    for region in regions(report) {
        println!("\n=== {} ===", region);

        for bucket in Bucket::ALL {
            println!("\n{}", bucket.title());
            println!(
                "{:<36} | {:>14} | {:>6} | {:>6} | {}",
                "Indicator", "Current", "All", "5Y", "Trend"
            );
            println!("{}", "-".repeat(84));

            for r in report.results_for(region).filter(|r| r.bucket == Some(bucket) && !r.hidden) {
                let marker = if r.contextual { " (ctx)" } else { "" };
                println!(
                    "{:<36} | {:>14} | {:>6} | {:>6} | {}",
                    format!("{}{}", r.name, marker),
                    r.current_value
                        .map(|v| format!("{:.2} {}", v, r.unit))
                        .unwrap_or_else(|| "-".to_string()),
                    fmt_opt(r.percentile_all),
                    fmt_opt(r.percentile_recent),
                    r.trend_label
                );
            }

            let group = report.bucket_aggregate(region, bucket);
            println!(
                "  -> {} (avg pct {}, avg trend z {}, n={})",
                summary_health(&group, &settings.summary).as_str(),
                fmt_opt(group.measured_percentile()),
                group.measured_trend_z().map(|z| format!("{:+.2}", z)).unwrap_or_else(|| "-".to_string()),
                group.n_indicators
            );
        }

        let legacy: Vec<_> = report.results_for(region).filter(|r| r.bucket.is_none()).collect();
        if !legacy.is_empty() {
            println!("\nUnconfigured");
            for r in legacy {
                println!(
                    "  {:<34} | {:>14} | {:>6} | {:>6}",
                    r.name,
                    r.current_value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string()),
                    fmt_opt(r.percentile_all),
                    fmt_opt(r.percentile_recent)
                );
            }
        }

        println!("\nClusters");
        for cluster in Cluster::ALL {
            let agg = report.cluster_aggregate(region, cluster);
            if agg.group.n_indicators == 0 {
                continue;
            }
            println!(
                "  {:<20} level z {:+.2}  trend z {:+.2}  (n={})",
                cluster.title(),
                agg.level_z,
                agg.trend_z,
                agg.group.n_indicators
            );
        }

        let score = report.composite(region, settings);
        println!(
            "\nComposite: {} [{}]  growth {} / labor {} / sentiment {}  ({} indicators)",
            fmt_opt(score.composite),
            score.band().as_str(),
            fmt_opt(score.growth),
            fmt_opt(score.labor),
            fmt_opt(score.sentiment),
            score.n_total
        );
    }

    if !report.excluded.is_empty() {
        println!("\nExcluded");
        for e in &report.excluded {
            let seen = e
                .last_seen
                .map(|d| d.date_naive().to_string())
                .unwrap_or_else(|| "never".to_string());
            println!("  {:<20} {:<10} last seen {:<10}  {}", e.series_id, e.region, seen, e.reason);
        }
    }
}
