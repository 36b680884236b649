use macro_cycle_lib::db;
use macro_cycle_lib::indicators::registry::Registry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Data directory as first argument, else DATABASE_URL
    let pool = match std::env::args().nth(1) {
        Some(dir) => db::init(&PathBuf::from(dir)).await?,
        None => {
            let url = std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("Usage: check_data <data_dir> (or set DATABASE_URL)"))?;
            db::connect(&url).await?
        }
    };

    println!("\n{:<20} | {:<9} | {:<10} | {:<12} | {:<10}", "Series", "Region", "Count", "Latest Date", "Latest Val");
    println!("{}", "-".repeat(72));

    for config in Registry::builtin().all() {
        let (count, latest) = db::get_series_summary(&pool, &config.series_id).await?;

        match latest {
            Some(point) => println!(
                "{:<20} | {:<9} | {:<10} | {:<12} | {:.4}",
                config.series_id,
                config.region,
                count,
                point.timestamp.date_naive().to_string(),
                point.value
            ),
            None => println!(
                "{:<20} | {:<9} | {:<10} | {:<12} | -",
                config.series_id, config.region, 0, "NO DATA"
            ),
        }
    }

    let unconfigured: Vec<String> = db::get_all_indicators(&pool)
        .await?
        .into_iter()
        .filter(|ind| Registry::builtin().find(&ind.slug).is_none())
        .map(|ind| ind.slug)
        .collect();
    if !unconfigured.is_empty() {
        println!("\nStored but not configured: {}", unconfigured.join(", "));
    }
    println!("\nDone.");
    Ok(())
}
