use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

use crate::models::{DataPoint, Indicator};

/// Opens (creating if needed) `indicators.db` inside `data_dir` and migrates it.
pub async fn init(data_dir: &Path) -> Result<SqlitePool> {
    let db_path = data_dir.join("indicators.db");
    let database_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
    connect(&database_url).await
}

pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to SQLite database: {}", database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    debug!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("Database initialized successfully.");
    Ok(pool)
}

/// Id of the indicator with this slug, inserting it when missing.
pub async fn ensure_indicator(
    pool: &SqlitePool,
    indicator_slug: &str,
    name: &str,
    region: &str,
    source: &str,
) -> Result<i64> {
    let existing = sqlx::query("SELECT id FROM indicators WHERE slug = $1")
        .bind(indicator_slug)
        .fetch_optional(pool)
        .await?;

    if let Some(record) = existing {
        return Ok(record.try_get("id")?);
    }

    let rec = sqlx::query(
        "INSERT INTO indicators (slug, name, region, source) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(indicator_slug)
    .bind(name)
    .bind(region)
    .bind(source)
    .fetch_one(pool)
    .await?;

    Ok(rec.try_get("id")?)
}

/// Upserts points for an indicator in one transaction. A point already
/// stored at the same timestamp is overwritten.
pub async fn save_historical_data(
    pool: &SqlitePool,
    indicator_slug: &str,
    data: &[DataPoint],
    source: &str,
) -> Result<usize> {
    let indicator_id = ensure_indicator(pool, indicator_slug, indicator_slug, "US", source).await?;

    let mut tx = pool.begin().await?;

    for point in data {
        sqlx::query(
            "INSERT INTO historical_data (indicator_id, timestamp, value)
             VALUES ($1, $2, $3)
             ON CONFLICT (indicator_id, timestamp) DO UPDATE
             SET value = EXCLUDED.value",
        )
        .bind(indicator_id)
        .bind(point.timestamp)
        .bind(point.value)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    debug!("Saved {} points for {}", data.len(), indicator_slug);
    Ok(data.len())
}

/// Fetch all historical data for a given indicator slug, oldest first
pub async fn get_historical_data(pool: &SqlitePool, indicator_slug: &str) -> Result<Vec<DataPoint>> {
    let rows = sqlx::query_as::<_, DataPoint>(
        r#"
        SELECT h.timestamp, h.value
        FROM historical_data h
        JOIN indicators i ON h.indicator_id = i.id
        WHERE i.slug = $1
        ORDER BY h.timestamp ASC
        "#,
    )
    .bind(indicator_slug)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Observation count and most recent point for an indicator.
pub async fn get_series_summary(
    pool: &SqlitePool,
    indicator_slug: &str,
) -> Result<(i64, Option<DataPoint>)> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM historical_data h
        JOIN indicators i ON h.indicator_id = i.id
        WHERE i.slug = $1
        "#,
    )
    .bind(indicator_slug)
    .fetch_one(pool)
    .await?;

    let latest = sqlx::query_as::<_, DataPoint>(
        r#"
        SELECT h.timestamp, h.value
        FROM historical_data h
        JOIN indicators i ON h.indicator_id = i.id
        WHERE i.slug = $1
        ORDER BY h.timestamp DESC
        LIMIT 1
        "#,
    )
    .bind(indicator_slug)
    .fetch_optional(pool)
    .await?;

    Ok((count, latest))
}

pub async fn get_all_indicators(pool: &SqlitePool) -> Result<Vec<Indicator>> {
    sqlx::query_as::<_, Indicator>(
        "SELECT id, slug, name, region, source, created_at FROM indicators ORDER BY region, name",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| anyhow::anyhow!(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn point(day: u32, value: f64) -> DataPoint {
        DataPoint::new(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(), value)
    }

    #[tokio::test]
    async fn test_upsert_and_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init(dir.path()).await.unwrap();

        save_historical_data(&pool, "UNRATE", &[point(3, 3.9), point(1, 3.7)], "test")
            .await
            .unwrap();
        // Same timestamp overwrites
        save_historical_data(&pool, "UNRATE", &[point(3, 4.0)], "test").await.unwrap();

        let data = get_historical_data(&pool, "UNRATE").await.unwrap();
        assert_eq!(data, vec![point(1, 3.7), point(3, 4.0)]);

        let (count, latest) = get_series_summary(&pool, "UNRATE").await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(latest, Some(point(3, 4.0)));

        let indicators = get_all_indicators(&pool).await.unwrap();
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].slug, "UNRATE");
    }

    #[tokio::test]
    async fn test_unknown_slug_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init(dir.path()).await.unwrap();
        assert!(get_historical_data(&pool, "NOPE").await.unwrap().is_empty());
        assert_eq!(get_series_summary(&pool, "NOPE").await.unwrap(), (0, None));
    }
}
