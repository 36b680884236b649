use async_trait::async_trait;
use anyhow::{anyhow, Result};
use sqlx::SqlitePool;

use super::DataSource;
use crate::db;
use crate::models::DataPoint;

/// Series stored in the local `historical_data` table.
pub struct SqliteSource {
    pool: SqlitePool,
}

impl SqliteSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataSource for SqliteSource {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch_data(&self, series_id: &str) -> Result<Vec<DataPoint>> {
        let data = db::get_historical_data(&self.pool, series_id).await?;
        if data.is_empty() {
            return Err(anyhow!("No stored observations for {}", series_id));
        }
        Ok(data)
    }
}
