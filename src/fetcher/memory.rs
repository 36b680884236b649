use async_trait::async_trait;
use anyhow::{anyhow, Result};
use std::collections::HashMap;

use super::DataSource;
use crate::models::DataPoint;

/// Series held in memory, keyed by series id.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    series: HashMap<String, Vec<DataPoint>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series_id: &str, points: Vec<DataPoint>) -> Self {
        self.insert(series_id, points);
        self
    }

    pub fn insert(&mut self, series_id: &str, points: Vec<DataPoint>) {
        self.series.insert(series_id.to_string(), points);
    }
}

#[async_trait]
impl DataSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_data(&self, series_id: &str) -> Result<Vec<DataPoint>> {
        self.series
            .get(series_id)
            .cloned()
            .ok_or_else(|| anyhow!("No data loaded for {}", series_id))
    }
}
