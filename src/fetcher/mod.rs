use async_trait::async_trait;
use anyhow::Result;
use crate::models::DataPoint;

pub mod json_file;
pub mod memory;
pub mod sqlite;

pub use json_file::JsonDirSource;
pub use memory::InMemorySource;
pub use sqlite::SqliteSource;

/// Anything that can hand over the raw observations of a series.
///
/// Points may come back in any order; the batch runner sorts and
/// de-duplicates them before analysis.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_data(&self, series_id: &str) -> Result<Vec<DataPoint>>;
}
