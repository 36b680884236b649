pub mod analysis;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod indicators;
pub mod models;

pub use analysis::analyzer::analyze_indicator;
pub use analysis::trend::{trend_by_group, TrendLabel};
pub use config::AnalysisSettings;
pub use core::orchestrator::{run_batch, BatchReport};
pub use core::timeseries::TimeSeries;
pub use error::{AnalysisError, AnalysisOutcome};
pub use indicators::registry::{IndicatorConfig, Region, Registry};
pub use models::{AnalysisResult, DataPoint};
