pub mod orchestrator;
pub mod timeseries;
