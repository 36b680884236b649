pub mod aggregate;
pub mod analyzer;
pub mod composite;
pub mod contribution;
pub mod normalizer;
pub mod statistics;
pub mod trend;
