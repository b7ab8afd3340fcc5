//! K-Means cluster analysis for tabular transaction datasets: load a
//! delimited file, optionally reduce features by label-informed importance,
//! cluster, score the partition, and render a 2D decision-boundary plot.

pub mod analysis;
pub mod config;
pub mod csv_reader;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod kmeans;
pub mod plot;

pub use analysis::{run_analysis, AnalysisResult};
pub use config::AnalysisConfig;
pub use error::AnalysisError;

#[cfg(test)]
mod tests;
