use linfa_clustering::KMeansError;
use thiserror::Error;

/// Fatal pipeline errors. Everything else (feature-selection fallback,
/// per-metric unavailability, missing visualization) degrades in place and
/// surfaces as explicit markers in the result instead of an `Err`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Input file is unreadable or malformed. Never substituted with an
    /// empty dataset.
    #[error("failed to parse input: {0}")]
    Parse(String),

    /// Requested cluster count is outside `1..=record_count`.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// K-Means itself failed on validated input.
    #[error("clustering failed: {0}")]
    Clustering(#[from] KMeansError),
}

/// Reasons a single evaluation metric could not be computed. Reported per
/// metric; one failing metric never suppresses the others.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    #[error("fewer than two clusters present")]
    TooFewClusters,

    #[error("cluster {0} has a single member")]
    SingletonCluster(usize),

    #[error("cluster count equals sample count")]
    DegenerateClustering,

    #[error("dispersion is not finite")]
    NotFinite,
}
