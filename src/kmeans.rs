use linfa::prelude::Predict;
use linfa::traits::Fit;
use linfa::Dataset;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use crate::error::AnalysisError;

const MAX_ITERATIONS: u64 = 300;
const TOLERANCE: f64 = 1e-5;
// Independent random initializations; the lowest-inertia run wins.
const N_RUNS: usize = 10;

/// Final partition of the record set: per-record cluster ids in `[0, k)`
/// plus the converged centroid coordinates (k rows).
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    pub assignment: Array1<usize>,
    pub centroids: Array2<f64>,
}

/// Partition `records` into `k` clusters with seeded multi-start K-Means.
/// `k` must lie in `1..=record_count`; anything else is an
/// `InvalidParameter` error before any work happens.
pub fn cluster(
    records: &Array2<f64>,
    k: usize,
    seed: u64,
) -> Result<ClusteringOutcome, AnalysisError> {
    let n_records = records.nrows();
    if k < 1 {
        return Err(AnalysisError::InvalidParameter(
            "cluster count k must be at least 1".to_string(),
        ));
    }
    if k > n_records {
        return Err(AnalysisError::InvalidParameter(format!(
            "cluster count k={k} exceeds record count {n_records}"
        )));
    }

    let rng = Xoshiro256Plus::seed_from_u64(seed);
    let dataset = Dataset::from(records.to_owned());
    let model = KMeans::params_with_rng(k, rng)
        .max_n_iterations(MAX_ITERATIONS)
        .tolerance(TOLERANCE)
        .n_runs(N_RUNS)
        .fit(&dataset)?;

    let assignment = model.predict(&dataset);
    Ok(ClusteringOutcome {
        assignment,
        centroids: model.centroids().to_owned(),
    })
}

/// Index of the centroid nearest to `point` by Euclidean distance. Used to
/// evaluate decision regions on a grid without holding onto the model.
pub fn nearest_centroid(point: ArrayView1<'_, f64>, centroids: ArrayView2<'_, f64>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, centroid) in centroids.outer_iter().enumerate() {
        let dist: f64 = point
            .iter()
            .zip(centroid.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}
