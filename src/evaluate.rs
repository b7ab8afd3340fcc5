use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::Serialize;

use crate::error::MetricError;

/// Per-cluster aggregate reported in `clusters_summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub label: usize,
    pub total_samples: usize,
    pub malicious_samples: usize,
}

/// A metric value, or an explicit marker when it could not be computed.
/// Serializes as either a JSON number or the string "unavailable"; an
/// uncomputable metric is never smuggled out as 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Score(f64),
    Unavailable(&'static str),
}

impl MetricValue {
    pub fn unavailable() -> MetricValue {
        MetricValue::Unavailable("unavailable")
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            MetricValue::Score(v) => Some(*v),
            MetricValue::Unavailable(_) => None,
        }
    }
}

/// The metric block of the analysis result. Purity is absent without label
/// variance; the label-free metrics are always attempted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purity_score: Option<f64>,
    pub silhouette_score: MetricValue,
    pub calinski_harabasz_score: MetricValue,
}

/// Member and positive-label counts per cluster id present, ascending.
pub fn summarize_clusters(
    assignment: &Array1<usize>,
    labels: &Array1<usize>,
) -> Vec<ClusterSummary> {
    let mut counts: BTreeMap<usize, (usize, usize)> = BTreeMap::new();
    for (&cluster, &label) in assignment.iter().zip(labels.iter()) {
        let entry = counts.entry(cluster).or_insert((0, 0));
        entry.0 += 1;
        if label == 1 {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(label, (total, malicious))| ClusterSummary {
            label,
            total_samples: total,
            malicious_samples: malicious,
        })
        .collect()
}

/// Purity of the clustering against the true labels: contingency-table
/// maximum per cluster, summed and divided by the record count. 1.0 means
/// every cluster is label-pure.
pub fn purity_score(labels: &Array1<usize>, assignment: &Array1<usize>) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let mut contingency: BTreeMap<usize, BTreeMap<usize, usize>> = BTreeMap::new();
    for (&cluster, &label) in assignment.iter().zip(labels.iter()) {
        *contingency
            .entry(cluster)
            .or_default()
            .entry(label)
            .or_insert(0) += 1;
    }
    let majority_total: usize = contingency
        .values()
        .map(|by_label| by_label.values().copied().max().unwrap_or(0))
        .sum();
    majority_total as f64 / labels.len() as f64
}

/// Mean silhouette coefficient over a bounded deterministic sample of
/// points. For each point, cohesion `a` is the mean distance to its own
/// cluster's other members and separation `b` the smallest mean distance to
/// another cluster; the coefficient is `(b - a) / max(a, b)`.
///
/// Fails (rather than reporting a misleading number) when the sample holds
/// fewer than two clusters, when any sampled cluster is a singleton, or
/// when every point sits in its own cluster.
pub fn silhouette_score(
    records: &Array2<f64>,
    assignment: &Array1<usize>,
    sample_limit: usize,
    seed: u64,
) -> Result<f64, MetricError> {
    let n = records.nrows();
    let (points, point_clusters) = if n > sample_limit {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let mut indices = rand::seq::index::sample(&mut rng, n, sample_limit).into_vec();
        indices.sort_unstable();
        (
            records.select(Axis(0), &indices),
            indices.iter().map(|&i| assignment[i]).collect::<Vec<_>>(),
        )
    } else {
        (records.to_owned(), assignment.to_vec())
    };
    let n = points.nrows();

    let mut cluster_sizes: BTreeMap<usize, usize> = BTreeMap::new();
    for &cluster in &point_clusters {
        *cluster_sizes.entry(cluster).or_insert(0) += 1;
    }
    if cluster_sizes.len() < 2 {
        return Err(MetricError::TooFewClusters);
    }
    if cluster_sizes.len() == n {
        return Err(MetricError::DegenerateClustering);
    }
    if let Some((&cluster, _)) = cluster_sizes.iter().find(|(_, &size)| size < 2) {
        return Err(MetricError::SingletonCluster(cluster));
    }
    let max_cluster = cluster_sizes.keys().max().copied().unwrap_or(0);

    let mut total = 0.0f64;
    for i in 0..n {
        let own = point_clusters[i];
        let mut dist_sums = vec![0.0f64; max_cluster + 1];
        let mut dist_counts = vec![0usize; max_cluster + 1];
        let point = points.row(i);
        for j in 0..n {
            if i == j {
                continue;
            }
            let dist: f64 = point
                .iter()
                .zip(points.row(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            dist_sums[point_clusters[j]] += dist;
            dist_counts[point_clusters[j]] += 1;
        }

        // Singleton clusters were rejected above, so both sides exist.
        let a = dist_sums[own] / dist_counts[own] as f64;
        let b = (0..=max_cluster)
            .filter(|&c| c != own && dist_counts[c] > 0)
            .map(|c| dist_sums[c] / dist_counts[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        total += if denom > 0.0 { (b - a) / denom } else { 0.0 };
    }

    let score = total / n as f64;
    if score.is_finite() {
        Ok(score)
    } else {
        Err(MetricError::NotFinite)
    }
}

/// Calinski–Harabasz variance-ratio criterion: between-cluster over
/// within-cluster dispersion, scaled by degrees of freedom. Zero within-
/// cluster dispersion scores 1.0 (every cluster collapsed onto its
/// centroid). Fails when fewer than two clusters are present or when the
/// cluster count reaches the record count.
pub fn calinski_harabasz_score(
    records: &Array2<f64>,
    assignment: &Array1<usize>,
) -> Result<f64, MetricError> {
    let n = records.nrows();
    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &cluster) in assignment.iter().enumerate() {
        members.entry(cluster).or_default().push(row);
    }
    let k = members.len();
    if k < 2 {
        return Err(MetricError::TooFewClusters);
    }
    if k >= n {
        return Err(MetricError::DegenerateClustering);
    }

    let overall_mean = records.sum_axis(Axis(0)) / n as f64;
    let mut between = 0.0f64;
    let mut within = 0.0f64;
    for rows in members.values() {
        let cluster_points = records.select(Axis(0), rows);
        let cluster_mean = cluster_points.sum_axis(Axis(0)) / rows.len() as f64;
        between += rows.len() as f64
            * cluster_mean
                .iter()
                .zip(overall_mean.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>();
        for point in cluster_points.outer_iter() {
            within += point
                .iter()
                .zip(cluster_mean.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>();
        }
    }

    if within == 0.0 {
        return Ok(1.0);
    }
    let score = between * (n - k) as f64 / (within * (k - 1) as f64);
    if score.is_finite() {
        Ok(score)
    } else {
        Err(MetricError::NotFinite)
    }
}
