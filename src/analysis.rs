use std::path::Path;

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::csv_reader::read_transactions;
use crate::error::AnalysisError;
use crate::evaluate::{
    calinski_harabasz_score, purity_score, silhouette_score, summarize_clusters, ClusterSummary,
    EvaluationMetrics, MetricValue,
};
use crate::features::select_top_features;
use crate::kmeans;
use crate::plot::render_decision_plot;

/// The sole externally observable output of an analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub clusters_summary: Vec<ClusterSummary>,
    pub evaluation_metrics: EvaluationMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering_plot: Option<String>,
}

/// Run the full batch analysis: load, sample, reduce, cluster, evaluate,
/// render. One stateless forward pass; only a parse failure or an
/// out-of-range `k` abort it, everything downstream degrades in place.
pub fn run_analysis(
    path: &Path,
    k: usize,
    cfg: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let table = read_transactions(path)?;
    log::info!(
        "loaded {} records with {} features (labels: {})",
        table.n_records(),
        table.n_features(),
        table.labels.is_some()
    );

    let original_count = table.n_records();
    let table = table.sample(cfg.sample_limit, cfg.seed);
    if table.n_records() < original_count {
        log::info!("sampled {} of {} records", table.n_records(), original_count);
    }

    let reduced = select_top_features(table, cfg).into_table();

    log::info!("K-Means clustering (k={k})");
    let clustering = kmeans::cluster(&reduced.records, k, cfg.seed)?;

    let clusters_summary = match (&reduced.labels, reduced.has_label_variance()) {
        (Some(labels), true) => summarize_clusters(&clustering.assignment, labels),
        _ => Vec::new(),
    };
    let purity = match (&reduced.labels, reduced.has_label_variance()) {
        (Some(labels), true) => Some(purity_score(labels, &clustering.assignment)),
        _ => None,
    };

    let silhouette = match silhouette_score(
        &reduced.records,
        &clustering.assignment,
        cfg.silhouette_sample_limit,
        cfg.seed,
    ) {
        Ok(score) => MetricValue::Score(score),
        Err(err) => {
            log::warn!("silhouette score unavailable: {err}");
            MetricValue::unavailable()
        }
    };
    let calinski_harabasz = match calinski_harabasz_score(&reduced.records, &clustering.assignment)
    {
        Ok(score) => MetricValue::Score(score),
        Err(err) => {
            log::warn!("calinski-harabasz score unavailable: {err}");
            MetricValue::unavailable()
        }
    };

    let clustering_plot = if cfg.render_plot {
        render_decision_plot(&reduced, k, cfg)
    } else {
        None
    };

    Ok(AnalysisResult {
        clusters_summary,
        evaluation_metrics: EvaluationMetrics {
            purity_score: purity,
            silhouette_score: silhouette,
            calinski_harabasz_score: calinski_harabasz,
        },
        clustering_plot,
    })
}
