//! End-to-end properties of the analysis pipeline, driven through CSV
//! fixtures the way a caller would use the crate.

use std::fmt::Write as _;
use std::io::Write as _;

use crate::analysis::run_analysis;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::evaluate::MetricValue;

fn test_config() -> AnalysisConfig {
    AnalysisConfig {
        ensemble_trees: 10,
        grid_resolution: 30,
        plot_width: 120,
        plot_height: 80,
        ..AnalysisConfig::default()
    }
}

fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Two well-separated clouds in the V10/V14 plane, label-homogeneous by
/// construction: every normal row sits near the origin, every fraud row far
/// away. V10 and V14 carry all the signal; V3 is constant filler.
fn blob_csv(n_per_class: usize, with_class: bool) -> String {
    let mut csv = String::new();
    if with_class {
        csv.push_str("Time,V3,V10,V14,Amount,Class\n");
    } else {
        csv.push_str("Time,V3,V10,V14,Amount\n");
    }
    for i in 0..n_per_class {
        let jitter = (i % 7) as f64 * 0.05;
        let class = if with_class { ",0" } else { "" };
        writeln!(csv, "{i},0.5,{},{},50.0{class}", jitter, -jitter).unwrap();
    }
    for i in 0..n_per_class {
        let jitter = (i % 7) as f64 * 0.05;
        let class = if with_class { ",1" } else { "" };
        writeln!(csv, "{i},0.5,{},{},50.0{class}", 30.0 + jitter, 30.0 - jitter).unwrap();
    }
    csv
}

#[test]
fn runs_are_bit_identical() {
    let file = write_csv(&blob_csv(40, true));
    let cfg = test_config();
    let a = run_analysis(file.path(), 2, &cfg).unwrap();
    let b = run_analysis(file.path(), 2, &cfg).unwrap();
    assert_eq!(a.clusters_summary, b.clusters_summary);
    assert_eq!(a.evaluation_metrics, b.evaluation_metrics);
    assert_eq!(a.clustering_plot, b.clustering_plot);
}

#[test]
fn separated_label_pure_blobs_reach_full_purity() {
    let file = write_csv(&blob_csv(40, true));
    let result = run_analysis(file.path(), 2, &test_config()).unwrap();

    assert_eq!(result.evaluation_metrics.purity_score, Some(1.0));
    assert_eq!(result.clusters_summary.len(), 2);
    // One cluster is all fraud, the other all normal.
    let malicious: Vec<usize> = result
        .clusters_summary
        .iter()
        .map(|c| c.malicious_samples)
        .collect();
    assert!(malicious.contains(&0));
    assert!(malicious.contains(&40));
}

#[test]
fn metric_bounds_hold() {
    let file = write_csv(&blob_csv(40, true));
    let result = run_analysis(file.path(), 2, &test_config()).unwrap();

    let purity = result.evaluation_metrics.purity_score.unwrap();
    assert!((0.0..=1.0).contains(&purity));
    match result.evaluation_metrics.silhouette_score {
        MetricValue::Score(s) => assert!((-1.0..=1.0).contains(&s)),
        ref other => panic!("silhouette should be computable here, got {other:?}"),
    }
    match result.evaluation_metrics.calinski_harabasz_score {
        MetricValue::Score(s) => assert!(s >= 0.0),
        ref other => panic!("variance ratio should be computable here, got {other:?}"),
    }
}

#[test]
fn sampling_cap_bounds_the_summary_totals() {
    let file = write_csv(&blob_csv(60, true));
    let cfg = AnalysisConfig {
        sample_limit: 50,
        render_plot: false,
        ..test_config()
    };
    let result = run_analysis(file.path(), 2, &cfg).unwrap();
    let total: usize = result
        .clusters_summary
        .iter()
        .map(|c| c.total_samples)
        .sum();
    assert_eq!(total, 50);
}

#[test]
fn missing_label_column_skips_label_metrics_only() {
    let file = write_csv(&blob_csv(40, false));
    let result = run_analysis(file.path(), 2, &test_config()).unwrap();

    assert!(result.clusters_summary.is_empty());
    assert_eq!(result.evaluation_metrics.purity_score, None);
    // Label-free metrics are still attempted, and succeed here.
    assert!(result.evaluation_metrics.silhouette_score.score().is_some());
    assert!(result
        .evaluation_metrics
        .calinski_harabasz_score
        .score()
        .is_some());
    // The plot renders without labels; points just lose their color split.
    assert!(result.clustering_plot.is_some());
}

#[test]
fn constant_labels_skip_purity_and_reduction() {
    let mut csv = String::from("V1,V2,V10,V14,Class\n");
    for i in 0..30 {
        let offset = if i < 15 { 0.0 } else { 20.0 };
        writeln!(csv, "{},{},{},{},0", offset + i as f64 * 0.01, offset, offset, offset).unwrap();
    }
    let file = write_csv(&csv);
    let result = run_analysis(file.path(), 2, &test_config()).unwrap();

    assert_eq!(result.evaluation_metrics.purity_score, None);
    assert!(result.clusters_summary.is_empty());
    assert!(result.evaluation_metrics.silhouette_score.score().is_some());
}

#[test]
fn out_of_range_k_is_rejected_without_partial_output() {
    let file = write_csv(&blob_csv(10, true));
    assert!(matches!(
        run_analysis(file.path(), 0, &test_config()),
        Err(AnalysisError::InvalidParameter(_))
    ));
    assert!(matches!(
        run_analysis(file.path(), 21, &test_config()),
        Err(AnalysisError::InvalidParameter(_))
    ));
}

#[test]
fn malformed_input_is_a_parse_error() {
    let file = write_csv("V1,V2,Class\n1.0,not-a-number,0\n");
    assert!(matches!(
        run_analysis(file.path(), 2, &test_config()),
        Err(AnalysisError::Parse(_))
    ));
}

#[test]
fn nan_feature_cell_is_rejected_not_a_crash() {
    // "NaN" parses as f64; it must surface as a parse error instead of
    // reaching the tree ensemble, whose value sort has no order for it.
    let mut csv = blob_csv(15, true);
    csv.push_str("99,0.5,NaN,0.0,50.0,0\n");
    let file = write_csv(&csv);
    assert!(matches!(
        run_analysis(file.path(), 2, &test_config()),
        Err(AnalysisError::Parse(_))
    ));
}

#[test]
fn missing_projection_features_drop_only_the_plot() {
    let mut csv = String::from("V1,V2,Class\n");
    for i in 0..40 {
        let (offset, class) = if i < 20 { (0.0, 0) } else { (25.0, 1) };
        writeln!(csv, "{},{},{class}", offset + (i % 5) as f64 * 0.1, offset).unwrap();
    }
    let file = write_csv(&csv);
    let result = run_analysis(file.path(), 2, &test_config()).unwrap();

    assert!(result.clustering_plot.is_none());
    assert_eq!(result.evaluation_metrics.purity_score, Some(1.0));
    assert!(result.evaluation_metrics.silhouette_score.score().is_some());
}

#[test]
fn k_equal_to_record_count_marks_metrics_unavailable() {
    let mut csv = String::from("V10,V14,Class\n");
    for i in 0..6 {
        writeln!(csv, "{}.0,{}.0,{}", i * 10, i * 10, i % 2).unwrap();
    }
    let file = write_csv(&csv);
    let cfg = AnalysisConfig {
        render_plot: false,
        ..test_config()
    };
    let result = run_analysis(file.path(), 6, &cfg).unwrap();

    // Every point in its own cluster: both label-free metrics degrade to
    // explicit markers instead of fake numbers.
    assert_eq!(
        result.evaluation_metrics.silhouette_score,
        MetricValue::unavailable()
    );
    assert_eq!(
        result.evaluation_metrics.calinski_harabasz_score,
        MetricValue::unavailable()
    );
    // The summary itself is still reported.
    let total: usize = result
        .clusters_summary
        .iter()
        .map(|c| c.total_samples)
        .sum();
    assert_eq!(total, 6);
}

#[test]
fn json_shape_matches_the_output_contract() {
    let file = write_csv(&blob_csv(30, true));
    let result = run_analysis(file.path(), 2, &test_config()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&serde_json::to_string(&result).unwrap())
        .unwrap();

    assert!(value["clusters_summary"].is_array());
    let first = &value["clusters_summary"][0];
    assert!(first["label"].is_u64());
    assert!(first["total_samples"].is_u64());
    assert!(first["malicious_samples"].is_u64());
    assert!(value["evaluation_metrics"]["purity_score"].is_f64());
    assert!(value["evaluation_metrics"]["silhouette_score"].is_f64());
    assert!(value["evaluation_metrics"]["calinski_harabasz_score"].is_f64());
    assert!(value["clustering_plot"].is_string());
}

#[test]
fn no_label_json_omits_purity() {
    let file = write_csv(&blob_csv(30, false));
    let result = run_analysis(file.path(), 2, &test_config()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&serde_json::to_string(&result).unwrap())
        .unwrap();
    assert!(value["evaluation_metrics"]
        .as_object()
        .unwrap()
        .get("purity_score")
        .is_none());
}
