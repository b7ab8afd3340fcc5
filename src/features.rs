use linfa::traits::Fit;
use linfa::Dataset;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::csv_reader::TransactionTable;

/// Why the selector passed the table through unreduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// No label column in the input.
    NoLabels,
    /// Labels present but constant; importance has no signal to learn from.
    ConstantLabels,
    /// The ensemble fit failed; the full feature set is used instead.
    Degraded,
}

/// Outcome of the dimensionality-reduction step.
#[derive(Debug)]
pub enum SelectionOutcome {
    /// Table reduced to the top features, ranked by descending importance.
    Reduced {
        table: TransactionTable,
        ranking: Vec<(String, f64)>,
    },
    /// Table returned unchanged.
    Passthrough {
        table: TransactionTable,
        reason: PassthroughReason,
    },
}

impl SelectionOutcome {
    pub fn table(&self) -> &TransactionTable {
        match self {
            SelectionOutcome::Reduced { table, .. } => table,
            SelectionOutcome::Passthrough { table, .. } => table,
        }
    }

    pub fn into_table(self) -> TransactionTable {
        match self {
            SelectionOutcome::Reduced { table, .. } => table,
            SelectionOutcome::Passthrough { table, .. } => table,
        }
    }
}

/// Reduce the table to its most label-predictive features. Trains a bagged
/// decision-tree ensemble against the labels, averages per-tree impurity
/// importances, and keeps the top `cfg.top_features` by descending score.
/// Without label variance the step is a no-op; an ensemble failure falls
/// back to the unreduced table rather than aborting the pipeline.
pub fn select_top_features(table: TransactionTable, cfg: &AnalysisConfig) -> SelectionOutcome {
    let labels = match table.labels.clone() {
        Some(labels) => labels,
        None => {
            log::info!("no label column; skipping feature reduction");
            return SelectionOutcome::Passthrough {
                table,
                reason: PassthroughReason::NoLabels,
            };
        }
    };
    if !table.has_label_variance() {
        log::info!("labels are constant; skipping feature reduction");
        return SelectionOutcome::Passthrough {
            table,
            reason: PassthroughReason::ConstantLabels,
        };
    }
    // Non-finite values have no defined sort order, so the trees cannot
    // split on them; degrade to the full feature set instead of fitting.
    if table.records.iter().any(|v| !v.is_finite()) {
        log::warn!("feature selection degraded, keeping full feature set: non-finite feature values");
        return SelectionOutcome::Passthrough {
            table,
            reason: PassthroughReason::Degraded,
        };
    }

    match ensemble_importances(&table.records, &labels, cfg) {
        Ok(scores) => {
            let mut ranking: Vec<(String, f64)> = table
                .feature_names
                .iter()
                .cloned()
                .zip(scores)
                .collect();
            // Descending score, feature name breaking ties for determinism.
            ranking.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });
            ranking.truncate(cfg.top_features.min(table.n_features()));
            let names: Vec<String> = ranking.iter().map(|(name, _)| name.clone()).collect();
            log::info!("feature reduction kept {:?}", names);
            let reduced = table.select_features(&names);
            SelectionOutcome::Reduced {
                table: reduced,
                ranking,
            }
        }
        Err(err) => {
            log::warn!("feature selection degraded, keeping full feature set: {err}");
            SelectionOutcome::Passthrough {
                table,
                reason: PassthroughReason::Degraded,
            }
        }
    }
}

/// Mean per-feature importance over a bagged tree ensemble. Each tree draws
/// a bootstrap row sample and a random sqrt-sized feature subset, seeded
/// independently per tree so the whole ensemble is reproducible. Tree fits
/// are embarrassingly parallel; this is the pipeline's only parallel step.
fn ensemble_importances(
    records: &Array2<f64>,
    labels: &Array1<usize>,
    cfg: &AnalysisConfig,
) -> Result<Vec<f64>, linfa::error::Error> {
    let n_records = records.nrows();
    let n_features = records.ncols();
    let subset_size = ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features);

    let per_tree: Vec<Result<Vec<(usize, f64)>, linfa::error::Error>> = (0..cfg.ensemble_trees)
        .into_par_iter()
        .map(|tree_idx| {
            let mut rng = Xoshiro256Plus::seed_from_u64(cfg.step_seed(tree_idx as u64));
            let rows: Vec<usize> = (0..n_records).map(|_| rng.gen_range(0..n_records)).collect();
            let mut columns =
                rand::seq::index::sample(&mut rng, n_features, subset_size).into_vec();
            columns.sort_unstable();

            let subset = records.select(Axis(0), &rows).select(Axis(1), &columns);
            let targets: Array1<usize> = rows.iter().map(|&r| labels[r]).collect();
            let tree = DecisionTree::params().fit(&Dataset::new(subset, targets))?;
            let importances = tree.feature_importance();
            Ok(columns.into_iter().zip(importances).collect())
        })
        .collect();

    let mut totals = vec![0.0f64; n_features];
    let mut fitted = 0usize;
    let mut last_err = None;
    for result in per_tree {
        match result {
            Ok(contributions) => {
                for (feature, score) in contributions {
                    totals[feature] += score;
                }
                fitted += 1;
            }
            Err(err) => last_err = Some(err),
        }
    }
    if fitted == 0 {
        return Err(last_err
            .unwrap_or_else(|| linfa::error::Error::Parameters("no trees fitted".to_string())));
    }
    for total in &mut totals {
        *total /= fitted as f64;
    }
    Ok(totals)
}
