use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use crate::error::AnalysisError;

/// Label column name. When absent the table carries no labels at all; an
/// absent column is a distinct state from an all-zero one.
pub const LABEL_COLUMN: &str = "Class";

/// Columns excluded from the feature set when present.
pub const EXCLUDED_COLUMNS: [&str; 2] = ["Time", "Amount"];

/// In-memory numeric table parsed from a delimited transaction file.
#[derive(Debug, Clone)]
pub struct TransactionTable {
    pub feature_names: Vec<String>,
    pub records: Array2<f64>,
    pub labels: Option<Array1<usize>>,
}

impl TransactionTable {
    pub fn n_records(&self) -> usize {
        self.records.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.records.ncols()
    }

    /// True when labels exist and take at least two distinct values. Purity
    /// and importance-driven reduction are only meaningful in this state.
    pub fn has_label_variance(&self) -> bool {
        match &self.labels {
            Some(labels) if labels.len() > 1 => {
                let first = labels[0];
                labels.iter().any(|&l| l != first)
            }
            _ => false,
        }
    }

    /// View of a single feature column by name.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let idx = self.feature_names.iter().position(|n| n == name)?;
        Some(self.records.column(idx))
    }

    /// New table restricted to the named features, in the given order.
    /// Panics if a name is absent; callers select from `feature_names`.
    pub fn select_features(&self, names: &[String]) -> TransactionTable {
        let indices: Vec<usize> = names
            .iter()
            .map(|name| {
                self.feature_names
                    .iter()
                    .position(|n| n == name)
                    .unwrap_or_else(|| panic!("unknown feature column {name}"))
            })
            .collect();
        TransactionTable {
            feature_names: names.to_vec(),
            records: self.records.select(Axis(1), &indices),
            labels: self.labels.clone(),
        }
    }

    /// Sample down to at most `limit` records without replacement. A pure
    /// function of (seed, original order, limit): the same input always
    /// yields the same rows, kept in their original order.
    pub fn sample(self, limit: usize, seed: u64) -> TransactionTable {
        if self.n_records() <= limit {
            return self;
        }
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let mut indices = rand::seq::index::sample(&mut rng, self.n_records(), limit).into_vec();
        indices.sort_unstable();
        TransactionTable {
            feature_names: self.feature_names.clone(),
            records: self.records.select(Axis(0), &indices),
            labels: self
                .labels
                .as_ref()
                .map(|labels| indices.iter().map(|&i| labels[i]).collect()),
        }
    }
}

/// Parse a delimited transaction file into a numeric table. The header row
/// names the columns; "Class" becomes the label sequence, "Time"/"Amount"
/// are dropped, every remaining column must parse as f64.
pub fn read_transactions(path: &Path) -> Result<TransactionTable, AnalysisError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AnalysisError::Parse(format!("cannot open {}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::Parse(format!("cannot read header row: {e}")))?
        .clone();

    let label_idx = headers.iter().position(|h| h == LABEL_COLUMN);
    let mut feature_indices = Vec::new();
    let mut feature_names = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if Some(idx) == label_idx || EXCLUDED_COLUMNS.contains(&name) {
            continue;
        }
        feature_indices.push(idx);
        feature_names.push(name.to_string());
    }
    if feature_names.is_empty() {
        return Err(AnalysisError::Parse(
            "input has no numeric feature columns".to_string(),
        ));
    }

    let mut values = Vec::new();
    let mut labels = Vec::new();
    let mut n_records = 0usize;
    for (row, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| AnalysisError::Parse(format!("malformed record {}: {e}", row + 1)))?;
        for &idx in &feature_indices {
            let cell = record.get(idx).ok_or_else(|| {
                AnalysisError::Parse(format!(
                    "record {} is missing column {:?}",
                    row + 1,
                    headers.get(idx).unwrap_or("")
                ))
            })?;
            let value: f64 = cell.trim().parse().map_err(|_| {
                AnalysisError::Parse(format!(
                    "record {} column {:?}: {cell:?} is not numeric",
                    row + 1,
                    headers.get(idx).unwrap_or("")
                ))
            })?;
            // "NaN" and "inf" parse as f64 but would poison every
            // downstream computation; treat them as malformed input.
            if !value.is_finite() {
                return Err(AnalysisError::Parse(format!(
                    "record {} column {:?}: {cell:?} is not a finite number",
                    row + 1,
                    headers.get(idx).unwrap_or("")
                )));
            }
            values.push(value);
        }
        if let Some(idx) = label_idx {
            let cell = record.get(idx).unwrap_or("");
            let value: f64 = cell.trim().parse().map_err(|_| {
                AnalysisError::Parse(format!("record {} label {cell:?} is not numeric", row + 1))
            })?;
            if !value.is_finite() {
                return Err(AnalysisError::Parse(format!(
                    "record {} label {cell:?} is not a finite number",
                    row + 1
                )));
            }
            labels.push(usize::from(value != 0.0));
        }
        n_records += 1;
    }

    let records = Array2::from_shape_vec((n_records, feature_names.len()), values)
        .map_err(|e| AnalysisError::Parse(format!("inconsistent record widths: {e}")))?;
    Ok(TransactionTable {
        feature_names,
        records,
        labels: label_idx.map(|_| Array1::from(labels)),
    })
}
