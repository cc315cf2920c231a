//! Dataset analysis
//!
//! Read-only summaries of an applicant dataset: column profile, class
//! balance, Pearson correlations, multicollinearity (VIF) and sparse
//! columns. Nothing here feeds back into training.

use crate::error::{CreditError, Result};
use crate::preprocessing::{detect_column_types, numeric_values, string_values};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Variance at or below which a column is treated as constant for VIF
const NEAR_CONSTANT_VARIANCE: f64 = 1e-6;

/// Profile of a single column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
    pub null_percent: f64,
    pub unique_count: usize,
}

/// Profile of a whole dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub duplicate_rows: usize,
    pub column_info: Vec<ColumnSummary>,
}

/// Rows per target value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassBalance {
    pub label: String,
    pub count: usize,
    pub share: f64,
}

/// Pearson correlations between numeric columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `None` where fewer than two complete pairs exist or a side is constant
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Variance inflation factor of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VifEntry {
    pub column: String,
    /// `None` when the column is an exact linear combination of the others
    pub vif: Option<f64>,
}

/// Row count, duplicates and per-column nulls / cardinality
pub fn summarize(df: &DataFrame) -> Result<DatasetSummary> {
    let rows = df.height();
    let column_info = df
        .get_columns()
        .iter()
        .map(|col| {
            let null_count = col.null_count();
            ColumnSummary {
                name: col.name().to_string(),
                dtype: format!("{:?}", col.dtype()),
                null_count,
                null_percent: if rows > 0 {
                    null_count as f64 / rows as f64 * 100.0
                } else {
                    0.0
                },
                unique_count: col.n_unique().unwrap_or(0),
            }
        })
        .collect();

    Ok(DatasetSummary {
        rows,
        columns: df.width(),
        duplicate_rows: count_duplicate_rows(df)?,
        column_info,
    })
}

fn count_duplicate_rows(df: &DataFrame) -> Result<usize> {
    let columns = df
        .get_column_names()
        .iter()
        .map(|name| string_values(df, name.as_str()))
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::with_capacity(df.height());
    let mut duplicates = 0;
    for row in 0..df.height() {
        let key: Vec<Option<&str>> = columns.iter().map(|c| c[row].as_deref()).collect();
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    Ok(duplicates)
}

/// Class counts of `target`, nulls excluded, ordered by label
pub fn target_balance(df: &DataFrame, target: &str) -> Result<Vec<ClassBalance>> {
    let values = string_values(df, target)
        .map_err(|_| CreditError::TargetNotFound(target.to_string()))?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value).or_default() += 1;
    }
    let total: usize = counts.values().sum();

    Ok(counts
        .into_iter()
        .map(|(label, count)| ClassBalance {
            label,
            count,
            share: count as f64 / total as f64,
        })
        .collect())
}

/// Pearson correlation over numeric columns, using rows where both sides are present
pub fn correlation_matrix(df: &DataFrame) -> Result<CorrelationMatrix> {
    let columns = detect_column_types(df).numeric;
    let data = columns
        .iter()
        .map(|name| numeric_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&data[i], &data[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix { columns, values })
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some((cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0))
}

/// VIF = 1 / (1 - R²) of each numeric column regressed on the others.
///
/// Rows with any missing numeric value are dropped and near-constant
/// columns are left out before fitting.
pub fn variance_inflation_factors(df: &DataFrame) -> Result<Vec<VifEntry>> {
    let names = detect_column_types(df).numeric;
    let data = names
        .iter()
        .map(|name| numeric_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    let complete_rows: Vec<usize> = (0..df.height())
        .filter(|&r| data.iter().all(|col| col[r].is_some()))
        .collect();

    let mut kept_names = Vec::new();
    let mut kept = Vec::new();
    for (name, col) in names.into_iter().zip(&data) {
        let values: Vec<f64> = complete_rows.iter().filter_map(|&r| col[r]).collect();
        if variance(&values) > NEAR_CONSTANT_VARIANCE {
            kept_names.push(name);
            kept.push(values);
        }
    }

    let k = kept.len();
    let n = complete_rows.len();
    if k == 0 {
        return Ok(Vec::new());
    }
    if n <= k {
        return Err(CreditError::DataError(format!(
            "VIF needs more complete rows ({}) than numeric columns ({})",
            n, k
        )));
    }

    let mut entries = Vec::with_capacity(k);
    for j in 0..k {
        // design matrix: intercept + every other kept column
        let mut x = Array2::<f64>::ones((n, k));
        let mut col_idx = 1;
        for (other, values) in kept.iter().enumerate() {
            if other == j {
                continue;
            }
            for r in 0..n {
                x[[r, col_idx]] = values[r];
            }
            col_idx += 1;
        }
        let y = Array1::from_vec(kept[j].clone());

        let r2 = match solve_least_squares(&x, &y) {
            Some(beta) => r_squared(&x, &y, &beta),
            None => 1.0,
        };
        let vif = if r2 >= 1.0 - 1e-12 {
            None
        } else {
            Some(1.0 / (1.0 - r2))
        };
        entries.push(VifEntry {
            column: kept_names[j].clone(),
            vif,
        });
    }
    Ok(entries)
}

/// Columns whose null share exceeds `threshold`, with that share
pub fn sparse_columns(df: &DataFrame, threshold: f64) -> Vec<(String, f64)> {
    let rows = df.height();
    if rows == 0 {
        return Vec::new();
    }
    df.get_columns()
        .iter()
        .filter_map(|col| {
            let share = col.null_count() as f64 / rows as f64;
            (share > threshold).then(|| (col.name().to_string(), share))
        })
        .collect()
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn r_squared(x: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>) -> f64 {
    let fitted = x.dot(beta);
    let mean = y.mean().unwrap_or(0.0);
    let ss_res: f64 = y.iter().zip(fitted.iter()).map(|(a, b)| (a - b).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

/// Normal equations (XᵀX) β = Xᵀy solved by Cholesky
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);
    cholesky_solve(&xtx, &xty)
}

fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    let scale = a.diag().iter().map(|v| v.abs()).fold(0.0, f64::max).max(1.0);

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                // singular to working precision
                if diag <= 1e-12 * scale {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * z[j]).sum();
        z[i] = (b[i] - sum) / l[[i, i]];
    }
    let mut beta = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * beta[j]).sum();
        beta[i] = (z[i] - sum) / l[[i, i]];
    }
    Some(beta)
}
