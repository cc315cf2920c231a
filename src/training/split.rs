//! Stratified train / validation / test partitioning

use crate::error::{CreditError, Result};
use ndarray::{concatenate, Array1, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Row indices of one stratified two-way split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn class_groups(y: &Array1<f64>, rows: &[usize]) -> BTreeMap<i64, Vec<usize>> {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for &row in rows {
        groups.entry(y[row].round() as i64).or_default().push(row);
    }
    groups
}

/// Split `rows` so that `ceil(test_size * n)` of them land in the test side,
/// each class contributing in proportion to its count.
pub fn stratified_split(
    y: &Array1<f64>,
    rows: &[usize],
    test_size: f64,
    rng: &mut ChaCha8Rng,
) -> Result<StratifiedSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(CreditError::ConfigError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n = rows.len();
    let groups = class_groups(y, rows);
    if let Some((class, members)) = groups.iter().find(|(_, m)| m.len() < 2) {
        return Err(CreditError::Stratification(format!(
            "class {} has {} member(s), at least 2 are required",
            class,
            members.len()
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n - n_test;
    let n_classes = groups.len();
    if n_test < n_classes || n_train < n_classes {
        return Err(CreditError::Stratification(format!(
            "{} rows cannot be split into {} train / {} test with {} classes on each side",
            n, n_train, n_test, n_classes
        )));
    }

    // Largest remainder allocation; ties resolved by lower class label
    let mut allocation: Vec<(i64, usize, f64)> = groups
        .iter()
        .map(|(&class, members)| {
            let exact = n_test as f64 * members.len() as f64 / n as f64;
            (class, exact.floor() as usize, exact - exact.floor())
        })
        .collect();
    let assigned: usize = allocation.iter().map(|(_, k, _)| k).sum();
    let mut by_remainder: Vec<usize> = (0..allocation.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        allocation[b]
            .2
            .total_cmp(&allocation[a].2)
            .then(allocation[a].0.cmp(&allocation[b].0))
    });
    for &i in by_remainder.iter().take(n_test - assigned) {
        allocation[i].1 += 1;
    }

    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for ((_, members), (_, k, _)) in groups.into_iter().zip(allocation) {
        let mut members = members;
        members.shuffle(rng);
        test.extend_from_slice(&members[..k]);
        train.extend_from_slice(&members[k..]);
    }
    train.sort_unstable();
    test.sort_unstable();

    Ok(StratifiedSplit { train, test })
}

/// Row indices of the three partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

/// Hold out `temp_size` of the rows, then cut the holdout into validation and
/// test with `test_share` of it going to test. Both stages are stratified.
pub fn three_way_split(
    y: &Array1<f64>,
    temp_size: f64,
    test_share: f64,
    seed: u64,
) -> Result<SplitIndices> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let all: Vec<usize> = (0..y.len()).collect();

    let first = stratified_split(y, &all, temp_size, &mut rng)?;
    let second = stratified_split(y, &first.test, test_share, &mut rng)?;

    Ok(SplitIndices {
        train: first.train,
        validation: second.train,
        test: second.test,
    })
}

/// Take `rows` from a frame, in the given order
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = rows.iter().map(|&r| r as IdxSize).collect();
    Ok(df.take(&IdxCa::from_vec("idx".into(), idx))?)
}

/// Take `rows` from a label vector, in the given order
pub fn take_labels(y: &Array1<f64>, rows: &[usize]) -> Array1<f64> {
    rows.iter().map(|&r| y[r]).collect()
}

/// Row counts of the three partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

/// Feature frames and labels of the three partitions
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub x_train: DataFrame,
    pub y_train: Array1<f64>,
    pub x_val: DataFrame,
    pub y_val: Array1<f64>,
    pub x_test: DataFrame,
    pub y_test: Array1<f64>,
}

impl DataSplit {
    /// Stratified 70/15/15 (by default) split of `features` and `y`
    pub fn new(
        features: &DataFrame,
        y: &Array1<f64>,
        temp_size: f64,
        test_share: f64,
        seed: u64,
    ) -> Result<Self> {
        if features.height() != y.len() {
            return Err(CreditError::ShapeError {
                expected: format!("{} labels", features.height()),
                actual: format!("{} labels", y.len()),
            });
        }
        let idx = three_way_split(y, temp_size, test_share, seed)?;

        let split = Self {
            x_train: take_rows(features, &idx.train)?,
            y_train: take_labels(y, &idx.train),
            x_val: take_rows(features, &idx.validation)?,
            y_val: take_labels(y, &idx.validation),
            x_test: take_rows(features, &idx.test)?,
            y_test: take_labels(y, &idx.test),
        };

        let sizes = split.sizes();
        info!(
            train = sizes.train,
            validation = sizes.validation,
            test = sizes.test,
            seed,
            "Stratified split created"
        );
        Ok(split)
    }

    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            train: self.y_train.len(),
            validation: self.y_val.len(),
            test: self.y_test.len(),
        }
    }

    /// Train and validation rows stacked, used for cross-validation
    pub fn train_and_validation(&self) -> Result<(DataFrame, Array1<f64>)> {
        let x = self.x_train.vstack(&self.x_val)?;
        let y = concatenate(Axis(0), &[self.y_train.view(), self.y_val.view()])?;
        Ok((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize, positives: usize) -> Array1<f64> {
        (0..n).map(|i| if i < positives { 1.0 } else { 0.0 }).collect()
    }

    #[test]
    fn test_three_way_sizes_and_disjointness() {
        let y = labels(1000, 300);
        let idx = three_way_split(&y, 0.30, 0.50, 42).unwrap();

        assert_eq!(idx.train.len(), 700);
        assert_eq!(idx.validation.len(), 150);
        assert_eq!(idx.test.len(), 150);

        let mut all: Vec<usize> = idx
            .train
            .iter()
            .chain(&idx.validation)
            .chain(&idx.test)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());

        let positives = |rows: &[usize]| rows.iter().filter(|&&r| y[r] > 0.5).count();
        assert_eq!(positives(&idx.train), 210);
        assert_eq!(positives(&idx.validation), 45);
        assert_eq!(positives(&idx.test), 45);
    }

    #[test]
    fn test_ceil_rule_and_largest_remainder() {
        let y = labels(11, 4);
        let all: Vec<usize> = (0..11).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let split = stratified_split(&y, &all, 0.3, &mut rng).unwrap();
        // ceil(3.3) = 4 test rows; exact shares 2.55 / 1.45
        assert_eq!(split.test.len(), 4);
        assert_eq!(split.test.iter().filter(|&&r| y[r] > 0.5).count(), 1);
    }

    #[test]
    fn test_same_seed_same_split() {
        let y = labels(200, 40);
        let a = three_way_split(&y, 0.3, 0.5, 7).unwrap();
        let b = three_way_split(&y, 0.3, 0.5, 7).unwrap();
        let c = three_way_split(&y, 0.3, 0.5, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_stratification_preconditions() {
        let all: Vec<usize> = (0..10).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let lonely = labels(10, 1);
        assert!(matches!(
            stratified_split(&lonely, &all, 0.3, &mut rng),
            Err(CreditError::Stratification(_))
        ));

        let y = labels(10, 5);
        assert!(matches!(
            stratified_split(&y, &all, 0.05, &mut rng),
            Err(CreditError::Stratification(_))
        ));
    }

    #[test]
    fn test_data_split_frames() {
        let y = labels(40, 12);
        let df = df!("edad" => (0..40).map(|i| i as f64).collect::<Vec<_>>()).unwrap();
        let split = DataSplit::new(&df, &y, 0.3, 0.5, 42).unwrap();

        assert_eq!(split.x_train.height(), split.y_train.len());
        assert_eq!(split.sizes().train + split.sizes().validation + split.sizes().test, 40);

        // labels follow their rows
        let edad = split.x_test.column("edad").unwrap().f64().unwrap();
        for (value, label) in edad.into_iter().zip(split.y_test.iter()) {
            let row = value.unwrap() as usize;
            assert_eq!(y[row], *label);
        }

        let (x, y_cv) = split.train_and_validation().unwrap();
        assert_eq!(x.height(), y_cv.len());
    }
}
