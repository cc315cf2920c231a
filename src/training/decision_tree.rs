//! Weighted Gini decision tree for binary classification

use crate::error::{CreditError, Result};
use super::models::{check_training_data, ClassWeight};
use ndarray::{Array1, Array2};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node; children are indices into the node arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the weighted fraction of class 1
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
        n_samples: usize,
        impurity: f64,
    },
}

/// Candidate split found for a node
struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    improvement: f64,
}

/// Pending node while growing the tree
struct NodeWork {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Node arena, root at index 0
    nodes: Vec<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features examined per split (all when `None`)
    pub max_features: Option<usize>,
    pub class_weight: ClassWeight,
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            class_weight: ClassWeight::Uniform,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        let weights = self.class_weight.sample_weights(y);
        self.fit_rows(x, y, &weights, (0..x.nrows()).collect());
        Ok(self)
    }

    /// Grow the tree over `rows` (duplicates allowed, as in a bootstrap sample)
    pub(crate) fn fit_rows(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: &Array1<f64>,
        rows: Vec<usize>,
    ) {
        let n_features = x.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];
        let mut nodes = vec![TreeNode::Leaf { value: 0.0, n_samples: 0 }];
        let mut stack = vec![NodeWork { node: 0, rows, depth: 0 }];

        while let Some(work) = stack.pop() {
            let (w_total, w_pos) = Self::weight_sums(y, weights, &work.rows);
            let value = if w_total > 0.0 { w_pos / w_total } else { 0.0 };
            let impurity = Self::gini(w_total, w_pos);
            let n_samples = work.rows.len();

            let stop = self.max_depth.map_or(false, |d| work.depth >= d)
                || n_samples < self.min_samples_split
                || n_samples < 2 * self.min_samples_leaf
                || impurity <= 1e-12;

            let split = if stop {
                None
            } else {
                let features = self.sample_features(n_features, &mut rng);
                self.find_best_split(x, y, weights, &work.rows, &features, w_total, w_pos)
            };

            match split {
                None => {
                    nodes[work.node] = TreeNode::Leaf { value, n_samples };
                }
                Some(best) => {
                    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = work
                        .rows
                        .iter()
                        .partition(|&&r| x[[r, best.feature_idx]] <= best.threshold);

                    importances[best.feature_idx] += best.improvement;

                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(TreeNode::Leaf { value: 0.0, n_samples: 0 });
                    nodes.push(TreeNode::Leaf { value: 0.0, n_samples: 0 });
                    nodes[work.node] = TreeNode::Split {
                        feature_idx: best.feature_idx,
                        threshold: best.threshold,
                        left,
                        right,
                        n_samples,
                        impurity,
                    };

                    stack.push(NodeWork { node: right, rows: right_rows, depth: work.depth + 1 });
                    stack.push(NodeWork { node: left, rows: left_rows, depth: work.depth + 1 });
                }
            }
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        self.nodes = nodes;
        self.n_features = n_features;
        self.feature_importances = Some(Array1::from_vec(importances));
    }

    fn sample_features(&self, n_features: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < n_features => index::sample(rng, n_features, k).into_vec(),
            _ => (0..n_features).collect(),
        }
    }

    fn weight_sums(y: &Array1<f64>, weights: &Array1<f64>, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(total, pos), &r| {
            let w = weights[r];
            (total + w, if y[r] > 0.5 { pos + w } else { pos })
        })
    }

    /// Weighted Gini impurity of a node
    fn gini(w_total: f64, w_pos: f64) -> f64 {
        if w_total <= 0.0 {
            return 0.0;
        }
        let p = w_pos / w_total;
        2.0 * p * (1.0 - p)
    }

    #[allow(clippy::too_many_arguments)]
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: &Array1<f64>,
        rows: &[usize],
        features: &[usize],
        w_total: f64,
        w_pos: f64,
    ) -> Option<BestSplit> {
        let parent = w_total * Self::gini(w_total, w_pos);
        let n = rows.len();
        let mut best: Option<BestSplit> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n);

        for &feature in features {
            sorted.clear();
            sorted.extend(rows.iter().map(|&r| (x[[r, feature]], r)));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            if sorted[0].0 == sorted[n - 1].0 {
                continue;
            }

            let mut left_w = 0.0;
            let mut left_pos = 0.0;
            for i in 0..n - 1 {
                let (value, row) = sorted[i];
                let w = weights[row];
                left_w += w;
                if y[row] > 0.5 {
                    left_pos += w;
                }

                let next_value = sorted[i + 1].0;
                if value == next_value {
                    continue;
                }
                let n_left = i + 1;
                if n_left < self.min_samples_leaf || n - n_left < self.min_samples_leaf {
                    continue;
                }

                let right_w = w_total - left_w;
                let right_pos = w_pos - left_pos;
                if left_w <= 0.0 || right_w <= 0.0 {
                    continue;
                }

                let children = left_w * Self::gini(left_w, left_pos)
                    + right_w * Self::gini(right_w, right_pos);
                let improvement = parent - children;

                if improvement > 1e-12 && best.as_ref().map_or(true, |b| improvement > b.improvement) {
                    let mut threshold = value + (next_value - value) / 2.0;
                    if threshold >= next_value {
                        threshold = value;
                    }
                    best = Some(BestSplit { feature_idx: feature, threshold, improvement });
                }
            }
        }

        best
    }

    /// Probability of class 1 for every row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.nodes.is_empty() {
            return Err(CreditError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(CreditError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.outer_iter()
            .map(|row| {
                let mut idx = 0;
                loop {
                    match &self.nodes[idx] {
                        TreeNode::Leaf { value, .. } => return *value,
                        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                            idx = if row[*feature_idx] <= *threshold { *left } else { *right };
                        }
                    }
                }
            })
            .collect())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let TreeNode::Split { left, right, .. } = &self.nodes[idx] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_simple() {
        let x = array![[1.0, 5.0], [2.0, 4.0], [3.0, 3.0], [4.0, 2.0], [5.0, 1.0], [6.0, 0.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_depth(), 1);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(2);
        tree.fit(&x, &y).unwrap();
        assert!(tree.get_depth() <= 2);

        let proba = tree.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_min_samples_leaf_blocks_small_leaves() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 0.0, 0.0, 0.0];

        let mut tree = DecisionTree::new_classifier().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();
        // the only pure split would isolate a single row
        let proba = tree.predict_proba(&array![[1.0]]).unwrap();
        assert!((proba[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_balanced_weights_shift_leaf_probabilities() {
        let x = array![[0.0], [0.0], [0.0], [0.0]];
        let y = array![0.0, 0.0, 0.0, 1.0];

        let mut uniform = DecisionTree::new_classifier();
        uniform.fit(&x, &y).unwrap();
        let mut balanced = DecisionTree::new_classifier().with_class_weight(ClassWeight::Balanced);
        balanced.fit(&x, &y).unwrap();

        assert!((uniform.predict_proba(&x).unwrap()[0] - 0.25).abs() < 1e-12);
        assert!((balanced.predict_proba(&x).unwrap()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.3], [2.0, 0.1], [3.0, 0.2], [4.0, 0.3], [5.0, 0.1], [6.0, 0.2]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let imp = tree.feature_importances().unwrap();
        assert!((imp.sum() - 1.0).abs() < 1e-12);
        assert!(imp[0] > imp[1]);
    }
}
