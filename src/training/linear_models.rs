//! Regularized logistic regression

use crate::error::{CreditError, Result};
use super::models::{check_training_data, ClassWeight};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Regularization penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L1,
    L2,
    ElasticNet,
}

impl FromStr for Penalty {
    type Err = CreditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "l1" => Ok(Penalty::L1),
            "l2" => Ok(Penalty::L2),
            "elasticnet" | "elastic_net" => Ok(Penalty::ElasticNet),
            other => Err(CreditError::InvalidParameter {
                name: "penalty".to_string(),
                value: other.to_string(),
                reason: "expected l1, l2 or elasticnet".to_string(),
            }),
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Penalty::L1 => "l1",
            Penalty::L2 => "l2",
            Penalty::ElasticNet => "elasticnet",
        };
        f.write_str(name)
    }
}

/// Logistic regression fitted by accelerated proximal gradient descent.
///
/// Minimizes `(1/n) * sum(w_i * logloss_i) + penalty(beta) / (C * n)`, which has
/// the same minimizer as `C * sum(w_i * logloss_i) + penalty(beta)`. The L1 part
/// is handled by soft-thresholding, so every penalty uses the same solver.
/// The intercept is never penalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    pub penalty: Penalty,
    /// Inverse regularization strength
    pub c: f64,
    /// Elastic-net mixing parameter
    pub l1_ratio: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the largest parameter change
    pub tol: f64,
    pub class_weight: ClassWeight,
    /// Iterations used by the last fit
    pub n_iter: usize,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model (L2, C = 1, balanced)
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            penalty: Penalty::L2,
            c: 1.0,
            l1_ratio: 0.5,
            max_iter: 1000,
            tol: 1e-4,
            class_weight: ClassWeight::Balanced,
            n_iter: 0,
            is_fitted: false,
        }
    }

    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Result<Self> {
        if !(c > 0.0 && c.is_finite()) {
            return Err(CreditError::InvalidParameter {
                name: "C".to_string(),
                value: c.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        self.c = c;
        Ok(self)
    }

    pub fn with_l1_ratio(mut self, l1_ratio: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&l1_ratio) {
            return Err(CreditError::InvalidParameter {
                name: "l1_ratio".to_string(),
                value: l1_ratio.to_string(),
                reason: "must lie in [0, 1]".to_string(),
            });
        }
        self.l1_ratio = l1_ratio;
        Ok(self)
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Numerically stable sigmoid
    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let e = z.exp();
            e / (1.0 + e)
        }
    }

    /// (L1, L2) strengths of the scaled objective
    fn penalty_strengths(&self, n_samples: usize) -> (f64, f64) {
        let lambda = 1.0 / (self.c * n_samples as f64);
        match self.penalty {
            Penalty::L1 => (lambda, 0.0),
            Penalty::L2 => (0.0, lambda),
            Penalty::ElasticNet => (self.l1_ratio * lambda, (1.0 - self.l1_ratio) * lambda),
        }
    }

    /// Largest eigenvalue of `[X 1]^T W [X 1] / n` by power iteration
    fn curvature_bound(x: &Array2<f64>, sw: &Array1<f64>) -> f64 {
        let n = x.nrows() as f64;
        let d = x.ncols();
        let mut v = Array1::<f64>::from_elem(d + 1, 1.0 / ((d + 1) as f64).sqrt());
        let mut eigen = 0.0;
        for _ in 0..50 {
            let xv = x.dot(&v.slice(ndarray::s![..d])) + v[d];
            let wxv = &xv * sw;
            let mut next = Array1::<f64>::zeros(d + 1);
            next.slice_mut(ndarray::s![..d]).assign(&(x.t().dot(&wxv) / n));
            next[d] = wxv.sum() / n;
            let norm = next.dot(&next).sqrt();
            if norm <= f64::EPSILON {
                return 0.0;
            }
            eigen = norm;
            v = next / norm;
        }
        eigen
    }

    fn soft_threshold(value: f64, threshold: f64) -> f64 {
        if value > threshold {
            value - threshold
        } else if value < -threshold {
            value + threshold
        } else {
            0.0
        }
    }

    /// Fit the model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let sw = self.class_weight.sample_weights(y);
        let (l1, l2) = self.penalty_strengths(n_samples);

        // logistic loss curvature is at most 1/4; 10% margin for the power iteration
        let lipschitz = 0.25 * Self::curvature_bound(x, &sw) * 1.1 + l2;
        let step = if lipschitz > 0.0 { 1.0 / lipschitz } else { 1.0 };

        let mut weights = Array1::<f64>::zeros(n_features);
        let mut bias = 0.0;
        let mut look_w = weights.clone();
        let mut look_b = bias;
        let mut t = 1.0f64;
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;

            // Gradient at the look-ahead point
            let linear = x.dot(&look_w) + look_b;
            let residual = ndarray::Zip::from(&linear)
                .and(y)
                .and(&sw)
                .map_collect(|&z, &target, &w| w * (Self::sigmoid(z) - target) / n_samples as f64);
            let grad_w = x.t().dot(&residual) + l2 * &look_w;
            let grad_b = residual.sum();

            // Proximal step
            let next_w = (&look_w - &(step * &grad_w)).mapv(|v| Self::soft_threshold(v, step * l1));
            let next_b = look_b - step * grad_b;

            let delta_w = &next_w - &weights;
            let delta_b = next_b - bias;
            let max_change = delta_w
                .iter()
                .fold(delta_b.abs(), |acc, v| acc.max(v.abs()));
            let max_param = next_w
                .iter()
                .fold(next_b.abs(), |acc, v| acc.max(v.abs()));

            // Restart momentum when it points against the last step
            let against = (&look_w - &next_w).dot(&delta_w) + (look_b - next_b) * delta_b;
            let t_next = if against > 0.0 {
                1.0
            } else {
                (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0
            };
            let momentum = if against > 0.0 { 0.0 } else { (t - 1.0) / t_next };

            look_w = &next_w + &(momentum * &delta_w);
            look_b = next_b + momentum * delta_b;
            weights = next_w;
            bias = next_b;
            t = t_next;

            if max_change <= self.tol * max_param.max(1.0) {
                converged = true;
                break;
            }
        }

        if !converged {
            debug!(
                max_iter = self.max_iter,
                penalty = %self.penalty,
                c = self.c,
                "Logistic regression reached the iteration cap"
            );
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.n_iter = iterations;
        self.is_fitted = true;

        Ok(self)
    }

    /// Probability of class 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = match (&self.coefficients, self.is_fitted) {
            (Some(c), true) => c,
            _ => return Err(CreditError::ModelNotFitted),
        };

        if x.ncols() != coefficients.len() {
            return Err(CreditError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let intercept = self.intercept.unwrap_or(0.0);
        Ok((x.dot(coefficients) + intercept).mapv(Self::sigmoid))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }
}
