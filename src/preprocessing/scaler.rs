//! Standard scaling

use crate::error::{CreditError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters for a fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean
    scale: f64,  // population std, 1.0 for constant columns
}

/// Z-score scaler: (x - mean) / std
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scaler {
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit mean and std of one column (values already imputed)
    pub fn fit_column(&mut self, column: &str, values: &[f64]) -> &mut Self {
        let params = if values.is_empty() {
            ScalerParams { center: 0.0, scale: 1.0 }
        } else {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            ScalerParams {
                center: mean,
                scale: if std > f64::EPSILON * mean.abs().max(1.0) { std } else { 1.0 },
            }
        };
        self.params.insert(column.to_string(), params);
        self.is_fitted = true;
        self
    }

    /// Scale one column with its fitted parameters
    pub fn transform_column(&self, column: &str, values: &[f64]) -> Result<Vec<f64>> {
        let params = self.params_for(column)?;
        Ok(values
            .iter()
            .map(|v| (v - params.center) / params.scale)
            .collect())
    }

    /// Fitted (mean, std) of a column
    pub fn stats(&self, column: &str) -> Option<(f64, f64)> {
        self.params.get(column).map(|p| (p.center, p.scale))
    }

    fn params_for(&self, column: &str) -> Result<&ScalerParams> {
        if !self.is_fitted {
            return Err(CreditError::ModelNotFitted);
        }
        self.params
            .get(column)
            .ok_or_else(|| CreditError::FeatureNotFound(column.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaling() {
        let mut scaler = Scaler::new();
        scaler.fit_column("ingresos", &[2.0, 4.0, 6.0, 8.0]);

        let (mean, std) = scaler.stats("ingresos").unwrap();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 5.0f64.sqrt()).abs() < 1e-12);

        let scaled = scaler.transform_column("ingresos", &[5.0, 7.0]).unwrap();
        assert!(scaled[0].abs() < 1e-12);
        assert!((scaled[1] - 2.0 / 5.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let mut scaler = Scaler::new();
        scaler.fit_column("plazo", &[12.0, 12.0, 12.0]);
        assert_eq!(scaler.stats("plazo"), Some((12.0, 1.0)));
        assert_eq!(scaler.transform_column("plazo", &[13.0]).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_unknown_column() {
        let mut scaler = Scaler::new();
        scaler.fit_column("a", &[1.0]);
        assert!(matches!(
            scaler.transform_column("b", &[1.0]),
            Err(CreditError::FeatureNotFound(_))
        ));
    }
}
