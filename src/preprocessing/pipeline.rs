//! Column-wise preprocessing pipeline

use super::{
    detect_column_types, numeric_values, string_values, ColumnGroups, ImputeStrategy, Imputer,
    OneHotEncoder, Scaler,
};
use crate::error::{CreditError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Impute + scale numeric columns, impute + one-hot categorical columns,
/// pass everything else through.
///
/// Output layout: numeric columns, then one indicator per category of each
/// categorical column, then passthrough columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    groups: ColumnGroups,
    numeric_imputer: Imputer,
    categorical_imputer: Imputer,
    scaler: Scaler,
    encoder: OneHotEncoder,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl ColumnPreprocessor {
    /// Create an unfitted preprocessor over fixed column groups
    pub fn new(groups: ColumnGroups) -> Self {
        Self {
            groups,
            numeric_imputer: Imputer::new(ImputeStrategy::Median),
            categorical_imputer: Imputer::new(ImputeStrategy::MostFrequent),
            scaler: Scaler::new(),
            encoder: OneHotEncoder::new(),
            feature_names: Vec::new(),
            is_fitted: false,
        }
    }

    /// Create an unfitted preprocessor with groups detected from `df`'s dtypes
    pub fn from_frame(df: &DataFrame) -> Self {
        Self::new(detect_column_types(df))
    }

    pub fn groups(&self) -> &ColumnGroups {
        &self.groups
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Output feature names; empty before fit
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn numeric_imputer(&self) -> &Imputer {
        &self.numeric_imputer
    }

    pub fn categorical_imputer(&self) -> &Imputer {
        &self.categorical_imputer
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Fit every statistic from `df`. Refitting starts from a clean state.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();
        if df.height() == 0 {
            return Err(CreditError::PreprocessingError(
                "cannot fit on an empty frame".to_string(),
            ));
        }

        let mut numeric_imputer = Imputer::new(ImputeStrategy::Median);
        let mut categorical_imputer = Imputer::new(ImputeStrategy::MostFrequent);
        let mut scaler = Scaler::new();
        let mut encoder = OneHotEncoder::new();
        let mut feature_names = Vec::new();

        for name in &self.groups.numeric {
            let raw = numeric_values(df, name)?;
            numeric_imputer.fit_numeric(name, &raw);
            let imputed = numeric_imputer.transform_numeric(name, &raw)?;
            scaler.fit_column(name, &imputed);
            feature_names.push(name.clone());
        }

        for name in &self.groups.categorical {
            let raw = string_values(df, name)?;
            categorical_imputer.fit_categorical(name, &raw)?;
            let imputed = categorical_imputer.transform_categorical(name, &raw)?;
            encoder.fit_column(name, &imputed);
            feature_names.extend(encoder.feature_names(name)?);
        }

        for name in &self.groups.passthrough {
            if df.column(name).is_err() {
                return Err(CreditError::FeatureNotFound(name.clone()));
            }
            feature_names.push(name.clone());
        }

        self.numeric_imputer = numeric_imputer;
        self.categorical_imputer = categorical_imputer;
        self.scaler = scaler;
        self.encoder = encoder;
        self.feature_names = feature_names;
        self.is_fitted = true;

        debug!(
            rows = df.height(),
            numeric = self.groups.numeric.len(),
            categorical = self.groups.categorical.len(),
            passthrough = self.groups.passthrough.len(),
            n_features = self.feature_names.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Preprocessor fitted"
        );
        Ok(self)
    }

    /// Transform `df` into the model matrix using the frozen statistics
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(CreditError::ModelNotFitted);
        }

        let n_rows = df.height();
        let mut out = Array2::<f64>::zeros((n_rows, self.feature_names.len()));
        let mut offset = 0;

        for name in &self.groups.numeric {
            let raw = numeric_values(df, name)?;
            let imputed = self.numeric_imputer.transform_numeric(name, &raw)?;
            let scaled = self.scaler.transform_column(name, &imputed)?;
            for (row, value) in scaled.into_iter().enumerate() {
                out[[row, offset]] = value;
            }
            offset += 1;
        }

        for name in &self.groups.categorical {
            let raw = string_values(df, name)?;
            let imputed = self.categorical_imputer.transform_categorical(name, &raw)?;
            let width = self.encoder.categories(name)?.len();
            for (row, value) in imputed.iter().enumerate() {
                if let Some(idx) = self.encoder.index_of(name, value)? {
                    out[[row, offset + idx]] = 1.0;
                }
            }
            offset += width;
        }

        for name in &self.groups.passthrough {
            let raw = numeric_values(df, name)?;
            for (row, value) in raw.into_iter().enumerate() {
                out[[row, offset]] = value.unwrap_or(f64::NAN);
            }
            offset += 1;
        }

        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dataframe() -> DataFrame {
        df!(
            "edad" => &[Some(25.0), Some(35.0), None, Some(45.0)],
            "zona" => &[Some("Urbana"), None, Some("Rural"), Some("Urbana")],
            "ingresos" => &[1000i64, 2000, 3000, 4000]
        )
        .unwrap()
    }

    #[test]
    fn test_fit_transform_layout() {
        let df = create_test_dataframe();
        let mut pre = ColumnPreprocessor::from_frame(&df);
        let x = pre.fit_transform(&df).unwrap();

        assert_eq!(
            pre.feature_names(),
            &["edad", "ingresos", "zona_Rural", "zona_Urbana"]
        );
        assert_eq!(x.dim(), (4, 4));

        // median of 25, 35, 45 fills the gap and becomes the scaled mean
        assert_eq!(pre.numeric_imputer().numeric_fill("edad"), Some(35.0));
        assert!(x[[2, 0]].abs() < 1e-12);

        // missing zona takes the mode
        assert_eq!(x.row(1).to_vec()[2..], [0.0, 1.0]);
        assert_eq!(x.row(2).to_vec()[2..], [1.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_is_all_zero() {
        let df = create_test_dataframe();
        let mut pre = ColumnPreprocessor::from_frame(&df);
        pre.fit(&df).unwrap();

        let new_rows = df!(
            "edad" => &[30.0],
            "zona" => &["Periurbana"],
            "ingresos" => &[2500i64]
        )
        .unwrap();
        let x = pre.transform(&new_rows).unwrap();
        assert_eq!(x[[0, 2]], 0.0);
        assert_eq!(x[[0, 3]], 0.0);
    }

    #[test]
    fn test_transform_does_not_change_statistics() {
        let df = create_test_dataframe();
        let mut pre = ColumnPreprocessor::from_frame(&df);
        pre.fit(&df).unwrap();
        let before = serde_json::to_string(&pre).unwrap();

        let other = df!(
            "edad" => &[None, Some(1000.0)],
            "zona" => &[Some("Nueva"), None],
            "ingresos" => &[0i64, 1]
        )
        .unwrap();
        pre.transform(&other).unwrap();

        assert_eq!(serde_json::to_string(&pre).unwrap(), before);
    }

    #[test]
    fn test_missing_column_and_unfitted() {
        let df = create_test_dataframe();
        let mut pre = ColumnPreprocessor::from_frame(&df);
        assert!(matches!(pre.transform(&df), Err(CreditError::ModelNotFitted)));

        pre.fit(&df).unwrap();
        let partial = df.drop("zona").unwrap();
        assert!(matches!(
            pre.transform(&partial),
            Err(CreditError::FeatureNotFound(_))
        ));
    }
}
