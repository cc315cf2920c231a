//! Integration test: preprocessing fitted on training rows only

mod common;

use morosidad::preprocessing::{detect_column_types, ColumnPreprocessor};
use morosidad::training::DataSplit;
use morosidad::utils::split_features_target;
use polars::prelude::*;

#[test]
fn test_column_groups_of_credit_dataset() {
    let df = common::credit_dataset(50, 1);
    let (features, _) = split_features_target(&df, "moroso").unwrap();
    let groups = detect_column_types(&features);

    assert_eq!(groups.numeric.len(), 12);
    assert_eq!(
        groups.categorical,
        vec!["genero", "zona", "tipo_empleo", "destino_credito", "tipo_garantia"]
    );
    assert!(groups.passthrough.is_empty());
}

#[test]
fn test_statistics_ignore_holdout_rows() {
    let df = common::credit_dataset(300, 2);
    let (features, y) = split_features_target(&df, "moroso").unwrap();
    let split = DataSplit::new(&features, &y, 0.30, 0.50, 42).unwrap();

    let mut fitted = ColumnPreprocessor::from_frame(&split.x_train);
    fitted.fit(&split.x_train).unwrap();
    let before = fitted.clone();

    // corrupt the holdout heavily; the fitted statistics must not move
    let mut wild_val = split.x_val.clone();
    let n = wild_val.height();
    wild_val
        .with_column(Series::new("ingresos".into(), vec![1.0e9; n]))
        .unwrap();
    let out = fitted.transform(&wild_val).unwrap();

    assert_eq!(out.nrows(), n);
    assert_eq!(
        fitted.scaler().stats("ingresos"),
        before.scaler().stats("ingresos")
    );
    assert_eq!(fitted.feature_names(), before.feature_names());

    let train_mean = split.x_train.column("ingresos").unwrap().f64().unwrap().mean().unwrap();
    let (center, _) = fitted.scaler().stats("ingresos").unwrap();
    assert!((center - train_mean).abs() < 1e-6);
}

#[test]
fn test_unseen_category_encodes_as_zeros() {
    let train = df!(
        "score_crediticio" => &[600.0, 700.0, 650.0, 720.0],
        "zona" => &["Urbana", "Rural", "Urbana", "Rural"]
    )
    .unwrap();
    let mut pre = ColumnPreprocessor::from_frame(&train);
    pre.fit(&train).unwrap();

    let names = pre.feature_names().to_vec();
    let unseen = df!("score_crediticio" => &[650.0], "zona" => &["Periurbana"]).unwrap();
    let row = pre.transform(&unseen).unwrap();

    for (j, name) in names.iter().enumerate() {
        if name.starts_with("zona") {
            assert_eq!(row[[0, j]], 0.0, "{} should be 0", name);
        }
    }
}

#[test]
fn test_missing_values_are_imputed_from_training_rows() {
    let train = df!(
        "ingresos" => &[Some(1000.0), Some(3000.0), None, Some(2000.0)],
        "zona" => &[Some("Urbana"), None, Some("Urbana"), Some("Rural")]
    )
    .unwrap();
    let mut pre = ColumnPreprocessor::from_frame(&train);
    let matrix = pre.fit_transform(&train).unwrap();

    assert!(matrix.iter().all(|v| v.is_finite()));
    assert_eq!(pre.numeric_imputer().numeric_fill("ingresos"), Some(2000.0));
    assert_eq!(pre.categorical_imputer().categorical_fill("zona"), Some("Urbana"));
}
