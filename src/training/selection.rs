//! Composite ranking of candidates and base-vs-optimized comparison

use super::evaluation::{MetricsCache, Partition};
use crate::error::{CreditError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

const W_TEST_F1: f64 = 0.40;
const W_TEST_AUC: f64 = 0.30;
const W_TEST_RECALL: f64 = 0.20;
const W_STABILITY: f64 = 0.10;

/// `0.4·F1 + 0.3·AUC + 0.2·recall` on test, plus `0.1·(1 − |F1_val − F1_test|)`
pub fn composite_score(val_f1: f64, test_f1: f64, test_auc: f64, test_recall: f64) -> f64 {
    W_TEST_F1 * test_f1
        + W_TEST_AUC * test_auc
        + W_TEST_RECALL * test_recall
        + W_STABILITY * (1.0 - (val_f1 - test_f1).abs())
}

/// One row of the final ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedModel {
    pub model: String,
    pub composite_score: f64,
    pub val_f1: f64,
    pub test_f1: f64,
    pub test_roc_auc: f64,
    pub test_recall: f64,
    pub test_specificity: f64,
    /// |F1_val − F1_test|
    pub generalization_gap: f64,
}

/// Rank `models` by composite score, descending. Equal scores keep the
/// order of `models`.
pub fn rank_models(cache: &MetricsCache, models: &[&str]) -> Result<Vec<RankedModel>> {
    if models.is_empty() {
        return Err(CreditError::MissingMetrics(
            "no candidates to rank".to_string(),
        ));
    }

    let mut ranking = models
        .iter()
        .map(|&model| {
            let val = cache.require(Partition::Validation, model)?;
            let test = cache.require(Partition::Test, model)?;
            Ok(RankedModel {
                model: model.to_string(),
                composite_score: composite_score(val.f1, test.f1, test.roc_auc, test.recall),
                val_f1: val.f1,
                test_f1: test.f1,
                test_roc_auc: test.roc_auc,
                test_recall: test.recall,
                test_specificity: test.specificity,
                generalization_gap: (val.f1 - test.f1).abs(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    ranking.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));

    if let Some(top) = ranking.first() {
        info!(
            model = %top.model,
            score = top.composite_score,
            candidates = ranking.len(),
            "Composite ranking computed"
        );
    }
    Ok(ranking)
}

/// Label of the candidate with the best validation F1 (first wins on ties)
pub fn best_by_validation_f1<'a>(cache: &MetricsCache, models: &[&'a str]) -> Result<&'a str> {
    let mut best: Option<(&'a str, f64)> = None;
    for &model in models {
        let f1 = cache.require(Partition::Validation, model)?.f1;
        if best.map_or(true, |(_, b)| f1 > b) {
            best = Some((model, f1));
        }
    }
    best.map(|(m, _)| m)
        .ok_or_else(|| CreditError::MissingMetrics("no validation metrics".to_string()))
}

/// Test-set deltas between a base candidate and its optimized version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub base_model: String,
    pub optimized_model: String,
    pub test_base_f1: f64,
    pub test_opt_f1: f64,
    pub delta_f1: f64,
    pub test_base_recall: f64,
    pub test_opt_recall: f64,
    pub delta_recall: f64,
    pub test_base_specificity: f64,
    pub test_opt_specificity: f64,
    pub delta_specificity: f64,
    pub justification: Vec<String>,
}

pub fn compare_base_optimized(
    cache: &MetricsCache,
    base: &str,
    optimized: &str,
) -> Result<ModelComparison> {
    let b = cache.require(Partition::Test, base)?;
    let o = cache.require(Partition::Test, optimized)?;

    let delta_f1 = o.f1 - b.f1;
    let delta_recall = o.recall - b.recall;
    let delta_specificity = o.specificity - b.specificity;

    let mut justification = Vec::with_capacity(4);
    justification.push(if delta_f1 >= 0.0 {
        format!("'{}' improves test F1 (delta {:+.4})", optimized, delta_f1)
    } else {
        format!("'{}' keeps a competitive test F1 (delta {:+.4})", optimized, delta_f1)
    });
    justification.push(if delta_recall >= 0.0 {
        format!("recall on defaulters increases (delta {:+.4})", delta_recall)
    } else {
        format!(
            "recall on defaulters drops slightly (delta {:+.4}), weighed against specificity",
            delta_recall
        )
    });
    justification.push(if delta_specificity >= 0.0 {
        format!(
            "specificity is kept or improved (delta {:+.4}), avoiding unfair rejections",
            delta_specificity
        )
    } else {
        format!(
            "specificity drops slightly (delta {:+.4}), accepted for better detection",
            delta_specificity
        )
    });

    for line in &justification {
        info!(base, optimized, "{}", line);
    }

    Ok(ModelComparison {
        base_model: base.to_string(),
        optimized_model: optimized.to_string(),
        test_base_f1: b.f1,
        test_opt_f1: o.f1,
        delta_f1,
        test_base_recall: b.recall,
        test_opt_recall: o.recall,
        delta_recall,
        test_base_specificity: b.specificity,
        test_opt_specificity: o.specificity,
        delta_specificity,
        justification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::evaluation::ModelEvaluation;
    use crate::training::metrics::{ClassificationMetrics, ConfusionCounts};

    fn eval(model: &str, f1: f64, auc: f64, recall: f64, specificity: f64) -> ModelEvaluation {
        ModelEvaluation {
            model: model.to_string(),
            metrics: ClassificationMetrics {
                accuracy: 0.8,
                precision: 0.7,
                recall,
                specificity,
                f1,
                roc_auc: auc,
                confusion: ConfusionCounts::default(),
            },
        }
    }

    #[test]
    fn test_composite_score_weights() {
        let score = composite_score(0.8, 0.7, 0.9, 0.6);
        assert!((score - (0.28 + 0.27 + 0.12 + 0.09)).abs() < 1e-12);
    }

    #[test]
    fn test_composite_score_monotonicity() {
        let base = composite_score(0.7, 0.7, 0.8, 0.6);
        // the stability term can never outweigh a test F1 gain
        assert!(composite_score(0.7, 0.75, 0.8, 0.6) > base);
        assert!(composite_score(0.7, 0.7, 0.85, 0.6) > base);
        assert!(composite_score(0.7, 0.7, 0.8, 0.65) > base);
        assert!(composite_score(0.8, 0.7, 0.8, 0.6) < base);
    }

    #[test]
    fn test_ranking_is_stable_and_requires_metrics() {
        let mut cache = MetricsCache::new();
        cache.insert(
            Partition::Validation,
            vec![eval("a", 0.7, 0.8, 0.6, 0.9), eval("b", 0.7, 0.8, 0.6, 0.9), eval("c", 0.9, 0.9, 0.9, 0.9)],
        );
        cache.insert(
            Partition::Test,
            vec![eval("a", 0.7, 0.8, 0.6, 0.9), eval("b", 0.7, 0.8, 0.6, 0.9), eval("c", 0.9, 0.9, 0.9, 0.9)],
        );

        let ranking = rank_models(&cache, &["b", "a", "c"]).unwrap();
        let order: Vec<&str> = ranking.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);

        assert!(matches!(
            rank_models(&cache, &["a", "missing"]),
            Err(CreditError::MissingMetrics(_))
        ));
    }

    #[test]
    fn test_best_by_validation_first_wins() {
        let mut cache = MetricsCache::new();
        cache.insert(
            Partition::Validation,
            vec![eval("rf", 0.8, 0.8, 0.8, 0.8), eval("lr", 0.8, 0.8, 0.8, 0.8)],
        );
        assert_eq!(best_by_validation_f1(&cache, &["lr", "rf"]).unwrap(), "lr");
    }

    #[test]
    fn test_comparison_deltas() {
        let mut cache = MetricsCache::new();
        cache.insert(
            Partition::Test,
            vec![eval("base", 0.70, 0.8, 0.60, 0.90), eval("opt", 0.75, 0.8, 0.70, 0.85)],
        );
        let cmp = compare_base_optimized(&cache, "base", "opt").unwrap();
        assert!((cmp.delta_f1 - 0.05).abs() < 1e-12);
        assert!((cmp.delta_recall - 0.10).abs() < 1e-12);
        assert!((cmp.delta_specificity + 0.05).abs() < 1e-12);
        assert_eq!(cmp.justification.len(), 3);
        assert!(cmp.justification[2].contains("drops"));
    }
}
