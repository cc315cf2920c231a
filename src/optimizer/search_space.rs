//! Search space definition for hyperparameters

use crate::error::{CreditError, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Type of parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Continuous float parameter
    Float {
        low: f64,
        high: f64,
        log_scale: bool,
    },
    /// Integer parameter, both bounds inclusive
    Int { low: i64, high: i64 },
    /// Categorical parameter
    Categorical { choices: Vec<String> },
}

/// A single hyperparameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

impl Parameter {
    /// Create a float parameter
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float {
                low,
                high,
                log_scale: false,
            },
        }
    }

    /// Create a log-scale float parameter
    pub fn log_float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float {
                low,
                high,
                log_scale: true,
            },
        }
    }

    /// Create an integer parameter
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Int { low, high },
        }
    }

    /// Create a categorical parameter
    pub fn categorical(name: impl Into<String>, choices: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Categorical {
                choices: choices.into_iter().map(String::from).collect(),
            },
        }
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut impl Rng) -> ParameterValue {
        match &self.param_type {
            ParameterType::Float { low, high, log_scale } => {
                let val = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                ParameterValue::Float(val)
            }
            ParameterType::Int { low, high } => ParameterValue::Int(rng.gen_range(*low..=*high)),
            ParameterType::Categorical { choices } => {
                let idx = rng.gen_range(0..choices.len());
                ParameterValue::String(choices[idx].clone())
            }
        }
    }
}

/// Sampled parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::String(s) => s.parse().ok(),
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::String(s) => s.parse().ok(),
            ParameterValue::Float(_) => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{:.6}", v),
            ParameterValue::String(v) => f.write_str(v),
        }
    }
}

/// Search space for hyperparameter optimization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    /// Create a new empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the search space
    pub fn add(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Add a float parameter
    pub fn float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::float(name, low, high))
    }

    /// Add a log-scale float parameter
    pub fn log_float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::log_float(name, low, high))
    }

    /// Add an integer parameter
    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(Parameter::int(name, low, high))
    }

    /// Add a categorical parameter
    pub fn categorical(self, name: impl Into<String>, choices: Vec<&str>) -> Self {
        self.add(Parameter::categorical(name, choices))
    }

    /// Sample a random configuration; parameters are drawn in insertion order
    pub fn sample(&self, rng: &mut impl Rng) -> TrialParams {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.sample(rng)))
            .collect()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Alias for sampled configuration
pub type TrialParams = BTreeMap<String, ParameterValue>;

/// Look up a parameter, failing with the parameter name
pub fn require<'a>(params: &'a TrialParams, name: &str) -> Result<&'a ParameterValue> {
    params.get(name).ok_or_else(|| CreditError::InvalidParameter {
        name: name.to_string(),
        value: "<missing>".to_string(),
        reason: "not present in the sampled configuration".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_search_space_builder() {
        let space = SearchSpace::new()
            .log_float("C", 1e-3, 1e2)
            .int("n_estimators", 150, 599)
            .categorical("penalty", vec!["l1", "l2", "elasticnet"]);

        assert_eq!(space.len(), 3);
    }

    #[test]
    fn test_int_bounds_inclusive() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let param = Parameter::int("min_samples_leaf", 1, 2);
        for _ in 0..50 {
            let v = param.sample(&mut rng).as_int().unwrap();
            assert!(v == 1 || v == 2);
        }
    }

    #[test]
    fn test_log_scale_sampling() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);

        let param = Parameter::log_float("C", 1e-3, 1e2);
        let samples: Vec<f64> = (0..200)
            .filter_map(|_| param.sample(&mut rng).as_float())
            .collect();

        assert!(samples.iter().all(|&v| (1e-3..=1e2).contains(&v)));
        // log-uniform: a fair share lands below 0.1
        assert!(samples.iter().filter(|&&v| v < 0.1).count() > 40);
    }

    #[test]
    fn test_same_seed_same_samples() {
        let space = SearchSpace::new()
            .float("x", 0.0, 1.0)
            .categorical("max_depth", vec!["none", "6", "10"]);
        let a = space.sample(&mut Xoshiro256PlusPlus::seed_from_u64(1));
        let b = space.sample(&mut Xoshiro256PlusPlus::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(ParameterValue::String("0.7".into()).as_float(), Some(0.7));
        assert_eq!(ParameterValue::String("none".into()).as_int(), None);
        assert_eq!(ParameterValue::Int(3).as_float(), Some(3.0));
        assert!(require(&TrialParams::new(), "C").is_err());
    }
}
