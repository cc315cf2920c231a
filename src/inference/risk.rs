//! Risk bands and lending recommendations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk band derived from P(default)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "VERY HIGH")]
    VeryHigh,
}

impl RiskLevel {
    /// Band for a default probability: < 0.2, < 0.5, < 0.7, otherwise very high
    pub fn from_probability(p_default: f64) -> Self {
        if p_default < 0.2 {
            RiskLevel::Low
        } else if p_default < 0.5 {
            RiskLevel::Medium
        } else if p_default < 0.7 {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::VeryHigh => "VERY HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advice for a credit officer given the predicted label and P(default)
pub fn recommendation(prediction: u8, p_default: f64) -> &'static str {
    if prediction == 0 {
        if p_default < 0.1 {
            "Low-risk client. Approve the credit without special restrictions."
        } else if p_default < 0.3 {
            "Low-medium risk client. Approve with standard conditions."
        } else {
            "Approvable client that needs attention. Consider requesting additional collateral."
        }
    } else if p_default > 0.7 {
        "High default risk. Reject the credit or require solid collateral."
    } else if p_default > 0.5 {
        "Medium-high risk. Additional evaluation and strong collateral are recommended."
    } else {
        "Moderate risk. Consider approving with reduced limits and close follow-up."
    }
}
