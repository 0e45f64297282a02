use rust_decimal::serde::float;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TargetAllocation;
use crate::allocation::Allocation;
use crate::error::ValidationError;
use crate::models::Bucket;

fn default_threshold() -> Decimal {
    Decimal::from(5)
}

/// Tuning for the suggestion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Tolerance in percentage points. A bucket whose deviation stays within
    /// it gets no suggestion.
    #[serde(default = "default_threshold", serialize_with = "float::serialize")]
    pub threshold: Decimal,

    /// When true, a deviation exactly equal to the threshold triggers a
    /// suggestion. By default it does not.
    pub inclusive_boundary: bool,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            inclusive_boundary: false,
        }
    }
}

impl RebalanceConfig {
    pub fn with_threshold(mut self, threshold: Decimal) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn inclusive(mut self) -> Self {
        self.inclusive_boundary = true;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.threshold < Decimal::ZERO {
            return Err(ValidationError::NegativeThreshold(self.threshold));
        }
        Ok(())
    }

    /// Whether a deviation (in percentage points, either sign) warrants action.
    pub fn exceeds(&self, deviation: Decimal) -> bool {
        let magnitude = deviation.abs();
        if magnitude.is_zero() {
            return false;
        }
        if self.inclusive_boundary {
            magnitude >= self.threshold
        } else {
            magnitude > self.threshold
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Buy,
    Sell,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => f.write_str("buy"),
            Action::Sell => f.write_str("sell"),
        }
    }
}

/// Where one bucket stands relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationStatus {
    Overweight,
    Underweight,
    WithinTolerance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    pub bucket: Bucket,
    #[serde(serialize_with = "float::serialize")]
    pub current: Decimal,
    #[serde(serialize_with = "float::serialize")]
    pub target: Decimal,
    /// `current - target`, in percentage points.
    #[serde(serialize_with = "float::serialize")]
    pub deviation: Decimal,
    pub status: DeviationStatus,
}

/// One recommended trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub action: Action,
    pub asset_type: Bucket,
    /// Base currency, rounded to cents.
    #[serde(serialize_with = "float::serialize")]
    pub amount: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingResult {
    pub current_allocation: Allocation,
    pub target_allocation: TargetAllocation,
    pub suggestions: Vec<Suggestion>,
    pub expected_return: f64,
}

impl RebalancingResult {
    pub fn is_balanced(&self) -> bool {
        self.suggestions.is_empty()
    }
}
