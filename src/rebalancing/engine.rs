use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use super::{
    Action, Deviation, DeviationStatus, RebalanceConfig, RebalancingResult, Suggestion,
    TargetAllocation, TargetPolicy, PERMANENT_PORTFOLIO,
};
use crate::allocation::{Allocation, AssetOverview};
use crate::error::ValidationError;
use crate::models::Holding;

/// Compare every target bucket against the current allocation, in bucket order.
pub fn deviations(
    current: &Allocation,
    target: &TargetAllocation,
    config: &RebalanceConfig,
) -> Vec<Deviation> {
    target
        .iter()
        .map(|(bucket, target_weight)| {
            let current_weight = current.weight(bucket);
            let deviation = current_weight - target_weight;
            let status = if !config.exceeds(deviation) {
                DeviationStatus::WithinTolerance
            } else if deviation > Decimal::ZERO {
                DeviationStatus::Overweight
            } else {
                DeviationStatus::Underweight
            };
            Deviation {
                bucket,
                current: current_weight,
                target: target_weight,
                deviation,
                status,
            }
        })
        .collect()
}

/// Replace a missing or non-finite statistic with zero.
fn sanitize_expected_return(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn reason(deviation: &Deviation) -> String {
    let direction = match deviation.status {
        DeviationStatus::Overweight => "overweight",
        _ => "underweight",
    };
    format!(
        "{} is {:.1}% of the portfolio vs a {}% target, {} by {:.1} points",
        deviation.bucket,
        deviation.current,
        deviation.target.normalize(),
        direction,
        deviation.deviation.abs(),
    )
}

/// Compute buy/sell suggestions that bring each out-of-tolerance bucket back
/// to its target weight.
///
/// Each suggestion is a per-bucket correction sized `|deviation| / 100 *
/// total_value`. A worthless portfolio (or one with no allocation at all)
/// yields no suggestions rather than an error.
pub fn suggest(
    current: &Allocation,
    target: &TargetAllocation,
    total_value: Decimal,
    config: &RebalanceConfig,
    expected_return: Option<f64>,
) -> Result<RebalancingResult, ValidationError> {
    if total_value < Decimal::ZERO {
        return Err(ValidationError::NegativeTotalValue(total_value));
    }
    config.validate()?;
    current.validate()?;
    target.validate()?;

    let expected_return = sanitize_expected_return(expected_return);

    if total_value.is_zero() || current.is_zero() {
        debug!(total_value = %total_value, "nothing to rebalance");
        return Ok(RebalancingResult {
            current_allocation: current.clone(),
            target_allocation: target.clone(),
            suggestions: Vec::new(),
            expected_return,
        });
    }

    let mut suggestions = Vec::new();
    for deviation in deviations(current, target, config) {
        let action = match deviation.status {
            DeviationStatus::Overweight => Action::Sell,
            DeviationStatus::Underweight => Action::Buy,
            DeviationStatus::WithinTolerance => continue,
        };
        let amount = (deviation.deviation.abs() / Decimal::ONE_HUNDRED)
            .checked_mul(total_value)
            .ok_or(ValidationError::TotalOutOfRange)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        suggestions.push(Suggestion {
            action,
            asset_type: deviation.bucket,
            amount,
            reason: reason(&deviation),
        });
    }

    debug!(
        total_value = %total_value,
        suggestion_count = suggestions.len(),
        "computed rebalancing suggestions"
    );

    Ok(RebalancingResult {
        current_allocation: current.clone(),
        target_allocation: target.clone(),
        suggestions,
        expected_return,
    })
}

/// Suggestion engine bound to a target policy and its tuning.
#[derive(Clone)]
pub struct RebalanceEngine {
    policy: Arc<dyn TargetPolicy>,
    config: RebalanceConfig,
}

impl Default for RebalanceEngine {
    fn default() -> Self {
        Self::new(Arc::new(PERMANENT_PORTFOLIO), RebalanceConfig::default())
    }
}

impl RebalanceEngine {
    pub fn new(policy: Arc<dyn TargetPolicy>, config: RebalanceConfig) -> Self {
        Self { policy, config }
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn config(&self) -> &RebalanceConfig {
        &self.config
    }

    pub fn suggest(
        &self,
        current: &Allocation,
        total_value: Decimal,
        expected_return: Option<f64>,
    ) -> Result<RebalancingResult, ValidationError> {
        suggest(
            current,
            &self.policy.target(),
            total_value,
            &self.config,
            expected_return,
        )
    }

    pub fn evaluate_overview(
        &self,
        overview: &AssetOverview,
        expected_return: Option<f64>,
    ) -> Result<RebalancingResult, ValidationError> {
        let current = Allocation::from_overview(overview);
        self.suggest(&current, overview.total_value, expected_return)
    }

    /// Validate holdings, derive their allocation and suggest trades.
    pub fn evaluate(
        &self,
        holdings: &[Holding],
        expected_return: Option<f64>,
    ) -> Result<RebalancingResult, ValidationError> {
        let overview = AssetOverview::from_holdings(holdings)?;
        self.evaluate_overview(&overview, expected_return)
    }
}

/// Convert a collaborator-supplied float into a decimal, treating NaN and
/// infinities as missing.
pub fn decimal_from_upstream(value: Option<f64>) -> Option<Decimal> {
    value.filter(|v| v.is_finite()).and_then(Decimal::from_f64)
}
