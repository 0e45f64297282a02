//! Daily portfolio health report.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::serde::float;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocation::{serialize_bucket_amounts, AssetOverview};
use crate::models::Bucket;

const BASE_HEALTH_SCORE: u8 = 80;
const LOW_CASH_PENALTY: u8 = 10;
const HIGH_CASH_PENALTY: u8 = 5;

/// Below this cash share the portfolio has no cushion.
const LOW_CASH_RATIO: Decimal = Decimal::from_parts(1, 0, 0, false, 1);
/// Above this cash share the portfolio is too conservative.
const HIGH_CASH_RATIO: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub report_date: NaiveDate,
    #[serde(serialize_with = "float::serialize")]
    pub total_assets: Decimal,
    /// Money per bucket (not percentages).
    #[serde(serialize_with = "serialize_bucket_amounts")]
    pub asset_allocation: BTreeMap<Bucket, Decimal>,
    pub health_score: u8,
    pub risk_assessment: RiskLevel,
    pub recommendations: Vec<String>,
}

impl DailyReport {
    pub fn build(overview: &AssetOverview, report_date: NaiveDate) -> Self {
        let (health_score, risk_assessment) = score(overview);
        Self {
            report_date,
            total_assets: overview.total_value,
            asset_allocation: overview.bucket_values(),
            health_score,
            risk_assessment,
            recommendations: vec![
                "Review your asset allocation regularly".to_string(),
                "Keep an eye on market movements".to_string(),
            ],
        }
    }
}

fn score(overview: &AssetOverview) -> (u8, RiskLevel) {
    if overview.total_value <= Decimal::ZERO {
        return (BASE_HEALTH_SCORE, RiskLevel::Moderate);
    }
    let cash_ratio = overview.cash_value / overview.total_value;
    if cash_ratio < LOW_CASH_RATIO {
        (BASE_HEALTH_SCORE - LOW_CASH_PENALTY, RiskLevel::High)
    } else if cash_ratio > HIGH_CASH_RATIO {
        (BASE_HEALTH_SCORE - HIGH_CASH_PENALTY, RiskLevel::Low)
    } else {
        (BASE_HEALTH_SCORE, RiskLevel::Moderate)
    }
}
