use std::collections::BTreeMap;

use rust_decimal::serde::float;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{AssetClass, Bucket, Holding};

/// Money held per asset class. Stocks and funds are reported separately here;
/// they are only folded together once converted to buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetOverview {
    #[serde(serialize_with = "float::serialize")]
    pub total_value: Decimal,
    #[serde(serialize_with = "float::serialize")]
    pub cash_value: Decimal,
    #[serde(serialize_with = "float::serialize")]
    pub stock_value: Decimal,
    #[serde(serialize_with = "float::serialize")]
    pub fund_value: Decimal,
    #[serde(serialize_with = "float::serialize")]
    pub bond_value: Decimal,
    #[serde(serialize_with = "float::serialize")]
    pub gold_value: Decimal,
    /// Day-over-day change. No price history is kept, so this is always zero.
    #[serde(serialize_with = "float::serialize")]
    pub daily_change: Decimal,
}

impl AssetOverview {
    /// Sum holding values per asset class.
    ///
    /// Every holding is validated first; a single bad holding rejects the
    /// whole set so no partial overview is produced.
    pub fn from_holdings(holdings: &[Holding]) -> Result<Self, ValidationError> {
        for holding in holdings {
            holding.validate()?;
        }

        let mut overview = Self::default();
        for holding in holdings {
            let value = holding.total_value()?;
            overview.total_value = overview
                .total_value
                .checked_add(value)
                .ok_or(ValidationError::TotalOutOfRange)?;
            // Class sums never exceed the total, so they cannot overflow.
            *overview.class_value_mut(holding.asset_class) += value;
        }
        Ok(overview)
    }

    pub fn class_value(&self, class: AssetClass) -> Decimal {
        match class {
            AssetClass::Cash => self.cash_value,
            AssetClass::Stock => self.stock_value,
            AssetClass::Fund => self.fund_value,
            AssetClass::Bond => self.bond_value,
            AssetClass::Gold => self.gold_value,
        }
    }

    fn class_value_mut(&mut self, class: AssetClass) -> &mut Decimal {
        match class {
            AssetClass::Cash => &mut self.cash_value,
            AssetClass::Stock => &mut self.stock_value,
            AssetClass::Fund => &mut self.fund_value,
            AssetClass::Bond => &mut self.bond_value,
            AssetClass::Gold => &mut self.gold_value,
        }
    }

    /// Money per allocation bucket, with every bucket present.
    pub fn bucket_values(&self) -> BTreeMap<Bucket, Decimal> {
        let mut values: BTreeMap<Bucket, Decimal> =
            Bucket::ALL.into_iter().map(|b| (b, Decimal::ZERO)).collect();
        for class in AssetClass::ALL {
            *values.entry(class.bucket()).or_default() += self.class_value(class);
        }
        values
    }
}
