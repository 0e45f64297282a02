use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::serde::{float, float_option};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AssetClass, Id};
use crate::error::ValidationError;

/// One owned position.
///
/// Amounts serialize as decimal strings so stored files keep every digit.
/// Clients get [`HoldingView`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: Id,
    #[serde(rename = "asset_type")]
    pub asset_class: AssetClass,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: Decimal,
    pub current_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Holding {
    pub fn new(
        asset_class: AssetClass,
        symbol: impl Into<String>,
        quantity: Decimal,
        current_price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let holding = Self {
            id: Id::new(),
            asset_class,
            symbol: symbol.into(),
            name: None,
            quantity,
            current_price,
            purchase_price: None,
            purchase_date: None,
            last_updated: now,
            created_at: now,
        };
        holding.validate()?;
        Ok(holding)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn total_value(&self) -> Result<Decimal, ValidationError> {
        self.quantity
            .checked_mul(self.current_price)
            .ok_or_else(|| ValidationError::ValueOutOfRange {
                symbol: self.symbol.clone(),
            })
    }

    /// Reject negative quantities and prices, and values too large to sum.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity < Decimal::ZERO {
            return Err(ValidationError::NegativeQuantity {
                symbol: self.symbol.clone(),
                quantity: self.quantity,
            });
        }
        for price in std::iter::once(self.current_price).chain(self.purchase_price) {
            if price < Decimal::ZERO {
                return Err(ValidationError::NegativePrice {
                    symbol: self.symbol.clone(),
                    price,
                });
            }
        }
        self.total_value()?;
        Ok(())
    }

    pub fn reprice(&mut self, price: Decimal, at: DateTime<Utc>) -> Result<(), ValidationError> {
        if price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice {
                symbol: self.symbol.clone(),
                price,
            });
        }
        if self.quantity.checked_mul(price).is_none() {
            return Err(ValidationError::ValueOutOfRange {
                symbol: self.symbol.clone(),
            });
        }
        self.current_price = price;
        self.last_updated = at;
        Ok(())
    }
}

/// A holding as returned to clients: amounts are JSON numbers and the
/// total value is included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingView {
    pub id: Id,
    pub asset_type: AssetClass,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(serialize_with = "float::serialize")]
    pub quantity: Decimal,
    #[serde(serialize_with = "float::serialize")]
    pub current_price: Decimal,
    #[serde(
        serialize_with = "float_option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub purchase_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(serialize_with = "float::serialize")]
    pub total_value: Decimal,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Holding> for HoldingView {
    type Error = ValidationError;

    fn try_from(holding: Holding) -> Result<Self, Self::Error> {
        let total_value = holding.total_value()?;
        Ok(Self {
            id: holding.id,
            asset_type: holding.asset_class,
            symbol: holding.symbol,
            name: holding.name,
            quantity: holding.quantity,
            current_price: holding.current_price,
            purchase_price: holding.purchase_price,
            purchase_date: holding.purchase_date,
            total_value,
            last_updated: holding.last_updated,
            created_at: holding.created_at,
        })
    }
}

/// Input for creating a holding. The current price is looked up, not supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHolding {
    pub asset_type: AssetClass,
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: Decimal,
    #[serde(default)]
    pub purchase_price: Option<Decimal>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
}

/// Partial update of a holding. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoldingPatch {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub purchase_price: Option<Decimal>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
}

impl HoldingPatch {
    pub fn is_empty(&self) -> bool {
        self.symbol.is_none()
            && self.name.is_none()
            && self.quantity.is_none()
            && self.purchase_price.is_none()
            && self.purchase_date.is_none()
    }
}
