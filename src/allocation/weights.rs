use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::AssetOverview;
use crate::error::ValidationError;
use crate::models::{Bucket, Holding};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Percentage of total portfolio value held in each bucket.
///
/// Always carries all four buckets. Weights sum to 100 (up to division
/// rounding) or, for a worthless portfolio, are all zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation(
    #[serde(serialize_with = "serialize_bucket_amounts")] BTreeMap<Bucket, Decimal>,
);

/// Serialize a per-bucket map with its amounts as JSON numbers.
pub fn serialize_bucket_amounts<S>(
    amounts: &BTreeMap<Bucket, Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    struct Number(Decimal);

    impl Serialize for Number {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            rust_decimal::serde::float::serialize(&self.0, serializer)
        }
    }

    let mut map = serializer.serialize_map(Some(amounts.len()))?;
    for (bucket, amount) in amounts {
        map.serialize_entry(bucket, &Number(*amount))?;
    }
    map.end()
}

impl Default for Allocation {
    fn default() -> Self {
        Self::zero()
    }
}

impl Allocation {
    pub fn zero() -> Self {
        Self(Bucket::ALL.into_iter().map(|b| (b, Decimal::ZERO)).collect())
    }

    /// Current allocation of a set of holdings.
    pub fn from_holdings(holdings: &[Holding]) -> Result<Self, ValidationError> {
        Ok(Self::from_overview(&AssetOverview::from_holdings(holdings)?))
    }

    pub fn from_overview(overview: &AssetOverview) -> Self {
        Self::from_bucket_values(&overview.bucket_values(), overview.total_value)
    }

    fn from_bucket_values(values: &BTreeMap<Bucket, Decimal>, total: Decimal) -> Self {
        if total <= Decimal::ZERO {
            return Self::zero();
        }
        let mut allocation = Self::zero();
        for (bucket, value) in values {
            // value <= total, so the ratio stays below one before scaling.
            allocation.0.insert(*bucket, *value / total * HUNDRED);
        }
        allocation
    }

    /// Build an allocation from already computed percentages, as received
    /// over the wire. Missing buckets count as zero.
    pub fn from_percentages<I, S>(entries: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        let mut allocation = Self::zero();
        for (name, weight) in entries {
            let bucket: Bucket = name.as_ref().parse()?;
            if weight < Decimal::ZERO {
                return Err(ValidationError::NegativeWeight {
                    bucket: bucket.to_string(),
                    weight,
                });
            }
            allocation.0.insert(bucket, weight);
        }
        Ok(allocation)
    }

    pub fn weight(&self, bucket: Bucket) -> Decimal {
        self.0.get(&bucket).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, Decimal)> + '_ {
        self.0.iter().map(|(b, w)| (*b, *w))
    }

    pub fn sum(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    pub fn is_zero(&self) -> bool {
        self.0.values().all(|w| w.is_zero())
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        for (bucket, weight) in self.iter() {
            if weight < Decimal::ZERO {
                return Err(ValidationError::NegativeWeight {
                    bucket: bucket.to_string(),
                    weight,
                });
            }
        }
        Ok(())
    }
}
