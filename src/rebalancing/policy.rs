use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocation::serialize_bucket_amounts;
use crate::error::ValidationError;
use crate::models::Bucket;

/// Tolerance, in percentage points, for a target allocation summing to 100.
const TARGET_SUM_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Target weight for every bucket, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetAllocation(
    #[serde(serialize_with = "serialize_bucket_amounts")] BTreeMap<Bucket, Decimal>,
);

impl TargetAllocation {
    /// Build a target, requiring every bucket, non-negative weights and a
    /// total of 100.
    pub fn new<I>(entries: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (Bucket, Decimal)>,
    {
        let target = Self(entries.into_iter().collect());
        target.validate()?;
        Ok(target)
    }

    /// Parse a target keyed by bucket name, e.g. from a config table.
    pub fn from_named<I, S>(entries: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        let parsed = entries
            .into_iter()
            .map(|(name, weight)| Ok((name.as_ref().parse::<Bucket>()?, weight)))
            .collect::<Result<Vec<_>, ValidationError>>()?;
        Self::new(parsed)
    }

    /// 25% in each of the four buckets.
    pub fn equal_weight() -> Self {
        Self(
            Bucket::ALL
                .into_iter()
                .map(|b| (b, Decimal::from(25)))
                .collect(),
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for bucket in Bucket::ALL {
            let weight = self
                .0
                .get(&bucket)
                .ok_or_else(|| ValidationError::TargetBucketMismatch(bucket.to_string()))?;
            if *weight < Decimal::ZERO {
                return Err(ValidationError::NegativeWeight {
                    bucket: bucket.to_string(),
                    weight: *weight,
                });
            }
        }
        let sum: Decimal = self.0.values().copied().sum();
        if (sum - Decimal::ONE_HUNDRED).abs() > TARGET_SUM_TOLERANCE {
            return Err(ValidationError::TargetNotNormalized(sum));
        }
        Ok(())
    }

    pub fn weight(&self, bucket: Bucket) -> Decimal {
        self.0.get(&bucket).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, Decimal)> + '_ {
        self.0.iter().map(|(b, w)| (*b, *w))
    }
}

/// Strategy producing the allocation a portfolio is steered towards.
pub trait TargetPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn target(&self) -> TargetAllocation;
}

/// Harry Browne's permanent portfolio: equal parts cash, growth, bonds and gold.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermanentPortfolio;

pub const PERMANENT_PORTFOLIO: PermanentPortfolio = PermanentPortfolio;

impl TargetPolicy for PermanentPortfolio {
    fn name(&self) -> &str {
        "permanent_portfolio"
    }

    fn target(&self) -> TargetAllocation {
        TargetAllocation::equal_weight()
    }
}

/// A fixed, user-supplied target.
#[derive(Debug, Clone)]
pub struct CustomPolicy {
    name: String,
    target: TargetAllocation,
}

impl CustomPolicy {
    pub fn new(name: impl Into<String>, target: TargetAllocation) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

impl TargetPolicy for CustomPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> TargetAllocation {
        self.target.clone()
    }
}
