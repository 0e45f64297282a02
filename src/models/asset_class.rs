use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Category a holding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Cash,
    Stock,
    Fund,
    Bond,
    Gold,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Cash,
        AssetClass::Stock,
        AssetClass::Fund,
        AssetClass::Bond,
        AssetClass::Gold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Cash => "cash",
            AssetClass::Stock => "stock",
            AssetClass::Fund => "fund",
            AssetClass::Bond => "bond",
            AssetClass::Gold => "gold",
        }
    }

    /// Allocation bucket this class is counted in. Stocks and funds share
    /// the growth bucket.
    pub fn bucket(&self) -> Bucket {
        match self {
            AssetClass::Cash => Bucket::Cash,
            AssetClass::Stock | AssetClass::Fund => Bucket::Growth,
            AssetClass::Bond => Bucket::Bond,
            AssetClass::Gold => Bucket::Gold,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        AssetClass::ALL
            .into_iter()
            .find(|class| class.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownAssetClass(s.to_string()))
    }
}

/// Key of an allocation or target allocation.
///
/// Variant order is the order suggestions are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Cash,
    Growth,
    Bond,
    Gold,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [Bucket::Cash, Bucket::Growth, Bucket::Bond, Bucket::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Cash => "cash",
            Bucket::Growth => "growth",
            Bucket::Bond => "bond",
            Bucket::Gold => "gold",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Bucket::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownBucket(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_and_fund_fold_into_growth() {
        assert_eq!(AssetClass::Stock.bucket(), Bucket::Growth);
        assert_eq!(AssetClass::Fund.bucket(), Bucket::Growth);
        assert_eq!(AssetClass::Cash.bucket(), Bucket::Cash);
        assert_eq!(AssetClass::Gold.bucket(), Bucket::Gold);
    }

    #[test]
    fn test_parse_asset_class_is_case_insensitive() {
        assert_eq!("Fund".parse::<AssetClass>().unwrap(), AssetClass::Fund);
        assert_eq!(" gold ".parse::<AssetClass>().unwrap(), AssetClass::Gold);
    }

    #[test]
    fn test_parse_rejects_classes_outside_the_fixed_set() {
        let err = "crypto".parse::<AssetClass>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownAssetClass("crypto".to_string()));

        // "growth" is a bucket, not something a holding can be.
        assert!("growth".parse::<AssetClass>().is_err());
        assert_eq!("growth".parse::<Bucket>().unwrap(), Bucket::Growth);
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&AssetClass::Bond).unwrap();
        assert_eq!(json, r#""bond""#);
        let bucket: Bucket = serde_json::from_str(r#""growth""#).unwrap();
        assert_eq!(bucket, Bucket::Growth);
        assert!(serde_json::from_str::<AssetClass>(r#""crypto""#).is_err());
    }

    #[test]
    fn test_bucket_order_is_declaration_order() {
        let mut buckets = vec![Bucket::Gold, Bucket::Cash, Bucket::Bond, Bucket::Growth];
        buckets.sort();
        assert_eq!(buckets, Bucket::ALL.to_vec());
    }
}
