use rust_decimal::Decimal;

/// Input rejected before any allocation or deviation math runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown asset class {0:?}: expected one of cash, stock, fund, bond, gold")]
    UnknownAssetClass(String),

    #[error("Unknown allocation bucket {0:?}: expected one of cash, growth, bond, gold")]
    UnknownBucket(String),

    #[error("Holding {symbol:?} has negative quantity {quantity}")]
    NegativeQuantity { symbol: String, quantity: Decimal },

    #[error("Holding {symbol:?} has negative price {price}")]
    NegativePrice { symbol: String, price: Decimal },

    #[error("Holding {symbol:?} is worth more than can be represented")]
    ValueOutOfRange { symbol: String },

    #[error("Portfolio amounts exceed the representable decimal range")]
    TotalOutOfRange,

    #[error("Allocation weight for {bucket} is negative ({weight})")]
    NegativeWeight { bucket: String, weight: Decimal },

    #[error("Total portfolio value is negative ({0})")]
    NegativeTotalValue(Decimal),

    #[error("Rebalancing threshold is negative ({0})")]
    NegativeThreshold(Decimal),

    #[error("Target allocation is missing bucket {0}")]
    TargetBucketMismatch(String),

    #[error("Target allocation sums to {0}, expected 100")]
    TargetNotNormalized(Decimal),

    #[error(
        "Invalid id {0:?}: ids must be a single path segment (no '/', '\\\\', NUL, '.' or '..')"
    )]
    InvalidId(String),
}
