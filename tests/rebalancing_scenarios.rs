use anyhow::Result;
use chrono::Utc;
use permafolio::allocation::Allocation;
use permafolio::error::ValidationError;
use permafolio::models::{AssetClass, Bucket, Holding};
use permafolio::rebalancing::{
    suggest, Action, RebalanceConfig, RebalanceEngine, TargetAllocation,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn holding(class: AssetClass, symbol: &str, value: Decimal) -> Holding {
    Holding::new(class, symbol, value, Decimal::ONE, Utc::now()).unwrap()
}

fn allocation(cash: Decimal, growth: Decimal, bond: Decimal, gold: Decimal) -> Allocation {
    Allocation::from_percentages([
        ("cash", cash),
        ("growth", growth),
        ("bond", bond),
        ("gold", gold),
    ])
    .unwrap()
}

#[test]
fn zero_value_portfolio_has_no_suggestions() -> Result<()> {
    let holdings = vec![
        holding(AssetClass::Cash, "CNY", Decimal::ZERO),
        holding(AssetClass::Gold, "AU9999", Decimal::ZERO),
    ];
    let result = RebalanceEngine::default().evaluate(&holdings, Some(0.06))?;

    assert!(result.suggestions.is_empty());
    assert!(result.current_allocation.is_zero());
    assert_eq!(result.target_allocation, TargetAllocation::equal_weight());

    let empty = RebalanceEngine::default().evaluate(&[], None)?;
    assert!(empty.suggestions.is_empty());
    assert_eq!(empty.expected_return, 0.0);
    Ok(())
}

#[test]
fn skewed_portfolio_gets_three_corrections() -> Result<()> {
    let holdings = vec![
        holding(AssetClass::Cash, "CNY", dec!(50000)),
        holding(AssetClass::Stock, "600519", dec!(15000)),
        holding(AssetClass::Fund, "005875", dec!(10000)),
        holding(AssetClass::Bond, "019547", dec!(15000)),
        holding(AssetClass::Gold, "AU9999", dec!(10000)),
    ];
    let result = RebalanceEngine::default().evaluate(&holdings, Some(0.06))?;

    assert_eq!(result.current_allocation.weight(Bucket::Growth), dec!(25));
    let summary: Vec<_> = result
        .suggestions
        .iter()
        .map(|s| (s.action, s.asset_type, s.amount))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Action::Sell, Bucket::Cash, dec!(25000)),
            (Action::Buy, Bucket::Bond, dec!(10000)),
            (Action::Buy, Bucket::Gold, dec!(15000)),
        ]
    );
    assert_eq!(result.expected_return, 0.06);
    Ok(())
}

#[test]
fn portfolio_on_target_needs_nothing() -> Result<()> {
    let holdings = vec![
        holding(AssetClass::Cash, "CNY", dec!(2500)),
        holding(AssetClass::Stock, "600519", dec!(2500)),
        holding(AssetClass::Bond, "019547", dec!(2500)),
        holding(AssetClass::Gold, "AU9999", dec!(2500)),
    ];
    let result = RebalanceEngine::default().evaluate(&holdings, None)?;
    assert!(result.is_balanced());
    for bucket in Bucket::ALL {
        assert_eq!(result.current_allocation.weight(bucket), dec!(25));
    }
    Ok(())
}

#[test]
fn negative_quantity_is_a_validation_error() {
    let mut bad = holding(AssetClass::Stock, "600519", dec!(10));
    bad.quantity = dec!(-10);

    let err = RebalanceEngine::default()
        .evaluate(&[holding(AssetClass::Cash, "CNY", dec!(100)), bad], None)
        .unwrap_err();
    assert!(matches!(err, ValidationError::NegativeQuantity { .. }));
}

#[test]
fn threshold_boundary_is_exclusive_by_default() -> Result<()> {
    let target = TargetAllocation::equal_weight();
    let exactly_five = allocation(dec!(30), dec!(20), dec!(25), dec!(25));
    let just_over = allocation(dec!(30.01), dec!(19.99), dec!(25), dec!(25));

    let exclusive = RebalanceConfig::default();
    assert!(suggest(&exactly_five, &target, dec!(1000), &exclusive, None)?
        .suggestions
        .is_empty());
    assert_eq!(
        suggest(&just_over, &target, dec!(1000), &exclusive, None)?
            .suggestions
            .len(),
        2
    );

    let inclusive = RebalanceConfig::default().inclusive();
    let result = suggest(&exactly_five, &target, dec!(1000), &inclusive, None)?;
    assert_eq!(result.suggestions.len(), 2);
    assert_eq!(result.suggestions[0].amount, dec!(50));
    Ok(())
}

#[test]
fn small_drift_within_threshold_is_ignored() -> Result<()> {
    let current = allocation(dec!(28), dec!(22), dec!(26), dec!(24));
    let result = suggest(
        &current,
        &TargetAllocation::equal_weight(),
        dec!(100000),
        &RebalanceConfig::default(),
        Some(0.06),
    )?;
    assert!(result.suggestions.is_empty());

    let tight = RebalanceConfig::default().with_threshold(dec!(2));
    let result = suggest(
        &current,
        &TargetAllocation::equal_weight(),
        dec!(100000),
        &tight,
        Some(0.06),
    )?;
    assert_eq!(result.suggestions.len(), 2);
    Ok(())
}

#[test]
fn evaluation_is_idempotent() -> Result<()> {
    let holdings = vec![
        holding(AssetClass::Cash, "CNY", dec!(1)),
        holding(AssetClass::Fund, "005875", dec!(2)),
        holding(AssetClass::Gold, "AU9999", dec!(7)),
    ];
    let engine = RebalanceEngine::default();
    let first = engine.evaluate(&holdings, Some(f64::NAN))?;
    let second = engine.evaluate(&holdings, Some(f64::NAN))?;
    assert_eq!(first, second);
    assert_eq!(first.expected_return, 0.0);
    Ok(())
}

#[test]
fn allocation_sums_to_one_hundred() -> Result<()> {
    let holdings = vec![
        holding(AssetClass::Cash, "CNY", dec!(1)),
        holding(AssetClass::Stock, "600519", dec!(1)),
        holding(AssetClass::Gold, "AU9999", dec!(1)),
    ];
    let allocation = Allocation::from_holdings(&holdings)?;
    let sum = allocation.sum();
    assert!(sum >= dec!(99.99) && sum <= dec!(100.01), "sum was {sum}");
    Ok(())
}

#[test]
fn custom_target_changes_suggestions() -> Result<()> {
    let target = TargetAllocation::from_named([
        ("cash", dec!(10)),
        ("growth", dec!(50)),
        ("bond", dec!(30)),
        ("gold", dec!(10)),
    ])?;
    let current = allocation(dec!(25), dec!(25), dec!(25), dec!(25));
    let result = suggest(
        &current,
        &target,
        dec!(2000),
        &RebalanceConfig::default(),
        None,
    )?;

    let summary: Vec<_> = result
        .suggestions
        .iter()
        .map(|s| (s.action, s.asset_type, s.amount))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Action::Sell, Bucket::Cash, dec!(300)),
            (Action::Buy, Bucket::Growth, dec!(500)),
            (Action::Sell, Bucket::Gold, dec!(300)),
        ]
    );
    Ok(())
}
