use loan_ledger_core::advice::classifier::{self, AdviceBand, AdviceInput};
use loan_ledger_core::advice::{classify, AdvicePolicy, RiskCategory};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn rate_grid() -> Vec<Decimal> {
    (0..=400).map(|i| Decimal::from(i) / dec!(4)).collect()
}

#[test]
fn test_default_policy_is_monotonic() {
    let policy = AdvicePolicy::default();
    let grid = rate_grid();
    for pair in grid.windows(2) {
        let lower = classify(pair[0], &policy);
        let higher = classify(pair[1], &policy);
        assert!(
            lower.category.rank() <= higher.category.rank(),
            "{} classified {} but {} classified {}",
            pair[0],
            lower.category,
            pair[1],
            higher.category
        );
    }
}

#[test]
fn test_every_rate_gets_advice() {
    let policy = AdvicePolicy::default();
    for rate in rate_grid().into_iter().chain([dec!(1000), dec!(1000000)]) {
        assert!(!classify(rate, &policy).advisory_text.is_empty());
    }
}

#[test]
fn test_custom_policy_bands() {
    let policy = AdvicePolicy::new(vec![
        AdviceBand {
            below: Some(dec!(8)),
            category: RiskCategory::Favorable,
            advisory_text: "cheap".into(),
        },
        AdviceBand {
            below: Some(dec!(8.5)),
            category: RiskCategory::Favorable,
            advisory_text: "still cheap".into(),
        },
        AdviceBand {
            below: None,
            category: RiskCategory::Costly,
            advisory_text: "expensive".into(),
        },
    ])
    .unwrap();

    let out = classifier::classify_rate(&AdviceInput {
        rate: dec!(8.25),
        policy: Some(policy.clone()),
    })
    .unwrap();
    assert_eq!(out.result.advisory_text, "still cheap");
    assert_eq!(classify(dec!(8.5), &policy).category, RiskCategory::Costly);
}

#[test]
fn test_negative_rate_warns() {
    let out = classifier::classify_rate(&AdviceInput {
        rate: dec!(-2),
        policy: None,
    })
    .unwrap();
    assert_eq!(out.result.category, RiskCategory::Favorable);
    assert_eq!(out.warnings.len(), 1);
}
