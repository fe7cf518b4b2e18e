//! Qualitative advice from an effective interest rate.
//!
//! The rate is placed in one of an ordered list of bands. Band edges are
//! policy, not arithmetic: [`AdvicePolicy`] deserialises from JSON or YAML and
//! is validated so that the bands always cover `[0, inf)` without overlap and
//! a higher rate can never land in a more favourable category.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::error::LoanLedgerError;
use crate::types::{with_metadata, ComputationOutput, Percent};
use crate::LoanLedgerResult;

/// Risk categories, from most to least favourable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Favorable,
    Moderate,
    Costly,
    Severe,
}

impl RiskCategory {
    /// 0 for the best category; grows with severity.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Favorable => "favorable",
            Self::Moderate => "moderate",
            Self::Costly => "costly",
            Self::Severe => "severe",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceBand {
    /// Exclusive upper edge in percent; `None` for the last, open band.
    #[serde(default)]
    pub below: Option<Percent>,
    pub category: RiskCategory,
    pub advisory_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicy")]
pub struct AdvicePolicy {
    bands: Vec<AdviceBand>,
}

#[derive(Deserialize)]
struct RawPolicy {
    bands: Vec<AdviceBand>,
}

impl TryFrom<RawPolicy> for AdvicePolicy {
    type Error = LoanLedgerError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        AdvicePolicy::new(raw.bands)
    }
}

impl AdvicePolicy {
    pub fn new(bands: Vec<AdviceBand>) -> LoanLedgerResult<Self> {
        let Some((last, rest)) = bands.split_last() else {
            return Err(LoanLedgerError::invalid("bands", "at least one band is required"));
        };
        if last.below.is_some() {
            return Err(LoanLedgerError::invalid(
                "bands",
                "the last band must be open-ended (no `below`)",
            ));
        }

        let mut floor = Decimal::ZERO;
        for (i, band) in rest.iter().enumerate() {
            let Some(edge) = band.below else {
                return Err(LoanLedgerError::invalid(
                    "bands",
                    format!("band {i} is open-ended but is not the last band"),
                ));
            };
            if edge <= floor {
                return Err(LoanLedgerError::invalid(
                    "bands",
                    format!("band {i} edge {edge} must exceed {floor}"),
                ));
            }
            floor = edge;
        }

        if bands.windows(2).any(|w| w[1].category < w[0].category) {
            return Err(LoanLedgerError::invalid(
                "bands",
                "categories must not become more favourable as the rate rises",
            ));
        }

        Ok(AdvicePolicy { bands })
    }

    pub fn bands(&self) -> &[AdviceBand] {
        &self.bands
    }

    /// Band for `rate`; negative rates are read as 0.
    pub fn band_for(&self, rate: Percent) -> &AdviceBand {
        let rate = rate.max(Decimal::ZERO);
        self.bands
            .iter()
            .find(|b| b.below.map_or(true, |edge| rate < edge))
            .unwrap_or_else(|| &self.bands[self.bands.len() - 1])
    }
}

impl Default for AdvicePolicy {
    fn default() -> Self {
        let band = |below: Option<Decimal>, category, text: &str| AdviceBand {
            below,
            category,
            advisory_text: text.to_string(),
        };
        AdvicePolicy {
            bands: vec![
                band(
                    Some(dec!(10)),
                    RiskCategory::Favorable,
                    "This loan is reasonably priced. Keep paying on schedule.",
                ),
                band(
                    Some(dec!(18)),
                    RiskCategory::Moderate,
                    "The cost of this loan is moderate. Compare offers before borrowing more and \
                     consider prepaying if you have spare cash.",
                ),
                band(
                    Some(dec!(30)),
                    RiskCategory::Costly,
                    "This loan is expensive. Prioritise paying it down and look into refinancing \
                     at a lower rate.",
                ),
                band(
                    None,
                    RiskCategory::Severe,
                    "This loan is very expensive. Check the fees you were charged and close it \
                     as early as you can.",
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanAdvice {
    pub rate: Percent,
    pub category: RiskCategory,
    pub advisory_text: String,
}

pub fn classify(rate: Percent, policy: &AdvicePolicy) -> LoanAdvice {
    let band = policy.band_for(rate);
    LoanAdvice {
        rate,
        category: band.category,
        advisory_text: band.advisory_text.clone(),
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceInput {
    /// Effective interest rate in percent.
    pub rate: Percent,
    #[serde(default)]
    pub policy: Option<AdvicePolicy>,
}

pub fn classify_rate(input: &AdviceInput) -> LoanLedgerResult<ComputationOutput<LoanAdvice>> {
    let start = Instant::now();
    let mut warnings = Vec::new();
    if input.rate < Decimal::ZERO {
        warnings.push(format!("Negative rate {} classified as 0%", input.rate));
    }

    let default_policy;
    let policy = match &input.policy {
        Some(p) => p,
        None => {
            default_policy = AdvicePolicy::default();
            &default_policy
        }
    };
    let advice = classify(input.rate, policy);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Effective-rate band classification",
        &serde_json::json!({
            "bands": policy.bands().len(),
            "custom_policy": input.policy.is_some(),
        }),
        warnings,
        elapsed,
        advice,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let policy = AdvicePolicy::default();
        assert_eq!(classify(dec!(0), &policy).category, RiskCategory::Favorable);
        assert_eq!(classify(dec!(9.99), &policy).category, RiskCategory::Favorable);
        assert_eq!(classify(dec!(10), &policy).category, RiskCategory::Moderate);
        assert_eq!(classify(dec!(24), &policy).category, RiskCategory::Costly);
        assert_eq!(classify(dec!(30), &policy).category, RiskCategory::Severe);
        assert_eq!(classify(dec!(450), &policy).category, RiskCategory::Severe);
    }

    #[test]
    fn test_default_policy_is_valid() {
        let policy = AdvicePolicy::default();
        assert_eq!(AdvicePolicy::new(policy.bands().to_vec()).unwrap(), policy);
    }

    #[test]
    fn test_negative_rate_reads_as_zero() {
        let advice = classify(dec!(-5), &AdvicePolicy::default());
        assert_eq!(advice.category, RiskCategory::Favorable);
    }

    #[test]
    fn test_policy_validation() {
        let open = |c| AdviceBand {
            below: None,
            category: c,
            advisory_text: String::new(),
        };
        let capped = |edge, c| AdviceBand {
            below: Some(edge),
            category: c,
            advisory_text: String::new(),
        };

        assert!(AdvicePolicy::new(vec![]).is_err());
        assert!(AdvicePolicy::new(vec![open(RiskCategory::Moderate)]).is_ok());
        assert!(AdvicePolicy::new(vec![capped(dec!(10), RiskCategory::Favorable)]).is_err());
        assert!(AdvicePolicy::new(vec![
            capped(dec!(10), RiskCategory::Favorable),
            capped(dec!(10), RiskCategory::Moderate),
            open(RiskCategory::Costly),
        ])
        .is_err());
        assert!(AdvicePolicy::new(vec![
            capped(dec!(10), RiskCategory::Costly),
            open(RiskCategory::Favorable),
        ])
        .is_err());
        assert!(AdvicePolicy::new(vec![
            open(RiskCategory::Favorable),
            open(RiskCategory::Costly),
        ])
        .is_err());
    }

    #[test]
    fn test_policy_from_json() {
        let policy: AdvicePolicy = serde_json::from_str(
            r#"{"bands": [
                {"below": "12", "category": "favorable", "advisory_text": "ok"},
                {"category": "costly", "advisory_text": "pay it down"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(classify(dec!(12), &policy).advisory_text, "pay it down");

        let bad: Result<AdvicePolicy, _> = serde_json::from_str(
            r#"{"bands": [{"below": 5, "category": "severe", "advisory_text": ""}]}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_envelope_uses_default_policy() {
        let out = classify_rate(&AdviceInput {
            rate: dec!(8),
            policy: None,
        })
        .unwrap();
        assert_eq!(out.result.category, RiskCategory::Favorable);
        assert!(out.warnings.is_empty());
    }
}
