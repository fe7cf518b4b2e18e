//! Loan terms as entered by the user.
//!
//! [`LoanTermsInput`] is the flat form-shaped payload (camelCase, every
//! loan-type field optional). [`LoanTerms`] is what the engine works on: the
//! loan-type specific amounts live inside [`LoanKind`], so a personal loan can
//! never carry a product amount and vice versa.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::YearMonth;
use crate::error::LoanLedgerError;
use crate::schedule::generator::validate_due_day;
use crate::types::{Money, Percent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    #[serde(alias = "Personal", alias = "personal_loan")]
    Personal,
    #[serde(alias = "Consumer", alias = "consumer_loan")]
    Consumer,
}

/// Amounts that define the principal, per loan type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "loan_type", rename_all = "snake_case")]
pub enum LoanKind {
    /// Cash loan: the sanctioned amount and what actually reached the account.
    Personal {
        loan_amount: Money,
        credited_amount: Money,
    },
    /// Financed purchase: the product price and the part paid upfront.
    Consumer {
        product_amount: Money,
        downpayment: Money,
    },
}

impl LoanKind {
    pub fn loan_type(&self) -> LoanType {
        match self {
            LoanKind::Personal { .. } => LoanType::Personal,
            LoanKind::Consumer { .. } => LoanType::Consumer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub kind: LoanKind,
    pub tenure_months: u32,
    pub emi_amount: Money,
    pub start_month: YearMonth,
    /// 1-31, clamped per calendar month when the schedule is laid out.
    pub due_day: u32,
    pub processing_fee: Money,
    pub other_charges: Money,
    pub gst_included: bool,
    /// Effective interest rate in percent.
    pub interest_rate: Percent,
}

/// Form-shaped terms. Numbers may arrive as JSON strings or numbers; the
/// start date as `YYYY-MM` or `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTermsInput {
    pub loan_type: LoanType,
    #[serde(default)]
    pub loan_amount: Option<Money>,
    #[serde(default)]
    pub credited_amount: Option<Money>,
    #[serde(default)]
    pub product_amount: Option<Money>,
    #[serde(default, alias = "downpaymentAmount")]
    pub downpayment: Option<Money>,
    #[serde(alias = "tenure")]
    pub tenure_months: u32,
    pub emi_amount: Money,
    pub start_date: String,
    #[serde(alias = "dueDate")]
    pub due_day: u32,
    #[serde(default)]
    pub processing_fee: Money,
    #[serde(default)]
    pub other_charges: Money,
    #[serde(default)]
    pub gst_included: bool,
    #[serde(default)]
    pub interest_rate: Percent,
}

impl TryFrom<LoanTermsInput> for LoanTerms {
    type Error = LoanLedgerError;

    fn try_from(input: LoanTermsInput) -> Result<Self, Self::Error> {
        let kind = match input.loan_type {
            LoanType::Personal => {
                if input.product_amount.is_some() || input.downpayment.is_some() {
                    return Err(LoanLedgerError::invalid(
                        "loanType",
                        "personal loans take loanAmount and creditedAmount, not product fields",
                    ));
                }
                LoanKind::Personal {
                    loan_amount: required(input.loan_amount, "loanAmount")?,
                    credited_amount: required(input.credited_amount, "creditedAmount")?,
                }
            }
            LoanType::Consumer => {
                if input.loan_amount.is_some() || input.credited_amount.is_some() {
                    return Err(LoanLedgerError::invalid(
                        "loanType",
                        "consumer loans take productAmount and downpayment, not loan fields",
                    ));
                }
                LoanKind::Consumer {
                    product_amount: required(input.product_amount, "productAmount")?,
                    downpayment: input.downpayment.unwrap_or(Decimal::ZERO),
                }
            }
        };

        validate_due_day(input.due_day)?;

        Ok(LoanTerms {
            kind,
            tenure_months: input.tenure_months,
            emi_amount: input.emi_amount,
            start_month: input.start_date.parse()?,
            due_day: input.due_day,
            processing_fee: input.processing_fee,
            other_charges: input.other_charges,
            gst_included: input.gst_included,
            interest_rate: input.interest_rate,
        })
    }
}

impl From<&LoanTerms> for LoanTermsInput {
    fn from(terms: &LoanTerms) -> Self {
        let (loan_amount, credited_amount, product_amount, downpayment) = match terms.kind {
            LoanKind::Personal {
                loan_amount,
                credited_amount,
            } => (Some(loan_amount), Some(credited_amount), None, None),
            LoanKind::Consumer {
                product_amount,
                downpayment,
            } => (None, None, Some(product_amount), Some(downpayment)),
        };
        LoanTermsInput {
            loan_type: terms.kind.loan_type(),
            loan_amount,
            credited_amount,
            product_amount,
            downpayment,
            tenure_months: terms.tenure_months,
            emi_amount: terms.emi_amount,
            start_date: terms.start_month.to_string(),
            due_day: terms.due_day,
            processing_fee: terms.processing_fee,
            other_charges: terms.other_charges,
            gst_included: terms.gst_included,
            interest_rate: terms.interest_rate,
        }
    }
}

fn required(value: Option<Money>, field: &str) -> Result<Money, LoanLedgerError> {
    value.ok_or_else(|| LoanLedgerError::invalid(field, "is required for this loan type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn personal_json() -> serde_json::Value {
        serde_json::json!({
            "loanType": "personal",
            "loanAmount": "100000",
            "creditedAmount": 98000,
            "emiAmount": "9000",
            "tenure": 12,
            "startDate": "2024-01",
            "dueDay": 5
        })
    }

    #[test]
    fn test_personal_from_form() {
        let input: LoanTermsInput = serde_json::from_value(personal_json()).unwrap();
        let terms = LoanTerms::try_from(input).unwrap();
        assert_eq!(
            terms.kind,
            LoanKind::Personal {
                loan_amount: dec!(100000),
                credited_amount: dec!(98000)
            }
        );
        assert_eq!(terms.start_month, YearMonth::new(2024, 1).unwrap());
        assert_eq!(terms.processing_fee, dec!(0));
        assert!(!terms.gst_included);
    }

    #[test]
    fn test_consumer_downpayment_defaults_to_zero() {
        let input: LoanTermsInput = serde_json::from_value(serde_json::json!({
            "loanType": "consumer",
            "productAmount": 60000,
            "emiAmount": 5500,
            "tenureMonths": 12,
            "startDate": "2024-03-15",
            "dueDay": 15
        }))
        .unwrap();
        let terms = LoanTerms::try_from(input).unwrap();
        assert_eq!(
            terms.kind,
            LoanKind::Consumer {
                product_amount: dec!(60000),
                downpayment: dec!(0)
            }
        );
    }

    #[test]
    fn test_mixed_groups_rejected() {
        let mut json = personal_json();
        json["productAmount"] = serde_json::json!(5000);
        let input: LoanTermsInput = serde_json::from_value(json).unwrap();
        assert!(matches!(
            LoanTerms::try_from(input),
            Err(LoanLedgerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_missing_group_rejected() {
        let mut json = personal_json();
        json.as_object_mut().unwrap().remove("creditedAmount");
        let input: LoanTermsInput = serde_json::from_value(json).unwrap();
        assert!(LoanTerms::try_from(input).is_err());
    }

    #[test]
    fn test_bad_shape_rejected() {
        let mut json = personal_json();
        json["dueDay"] = serde_json::json!(32);
        let input: LoanTermsInput = serde_json::from_value(json).unwrap();
        assert!(LoanTerms::try_from(input).is_err());

        let mut json = personal_json();
        json["startDate"] = serde_json::json!("Jan 2024");
        let input: LoanTermsInput = serde_json::from_value(json).unwrap();
        assert!(matches!(
            LoanTerms::try_from(input),
            Err(LoanLedgerError::DateError(_))
        ));
    }

    #[test]
    fn test_form_round_trip() {
        let input: LoanTermsInput = serde_json::from_value(personal_json()).unwrap();
        let terms = LoanTerms::try_from(input).unwrap();
        let back = LoanTerms::try_from(LoanTermsInput::from(&terms)).unwrap();
        assert_eq!(back, terms);
    }
}
