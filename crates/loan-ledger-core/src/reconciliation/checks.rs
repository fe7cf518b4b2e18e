//! Submission checks for a loan draft.
//!
//! Every business-rule problem is a [`DraftIssue`] value. The draft stays
//! editable whatever the issues are; it can only be submitted once the list
//! is empty.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

use crate::schedule::validator::first_paid_gap;
use crate::schedule::Schedule;
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::LoanLedgerResult;

use super::derived::{derive, DerivedQuantities, GST_RATE};
use super::solver::{SolverState, WRITE_BACK_TOLERANCE};
use super::terms::{LoanKind, LoanTerms, LoanTermsInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Reconciliation,
    Schedule,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DraftIssue {
    // Reconciliation
    #[error("net principal must be positive (currently {net_principal})")]
    NonPositiveNetPrincipal { net_principal: Money },

    #[error("fees total {fees} but total payable minus principal is {expected}")]
    FeeMismatch { fees: Money, expected: Money },

    #[error("total payable {total_payable} is below the loan principal {loan_principal}")]
    TotalPayableBelowPrincipal {
        total_payable: Money,
        loan_principal: Money,
    },

    // Schedule
    #[error("installment {index} is dated before the one preceding it")]
    NonChronological { index: usize },

    #[error("installment {index} is marked paid but falls due on {date}, in the future")]
    FuturePaid { index: usize, date: NaiveDate },

    #[error("installment {index} is marked paid with amount {amount}")]
    PaidNonPositiveAmount { index: usize, amount: Money },

    #[error("installment {index} is unpaid while a later one is paid")]
    PaidGap { index: usize },

    // Input
    #[error("{field} cannot be negative")]
    NegativeAmount { field: String },

    #[error("interest rate cannot be negative")]
    NegativeInterestRate { rate: Percent },

    #[error("EMI amount must be positive")]
    NonPositiveEmi,

    #[error("tenure must be at least one month")]
    NonPositiveTenure,
}

impl DraftIssue {
    pub fn category(&self) -> IssueCategory {
        match self {
            DraftIssue::NonPositiveNetPrincipal { .. }
            | DraftIssue::FeeMismatch { .. }
            | DraftIssue::TotalPayableBelowPrincipal { .. } => IssueCategory::Reconciliation,
            DraftIssue::NonChronological { .. }
            | DraftIssue::FuturePaid { .. }
            | DraftIssue::PaidNonPositiveAmount { .. }
            | DraftIssue::PaidGap { .. } => IssueCategory::Schedule,
            DraftIssue::NegativeAmount { .. }
            | DraftIssue::NegativeInterestRate { .. }
            | DraftIssue::NonPositiveEmi
            | DraftIssue::NonPositiveTenure => IssueCategory::Input,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftCheck {
    pub derived: DerivedQuantities,
    pub issues: Vec<DraftIssue>,
}

impl DraftCheck {
    pub fn is_submittable(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has(&self, category: IssueCategory) -> bool {
        self.issues.iter().any(|i| i.category() == category)
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.to_string()).collect()
    }
}

/// Collect every issue that blocks submission.
///
/// The fee total is only held against the schedule while the rate is
/// automatic: a typed rate deliberately moves other charges away from it.
pub fn check_draft(
    terms: &LoanTerms,
    schedule: &Schedule,
    state: &SolverState,
    today: NaiveDate,
) -> DraftCheck {
    let derived = derive(terms, schedule);
    let mut issues = input_issues(terms);
    issues.extend(schedule_issues(schedule, today));

    if derived.net_principal <= Decimal::ZERO {
        issues.push(DraftIssue::NonPositiveNetPrincipal {
            net_principal: derived.net_principal,
        });
    }
    if derived.total_payable < derived.loan_principal {
        issues.push(DraftIssue::TotalPayableBelowPrincipal {
            total_payable: derived.total_payable,
            loan_principal: derived.loan_principal,
        });
    } else if !state.rate_override {
        let fees = terms.processing_fee * (Decimal::ONE + gst_factor(terms)) + terms.other_charges;
        let expected = derived.interest_gap();
        if (fees - expected).abs() > WRITE_BACK_TOLERANCE {
            issues.push(DraftIssue::FeeMismatch { fees, expected });
        }
    }

    DraftCheck { derived, issues }
}

fn gst_factor(terms: &LoanTerms) -> Decimal {
    if terms.gst_included {
        GST_RATE
    } else {
        Decimal::ZERO
    }
}

fn input_issues(terms: &LoanTerms) -> Vec<DraftIssue> {
    let mut issues = Vec::new();

    let mut amounts: Vec<(&str, Money)> = match terms.kind {
        LoanKind::Personal {
            loan_amount,
            credited_amount,
        } => vec![("loanAmount", loan_amount), ("creditedAmount", credited_amount)],
        LoanKind::Consumer {
            product_amount,
            downpayment,
        } => vec![("productAmount", product_amount), ("downpayment", downpayment)],
    };
    amounts.push(("processingFee", terms.processing_fee));
    amounts.push(("otherCharges", terms.other_charges));

    for (field, value) in amounts {
        if value < Decimal::ZERO {
            issues.push(DraftIssue::NegativeAmount {
                field: field.to_string(),
            });
        }
    }
    if terms.interest_rate < Decimal::ZERO {
        issues.push(DraftIssue::NegativeInterestRate {
            rate: terms.interest_rate,
        });
    }
    if terms.emi_amount <= Decimal::ZERO {
        issues.push(DraftIssue::NonPositiveEmi);
    }
    if terms.tenure_months == 0 {
        issues.push(DraftIssue::NonPositiveTenure);
    }
    issues
}

fn schedule_issues(schedule: &Schedule, today: NaiveDate) -> Vec<DraftIssue> {
    let entries = schedule.entries();
    let mut issues = Vec::new();

    for (i, pair) in entries.windows(2).enumerate() {
        if pair[1].date < pair[0].date {
            issues.push(DraftIssue::NonChronological { index: i + 1 });
        }
    }
    for (index, e) in entries.iter().enumerate() {
        if e.amount < Decimal::ZERO {
            issues.push(DraftIssue::NegativeAmount {
                field: format!("schedule[{index}].amount"),
            });
        }
    }
    for (index, e) in entries.iter().enumerate().filter(|(_, e)| e.is_paid) {
        if e.is_future(today) {
            issues.push(DraftIssue::FuturePaid {
                index,
                date: e.date,
            });
        }
        if e.amount <= Decimal::ZERO {
            issues.push(DraftIssue::PaidNonPositiveAmount {
                index,
                amount: e.amount,
            });
        }
    }
    if let Some(index) = first_paid_gap(entries) {
        issues.push(DraftIssue::PaidGap { index });
    }
    issues
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInput {
    pub terms: LoanTermsInput,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub state: SolverState,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutput {
    pub submittable: bool,
    pub issues: Vec<DraftIssue>,
    pub messages: Vec<String>,
    pub derived: DerivedQuantities,
}

pub fn check_terms(input: &CheckInput) -> LoanLedgerResult<ComputationOutput<CheckOutput>> {
    let start = Instant::now();
    let draft = super::draft::LoanDraft::from_parts(
        input.terms.clone(),
        input.schedule.clone(),
        input.state,
    )?;
    let check = draft.check(input.today);

    let output = CheckOutput {
        submittable: check.is_submittable(),
        messages: check.messages(),
        derived: check.derived.rounded(),
        issues: check.issues,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Reconciliation, schedule and input checks",
        &serde_json::json!({ "today": input.today, "state": input.state }),
        Vec::new(),
        elapsed,
        output,
    ))
}
