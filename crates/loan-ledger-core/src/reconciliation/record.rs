use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::calendar::YearMonth;
use crate::error::LoanLedgerError;
use crate::schedule::Schedule;
use crate::types::{round2, with_metadata, ComputationOutput, Money, Percent};
use crate::LoanLedgerResult;

use super::draft::LoanDraft;
use super::solver::{RateMode, SolverState};
use super::terms::{LoanKind, LoanTerms, LoanTermsInput, LoanType};

/// The loan as the persistence layer stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub loan_type: LoanType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credited_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downpayment: Option<Money>,
    pub emi_amount: Money,
    pub tenure: u32,
    /// Day of month installments fall due.
    pub due_date: u32,
    pub start_date: YearMonth,
    pub processing_fee: Money,
    #[serde(default)]
    pub gst_included: bool,
    pub gst_amount: Money,
    pub other_charges: Money,
    pub total_upfront: Money,
    pub interest_rate: Percent,
    pub total_payable: Money,
    /// Manual when the stored rate was typed by the user; other charges then
    /// follow the rate rather than the schedule gap.
    #[serde(default)]
    pub rate_mode: RateMode,
    pub schedule: Schedule,
}

impl LoanRecord {
    /// Snapshot a draft for storage. Refused while any check still fails.
    pub fn from_draft(draft: &LoanDraft, today: NaiveDate) -> LoanLedgerResult<Self> {
        let check = draft.check(today);
        if !check.is_submittable() {
            return Err(LoanLedgerError::invalid("draft", check.messages().join("; ")));
        }
        let derived = check.derived;
        let terms = &draft.terms;

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

        Ok(LoanRecord {
            loan_type: terms.kind.loan_type(),
            loan_amount,
            credited_amount,
            product_amount,
            downpayment,
            emi_amount: terms.emi_amount,
            tenure: terms.tenure_months,
            due_date: terms.due_day,
            start_date: terms.start_month,
            processing_fee: round2(terms.processing_fee),
            gst_included: terms.gst_included,
            gst_amount: round2(derived.gst_amount),
            other_charges: round2(terms.other_charges),
            total_upfront: round2(derived.total_upfront),
            interest_rate: round2(terms.interest_rate),
            total_payable: round2(derived.total_payable),
            rate_mode: draft.state.rate_mode(),
            schedule: draft.schedule.clone(),
        })
    }

    /// Reopen a stored loan for editing in the rate mode it was saved with.
    pub fn into_draft(self) -> LoanLedgerResult<LoanDraft> {
        let input = LoanTermsInput {
            loan_type: self.loan_type,
            loan_amount: self.loan_amount,
            credited_amount: self.credited_amount,
            product_amount: self.product_amount,
            downpayment: self.downpayment,
            tenure_months: self.tenure,
            emi_amount: self.emi_amount,
            start_date: self.start_date.to_string(),
            due_day: self.due_date,
            processing_fee: self.processing_fee,
            other_charges: self.other_charges,
            gst_included: self.gst_included,
            interest_rate: self.interest_rate,
        };
        let terms = LoanTerms::try_from(input)?;
        let state = SolverState {
            last_touched: None,
            rate_override: self.rate_mode == RateMode::Manual,
        };
        Ok(LoanDraft::with_schedule(terms, self.schedule, state))
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordInput {
    pub terms: LoanTermsInput,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub state: SolverState,
    pub today: NaiveDate,
    /// Run the solver once before snapshotting (for raw form terms).
    #[serde(default)]
    pub settle: bool,
}

pub fn build_record(input: &RecordInput) -> LoanLedgerResult<ComputationOutput<LoanRecord>> {
    let start = Instant::now();
    let mut draft =
        LoanDraft::from_parts(input.terms.clone(), input.schedule.clone(), input.state)?;

    let mut warnings = Vec::new();
    if input.settle {
        warnings.extend(draft.settle().warnings);
    }
    let record = LoanRecord::from_draft(&draft, input.today)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Persistence snapshot of a settled loan draft",
        &serde_json::json!({ "today": input.today, "settle": input.settle }),
        warnings,
        elapsed,
        record,
    ))
}
