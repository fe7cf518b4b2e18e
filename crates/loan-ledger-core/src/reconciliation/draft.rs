//! The in-progress loan being authored and its edit pipeline.
//!
//! A [`LoanDraft`] owns the terms, the schedule and the solver state of one
//! editing session. [`LoanDraft::apply_edit`] is the single entry point for a
//! field change and always runs the same order: apply the edit, regenerate
//! the schedule if the edit was structural (or no schedule exists), then
//! reconcile fees and rate against the updated figures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::calendar::YearMonth;
use crate::error::LoanLedgerError;
use crate::schedule::generator::{generate, validate_due_day};
use crate::schedule::{Schedule, ToggleRejection};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, ScheduleEntry};
use crate::LoanLedgerResult;

use super::checks::{check_draft, DraftCheck, DraftIssue};
use super::derived::{derive, DerivedQuantities};
use super::solver::{
    reconcile, FeeAdjustment, FeeField, RateImpliedFees, RateMode, SolverError, SolverState,
};
use super::terms::{LoanKind, LoanTerms, LoanTermsInput};

/// One user edit. Serialised as `{"field": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum TermsEdit {
    LoanAmount(Money),
    CreditedAmount(Money),
    ProductAmount(Money),
    Downpayment(Money),
    TenureMonths(u32),
    EmiAmount(Money),
    StartMonth(YearMonth),
    DueDay(u32),
    ProcessingFee(Money),
    OtherCharges(Money),
    GstIncluded(bool),
    InterestRate(Percent),
    InstallmentAmount { index: usize, amount: Money },
    InstallmentDay { index: usize, day: u32 },
    InstallmentPaid { index: usize, paid: bool },
}

impl TermsEdit {
    /// Edits that change which months or days the schedule covers.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TermsEdit::TenureMonths(_) | TermsEdit::StartMonth(_) | TermsEdit::DueDay(_)
        )
    }
}

/// What one edit did besides changing the field itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditReport {
    pub fee_adjustment: Option<FeeAdjustment>,
    pub rate_mode: Option<RateMode>,
    pub rate_implied: Option<RateImpliedFees>,
    pub solver_errors: Vec<SolverError>,
    pub toggle_rejection: Option<ToggleRejection>,
    pub regenerated: bool,
    /// Paid installments lost to a schedule regeneration.
    pub dropped_paid: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDraft {
    pub terms: LoanTerms,
    pub schedule: Schedule,
    #[serde(default)]
    pub state: SolverState,
}

impl LoanDraft {
    /// Start a draft from fresh terms with a generated schedule.
    pub fn new(terms: LoanTerms) -> LoanLedgerResult<Self> {
        let schedule = Schedule::new(generate(
            terms.start_month,
            terms.tenure_months,
            terms.emi_amount,
            terms.due_day,
        )?);
        Ok(LoanDraft {
            terms,
            schedule,
            state: SolverState::default(),
        })
    }

    /// Resume editing an existing loan with its stored schedule.
    pub fn with_schedule(terms: LoanTerms, schedule: Schedule, state: SolverState) -> Self {
        LoanDraft {
            terms,
            schedule,
            state,
        }
    }

    /// Build from form-shaped terms, generating the schedule when none is given.
    pub fn from_parts(
        terms: LoanTermsInput,
        schedule: Option<Schedule>,
        state: SolverState,
    ) -> LoanLedgerResult<Self> {
        let terms = LoanTerms::try_from(terms)?;
        match schedule {
            Some(schedule) => Ok(LoanDraft::with_schedule(terms, schedule, state)),
            None => {
                let mut draft = LoanDraft::new(terms)?;
                draft.state = state;
                Ok(draft)
            }
        }
    }

    pub fn derived(&self) -> DerivedQuantities {
        derive(&self.terms, &self.schedule)
    }

    pub fn check(&self, today: NaiveDate) -> DraftCheck {
        check_draft(&self.terms, &self.schedule, &self.state, today)
    }

    /// Reconcile without an edit, e.g. right after loading form terms.
    pub fn settle(&mut self) -> EditReport {
        let mut report = EditReport::default();
        self.run_solver(&mut report);
        report
    }

    /// Apply one edit and bring every dependent figure back in line.
    ///
    /// Contract violations (wrong loan-type field, due day outside 1-31, an
    /// installment index that does not exist, a schedule running past the
    /// calendar) are errors and leave the draft exactly as it was.
    /// Business-rule problems come back in the report.
    pub fn apply_edit(
        &mut self,
        edit: TermsEdit,
        today: NaiveDate,
    ) -> LoanLedgerResult<EditReport> {
        let before = self.clone();
        match self.apply_edit_in_place(edit, today) {
            Ok(report) => Ok(report),
            Err(e) => {
                *self = before;
                Err(e)
            }
        }
    }

    fn apply_edit_in_place(
        &mut self,
        edit: TermsEdit,
        today: NaiveDate,
    ) -> LoanLedgerResult<EditReport> {
        let mut report = EditReport::default();
        let structural = edit.is_structural();
        debug!(?edit, "applying edit");

        match edit {
            TermsEdit::LoanAmount(v) => match &mut self.terms.kind {
                LoanKind::Personal { loan_amount, .. } => *loan_amount = v,
                LoanKind::Consumer { .. } => return Err(wrong_group("loan_amount")),
            },
            TermsEdit::CreditedAmount(v) => match &mut self.terms.kind {
                LoanKind::Personal {
                    credited_amount, ..
                } => *credited_amount = v,
                LoanKind::Consumer { .. } => return Err(wrong_group("credited_amount")),
            },
            TermsEdit::ProductAmount(v) => match &mut self.terms.kind {
                LoanKind::Consumer { product_amount, .. } => *product_amount = v,
                LoanKind::Personal { .. } => return Err(wrong_group("product_amount")),
            },
            TermsEdit::Downpayment(v) => match &mut self.terms.kind {
                LoanKind::Consumer { downpayment, .. } => *downpayment = v,
                LoanKind::Personal { .. } => return Err(wrong_group("downpayment")),
            },
            TermsEdit::TenureMonths(v) => self.terms.tenure_months = v,
            TermsEdit::StartMonth(v) => self.terms.start_month = v,
            TermsEdit::DueDay(v) => {
                validate_due_day(v)?;
                self.terms.due_day = v;
            }
            TermsEdit::EmiAmount(v) => {
                let previous = self.terms.emi_amount;
                self.terms.emi_amount = v;
                let changed = self.schedule.reprice_unpaid(previous, v);
                debug!(changed, "repriced unpaid installments");
            }
            TermsEdit::ProcessingFee(v) => {
                self.terms.processing_fee = v;
                self.state.touch_fee(FeeField::ProcessingFee);
            }
            TermsEdit::OtherCharges(v) => {
                self.terms.other_charges = v;
                self.state.touch_fee(FeeField::OtherCharges);
            }
            TermsEdit::GstIncluded(v) => self.terms.gst_included = v,
            TermsEdit::InterestRate(v) => {
                self.terms.interest_rate = v;
                self.state.touch_rate();
            }
            TermsEdit::InstallmentAmount { index, amount } => {
                self.schedule.set_amount(index, amount)?;
            }
            TermsEdit::InstallmentDay { index, day } => {
                self.schedule.set_day(index, day)?;
                if !self.schedule.is_chronological() {
                    report
                        .warnings
                        .push("Installment dates are no longer in order".to_string());
                }
            }
            TermsEdit::InstallmentPaid { index, paid } => {
                if let Err(rejection) = self.schedule.set_paid(index, paid, today) {
                    report.warnings.push(rejection.to_string());
                    report.toggle_rejection = Some(rejection);
                }
            }
        }

        if structural || self.schedule.is_empty() {
            self.regenerate_schedule(&mut report)?;
        }
        self.run_solver(&mut report);
        Ok(report)
    }

    /// Lay the schedule out again from the terms. Entries whose date is
    /// unchanged keep their amount and paid flag; paid entries that no longer
    /// exist are counted in the report.
    fn regenerate_schedule(&mut self, report: &mut EditReport) -> LoanLedgerResult<()> {
        let fresh = generate(
            self.terms.start_month,
            self.terms.tenure_months,
            self.terms.emi_amount,
            self.terms.due_day,
        )?;
        let old = self.schedule.entries();

        let entries: Vec<ScheduleEntry> = fresh
            .into_iter()
            .enumerate()
            .map(|(i, entry)| match old.get(i) {
                Some(prev) if prev.date == entry.date => prev.clone(),
                _ => entry,
            })
            .collect();

        let kept_paid = entries.iter().filter(|e| e.is_paid).count();
        let dropped_paid = self.schedule.paid_count().saturating_sub(kept_paid);
        if dropped_paid > 0 {
            warn!(dropped_paid, "schedule regeneration discarded paid installments");
            report.warnings.push(format!(
                "{dropped_paid} paid installment(s) were removed by the schedule change"
            ));
        }

        self.schedule = Schedule::new(entries);
        report.regenerated = true;
        report.dropped_paid = dropped_paid;
        Ok(())
    }

    fn run_solver(&mut self, report: &mut EditReport) {
        let rec = reconcile(&self.terms, &self.schedule, &self.state);

        // A typed rate the solver could not apply is pinned to 0; it must not
        // keep driving other charges on later edits.
        if rec.rate_mode == RateMode::Manual && !rec.errors.is_empty() {
            debug!("manual rate rejected, returning to automatic mode");
            self.state.rate_override = false;
        }

        report
            .warnings
            .extend(rec.errors.iter().map(|e| e.to_string()));
        self.terms = rec.terms;
        report.fee_adjustment = rec.fee_adjustment;
        report.rate_mode = Some(rec.rate_mode);
        report.rate_implied = rec.rate_implied;
        report.solver_errors = rec.errors;
    }
}

fn wrong_group(field: &str) -> LoanLedgerError {
    LoanLedgerError::invalid(field, "does not apply to this loan type")
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditInput {
    pub terms: LoanTermsInput,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub state: SolverState,
    /// Applied in order. An empty list just settles the terms.
    #[serde(default)]
    pub edits: Vec<TermsEdit>,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOutput {
    pub terms: LoanTermsInput,
    pub schedule: Schedule,
    pub state: SolverState,
    pub derived: DerivedQuantities,
    pub reports: Vec<EditReport>,
    pub issues: Vec<DraftIssue>,
    pub submittable: bool,
}

/// Replay a sequence of edits over a draft and return the settled result.
pub fn apply_edits(input: &EditInput) -> LoanLedgerResult<ComputationOutput<EditOutput>> {
    let start = Instant::now();
    let mut draft =
        LoanDraft::from_parts(input.terms.clone(), input.schedule.clone(), input.state)?;

    let mut reports = Vec::with_capacity(input.edits.len().max(1));
    if input.edits.is_empty() {
        reports.push(draft.settle());
    }
    for edit in &input.edits {
        reports.push(draft.apply_edit(edit.clone(), input.today)?);
    }

    let warnings: Vec<String> = reports.iter().flat_map(|r| r.warnings.clone()).collect();
    let check = draft.check(input.today);

    let output = EditOutput {
        terms: LoanTermsInput::from(&draft.terms),
        derived: check.derived.rounded(),
        submittable: check.is_submittable(),
        issues: check.issues,
        schedule: draft.schedule,
        state: draft.state,
        reports,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Edit replay with schedule regeneration and fee/rate reconciliation",
        &input.edits,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn personal_draft() -> LoanDraft {
        LoanDraft::new(LoanTerms {
            kind: LoanKind::Personal {
                loan_amount: dec!(100000),
                credited_amount: dec!(98000),
            },
            tenure_months: 12,
            emi_amount: dec!(9000),
            start_month: YearMonth::new(2024, 1).unwrap(),
            due_day: 5,
            processing_fee: Decimal::ZERO,
            other_charges: Decimal::ZERO,
            gst_included: false,
            interest_rate: Decimal::ZERO,
        })
        .unwrap()
    }

    #[test]
    fn test_settle_fills_fees_and_rate() {
        let mut draft = personal_draft();
        let report = draft.settle();
        assert_eq!(draft.terms.processing_fee, dec!(8000));
        assert_eq!(draft.terms.interest_rate, dec!(8));
        assert_eq!(
            report.fee_adjustment.map(|a| a.field),
            Some(FeeField::ProcessingFee)
        );
    }

    #[test]
    fn test_wrong_group_leaves_draft_unchanged() {
        let mut draft = personal_draft();
        let before = draft.clone();
        let err = draft.apply_edit(TermsEdit::ProductAmount(dec!(1)), d(2024, 6, 1));
        assert!(err.is_err());
        assert_eq!(draft, before);
    }

    #[test]
    fn test_amount_edit_survives_non_structural_edit() {
        let mut draft = personal_draft();
        let today = d(2024, 6, 1);
        draft
            .apply_edit(
                TermsEdit::InstallmentAmount {
                    index: 11,
                    amount: dec!(12000),
                },
                today,
            )
            .unwrap();
        draft.apply_edit(TermsEdit::GstIncluded(true), today).unwrap();
        assert_eq!(draft.schedule.entries()[11].amount, dec!(12000));
        assert_eq!(draft.derived().total_payable, dec!(111000));
    }

    #[test]
    fn test_emi_edit_reprices_only_untouched_unpaid() {
        let mut draft = personal_draft();
        let today = d(2024, 3, 10);
        draft
            .apply_edit(TermsEdit::InstallmentPaid { index: 1, paid: true }, today)
            .unwrap();
        draft
            .apply_edit(
                TermsEdit::InstallmentAmount {
                    index: 5,
                    amount: dec!(9500),
                },
                today,
            )
            .unwrap();
        draft.apply_edit(TermsEdit::EmiAmount(dec!(9100)), today).unwrap();

        let amounts: Vec<Money> = draft.schedule.entries().iter().map(|e| e.amount).collect();
        assert_eq!(amounts[0], dec!(9000));
        assert_eq!(amounts[1], dec!(9000));
        assert_eq!(amounts[2], dec!(9100));
        assert_eq!(amounts[5], dec!(9500));
        assert_eq!(amounts[11], dec!(9100));
    }

    #[test]
    fn test_tenure_extension_keeps_paid_prefix() {
        let mut draft = personal_draft();
        let today = d(2024, 3, 10);
        draft
            .apply_edit(TermsEdit::InstallmentPaid { index: 2, paid: true }, today)
            .unwrap();
        let report = draft.apply_edit(TermsEdit::TenureMonths(18), today).unwrap();
        assert!(report.regenerated);
        assert_eq!(report.dropped_paid, 0);
        assert_eq!(draft.schedule.len(), 18);
        assert_eq!(draft.schedule.paid_count(), 3);
    }

    #[test]
    fn test_due_day_change_reports_dropped_paid() {
        let mut draft = personal_draft();
        let today = d(2024, 3, 10);
        draft
            .apply_edit(TermsEdit::InstallmentPaid { index: 1, paid: true }, today)
            .unwrap();
        let report = draft.apply_edit(TermsEdit::DueDay(20), today).unwrap();
        assert_eq!(report.dropped_paid, 2);
        assert_eq!(draft.schedule.paid_count(), 0);
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn test_invalid_due_day_rejected() {
        let mut draft = personal_draft();
        assert!(draft.apply_edit(TermsEdit::DueDay(0), d(2024, 1, 1)).is_err());
        assert_eq!(draft.terms.due_day, 5);
    }

    #[test]
    fn test_negative_rate_returns_to_automatic() {
        let mut draft = personal_draft();
        let today = d(2024, 1, 1);
        draft.settle();
        let report = draft
            .apply_edit(TermsEdit::InterestRate(dec!(-3)), today)
            .unwrap();
        assert_eq!(draft.terms.interest_rate, dec!(0));
        assert_eq!(report.solver_errors.len(), 1);
        assert!(!draft.state.rate_override);

        draft.apply_edit(TermsEdit::GstIncluded(false), today).unwrap();
        assert_eq!(draft.terms.interest_rate, dec!(8));
    }

    #[test]
    fn test_rejected_manual_rate_does_not_drive_later_edits() {
        let mut draft = personal_draft();
        let today = d(2024, 1, 1);
        draft
            .apply_edit(TermsEdit::ProcessingFee(dec!(99000)), today)
            .unwrap();
        let report = draft
            .apply_edit(TermsEdit::InterestRate(dec!(10)), today)
            .unwrap();
        assert!(matches!(
            report.solver_errors.as_slice(),
            [SolverError::NonPositiveNetPrincipal { .. }]
        ));
        assert_eq!(draft.terms.interest_rate, dec!(0));
        assert!(!draft.state.rate_override);

        let report = draft
            .apply_edit(TermsEdit::CreditedAmount(dec!(250000)), today)
            .unwrap();
        assert_eq!(report.rate_mode, Some(RateMode::Automatic));
        assert_eq!(draft.terms.other_charges, dec!(0));
        assert_eq!(draft.terms.interest_rate, dec!(8));
    }

    #[test]
    fn test_failed_structural_edit_leaves_draft_unchanged() {
        let mut draft = personal_draft();
        draft.settle();
        let before = draft.clone();
        let last_month = YearMonth::new(262142, 12).unwrap();
        let err = draft.apply_edit(TermsEdit::StartMonth(last_month), d(2024, 1, 1));
        assert!(matches!(err, Err(LoanLedgerError::DateError(_))));
        assert_eq!(draft, before);
        assert_eq!(draft.terms.start_month, YearMonth::new(2024, 1).unwrap());
    }

    #[test]
    fn test_toggle_rejection_reported_not_raised() {
        let mut draft = personal_draft();
        let report = draft
            .apply_edit(TermsEdit::InstallmentPaid { index: 6, paid: true }, d(2024, 3, 10))
            .unwrap();
        assert!(matches!(
            report.toggle_rejection,
            Some(ToggleRejection::FutureDate { index: 6, .. })
        ));
        assert_eq!(draft.schedule.paid_count(), 0);
    }

    #[test]
    fn test_edit_serde_shape() {
        let edit: TermsEdit =
            serde_json::from_str(r#"{"field": "interest_rate", "value": "12.5"}"#).unwrap();
        assert_eq!(edit, TermsEdit::InterestRate(dec!(12.5)));
        let edit: TermsEdit = serde_json::from_str(
            r#"{"field": "installment_paid", "value": {"index": 2, "paid": true}}"#,
        )
        .unwrap();
        assert_eq!(edit, TermsEdit::InstallmentPaid { index: 2, paid: true });
    }
}
