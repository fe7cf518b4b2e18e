//! Quantities derived from the terms and the schedule.
//!
//! Everything is computed at full `Decimal` precision; [`DerivedQuantities::rounded`]
//! is the single place values are cut to 2 decimal places for presentation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::schedule::generator::generate;
use crate::schedule::Schedule;
use crate::types::{round2, with_metadata, ComputationOutput, Money, Percent};
use crate::LoanLedgerResult;

use super::terms::{LoanKind, LoanTerms, LoanTermsInput};

/// GST charged on the processing fee when `gst_included` is set.
pub const GST_RATE: Decimal = dec!(0.18);

const MONTHS_PER_YEAR: Decimal = dec!(12);
const HUNDRED: Decimal = dec!(100);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedQuantities {
    /// Nominal principal: loan amount (personal) or product price (consumer).
    pub loan_principal: Money,
    /// Cash the borrower receives before fees: credited amount, or product
    /// price less downpayment.
    pub principal_base: Money,
    pub gst_amount: Money,
    pub total_upfront: Money,
    pub net_principal: Money,
    pub total_payable: Money,
    /// (total payable - principal) / principal, in percent.
    pub effective_interest_rate: Percent,
    /// Simple annual rate on the net cash received, in percent.
    pub net_cash_rate: Percent,
    pub years: Decimal,
}

impl DerivedQuantities {
    pub fn interest_gap(&self) -> Money {
        self.total_payable - self.loan_principal
    }

    /// Fees and charges the schedule implies: never negative.
    pub fn target_total_fees(&self) -> Money {
        self.interest_gap().max(Decimal::ZERO)
    }

    pub fn rounded(&self) -> Self {
        DerivedQuantities {
            loan_principal: round2(self.loan_principal),
            principal_base: round2(self.principal_base),
            gst_amount: round2(self.gst_amount),
            total_upfront: round2(self.total_upfront),
            net_principal: round2(self.net_principal),
            total_payable: round2(self.total_payable),
            effective_interest_rate: round2(self.effective_interest_rate),
            net_cash_rate: round2(self.net_cash_rate),
            years: self.years,
        }
    }
}

pub fn loan_principal(kind: &LoanKind) -> Money {
    match kind {
        LoanKind::Personal { loan_amount, .. } => *loan_amount,
        LoanKind::Consumer { product_amount, .. } => *product_amount,
    }
}

pub fn principal_base(kind: &LoanKind) -> Money {
    match kind {
        LoanKind::Personal {
            credited_amount, ..
        } => *credited_amount,
        LoanKind::Consumer {
            product_amount,
            downpayment,
        } => *product_amount - *downpayment,
    }
}

pub fn gst_amount(processing_fee: Money, gst_included: bool) -> Money {
    if gst_included {
        processing_fee * GST_RATE
    } else {
        Decimal::ZERO
    }
}

/// Sum of the schedule once one exists, else EMI x tenure.
pub fn total_payable(terms: &LoanTerms, schedule: &Schedule) -> Money {
    if schedule.is_empty() {
        terms.emi_amount * Decimal::from(terms.tenure_months)
    } else {
        schedule.total_amount()
    }
}

/// Rate implied by the gap between what is repaid and the nominal principal.
/// Zero when there is no gap or no principal.
pub fn effective_rate(total_payable: Money, loan_principal: Money) -> Percent {
    let gap = total_payable - loan_principal;
    if gap <= Decimal::ZERO || loan_principal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    gap / loan_principal * HUNDRED
}

/// Simple annual rate on net cash: the inverse of the manual rate solver.
pub fn net_cash_rate(total_payable: Money, net_principal: Money, years: Decimal) -> Percent {
    if net_principal <= Decimal::ZERO || years <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let rate = (total_payable / net_principal - Decimal::ONE) / years * HUNDRED;
    rate.max(Decimal::ZERO)
}

pub fn years(tenure_months: u32) -> Decimal {
    Decimal::from(tenure_months) / MONTHS_PER_YEAR
}

/// All derived quantities in one pass over the schedule.
pub fn derive(terms: &LoanTerms, schedule: &Schedule) -> DerivedQuantities {
    let loan_principal = loan_principal(&terms.kind);
    let principal_base = principal_base(&terms.kind);
    let gst_amount = gst_amount(terms.processing_fee, terms.gst_included);
    let total_upfront = terms.processing_fee + gst_amount + terms.other_charges;
    let net_principal = principal_base - total_upfront;
    let total_payable = total_payable(terms, schedule);
    let years = years(terms.tenure_months);

    DerivedQuantities {
        loan_principal,
        principal_base,
        gst_amount,
        total_upfront,
        net_principal,
        total_payable,
        effective_interest_rate: effective_rate(total_payable, loan_principal),
        net_cash_rate: net_cash_rate(total_payable, net_principal, years),
        years,
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeriveInput {
    pub terms: LoanTermsInput,
    /// Existing schedule for edit flows; generated from the terms when absent.
    #[serde(default)]
    pub schedule: Option<Schedule>,
}

pub fn derive_quantities(
    input: &DeriveInput,
) -> LoanLedgerResult<ComputationOutput<DerivedQuantities>> {
    let start = Instant::now();
    let terms = LoanTerms::try_from(input.terms.clone())?;

    let schedule = match &input.schedule {
        Some(s) => s.clone(),
        None => Schedule::new(generate(
            terms.start_month,
            terms.tenure_months,
            terms.emi_amount,
            terms.due_day,
        )?),
    };

    let derived = derive(&terms, &schedule);

    let mut warnings = Vec::new();
    if derived.net_principal <= Decimal::ZERO {
        warnings.push("Net principal is not positive; fees exceed the cash received".into());
    }
    if derived.total_payable < derived.loan_principal {
        warnings.push("Total payable is below the loan principal".into());
    }
    if derived.loan_principal <= Decimal::ZERO {
        warnings.push("Loan principal is not positive; interest rate reported as 0".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Simple-interest-equivalent loan quantities",
        &input.terms,
        warnings,
        elapsed,
        derived.rounded(),
    ))
}
