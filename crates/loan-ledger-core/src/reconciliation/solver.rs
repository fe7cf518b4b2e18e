//! Bidirectional fee and rate reconciliation.
//!
//! Two solvers keep the fee fields consistent with the schedule:
//!
//! * the **fee-pair solver** splits `total payable - loan principal` between
//!   the processing fee (plus GST) and other charges, recomputing whichever
//!   of the two the user did not touch last;
//! * the **rate solver** either derives the effective rate from the figures
//!   (automatic) or, once the user types a rate, backs out the other charges
//!   that rate implies on the net cash received (manual).
//!
//! Edit history is an explicit [`SolverState`] argument, so [`reconcile`] is a
//! pure function of `(terms, schedule, state)` and a second call on its own
//! output changes nothing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use crate::schedule::generator::generate;
use crate::schedule::Schedule;
use crate::types::{round2, with_metadata, ComputationOutput, Money, Percent};
use crate::LoanLedgerResult;

use super::derived::{derive, effective_rate, DerivedQuantities, GST_RATE};
use super::terms::{LoanTerms, LoanTermsInput};

/// Smallest change worth writing back into a user-visible field.
pub const WRITE_BACK_TOLERANCE: Decimal = dec!(0.01);

const HUNDRED: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The two fee fields the pair solver balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeField {
    ProcessingFee,
    OtherCharges,
}

/// Which fields the user has set by hand in this editing session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverState {
    /// Fee field edited most recently; it is held fixed and the other one
    /// is recomputed.
    #[serde(default)]
    pub last_touched: Option<FeeField>,
    /// True once the user typed an interest rate. Cleared by any fee edit.
    #[serde(default)]
    pub rate_override: bool,
}

impl SolverState {
    pub fn touch_fee(&mut self, field: FeeField) {
        self.last_touched = Some(field);
        self.rate_override = false;
    }

    pub fn touch_rate(&mut self) {
        self.rate_override = true;
    }

    pub fn rate_mode(&self) -> RateMode {
        if self.rate_override {
            RateMode::Manual
        } else {
            RateMode::Automatic
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMode {
    /// Rate follows the figures.
    #[default]
    Automatic,
    /// Figures follow the rate the user typed.
    Manual,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolverError {
    #[error("net principal must be positive to calculate rate (currently {net_principal})")]
    NonPositiveNetPrincipal { net_principal: Money },

    #[error("interest rate cannot be negative (entered {rate}); reset to 0")]
    NegativeRate { rate: Percent },
}

/// A value the solver wrote into one of the fee fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAdjustment {
    pub field: FeeField,
    pub previous: Money,
    pub value: Money,
}

/// Manual-rate solution: net cash the rate implies and the other charges
/// that make the upfront deductions reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateImpliedFees {
    pub required_net_cash: Money,
    pub required_total_upfront: Money,
    pub other_charges: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    pub terms: LoanTerms,
    /// Recomputed after every write-back.
    pub derived: DerivedQuantities,
    pub rate_mode: RateMode,
    pub fee_adjustment: Option<FeeAdjustment>,
    pub rate_implied: Option<RateImpliedFees>,
    pub errors: Vec<SolverError>,
}

// ---------------------------------------------------------------------------
// Fee-pair solver
// ---------------------------------------------------------------------------

/// Balance processing fee (with GST) and other charges against the fee total
/// the schedule implies.
///
/// The field named by `last_touched` is authoritative. With no fee edit yet,
/// other charges are held and the processing fee absorbs the total.
pub fn solve_fee_pair(
    terms: &LoanTerms,
    derived: &DerivedQuantities,
    last_touched: Option<FeeField>,
) -> Option<FeeAdjustment> {
    let target = derived.target_total_fees();

    let (field, previous, desired) = match last_touched {
        Some(FeeField::ProcessingFee) => {
            let remaining = target - (terms.processing_fee + derived.gst_amount);
            (
                FeeField::OtherCharges,
                terms.other_charges,
                remaining.max(Decimal::ZERO),
            )
        }
        None | Some(FeeField::OtherCharges) => {
            let net_of_charges = target - terms.other_charges;
            let fee = if terms.gst_included {
                net_of_charges / (Decimal::ONE + GST_RATE)
            } else {
                net_of_charges
            };
            (
                FeeField::ProcessingFee,
                terms.processing_fee,
                fee.max(Decimal::ZERO),
            )
        }
    };

    // Measured on the fee total, where a processing fee change counts with GST.
    let weight = match field {
        FeeField::ProcessingFee if terms.gst_included => Decimal::ONE + GST_RATE,
        _ => Decimal::ONE,
    };
    if ((desired - previous) * weight).abs() <= WRITE_BACK_TOLERANCE {
        return None;
    }
    Some(FeeAdjustment {
        field,
        previous,
        value: round2(desired),
    })
}

// ---------------------------------------------------------------------------
// Rate solver
// ---------------------------------------------------------------------------

/// Automatic direction: the rate the figures imply.
pub fn solve_rate_from_fees(derived: &DerivedQuantities) -> Result<Percent, SolverError> {
    if derived.net_principal <= Decimal::ZERO {
        return Err(SolverError::NonPositiveNetPrincipal {
            net_principal: derived.net_principal,
        });
    }
    Ok(effective_rate(derived.total_payable, derived.loan_principal))
}

/// Manual direction: the other charges that make `rate` the simple annual
/// rate on the net cash received.
pub fn solve_fees_from_rate(
    terms: &LoanTerms,
    derived: &DerivedQuantities,
    rate: Percent,
) -> Result<RateImpliedFees, SolverError> {
    if rate < Decimal::ZERO {
        return Err(SolverError::NegativeRate { rate });
    }
    if derived.net_principal <= Decimal::ZERO {
        return Err(SolverError::NonPositiveNetPrincipal {
            net_principal: derived.net_principal,
        });
    }

    let required_net_cash = derived.total_payable / (Decimal::ONE + rate / HUNDRED * derived.years);
    let required_total_upfront = derived.principal_base - required_net_cash;
    let other_charges =
        (required_total_upfront - (terms.processing_fee + derived.gst_amount)).max(Decimal::ZERO);

    Ok(RateImpliedFees {
        required_net_cash,
        required_total_upfront,
        other_charges,
    })
}

// ---------------------------------------------------------------------------
// Combined
// ---------------------------------------------------------------------------

/// Run the solvers for one edit and return the settled terms.
///
/// Automatic mode runs the fee-pair solver and then derives the rate. Manual
/// mode lets the rate solver own other charges and skips the fee pair.
pub fn reconcile(terms: &LoanTerms, schedule: &Schedule, state: &SolverState) -> Reconciliation {
    let mut terms = terms.clone();
    let mut errors = Vec::new();
    let mut fee_adjustment = None;
    let mut rate_implied = None;

    let derived = derive(&terms, schedule);
    let rate_mode = state.rate_mode();

    match rate_mode {
        RateMode::Manual => match solve_fees_from_rate(&terms, &derived, terms.interest_rate) {
            Ok(implied) => {
                if (implied.other_charges - terms.other_charges).abs() > WRITE_BACK_TOLERANCE {
                    let value = round2(implied.other_charges);
                    debug!(
                        rate = %terms.interest_rate,
                        previous = %terms.other_charges,
                        value = %value,
                        "rate solver recomputed other charges"
                    );
                    fee_adjustment = Some(FeeAdjustment {
                        field: FeeField::OtherCharges,
                        previous: terms.other_charges,
                        value,
                    });
                    terms.other_charges = value;
                }
                rate_implied = Some(implied);
            }
            Err(e) => {
                debug!(error = %e, "manual rate not applied");
                terms.interest_rate = Decimal::ZERO;
                errors.push(e);
            }
        },
        RateMode::Automatic => {
            if let Some(adj) = solve_fee_pair(&terms, &derived, state.last_touched) {
                debug!(
                    field = ?adj.field,
                    previous = %adj.previous,
                    value = %adj.value,
                    "fee-pair solver recomputed field"
                );
                match adj.field {
                    FeeField::ProcessingFee => terms.processing_fee = adj.value,
                    FeeField::OtherCharges => terms.other_charges = adj.value,
                }
                fee_adjustment = Some(adj);
            }

            let settled = derive(&terms, schedule);
            terms.interest_rate = match solve_rate_from_fees(&settled) {
                Ok(rate) => round2(rate),
                Err(e) => {
                    debug!(error = %e, "rate pinned to zero");
                    errors.push(e);
                    Decimal::ZERO
                }
            };
        }
    }

    Reconciliation {
        derived: derive(&terms, schedule),
        terms,
        rate_mode,
        fee_adjustment,
        rate_implied,
        errors,
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileInput {
    pub terms: LoanTermsInput,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub state: SolverState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutput {
    pub terms: LoanTermsInput,
    pub derived: DerivedQuantities,
    pub rate_mode: RateMode,
    pub fee_adjustment: Option<FeeAdjustment>,
    pub rate_implied: Option<RateImpliedFees>,
    pub errors: Vec<SolverError>,
}

pub fn reconcile_terms(
    input: &ReconcileInput,
) -> LoanLedgerResult<ComputationOutput<ReconcileOutput>> {
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

    let rec = reconcile(&terms, &schedule, &input.state);
    let warnings = rec.errors.iter().map(|e| e.to_string()).collect();

    let output = ReconcileOutput {
        terms: LoanTermsInput::from(&rec.terms),
        derived: rec.derived.rounded(),
        rate_mode: rec.rate_mode,
        fee_adjustment: rec.fee_adjustment,
        rate_implied: rec.rate_implied,
        errors: rec.errors,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fee-pair and simple-interest rate reconciliation",
        &input.state,
        warnings,
        elapsed,
        output,
    ))
}
