//! Monthly installment generation.
//!
//! One entry per month starting at the supplied month, each on the due day
//! clamped to that month's length. Output depends only on the inputs.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::calendar::YearMonth;
use crate::error::LoanLedgerError;
use crate::types::{with_metadata, ComputationOutput, Money, ScheduleEntry};
use crate::LoanLedgerResult;

use super::validator::Schedule;

/// Latest day a user can pick as the due day.
pub const MAX_DUE_DAY: u32 = 31;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    /// First installment month, `YYYY-MM` (a full date is accepted).
    pub start_month: YearMonth,
    /// Number of installments. Zero or negative yields an empty schedule.
    pub tenure_months: i64,
    pub installment_amount: Money,
    /// Day of month, 1-31.
    pub due_day: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub schedule: Schedule,
    pub total_amount: Money,
    pub first_due: Option<chrono::NaiveDate>,
    pub last_due: Option<chrono::NaiveDate>,
}

// ---------------------------------------------------------------------------
// Core
// ---------------------------------------------------------------------------

/// Produce `tenure_months` unpaid installments of `amount`.
///
/// Entry `i` falls in `start + i` months on `min(due_day, last day of month)`.
pub fn generate(
    start: YearMonth,
    tenure_months: u32,
    amount: Money,
    due_day: u32,
) -> LoanLedgerResult<Vec<ScheduleEntry>> {
    validate_due_day(due_day)?;

    (0..tenure_months)
        .map(|i| {
            let date = start.plus_months(i)?.clamped_date(due_day)?;
            Ok(ScheduleEntry::unpaid(date, amount))
        })
        .collect()
}

pub(crate) fn validate_due_day(due_day: u32) -> LoanLedgerResult<()> {
    if !(1..=MAX_DUE_DAY).contains(&due_day) {
        return Err(LoanLedgerError::invalid(
            "due_day",
            format!("must be between 1 and {MAX_DUE_DAY}, got {due_day}"),
        ));
    }
    Ok(())
}

/// Generate a schedule and wrap it in the standard output envelope.
pub fn generate_schedule(
    input: &ScheduleInput,
) -> LoanLedgerResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let tenure = u32::try_from(input.tenure_months.max(0)).map_err(|_| {
        LoanLedgerError::invalid("tenure_months", "exceeds the supported number of months")
    })?;
    if tenure == 0 {
        warnings.push("Tenure is not positive; schedule is empty".to_string());
    }
    if input.installment_amount <= Money::ZERO {
        warnings.push("Installment amount is not positive".to_string());
    }

    let entries = generate(input.start_month, tenure, input.installment_amount, input.due_day)?;
    let schedule = Schedule::new(entries);

    let output = ScheduleOutput {
        total_amount: schedule.total_amount(),
        first_due: schedule.entries().first().map(|e| e.date),
        last_due: schedule.entries().last().map(|e| e.date),
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly installment schedule with month-end clamping",
        input,
        warnings,
        elapsed,
        output,
    ))
}
