use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::{round2, with_metadata, ComputationOutput, Money, Percent};
use crate::LoanLedgerResult;

use super::validator::Schedule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryInput {
    pub schedule: Schedule,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextInstallment {
    pub index: usize,
    pub date: NaiveDate,
    pub amount: Money,
    /// Negative when the installment is already overdue.
    pub days_until_due: i64,
}

/// Dashboard figures for one loan's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub installments: usize,
    pub paid_count: usize,
    pub overdue_count: usize,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub outstanding_amount: Money,
    /// Share of installments paid, 0-100.
    pub completion_pct: Percent,
    pub next_due: Option<NextInstallment>,
    pub final_due: Option<NaiveDate>,
}

pub fn summarize(schedule: &Schedule, today: NaiveDate) -> ScheduleSummary {
    let entries = schedule.entries();

    let mut paid_count = 0;
    let mut overdue_count = 0;
    let mut paid_amount = Decimal::ZERO;
    let mut total_amount = Decimal::ZERO;
    for e in entries {
        total_amount += e.amount;
        if e.is_paid {
            paid_count += 1;
            paid_amount += e.amount;
        } else if e.date < today {
            overdue_count += 1;
        }
    }

    let next_due = entries
        .iter()
        .enumerate()
        .find(|(_, e)| !e.is_paid)
        .map(|(index, e)| NextInstallment {
            index,
            date: e.date,
            amount: e.amount,
            days_until_due: (e.date - today).num_days(),
        });

    let completion_pct = if entries.is_empty() {
        Decimal::ZERO
    } else {
        round2(Decimal::from(paid_count as u64) / Decimal::from(entries.len() as u64) * dec!(100))
    };

    ScheduleSummary {
        installments: entries.len(),
        paid_count,
        overdue_count,
        total_amount,
        paid_amount,
        outstanding_amount: total_amount - paid_amount,
        completion_pct,
        next_due,
        final_due: entries.iter().map(|e| e.date).max(),
    }
}

pub fn summarize_schedule(
    input: &SummaryInput,
) -> LoanLedgerResult<ComputationOutput<ScheduleSummary>> {
    let start = Instant::now();
    let summary = summarize(&input.schedule, input.today);

    let mut warnings = Vec::new();
    if summary.overdue_count > 0 {
        warnings.push(format!(
            "{} installment(s) past due and not marked paid",
            summary.overdue_count
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Schedule progress summary",
        &serde_json::json!({ "today": input.today }),
        warnings,
        elapsed,
        summary,
    ))
}
