//! Schedule checks and the paid-status state machine.
//!
//! Paid installments always form a contiguous prefix of the schedule:
//! marking entry `i` paid pays every earlier entry too, and only the most
//! recent paid installment may be unpaid again. The checks here are plain
//! predicates; a failing check is a blocking condition for the caller, not an
//! error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

use crate::calendar::with_day_clamped;
use crate::error::LoanLedgerError;
use crate::types::{with_metadata, ComputationOutput, Money, ScheduleEntry};
use crate::LoanLedgerResult;

use super::generator::validate_due_day;

// ---------------------------------------------------------------------------
// Predicates over plain entry slices
// ---------------------------------------------------------------------------

/// Every date is on or after the previous one.
pub fn is_chronological(entries: &[ScheduleEntry]) -> bool {
    entries.windows(2).all(|pair| pair[0].date <= pair[1].date)
}

/// No paid entry is dated after `today`.
pub fn no_future_paid(entries: &[ScheduleEntry], today: NaiveDate) -> bool {
    !entries.iter().any(|e| e.is_paid && e.is_future(today))
}

/// Every paid entry carries a positive amount.
pub fn paid_have_positive_amount(entries: &[ScheduleEntry]) -> bool {
    entries
        .iter()
        .filter(|e| e.is_paid)
        .all(|e| e.amount > Money::ZERO)
}

/// Highest index that is paid and not in the future.
pub fn latest_paid_past_index(entries: &[ScheduleEntry], today: NaiveDate) -> Option<usize> {
    entries
        .iter()
        .rposition(|e| e.is_paid && !e.is_future(today))
}

/// Index of the first unpaid entry that is followed by a paid one, if any.
pub fn first_paid_gap(entries: &[ScheduleEntry]) -> Option<usize> {
    let last_paid = entries.iter().rposition(|e| e.is_paid)?;
    entries[..last_paid].iter().position(|e| !e.is_paid)
}

// ---------------------------------------------------------------------------
// Toggle rejections
// ---------------------------------------------------------------------------

/// Why a paid-status change was refused. The schedule is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToggleRejection {
    #[error("installment {index} does not exist (schedule has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("installment due on {date} is in the future and cannot be marked paid")]
    FutureDate { index: usize, date: NaiveDate },

    #[error("installment {index} has amount {amount}; only positive amounts can be marked paid")]
    NonPositiveAmount { index: usize, amount: Money },

    #[error("installment {index} is not the latest paid one (latest {latest:?})")]
    NotLatestPaid { index: usize, latest: Option<usize> },
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// The ordered installment list of one loan.
///
/// Construction never re-sorts: date edits may leave the list out of order and
/// [`Schedule::is_chronological`] reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule(Vec<ScheduleEntry>);

impl Schedule {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Schedule(entries)
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.0
    }

    pub fn into_entries(self) -> Vec<ScheduleEntry> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleEntry> {
        self.0.get(index)
    }

    pub fn total_amount(&self) -> Money {
        self.0.iter().map(|e| e.amount).sum()
    }

    pub fn paid_count(&self) -> usize {
        self.0.iter().filter(|e| e.is_paid).count()
    }

    pub fn is_chronological(&self) -> bool {
        is_chronological(&self.0)
    }

    pub fn no_future_paid(&self, today: NaiveDate) -> bool {
        no_future_paid(&self.0, today)
    }

    pub fn paid_have_positive_amount(&self) -> bool {
        paid_have_positive_amount(&self.0)
    }

    pub fn latest_paid_past_index(&self, today: NaiveDate) -> Option<usize> {
        latest_paid_past_index(&self.0, today)
    }

    pub fn is_paid_prefix(&self) -> bool {
        first_paid_gap(&self.0).is_none()
    }

    /// Mark entry `index` paid together with every entry before it.
    pub fn mark_paid(&mut self, index: usize, today: NaiveDate) -> Result<(), ToggleRejection> {
        let entry = self.entry_for_toggle(index)?;
        if entry.is_future(today) {
            return Err(ToggleRejection::FutureDate {
                index,
                date: entry.date,
            });
        }
        if entry.amount <= Money::ZERO {
            return Err(ToggleRejection::NonPositiveAmount {
                index,
                amount: entry.amount,
            });
        }

        for e in &mut self.0[..=index] {
            e.is_paid = true;
        }
        Ok(())
    }

    /// Unpay entry `index`; only allowed on the latest paid past installment.
    pub fn mark_unpaid(&mut self, index: usize, today: NaiveDate) -> Result<(), ToggleRejection> {
        self.entry_for_toggle(index)?;
        let latest = self.latest_paid_past_index(today);
        if latest != Some(index) {
            return Err(ToggleRejection::NotLatestPaid { index, latest });
        }
        self.0[index].is_paid = false;
        Ok(())
    }

    pub fn set_paid(
        &mut self,
        index: usize,
        paid: bool,
        today: NaiveDate,
    ) -> Result<(), ToggleRejection> {
        if paid {
            self.mark_paid(index, today)
        } else {
            self.mark_unpaid(index, today)
        }
    }

    /// Move entry `index` to `day` of its own month, clamped to the month's
    /// last day. Ordering is not re-checked here.
    pub fn set_day(&mut self, index: usize, day: u32) -> LoanLedgerResult<NaiveDate> {
        validate_due_day(day)?;
        let entry = self.entry_mut(index)?;
        entry.date = with_day_clamped(entry.date, day)?;
        Ok(entry.date)
    }

    /// Replace the amount of entry `index`. Non-positive amounts are accepted
    /// here and reported by the checks.
    pub fn set_amount(&mut self, index: usize, amount: Money) -> LoanLedgerResult<()> {
        self.entry_mut(index)?.amount = amount;
        Ok(())
    }

    /// Set every unpaid entry whose amount is still `from` to `to`.
    /// Returns how many entries changed.
    pub fn reprice_unpaid(&mut self, from: Money, to: Money) -> usize {
        let mut changed = 0;
        for e in self.0.iter_mut().filter(|e| !e.is_paid && e.amount == from) {
            e.amount = to;
            changed += 1;
        }
        changed
    }

    fn entry_for_toggle(&self, index: usize) -> Result<&ScheduleEntry, ToggleRejection> {
        self.0.get(index).ok_or(ToggleRejection::IndexOutOfRange {
            index,
            len: self.0.len(),
        })
    }

    fn entry_mut(&mut self, index: usize) -> LoanLedgerResult<&mut ScheduleEntry> {
        let len = self.0.len();
        self.0.get_mut(index).ok_or_else(|| {
            LoanLedgerError::invalid(
                "index",
                format!("installment {index} does not exist (schedule has {len})"),
            )
        })
    }
}

impl From<Vec<ScheduleEntry>> for Schedule {
    fn from(entries: Vec<ScheduleEntry>) -> Self {
        Schedule(entries)
    }
}

// ---------------------------------------------------------------------------
// Envelope operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCheckInput {
    pub schedule: Schedule,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleValidation {
    pub is_chronological: bool,
    pub no_future_paid: bool,
    pub paid_have_positive_amount: bool,
    pub paid_form_prefix: bool,
    pub latest_paid_past_index: Option<usize>,
    pub valid: bool,
}

/// Run every schedule predicate at once.
pub fn validate_schedule(
    input: &ScheduleCheckInput,
) -> LoanLedgerResult<ComputationOutput<ScheduleValidation>> {
    let start = Instant::now();
    let s = &input.schedule;

    let is_chronological = s.is_chronological();
    let no_future_paid = s.no_future_paid(input.today);
    let paid_have_positive_amount = s.paid_have_positive_amount();
    let paid_form_prefix = s.is_paid_prefix();

    let mut warnings = Vec::new();
    if s.is_empty() {
        warnings.push("Schedule is empty".to_string());
    }

    let output = ScheduleValidation {
        is_chronological,
        no_future_paid,
        paid_have_positive_amount,
        paid_form_prefix,
        latest_paid_past_index: s.latest_paid_past_index(input.today),
        valid: is_chronological && no_future_paid && paid_have_positive_amount && paid_form_prefix,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Schedule order, paid-prefix and amount checks",
        &serde_json::json!({ "today": input.today, "installments": s.len() }),
        warnings,
        elapsed,
        output,
    ))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleInput {
    pub schedule: Schedule,
    pub index: usize,
    pub paid: bool,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleOutput {
    pub schedule: Schedule,
    pub applied: bool,
    pub rejection: Option<ToggleRejection>,
    pub latest_paid_past_index: Option<usize>,
}

/// Apply one paid-status toggle. A rejection is reported in the output and
/// the schedule comes back unchanged.
pub fn toggle_paid(input: &ToggleInput) -> LoanLedgerResult<ComputationOutput<ToggleOutput>> {
    let start = Instant::now();
    let mut schedule = input.schedule.clone();
    let mut warnings = Vec::new();

    let rejection = schedule
        .set_paid(input.index, input.paid, input.today)
        .err();
    if let Some(r) = &rejection {
        warnings.push(r.to_string());
    }

    let output = ToggleOutput {
        applied: rejection.is_none(),
        latest_paid_past_index: schedule.latest_paid_past_index(input.today),
        rejection,
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Paid-prefix toggle (cascading mark, latest-only unmark)",
        &serde_json::json!({ "index": input.index, "paid": input.paid, "today": input.today }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Four monthly installments from Jan 2024; "today" is 2024-03-10.
    fn sample() -> (Schedule, NaiveDate) {
        let s = Schedule::new(vec![
            ScheduleEntry::unpaid(d(2024, 1, 5), dec!(1000)),
            ScheduleEntry::unpaid(d(2024, 2, 5), dec!(1000)),
            ScheduleEntry::unpaid(d(2024, 3, 5), dec!(1000)),
            ScheduleEntry::unpaid(d(2024, 4, 5), dec!(1000)),
        ]);
        (s, d(2024, 3, 10))
    }

    fn paid_flags(s: &Schedule) -> Vec<bool> {
        s.entries().iter().map(|e| e.is_paid).collect()
    }

    #[test]
    fn test_mark_paid_cascades() {
        let (mut s, today) = sample();
        s.mark_paid(2, today).unwrap();
        assert_eq!(paid_flags(&s), vec![true, true, true, false]);
        assert_eq!(s.latest_paid_past_index(today), Some(2));
    }

    #[test]
    fn test_mark_future_rejected() {
        let (mut s, today) = sample();
        let err = s.mark_paid(3, today).unwrap_err();
        assert_eq!(
            err,
            ToggleRejection::FutureDate {
                index: 3,
                date: d(2024, 4, 5)
            }
        );
        assert_eq!(paid_flags(&s), vec![false; 4]);
        assert!(s.no_future_paid(today));
    }

    #[test]
    fn test_due_today_is_not_future() {
        let (mut s, _) = sample();
        assert!(s.mark_paid(2, d(2024, 3, 5)).is_ok());
    }

    #[test]
    fn test_mark_zero_amount_rejected() {
        let (mut s, today) = sample();
        s.set_amount(1, dec!(0)).unwrap();
        assert!(matches!(
            s.mark_paid(1, today),
            Err(ToggleRejection::NonPositiveAmount { index: 1, .. })
        ));
    }

    #[test]
    fn test_unpay_only_latest() {
        let (mut s, today) = sample();
        s.mark_paid(2, today).unwrap();

        let err = s.mark_unpaid(0, today).unwrap_err();
        assert_eq!(
            err,
            ToggleRejection::NotLatestPaid {
                index: 0,
                latest: Some(2)
            }
        );

        s.mark_unpaid(2, today).unwrap();
        assert_eq!(s.latest_paid_past_index(today), Some(1));
        s.mark_unpaid(1, today).unwrap();
        s.mark_unpaid(0, today).unwrap();
        assert_eq!(s.latest_paid_past_index(today), None);
        assert_eq!(s.paid_count(), 0);
    }

    #[test]
    fn test_unpay_unpaid_rejected() {
        let (mut s, today) = sample();
        assert!(matches!(
            s.mark_unpaid(1, today),
            Err(ToggleRejection::NotLatestPaid { latest: None, .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let (mut s, today) = sample();
        assert_eq!(
            s.mark_paid(9, today),
            Err(ToggleRejection::IndexOutOfRange { index: 9, len: 4 })
        );
        assert!(s.set_amount(9, dec!(1)).is_err());
    }

    #[test]
    fn test_set_day_clamps_within_month() {
        let (mut s, _) = sample();
        let date = s.set_day(1, 31).unwrap();
        assert_eq!(date, d(2024, 2, 29));
        assert!(s.is_chronological());
    }

    #[test]
    fn test_chronology_after_manual_dates() {
        let s = Schedule::new(vec![
            ScheduleEntry::unpaid(d(2024, 1, 5), dec!(1)),
            ScheduleEntry::unpaid(d(2023, 12, 5), dec!(1)),
        ]);
        assert!(!s.is_chronological());

        let same_day = Schedule::new(vec![
            ScheduleEntry::unpaid(d(2024, 1, 5), dec!(1)),
            ScheduleEntry::unpaid(d(2024, 1, 5), dec!(1)),
        ]);
        assert!(same_day.is_chronological());
    }

    #[test]
    fn test_paid_prefix_detection() {
        let mut entries = sample().0.into_entries();
        entries[1].is_paid = true;
        let s = Schedule::new(entries);
        assert!(!s.is_paid_prefix());
        assert_eq!(first_paid_gap(s.entries()), Some(0));
    }

    #[test]
    fn test_reprice_unpaid_keeps_paid_and_custom() {
        let (mut s, today) = sample();
        s.mark_paid(0, today).unwrap();
        s.set_amount(2, dec!(1500)).unwrap();
        let changed = s.reprice_unpaid(dec!(1000), dec!(1100));
        assert_eq!(changed, 2);
        let amounts: Vec<Money> = s.entries().iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![dec!(1000), dec!(1100), dec!(1500), dec!(1100)]);
    }

    #[test]
    fn test_toggle_envelope_reports_rejection() {
        let (schedule, today) = sample();
        let input = ToggleInput {
            schedule: schedule.clone(),
            index: 3,
            paid: true,
            today,
        };
        let out = toggle_paid(&input).unwrap();
        assert!(!out.result.applied);
        assert_eq!(out.result.schedule, schedule);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_validate_schedule_flags() {
        let mut entries = sample().0.into_entries();
        entries[3].is_paid = true;
        let out = validate_schedule(&ScheduleCheckInput {
            schedule: Schedule::new(entries),
            today: d(2024, 3, 10),
        })
        .unwrap();
        assert!(out.result.is_chronological);
        assert!(!out.result.no_future_paid);
        assert!(!out.result.paid_form_prefix);
        assert!(!out.result.valid);
        assert_eq!(out.result.latest_paid_past_index, None);
    }
}
