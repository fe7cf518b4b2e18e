use chrono::{Datelike, NaiveDate};
use loan_ledger_core::calendar::{days_in_month, YearMonth};
use loan_ledger_core::schedule::generator::{self, ScheduleInput};
use loan_ledger_core::schedule::summary::{self, SummaryInput};
use loan_ledger_core::schedule::validator::{self, ToggleInput};
use loan_ledger_core::schedule::{Schedule, ToggleRejection};
use rust_decimal_macros::dec;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ===========================================================================
// Generator
// ===========================================================================

#[test]
fn test_generator_length_order_and_clamping() {
    for due_day in [1, 15, 28, 29, 30, 31] {
        for tenure in [1u32, 2, 11, 25, 60] {
            let start = YearMonth::new(2023, 11).unwrap();
            let entries = generator::generate(start, tenure, dec!(500), due_day).unwrap();
            assert_eq!(entries.len(), tenure as usize);

            for (i, e) in entries.iter().enumerate() {
                let month = start.plus_months(i as u32).unwrap();
                assert_eq!(YearMonth::of(e.date), month);
                assert_eq!(
                    e.date.day(),
                    due_day.min(days_in_month(month.year(), month.month()))
                );
            }
            for pair in entries.windows(2) {
                assert!(pair[0].date < pair[1].date);
            }
        }
    }
}

#[test]
fn test_scenario_d_leap_year_clamp() {
    let input = ScheduleInput {
        start_month: "2024-02".parse().unwrap(),
        tenure_months: 3,
        installment_amount: dec!(1000),
        due_day: 31,
    };
    let out = generator::generate_schedule(&input).unwrap();
    let dates: Vec<NaiveDate> = out.result.schedule.entries().iter().map(|e| e.date).collect();
    assert_eq!(dates, vec![d(2024, 2, 29), d(2024, 3, 31), d(2024, 4, 30)]);
}

#[test]
fn test_schedule_input_from_json() {
    let input: ScheduleInput = serde_json::from_str(
        r#"{
            "start_month": "2025-01-20",
            "tenure_months": 2,
            "installment_amount": 750.5,
            "due_day": 20
        }"#,
    )
    .unwrap();
    let out = generator::generate_schedule(&input).unwrap();
    assert_eq!(out.result.total_amount, dec!(1501));
    assert_eq!(out.result.first_due, Some(d(2025, 1, 20)));
}

// ===========================================================================
// Paid-prefix state machine
// ===========================================================================

fn year_schedule() -> Schedule {
    let start = YearMonth::new(2024, 1).unwrap();
    Schedule::new(generator::generate(start, 12, dec!(9000), 10).unwrap())
}

#[test]
fn test_cascade_invariant_over_every_index() {
    let today = d(2024, 8, 15);
    for i in 0..8 {
        let mut s = year_schedule();
        s.mark_paid(i, today).unwrap();
        for (j, e) in s.entries().iter().enumerate() {
            assert_eq!(e.is_paid, j <= i, "index {j} after marking {i}");
        }
        assert!(s.is_paid_prefix());
    }
}

#[test]
fn test_unpay_strictly_decreases_latest() {
    let today = d(2024, 8, 15);
    let mut s = year_schedule();
    s.mark_paid(7, today).unwrap();

    let mut latest = s.latest_paid_past_index(today);
    while let Some(i) = latest {
        s.mark_unpaid(i, today).unwrap();
        let next = s.latest_paid_past_index(today);
        if let Some(n) = next {
            assert!(n < i);
        }
        assert!(s.is_paid_prefix());
        latest = next;
    }
    assert_eq!(s.paid_count(), 0);
}

#[test]
fn test_scenario_c_future_mark_rejected() {
    let schedule = Schedule::new(
        generator::generate(YearMonth::new(2024, 5).unwrap(), 3, dec!(2000), 1).unwrap(),
    );
    let today = d(2024, 5, 20);
    let out = validator::toggle_paid(&ToggleInput {
        schedule: schedule.clone(),
        index: 1,
        paid: true,
        today,
    })
    .unwrap();

    assert_eq!(
        out.result.rejection,
        Some(ToggleRejection::FutureDate {
            index: 1,
            date: d(2024, 6, 1)
        })
    );
    assert_eq!(out.result.schedule, schedule);
    assert!(out.result.schedule.no_future_paid(today));
    assert_eq!(out.result.schedule.paid_count(), 0);
}

#[test]
fn test_toggle_input_accepts_camel_case_entries() {
    let input: ToggleInput = serde_json::from_str(
        r#"{
            "schedule": [
                {"date": "2024-01-05", "amount": "100", "isPaid": true},
                {"date": "2024-02-05", "amount": "100", "isPaid": false}
            ],
            "index": 0,
            "paid": false,
            "today": "2024-03-01"
        }"#,
    )
    .unwrap();
    let out = validator::toggle_paid(&input).unwrap();
    assert!(out.result.applied);
    assert_eq!(out.result.latest_paid_past_index, None);
}

// ===========================================================================
// Summary
// ===========================================================================

#[test]
fn test_summary_after_payments() {
    let today = d(2024, 4, 12);
    let mut s = year_schedule();
    s.mark_paid(2, today).unwrap();

    let out = summary::summarize_schedule(&SummaryInput {
        schedule: s,
        today,
    })
    .unwrap();
    let sum = out.result;
    assert_eq!(sum.paid_count, 3);
    assert_eq!(sum.paid_amount, dec!(27000));
    assert_eq!(sum.outstanding_amount, dec!(81000));
    assert_eq!(sum.completion_pct, dec!(25));
    assert_eq!(sum.overdue_count, 1);
    assert_eq!(sum.next_due.unwrap().date, d(2024, 4, 10));
    assert_eq!(out.warnings.len(), 1);
}
