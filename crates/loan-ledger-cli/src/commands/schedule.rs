use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_ledger_core::calendar::YearMonth;
use loan_ledger_core::schedule::generator::{self, ScheduleInput};
use loan_ledger_core::schedule::summary::{self, SummaryInput};
use loan_ledger_core::schedule::validator::{self, ScheduleCheckInput, ToggleInput};

use crate::input;

/// Arguments for schedule generation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ScheduleArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// First installment month (YYYY-MM or YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<YearMonth>,

    /// Number of monthly installments
    #[arg(long, alias = "tenure-months")]
    pub tenure: Option<i64>,

    /// Amount of each installment
    #[arg(long, alias = "emi")]
    pub amount: Option<Decimal>,

    /// Day of month installments fall due (1-31)
    #[arg(long)]
    pub due_day: Option<u32>,
}

/// Arguments for schedule validation
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to JSON input file ({"schedule": [...], "today": "YYYY-MM-DD"})
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for marking an installment paid or unpaid
#[derive(Args)]
pub struct TogglePaidArgs {
    /// Path to JSON input file ({"schedule": [...], "index": n, "paid": bool})
    #[arg(long)]
    pub input: Option<String>,

    /// Installment index (0-based), overrides the input file
    #[arg(long)]
    pub index: Option<usize>,

    /// Mark unpaid instead of paid
    #[arg(long)]
    pub unpaid: bool,
}

/// Arguments for the schedule progress summary
#[derive(Args)]
pub struct SummaryArgs {
    /// Path to JSON input file ({"schedule": [...]})
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput =
        if let Some(data) = input::read_payload(args.input.as_deref())? {
            serde_json::from_value(data)?
        } else {
            ScheduleInput {
                start_month: args.start.ok_or("--start is required (or provide --input)")?,
                tenure_months: args.tenure.ok_or("--tenure is required (or provide --input)")?,
                installment_amount: args
                    .amount
                    .ok_or("--amount is required (or provide --input)")?,
                due_day: args.due_day.ok_or("--due-day is required (or provide --input)")?,
            }
        };

    let result = generator::generate_schedule(&schedule_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_validate(
    args: ValidateArgs,
    today: NaiveDate,
) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::require_payload(args.input.as_deref(), "Schedule")?;
    let check: ScheduleCheckInput = input::with_today(data, today)?;
    let result = validator::validate_schedule(&check)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_toggle_paid(
    args: TogglePaidArgs,
    today: NaiveDate,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut data = input::require_payload(args.input.as_deref(), "Schedule")?;
    if let Value::Object(map) = &mut data {
        if let Some(index) = args.index {
            map.insert("index".into(), index.into());
        }
        if args.unpaid {
            map.insert("paid".into(), Value::Bool(false));
        } else {
            map.entry("paid").or_insert(Value::Bool(true));
        }
    }
    let toggle: ToggleInput = input::with_today(data, today)?;
    let result = validator::toggle_paid(&toggle)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_summary(
    args: SummaryArgs,
    today: NaiveDate,
) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::require_payload(args.input.as_deref(), "Schedule")?;
    let summary_input: SummaryInput = input::with_today(data, today)?;
    let result = summary::summarize_schedule(&summary_input)?;
    Ok(serde_json::to_value(result)?)
}
