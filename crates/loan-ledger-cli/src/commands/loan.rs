use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;

use loan_ledger_core::reconciliation::checks::{self, CheckInput};
use loan_ledger_core::reconciliation::derived::{self, DeriveInput};
use loan_ledger_core::reconciliation::draft::{self, EditInput};
use loan_ledger_core::reconciliation::record::{self, RecordInput};
use loan_ledger_core::reconciliation::solver::{self, ReconcileInput};

use crate::input;

/// Arguments shared by the commands that take a loan draft
/// ({"terms": {...}, "schedule": [...], "state": {...}})
#[derive(Args)]
pub struct DraftArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for replaying edits over a draft
#[derive(Args)]
pub struct EditArgs {
    /// Path to JSON input file (draft plus "edits": [{"field": ..., "value": ...}])
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for building the persisted record
#[derive(Args)]
pub struct RecordArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Reconcile fees and rate before taking the snapshot
    #[arg(long)]
    pub settle: bool,
}

pub fn run_derive(args: DraftArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::require_payload(args.input.as_deref(), "Loan")?;
    let derive_input: DeriveInput = serde_json::from_value(data)?;
    let result = derived::derive_quantities(&derive_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_reconcile(args: DraftArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::require_payload(args.input.as_deref(), "Loan")?;
    let reconcile_input: ReconcileInput = serde_json::from_value(data)?;
    let result = solver::reconcile_terms(&reconcile_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_edit(args: EditArgs, today: NaiveDate) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::require_payload(args.input.as_deref(), "Loan")?;
    let edit_input: EditInput = input::with_today(data, today)?;
    let result = draft::apply_edits(&edit_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_check(args: DraftArgs, today: NaiveDate) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::require_payload(args.input.as_deref(), "Loan")?;
    let check_input: CheckInput = input::with_today(data, today)?;
    let result = checks::check_terms(&check_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_record(args: RecordArgs, today: NaiveDate) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::require_payload(args.input.as_deref(), "Loan")?;
    let mut record_input: RecordInput = input::with_today(data, today)?;
    record_input.settle |= args.settle;
    let result = record::build_record(&record_input)?;
    Ok(serde_json::to_value(result)?)
}
