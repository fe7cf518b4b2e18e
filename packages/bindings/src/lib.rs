use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse a JSON payload, supplying the local date as `today` when the caller
/// left it out.
fn parse_dated<T: DeserializeOwned>(input_json: &str) -> NapiResult<T> {
    let mut value: serde_json::Value = serde_json::from_str(input_json).map_err(to_napi_error)?;
    if let serde_json::Value::Object(map) = &mut value {
        map.entry("today").or_insert_with(|| {
            serde_json::Value::String(chrono::Local::now().date_naive().to_string())
        });
    }
    serde_json::from_value(value).map_err(to_napi_error)
}

fn to_json<T: Serialize>(output: &T) -> NapiResult<String> {
    serde_json::to_string(output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_schedule(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::schedule::generator::ScheduleInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        loan_ledger_core::schedule::generator::generate_schedule(&input).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn validate_schedule(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::schedule::validator::ScheduleCheckInput =
        parse_dated(&input_json)?;
    let output =
        loan_ledger_core::schedule::validator::validate_schedule(&input).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn toggle_paid(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::schedule::validator::ToggleInput = parse_dated(&input_json)?;
    let output =
        loan_ledger_core::schedule::validator::toggle_paid(&input).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn summarize_schedule(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::schedule::summary::SummaryInput = parse_dated(&input_json)?;
    let output =
        loan_ledger_core::schedule::summary::summarize_schedule(&input).map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[napi]
pub fn derive_quantities(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::reconciliation::derived::DeriveInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_ledger_core::reconciliation::derived::derive_quantities(&input)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn reconcile_terms(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::reconciliation::solver::ReconcileInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_ledger_core::reconciliation::solver::reconcile_terms(&input)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn apply_edits(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::reconciliation::draft::EditInput = parse_dated(&input_json)?;
    let output =
        loan_ledger_core::reconciliation::draft::apply_edits(&input).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn check_terms(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::reconciliation::checks::CheckInput = parse_dated(&input_json)?;
    let output =
        loan_ledger_core::reconciliation::checks::check_terms(&input).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn build_record(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::reconciliation::record::RecordInput = parse_dated(&input_json)?;
    let output =
        loan_ledger_core::reconciliation::record::build_record(&input).map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Advice
// ---------------------------------------------------------------------------

#[napi]
pub fn classify_rate(input_json: String) -> NapiResult<String> {
    let input: loan_ledger_core::advice::classifier::AdviceInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        loan_ledger_core::advice::classifier::classify_rate(&input).map_err(to_napi_error)?;
    to_json(&output)
}
