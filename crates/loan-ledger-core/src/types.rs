use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages exactly as the user enters them (8.5 = 8.5%).
pub type Percent = Decimal;

/// One installment of a repayment schedule.
///
/// Field names follow the persisted record shape (`isPaid`), with the
/// snake_case spelling accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(default, rename = "isPaid", alias = "is_paid")]
    pub is_paid: bool,
}

impl ScheduleEntry {
    pub fn unpaid(date: NaiveDate, amount: Money) -> Self {
        ScheduleEntry {
            date,
            amount,
            is_paid: false,
        }
    }

    /// True when the entry falls strictly after `today`.
    pub fn is_future(&self, today: NaiveDate) -> bool {
        self.date > today
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Round a money or percentage figure for presentation (2 decimal places).
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp(2)
}
