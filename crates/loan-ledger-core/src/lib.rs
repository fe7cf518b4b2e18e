pub mod calendar;
pub mod error;
pub mod types;

#[cfg(feature = "schedule")]
pub mod schedule;

#[cfg(feature = "reconciliation")]
pub mod reconciliation;

#[cfg(feature = "advice")]
pub mod advice;

pub use error::LoanLedgerError;
pub use types::*;

/// Standard result type for all loan-ledger operations
pub type LoanLedgerResult<T> = Result<T, LoanLedgerError>;
