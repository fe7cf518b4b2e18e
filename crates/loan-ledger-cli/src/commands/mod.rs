pub mod advice;
pub mod loan;
pub mod schedule;
