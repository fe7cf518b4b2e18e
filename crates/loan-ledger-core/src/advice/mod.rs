pub mod classifier;

pub use classifier::{classify, AdvicePolicy, LoanAdvice, RiskCategory};
