pub mod checks;
pub mod derived;
pub mod draft;
pub mod record;
pub mod solver;
pub mod terms;

pub use draft::{LoanDraft, TermsEdit};
pub use solver::{reconcile, SolverState};
pub use terms::{LoanKind, LoanTerms, LoanTermsInput};
