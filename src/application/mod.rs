// Application layer - the services a front end talks to.
// IdentityService owns the session, ExpenseLedger follows it and owns the
// signed-in user's expenses.

pub mod error;
mod identity;
mod ledger;
mod observable;
pub mod reporting;

pub use error::*;
pub use identity::*;
pub use ledger::*;
pub use observable::*;
pub use reporting::{CategoryReport, CategorySummary, LedgerSummary};
