//! Persistence reconciliation for SandGrains.
//!
//! Ties the baseline lookup, the expectancy calculation and the storage
//! backend together, keeping one record per identity.

#![warn(missing_docs)]

pub mod calculator;
pub mod reconciler;
pub mod session;

pub use calculator::{CalculationOutcome, Calculator, PurgeReport, PurgeScope};
pub use reconciler::{ReconcileError, Reconciled, Reconciler};
pub use session::{establish_session, AccountProvider, Credentials, Session, SessionError, TrustedAccounts, View};
