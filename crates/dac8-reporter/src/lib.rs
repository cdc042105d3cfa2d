//! DAC8 Reporter
//!
//! Filters a user's transactions against jurisdiction-specific
//! cross-border reporting criteria and validates the produced set
//! against a fixed structural schema before acceptance.

pub mod classifier;
pub mod schema;

pub use classifier::{ReportableSet, ReportableTransaction, ReportableTransactionClassifier};
pub use schema::validate_reportable_set;
