//! Structural Schema Validation
//!
//! Fixed schema for the reportable set. Regulatory submissions must not
//! contain inferred data: a violation is a terminal error surfaced to
//! the caller, never auto-corrected or silently dropped.

use crate::classifier::ReportableSet;
use chrono::Datelike;
use fiscal_core::ComplianceError;
use rust_decimal::Decimal;

/// Validate every entry of the set against the required-field schema.
/// All violations are collected so the caller sees the full defect list
/// in one pass.
pub fn validate_reportable_set(set: &ReportableSet) -> Result<(), ComplianceError> {
    let mut violations = Vec::new();

    if set.user_id.is_empty() {
        violations.push("user_id must be present".to_string());
    }

    for (i, entry) in set.entries.iter().enumerate() {
        let at = |field: &str, problem: &str| format!("entries[{}].{}: {}", i, field, problem);

        if entry.tx_id.is_empty() {
            violations.push(at("tx_id", "must be present"));
        }
        if entry.asset.is_empty() {
            violations.push(at("asset", "must be present"));
        }
        if entry.amount <= Decimal::ZERO {
            violations.push(at("amount", "must be positive"));
        }
        if entry.notional_value < Decimal::ZERO {
            violations.push(at("notional_value", "must not be negative"));
        }
        if entry.timestamp.year() != set.year {
            violations.push(at("timestamp", "must fall inside the report year"));
        }
        if entry.criteria.is_empty() {
            violations.push(at("criteria", "must name at least one matched rule"));
        }
        if let Some(exchange) = &entry.counterpart_exchange {
            if exchange.is_empty() {
                violations.push(at("counterpart_exchange", "must not be an empty string"));
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ComplianceError::SchemaValidationFailed { violations })
    }
}
