use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComplianceError {
    /// Disposal exceeds recorded acquisitions for an asset. Data-integrity
    /// issue: surfaced to the caller, never patched without explicit
    /// configuration.
    #[error("insufficient inventory for {asset}: requested {requested}, available {available}")]
    InsufficientInventory {
        asset: String,
        requested: Decimal,
        available: Decimal,
    },

    /// Unknown accounting method string, or a method/jurisdiction
    /// combination the rule set does not permit.
    #[error("unsupported accounting method: {0}")]
    UnsupportedMethod(String),

    /// Reportable-transaction output failed structural validation.
    /// Terminal: regulatory submissions must not contain inferred data.
    #[error("reportable set failed schema validation: {}", .violations.join("; "))]
    SchemaValidationFailed { violations: Vec<String> },

    #[error("unknown jurisdiction code: {0}")]
    InvalidJurisdiction(String),

    #[error("data source error: {0}")]
    DataSource(String),
}
