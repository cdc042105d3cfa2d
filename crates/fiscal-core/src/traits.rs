use crate::error::ComplianceError;
use crate::jurisdiction::{Jurisdiction, JurisdictionRuleSet};
use crate::types::{ProvenanceNode, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Inclusive time range filter for transaction queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |f| ts >= f) && self.to.map_or(true, |t| ts <= t)
    }
}

/// Supplies the canonical transaction ledger. Ordering contract:
/// ascending by settlement timestamp; the returned set is finite and
/// already deduplicated.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn list_transactions(
        &self,
        user_id: &str,
        range: TimeRange,
    ) -> Result<Vec<Transaction>, ComplianceError>;
}

/// Supplies jurisdiction rule sets, typically backed by configuration
/// storage
#[async_trait]
pub trait JurisdictionProvider: Send + Sync {
    async fn rules(
        &self,
        jurisdiction: Jurisdiction,
    ) -> Result<JurisdictionRuleSet, ComplianceError>;
}

/// Graph-query collaborator for the fund-origin tracer, abstracting the
/// physical storage of the transaction graph
#[async_trait]
pub trait TransactionGraph: Send + Sync {
    /// Transactions whose destination is `address`, each paired with its
    /// attributed source node
    async fn incoming(
        &self,
        address: &str,
    ) -> Result<Vec<(Transaction, ProvenanceNode)>, ComplianceError>;
}
