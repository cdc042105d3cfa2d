//! Reportable-Transaction Classifier
//!
//! A transaction is reportable when all configured criteria hold: its
//! type is in the jurisdiction's reportable set, its fiat notional
//! meets the threshold, and its counterpart is cross-border.

use chrono::{DateTime, Datelike, Utc};
use fiscal_core::{
    ComplianceError, EntitySource, Jurisdiction, JurisdictionRuleSet, Transaction, TxType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One transaction meeting the reporting criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportableTransaction {
    pub tx_id: String,
    pub tx_type: TxType,
    pub timestamp: DateTime<Utc>,
    pub asset: String,
    pub amount: Decimal,
    pub notional_value: Decimal,
    pub counterpart_exchange: Option<String>,
    pub cross_border: bool,
    /// Names of the criteria the transaction matched
    pub criteria: Vec<String>,
}

/// Classifier output for one (user, year, jurisdiction)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportableSet {
    pub user_id: String,
    pub year: i32,
    pub jurisdiction: Jurisdiction,
    pub entries: Vec<ReportableTransaction>,
}

/// Applies one jurisdiction's reportable criteria
#[derive(Debug, Clone)]
pub struct ReportableTransactionClassifier {
    rules: JurisdictionRuleSet,
}

impl ReportableTransactionClassifier {
    pub fn new(rules: JurisdictionRuleSet) -> Self {
        Self { rules }
    }

    /// Classify a user's transactions for one calendar year. The result
    /// is schema-validated before acceptance; a violation is terminal.
    pub fn classify(
        &self,
        user_id: &str,
        year: i32,
        transactions: &[Transaction],
    ) -> Result<ReportableSet, ComplianceError> {
        let mut entries = Vec::new();

        for tx in transactions {
            if tx.user_id != user_id || tx.timestamp.year() != year {
                continue;
            }
            if let Some(entry) = self.classify_one(tx) {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.tx_id.cmp(&b.tx_id)));

        debug!(
            user_id,
            year,
            count = entries.len(),
            "classified reportable transactions"
        );

        let set = ReportableSet {
            user_id: user_id.to_string(),
            year,
            jurisdiction: self.rules.jurisdiction,
            entries,
        };
        crate::schema::validate_reportable_set(&set)?;
        Ok(set)
    }

    fn classify_one(&self, tx: &Transaction) -> Option<ReportableTransaction> {
        if !self.rules.reportable_types.contains(&tx.tx_type) {
            return None;
        }

        let notional = tx.notional_value()?;
        if notional < self.rules.reportable_threshold {
            return None;
        }

        if !self.is_cross_border(tx) {
            return None;
        }

        let asset = match tx.tx_type {
            TxType::Sell => tx.asset_out.clone(),
            _ => tx.moved_asset().map(|s| s.to_string()),
        }?;

        Some(ReportableTransaction {
            tx_id: tx.id.clone(),
            tx_type: tx.tx_type,
            timestamp: tx.timestamp,
            asset,
            amount: tx.moved_amount(),
            notional_value: notional,
            counterpart_exchange: tx.exchange_id.clone(),
            cross_border: true,
            criteria: vec![
                "reportable-type".to_string(),
                "notional-threshold".to_string(),
                "cross-border".to_string(),
            ],
        })
    }

    /// A counterpart is cross-border when its exchange is not on the
    /// jurisdiction's domestic list, or when the counterpart is a DEX or
    /// DeFi protocol with no home jurisdiction at all
    fn is_cross_border(&self, tx: &Transaction) -> bool {
        if let Some(id) = tx.exchange_id.as_deref() {
            return !self
                .rules
                .domestic_exchange_ids
                .iter()
                .any(|d| d.eq_ignore_ascii_case(id));
        }
        matches!(
            tx.destination_type.or(tx.source_type),
            Some(EntitySource::Dex) | Some(EntitySource::Defi)
        )
    }
}
