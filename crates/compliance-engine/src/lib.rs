//! Compliance Engine
//!
//! Facade wiring the injected data collaborators to the core
//! operations: tax report calculation, reportable-transaction
//! generation, proof-of-origin tracing, and disposal estimates. Every
//! computation is a pure function over the snapshot the collaborators
//! return, so concurrent invocations need no synchronization.

use chrono::{DateTime, Utc};
use dac8_reporter::{ReportableSet, ReportableTransactionClassifier};
use dashmap::DashMap;
use fiscal_core::{
    AccountingMethod, ComplianceError, InsufficientInventoryPolicy, Jurisdiction,
    JurisdictionRuleSet, JurisdictionProvider, ReplayPolicy, TimeRange, TransactionGraph,
    TransactionSource,
};
use origin_tracer::{OriginTracer, ProofDocument, TracerConfig};
use rust_decimal::Decimal;
use std::sync::Arc;
use tax_reporter::{TaxEstimate, TaxReport, TaxReportError, TaxReporter};
use tracing::info;

pub struct ComplianceEngine {
    transactions: Arc<dyn TransactionSource>,
    jurisdictions: Arc<dyn JurisdictionProvider>,
    graph: Arc<dyn TransactionGraph>,
    tracer: OriginTracer,
    insufficient_inventory: InsufficientInventoryPolicy,
    /// Rule sets change rarely; cache per jurisdiction
    rules_cache: DashMap<Jurisdiction, JurisdictionRuleSet>,
}

impl ComplianceEngine {
    pub fn new(
        transactions: Arc<dyn TransactionSource>,
        jurisdictions: Arc<dyn JurisdictionProvider>,
        graph: Arc<dyn TransactionGraph>,
    ) -> Self {
        Self {
            transactions,
            jurisdictions,
            graph,
            tracer: OriginTracer::default(),
            insufficient_inventory: InsufficientInventoryPolicy::default(),
            rules_cache: DashMap::new(),
        }
    }

    /// Replace the tracer configuration
    pub fn with_tracer_config(mut self, config: TracerConfig) -> Self {
        self.tracer = OriginTracer::new(config);
        self
    }

    /// Opt in to synthetic zero-basis lots instead of rejecting
    /// disposals that exceed inventory
    pub fn with_insufficient_inventory_policy(
        mut self,
        policy: InsufficientInventoryPolicy,
    ) -> Self {
        self.insufficient_inventory = policy;
        self
    }

    /// Realized gain/loss report for one (user, year, method,
    /// jurisdiction)
    pub async fn calculate_tax_report(
        &self,
        user_id: &str,
        year: i32,
        method: AccountingMethod,
        jurisdiction: Jurisdiction,
    ) -> Result<TaxReport, TaxReportError> {
        let rules = self.rules_for(jurisdiction).await?;
        let transactions = self
            .transactions
            .list_transactions(user_id, TimeRange::default())
            .await?;

        info!(user_id, year, %method, %jurisdiction, count = transactions.len(),
            "calculating tax report");

        let reporter = TaxReporter::new(rules.clone()).with_policy(ReplayPolicy {
            fee_policy: rules.fee_policy,
            insufficient_inventory: self.insufficient_inventory,
        });
        reporter.calculate(user_id, year, method, &transactions)
    }

    /// Cross-border reportable transactions for one (user, year,
    /// jurisdiction), schema-validated
    pub async fn generate_reportable_transactions(
        &self,
        user_id: &str,
        year: i32,
        jurisdiction: Jurisdiction,
    ) -> Result<ReportableSet, ComplianceError> {
        let rules = self.rules_for(jurisdiction).await?;
        let transactions = self
            .transactions
            .list_transactions(user_id, TimeRange::default())
            .await?;

        info!(user_id, year, %jurisdiction, "generating reportable transactions");
        ReportableTransactionClassifier::new(rules).classify(user_id, year, &transactions)
    }

    /// Proof-of-origin document for a target wallet
    pub async fn generate_proof_of_origin(
        &self,
        target_wallet: &str,
        max_depth: Option<usize>,
        top_k: Option<usize>,
    ) -> Result<ProofDocument, ComplianceError> {
        info!(target_wallet, "tracing fund origin");
        self.tracer
            .trace(self.graph.as_ref(), target_wallet, max_depth, top_k)
            .await
    }

    /// What-if tax impact of a prospective disposal
    #[allow(clippy::too_many_arguments)]
    pub async fn estimate_disposal(
        &self,
        user_id: &str,
        jurisdiction: Jurisdiction,
        method: AccountingMethod,
        asset: &str,
        quantity: Decimal,
        unit_price: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TaxEstimate, TaxReportError> {
        let rules = self.rules_for(jurisdiction).await?;
        let transactions = self
            .transactions
            .list_transactions(user_id, TimeRange { from: None, to: Some(at) })
            .await?;

        TaxReporter::new(rules).estimate_disposal(
            user_id,
            &transactions,
            method,
            asset,
            quantity,
            unit_price,
            at,
        )
    }

    async fn rules_for(
        &self,
        jurisdiction: Jurisdiction,
    ) -> Result<JurisdictionRuleSet, ComplianceError> {
        if let Some(rules) = self.rules_cache.get(&jurisdiction) {
            return Ok(rules.clone());
        }
        let rules = self.jurisdictions.rules(jurisdiction).await?;
        self.rules_cache.insert(jurisdiction, rules.clone());
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use fiscal_core::{EntitySource, ProvenanceNode, Transaction, TxType};
    use origin_tracer::MemoryGraph;
    use rust_decimal_macros::dec;

    struct FakeLedger {
        transactions: Vec<Transaction>,
    }

    #[async_trait]
    impl TransactionSource for FakeLedger {
        async fn list_transactions(
            &self,
            user_id: &str,
            range: TimeRange,
        ) -> Result<Vec<Transaction>, ComplianceError> {
            Ok(self
                .transactions
                .iter()
                .filter(|tx| tx.user_id == user_id && range.contains(tx.timestamp))
                .cloned()
                .collect())
        }
    }

    struct PresetRules;

    #[async_trait]
    impl JurisdictionProvider for PresetRules {
        async fn rules(
            &self,
            jurisdiction: Jurisdiction,
        ) -> Result<JurisdictionRuleSet, ComplianceError> {
            Ok(JurisdictionRuleSet::for_jurisdiction(jurisdiction))
        }
    }

    struct EmptyGraph;

    #[async_trait]
    impl TransactionGraph for EmptyGraph {
        async fn incoming(
            &self,
            _address: &str,
        ) -> Result<Vec<(Transaction, ProvenanceNode)>, ComplianceError> {
            Ok(Vec::new())
        }
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(n)
    }

    fn buy(id: &str, at: DateTime<Utc>, qty: Decimal, fiat_cost: Decimal) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            timestamp: at,
            tx_type: TxType::Buy,
            asset_in: Some("BTC".to_string()),
            asset_out: Some("EUR".to_string()),
            amount_in: qty,
            amount_out: fiat_cost,
            source_address: None,
            destination_address: None,
            source_type: Some(EntitySource::Exchange),
            destination_type: Some(EntitySource::Wallet),
            exchange_id: Some("binance".to_string()),
            fee_amount: Decimal::ZERO,
            fee_asset: None,
            tx_hash: None,
            fiat_value: Some(fiat_cost),
            data_confidence: 1.0,
        }
    }

    fn sell(id: &str, at: DateTime<Utc>, qty: Decimal, fiat_proceeds: Decimal) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            timestamp: at,
            tx_type: TxType::Sell,
            asset_in: Some("EUR".to_string()),
            asset_out: Some("BTC".to_string()),
            amount_in: fiat_proceeds,
            amount_out: qty,
            source_address: None,
            destination_address: None,
            source_type: Some(EntitySource::Wallet),
            destination_type: Some(EntitySource::Exchange),
            exchange_id: Some("binance".to_string()),
            fee_amount: Decimal::ZERO,
            fee_asset: None,
            tx_hash: None,
            fiat_value: Some(fiat_proceeds),
            data_confidence: 1.0,
        }
    }

    fn engine_with(transactions: Vec<Transaction>) -> ComplianceEngine {
        ComplianceEngine::new(
            Arc::new(FakeLedger { transactions }),
            Arc::new(PresetRules),
            Arc::new(EmptyGraph),
        )
    }

    #[tokio::test]
    async fn test_calculate_tax_report_end_to_end() {
        let engine = engine_with(vec![
            buy("b1", day(0), dec!(1), dec!(10000)),
            sell("s1", day(30), dec!(1), dec!(15000)),
        ]);

        let report = engine
            .calculate_tax_report("user-1", 2024, AccountingMethod::Fifo, Jurisdiction::Us)
            .await
            .unwrap();

        assert_eq!(report.total_realized_gain, dec!(5000));
        assert_eq!(report.jurisdiction, Jurisdiction::Us);
    }

    #[tokio::test]
    async fn test_method_not_allowed_in_jurisdiction() {
        let engine = engine_with(vec![buy("b1", day(0), dec!(1), dec!(10000))]);

        let err = engine
            .calculate_tax_report("user-1", 2024, AccountingMethod::Hifo, Jurisdiction::Es)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ComplianceError::UnsupportedMethod(_)));
    }

    #[tokio::test]
    async fn test_reportable_transactions_cross_border() {
        let engine = engine_with(vec![
            buy("b1", day(0), dec!(1), dec!(10000)),
            sell("s1", day(30), dec!(1), dec!(15000)),
        ]);

        let set = engine
            .generate_reportable_transactions("user-1", 2024, Jurisdiction::Es)
            .await
            .unwrap();

        // The sale on a non-domestic exchange is reportable; the buy is
        // not a reportable type
        assert_eq!(set.entries.len(), 1);
        assert_eq!(set.entries[0].tx_id, "s1");
    }

    #[tokio::test]
    async fn test_proof_of_origin_uses_injected_graph() {
        let txs = vec![Transaction {
            id: "t1".to_string(),
            user_id: "user-1".to_string(),
            timestamp: day(0),
            tx_type: TxType::Transfer,
            asset_in: None,
            asset_out: Some("BTC".to_string()),
            amount_in: Decimal::ZERO,
            amount_out: dec!(1),
            source_address: Some("kraken-hot".to_string()),
            destination_address: Some("wallet-a".to_string()),
            source_type: Some(EntitySource::Cex),
            destination_type: Some(EntitySource::Wallet),
            exchange_id: Some("kraken".to_string()),
            fee_amount: Decimal::ZERO,
            fee_asset: None,
            tx_hash: None,
            fiat_value: None,
            data_confidence: 1.0,
        }];
        let mut graph = MemoryGraph::from_transactions(&txs, TracerConfig::default());
        graph.attribute_exchange("kraken-hot");

        let engine = ComplianceEngine::new(
            Arc::new(FakeLedger {
                transactions: Vec::new(),
            }),
            Arc::new(PresetRules),
            Arc::new(graph),
        );

        let doc = engine
            .generate_proof_of_origin("wallet-a", None, None)
            .await
            .unwrap();
        assert_eq!(doc.paths.len(), 1);
        assert_eq!(doc.paths[0].terminal.identity, "kraken-hot");
    }

    #[tokio::test]
    async fn test_estimate_disposal_passthrough() {
        let engine = engine_with(vec![buy("b1", day(0), dec!(1), dec!(10000))]);

        let estimate = engine
            .estimate_disposal(
                "user-1",
                Jurisdiction::Us,
                AccountingMethod::Fifo,
                "BTC",
                dec!(0.5),
                dec!(30000),
                day(30),
            )
            .await
            .unwrap();
        assert_eq!(estimate.realized_gain, dec!(10000));
    }

    #[tokio::test]
    async fn test_rules_are_cached() {
        let engine = engine_with(Vec::new());
        let first = engine.rules_for(Jurisdiction::Es).await.unwrap();
        let second = engine.rules_for(Jurisdiction::Es).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.rules_cache.len(), 1);
    }
}
