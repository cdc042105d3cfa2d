use chrono::Datelike;
use fiscal_core::{
    AccountingMethod, ComplianceError, Jurisdiction, JurisdictionRuleSet, ReplayPolicy,
    Transaction,
};
use lot_engine::{DisposalRequest, LotInventory, RealizedGainEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Realized gain/loss report for one (user, year, method). A pure
/// function of its inputs: identical transaction set, method, and rules
/// produce a byte-identical report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxReport {
    pub user_id: String,
    pub year: i32,
    pub method: AccountingMethod,
    pub jurisdiction: Jurisdiction,
    /// Gain events whose disposal fell inside the report year, in
    /// disposal order
    pub events: Vec<RealizedGainEvent>,
    pub short_term_gain: Decimal,
    pub long_term_gain: Decimal,
    pub total_realized_gain: Decimal,
    pub total_tax_amount: Decimal,
    /// Transactions settled inside the report year
    pub transaction_count: usize,
    pub warnings: Vec<String>,
}

/// A failed report computation: the error kind plus the in-year gain
/// events computed before the failure, for diagnostics. Never a
/// best-effort number.
#[derive(Error, Debug, Clone)]
#[error("{kind}")]
pub struct TaxReportError {
    pub kind: ComplianceError,
    pub partial_events: Vec<RealizedGainEvent>,
}

impl From<ComplianceError> for TaxReportError {
    fn from(kind: ComplianceError) -> Self {
        Self {
            kind,
            partial_events: Vec::new(),
        }
    }
}

/// Replays disposal history from the start of record and folds the
/// target year's events into a report under one jurisdiction's rules
#[derive(Debug, Clone)]
pub struct TaxReporter {
    rules: JurisdictionRuleSet,
    policy: ReplayPolicy,
}

impl TaxReporter {
    pub fn new(rules: JurisdictionRuleSet) -> Self {
        let policy = rules.replay_policy();
        Self { rules, policy }
    }

    /// Override the replay policy (synthetic-inventory opt-in)
    pub fn with_policy(mut self, policy: ReplayPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn rules(&self) -> &JurisdictionRuleSet {
        &self.rules
    }

    pub(crate) fn policy(&self) -> ReplayPolicy {
        self.policy
    }

    /// Compute the report for a calendar year (UTC, inclusive on both
    /// ends). The whole history is replayed so lot ages are correct, but
    /// only events disposed inside the year are accumulated.
    pub fn calculate(
        &self,
        user_id: &str,
        year: i32,
        method: AccountingMethod,
        transactions: &[Transaction],
    ) -> Result<TaxReport, TaxReportError> {
        if !self.rules.allows_method(method) {
            return Err(ComplianceError::UnsupportedMethod(format!(
                "{} not permitted in {}",
                method, self.rules.jurisdiction
            ))
            .into());
        }

        let mut ordered: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| tx.user_id == user_id)
            .collect();
        ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        let mut inventory = LotInventory::new(self.policy);
        let mut year_events: Vec<RealizedGainEvent> = Vec::new();

        for tx in &ordered {
            match self.replay_transaction(&mut inventory, tx, method) {
                Ok(events) => {
                    year_events.extend(
                        events
                            .into_iter()
                            .filter(|e| e.disposed_at.year() == year),
                    );
                }
                Err(kind) => {
                    warn!(tx_id = %tx.id, %kind, "replay aborted");
                    return Err(TaxReportError {
                        kind,
                        partial_events: year_events,
                    });
                }
            }
        }

        let transaction_count = ordered
            .iter()
            .filter(|tx| tx.timestamp.year() == year)
            .count();

        Ok(self.fold_report(user_id, year, method, year_events, transaction_count, &inventory))
    }

    /// Apply one transaction to the inventory, returning any realized
    /// gain events
    fn replay_transaction(
        &self,
        inventory: &mut LotInventory,
        tx: &Transaction,
        method: AccountingMethod,
    ) -> Result<Vec<RealizedGainEvent>, ComplianceError> {
        if tx.tx_type.is_acquisition() {
            match (tx.asset_in.as_deref(), tx.acquisition_unit_cost()) {
                (Some(asset), Some(unit_cost)) => {
                    inventory.acquire(
                        asset,
                        tx.amount_in,
                        unit_cost,
                        tx.timestamp,
                        tx.exchange_id.clone(),
                        &tx.id,
                        tx.fee_amount,
                    );
                }
                _ => warn!(tx_id = %tx.id, "acquisition with no usable legs, skipped"),
            }
            return Ok(Vec::new());
        }

        if tx.tx_type.is_disposal() {
            let (asset, unit_price) = match (tx.asset_out.as_deref(), tx.disposal_unit_price()) {
                (Some(asset), Some(price)) => (asset, price),
                _ => {
                    warn!(tx_id = %tx.id, "disposal with no usable legs, skipped");
                    return Ok(Vec::new());
                }
            };
            return inventory
                .dispose(&DisposalRequest {
                    asset: asset.to_string(),
                    quantity: tx.amount_out,
                    unit_price,
                    disposed_at: tx.timestamp,
                    fee: tx.fee_amount,
                    method,
                    tx_id: tx.id.clone(),
                    counterpart_source: tx.exchange_id.clone(),
                })
                .map(|outcome| outcome.events);
        }

        // Transfers between own custody and fee deductions move no
        // taxable inventory
        debug!(tx_id = %tx.id, tx_type = %tx.tx_type, "non-taxable transaction");
        Ok(Vec::new())
    }

    fn fold_report(
        &self,
        user_id: &str,
        year: i32,
        method: AccountingMethod,
        events: Vec<RealizedGainEvent>,
        transaction_count: usize,
        inventory: &LotInventory,
    ) -> TaxReport {
        let threshold = self.rules.long_term_threshold_days;
        let mut short_term_gain = Decimal::ZERO;
        let mut long_term_gain = Decimal::ZERO;
        for event in &events {
            if event.holding_period_days > threshold {
                long_term_gain += event.gain;
            } else {
                short_term_gain += event.gain;
            }
        }

        let total_tax_amount = self.tax_for_buckets(short_term_gain, long_term_gain);

        TaxReport {
            user_id: user_id.to_string(),
            year,
            method,
            jurisdiction: self.rules.jurisdiction,
            short_term_gain,
            long_term_gain,
            total_realized_gain: short_term_gain + long_term_gain,
            total_tax_amount,
            transaction_count,
            warnings: inventory.warnings().to_vec(),
            events,
        }
    }

    /// Apply the rate schedule to the two buckets. With loss
    /// carryforward enabled, a negative short-term aggregate offsets the
    /// long-term bucket before tax; the reverse offset is never applied.
    /// Each bucket's tax floors at zero.
    pub(crate) fn tax_for_buckets(&self, short_term: Decimal, long_term: Decimal) -> Decimal {
        let (short_taxable, long_taxable) =
            if self.rules.loss_carryforward && short_term < Decimal::ZERO {
                (Decimal::ZERO, long_term + short_term)
            } else {
                (short_term, long_term)
            };

        short_taxable.max(Decimal::ZERO) * self.rules.short_term_rate
            + long_taxable.max(Decimal::ZERO) * self.rules.long_term_rate
    }
}
