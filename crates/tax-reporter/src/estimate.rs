//! Disposal Estimates
//!
//! What-if tax impact of a hypothetical disposal against the current
//! open inventory. Nothing is mutated; the real inventory is rebuilt
//! from the same history on the next report run.

use crate::report::{TaxReporter, TaxReportError};
use chrono::{DateTime, Utc};
use fiscal_core::{AccountingMethod, ComplianceError, Transaction};
use lot_engine::{DisposalRequest, LotInventory, RealizedGainEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Estimated tax impact of a prospective disposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxEstimate {
    pub asset: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub realized_gain: Decimal,
    pub short_term_gain: Decimal,
    pub long_term_gain: Decimal,
    pub estimated_tax: Decimal,
    pub events: Vec<RealizedGainEvent>,
}

impl TaxReporter {
    /// Estimate the gain and tax a disposal of `quantity` units of
    /// `asset` at `unit_price` on `at` would realize, given the history
    /// up to that moment
    #[allow(clippy::too_many_arguments)]
    pub fn estimate_disposal(
        &self,
        user_id: &str,
        transactions: &[Transaction],
        method: AccountingMethod,
        asset: &str,
        quantity: Decimal,
        unit_price: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TaxEstimate, TaxReportError> {
        if !self.rules().allows_method(method) {
            return Err(ComplianceError::UnsupportedMethod(format!(
                "{} not permitted in {}",
                method,
                self.rules().jurisdiction
            ))
            .into());
        }

        let mut ordered: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| tx.user_id == user_id && tx.timestamp <= at)
            .collect();
        ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        let mut inventory = LotInventory::new(self.policy());
        for tx in &ordered {
            self.replay_for_estimate(&mut inventory, tx, method)?;
        }

        let events = inventory
            .dispose(&DisposalRequest {
                asset: asset.to_string(),
                quantity,
                unit_price,
                disposed_at: at,
                fee: Decimal::ZERO,
                method,
                tx_id: "what-if".to_string(),
                counterpart_source: None,
            })?
            .events;

        let threshold = self.rules().long_term_threshold_days;
        let mut short_term_gain = Decimal::ZERO;
        let mut long_term_gain = Decimal::ZERO;
        for event in &events {
            if event.holding_period_days > threshold {
                long_term_gain += event.gain;
            } else {
                short_term_gain += event.gain;
            }
        }

        Ok(TaxEstimate {
            asset: asset.to_string(),
            quantity,
            unit_price,
            realized_gain: short_term_gain + long_term_gain,
            short_term_gain,
            long_term_gain,
            estimated_tax: self.tax_for_buckets(short_term_gain, long_term_gain),
            events,
        })
    }

    fn replay_for_estimate(
        &self,
        inventory: &mut LotInventory,
        tx: &Transaction,
        method: AccountingMethod,
    ) -> Result<(), ComplianceError> {
        if tx.tx_type.is_acquisition() {
            if let (Some(asset), Some(unit_cost)) =
                (tx.asset_in.as_deref(), tx.acquisition_unit_cost())
            {
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
        } else if tx.tx_type.is_disposal() {
            if let (Some(asset), Some(price)) = (tx.asset_out.as_deref(), tx.disposal_unit_price())
            {
                inventory.dispose(&DisposalRequest {
                    asset: asset.to_string(),
                    quantity: tx.amount_out,
                    unit_price: price,
                    disposed_at: tx.timestamp,
                    fee: tx.fee_amount,
                    method,
                    tx_id: tx.id.clone(),
                    counterpart_source: tx.exchange_id.clone(),
                })?;
            }
        }
        Ok(())
    }
}
