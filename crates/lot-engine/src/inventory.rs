//! Lot Inventory Manager
//!
//! Per (user, asset) ordered collection of open acquisition lots,
//! rebuilt fresh from the transaction log on every invocation. Supports
//! acquisition, method-driven disposal, and partial consumption.

use crate::lot::{Lot, RealizedGainEvent};
use crate::strategy::candidate_order;
use chrono::{DateTime, Utc};
use fiscal_core::{
    AccountingMethod, ComplianceError, FeePolicy, InsufficientInventoryPolicy, ReplayPolicy,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A disposal to satisfy from the open inventory
#[derive(Debug, Clone)]
pub struct DisposalRequest {
    pub asset: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub disposed_at: DateTime<Utc>,
    /// Fee charged on the disposal, in fiat
    pub fee: Decimal,
    pub method: AccountingMethod,
    pub tx_id: String,
    /// Exchange id of the disposing transaction, for specific-source
    /// selection
    pub counterpart_source: Option<String>,
}

/// Result of a disposal: the realized gain events in consumption order,
/// plus the state of a lot the disposal only partially consumed
#[derive(Debug, Clone)]
pub struct DisposalOutcome {
    pub events: Vec<RealizedGainEvent>,
    pub leftover: Option<Lot>,
}

/// Ephemeral lot inventory for one replay. Nothing is shared across
/// concurrent computations.
#[derive(Debug, Clone)]
pub struct LotInventory {
    policy: ReplayPolicy,
    lots: HashMap<String, Vec<Lot>>,
    acquired: HashMap<String, Decimal>,
    disposed: HashMap<String, Decimal>,
    warnings: Vec<String>,
    synthetic_seq: u64,
}

impl LotInventory {
    pub fn new(policy: ReplayPolicy) -> Self {
        Self {
            policy,
            lots: HashMap::new(),
            acquired: HashMap::new(),
            disposed: HashMap::new(),
            warnings: Vec::new(),
            synthetic_seq: 0,
        }
    }

    /// Append a new lot from an acquisition event. Under
    /// `CapitalizeIntoBasis` the acquisition fee raises the unit cost.
    pub fn acquire(
        &mut self,
        asset: &str,
        quantity: Decimal,
        unit_cost: Decimal,
        acquired_at: DateTime<Utc>,
        source_id: Option<String>,
        tx_id: &str,
        fee: Decimal,
    ) {
        if quantity <= Decimal::ZERO {
            warn!(asset, %quantity, tx_id, "skipping non-positive acquisition");
            return;
        }

        let unit_cost = match self.policy.fee_policy {
            FeePolicy::CapitalizeIntoBasis if fee > Decimal::ZERO => unit_cost + fee / quantity,
            _ => unit_cost,
        };

        let lot = Lot {
            id: format!("lot-{}", tx_id),
            asset: asset.to_string(),
            remaining_quantity: quantity,
            unit_cost,
            acquired_at,
            acquiring_tx_id: tx_id.to_string(),
            source_id,
            synthetic: false,
        };

        debug!(asset, %quantity, %unit_cost, tx_id, "acquired lot");
        *self.acquired.entry(asset.to_string()).or_default() += quantity;
        self.lots.entry(asset.to_string()).or_default().push(lot);
    }

    /// Consume lots per the requested method until the disposal quantity
    /// is satisfied, returning the realized gain events in consumption
    /// order. The last lot touched may be partially consumed; its
    /// remainder keeps its unit cost and acquisition timestamp.
    pub fn dispose(&mut self, req: &DisposalRequest) -> Result<DisposalOutcome, ComplianceError> {
        let available = self.total_remaining(&req.asset);
        if req.quantity > available {
            match self.policy.insufficient_inventory {
                InsufficientInventoryPolicy::Reject => {
                    return Err(ComplianceError::InsufficientInventory {
                        asset: req.asset.clone(),
                        requested: req.quantity,
                        available,
                    });
                }
                InsufficientInventoryPolicy::SyntheticZeroBasis => {
                    let deficit = req.quantity - available;
                    self.push_synthetic_lot(&req.asset, deficit, req.disposed_at);
                    self.warnings.push(format!(
                        "disposal {} exceeded inventory for {} by {}; covered with zero-basis synthetic lot",
                        req.tx_id, req.asset, deficit
                    ));
                }
            }
        }

        let lots = self.lots.entry(req.asset.clone()).or_default();
        let order = candidate_order(req.method, lots, req.counterpart_source.as_deref());

        let mut consumed: Vec<(usize, Decimal)> = Vec::new();
        let mut needed = req.quantity;
        for idx in order {
            if needed <= Decimal::ZERO {
                break;
            }
            let take = lots[idx].remaining_quantity.min(needed);
            lots[idx].remaining_quantity -= take;
            needed -= take;
            consumed.push((idx, take));
        }
        debug_assert!(needed <= Decimal::ZERO);

        // Fee is allocated pro-rata by quantity; the last event absorbs
        // the rounding remainder so allocations sum exactly to the fee
        let fee_total = match self.policy.fee_policy {
            FeePolicy::ReduceProceedsAtDisposal => req.fee,
            FeePolicy::CapitalizeIntoBasis => Decimal::ZERO,
        };

        let mut events = Vec::with_capacity(consumed.len());
        let mut fee_allocated_so_far = Decimal::ZERO;
        for (n, &(idx, qty)) in consumed.iter().enumerate() {
            let lot = &lots[idx];
            let fee_allocated = if n + 1 == consumed.len() {
                fee_total - fee_allocated_so_far
            } else {
                fee_total * qty / req.quantity
            };
            fee_allocated_so_far += fee_allocated;

            let gain = qty * (req.unit_price - lot.unit_cost) - fee_allocated;
            events.push(RealizedGainEvent {
                asset: req.asset.clone(),
                quantity: qty,
                unit_cost: lot.unit_cost,
                unit_price: req.unit_price,
                fee_allocated,
                gain,
                holding_period_days: (req.disposed_at - lot.acquired_at).num_days(),
                lot_id: lot.id.clone(),
                acquired_at: lot.acquired_at,
                disposed_at: req.disposed_at,
                disposing_tx_id: req.tx_id.clone(),
                synthetic_basis: lot.synthetic,
            });
        }

        // The last lot touched is the only one that can be partially
        // consumed
        let leftover = consumed.last().and_then(|&(idx, _)| {
            let lot = &lots[idx];
            (lot.remaining_quantity > Decimal::ZERO).then(|| lot.clone())
        });

        lots.retain(|l| l.remaining_quantity > Decimal::ZERO);
        *self.disposed.entry(req.asset.clone()).or_default() += req.quantity;

        Ok(DisposalOutcome { events, leftover })
    }

    fn push_synthetic_lot(&mut self, asset: &str, quantity: Decimal, at: DateTime<Utc>) {
        self.synthetic_seq += 1;
        warn!(asset, %quantity, "fabricating zero-basis synthetic lot");
        *self.acquired.entry(asset.to_string()).or_default() += quantity;
        self.lots.entry(asset.to_string()).or_default().push(Lot {
            id: format!("synthetic-{}-{}", asset, self.synthetic_seq),
            asset: asset.to_string(),
            remaining_quantity: quantity,
            unit_cost: Decimal::ZERO,
            acquired_at: at,
            acquiring_tx_id: String::new(),
            source_id: None,
            synthetic: true,
        });
    }

    /// Open lots for an asset, in insertion (acquisition) order
    pub fn open_lots(&self, asset: &str) -> &[Lot] {
        self.lots.get(asset).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total quantity ever acquired for an asset, synthetic lots included
    pub fn total_acquired(&self, asset: &str) -> Decimal {
        self.acquired.get(asset).copied().unwrap_or_default()
    }

    /// Total quantity disposed for an asset
    pub fn total_disposed(&self, asset: &str) -> Decimal {
        self.disposed.get(asset).copied().unwrap_or_default()
    }

    /// Total quantity still held for an asset
    pub fn total_remaining(&self, asset: &str) -> Decimal {
        self.lots
            .get(asset)
            .map(|lots| lots.iter().map(|l| l.remaining_quantity).sum())
            .unwrap_or_default()
    }

    /// Warnings accumulated during replay (synthetic lot usage)
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
