use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A quantity of an asset acquired at a specific cost and time, held
/// until disposed. Shrunk or removed by replay; quantity never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: String,
    pub asset: String,
    pub remaining_quantity: Decimal,
    /// Unit acquisition cost attributed to this lot
    pub unit_cost: Decimal,
    /// Acquisition timestamp. Never reset by partial consumption, so the
    /// remainder keeps its original holding period.
    pub acquired_at: DateTime<Utc>,
    pub acquiring_tx_id: String,
    /// Exchange or wallet the lot was acquired on, when known
    pub source_id: Option<String>,
    /// True only for zero-basis lots fabricated under the synthetic
    /// inventory policy
    pub synthetic: bool,
}

/// A realized gain or loss produced by consuming (part of) one lot.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedGainEvent {
    pub asset: String,
    /// Quantity consumed from the lot
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub unit_price: Decimal,
    /// Portion of the disposal fee allocated to this event
    pub fee_allocated: Decimal,
    /// quantity * (unit_price - unit_cost) - fee_allocated
    pub gain: Decimal,
    pub holding_period_days: i64,
    pub lot_id: String,
    pub acquired_at: DateTime<Utc>,
    pub disposed_at: DateTime<Utc>,
    pub disposing_tx_id: String,
    /// True when the cost basis came from a synthetic zero-cost lot
    pub synthetic_basis: bool,
}
