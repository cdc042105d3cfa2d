use crate::error::ComplianceError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Canonical transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxType {
    Buy,
    Sell,
    Transfer,
    Fee,
    Reward,
    Staking,
    Mining,
}

impl TxType {
    /// Whether this transaction type adds units to the lot inventory
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            TxType::Buy | TxType::Reward | TxType::Staking | TxType::Mining
        )
    }

    /// Whether this transaction type removes units and realizes gains
    pub fn is_disposal(&self) -> bool {
        matches!(self, TxType::Sell)
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxType::Buy => "BUY",
            TxType::Sell => "SELL",
            TxType::Transfer => "TRANSFER",
            TxType::Fee => "FEE",
            TxType::Reward => "REWARD",
            TxType::Staking => "STAKING",
            TxType::Mining => "MINING",
        };
        write!(f, "{}", s)
    }
}

/// Classification of a transaction endpoint (source or destination)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitySource {
    Wallet,
    Exchange,
    Cex,
    Dex,
    Defi,
    Mining,
    Staking,
}

/// A canonicalized, deduplicated transaction supplied by the ingestion
/// layer. Immutable once ingested; the core never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    /// Settlement timestamp, UTC
    pub timestamp: DateTime<Utc>,
    pub tx_type: TxType,
    pub asset_in: Option<String>,
    pub asset_out: Option<String>,
    #[serde(default)]
    pub amount_in: Decimal,
    #[serde(default)]
    pub amount_out: Decimal,
    pub source_address: Option<String>,
    pub destination_address: Option<String>,
    pub source_type: Option<EntitySource>,
    pub destination_type: Option<EntitySource>,
    pub exchange_id: Option<String>,
    #[serde(default)]
    pub fee_amount: Decimal,
    pub fee_asset: Option<String>,
    pub tx_hash: Option<String>,
    /// Fiat valuation of the crypto leg at settlement, when the ingestion
    /// layer could price it
    pub fiat_value: Option<Decimal>,
    /// Ingestion-layer confidence that this record is correctly
    /// reconciled, in [0, 1]
    #[serde(default = "default_data_confidence")]
    pub data_confidence: f64,
}

fn default_data_confidence() -> f64 {
    1.0
}

impl Transaction {
    /// The asset moved from source to destination, viewed as a graph edge.
    /// Outgoing leg when present, incoming leg otherwise.
    pub fn moved_asset(&self) -> Option<&str> {
        self.asset_out.as_deref().or(self.asset_in.as_deref())
    }

    /// The amount moved from source to destination
    pub fn moved_amount(&self) -> Decimal {
        if self.asset_out.is_some() {
            self.amount_out
        } else {
            self.amount_in
        }
    }

    /// Unit acquisition cost for a BUY: fiat paid divided by units
    /// received. `None` when the transaction carries no usable legs.
    pub fn acquisition_unit_cost(&self) -> Option<Decimal> {
        if self.amount_in <= Decimal::ZERO {
            return None;
        }
        match self.tx_type {
            TxType::Buy => Some(self.amount_out / self.amount_in),
            // Rewards and mined/staked income are priced by the ingestion
            // layer's fiat valuation; zero basis when it could not price
            TxType::Reward | TxType::Staking | TxType::Mining => Some(
                self.fiat_value
                    .map(|v| v / self.amount_in)
                    .unwrap_or(Decimal::ZERO),
            ),
            _ => None,
        }
    }

    /// Unit disposal price for a SELL: fiat received divided by units
    /// disposed
    pub fn disposal_unit_price(&self) -> Option<Decimal> {
        if self.tx_type != TxType::Sell || self.amount_out <= Decimal::ZERO {
            return None;
        }
        Some(self.amount_in / self.amount_out)
    }

    /// Fiat notional of the transaction: the explicit valuation when
    /// present, otherwise the fiat leg of a BUY/SELL
    pub fn notional_value(&self) -> Option<Decimal> {
        if let Some(v) = self.fiat_value {
            return Some(v);
        }
        match self.tx_type {
            TxType::Buy => Some(self.amount_out),
            TxType::Sell => Some(self.amount_in),
            _ => None,
        }
    }
}

/// Lot-selection accounting method. Closed set: unknown input strings are
/// rejected at the boundary, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountingMethod {
    Fifo,
    Lifo,
    Hifo,
    SpecificSource,
}

impl AccountingMethod {
    pub const ALL: [AccountingMethod; 4] = [
        AccountingMethod::Fifo,
        AccountingMethod::Lifo,
        AccountingMethod::Hifo,
        AccountingMethod::SpecificSource,
    ];
}

impl std::fmt::Display for AccountingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccountingMethod::Fifo => "FIFO",
            AccountingMethod::Lifo => "LIFO",
            AccountingMethod::Hifo => "HIFO",
            AccountingMethod::SpecificSource => "SPECIFIC_SOURCE",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AccountingMethod {
    type Err = ComplianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIFO" => Ok(AccountingMethod::Fifo),
            "LIFO" => Ok(AccountingMethod::Lifo),
            "HIFO" => Ok(AccountingMethod::Hifo),
            // Legacy importer label for the same policy
            "SPECIFIC_SOURCE" | "EXCHANGE_SPECIFIC" => Ok(AccountingMethod::SpecificSource),
            other => Err(ComplianceError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Kind of entity behind an address in the transaction graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Wallet,
    Exchange,
    KnownEntity,
    Unknown,
}

/// An attributed node in the provenance graph. Termination of a
/// provenance search is a property of the node, not of a target list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceNode {
    /// Address or known-entity id
    pub identity: String,
    pub kind: NodeKind,
    /// Attribution certainty in [0, 1]
    pub attribution_confidence: f64,
    /// Whether a backward search may stop here (attributed user wallet,
    /// known exchange, known entity)
    pub is_terminal: bool,
    /// Whether this node is a centralized exchange
    pub is_cex: bool,
}

impl ProvenanceNode {
    /// An unattributed address with the given baseline confidence
    pub fn unknown(identity: impl Into<String>, confidence: f64) -> Self {
        Self {
            identity: identity.into(),
            kind: NodeKind::Unknown,
            attribution_confidence: confidence.clamp(0.0, 1.0),
            is_terminal: false,
            is_cex: false,
        }
    }
}
