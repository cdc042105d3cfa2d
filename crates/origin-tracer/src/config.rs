use fiscal_core::NodeKind;
use serde::{Deserialize, Serialize};

/// Tracer configuration. The per-hop confidence table is explicit
/// configuration, not an inline heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracerConfig {
    /// Maximum hops a backward search may take
    pub max_depth: usize,
    /// Number of ranked paths returned
    pub top_k: usize,
    /// Attribution certainty of a verified KYC exchange
    pub verified_exchange_confidence: f64,
    /// Attribution certainty of a known non-exchange entity
    pub known_entity_confidence: f64,
    /// Attribution certainty of a wallet attributed to the user
    pub attributed_wallet_confidence: f64,
    /// Attribution certainty of a heuristically clustered wallet
    pub clustered_wallet_confidence: f64,
    /// Baseline certainty for an unattributed address
    pub unknown_confidence: f64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_depth: 20,
            top_k: 10,
            verified_exchange_confidence: 1.0,
            known_entity_confidence: 0.95,
            attributed_wallet_confidence: 0.9,
            clustered_wallet_confidence: 0.6,
            unknown_confidence: 0.4,
        }
    }
}

impl TracerConfig {
    /// Default attribution certainty for a node kind
    pub fn confidence_for(&self, kind: NodeKind) -> f64 {
        match kind {
            NodeKind::Exchange => self.verified_exchange_confidence,
            NodeKind::KnownEntity => self.known_entity_confidence,
            NodeKind::Wallet => self.attributed_wallet_confidence,
            NodeKind::Unknown => self.unknown_confidence,
        }
    }
}
