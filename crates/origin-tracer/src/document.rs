use fiscal_core::ProvenanceNode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One traversed edge: a transaction moving `asset` from `from` to `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceHop {
    pub tx_id: String,
    pub from: String,
    pub to: String,
    pub asset: String,
    pub amount: Decimal,
    /// Attribution certainty of the hop's source node combined with the
    /// transaction's reconciliation confidence
    pub hop_confidence: f64,
}

/// A chain of transactions tracing funds from an originating entity to
/// the target wallet. Hops are ordered origin-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenancePath {
    pub hops: Vec<ProvenanceHop>,
    /// The terminal node the search stopped at
    pub terminal: ProvenanceNode,
    /// Product of hop confidences: in [0, 1], non-increasing with path
    /// length
    pub confidence: f64,
    pub hop_count: usize,
    /// Identities of CEX-labeled nodes this path touches
    pub cex_identities: Vec<String>,
}

/// Why a search branch produced no completed path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnresolvedReason {
    /// The hop budget ran out before a terminal node was reached:
    /// origin unknown beyond depth
    DepthExhausted,
    /// The branch reached a non-terminal node with no unvisited
    /// incoming edges
    DeadEnd,
}

/// A search branch that did not complete, reported rather than silently
/// omitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedOrigin {
    pub frontier_node: String,
    pub hops_explored: usize,
    pub reason: UnresolvedReason,
}

/// Total flow of one asset into the target across the returned paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFlowSummary {
    pub asset: String,
    pub total_amount: Decimal,
    pub path_count: usize,
}

/// Which returned paths touch a centralized exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CexInteractionSummary {
    pub paths_touching_cex: usize,
    pub cex_identities: Vec<String>,
}

/// Proof-of-origin payload for a target wallet. Produced on demand;
/// persistence and rendering belong to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofDocument {
    pub target_wallet: String,
    pub max_depth: usize,
    /// Top-K distinct paths, ranked by ascending hop count then
    /// descending confidence
    pub paths: Vec<ProvenancePath>,
    pub asset_flows: Vec<AssetFlowSummary>,
    pub cex_summary: CexInteractionSummary,
    pub unresolved: Vec<UnresolvedOrigin>,
}
