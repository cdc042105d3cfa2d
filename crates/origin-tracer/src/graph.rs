//! In-Memory Transaction Graph
//!
//! A `TransactionGraph` over a finite transaction snapshot plus an
//! address-attribution table. Backing the tracer with storage-side
//! graph queries is the collaborator's concern; this view is built per
//! invocation.

use crate::config::TracerConfig;
use async_trait::async_trait;
use fiscal_core::{ComplianceError, NodeKind, ProvenanceNode, Transaction, TransactionGraph};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    config: TracerConfig,
    /// Edges indexed by destination address
    edges_in: HashMap<String, Vec<Transaction>>,
    nodes: HashMap<String, ProvenanceNode>,
}

impl MemoryGraph {
    /// Index a transaction snapshot. Only transactions with both
    /// endpoints and a moved asset become edges.
    pub fn from_transactions(transactions: &[Transaction], config: TracerConfig) -> Self {
        let mut edges_in: HashMap<String, Vec<Transaction>> = HashMap::new();
        for tx in transactions {
            let has_endpoints = tx.source_address.is_some() && tx.destination_address.is_some();
            if !has_endpoints || tx.moved_asset().is_none() {
                continue;
            }
            let dest = tx.destination_address.clone().unwrap_or_default();
            edges_in.entry(dest).or_default().push(tx.clone());
        }
        Self {
            config,
            edges_in,
            nodes: HashMap::new(),
        }
    }

    /// Record a verified exchange attribution (terminal, CEX-labeled)
    pub fn attribute_exchange(&mut self, identity: &str) {
        self.nodes.insert(
            identity.to_string(),
            ProvenanceNode {
                identity: identity.to_string(),
                kind: NodeKind::Exchange,
                attribution_confidence: self.config.confidence_for(NodeKind::Exchange),
                is_terminal: true,
                is_cex: true,
            },
        );
    }

    /// Record a known non-exchange entity attribution (terminal)
    pub fn attribute_known_entity(&mut self, identity: &str) {
        self.nodes.insert(
            identity.to_string(),
            ProvenanceNode {
                identity: identity.to_string(),
                kind: NodeKind::KnownEntity,
                attribution_confidence: self.config.confidence_for(NodeKind::KnownEntity),
                is_terminal: true,
                is_cex: false,
            },
        );
    }

    /// Record a wallet attributed to the user (terminal)
    pub fn attribute_owned_wallet(&mut self, address: &str) {
        self.nodes.insert(
            address.to_string(),
            ProvenanceNode {
                identity: address.to_string(),
                kind: NodeKind::Wallet,
                attribution_confidence: self.config.confidence_for(NodeKind::Wallet),
                is_terminal: true,
                is_cex: false,
            },
        );
    }

    /// Record a heuristically clustered wallet (attributed but not a
    /// terminal source)
    pub fn attribute_clustered_wallet(&mut self, address: &str) {
        self.nodes.insert(
            address.to_string(),
            ProvenanceNode {
                identity: address.to_string(),
                kind: NodeKind::Wallet,
                attribution_confidence: self.config.clustered_wallet_confidence,
                is_terminal: false,
                is_cex: false,
            },
        );
    }

    fn lookup(&self, address: &str) -> ProvenanceNode {
        self.nodes
            .get(address)
            .cloned()
            .unwrap_or_else(|| ProvenanceNode::unknown(address, self.config.confidence_for(NodeKind::Unknown)))
    }
}

#[async_trait]
impl TransactionGraph for MemoryGraph {
    async fn incoming(
        &self,
        address: &str,
    ) -> Result<Vec<(Transaction, ProvenanceNode)>, ComplianceError> {
        let mut result = Vec::new();
        for tx in self.edges_in.get(address).map(Vec::as_slice).unwrap_or(&[]) {
            let source = tx
                .source_address
                .as_deref()
                .ok_or_else(|| ComplianceError::DataSource("edge without source".to_string()))?;
            result.push((tx.clone(), self.lookup(source)));
        }
        Ok(result)
    }
}
