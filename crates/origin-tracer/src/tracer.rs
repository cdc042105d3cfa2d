//! Fund-Origin Tracer
//!
//! Breadth-first backward search from a target wallet, following edges
//! destination-to-source up to the hop budget. Termination is a
//! property of the node reached. Each path carries its own visited set,
//! so cycles cannot trap a branch while nodes stay reusable across
//! independently explored paths.

use crate::config::TracerConfig;
use crate::document::{
    AssetFlowSummary, CexInteractionSummary, ProofDocument, ProvenanceHop, ProvenancePath,
    UnresolvedOrigin, UnresolvedReason,
};
use fiscal_core::{ComplianceError, TransactionGraph};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone)]
struct PartialPath {
    /// Current frontier node, moving backward from the target
    at: String,
    /// Hops collected target-first; reversed on completion
    hops: Vec<ProvenanceHop>,
    visited: HashSet<String>,
    confidence: f64,
    cex_identities: Vec<String>,
}

pub struct OriginTracer {
    config: TracerConfig,
}

impl Default for OriginTracer {
    fn default() -> Self {
        Self::new(TracerConfig::default())
    }
}

impl OriginTracer {
    pub fn new(config: TracerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Trace the origins of the funds in `target_wallet`. `max_depth`
    /// and `top_k` default to the configured values.
    pub async fn trace(
        &self,
        graph: &dyn TransactionGraph,
        target_wallet: &str,
        max_depth: Option<usize>,
        top_k: Option<usize>,
    ) -> Result<ProofDocument, ComplianceError> {
        let max_depth = max_depth.unwrap_or(self.config.max_depth);
        let top_k = top_k.unwrap_or(self.config.top_k);

        let mut frontier = vec![PartialPath {
            at: target_wallet.to_string(),
            hops: Vec::new(),
            visited: HashSet::from([target_wallet.to_string()]),
            confidence: 1.0,
            cex_identities: Vec::new(),
        }];
        let mut completed: Vec<ProvenancePath> = Vec::new();
        let mut unresolved: Vec<UnresolvedOrigin> = Vec::new();

        for depth in 0..max_depth {
            if frontier.is_empty() {
                break;
            }
            debug!(depth, branches = frontier.len(), "expanding frontier");

            // Sub-searches at one depth level are independent; their
            // results merge before the next level
            let mut next = Vec::new();
            for path in frontier.drain(..) {
                let incoming = graph.incoming(&path.at).await?;
                let mut extended = false;

                for (tx, source) in incoming {
                    if path.visited.contains(&source.identity) {
                        continue;
                    }
                    let asset = match tx.moved_asset() {
                        Some(asset) => asset.to_string(),
                        None => continue,
                    };

                    let hop_confidence = source.attribution_confidence.clamp(0.0, 1.0)
                        * tx.data_confidence.clamp(0.0, 1.0);
                    let mut hops = path.hops.clone();
                    hops.push(ProvenanceHop {
                        tx_id: tx.id.clone(),
                        from: source.identity.clone(),
                        to: path.at.clone(),
                        asset,
                        amount: tx.moved_amount(),
                        hop_confidence,
                    });
                    let mut cex_identities = path.cex_identities.clone();
                    if source.is_cex {
                        cex_identities.push(source.identity.clone());
                    }
                    let confidence = path.confidence * hop_confidence;
                    extended = true;

                    if source.is_terminal {
                        hops.reverse();
                        completed.push(ProvenancePath {
                            hop_count: hops.len(),
                            hops,
                            terminal: source.clone(),
                            confidence,
                            cex_identities,
                        });
                    } else {
                        let mut visited = path.visited.clone();
                        visited.insert(source.identity.clone());
                        next.push(PartialPath {
                            at: source.identity.clone(),
                            hops,
                            visited,
                            confidence,
                            cex_identities,
                        });
                    }
                }

                if !extended {
                    unresolved.push(UnresolvedOrigin {
                        frontier_node: path.at,
                        hops_explored: path.hops.len(),
                        reason: UnresolvedReason::DeadEnd,
                    });
                }
            }
            frontier = next;
        }

        // Branches still open after the budget: origin unknown beyond
        // depth
        for path in frontier {
            unresolved.push(UnresolvedOrigin {
                frontier_node: path.at,
                hops_explored: path.hops.len(),
                reason: UnresolvedReason::DepthExhausted,
            });
        }

        let paths = rank_and_dedup(completed, top_k);
        let asset_flows = summarize_flows(&paths);
        let cex_summary = summarize_cex(&paths);

        Ok(ProofDocument {
            target_wallet: target_wallet.to_string(),
            max_depth,
            paths,
            asset_flows,
            cex_summary,
            unresolved,
        })
    }
}

/// Deduplicate by edge sequence, rank ascending by hop count then
/// descending by confidence, keep the top K
fn rank_and_dedup(mut paths: Vec<ProvenancePath>, top_k: usize) -> Vec<ProvenancePath> {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    paths.sort_by(|a, b| {
        a.hop_count
            .cmp(&b.hop_count)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });
    paths.retain(|p| seen.insert(p.hops.iter().map(|h| h.tx_id.clone()).collect()));
    paths.truncate(top_k);
    paths
}

/// Per-asset totals of the final hop into the target, across returned
/// paths
fn summarize_flows(paths: &[ProvenancePath]) -> Vec<AssetFlowSummary> {
    let mut flows: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
    for path in paths {
        if let Some(last) = path.hops.last() {
            let entry = flows.entry(last.asset.clone()).or_default();
            entry.0 += last.amount;
            entry.1 += 1;
        }
    }
    flows
        .into_iter()
        .map(|(asset, (total_amount, path_count))| AssetFlowSummary {
            asset,
            total_amount,
            path_count,
        })
        .collect()
}

fn summarize_cex(paths: &[ProvenancePath]) -> CexInteractionSummary {
    let mut identities: Vec<String> = paths
        .iter()
        .flat_map(|p| {
            p.cex_identities
                .iter()
                .cloned()
                .chain(p.terminal.is_cex.then(|| p.terminal.identity.clone()))
        })
        .collect();
    identities.sort();
    identities.dedup();

    CexInteractionSummary {
        paths_touching_cex: paths
            .iter()
            .filter(|p| !p.cex_identities.is_empty() || p.terminal.is_cex)
            .count(),
        cex_identities: identities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use chrono::{TimeZone, Utc};
    use fiscal_core::{EntitySource, Transaction, TxType};
    use rust_decimal_macros::dec;

    fn transfer(id: &str, from: &str, to: &str, amount: Decimal) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            tx_type: TxType::Transfer,
            asset_in: None,
            asset_out: Some("BTC".to_string()),
            amount_in: Decimal::ZERO,
            amount_out: amount,
            source_address: Some(from.to_string()),
            destination_address: Some(to.to_string()),
            source_type: Some(EntitySource::Wallet),
            destination_type: Some(EntitySource::Wallet),
            exchange_id: None,
            fee_amount: Decimal::ZERO,
            fee_asset: None,
            tx_hash: None,
            fiat_value: None,
            data_confidence: 1.0,
        }
    }

    #[tokio::test]
    async fn test_single_hop_from_exchange() {
        let txs = vec![transfer("t1", "kraken-hot", "wallet-a", dec!(1))];
        let mut graph = MemoryGraph::from_transactions(&txs, TracerConfig::default());
        graph.attribute_exchange("kraken-hot");

        let doc = OriginTracer::default()
            .trace(&graph, "wallet-a", None, None)
            .await
            .unwrap();

        assert_eq!(doc.paths.len(), 1);
        assert_eq!(doc.paths[0].hop_count, 1);
        assert_eq!(doc.paths[0].terminal.identity, "kraken-hot");
        assert!((doc.paths[0].confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(doc.cex_summary.paths_touching_cex, 1);
        assert_eq!(doc.asset_flows.len(), 1);
        assert_eq!(doc.asset_flows[0].total_amount, dec!(1));
    }

    #[tokio::test]
    async fn test_chain_beyond_depth_reports_exhaustion() {
        // 25-hop linear chain; budget 20 must not complete and must not
        // crash
        let mut txs = Vec::new();
        for i in 0..25 {
            txs.push(transfer(
                &format!("t{}", i),
                &format!("node-{}", i + 1),
                &format!("node-{}", i),
                dec!(1),
            ));
        }
        let mut graph = MemoryGraph::from_transactions(&txs, TracerConfig::default());
        graph.attribute_exchange("node-25");

        let doc = OriginTracer::default()
            .trace(&graph, "node-0", Some(20), None)
            .await
            .unwrap();

        assert!(doc.paths.is_empty());
        assert_eq!(doc.unresolved.len(), 1);
        assert_eq!(doc.unresolved[0].reason, UnresolvedReason::DepthExhausted);
        assert_eq!(doc.unresolved[0].hops_explored, 20);
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let txs = vec![
            transfer("t1", "b", "a", dec!(1)),
            transfer("t2", "a", "b", dec!(1)),
        ];
        let graph = MemoryGraph::from_transactions(&txs, TracerConfig::default());

        let doc = OriginTracer::default()
            .trace(&graph, "a", None, None)
            .await
            .unwrap();

        assert!(doc.paths.is_empty());
        assert_eq!(doc.unresolved.len(), 1);
        assert_eq!(doc.unresolved[0].reason, UnresolvedReason::DeadEnd);
    }

    #[tokio::test]
    async fn test_equal_hop_paths_ranked_by_confidence() {
        let mut low = transfer("t-low", "entity-low", "target", dec!(1));
        low.data_confidence = 0.5;
        let mut high = transfer("t-high", "entity-high", "target", dec!(2));
        high.data_confidence = 0.9;

        let config = TracerConfig {
            known_entity_confidence: 1.0,
            ..TracerConfig::default()
        };
        let mut graph = MemoryGraph::from_transactions(&[low, high], config);
        graph.attribute_known_entity("entity-low");
        graph.attribute_known_entity("entity-high");

        let doc = OriginTracer::new(config)
            .trace(&graph, "target", None, None)
            .await
            .unwrap();

        assert_eq!(doc.paths.len(), 2);
        assert_eq!(doc.paths[0].hops[0].tx_id, "t-high");
        assert!((doc.paths[0].confidence - 0.9).abs() < 1e-9);
        assert_eq!(doc.paths[1].hops[0].tx_id, "t-low");
        assert!((doc.paths[1].confidence - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_confidence_non_increasing_along_path() {
        let txs = vec![
            transfer("t1", "mid", "target", dec!(1)),
            transfer("t2", "origin", "mid", dec!(1)),
        ];
        let mut graph = MemoryGraph::from_transactions(&txs, TracerConfig::default());
        graph.attribute_clustered_wallet("mid");
        graph.attribute_owned_wallet("origin");

        let doc = OriginTracer::default()
            .trace(&graph, "target", None, None)
            .await
            .unwrap();

        assert_eq!(doc.paths.len(), 1);
        let path = &doc.paths[0];
        assert_eq!(path.hop_count, 2);
        // 0.6 (clustered mid) * 0.9 (owned origin)
        assert!((path.confidence - 0.54).abs() < 1e-9);
        assert!(path.confidence <= path.hops[0].hop_confidence);
        assert!(path.confidence <= path.hops[1].hop_confidence);
        // Origin-first ordering
        assert_eq!(path.hops[0].from, "origin");
        assert_eq!(path.hops[1].to, "target");
    }

    #[tokio::test]
    async fn test_node_reusable_across_distinct_paths() {
        // Two routes from the same exchange through different
        // intermediaries
        let txs = vec![
            transfer("t1", "mid-1", "target", dec!(1)),
            transfer("t2", "mid-2", "target", dec!(2)),
            transfer("t3", "cex", "mid-1", dec!(1)),
            transfer("t4", "cex", "mid-2", dec!(2)),
        ];
        let mut graph = MemoryGraph::from_transactions(&txs, TracerConfig::default());
        graph.attribute_exchange("cex");
        graph.attribute_clustered_wallet("mid-1");
        graph.attribute_clustered_wallet("mid-2");

        let doc = OriginTracer::default()
            .trace(&graph, "target", None, None)
            .await
            .unwrap();

        assert_eq!(doc.paths.len(), 2);
        assert!(doc.paths.iter().all(|p| p.terminal.identity == "cex"));
        assert_eq!(doc.cex_summary.paths_touching_cex, 2);
        // BTC arrived via both routes
        assert_eq!(doc.asset_flows[0].total_amount, dec!(3));
        assert_eq!(doc.asset_flows[0].path_count, 2);
    }

    #[tokio::test]
    async fn test_top_k_truncates() {
        let mut txs = Vec::new();
        for i in 0..5 {
            txs.push(transfer(
                &format!("t{}", i),
                &format!("entity-{}", i),
                "target",
                dec!(1),
            ));
        }
        let mut graph = MemoryGraph::from_transactions(&txs, TracerConfig::default());
        for i in 0..5 {
            graph.attribute_known_entity(&format!("entity-{}", i));
        }

        let doc = OriginTracer::default()
            .trace(&graph, "target", None, Some(3))
            .await
            .unwrap();
        assert_eq!(doc.paths.len(), 3);
    }
}
