//! Origin Tracer
//!
//! Bounded-depth backward search over the transaction graph, producing
//! ranked provenance paths, per-asset flow summaries, and a CEX
//! interaction summary for a target wallet.

pub mod config;
pub mod document;
pub mod graph;
pub mod tracer;

pub use config::TracerConfig;
pub use document::{
    AssetFlowSummary, CexInteractionSummary, ProofDocument, ProvenanceHop, ProvenancePath,
    UnresolvedOrigin, UnresolvedReason,
};
pub use graph::MemoryGraph;
pub use tracer::OriginTracer;
