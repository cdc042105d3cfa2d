//! Lot Engine
//!
//! Per-asset ordered inventory of acquisition lots with method-driven
//! disposal: FIFO, LIFO, HIFO, and specific-source lot selection.

pub mod inventory;
pub mod lot;
pub mod strategy;

pub use inventory::{DisposalOutcome, DisposalRequest, LotInventory};
pub use lot::{Lot, RealizedGainEvent};
pub use strategy::candidate_order;
