//! Resume capability for collection runs
//!
//! The match list is the only durable progress record. It is loaded once,
//! mutated in memory and atomically replaced on flush.

pub mod matchlist;

pub use matchlist::{MatchList, StateError};
