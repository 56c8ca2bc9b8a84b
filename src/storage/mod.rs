//! Persistence for frontier state
//!
//! The frontier itself is in-memory only; this module saves and loads its
//! host records between runs.

pub mod checkpoint;

pub use checkpoint::{CheckpointManager, FrontierCheckpoint, CHECKPOINT_VERSION, FRONTIER_CHECKPOINT};
