//! # Arm Driver Library
//!
//! Shared types and utilities for the arm driver nodes.
//! Real-time controller state comes in here and leaves as typed
//! outbound messages for the rest of the dora-rs dataflow.

pub mod publisher;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use publisher::*;
pub use types::*;
pub use utils::*;
