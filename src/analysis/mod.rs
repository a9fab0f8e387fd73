//! # Analysis Module
//!
//! Read-only analyses of a terrain grid:
//! - Multi-source distance scans with blocked cells ([`ReachabilityField`])
//! - Doorway detection and door placement ([`DoorwayClassifier`])

pub mod doorways;
pub mod reachability;

pub use doorways::*;
pub use reachability::*;
