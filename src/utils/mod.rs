//! # Utilities Module
//!
//! Utility functions for budget arithmetic and connectivity checks.

pub mod math;
pub mod pathfinding;

pub use self::math::*;
pub use self::pathfinding::*;
