//! # Cairn
//!
//! Feature layering for procedurally generated dungeons.
//!
//! ## Architecture Overview
//!
//! Cairn takes a bare wall/floor skeleton (plus an optional room/corridor/cave
//! classification of its floor) and dresses it with water, grass, boulders,
//! traps, islands, lakes, mazes and doors, while keeping every passable cell
//! reachable from the up staircase. The crate is organised leaves-first:
//!
//! - **Map**: coordinates, the fixed-size [`Grid`], terrain and environment tags
//! - **Region**: boolean masks with set algebra and growth operations
//! - **Analysis**: reachability scans and doorway classification
//! - **Generation**: feature configuration, skeleton sources and the
//!   [`DungeonDresser`] pipeline that ties everything together
//!
//! ## Determinism
//!
//! Every random decision is drawn from an explicitly passed RNG. A dressing
//! call records a rebuild seed so the exact same output can be replayed with
//! [`DungeonDresser::generate_from_seed`].

pub mod analysis;
pub mod generation;
pub mod map;
pub mod region;
pub mod utils;

// Core module re-exports
pub use analysis::*;
pub use generation::*;
pub use map::*;
pub use region::*;

pub use generation::{
    DoorRequest, DressedDungeon, DungeonDresser, EnvironmentFeatures, FeatureConfig, FeatureKind,
    FeatureRequest, Percentage, PipelineStage, Skeleton, SkeletonSource, StaircasePair,
    VolumeMapping,
};

/// Core error type for the Cairn dungeon dresser.
#[derive(thiserror::Error, Debug)]
pub enum CairnError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Feature configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Skeleton or environment map is malformed
    #[error("Invalid map: {0}")]
    InvalidMap(String),

    /// Two grids that must line up do not
    #[error("Dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// No staircase pair could be placed; the skeleton must be regenerated
    #[error("Staircase placement failed after {attempts} attempts; regenerate the skeleton")]
    StairPlacementExhausted { attempts: u32 },

    /// The retrying wrapper ran out of fresh skeletons
    #[error("Generation still failing after {attempts} skeletons")]
    RetriesExhausted { attempts: u32 },

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

impl CairnError {
    /// Whether a fresh skeleton could succeed where this attempt failed.
    pub fn requires_regeneration(&self) -> bool {
        matches!(self, CairnError::StairPlacementExhausted { .. })
    }
}

/// Result type used throughout the Cairn codebase.
pub type CairnResult<T> = Result<T, CairnError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default generation constants.
pub mod config {
    /// Default dungeon width in cells
    pub const DEFAULT_DUNGEON_WIDTH: usize = 80;

    /// Default dungeon height in cells
    pub const DEFAULT_DUNGEON_HEIGHT: usize = 40;

    /// Staircase placement attempts before asking for a new skeleton
    pub const DEFAULT_STAIR_ATTEMPTS: u32 = 8;

    /// Largest share of the skeleton's floor that stair placement may prune
    pub const DEFAULT_MAX_PRUNED_FRACTION: f64 = 0.25;

    /// Scan radius used when testing doorway candidates
    pub const DEFAULT_DOORWAY_SCAN_RADIUS: f64 = 16.0;

    /// Bonus-volume redistribution attempts before giving up
    pub const DEFAULT_BONUS_FRUSTRATION_LIMIT: u32 = 50;

    /// Fresh skeletons tried by the retrying wrapper
    pub const DEFAULT_SKELETON_RETRIES: u32 = 10;

    /// Share of the maximum stair distance the down stair must reach
    pub const DOWN_STAIR_DISTANCE_FRACTION: f64 = 0.7;
}
