//! # Generation Module
//!
//! Feature configuration, skeleton sources and the dressing pipeline.
//!
//! A dressing pass takes a [`Skeleton`] (a wall/floor grid plus an optional
//! room/corridor/cave classification) and a [`FeatureConfig`], and produces
//! a [`DressedDungeon`]. The stages live in their own modules:
//!
//! - [`stairs`]: staircase placement and pruning of unreachable floor
//! - [`features`]: water, grass, boulders, traps and islands per environment
//! - [`lakes`] and [`maze`]: carving lakes and mazes into solid rock
//! - [`pipeline`]: the [`DungeonDresser`] that runs everything in order
//! - [`skeleton`]: skeleton sources used by the retrying wrapper and the CLI

pub mod features;
pub mod lakes;
pub mod maze;
pub mod pipeline;
pub mod skeleton;
pub mod stairs;

pub use features::*;
pub use lakes::*;
pub use maze::*;
pub use pipeline::*;
pub use skeleton::*;
pub use stairs::*;

use crate::utils::round_share;
use crate::{
    bare_terrain, config, parse_environment, parse_terrain, wall_wrap, CairnError, CairnResult,
    EnvironmentTag, Grid, Terrain,
};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// A whole-number percentage in `0..=100`.
///
/// # Examples
///
/// ```
/// use cairn::Percentage;
///
/// let p = Percentage::new(30).unwrap();
/// assert_eq!(p.of(200), 60);
/// assert!(Percentage::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percentage(u8);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const FULL: Percentage = Percentage(100);

    /// Validates a raw percentage.
    pub fn new(value: u8) -> CairnResult<Self> {
        if value > 100 {
            return Err(CairnError::InvalidConfig(format!(
                "percentage {} is outside 0..=100",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Clamps `value` into `0..=100`.
    pub fn saturating(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// This percentage of `count`, rounded half up.
    pub fn of(self, count: usize) -> usize {
        round_share(count, self.0 as usize, 100)
    }

    /// Sum of two percentages, capped at 100.
    pub fn saturating_add(self, other: Percentage) -> Percentage {
        Percentage((self.0 + other.0).min(100))
    }
}

impl TryFrom<u8> for Percentage {
    type Error = CairnError;

    fn try_from(value: u8) -> CairnResult<Self> {
        Percentage::new(value)
    }
}

impl From<Percentage> for u8 {
    fn from(p: Percentage) -> u8 {
        p.0
    }
}

/// How a requested percentage turns into a number of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VolumeMapping {
    /// `round(floor × P / 100)`
    #[default]
    Standard,
    /// `round(floor × P / 150)`, the older, sparser mapping
    TwoThirds,
}

impl VolumeMapping {
    /// Target cell count for `percentage` of `floor` cells.
    pub fn volume(self, floor: usize, percentage: Percentage) -> usize {
        let p = percentage.value() as usize;
        match self {
            VolumeMapping::Standard => round_share(floor, p, 100),
            VolumeMapping::TwoThirds => round_share(floor, p, 150),
        }
    }
}

/// Fill requests for one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentFeatures {
    pub water: Percentage,
    /// Minimum distance between islands; `None` places no islands
    pub island_spacing: Option<u32>,
    pub grass: Percentage,
    pub boulders: Percentage,
    pub traps: Percentage,
}

impl EnvironmentFeatures {
    /// Whether nothing is requested.
    pub fn is_empty(&self) -> bool {
        self.water.is_zero()
            && self.grass.is_zero()
            && self.boulders.is_zero()
            && self.traps.is_zero()
    }
}

/// Door placement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorRequest {
    pub percentage: Percentage,
    /// Also consider two-cell gaps, closing one half with a wall
    pub double_wide: bool,
}

/// Kind of feature a [`FeatureRequest`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    Water,
    Grass,
    Boulders,
    Traps,
    Doors,
    DoubleDoors,
    Lake,
    Maze,
}

impl FeatureKind {
    /// Whether the feature is placed per environment.
    pub fn is_environmental(self) -> bool {
        matches!(
            self,
            FeatureKind::Water | FeatureKind::Grass | FeatureKind::Boulders | FeatureKind::Traps
        )
    }
}

/// One caller request: a feature, how much of it, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub kind: FeatureKind,
    pub percentage: Percentage,
    /// Environment the request applies to; `None` means every environment
    #[serde(default)]
    pub environment: Option<EnvironmentTag>,
    /// Island spacing for water requests
    #[serde(default)]
    pub spacing: Option<u32>,
}

impl FeatureRequest {
    /// Request that applies to every environment.
    pub fn new(kind: FeatureKind, percentage: Percentage) -> Self {
        Self {
            kind,
            percentage,
            environment: None,
            spacing: None,
        }
    }

    pub fn in_environment(mut self, environment: EnvironmentTag) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_spacing(mut self, spacing: u32) -> Self {
        self.spacing = Some(spacing);
        self
    }
}

/// Everything a dressing pass should place, validated once up front.
///
/// All features default to off.
///
/// # Examples
///
/// ```
/// use cairn::{EnvironmentTag, FeatureConfig, FeatureKind, FeatureRequest, Percentage};
///
/// let config = FeatureConfig::from_requests(&[
///     FeatureRequest::new(FeatureKind::Water, Percentage::new(20).unwrap()),
///     FeatureRequest::new(FeatureKind::Grass, Percentage::new(10).unwrap())
///         .in_environment(EnvironmentTag::Cave),
/// ])
/// .unwrap();
/// assert_eq!(config.room.water.value(), 20);
/// assert_eq!(config.cave.grass.value(), 10);
/// assert!(config.room.grass.is_zero());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub room: EnvironmentFeatures,
    pub corridor: EnvironmentFeatures,
    pub cave: EnvironmentFeatures,
    pub doors: Option<DoorRequest>,
    pub lake: Percentage,
    pub maze: Percentage,
    pub volume_mapping: VolumeMapping,
    /// Staircase placement attempts before asking for a new skeleton
    pub stair_attempts: u32,
    /// Largest share of the skeleton's floor stair placement may prune
    pub max_pruned_fraction: f64,
    pub doorway_scan_radius: f64,
    pub bonus_frustration_limit: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            room: EnvironmentFeatures::default(),
            corridor: EnvironmentFeatures::default(),
            cave: EnvironmentFeatures::default(),
            doors: None,
            lake: Percentage::ZERO,
            maze: Percentage::ZERO,
            volume_mapping: VolumeMapping::Standard,
            stair_attempts: config::DEFAULT_STAIR_ATTEMPTS,
            max_pruned_fraction: config::DEFAULT_MAX_PRUNED_FRACTION,
            doorway_scan_radius: config::DEFAULT_DOORWAY_SCAN_RADIUS,
            bonus_frustration_limit: config::DEFAULT_BONUS_FRUSTRATION_LIMIT,
        }
    }
}

impl FeatureConfig {
    /// A configuration that places nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from caller requests.
    ///
    /// A request without an environment adds to every environment, capped at
    /// 100. Doors, lakes and mazes are whole-map features and reject an
    /// environment filter.
    pub fn from_requests(requests: &[FeatureRequest]) -> CairnResult<Self> {
        let mut config = Self::default();
        for request in requests {
            config.apply(request)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, request: &FeatureRequest) -> CairnResult<()> {
        if !request.kind.is_environmental() {
            if let Some(environment) = request.environment {
                return Err(CairnError::InvalidConfig(format!(
                    "{:?} cannot be limited to the {:?} environment",
                    request.kind, environment
                )));
            }
        }

        match request.kind {
            FeatureKind::Doors | FeatureKind::DoubleDoors => {
                self.doors = Some(DoorRequest {
                    percentage: request.percentage,
                    double_wide: request.kind == FeatureKind::DoubleDoors,
                });
            }
            FeatureKind::Lake => self.lake = request.percentage,
            FeatureKind::Maze => self.maze = request.percentage,
            kind => {
                let targets: Vec<&mut EnvironmentFeatures> = match request.environment {
                    Some(EnvironmentTag::Room) => vec![&mut self.room],
                    Some(EnvironmentTag::Corridor) => vec![&mut self.corridor],
                    Some(EnvironmentTag::Cave) => vec![&mut self.cave],
                    Some(EnvironmentTag::Untouched) => {
                        return Err(CairnError::InvalidConfig(
                            "features cannot be placed in untouched cells".to_string(),
                        ))
                    }
                    None => vec![&mut self.room, &mut self.corridor, &mut self.cave],
                };
                for features in targets {
                    let slot = match kind {
                        FeatureKind::Water => {
                            if request.spacing.is_some() {
                                features.island_spacing = request.spacing;
                            }
                            &mut features.water
                        }
                        FeatureKind::Grass => &mut features.grass,
                        FeatureKind::Boulders => &mut features.boulders,
                        _ => &mut features.traps,
                    };
                    *slot = slot.saturating_add(request.percentage);
                }
            }
        }
        Ok(())
    }

    /// Features requested for `environment`.
    pub fn features_for(&self, environment: EnvironmentTag) -> Option<&EnvironmentFeatures> {
        match environment {
            EnvironmentTag::Room => Some(&self.room),
            EnvironmentTag::Corridor => Some(&self.corridor),
            EnvironmentTag::Cave => Some(&self.cave),
            EnvironmentTag::Untouched => None,
        }
    }

    /// Checks the knobs that are not percentages.
    pub fn validate(&self) -> CairnResult<()> {
        if self.stair_attempts == 0 {
            return Err(CairnError::InvalidConfig(
                "stair_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.max_pruned_fraction) {
            return Err(CairnError::InvalidConfig(format!(
                "max_pruned_fraction {} must be in [0, 1)",
                self.max_pruned_fraction
            )));
        }
        if !self.doorway_scan_radius.is_finite() || self.doorway_scan_radius <= 0.0 {
            return Err(CairnError::InvalidConfig(format!(
                "doorway_scan_radius {} must be a positive number",
                self.doorway_scan_radius
            )));
        }
        if self.bonus_frustration_limit == 0 {
            return Err(CairnError::InvalidConfig(
                "bonus_frustration_limit must be at least 1".to_string(),
            ));
        }
        for features in [&self.room, &self.corridor, &self.cave] {
            if let Some(spacing) = features.island_spacing.filter(|&s| s < 2) {
                return Err(CairnError::InvalidConfig(format!(
                    "island spacing {} must be at least 2",
                    spacing
                )));
            }
        }
        Ok(())
    }

    /// Whether the pass would only place stairs.
    pub fn is_empty(&self) -> bool {
        self.room.is_empty()
            && self.corridor.is_empty()
            && self.cave.is_empty()
            && self.doors.map_or(true, |d| d.percentage.is_zero())
            && self.lake.is_zero()
            && self.maze.is_zero()
    }
}

/// Input to a dressing pass: a wall/floor grid and its floor classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skeleton {
    terrain: Grid<Terrain>,
    environment: Option<Grid<EnvironmentTag>>,
}

impl Skeleton {
    /// Skeleton without a classification; every floor cell counts as room.
    pub fn new(terrain: Grid<Terrain>) -> Self {
        Self {
            terrain,
            environment: None,
        }
    }

    /// Skeleton with a classification grid of the same size.
    pub fn with_environment(
        terrain: Grid<Terrain>,
        environment: Grid<EnvironmentTag>,
    ) -> CairnResult<Self> {
        terrain.check_same_size(&environment)?;
        Ok(Self {
            terrain,
            environment: Some(environment),
        })
    }

    /// Parses a skeleton from glyph text.
    pub fn from_ascii(text: &str) -> CairnResult<Self> {
        Ok(Self::new(parse_terrain(text)?))
    }

    /// Parses a skeleton and its environment codes from text.
    pub fn from_ascii_with_environment(terrain: &str, environment: &str) -> CairnResult<Self> {
        Self::with_environment(parse_terrain(terrain)?, parse_environment(environment)?)
    }

    pub fn terrain(&self) -> &Grid<Terrain> {
        &self.terrain
    }

    pub fn environment(&self) -> Option<&Grid<EnvironmentTag>> {
        self.environment.as_ref()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.terrain.dimensions()
    }

    /// The skeleton collapsed to wall and floor, with its border walled in.
    /// Stair markers are kept.
    pub fn normalized_terrain(&self) -> Grid<Terrain> {
        let mut grid = self.terrain.map(|_, &t| if t.is_stairs() { t } else { t.bare() });
        wall_wrap(&mut grid);
        grid
    }

    /// Per-cell environment for floor cells of `terrain`.
    ///
    /// Missing classifications default to room; floor cells classified as
    /// untouched are treated as corridor. Non-floor cells are untouched.
    pub fn resolved_environment(&self, terrain: &Grid<Terrain>) -> Grid<EnvironmentTag> {
        terrain.map(|pos, t| {
            if !t.is_passable() {
                return EnvironmentTag::Untouched;
            }
            match self.environment.as_ref().and_then(|env| env.get(pos)) {
                None => EnvironmentTag::Room,
                Some(EnvironmentTag::Untouched) => EnvironmentTag::Corridor,
                Some(&tag) => tag,
            }
        })
    }

    /// Basic sanity checks: big enough to hold a border and some floor.
    pub fn validate(&self) -> CairnResult<()> {
        let (width, height) = self.dimensions();
        if width < 3 || height < 3 {
            return Err(CairnError::InvalidMap(format!(
                "skeleton {}x{} is too small",
                width, height
            )));
        }
        let floor = bare_terrain(&self.normalized_terrain()).count_where(|t| *t == Terrain::Floor);
        if floor == 0 {
            return Err(CairnError::InvalidMap(
                "skeleton has no floor cells".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for skeleton producers.
///
/// The retrying dressing wrapper asks a source for a fresh skeleton whenever
/// staircase placement gives up on the current one.
pub trait SkeletonSource {
    /// Produces a skeleton using the provided random number generator.
    fn generate(&self, rng: &mut StdRng) -> CairnResult<Skeleton>;

    /// Validates that the produced skeleton meets requirements.
    fn validate(&self, skeleton: &Skeleton) -> CairnResult<()> {
        skeleton.validate()
    }

    /// Gets the source type name for logging and debugging.
    fn source_type(&self) -> &'static str;
}

/// Utility functions for generation.
pub mod utils {
    use super::*;
    use rand::SeedableRng;

    /// Creates a seeded random number generator from the skeleton config.
    pub fn create_rng(config: &SkeletonConfig) -> StdRng {
        StdRng::seed_from_u64(config.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coord;

    #[test]
    fn test_percentage_bounds() {
        assert!(Percentage::new(0).is_ok());
        assert!(Percentage::new(100).is_ok());
        assert!(Percentage::new(101).is_err());
        assert_eq!(Percentage::new(70).unwrap().saturating_add(Percentage::new(50).unwrap()), Percentage::FULL);
    }

    #[test]
    fn test_percentage_deserialization_is_validated() {
        let ok: Percentage = serde_json::from_str("45").unwrap();
        assert_eq!(ok.value(), 45);
        assert!(serde_json::from_str::<Percentage>("150").is_err());
    }

    #[test]
    fn test_volume_mapping() {
        let p = Percentage::new(30).unwrap();
        assert_eq!(VolumeMapping::Standard.volume(1000, p), 300);
        assert_eq!(VolumeMapping::TwoThirds.volume(1000, p), 200);
        assert_eq!(VolumeMapping::Standard.volume(1000, Percentage::ZERO), 0);
    }

    #[test]
    fn test_unfiltered_requests_add_everywhere() {
        let config = FeatureConfig::from_requests(&[
            FeatureRequest::new(FeatureKind::Traps, Percentage::new(60).unwrap()),
            FeatureRequest::new(FeatureKind::Traps, Percentage::new(10).unwrap())
                .in_environment(EnvironmentTag::Corridor),
            FeatureRequest::new(FeatureKind::Traps, Percentage::new(50).unwrap())
                .in_environment(EnvironmentTag::Cave),
        ])
        .unwrap();
        assert_eq!(config.room.traps.value(), 60);
        assert_eq!(config.corridor.traps.value(), 70);
        assert_eq!(config.cave.traps, Percentage::FULL);
    }

    #[test]
    fn test_global_features_reject_environment() {
        let request = FeatureRequest::new(FeatureKind::Doors, Percentage::new(10).unwrap())
            .in_environment(EnvironmentTag::Room);
        assert!(FeatureConfig::from_requests(&[request]).is_err());

        let config = FeatureConfig::from_requests(&[
            FeatureRequest::new(FeatureKind::DoubleDoors, Percentage::new(40).unwrap()),
            FeatureRequest::new(FeatureKind::Lake, Percentage::new(30).unwrap()),
        ])
        .unwrap();
        assert_eq!(
            config.doors,
            Some(DoorRequest {
                percentage: Percentage::new(40).unwrap(),
                double_wide: true
            })
        );
        assert_eq!(config.lake.value(), 30);
    }

    #[test]
    fn test_island_spacing_from_water_request() {
        let config = FeatureConfig::from_requests(&[FeatureRequest::new(
            FeatureKind::Water,
            Percentage::new(25).unwrap(),
        )
        .in_environment(EnvironmentTag::Cave)
        .with_spacing(4)])
        .unwrap();
        assert_eq!(config.cave.island_spacing, Some(4));
        assert_eq!(config.room.island_spacing, None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FeatureConfig::new();
        assert!(config.validate().is_ok());
        assert!(config.is_empty());

        config.stair_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = FeatureConfig::new();
        config.max_pruned_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = FeatureConfig::new();
        config.cave.island_spacing = Some(0);
        assert!(config.validate().is_err());
        config.cave.island_spacing = Some(1);
        assert!(config.validate().is_err());
        config.cave.island_spacing = Some(2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_percentage_saturating() {
        assert_eq!(Percentage::saturating(40).value(), 40);
        assert_eq!(Percentage::saturating(100), Percentage::FULL);
        assert_eq!(Percentage::saturating(250), Percentage::FULL);
        assert!(Percentage::saturating(0).is_zero());
    }

    #[test]
    fn test_config_json_defaults() {
        let config: FeatureConfig =
            serde_json::from_str(r#"{ "room": { "water": 30 }, "lake": 20 }"#).unwrap();
        assert_eq!(config.room.water.value(), 30);
        assert_eq!(config.lake.value(), 20);
        assert_eq!(config.stair_attempts, crate::config::DEFAULT_STAIR_ATTEMPTS);
        assert!(serde_json::from_str::<FeatureConfig>(r#"{ "maze": 300 }"#).is_err());
    }

    #[test]
    fn test_skeleton_environment_resolution() {
        let skeleton = Skeleton::from_ascii_with_environment(
            "#####\n#...#\n#####",
            "#####\n#rc #\n#####",
        )
        .unwrap();
        let terrain = skeleton.normalized_terrain();
        let env = skeleton.resolved_environment(&terrain);
        assert_eq!(env[Coord::new(1, 1)], EnvironmentTag::Room);
        assert_eq!(env[Coord::new(2, 1)], EnvironmentTag::Corridor);
        assert_eq!(env[Coord::new(3, 1)], EnvironmentTag::Corridor);
        assert_eq!(env[Coord::new(0, 0)], EnvironmentTag::Untouched);

        let bare = Skeleton::from_ascii("#####\n#...#\n#####").unwrap();
        let env = bare.resolved_environment(&bare.normalized_terrain());
        assert_eq!(env[Coord::new(3, 1)], EnvironmentTag::Room);
    }

    #[test]
    fn test_skeleton_dimension_mismatch() {
        let result = Skeleton::from_ascii_with_environment("###\n#.#\n###", "####\n#r##\n####");
        assert!(matches!(result, Err(CairnError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_normalization_walls_the_border() {
        let skeleton = Skeleton::from_ascii("....\n.<>.\n....").unwrap();
        let grid = skeleton.normalized_terrain();
        assert_eq!(grid[Coord::new(0, 0)], Terrain::Wall);
        assert_eq!(grid[Coord::new(1, 1)], Terrain::StairUp);
        assert_eq!(grid[Coord::new(2, 1)], Terrain::StairDown);
    }
}
