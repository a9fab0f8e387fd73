//! # Dressing Pipeline
//!
//! [`DungeonDresser`] runs the whole dressing pass over a [`Skeleton`]:
//!
//! ```text
//! Init -> StairsPlaced -> FeaturesFilled -> LakesMazesCarved -> DoorsPlaced -> Composited -> Done
//! ```
//!
//! Each stage owns its output exclusively; the composite step merges them
//! with a fixed precedence (highest first):
//!
//! 1. doors and the walls closing double-wide gaps
//! 2. stairs
//! 3. room fill
//! 4. lake and maze carving (bridges where corridors cross a lake)
//! 5. corridor fill
//! 6. cave fill
//! 7. wall
//!
//! A final sealing pass walls off anything the up stair cannot reach, so
//! every passable cell of the result is connected.

use crate::{
    bare_terrain, render_terrain, Adjacency, CairnError, CairnResult, Carving, Coord, DoorLayer,
    DoorwayClassifier, EnvironmentTag, FeatureConfig, FeatureFiller, FeatureLayer, Grid,
    LakeMazeCarver, Metric, ReachabilityField, Region, Skeleton, SkeletonSource, SpillEngine,
    StairPlacer, StaircasePair, Terrain,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of a dressing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Init,
    StairsPlaced,
    FeaturesFilled,
    LakesMazesCarved,
    DoorsPlaced,
    Composited,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Init => "init",
            PipelineStage::StairsPlaced => "stairs placed",
            PipelineStage::FeaturesFilled => "features filled",
            PipelineStage::LakesMazesCarved => "lakes and mazes carved",
            PipelineStage::DoorsPlaced => "doors placed",
            PipelineStage::Composited => "composited",
            PipelineStage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Output of a dressing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DressedDungeon {
    terrain: Grid<Terrain>,
    environment: Grid<EnvironmentTag>,
    stairs: StaircasePair,
    rebuild_seed: u64,
}

impl DressedDungeon {
    pub fn terrain(&self) -> &Grid<Terrain> {
        &self.terrain
    }

    /// Final classification of passable cells; blocked cells are untouched.
    pub fn environment(&self) -> &Grid<EnvironmentTag> {
        &self.environment
    }

    pub fn stairs(&self) -> StaircasePair {
        self.stairs
    }

    /// Seed that reproduces this dungeon through
    /// [`DungeonDresser::generate_from_seed`].
    pub fn rebuild_seed(&self) -> u64 {
        self.rebuild_seed
    }

    /// The terrain collapsed to wall and floor.
    pub fn bare(&self) -> Grid<Terrain> {
        bare_terrain(&self.terrain)
    }

    /// The terrain as glyph text, one line per row.
    pub fn render(&self) -> String {
        render_terrain(&self.terrain)
    }
}

/// Feature layers of one pass, one per environment.
struct FillLayers {
    room: FeatureLayer,
    corridor: FeatureLayer,
    cave: FeatureLayer,
}

impl FillLayers {
    fn placed(&self, environment: EnvironmentTag, pos: Coord) -> Option<Terrain> {
        match environment {
            EnvironmentTag::Room => self.room.placed(pos),
            EnvironmentTag::Corridor => self.corridor.placed(pos),
            EnvironmentTag::Cave => self.cave.placed(pos),
            EnvironmentTag::Untouched => None,
        }
    }
}

/// Runs the dressing pass and keeps the last result.
///
/// # Examples
///
/// ```
/// use cairn::{DungeonDresser, FeatureConfig, FeatureKind, FeatureRequest, Percentage, Skeleton};
///
/// let wall = "#".repeat(40);
/// let row = format!("#{}#", ".".repeat(38));
/// let (wall, row) = (wall.as_str(), row.as_str());
/// let text = [wall, row, row, row, row, wall].join("\n");
/// let skeleton = Skeleton::from_ascii(&text).unwrap();
/// let config = FeatureConfig::from_requests(&[FeatureRequest::new(
///     FeatureKind::Grass,
///     Percentage::new(20).unwrap(),
/// )])
/// .unwrap();
///
/// let mut dresser = DungeonDresser::new(config).unwrap();
/// let seed = dresser.generate_from_seed(&skeleton, 9).unwrap().rebuild_seed();
/// assert_eq!(seed, 9);
/// assert!(dresser.dungeon().unwrap().render().contains('"'));
/// ```
#[derive(Debug, Clone)]
pub struct DungeonDresser {
    config: FeatureConfig,
    stage: PipelineStage,
    last: Option<DressedDungeon>,
}

impl DungeonDresser {
    /// Creates a dresser after validating `config`.
    pub fn new(config: FeatureConfig) -> CairnResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stage: PipelineStage::Init,
            last: None,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Stage reached by the latest pass.
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Dresses `skeleton`, drawing the rebuild seed from `rng`.
    ///
    /// Fails with [`CairnError::StairPlacementExhausted`] when the skeleton
    /// cannot host a staircase pair; the caller should then supply a new
    /// skeleton.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        skeleton: &Skeleton,
        rng: &mut R,
    ) -> CairnResult<&DressedDungeon> {
        let seed = rng.gen::<u64>();
        self.generate_from_seed(skeleton, seed)
    }

    /// Replays the pass that produced a dungeon with this rebuild seed.
    pub fn generate_from_seed(
        &mut self,
        skeleton: &Skeleton,
        seed: u64,
    ) -> CairnResult<&DressedDungeon> {
        let dungeon = self.dress(skeleton, seed)?;
        Ok(&*self.last.insert(dungeon))
    }

    /// Asks `source` for fresh skeletons until one can be dressed, trying at
    /// most `retries` skeletons.
    pub fn generate_with_retries(
        &mut self,
        source: &dyn SkeletonSource,
        rng: &mut StdRng,
        retries: u32,
    ) -> CairnResult<&DressedDungeon> {
        for attempt in 1..=retries {
            let skeleton = source.generate(rng)?;
            let seed = rng.gen::<u64>();
            match self.dress(&skeleton, seed) {
                Ok(dungeon) => {
                    info!(
                        "dressed {} skeleton on attempt {}/{}",
                        source.source_type(),
                        attempt,
                        retries
                    );
                    return Ok(&*self.last.insert(dungeon));
                }
                Err(e) if e.requires_regeneration() => {
                    warn!(
                        "skeleton {}/{} from {} rejected, regenerating: {}",
                        attempt,
                        retries,
                        source.source_type(),
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(CairnError::RetriesExhausted { attempts: retries })
    }

    /// The latest dressed dungeon.
    pub fn dungeon(&self) -> Option<&DressedDungeon> {
        self.last.as_ref()
    }

    /// The latest dungeon collapsed to wall and floor.
    pub fn bare_dungeon(&self) -> Option<Grid<Terrain>> {
        self.last.as_ref().map(DressedDungeon::bare)
    }

    pub fn stairs(&self) -> Option<StaircasePair> {
        self.last.as_ref().map(DressedDungeon::stairs)
    }

    pub fn rebuild_seed(&self) -> Option<u64> {
        self.last.as_ref().map(DressedDungeon::rebuild_seed)
    }

    fn advance(&mut self, stage: PipelineStage) {
        debug!("pipeline: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn dress(&mut self, skeleton: &Skeleton, seed: u64) -> CairnResult<DressedDungeon> {
        self.stage = PipelineStage::Init;
        skeleton.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let config = self.config.clone();

        let terrain = skeleton.normalized_terrain();
        let placement =
            StairPlacer::new(config.stair_attempts, config.max_pruned_fraction).place(&terrain, &mut rng)?;
        let stairs = placement.stairs;
        let protected = [stairs.up, stairs.down];
        let environment = skeleton.resolved_environment(&placement.terrain);
        self.advance(PipelineStage::StairsPlaced);

        let filler = FeatureFiller::new(
            SpillEngine::new(config.bonus_frustration_limit),
            config.volume_mapping,
        );
        let fill = |tag: EnvironmentTag, rng: &mut StdRng| {
            let floor = Region::from_grid(&environment, |e| *e == tag);
            let features = config.features_for(tag).copied().unwrap_or_default();
            filler.fill(&placement.terrain, &floor, &features, &protected, rng)
        };
        let layers = FillLayers {
            room: fill(EnvironmentTag::Room, &mut rng),
            corridor: fill(EnvironmentTag::Corridor, &mut rng),
            cave: fill(EnvironmentTag::Cave, &mut rng),
        };
        self.advance(PipelineStage::FeaturesFilled);

        let carving = LakeMazeCarver::new().carve(
            &placement.terrain,
            &environment,
            config.lake,
            config.maze,
            &mut rng,
        );
        self.advance(PipelineStage::LakesMazesCarved);

        let base = Self::composite(&placement.terrain, &environment, &layers, &carving);
        let doors = match config.doors {
            Some(request) if !request.percentage.is_zero() => {
                let classifier =
                    DoorwayClassifier::new(request.double_wide, config.doorway_scan_radius);
                let (candidates, excluded) = Self::door_candidates(&base, &carving, &protected);
                let viable = classifier.find_doorways(&base, &candidates, &excluded);
                classifier.place_doors(&base, &viable, request.percentage, &protected, &mut rng)
            }
            _ => DoorLayer::default(),
        };
        self.advance(PipelineStage::DoorsPlaced);

        let mut terrain = base;
        doors.apply(&mut terrain);
        self.advance(PipelineStage::Composited);

        let sealed = Self::seal(&mut terrain, stairs)?;
        let environment = terrain.map(|pos, t| {
            if t.is_passable() {
                carving.environment[pos]
            } else {
                EnvironmentTag::Untouched
            }
        });
        self.advance(PipelineStage::Done);
        debug!(
            "dressed {}x{} dungeon: {} doors, {} cells sealed, seed {}",
            terrain.width(),
            terrain.height(),
            doors.doors.len(),
            sealed,
            seed
        );

        Ok(DressedDungeon {
            terrain,
            environment,
            stairs,
            rebuild_seed: seed,
        })
    }

    /// Merges stairs, fill layers and carving below the door layer.
    fn composite(
        terrain: &Grid<Terrain>,
        environment: &Grid<EnvironmentTag>,
        layers: &FillLayers,
        carving: &Carving,
    ) -> Grid<Terrain> {
        terrain.map(|pos, &base| {
            if base.is_stairs() {
                return base;
            }
            let tag = environment[pos];
            if tag == EnvironmentTag::Room {
                return layers.placed(tag, pos).unwrap_or(Terrain::Floor);
            }
            if let Some(carved) = carving.terrain_at(pos) {
                return carved;
            }
            match tag {
                EnvironmentTag::Untouched => Terrain::Wall,
                _ => layers.placed(tag, pos).unwrap_or(Terrain::Floor),
            }
        })
    }

    /// Door candidates are room and corridor cells left after carving; cells
    /// touching a cave are excluded. Corridor cells stay in because a
    /// corridor usually owns the cell where it breaks through a room wall.
    fn door_candidates(
        grid: &Grid<Terrain>,
        carving: &Carving,
        stairs: &[Coord],
    ) -> (Region, Region) {
        let passable = Region::from_grid(grid, |t| t.is_passable());
        let mut candidates = Region::from_grid(&carving.environment, |e| {
            matches!(e, EnvironmentTag::Room | EnvironmentTag::Corridor)
        });
        candidates.intersect(&passable);
        candidates.subtract(&carving.maze);
        for &pos in stairs {
            candidates.off(pos);
        }

        let mut caves = Region::from_grid(&carving.environment, |e| *e == EnvironmentTag::Cave);
        caves.intersect(&passable);
        (candidates, caves.expand(1, Adjacency::Octile))
    }

    /// Walls off passable cells the up stair cannot reach. Returns how many
    /// cells were sealed.
    fn seal(terrain: &mut Grid<Terrain>, stairs: StaircasePair) -> CairnResult<usize> {
        let field = ReachabilityField::new(terrain, Metric::Manhattan);
        let scan = field.scan(&[stairs.up], &[]);
        if !scan.is_reached(stairs.down) {
            return Err(CairnError::GenerationFailed(format!(
                "down stair at {:?} cut off from the up stair at {:?}",
                stairs.down, stairs.up
            )));
        }

        let mut sealed = 0;
        for pos in field.passable().iter() {
            if !scan.is_reached(pos) {
                terrain[pos] = Terrain::Wall;
                sealed += 1;
            }
        }
        Ok(sealed)
    }
}
