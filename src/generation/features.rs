//! # Feature Fill
//!
//! Places boulders, water, islands, grass and traps on the floor of one
//! environment (rooms, corridors or caves), in that order.
//!
//! Each environment is filled into its own layer. Layers never overlap
//! because each only writes cells of its own environment; the pipeline
//! composites them afterwards.

use crate::utils::{between, scale_pair};
use crate::{
    Adjacency, Coord, Direction, EnvironmentFeatures, Grid, Percentage, Region, SpillEngine,
    Terrain, VolumeMapping,
};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Counts of what a fill placed, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FillStats {
    /// Floor cells of the environment (stairs included)
    pub floor: usize,
    pub boulders: usize,
    pub water: usize,
    pub islands: usize,
    pub grass: usize,
    pub traps: usize,
}

/// Terrain placed in one environment. Cells left alone are
/// [`Terrain::Untouched`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayer {
    pub terrain: Grid<Terrain>,
    pub stats: FillStats,
}

impl FeatureLayer {
    /// Terrain placed at `pos`, if any.
    pub fn placed(&self, pos: Coord) -> Option<Terrain> {
        self.terrain
            .get(pos)
            .copied()
            .filter(|t| *t != Terrain::Untouched)
    }
}

/// Fills environment floors with features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFiller {
    engine: SpillEngine,
    volume_mapping: VolumeMapping,
}

impl FeatureFiller {
    pub fn new(engine: SpillEngine, volume_mapping: VolumeMapping) -> Self {
        Self {
            engine,
            volume_mapping,
        }
    }

    /// Fills the cells of `floor` according to `features`.
    ///
    /// `terrain` is the pruned skeleton with stairs; `protected` cells
    /// (stairs) never receive a feature.
    pub fn fill<R: Rng + ?Sized>(
        &self,
        terrain: &Grid<Terrain>,
        floor: &Region,
        features: &EnvironmentFeatures,
        protected: &[Coord],
        rng: &mut R,
    ) -> FeatureLayer {
        let (width, height) = terrain.dimensions();
        let mut layer = Grid::new(width, height, Terrain::Untouched);
        let mut stats = FillStats {
            floor: floor.count(),
            ..FillStats::default()
        };
        if features.is_empty() || floor.is_empty() {
            return FeatureLayer {
                terrain: layer,
                stats,
            };
        }

        let mut working = terrain.clone();
        let mut open = floor.clone();
        for &pos in protected {
            open.off(pos);
        }

        let boulders = self.place_boulders(&mut working, floor, &open, features.boulders, rng);
        open.subtract(&boulders);
        for pos in boulders.iter() {
            layer[pos] = Terrain::Boulder;
        }
        stats.boulders = boulders.count();

        let (water_pct, grass_pct) = Self::normalized(features.water, features.grass);
        let dry_floor = open.count();
        let mut claimable = open.clone();

        let water_target = self.volume_mapping.volume(dry_floor, water_pct);
        let water = self
            .engine
            .fill(&mut claimable, water_target, between(rng, 3, 6), rng);
        for pos in water.iter() {
            let shore = pos.cardinal_adjacent_positions().iter().any(|&n| {
                working.get(n).map_or(false, |t| t.is_passable()) && !water.contains(n)
            });
            layer[pos] = if shore {
                Terrain::WaterShallow
            } else {
                Terrain::WaterDeep
            };
        }
        stats.water = water.count();

        // spacing 1 would sample every water cell
        if let Some(spacing) = features.island_spacing.filter(|&s| s > 1) {
            stats.islands = Self::place_islands(&mut layer, &water, spacing, rng);
        }

        let grass_target = self.volume_mapping.volume(dry_floor, grass_pct);
        let grass = self
            .engine
            .fill(&mut claimable, grass_target, between(rng, 2, 5), rng);
        for pos in grass.iter() {
            layer[pos] = Terrain::Grass;
        }
        stats.grass = grass.count();

        let mut hazards = Region::from_coords(
            width,
            height,
            open.iter()
                .filter(|&pos| Self::open_neighbors(&working, pos) >= 5),
        );
        hazards.subtract(&water);
        let traps = hazards.random_sample(rng, features.traps.of(hazards.count()));
        for &pos in &traps {
            layer[pos] = Terrain::Trap;
        }
        stats.traps = traps.len();

        debug!("feature fill: {:?}", stats);
        FeatureLayer {
            terrain: layer,
            stats,
        }
    }

    /// Water and grass scaled down together when they ask for more than the
    /// whole floor.
    fn normalized(water: Percentage, grass: Percentage) -> (Percentage, Percentage) {
        let (w, g) = scale_pair(water.value() as usize, grass.value() as usize, 100);
        (Percentage::saturating(w as u8), Percentage::saturating(g as u8))
    }

    fn open_neighbors(grid: &Grid<Terrain>, pos: Coord) -> usize {
        pos.adjacent_positions()
            .iter()
            .filter(|&&n| grid.get(n).map_or(false, |t| t.is_passable()))
            .count()
    }

    /// Scatters boulders on the interior of `floor`. A boulder only goes
    /// where its open cardinal neighbours stay linked through the ring of
    /// eight cells around it, so any path that crossed its cell can step
    /// around instead. Boulders may touch; very dense requests stop short
    /// once no cell passes the check.
    fn place_boulders<R: Rng + ?Sized>(
        &self,
        working: &mut Grid<Terrain>,
        floor: &Region,
        open: &Region,
        percentage: Percentage,
        rng: &mut R,
    ) -> Region {
        let (width, height) = working.dimensions();
        let mut placed = Region::new(width, height);
        let mut candidates: Vec<Coord> = floor
            .retract(1, Adjacency::Octile)
            .iter()
            .filter(|&pos| open.contains(pos))
            .collect();
        let target = self
            .volume_mapping
            .volume(floor.count(), percentage)
            .min(candidates.len());
        candidates.shuffle(rng);

        let mut candidates = candidates.into_iter();
        while placed.count() < target {
            let Some(pos) = candidates.next() else {
                break;
            };
            if !Self::ring_stays_linked(working, pos) {
                continue;
            }
            working[pos] = Terrain::Boulder;
            placed.on(pos);
        }
        placed
    }

    /// Whether every open cardinal neighbour of `pos` sits in the same run
    /// of open cells going round its eight neighbours.
    fn ring_stays_linked(grid: &Grid<Terrain>, pos: Coord) -> bool {
        const RING: [Direction; 8] = [
            Direction::North,
            Direction::Northeast,
            Direction::East,
            Direction::Southeast,
            Direction::South,
            Direction::Southwest,
            Direction::West,
            Direction::Northwest,
        ];
        let open: Vec<bool> = RING
            .iter()
            .map(|&d| grid.get(pos.step(d)).map_or(false, |t| t.is_passable()))
            .collect();
        // start just after a closed cell so no run wraps past the end
        let Some(closed) = open.iter().position(|o| !o) else {
            return true;
        };

        let mut runs_with_exit = 0;
        let mut in_run = false;
        let mut run_has_exit = false;
        for step in 1..=RING.len() {
            let i = (closed + step) % RING.len();
            if open[i] {
                in_run = true;
                // even ring slots are the cardinal neighbours
                run_has_exit |= i % 2 == 0;
            } else if in_run {
                runs_with_exit += usize::from(run_has_exit);
                in_run = false;
                run_has_exit = false;
            }
        }
        runs_with_exit <= 1
    }

    /// Turns separated water cells into small islands ringed by shallows.
    fn place_islands<R: Rng + ?Sized>(
        layer: &mut Grid<Terrain>,
        water: &Region,
        spacing: u32,
        rng: &mut R,
    ) -> usize {
        let centers = water.separated_sample(rng, spacing as f64);
        for &center in &centers {
            layer[center] = Terrain::Floor;
            for n in center.cardinal_adjacent_positions() {
                if water.contains(n) {
                    layer[n] = Terrain::WaterShallow;
                }
            }
        }
        centers.len()
    }
}
