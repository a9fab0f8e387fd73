//! # Staircase Placement
//!
//! Picks an up/down staircase pair on a skeleton and walls off whatever the
//! up stair cannot reach.
//!
//! An attempt picks a random floor cell for the up stair and scans from it.
//! The attempt is accepted when the scan covers at least `width + height`
//! cells, every floor blob it misses is smaller than that, and no more than
//! the configured share of the floor is left unreachable. The down stair then goes on a random reached cell at least
//! 70% as far away as the farthest one. When every attempt fails the caller
//! gets [`CairnError::StairPlacementExhausted`] and should try a new
//! skeleton.

use crate::utils::fraction;
use crate::{
    config, Adjacency, CairnError, CairnResult, Coord, DistanceField, Grid, Metric,
    ReachabilityField, Region, Terrain,
};
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The two staircase cells of a dressed dungeon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaircasePair {
    pub up: Coord,
    pub down: Coord,
}

/// Result of a successful placement.
#[derive(Debug, Clone)]
pub struct StairPlacement {
    pub stairs: StaircasePair,
    /// The input grid with unreachable floor walled off and stairs marked
    pub terrain: Grid<Terrain>,
    /// Distances from the up stair over `terrain`
    pub distances: DistanceField,
    /// Number of passable cells turned into wall
    pub pruned: usize,
}

/// Staircase placement policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StairPlacer {
    attempts: u32,
    max_pruned_fraction: f64,
    metric: Metric,
}

impl Default for StairPlacer {
    fn default() -> Self {
        Self::new(
            config::DEFAULT_STAIR_ATTEMPTS,
            config::DEFAULT_MAX_PRUNED_FRACTION,
        )
    }
}

impl StairPlacer {
    pub fn new(attempts: u32, max_pruned_fraction: f64) -> Self {
        Self {
            attempts,
            max_pruned_fraction,
            metric: Metric::Manhattan,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Places stairs on `grid`.
    ///
    /// If the grid already carries both an up and a down marker they are
    /// kept, and the attempt only fails when the down stair is unreachable.
    /// Otherwise any lone marker is treated as floor and stairs are chosen at
    /// random.
    pub fn place<R: Rng + ?Sized>(
        &self,
        grid: &Grid<Terrain>,
        rng: &mut R,
    ) -> CairnResult<StairPlacement> {
        let up_marker = grid.iter().find(|(_, t)| **t == Terrain::StairUp).map(|(c, _)| c);
        let down_marker = grid.iter().find(|(_, t)| **t == Terrain::StairDown).map(|(c, _)| c);

        match (up_marker, down_marker) {
            (Some(up), Some(down)) => self.place_fixed(grid, StaircasePair { up, down }),
            _ => self.place_random(grid, rng),
        }
    }

    fn place_fixed(&self, grid: &Grid<Terrain>, stairs: StaircasePair) -> CairnResult<StairPlacement> {
        let field = ReachabilityField::new(grid, self.metric);
        let scan = field.scan(&[stairs.up], &[]);
        if !scan.is_reached(stairs.down) {
            warn!(
                "down stair at {:?} is unreachable from the up stair at {:?}",
                stairs.down, stairs.up
            );
            return Err(CairnError::StairPlacementExhausted { attempts: 1 });
        }
        Ok(Self::finish(grid, field.passable(), scan, stairs))
    }

    fn place_random<R: Rng + ?Sized>(
        &self,
        grid: &Grid<Terrain>,
        rng: &mut R,
    ) -> CairnResult<StairPlacement> {
        let cleared = grid.map(|_, &t| if t.is_stairs() { Terrain::Floor } else { t });
        let field = ReachabilityField::new(&cleared, self.metric);
        let floor = field.passable();
        let min_mapped = grid.width() + grid.height();

        for attempt in 1..=self.attempts {
            let Some(up) = floor.single_random(rng) else {
                break;
            };
            let scan = field.scan(&[up], &[]);
            let mapped = scan.mapped_count();
            let pruned_share = fraction(floor.count() - mapped, floor.count());

            if mapped < min_mapped || pruned_share > self.max_pruned_fraction {
                warn!(
                    "stair attempt {}/{} from {:?} rejected: reaches {} cells, would prune {:.0}% of the floor",
                    attempt,
                    self.attempts,
                    up,
                    mapped,
                    pruned_share * 100.0
                );
                continue;
            }

            let largest_missed = Self::largest_unreached(floor, &scan);
            if largest_missed >= min_mapped {
                warn!(
                    "stair attempt {}/{} from {:?} rejected: misses a separate area of {} cells",
                    attempt, self.attempts, up, largest_missed
                );
                continue;
            }

            let Some(max) = scan.max_distance() else {
                continue;
            };
            let mut far = scan.within(max * config::DOWN_STAIR_DISTANCE_FRACTION, f64::INFINITY);
            far.off(up);
            let Some(down) = far.single_random(rng) else {
                continue;
            };

            debug!(
                "stairs placed on attempt {}: up {:?}, down {:?} at distance {} of {}",
                attempt,
                up,
                down,
                scan.get(down),
                max
            );
            return Ok(Self::finish(&cleared, floor, scan, StaircasePair { up, down }));
        }

        Err(CairnError::StairPlacementExhausted {
            attempts: self.attempts,
        })
    }

    /// Size of the biggest floor blob the scan never reached.
    fn largest_unreached(floor: &Region, scan: &DistanceField) -> usize {
        let mut missed = floor.clone();
        missed.subtract(&scan.reached());
        missed
            .largest_component(Adjacency::Cardinal)
            .map_or(0, |blob| blob.count())
    }

    fn finish(
        grid: &Grid<Terrain>,
        floor: &Region,
        scan: DistanceField,
        stairs: StaircasePair,
    ) -> StairPlacement {
        let mut terrain = grid.clone();
        let mut pruned = 0;
        for pos in floor.iter() {
            if !scan.is_reached(pos) {
                terrain[pos] = Terrain::Wall;
                pruned += 1;
            }
        }
        terrain[stairs.up] = Terrain::StairUp;
        terrain[stairs.down] = Terrain::StairDown;

        StairPlacement {
            stairs,
            terrain,
            distances: scan,
            pruned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_terrain;
    use rand::{rngs::StdRng, SeedableRng};

    fn open_room(width: usize, height: usize) -> Grid<Terrain> {
        let mut grid = Grid::new(width, height, Terrain::Floor);
        crate::wall_wrap(&mut grid);
        grid
    }

    #[test]
    fn test_random_stairs_are_far_apart() {
        let grid = open_room(30, 20);
        let placement = StairPlacer::default()
            .place(&grid, &mut StdRng::seed_from_u64(17))
            .unwrap();
        let StaircasePair { up, down } = placement.stairs;

        assert_ne!(up, down);
        assert_eq!(placement.terrain[up], Terrain::StairUp);
        assert_eq!(placement.terrain[down], Terrain::StairDown);
        assert_eq!(placement.pruned, 0);

        let max = placement.distances.max_distance().unwrap();
        assert!(placement.distances.get(down) >= 0.7 * max);
    }

    #[test]
    fn test_small_pocket_is_pruned() {
        let text = "
##############
#............#
#............#
#............#
#............#
#............#
#............#
##########.###
##########.###
##############
";
        let mut grid = parse_terrain(text).unwrap();
        // isolated pocket
        grid[Coord::new(12, 8)] = Terrain::Floor;

        let placement = StairPlacer::default()
            .place(&grid, &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert_eq!(placement.terrain[Coord::new(12, 8)], Terrain::Wall);
        assert_eq!(placement.pruned, 1);
    }

    #[test]
    fn test_split_skeleton_exhausts_attempts() {
        let text = "
#################
#.......#.......#
#.......#.......#
#.......#.......#
#.......#.......#
#################
";
        let grid = parse_terrain(text).unwrap();
        let result = StairPlacer::new(8, 0.25).place(&grid, &mut StdRng::seed_from_u64(9));
        match result {
            Err(CairnError::StairPlacementExhausted { attempts }) => assert_eq!(attempts, 8),
            other => panic!("expected exhaustion, got {:?}", other.map(|p| p.stairs)),
        }
    }

    #[test]
    fn test_sizeable_separate_area_is_never_pruned() {
        // 30x6 hall plus a detached 8x7 room, under a quarter of the floor
        let mut text = String::new();
        text.push_str(&"#".repeat(42));
        text.push('\n');
        for y in 1..=7 {
            let hall = if y <= 6 { ".".repeat(30) } else { "#".repeat(30) };
            text.push_str(&format!("#{}##{}#\n", hall, ".".repeat(8)));
        }
        text.push_str(&"#".repeat(42));
        let grid = parse_terrain(&text).unwrap();
        assert_eq!(grid.width(), 42);
        assert_eq!(grid.height(), 9);

        let placer = StairPlacer::new(8, 0.25);
        for seed in 0..4 {
            match placer.place(&grid, &mut StdRng::seed_from_u64(seed)) {
                Err(CairnError::StairPlacementExhausted { attempts }) => assert_eq!(attempts, 8),
                other => panic!("seed {}: expected exhaustion, got {:?}", seed, other.map(|p| p.stairs)),
            }
        }
    }

    #[test]
    fn test_existing_markers_are_kept() {
        let grid = parse_terrain("#######\n#<...>#\n#######").unwrap();
        let placement = StairPlacer::default()
            .place(&grid, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(placement.stairs.up, Coord::new(1, 1));
        assert_eq!(placement.stairs.down, Coord::new(5, 1));
    }

    #[test]
    fn test_unreachable_marker_requires_regeneration() {
        let grid = parse_terrain("#######\n#<.#.>#\n#######").unwrap();
        let err = StairPlacer::default()
            .place(&grid, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(err.requires_regeneration());
    }

    #[test]
    fn test_tiny_skeleton_fails_coverage_check() {
        let grid = parse_terrain("#####\n#...#\n#####").unwrap();
        assert!(StairPlacer::default()
            .place(&grid, &mut StdRng::seed_from_u64(4))
            .is_err());
    }
}
