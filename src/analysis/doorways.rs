//! # Doorways
//!
//! Finds wall gaps that pinch two spaces together and turns a share of them
//! into doors.
//!
//! A gap is a passable cell with walls on two opposite sides and open cells
//! on the other two, sitting at the mouth of a room (at least one diagonal
//! neighbour is open). With double-wide gaps enabled, two side-by-side cells
//! bounded by walls also qualify and are treated as one unit.
//!
//! A gap is *viable* when, with the gap blocked, the far side can no longer
//! be reached from the near side within the scan radius. Gaps with a short
//! way around are plain openings and are left alone.

use crate::{Coord, Direction, Grid, Metric, Percentage, ReachabilityField, Region, Terrain};
use crate::config;
use log::debug;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

/// A wall gap: the cells forming it and the open cells on either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gap {
    cell: Coord,
    partner: Option<Coord>,
    near: Coord,
    far: Coord,
}

/// Doors and the walls that close the second half of double-wide gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoorLayer {
    pub doors: BTreeMap<Coord, Terrain>,
    pub walls: BTreeSet<Coord>,
}

impl DoorLayer {
    pub fn is_empty(&self) -> bool {
        self.doors.is_empty() && self.walls.is_empty()
    }

    /// Cells converted (doors plus closing walls).
    pub fn converted(&self) -> usize {
        self.doors.len() + self.walls.len()
    }

    /// Writes the layer onto `grid`.
    pub fn apply(&self, grid: &mut Grid<Terrain>) {
        for (&pos, &door) in &self.doors {
            if let Some(cell) = grid.get_mut(pos) {
                *cell = door;
            }
        }
        for &pos in &self.walls {
            if let Some(cell) = grid.get_mut(pos) {
                *cell = Terrain::Wall;
            }
        }
    }
}

/// Detects viable doorways and places doors on them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorwayClassifier {
    allow_double_wide: bool,
    scan_radius: f64,
}

impl Default for DoorwayClassifier {
    fn default() -> Self {
        Self::new(false, config::DEFAULT_DOORWAY_SCAN_RADIUS)
    }
}

fn open(grid: &Grid<Terrain>, pos: Coord) -> bool {
    grid.get(pos).map_or(false, |t| t.is_passable())
}

impl DoorwayClassifier {
    pub fn new(allow_double_wide: bool, scan_radius: f64) -> Self {
        Self {
            allow_double_wide,
            scan_radius,
        }
    }

    pub fn allow_double_wide(&self) -> bool {
        self.allow_double_wide
    }

    pub fn scan_radius(&self) -> f64 {
        self.scan_radius
    }

    /// Single-cell gap at `pos`, if any. `across` is the axis the passage
    /// runs along (the open sides), `along` the wall axis.
    fn single_gap(grid: &Grid<Terrain>, pos: Coord) -> Option<Gap> {
        let diagonal_open = [
            Direction::Northwest,
            Direction::Northeast,
            Direction::Southwest,
            Direction::Southeast,
        ]
        .iter()
        .any(|&d| open(grid, pos.step(d)));
        if !open(grid, pos) || !diagonal_open {
            return None;
        }

        let axes = [
            (Direction::West, Direction::East, Direction::North, Direction::South),
            (Direction::North, Direction::South, Direction::West, Direction::East),
        ];
        axes.iter().find_map(|&(wall_a, wall_b, side_a, side_b)| {
            let gap = !open(grid, pos.step(wall_a))
                && !open(grid, pos.step(wall_b))
                && open(grid, pos.step(side_a))
                && open(grid, pos.step(side_b));
            gap.then(|| Gap {
                cell: pos,
                partner: None,
                near: pos.step(side_a),
                far: pos.step(side_b),
            })
        })
    }

    /// Two-cell gap starting at `pos` and extending east or south. One of
    /// the cells diagonally past the wall ends must be open, so rows of a
    /// two-wide corridor do not count.
    fn double_gap(grid: &Grid<Terrain>, pos: Coord) -> Option<Gap> {
        let axes = [
            (Direction::West, Direction::East, Direction::North, Direction::South),
            (Direction::North, Direction::South, Direction::West, Direction::East),
        ];
        axes.iter().find_map(|&(back, forward, side_a, side_b)| {
            let partner = pos.step(forward);
            let outer_open = [pos.step(back), partner.step(forward)]
                .iter()
                .any(|end| open(grid, end.step(side_a)) || open(grid, end.step(side_b)));
            let gap = outer_open
                && open(grid, pos)
                && open(grid, partner)
                && !open(grid, pos.step(back))
                && !open(grid, partner.step(forward))
                && open(grid, pos.step(side_a))
                && open(grid, pos.step(side_b))
                && open(grid, partner.step(side_a))
                && open(grid, partner.step(side_b));
            gap.then(|| Gap {
                cell: pos,
                partner: Some(partner),
                near: pos.step(side_a),
                far: pos.step(side_b),
            })
        })
    }

    fn gap_at(&self, grid: &Grid<Terrain>, pos: Coord) -> Option<Gap> {
        Self::single_gap(grid, pos).or_else(|| {
            if self.allow_double_wide {
                Self::double_gap(grid, pos)
            } else {
                None
            }
        })
    }

    /// Viable doorway cells among `candidates`, skipping `excluded` cells.
    ///
    /// Candidates are examined in row-major order. Once a gap is accepted,
    /// its orthogonal neighbours are dropped from consideration; the partner
    /// of a double-wide gap is accepted with it, so accepted cells are only
    /// ever orthogonally adjacent to their own partner.
    pub fn find_doorways(
        &self,
        grid: &Grid<Terrain>,
        candidates: &Region,
        excluded: &Region,
    ) -> BTreeSet<Coord> {
        let field = ReachabilityField::new(grid, Metric::Euclidean);
        let mut remaining: BTreeSet<Coord> = candidates
            .iter()
            .filter(|&pos| !excluded.contains(pos) && !grid.is_border(pos))
            .collect();
        let mut viable = BTreeSet::new();
        let mut rejected = 0usize;

        while let Some(pos) = remaining.pop_first() {
            let Some(gap) = self.gap_at(grid, pos) else {
                continue;
            };
            let blocked: Vec<Coord> = std::iter::once(gap.cell).chain(gap.partner).collect();
            let scan = field.partial_scan(&[gap.near], &blocked, self.scan_radius);
            if scan.is_reached(gap.far) {
                rejected += 1;
                continue;
            }

            for cell in &blocked {
                viable.insert(*cell);
                remaining.remove(cell);
            }
            for cell in &blocked {
                for n in cell.cardinal_adjacent_positions() {
                    if !blocked.contains(&n) {
                        remaining.remove(&n);
                    }
                }
            }
        }

        debug!(
            "doorway scan: {} viable cells, {} gaps with a way around",
            viable.len(),
            rejected
        );
        viable
    }

    /// Gap cells among `candidates` that were examined and rejected because
    /// the far side stays reachable. Used to check that closing such gaps
    /// never disconnects anything.
    pub fn redundant_gaps(
        &self,
        grid: &Grid<Terrain>,
        candidates: &Region,
        excluded: &Region,
    ) -> BTreeSet<Coord> {
        let field = ReachabilityField::new(grid, Metric::Euclidean);
        candidates
            .iter()
            .filter(|&pos| !excluded.contains(pos) && !grid.is_border(pos))
            .filter_map(|pos| Self::single_gap(grid, pos))
            .filter(|gap| {
                field
                    .partial_scan(&[gap.near], &[gap.cell], self.scan_radius)
                    .is_reached(gap.far)
            })
            .map(|gap| gap.cell)
            .collect()
    }

    /// Converts `round(viable × percentage / 100)` viable cells into doors.
    ///
    /// Cells are drawn uniformly without replacement; stairs are skipped.
    /// When a drawn cell still has its double-wide partner in the pool, the
    /// partner is closed with a wall and counts as a second conversion.
    pub fn place_doors<R: Rng + ?Sized>(
        &self,
        grid: &Grid<Terrain>,
        viable: &BTreeSet<Coord>,
        percentage: Percentage,
        stairs: &[Coord],
        rng: &mut R,
    ) -> DoorLayer {
        let total = percentage.of(viable.len());
        let mut pool: Vec<Coord> = viable.iter().copied().collect();
        let mut layer = DoorLayer::default();

        while layer.converted() < total && !pool.is_empty() {
            let pick = pool.swap_remove(rng.gen_range(0..pool.len()));
            if stairs.contains(&pick) {
                continue;
            }

            let door = if open(grid, pick.step(Direction::West)) && open(grid, pick.step(Direction::East)) {
                Terrain::DoorHorizontal
            } else {
                Terrain::DoorVertical
            };
            layer.doors.insert(pick, door);

            let partner = pool
                .iter()
                .position(|p| pick.manhattan_distance(*p) == 1);
            if let Some(index) = partner {
                let closed = pool.swap_remove(index);
                layer.walls.insert(closed);
            }
        }

        debug!(
            "placed {} doors and {} closing walls from {} viable cells",
            layer.doors.len(),
            layer.walls.len(),
            viable.len()
        );
        layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_terrain;
    use rand::{rngs::StdRng, SeedableRng};

    // Two rooms joined only through a one-cell gap in the middle wall.
    const TWO_ROOMS: &str = "
###########
#...#.....#
#.........#
#...#.....#
###########
";

    // Same rooms with a second opening three rows away; the gaps see each
    // other within the scan radius.
    const TWO_OPENINGS: &str = "
###########
#...#.....#
#.........#
#...#.....#
#...#.....#
#.........#
#...#.....#
###########
";

    fn floor(grid: &Grid<Terrain>) -> Region {
        Region::from_grid(grid, |t| t.is_passable())
    }

    #[test]
    fn test_sole_connection_is_viable() {
        let grid = parse_terrain(TWO_ROOMS).unwrap();
        let classifier = DoorwayClassifier::default();
        let empty = Region::new(grid.width(), grid.height());
        let viable = classifier.find_doorways(&grid, &floor(&grid), &empty);
        assert_eq!(viable.into_iter().collect::<Vec<_>>(), vec![Coord::new(4, 2)]);
    }

    #[test]
    fn test_gap_with_short_detour_is_rejected() {
        let grid = parse_terrain(TWO_OPENINGS).unwrap();
        let classifier = DoorwayClassifier::default();
        let empty = Region::new(grid.width(), grid.height());
        let viable = classifier.find_doorways(&grid, &floor(&grid), &empty);
        assert!(viable.is_empty());

        let redundant = classifier.redundant_gaps(&grid, &floor(&grid), &empty);
        assert!(redundant.contains(&Coord::new(4, 2)));
        assert!(redundant.contains(&Coord::new(4, 5)));

        // A tiny radius cannot see the detour.
        let short = DoorwayClassifier::new(false, 2.0);
        assert_eq!(short.find_doorways(&grid, &floor(&grid), &empty).len(), 2);
    }

    #[test]
    fn test_excluded_cells_are_skipped() {
        let grid = parse_terrain(TWO_ROOMS).unwrap();
        let classifier = DoorwayClassifier::default();
        let excluded = Region::singleton(grid.width(), grid.height(), Coord::new(4, 2));
        assert!(classifier
            .find_doorways(&grid, &floor(&grid), &excluded)
            .is_empty());
    }

    #[test]
    fn test_corridor_interior_is_not_a_gap() {
        let grid = parse_terrain("#######\n#.....#\n#######").unwrap();
        let classifier = DoorwayClassifier::default();
        let empty = Region::new(grid.width(), grid.height());
        assert!(classifier
            .find_doorways(&grid, &floor(&grid), &empty)
            .is_empty());
    }

    #[test]
    fn test_double_wide_gap() {
        let text = "
##########
#...#....#
#........#
#........#
#...#....#
##########
";
        let grid = parse_terrain(text).unwrap();
        let empty = Region::new(grid.width(), grid.height());

        let single = DoorwayClassifier::new(false, 16.0);
        assert!(single.find_doorways(&grid, &floor(&grid), &empty).is_empty());

        let double = DoorwayClassifier::new(true, 16.0);
        let viable = double.find_doorways(&grid, &floor(&grid), &empty);
        assert_eq!(
            viable.iter().copied().collect::<Vec<_>>(),
            vec![Coord::new(4, 2), Coord::new(4, 3)]
        );

        let layer = double.place_doors(
            &grid,
            &viable,
            Percentage::FULL,
            &[],
            &mut StdRng::seed_from_u64(1),
        );
        assert_eq!(layer.doors.len(), 1);
        assert_eq!(layer.walls.len(), 1);
        let (&door, &glyph) = layer.doors.iter().next().unwrap();
        assert_eq!(glyph, Terrain::DoorHorizontal);
        assert!(viable.contains(&door));
    }

    #[test]
    fn test_double_wide_corridor_only_at_mouths() {
        let text = "
###############################
#.....###################.....#
#.....###################.....#
#.............................#
#.............................#
#.....###################.....#
#.....###################.....#
###############################
";
        let grid = parse_terrain(text).unwrap();
        let empty = Region::new(grid.width(), grid.height());
        let viable = DoorwayClassifier::new(true, 16.0).find_doorways(&grid, &floor(&grid), &empty);
        assert_eq!(
            viable.into_iter().collect::<Vec<_>>(),
            vec![
                Coord::new(6, 3),
                Coord::new(24, 3),
                Coord::new(6, 4),
                Coord::new(24, 4)
            ]
        );
    }

    #[test]
    fn test_place_doors_percentage_and_stairs() {
        let grid = parse_terrain(TWO_ROOMS).unwrap();
        let viable: BTreeSet<Coord> = [Coord::new(4, 2)].into_iter().collect();
        let classifier = DoorwayClassifier::default();
        let mut rng = StdRng::seed_from_u64(5);

        let none = classifier.place_doors(&grid, &viable, Percentage::ZERO, &[], &mut rng);
        assert!(none.is_empty());

        let all = classifier.place_doors(&grid, &viable, Percentage::FULL, &[], &mut rng);
        assert_eq!(all.doors.get(&Coord::new(4, 2)), Some(&Terrain::DoorHorizontal));

        let guarded =
            classifier.place_doors(&grid, &viable, Percentage::FULL, &[Coord::new(4, 2)], &mut rng);
        assert!(guarded.is_empty());
    }

    #[test]
    fn test_closing_a_redundant_gap_keeps_reach() {
        let grid = parse_terrain(TWO_OPENINGS).unwrap();
        let classifier = DoorwayClassifier::default();
        let empty = Region::new(grid.width(), grid.height());
        let start = Coord::new(1, 1);
        let before = ReachabilityField::new(&grid, Metric::Manhattan)
            .scan(&[start], &[])
            .mapped_count();

        for gap in classifier.redundant_gaps(&grid, &floor(&grid), &empty) {
            let after = ReachabilityField::new(&grid, Metric::Manhattan)
                .scan(&[start], &[gap])
                .mapped_count();
            assert_eq!(after, before - 1);
        }
    }
}
