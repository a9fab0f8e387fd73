//! # Reachability
//!
//! Multi-source shortest-distance scans over passable cells.
//!
//! A scan floods outward from every goal at once and records, for each
//! passable cell, the distance to the nearest goal. Cells the flood never
//! reaches keep the [`FLOOR`] sentinel and impassable cells hold [`WALL`].
//! Scans are pure functions of the passable mask, the goals and the blocked
//! cells; no randomness is involved.

use crate::{Adjacency, Coord, Direction, Grid, Region, Terrain};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Distance held by passable cells the scan did not reach.
pub const FLOOR: f64 = 999_200.0;

/// Distance held by impassable cells.
pub const WALL: f64 = 999_500.0;

/// Step rule and cost used by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Four-way movement, unit cost.
    Manhattan,
    /// Eight-way movement, unit cost.
    Chebyshev,
    /// Eight-way movement, diagonal steps cost the square root of two.
    Euclidean,
}

impl Metric {
    pub fn adjacency(self) -> Adjacency {
        match self {
            Metric::Manhattan => Adjacency::Cardinal,
            Metric::Chebyshev | Metric::Euclidean => Adjacency::Octile,
        }
    }

    /// Cost of one step in `direction`.
    pub fn step_cost(self, direction: Direction) -> f64 {
        match self {
            Metric::Euclidean if direction.is_diagonal() => std::f64::consts::SQRT_2,
            _ => 1.0,
        }
    }
}

/// Per-cell distances produced by a [`ReachabilityField`] scan.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceField {
    distances: Grid<f64>,
    mapped: usize,
}

impl DistanceField {
    /// Distance at `pos`; out-of-bounds cells read as [`WALL`].
    pub fn get(&self, pos: Coord) -> f64 {
        self.distances.get(pos).copied().unwrap_or(WALL)
    }

    /// Whether the scan assigned `pos` a real distance.
    pub fn is_reached(&self, pos: Coord) -> bool {
        self.get(pos) < FLOOR
    }

    /// Number of cells with a real distance.
    pub fn mapped_count(&self) -> usize {
        self.mapped
    }

    /// Largest real distance, or `None` when nothing was reached.
    pub fn max_distance(&self) -> Option<f64> {
        self.distances
            .cells()
            .iter()
            .copied()
            .filter(|&d| d < FLOOR)
            .max_by(f64::total_cmp)
    }

    /// Region of reached cells.
    pub fn reached(&self) -> Region {
        Region::from_grid(&self.distances, |&d| d < FLOOR)
    }

    /// Region of reached cells whose distance lies in `[min, max]`.
    pub fn within(&self, min: f64, max: f64) -> Region {
        Region::from_grid(&self.distances, |&d| d < FLOOR && d >= min && d <= max)
    }

    /// The raw distance grid.
    pub fn grid(&self) -> &Grid<f64> {
        &self.distances
    }
}

#[derive(Debug, Clone, Copy)]
struct Frontier {
    distance: f64,
    index: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    // Reversed so the heap pops the nearest cell first; ties break on index
    // to keep the expansion order stable.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Distance scanner over a fixed passable mask.
///
/// # Examples
///
/// ```
/// use cairn::{parse_terrain, Coord, Metric, ReachabilityField};
///
/// let grid = parse_terrain("#####\n#...#\n#####").unwrap();
/// let field = ReachabilityField::new(&grid, Metric::Manhattan);
/// let scan = field.scan(&[Coord::new(1, 1)], &[]);
/// assert_eq!(scan.get(Coord::new(3, 1)), 2.0);
/// assert_eq!(scan.mapped_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ReachabilityField {
    passable: Region,
    metric: Metric,
}

impl ReachabilityField {
    /// Scanner over the passable cells of `grid`.
    pub fn new(grid: &Grid<Terrain>, metric: Metric) -> Self {
        Self {
            passable: Region::from_grid(grid, |t| t.is_passable()),
            metric,
        }
    }

    /// Scanner over an explicit passable mask.
    pub fn from_region(passable: Region, metric: Metric) -> Self {
        Self { passable, metric }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn passable(&self) -> &Region {
        &self.passable
    }

    /// Full scan from `goals`, never entering `blocked` cells.
    pub fn scan(&self, goals: &[Coord], blocked: &[Coord]) -> DistanceField {
        self.partial_scan(goals, blocked, f64::INFINITY)
    }

    /// Scan that stops expanding past `limit`; farther cells stay unreached.
    ///
    /// Goals that are impassable or blocked are ignored.
    pub fn partial_scan(&self, goals: &[Coord], blocked: &[Coord], limit: f64) -> DistanceField {
        let (width, height) = (self.passable.width(), self.passable.height());
        let mut open = self.passable.clone();
        for &pos in blocked {
            open.off(pos);
        }

        let mut distances = Grid::new(width, height, WALL);
        for pos in open.iter() {
            distances[pos] = FLOOR;
        }

        let mut heap = BinaryHeap::new();
        for &goal in goals {
            if let Some(index) = distances.index_of(goal) {
                if open.contains(goal) && distances[goal] > 0.0 {
                    distances[goal] = 0.0;
                    heap.push(Frontier {
                        distance: 0.0,
                        index,
                    });
                }
            }
        }

        let mut mapped = 0;
        while let Some(Frontier { distance, index }) = heap.pop() {
            let pos = distances.coord_of(index);
            if distance > distances[pos] {
                continue;
            }
            mapped += 1;

            for &direction in self.metric.adjacency().directions() {
                let next = pos.step(direction);
                if !open.contains(next) {
                    continue;
                }
                let candidate = distance + self.metric.step_cost(direction);
                if candidate > limit || candidate >= distances[next] {
                    continue;
                }
                distances[next] = candidate;
                if let Some(next_index) = distances.index_of(next) {
                    heap.push(Frontier {
                        distance: candidate,
                        index: next_index,
                    });
                }
            }
        }

        DistanceField { distances, mapped }
    }
}
