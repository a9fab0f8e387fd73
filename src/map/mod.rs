//! # Map Module
//!
//! Cell-level building blocks shared by every other subsystem:
//! - Coordinates and directions on the dungeon grid
//! - The fixed-size [`Grid`] container
//! - Terrain and environment classifications with their ASCII glyphs

pub mod grid;
pub mod terrain;

pub use grid::*;
pub use terrain::*;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A cell coordinate on a dungeon grid.
///
/// Coordinates order row-major (by `y`, then `x`), which is the iteration
/// order used everywhere a deterministic traversal matters.
///
/// # Examples
///
/// ```
/// use cairn::Coord;
///
/// let c = Coord::new(10, 5);
/// assert_eq!(c.x, 10);
/// assert_eq!(c.y, 5);
/// assert_eq!(c.adjacent_positions().len(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    /// Creates a new coordinate.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Calculates the Manhattan distance to another coordinate.
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn::Coord;
    ///
    /// assert_eq!(Coord::new(0, 0).manhattan_distance(Coord::new(3, 4)), 7);
    /// ```
    pub fn manhattan_distance(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Calculates the Chebyshev (king-move) distance to another coordinate.
    pub fn chebyshev_distance(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Calculates the Euclidean distance to another coordinate.
    pub fn euclidean_distance(self, other: Coord) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Returns the coordinate one step in `direction`.
    pub fn step(self, direction: Direction) -> Coord {
        self + direction.to_delta()
    }

    /// Returns all 8 adjacent coordinates (including diagonals).
    pub fn adjacent_positions(self) -> [Coord; 8] {
        Direction::ALL.map(|d| self.step(d))
    }

    /// Returns only the 4 cardinal adjacent coordinates (no diagonals).
    pub fn cardinal_adjacent_positions(self) -> [Coord; 4] {
        Direction::CARDINAL.map(|d| self.step(d))
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::ops::Add for Coord {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Coord {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Directions for neighbour traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

impl Direction {
    /// The 4 cardinal directions, in N, W, E, S order.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::West,
        Direction::East,
        Direction::South,
    ];

    /// The 8 compass directions, row by row from the north-west.
    pub const ALL: [Direction; 8] = [
        Direction::Northwest,
        Direction::North,
        Direction::Northeast,
        Direction::West,
        Direction::East,
        Direction::Southwest,
        Direction::South,
        Direction::Southeast,
    ];

    /// Converts a direction to a coordinate delta.
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn::{Coord, Direction};
    ///
    /// assert_eq!(Direction::North.to_delta(), Coord::new(0, -1));
    /// ```
    pub fn to_delta(self) -> Coord {
        match self {
            Direction::North => Coord::new(0, -1),
            Direction::South => Coord::new(0, 1),
            Direction::East => Coord::new(1, 0),
            Direction::West => Coord::new(-1, 0),
            Direction::Northeast => Coord::new(1, -1),
            Direction::Northwest => Coord::new(-1, -1),
            Direction::Southeast => Coord::new(1, 1),
            Direction::Southwest => Coord::new(-1, 1),
        }
    }

    /// Whether this direction moves along both axes.
    pub fn is_diagonal(self) -> bool {
        let delta = self.to_delta();
        delta.x != 0 && delta.y != 0
    }
}

/// Neighbourhood rule used for connectivity, growth and retraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Adjacency {
    /// North, south, east and west only.
    Cardinal,
    /// All eight surrounding cells.
    Octile,
}

impl Adjacency {
    /// Directions that count as neighbours under this rule.
    pub fn directions(self) -> &'static [Direction] {
        match self {
            Adjacency::Cardinal => &Direction::CARDINAL,
            Adjacency::Octile => &Direction::ALL,
        }
    }
}
