//! # Grid
//!
//! Fixed-size, row-major storage for per-cell data (terrain, distances,
//! environment tags). A grid never changes dimensions after construction.

use crate::{CairnError, CairnResult, Coord};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Rectangular row-major grid that owns its cells.
///
/// Indexing with a [`Coord`] is bounds-checked and panics when out of range;
/// use [`Grid::get`] for fallible access.
///
/// # Examples
///
/// ```
/// use cairn::{Coord, Grid};
///
/// let mut grid = Grid::new(4, 3, 0u8);
/// grid[Coord::new(1, 2)] = 7;
/// assert_eq!(grid.get(Coord::new(1, 2)), Some(&7));
/// assert_eq!(grid.get(Coord::new(4, 0)), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Creates a grid filled with `fill`.
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }

    /// Builds a grid from rows, rejecting empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<T>>) -> CairnResult<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(CairnError::InvalidMap("grid must not be empty".to_string()));
        }
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(CairnError::InvalidMap(format!(
                "row {} has {} cells, expected {}",
                y,
                row.len(),
                width
            )));
        }

        Ok(Self {
            width,
            height,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Sets every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.cells.iter_mut().for_each(|cell| *cell = value.clone());
    }
}

impl<T> Grid<T> {
    /// Grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)` pair, handy for dimension checks.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Checks whether a coordinate lies inside the grid.
    pub fn in_bounds(&self, pos: Coord) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// Whether the coordinate lies on the outermost ring of cells.
    pub fn is_border(&self, pos: Coord) -> bool {
        self.in_bounds(pos)
            && (pos.x == 0
                || pos.y == 0
                || pos.x as usize == self.width - 1
                || pos.y as usize == self.height - 1)
    }

    /// Row-major index of an in-bounds coordinate.
    pub fn index_of(&self, pos: Coord) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.y as usize * self.width + pos.x as usize)
    }

    /// Coordinate for a row-major index.
    pub fn coord_of(&self, index: usize) -> Coord {
        Coord::new((index % self.width) as i32, (index / self.width) as i32)
    }

    pub fn get(&self, pos: Coord) -> Option<&T> {
        self.index_of(pos).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, pos: Coord) -> Option<&mut T> {
        self.index_of(pos).map(move |i| &mut self.cells[i])
    }

    /// Writes a cell, failing when the coordinate is outside the grid.
    pub fn set(&mut self, pos: Coord, value: T) -> CairnResult<()> {
        match self.get_mut(pos) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(CairnError::InvalidMap(format!(
                "position {:?} is outside a {}x{} grid",
                pos, self.width, self.height
            ))),
        }
    }

    /// All coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.cells.len()).map(move |i| self.coord_of(i))
    }

    /// `(coord, value)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, &T)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.coord_of(i), cell))
    }

    /// Raw row-major cell slice.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Builds a same-sized grid by transforming each cell.
    pub fn map<U, F>(&self, mut f: F) -> Grid<U>
    where
        F: FnMut(Coord, &T) -> U,
    {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.iter().map(|(c, v)| f(c, v)).collect(),
        }
    }

    /// Counts the cells matching a predicate.
    pub fn count_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        self.cells.iter().filter(|cell| predicate(cell)).count()
    }

    /// Fails unless `other` has the same dimensions as this grid.
    pub fn check_same_size<U>(&self, other: &Grid<U>) -> CairnResult<()> {
        if self.dimensions() == other.dimensions() {
            Ok(())
        } else {
            Err(CairnError::DimensionMismatch {
                expected: self.dimensions(),
                found: other.dimensions(),
            })
        }
    }
}

impl<T> Index<Coord> for Grid<T> {
    type Output = T;

    fn index(&self, pos: Coord) -> &T {
        match self.index_of(pos) {
            Some(i) => &self.cells[i],
            None => panic!(
                "position {:?} is outside a {}x{} grid",
                pos, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Coord> for Grid<T> {
    fn index_mut(&mut self, pos: Coord) -> &mut T {
        match self.index_of(pos) {
            Some(i) => &mut self.cells[i],
            None => panic!(
                "position {:?} is outside a {}x{} grid",
                pos, self.width, self.height
            ),
        }
    }
}
