//! # Region Module
//!
//! Boolean masks over map cells with set algebra and growth operations.
//!
//! A [`Region`] is the workhorse for every placement algorithm: floors to be
//! claimed, pools of water, hazard candidates and lake footprints are all
//! regions. All set algebra (`union_with`, `subtract`, `intersect`) and all
//! growth operations (`spill`, `flood`) **mutate in place** and return
//! `&mut Self` for chaining; `expand`, `retract`, `fringe` and the component
//! queries return new regions and leave `self` untouched.
//!
//! Iteration is always row-major, so given the same contents and the same RNG
//! stream every operation is deterministic.

pub mod spill;

pub use spill::*;

use crate::{Adjacency, Coord, Grid};
use rand::Rng;
use std::collections::VecDeque;

/// Boolean mask over a `width` x `height` map with a cached cell count.
///
/// # Examples
///
/// ```
/// use cairn::{Coord, Region};
///
/// let mut region = Region::new(8, 8);
/// region.on(Coord::new(2, 3));
/// region.on(Coord::new(2, 3));
/// assert_eq!(region.count(), 1);
/// assert!(region.contains(Coord::new(2, 3)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    width: usize,
    height: usize,
    cells: Vec<bool>,
    size: usize,
}

impl Region {
    /// Creates an empty region.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
            size: 0,
        }
    }

    /// Creates a region with every cell on.
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![true; width * height],
            size: width * height,
        }
    }

    /// Region of the cells in `grid` that satisfy `predicate`.
    pub fn from_grid<T, F>(grid: &Grid<T>, mut predicate: F) -> Self
    where
        F: FnMut(&T) -> bool,
    {
        let cells: Vec<bool> = grid.cells().iter().map(|c| predicate(c)).collect();
        let size = cells.iter().filter(|&&on| on).count();
        Self {
            width: grid.width(),
            height: grid.height(),
            cells,
            size,
        }
    }

    /// Region containing the given coordinates (out-of-bounds ones are ignored).
    pub fn from_coords<I>(width: usize, height: usize, coords: I) -> Self
    where
        I: IntoIterator<Item = Coord>,
    {
        let mut region = Self::new(width, height);
        for pos in coords {
            region.on(pos);
        }
        region
    }

    /// Region with a single cell on.
    pub fn singleton(width: usize, height: usize, pos: Coord) -> Self {
        Self::from_coords(width, height, [pos])
    }

    /// Region covering the rectangle with top-left `origin`, clipped to bounds.
    pub fn rectangle(width: usize, height: usize, origin: Coord, w: usize, h: usize) -> Self {
        let mut region = Self::new(width, height);
        for y in origin.y..origin.y + h as i32 {
            for x in origin.x..origin.x + w as i32 {
                region.on(Coord::new(x, y));
            }
        }
        region
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index_of(&self, pos: Coord) -> Option<usize> {
        (pos.x >= 0
            && pos.y >= 0
            && (pos.x as usize) < self.width
            && (pos.y as usize) < self.height)
            .then(|| pos.y as usize * self.width + pos.x as usize)
    }

    fn coord_of(&self, index: usize) -> Coord {
        Coord::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Whether `pos` is inside the map bounds (on or off).
    pub fn in_bounds(&self, pos: Coord) -> bool {
        self.index_of(pos).is_some()
    }

    /// Whether `pos` is on. Out-of-bounds coordinates are never on.
    pub fn contains(&self, pos: Coord) -> bool {
        self.index_of(pos).map(|i| self.cells[i]).unwrap_or(false)
    }

    /// Turns a cell on. Returns `true` if it was previously off.
    pub fn on(&mut self, pos: Coord) -> bool {
        match self.index_of(pos) {
            Some(i) if !self.cells[i] => {
                self.cells[i] = true;
                self.size += 1;
                true
            }
            _ => false,
        }
    }

    /// Turns a cell off. Returns `true` if it was previously on.
    pub fn off(&mut self, pos: Coord) -> bool {
        match self.index_of(pos) {
            Some(i) if self.cells[i] => {
                self.cells[i] = false;
                self.size -= 1;
                true
            }
            _ => false,
        }
    }

    /// Number of cells that are on.
    pub fn count(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Turns every cell off.
    pub fn clear(&mut self) -> &mut Self {
        self.cells.iter_mut().for_each(|c| *c = false);
        self.size = 0;
        self
    }

    /// Coordinates that are on, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &on)| on)
            .map(move |(i, _)| self.coord_of(i))
    }

    fn assert_same_size(&self, other: &Region) {
        assert!(
            self.width == other.width && self.height == other.height,
            "region size mismatch: {}x{} vs {}x{}",
            self.width,
            self.height,
            other.width,
            other.height
        );
    }

    fn recount(&mut self) {
        self.size = self.cells.iter().filter(|&&on| on).count();
    }

    /// Adds every cell of `other` to this region.
    ///
    /// # Panics
    ///
    /// Panics if the regions have different dimensions; the same holds for
    /// every other binary operation.
    pub fn union_with(&mut self, other: &Region) -> &mut Self {
        self.assert_same_size(other);
        for (a, &b) in self.cells.iter_mut().zip(&other.cells) {
            *a |= b;
        }
        self.recount();
        self
    }

    /// Removes every cell of `other` from this region.
    pub fn subtract(&mut self, other: &Region) -> &mut Self {
        self.assert_same_size(other);
        for (a, &b) in self.cells.iter_mut().zip(&other.cells) {
            *a &= !b;
        }
        self.recount();
        self
    }

    /// Keeps only the cells also present in `other`.
    pub fn intersect(&mut self, other: &Region) -> &mut Self {
        self.assert_same_size(other);
        for (a, &b) in self.cells.iter_mut().zip(&other.cells) {
            *a &= b;
        }
        self.recount();
        self
    }

    /// Whether the two regions share at least one cell.
    pub fn intersects(&self, other: &Region) -> bool {
        self.assert_same_size(other);
        self.cells.iter().zip(&other.cells).any(|(&a, &b)| a && b)
    }

    /// Number of `adjacency` neighbours of `pos` that are on.
    pub fn neighbor_count(&self, pos: Coord, adjacency: Adjacency) -> usize {
        adjacency
            .directions()
            .iter()
            .filter(|&&d| self.contains(pos.step(d)))
            .count()
    }

    /// New region grown outward by `steps` cells under `adjacency`.
    pub fn expand(&self, steps: usize, adjacency: Adjacency) -> Region {
        let mut current = self.clone();
        for _ in 0..steps {
            let mut next = current.clone();
            for pos in current.iter() {
                for &d in adjacency.directions() {
                    next.on(pos.step(d));
                }
            }
            current = next;
        }
        current
    }

    /// New region shrunk by `steps` cells: a cell survives a step only if all
    /// of its `adjacency` neighbours are on. Cells on the map edge never
    /// survive, since their outside neighbours count as off.
    pub fn retract(&self, steps: usize, adjacency: Adjacency) -> Region {
        let mut current = self.clone();
        for _ in 0..steps {
            let survivors: Vec<Coord> = current
                .iter()
                .filter(|&pos| {
                    adjacency
                        .directions()
                        .iter()
                        .all(|&d| current.contains(pos.step(d)))
                })
                .collect();
            current = Region::from_coords(self.width, self.height, survivors);
        }
        current
    }

    /// Cells outside this region that lie within `steps` of it.
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn::{Adjacency, Coord, Region};
    ///
    /// let region = Region::singleton(9, 9, Coord::new(4, 4));
    /// assert_eq!(region.fringe(1, Adjacency::Octile).count(), 8);
    /// assert_eq!(region.fringe(1, Adjacency::Cardinal).count(), 4);
    /// ```
    pub fn fringe(&self, steps: usize, adjacency: Adjacency) -> Region {
        let mut grown = self.expand(steps, adjacency);
        grown.subtract(self);
        grown
    }

    /// Grows this region by up to `steps` cardinal steps, only into cells of
    /// `bounds`.
    pub fn flood(&mut self, bounds: &Region, steps: usize) -> &mut Self {
        self.assert_same_size(bounds);
        for _ in 0..steps {
            let additions: Vec<Coord> = self
                .iter()
                .flat_map(|pos| pos.cardinal_adjacent_positions())
                .filter(|&n| bounds.contains(n) && !self.contains(n))
                .collect();
            if additions.is_empty() {
                break;
            }
            for pos in additions {
                self.on(pos);
            }
        }
        self
    }

    /// Removes cells with no cardinal neighbour in the region.
    pub fn remove_isolated(&mut self) -> &mut Self {
        let isolated: Vec<Coord> = self
            .iter()
            .filter(|&pos| self.neighbor_count(pos, Adjacency::Cardinal) == 0)
            .collect();
        for pos in isolated {
            self.off(pos);
        }
        self
    }

    /// Partitions the region into maximal connected subsets.
    ///
    /// Components are returned in the row-major order of their first cell.
    pub fn connected_components(&self, adjacency: Adjacency) -> Vec<Region> {
        let mut seen = Region::new(self.width, self.height);
        let mut components = Vec::new();
        let mut queue = VecDeque::new();

        for start in self.iter() {
            if seen.contains(start) {
                continue;
            }
            let mut component = Region::new(self.width, self.height);
            seen.on(start);
            queue.push_back(start);
            while let Some(pos) = queue.pop_front() {
                component.on(pos);
                for &d in adjacency.directions() {
                    let next = pos.step(d);
                    if self.contains(next) && seen.on(next) {
                        queue.push_back(next);
                    }
                }
            }
            components.push(component);
        }

        components
    }

    /// The biggest connected component; ties go to the earliest one.
    pub fn largest_component(&self, adjacency: Adjacency) -> Option<Region> {
        self.connected_components(adjacency)
            .into_iter()
            .fold(None, |best: Option<Region>, candidate| match best {
                Some(b) if b.count() >= candidate.count() => Some(b),
                _ => Some(candidate),
            })
    }

    /// One uniformly chosen cell, or `None` when empty.
    pub fn single_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Coord> {
        if self.is_empty() {
            return None;
        }
        let target = rng.gen_range(0..self.size);
        self.iter().nth(target)
    }

    /// Uniform sample of up to `n` distinct cells.
    ///
    /// Single-pass reservoir sampling: linear in the map size and never sorts
    /// the region. Returned cells are in reservoir order, not row-major.
    pub fn random_sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Coord> {
        let mut reservoir: Vec<Coord> = Vec::with_capacity(n.min(self.size));
        if n == 0 {
            return reservoir;
        }
        for (seen, pos) in self.iter().enumerate() {
            if reservoir.len() < n {
                reservoir.push(pos);
            } else {
                let slot = rng.gen_range(0..=seen);
                if slot < n {
                    reservoir[slot] = pos;
                }
            }
        }
        reservoir
    }

    /// Greedy single-source growth into `bounds`.
    ///
    /// Grows this region one cell at a time through cardinal neighbours that
    /// are in `bounds` and not yet in the region, choosing uniformly among
    /// the current frontier, until the region holds `volume` cells or the
    /// frontier is exhausted. `bounds` is only read; callers that treat the
    /// grown cells as consumed subtract them afterwards.
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn::{Coord, Region};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let bounds = Region::full(10, 10);
    /// let mut pool = Region::singleton(10, 10, Coord::new(5, 5));
    /// pool.spill(&bounds, 12, &mut StdRng::seed_from_u64(3));
    /// assert_eq!(pool.count(), 12);
    /// ```
    pub fn spill<R: Rng + ?Sized>(&mut self, bounds: &Region, volume: usize, rng: &mut R) -> &mut Self {
        self.assert_same_size(bounds);
        let mut queued = self.clone();
        let mut frontier: Vec<Coord> = Vec::new();
        for pos in self.iter() {
            for n in pos.cardinal_adjacent_positions() {
                if bounds.contains(n) && queued.on(n) {
                    frontier.push(n);
                }
            }
        }

        while self.size < volume && !frontier.is_empty() {
            let pick = frontier.swap_remove(rng.gen_range(0..frontier.len()));
            self.on(pick);
            for n in pick.cardinal_adjacent_positions() {
                if bounds.contains(n) && queued.on(n) {
                    frontier.push(n);
                }
            }
        }
        self
    }

    /// Blue-noise style sample: cells in random order, keeping each one only
    /// if no kept cell lies within `spacing` (Euclidean).
    ///
    /// Kept cells are bucketed by `spacing`-sized tiles so each test only
    /// looks at the surrounding 3x3 tiles.
    pub fn separated_sample<R: Rng + ?Sized>(&self, rng: &mut R, spacing: f64) -> Vec<Coord> {
        use rand::seq::SliceRandom;

        let mut candidates: Vec<Coord> = self.iter().collect();
        candidates.shuffle(rng);
        if spacing <= 1.0 {
            return candidates;
        }

        let tile = spacing.ceil() as i32;
        let tiles_x = (self.width as i32 + tile - 1) / tile;
        let tiles_y = (self.height as i32 + tile - 1) / tile;
        let mut buckets: Vec<Vec<Coord>> = vec![Vec::new(); (tiles_x * tiles_y) as usize];
        let mut kept = Vec::new();

        for pos in candidates {
            let (tx, ty) = (pos.x / tile, pos.y / tile);
            let crowded = (ty - 1..=ty + 1)
                .filter(|&y| y >= 0 && y < tiles_y)
                .flat_map(|y| {
                    (tx - 1..=tx + 1)
                        .filter(|&x| x >= 0 && x < tiles_x)
                        .map(move |x| (y * tiles_x + x) as usize)
                })
                .any(|b| {
                    buckets[b]
                        .iter()
                        .any(|other| other.euclidean_distance(pos) < spacing)
                });
            if !crowded {
                buckets[(ty * tiles_x + tx) as usize].push(pos);
                kept.push(pos);
            }
        }

        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn block(width: usize, height: usize, origin: Coord, w: usize, h: usize) -> Region {
        Region::rectangle(width, height, origin, w, h)
    }

    #[test]
    fn test_size_tracks_mutations() {
        let mut region = Region::new(5, 5);
        assert!(region.on(Coord::new(1, 1)));
        assert!(!region.on(Coord::new(1, 1)));
        assert!(!region.on(Coord::new(9, 9)));
        assert_eq!(region.count(), 1);
        assert!(region.off(Coord::new(1, 1)));
        assert!(!region.off(Coord::new(1, 1)));
        assert!(region.is_empty());
    }

    #[test]
    fn test_set_algebra() {
        let a = block(10, 10, Coord::new(0, 0), 4, 4);
        let b = block(10, 10, Coord::new(2, 2), 4, 4);

        let mut union = a.clone();
        union.union_with(&b);
        assert_eq!(union.count(), 16 + 16 - 4);

        let mut difference = a.clone();
        difference.subtract(&b);
        assert_eq!(difference.count(), 12);
        assert!(!difference.contains(Coord::new(3, 3)));

        let mut overlap = a.clone();
        overlap.intersect(&b);
        assert_eq!(overlap.count(), 4);
        assert!(a.intersects(&b));
        assert!(!difference.intersects(&b));
    }

    #[test]
    #[should_panic]
    fn test_mismatched_sizes_panic() {
        let mut a = Region::new(3, 3);
        a.union_with(&Region::new(4, 3));
    }

    #[test]
    fn test_expand_retract_fringe() {
        let center = Region::singleton(9, 9, Coord::new(4, 4));
        assert_eq!(center.expand(1, Adjacency::Octile).count(), 9);
        assert_eq!(center.expand(2, Adjacency::Cardinal).count(), 13);

        let square = block(9, 9, Coord::new(1, 1), 5, 5);
        let inner = square.retract(1, Adjacency::Octile);
        assert_eq!(inner.count(), 9);
        assert!(inner.contains(Coord::new(3, 3)));

        let ring = square.fringe(1, Adjacency::Octile);
        assert_eq!(ring.count(), 7 * 7 - 25);
        assert!(!ring.intersects(&square));
    }

    #[test]
    fn test_retract_drops_map_edge() {
        let full = Region::full(5, 5);
        let inner = full.retract(1, Adjacency::Cardinal);
        assert_eq!(inner.count(), 9);
    }

    #[test]
    fn test_flood_respects_bounds() {
        let bounds = block(10, 1, Coord::new(0, 0), 6, 1);
        let mut seed = Region::singleton(10, 1, Coord::new(0, 0));
        seed.flood(&bounds, 3);
        assert_eq!(seed.count(), 4);
        seed.flood(&bounds, 10);
        assert_eq!(seed.count(), 6);
    }

    #[test]
    fn test_connected_components() {
        let mut region = block(10, 5, Coord::new(0, 0), 3, 3);
        region.union_with(&block(10, 5, Coord::new(5, 0), 2, 2));
        region.on(Coord::new(8, 3));
        // diagonal neighbour of the second block
        region.on(Coord::new(7, 2));

        let cardinal = region.connected_components(Adjacency::Cardinal);
        assert_eq!(cardinal.len(), 4);
        assert_eq!(cardinal[0].count(), 9);

        let octile = region.connected_components(Adjacency::Octile);
        assert_eq!(octile.len(), 2);
        assert_eq!(
            octile.iter().map(Region::count).sum::<usize>(),
            region.count()
        );
        assert_eq!(region.largest_component(Adjacency::Cardinal).unwrap().count(), 9);
    }

    #[test]
    fn test_random_sample() {
        let region = block(20, 20, Coord::new(2, 2), 10, 10);
        let mut rng = StdRng::seed_from_u64(11);

        let sample = region.random_sample(&mut rng, 15);
        assert_eq!(sample.len(), 15);
        assert!(sample.iter().all(|&c| region.contains(c)));
        let distinct = Region::from_coords(20, 20, sample.iter().copied());
        assert_eq!(distinct.count(), 15);

        assert_eq!(region.random_sample(&mut rng, 500).len(), 100);
        assert!(region.random_sample(&mut rng, 0).is_empty());
        assert!(Region::new(4, 4).single_random(&mut rng).is_none());
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let region = block(30, 30, Coord::new(0, 0), 30, 30);
        let a = region.random_sample(&mut StdRng::seed_from_u64(5), 20);
        let b = region.random_sample(&mut StdRng::seed_from_u64(5), 20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_spill_stops_at_volume_or_exhaustion() {
        let bounds = block(12, 12, Coord::new(1, 1), 4, 4);
        let mut rng = StdRng::seed_from_u64(9);

        let mut pool = Region::singleton(12, 12, Coord::new(2, 2));
        pool.spill(&bounds, 7, &mut rng);
        assert_eq!(pool.count(), 7);
        assert_eq!(pool.connected_components(Adjacency::Cardinal).len(), 1);

        let mut greedy = Region::singleton(12, 12, Coord::new(2, 2));
        greedy.spill(&bounds, 1_000, &mut rng);
        assert_eq!(greedy.count(), 16);
        assert!(greedy.iter().all(|c| bounds.contains(c)));
    }

    #[test]
    fn test_separated_sample_keeps_spacing() {
        let region = Region::full(40, 40);
        let mut rng = StdRng::seed_from_u64(21);
        let points = region.separated_sample(&mut rng, 5.0);
        assert!(!points.is_empty());
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(a.euclidean_distance(*b) >= 5.0);
            }
        }
    }

    #[test]
    fn test_remove_isolated() {
        let mut region = block(8, 8, Coord::new(0, 0), 2, 1);
        region.on(Coord::new(5, 5));
        region.remove_isolated();
        assert_eq!(region.count(), 2);
        assert!(!region.contains(Coord::new(5, 5)));
    }
}
