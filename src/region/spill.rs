//! # Spill Engine
//!
//! Concurrent, budgeted growth of several regions through shared claimable
//! cells. Each source grows one cell at a time from a random frontier cell;
//! sources take turns in rounds, and a source with a lower bias skips turns
//! more often, which yields uneven, organic pools.

use crate::{config, Coord, Region};
use log::trace;
use rand::Rng;

/// A seed cell for the [`SpillEngine`] with its growth budget and bias.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpillSource {
    /// First cell claimed by this source
    pub start: Coord,
    /// Maximum number of cells this source may claim, start included
    pub budget: usize,
    /// Relative chance of growing in a given round; `<= 0` never grows
    pub bias: f64,
}

impl SpillSource {
    pub fn new(start: Coord, budget: usize, bias: f64) -> Self {
        Self {
            start,
            budget,
            bias,
        }
    }
}

struct Pool {
    claimed: Region,
    queued: Region,
    frontier: Vec<Coord>,
    budget: usize,
    bias: f64,
}

impl Pool {
    fn is_active(&self) -> bool {
        self.bias > 0.0 && self.claimed.count() < self.budget && !self.frontier.is_empty()
    }

    fn enqueue_neighbors(&mut self, pos: Coord, claimable: &Region) {
        for n in pos.cardinal_adjacent_positions() {
            if claimable.contains(n) && self.queued.on(n) {
                self.frontier.push(n);
            }
        }
    }

    /// Claims one random frontier cell that is still claimable. Entries taken
    /// by another pool since they were queued are dropped on the way.
    fn grow<R: Rng + ?Sized>(&mut self, claimable: &mut Region, rng: &mut R) -> bool {
        while !self.frontier.is_empty() {
            let pick = self.frontier.swap_remove(rng.gen_range(0..self.frontier.len()));
            if claimable.off(pick) {
                self.claimed.on(pick);
                self.enqueue_neighbors(pick, claimable);
                return true;
            }
        }
        false
    }
}

/// Grows pools of terrain (water, grass) through unclaimed floor.
///
/// # Examples
///
/// ```
/// use cairn::{Coord, Region, SpillEngine, SpillSource};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut claimable = Region::full(20, 20);
/// let engine = SpillEngine::default();
/// let pools = engine.spill(
///     &[
///         SpillSource::new(Coord::new(3, 3), 10, 1.0),
///         SpillSource::new(Coord::new(15, 15), 6, 0.5),
///     ],
///     &mut claimable,
///     &mut StdRng::seed_from_u64(1),
/// );
/// assert_eq!(pools[0].count(), 10);
/// assert_eq!(pools[1].count(), 6);
/// assert_eq!(claimable.count(), 400 - 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpillEngine {
    frustration_limit: u32,
}

impl Default for SpillEngine {
    fn default() -> Self {
        Self::new(config::DEFAULT_BONUS_FRUSTRATION_LIMIT)
    }
}

impl SpillEngine {
    /// Creates an engine that gives up on bonus volume after
    /// `frustration_limit` fruitless redistribution attempts.
    pub fn new(frustration_limit: u32) -> Self {
        Self { frustration_limit }
    }

    pub fn frustration_limit(&self) -> u32 {
        self.frustration_limit
    }

    /// Grows every source concurrently, removing claimed cells from
    /// `claimable`. Returns one region per source, in source order.
    ///
    /// A source whose start is not claimable (or whose budget is zero) yields
    /// an empty region. Each round visits the active sources in order; a
    /// source claims a cell with probability `bias / max_bias` over the
    /// sources still active, so the strongest source always advances and the
    /// loop terminates.
    pub fn spill<R: Rng + ?Sized>(
        &self,
        sources: &[SpillSource],
        claimable: &mut Region,
        rng: &mut R,
    ) -> Vec<Region> {
        let (width, height) = (claimable.width(), claimable.height());
        let mut pools: Vec<Pool> = Vec::with_capacity(sources.len());

        for source in sources {
            let mut pool = Pool {
                claimed: Region::new(width, height),
                queued: Region::new(width, height),
                frontier: Vec::new(),
                budget: source.budget,
                bias: source.bias,
            };
            if source.budget > 0 && claimable.off(source.start) {
                pool.claimed.on(source.start);
                pool.queued.on(source.start);
                pool.enqueue_neighbors(source.start, claimable);
            }
            pools.push(pool);
        }

        let mut rounds = 0usize;
        loop {
            let max_bias = pools
                .iter()
                .filter(|p| p.is_active())
                .map(|p| p.bias)
                .fold(0.0_f64, f64::max);
            if max_bias <= 0.0 {
                break;
            }
            rounds += 1;

            for pool in pools.iter_mut() {
                if !pool.is_active() {
                    continue;
                }
                if pool.bias < max_bias && !rng.gen_bool(pool.bias / max_bias) {
                    continue;
                }
                pool.grow(claimable, rng);
            }
        }

        trace!(
            "spill finished after {} rounds: {:?}",
            rounds,
            pools.iter().map(|p| p.claimed.count()).collect::<Vec<_>>()
        );
        pools.into_iter().map(|p| p.claimed).collect()
    }

    /// Redistributes `volume` leftover cells: repeatedly spills from a random
    /// claimable cell until the volume is placed or `frustration_limit`
    /// attempts came up short. Claimed cells are removed from `claimable`.
    pub fn spill_bonus<R: Rng + ?Sized>(
        &self,
        volume: usize,
        claimable: &mut Region,
        rng: &mut R,
    ) -> Region {
        let mut placed = Region::new(claimable.width(), claimable.height());
        let mut remaining = volume;
        let mut frustration = 0u32;

        while remaining > 0 && frustration < self.frustration_limit {
            let Some(start) = claimable.single_random(rng) else {
                break;
            };
            let mut patch = Region::singleton(claimable.width(), claimable.height(), start);
            patch.spill(claimable, remaining, rng);
            claimable.subtract(&patch);
            placed.union_with(&patch);
            remaining -= patch.count().min(remaining);
            if remaining > 0 {
                frustration += 1;
            }
        }

        placed
    }

    /// Splits `target` cells into `pool_count` sources at distinct random
    /// claimable cells. Budgets are uniform around the mean pool size and
    /// never exceed what is still unassigned; biases are uniform in
    /// `[0.5, 1.0)`.
    pub fn plan_pools<R: Rng + ?Sized>(
        &self,
        claimable: &Region,
        target: usize,
        pool_count: usize,
        rng: &mut R,
    ) -> Vec<SpillSource> {
        if target == 0 || pool_count == 0 {
            return Vec::new();
        }
        let starts = claimable.random_sample(rng, pool_count.min(target));
        let mean = (target / starts.len().max(1)).max(1);
        let mut unassigned = target;

        let mut sources = Vec::with_capacity(starts.len());
        for start in starts {
            if unassigned == 0 {
                break;
            }
            let low = (mean / 2).max(1);
            let high = (mean * 3 / 2).max(low);
            let budget = rng.gen_range(low..=high).min(unassigned);
            unassigned -= budget;
            sources.push(SpillSource::new(start, budget, rng.gen_range(0.5..1.0)));
        }
        sources
    }

    /// Plans `pool_count` pools totalling `target` cells, grows them, then
    /// redistributes any shortfall. Returns the union of everything placed.
    pub fn fill<R: Rng + ?Sized>(
        &self,
        claimable: &mut Region,
        target: usize,
        pool_count: usize,
        rng: &mut R,
    ) -> Region {
        let mut placed = Region::new(claimable.width(), claimable.height());
        let sources = self.plan_pools(claimable, target, pool_count, rng);
        for pool in self.spill(&sources, claimable, rng) {
            placed.union_with(&pool);
        }

        let shortfall = target.saturating_sub(placed.count());
        if shortfall > 0 {
            trace!("redistributing {} bonus cells", shortfall);
            let bonus = self.spill_bonus(shortfall, claimable, rng);
            placed.union_with(&bonus);
        }
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Adjacency;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_pools_are_disjoint_and_connected() {
        let mut claimable = Region::full(30, 30);
        let engine = SpillEngine::default();
        let sources = [
            SpillSource::new(Coord::new(8, 14), 40, 1.0),
            SpillSource::new(Coord::new(12, 14), 40, 0.6),
            SpillSource::new(Coord::new(20, 20), 25, 0.8),
        ];
        let pools = engine.spill(&sources, &mut claimable, &mut StdRng::seed_from_u64(4));

        assert_eq!(pools.len(), 3);
        for (i, pool) in pools.iter().enumerate() {
            assert_eq!(pool.count(), sources[i].budget);
            assert_eq!(pool.connected_components(Adjacency::Cardinal).len(), 1);
            assert!(!pool.intersects(&claimable));
        }
        assert!(!pools[0].intersects(&pools[1]));
        assert_eq!(claimable.count(), 900 - 105);
    }

    #[test]
    fn test_source_stops_when_boxed_in() {
        let mut claimable = Region::rectangle(10, 10, Coord::new(0, 0), 3, 3);
        let engine = SpillEngine::default();
        let pools = engine.spill(
            &[SpillSource::new(Coord::new(1, 1), 50, 1.0)],
            &mut claimable,
            &mut StdRng::seed_from_u64(8),
        );
        assert_eq!(pools[0].count(), 9);
        assert!(claimable.is_empty());
    }

    #[test]
    fn test_zero_bias_and_unclaimable_start() {
        let mut claimable = Region::full(10, 10);
        claimable.off(Coord::new(8, 8));
        let pools = SpillEngine::default().spill(
            &[
                SpillSource::new(Coord::new(1, 1), 10, 0.0),
                SpillSource::new(Coord::new(8, 8), 10, 1.0),
            ],
            &mut claimable,
            &mut StdRng::seed_from_u64(2),
        );
        assert_eq!(pools[0].count(), 1);
        assert!(pools[1].is_empty());
    }

    #[test]
    fn test_bonus_fills_fragmented_space() {
        // Ten isolated 2-cell slots; no single spill can hold 15 cells.
        let mut claimable = Region::new(40, 3);
        for i in 0..10 {
            claimable.on(Coord::new(i * 4, 1));
            claimable.on(Coord::new(i * 4 + 1, 1));
        }
        let engine = SpillEngine::new(50);
        let placed = engine.spill_bonus(15, &mut claimable, &mut StdRng::seed_from_u64(6));
        assert_eq!(placed.count(), 15);
        assert_eq!(claimable.count(), 5);
    }

    #[test]
    fn test_bonus_terminates_without_room() {
        let mut claimable = Region::from_coords(10, 10, [Coord::new(4, 4)]);
        let placed = SpillEngine::new(3).spill_bonus(20, &mut claimable, &mut StdRng::seed_from_u64(1));
        assert_eq!(placed.count(), 1);
        assert!(claimable.is_empty());
    }

    #[test]
    fn test_fill_hits_target_on_open_floor() {
        let mut claimable = Region::full(40, 30);
        let placed = SpillEngine::default().fill(&mut claimable, 360, 4, &mut StdRng::seed_from_u64(12));
        assert_eq!(placed.count(), 360);
        assert_eq!(claimable.count(), 1200 - 360);
    }

    #[test]
    fn test_plan_pools_respects_target() {
        let claimable = Region::full(20, 20);
        let mut rng = StdRng::seed_from_u64(3);
        let sources = SpillEngine::default().plan_pools(&claimable, 50, 5, &mut rng);
        assert!(!sources.is_empty());
        assert!(sources.iter().map(|s| s.budget).sum::<usize>() <= 50);
        assert!(sources.iter().all(|s| (0.5..1.0).contains(&s.bias)));
        assert!(SpillEngine::default()
            .plan_pools(&claimable, 0, 5, &mut rng)
            .is_empty());
    }
}
