//! # Lakes and Mazes
//!
//! Carves lakes and mazes into the rock between rooms and caves.
//!
//! Both features draw on the same budget: the largest connected block of
//! cells that belong to neither a room nor a cave (solid rock and corridors,
//! away from the map edge). When the two requests add up to more than the
//! whole block they are trimmed. Corridors running through a lake become
//! bridges; corridors inside a maze simply become part of it. Rooms the lake
//! touches are reclassified as caves.

use crate::utils::round_share;
use crate::{maze_pattern, Adjacency, Coord, EnvironmentTag, Grid, Percentage, Region, Terrain};
use log::debug;
use rand::Rng;

/// Cells carved by the lake and maze stage, plus the updated environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carving {
    pub lake_deep: Region,
    pub lake_shallow: Region,
    /// Corridor cells crossing the lake
    pub bridges: Region,
    pub maze: Region,
    /// Environment after reclassification: maze cells are corridor, lake
    /// cells and rooms touching the lake are cave
    pub environment: Grid<EnvironmentTag>,
}

impl Carving {
    /// A carving that changes nothing.
    pub fn none(environment: Grid<EnvironmentTag>) -> Self {
        let (width, height) = environment.dimensions();
        Self {
            lake_deep: Region::new(width, height),
            lake_shallow: Region::new(width, height),
            bridges: Region::new(width, height),
            maze: Region::new(width, height),
            environment,
        }
    }

    /// Whether anything was carved.
    pub fn is_empty(&self) -> bool {
        self.lake_deep.is_empty()
            && self.lake_shallow.is_empty()
            && self.bridges.is_empty()
            && self.maze.is_empty()
    }

    /// Terrain carved at `pos`, if any.
    pub fn terrain_at(&self, pos: Coord) -> Option<Terrain> {
        if self.bridges.contains(pos) {
            Some(Terrain::Bridge)
        } else if self.lake_shallow.contains(pos) {
            Some(Terrain::LakeShallow)
        } else if self.lake_deep.contains(pos) {
            Some(Terrain::LakeDeep)
        } else if self.maze.contains(pos) {
            Some(Terrain::MazeFloor)
        } else {
            None
        }
    }
}

/// Trims lake and maze requests whose sum exceeds 100.
///
/// # Examples
///
/// ```
/// use cairn::{trim_lake_maze, Percentage};
///
/// let (lake, maze) = trim_lake_maze(Percentage::new(70).unwrap(), Percentage::new(50).unwrap());
/// assert_eq!((lake.value(), maze.value()), (60, 40));
/// ```
pub fn trim_lake_maze(lake: Percentage, maze: Percentage) -> (Percentage, Percentage) {
    let (l, m) = (lake.value(), maze.value());
    let sum = l as u16 + m as u16;
    if sum <= 100 {
        return (lake, maze);
    }
    let lake_cut = ((sum - 100) / 2) as u8;
    let maze_cut = ((sum - 99) / 2) as u8;
    (
        Percentage::saturating(l.saturating_sub(lake_cut)),
        Percentage::saturating(m.saturating_sub(maze_cut)),
    )
}

/// Carves lakes and mazes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LakeMazeCarver;

impl LakeMazeCarver {
    pub fn new() -> Self {
        Self
    }

    /// Carves `lake`% and `maze`% of the free rock block of `terrain`.
    pub fn carve<R: Rng + ?Sized>(
        &self,
        terrain: &Grid<Terrain>,
        environment: &Grid<EnvironmentTag>,
        lake: Percentage,
        maze: Percentage,
        rng: &mut R,
    ) -> Carving {
        let mut carving = Carving::none(environment.clone());
        let (lake, maze) = trim_lake_maze(lake, maze);
        if lake.is_zero() && maze.is_zero() {
            return carving;
        }

        let (width, height) = terrain.dimensions();
        let floor = Region::from_grid(terrain, |t| t.is_passable());
        let corridors = Region::from_grid(environment, |e| *e == EnvironmentTag::Corridor);
        let mut potential = Region::from_grid(environment, |e| {
            !matches!(e, EnvironmentTag::Room | EnvironmentTag::Cave)
        });
        potential.subtract(&Region::from_grid(terrain, |t| t.is_stairs()));
        potential.intersect(&Region::full(width, height).retract(1, Adjacency::Cardinal));

        let Some(block) = potential.largest_component(Adjacency::Cardinal) else {
            return carving;
        };
        let lake_volume = round_share(block.count(), lake.value() as usize, 100);
        let maze_volume = round_share(block.count(), maze.value() as usize, 100);

        let mut remaining = block.clone();
        if lake_volume > 0 {
            self.carve_lake(&mut carving, &floor, &corridors, &mut remaining, lake_volume, rng);
        }
        if maze_volume > 0 {
            self.carve_maze(&mut carving, &corridors, &remaining, maze_volume, rng);
        }

        self.reclassify(&mut carving);
        debug!(
            "carved lake of {} cells ({} bridges) and maze of {} cells from a block of {}",
            carving.lake_deep.count() + carving.lake_shallow.count() + carving.bridges.count(),
            carving.bridges.count(),
            carving.maze.count(),
            block.count()
        );
        carving
    }

    /// Spills the lake from a cell next to existing floor when there is one,
    /// so the lake can be reached.
    fn carve_lake<R: Rng + ?Sized>(
        &self,
        carving: &mut Carving,
        floor: &Region,
        corridors: &Region,
        remaining: &mut Region,
        volume: usize,
        rng: &mut R,
    ) {
        let mut shore_starts = floor.fringe(1, Adjacency::Cardinal);
        shore_starts.union_with(floor);
        shore_starts.intersect(remaining);
        let start = shore_starts
            .single_random(rng)
            .or_else(|| remaining.single_random(rng));
        let Some(start) = start else {
            return;
        };

        let mut lake_area = Region::singleton(remaining.width(), remaining.height(), start);
        lake_area.spill(remaining, volume, rng);
        remaining.subtract(&lake_area);

        let mut bridges = lake_area.clone();
        bridges.intersect(corridors);
        let mut water = lake_area;
        water.subtract(&bridges);

        let mut dry = floor.clone();
        dry.subtract(&bridges);
        let near_floor = dry.fringe(3, Adjacency::Octile);
        let mut shallow = water.clone();
        shallow.intersect(&near_floor);
        let mut deep = water;
        deep.subtract(&shallow);

        carving.lake_deep = deep;
        carving.lake_shallow = shallow;
        carving.bridges = bridges;
    }

    /// Intersects a maze pattern with a spilled footprint. Corridor cells in
    /// the footprint join the maze so existing paths stay open.
    fn carve_maze<R: Rng + ?Sized>(
        &self,
        carving: &mut Carving,
        corridors: &Region,
        remaining: &Region,
        volume: usize,
        rng: &mut R,
    ) {
        let Some(start) = remaining.single_random(rng) else {
            return;
        };
        let mut footprint = Region::singleton(remaining.width(), remaining.height(), start);
        footprint.spill(remaining, volume, rng);

        let mut maze = maze_pattern(remaining.width(), remaining.height(), rng);
        maze.intersect(&footprint);
        let mut crossing = corridors.clone();
        crossing.intersect(&footprint);
        maze.union_with(&crossing);
        maze.remove_isolated();
        carving.maze = maze;
    }

    fn reclassify(&self, carving: &mut Carving) {
        let mut lake = carving.lake_deep.clone();
        lake.union_with(&carving.lake_shallow);
        lake.union_with(&carving.bridges);

        let rooms = Region::from_grid(&carving.environment, |e| *e == EnvironmentTag::Room);
        let lakeside = lake.expand(1, Adjacency::Octile);
        for room in rooms.connected_components(Adjacency::Cardinal) {
            if room.intersects(&lakeside) {
                for pos in room.iter() {
                    carving.environment[pos] = EnvironmentTag::Cave;
                }
            }
        }

        for pos in carving.maze.iter() {
            carving.environment[pos] = EnvironmentTag::Corridor;
        }
        for pos in lake.iter() {
            carving.environment[pos] = EnvironmentTag::Cave;
        }
    }
}
