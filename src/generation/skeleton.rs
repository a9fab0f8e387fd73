//! # Skeleton Sources
//!
//! Producers of bare wall/floor skeletons for the dressing pipeline.
//!
//! [`RoomCorridorSkeleton`] builds a classic layout:
//! 1. Placing rooms randomly with collision detection
//! 2. Roughening some of them into caves
//! 3. Connecting room centres with L-shaped corridors
//!
//! and records which floor cells are room, corridor or cave. [`AsciiSkeleton`]
//! serves a fixed text map, which is handy for tests and for feeding the CLI
//! hand-drawn levels.

use crate::utils::is_connected;
use crate::{
    config, Adjacency, CairnError, CairnResult, Coord, Direction, EnvironmentTag, Grid, Region,
    Skeleton, SkeletonSource, Terrain,
};
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for skeleton generation.
///
/// Controls the map size, the number and size of rooms, and how many of
/// them become caves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Map width in cells
    pub width: usize,
    /// Map height in cells
    pub height: usize,
    /// Minimum room size (walls included)
    pub min_room_size: usize,
    /// Maximum room size (walls included)
    pub max_room_size: usize,
    /// Minimum number of rooms per level
    pub min_rooms: usize,
    /// Maximum number of rooms per level
    pub max_rooms: usize,
    /// Probability of extra connections between rooms (0.0 to 1.0)
    pub extra_connection_chance: f64,
    /// Probability that a room is roughened into a cave (0.0 to 1.0)
    pub cave_chance: f64,
}

impl SkeletonConfig {
    /// Creates a default skeleton configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn::SkeletonConfig;
    ///
    /// let config = SkeletonConfig::new(42);
    /// assert!(config.min_room_size >= 3);
    /// assert!(config.max_room_size >= config.min_room_size);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            width: config::DEFAULT_DUNGEON_WIDTH,
            height: config::DEFAULT_DUNGEON_HEIGHT,
            min_room_size: 5,
            max_room_size: 12,
            min_rooms: 6,
            max_rooms: 12,
            extra_connection_chance: 0.15,
            cave_chance: 0.25,
        }
    }

    /// Creates a configuration for testing with smaller, simpler levels.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            seed,
            width: 50,
            height: 30,
            min_room_size: 5,
            max_room_size: 9,
            min_rooms: 4,
            max_rooms: 7,
            extra_connection_chance: 0.1,
            cave_chance: 0.3,
        }
    }

    /// Same configuration with a different map size.
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Checks that rooms can fit on the map.
    pub fn validate(&self) -> CairnResult<()> {
        if self.min_room_size < 3 || self.min_room_size > self.max_room_size {
            return Err(CairnError::InvalidConfig(format!(
                "room sizes {}..={} are invalid",
                self.min_room_size, self.max_room_size
            )));
        }
        if self.width < self.max_room_size + 3 || self.height < self.max_room_size + 3 {
            return Err(CairnError::InvalidConfig(format!(
                "a {}x{} map cannot hold rooms of size {}",
                self.width, self.height, self.max_room_size
            )));
        }
        if self.min_rooms == 0 || self.min_rooms > self.max_rooms {
            return Err(CairnError::InvalidConfig(format!(
                "room counts {}..={} are invalid",
                self.min_rooms, self.max_rooms
            )));
        }
        for (name, chance) in [
            ("extra_connection_chance", self.extra_connection_chance),
            ("cave_chance", self.cave_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(CairnError::InvalidConfig(format!(
                    "{} {} must be in [0, 1]",
                    name, chance
                )));
            }
        }
        Ok(())
    }
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Whether a room keeps straight walls or is roughened into a cave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    Chamber,
    Cave,
}

/// A rectangular room footprint, walls included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Unique identifier for this room
    pub id: u32,
    /// Top-left corner of the room
    pub top_left: Coord,
    /// Width of the room (including walls)
    pub width: usize,
    /// Height of the room (including walls)
    pub height: usize,
    pub kind: RoomKind,
}

impl Room {
    /// Creates a new room with the given parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn::{Coord, Room, RoomKind};
    ///
    /// let room = Room::new(1, Coord::new(5, 5), 10, 8, RoomKind::Chamber);
    /// assert_eq!(room.inner_area(), 48);
    /// assert!(room.contains(Coord::new(7, 7)));
    /// ```
    pub fn new(id: u32, top_left: Coord, width: usize, height: usize, kind: RoomKind) -> Self {
        Self {
            id,
            top_left,
            width,
            height,
            kind,
        }
    }

    /// Gets the bottom-right corner of the room.
    pub fn bottom_right(&self) -> Coord {
        Coord::new(
            self.top_left.x + self.width as i32 - 1,
            self.top_left.y + self.height as i32 - 1,
        )
    }

    /// Gets the center position of the room.
    pub fn center(&self) -> Coord {
        Coord::new(
            self.top_left.x + self.width as i32 / 2,
            self.top_left.y + self.height as i32 / 2,
        )
    }

    /// Gets the inner area (excluding walls) of the room.
    pub fn inner_area(&self) -> usize {
        self.width.saturating_sub(2) * self.height.saturating_sub(2)
    }

    /// Checks if a position is inside this room.
    pub fn contains(&self, pos: Coord) -> bool {
        let br = self.bottom_right();
        pos.x >= self.top_left.x && pos.y >= self.top_left.y && pos.x <= br.x && pos.y <= br.y
    }

    /// Checks if this room overlaps with another room.
    pub fn overlaps(&self, other: &Room) -> bool {
        !(self.top_left.x >= other.top_left.x + other.width as i32
            || other.top_left.x >= self.top_left.x + self.width as i32
            || self.top_left.y >= other.top_left.y + other.height as i32
            || other.top_left.y >= self.top_left.y + self.height as i32)
    }

    /// Gets all floor positions within this room.
    pub fn floor_positions(&self) -> Vec<Coord> {
        let br = self.bottom_right();
        ((self.top_left.y + 1)..br.y)
            .flat_map(|y| ((self.top_left.x + 1)..br.x).map(move |x| Coord::new(x, y)))
            .collect()
    }
}

/// Room-and-corridor skeleton generator.
#[derive(Debug, Clone)]
pub struct RoomCorridorSkeleton {
    pub config: SkeletonConfig,
    /// Maximum attempts to place a room before giving up
    pub max_placement_attempts: u32,
}

impl RoomCorridorSkeleton {
    /// Creates a generator for the given configuration.
    pub fn new(config: SkeletonConfig) -> Self {
        Self {
            config,
            max_placement_attempts: 100,
        }
    }

    /// Creates a generator optimized for testing.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            config: SkeletonConfig::for_testing(seed),
            max_placement_attempts: 50,
        }
    }

    /// Places rooms with collision detection. Rooms keep at least one wall
    /// between each other.
    fn place_rooms(&self, rng: &mut StdRng) -> CairnResult<Vec<Room>> {
        let config = &self.config;
        let room_count = rng.gen_range(config.min_rooms..=config.max_rooms);
        let mut rooms: Vec<Room> = Vec::new();

        for room_id in 0..room_count as u32 {
            for _ in 0..self.max_placement_attempts {
                let width = rng.gen_range(config.min_room_size..=config.max_room_size);
                let height = rng.gen_range(config.min_room_size..=config.max_room_size);
                let x = rng.gen_range(1..(config.width - width - 1)) as i32;
                let y = rng.gen_range(1..(config.height - height - 1)) as i32;
                let kind = if room_id > 0 && rng.gen_bool(config.cave_chance) {
                    RoomKind::Cave
                } else {
                    RoomKind::Chamber
                };
                let room = Room::new(room_id, Coord::new(x, y), width, height, kind);

                if rooms.iter().any(|existing| room.overlaps(existing)) {
                    continue;
                }
                rooms.push(room);
                break;
            }
        }

        if rooms.is_empty() {
            return Err(CairnError::GenerationFailed(
                "Failed to place any rooms".to_string(),
            ));
        }
        Ok(rooms)
    }

    /// Carves a room. Caves are dug by a random walk from the centre that
    /// stays inside the room's floor area.
    fn carve_room(
        &self,
        terrain: &mut Grid<Terrain>,
        environment: &mut Grid<EnvironmentTag>,
        room: &Room,
        rng: &mut StdRng,
    ) {
        let floor = room.floor_positions();
        let cells: Vec<Coord> = match room.kind {
            RoomKind::Chamber => floor,
            RoomKind::Cave => {
                let inside = Region::from_coords(terrain.width(), terrain.height(), floor);
                let mut dug = Region::new(terrain.width(), terrain.height());
                let mut pos = room.center();
                let target = inside.count() * 2 / 3;
                let mut steps = 0;
                while dug.count() < target && steps < inside.count() * 20 {
                    dug.on(pos);
                    let next = pos.step(Direction::CARDINAL[rng.gen_range(0..4)]);
                    if inside.contains(next) {
                        pos = next;
                    }
                    steps += 1;
                }
                dug.iter().collect()
            }
        };

        let tag = match room.kind {
            RoomKind::Chamber => EnvironmentTag::Room,
            RoomKind::Cave => EnvironmentTag::Cave,
        };
        for pos in cells {
            terrain[pos] = Terrain::Floor;
            environment[pos] = tag;
        }
    }

    /// Carves an L-shaped corridor between two points. Cells already dug
    /// keep their classification.
    fn carve_l_corridor(
        &self,
        terrain: &mut Grid<Terrain>,
        environment: &mut Grid<EnvironmentTag>,
        start: Coord,
        end: Coord,
        horizontal_first: bool,
    ) {
        let corner = if horizontal_first {
            Coord::new(end.x, start.y)
        } else {
            Coord::new(start.x, end.y)
        };
        for (from, to) in [(start, corner), (corner, end)] {
            let (min_x, max_x) = (from.x.min(to.x), from.x.max(to.x));
            let (min_y, max_y) = (from.y.min(to.y), from.y.max(to.y));
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let pos = Coord::new(x, y);
                    if terrain.in_bounds(pos) && !terrain.is_border(pos) && terrain[pos] == Terrain::Wall {
                        terrain[pos] = Terrain::Floor;
                        environment[pos] = EnvironmentTag::Corridor;
                    }
                }
            }
        }
    }

    /// Connects each room to the next one, plus a few extra links.
    fn connect_rooms(
        &self,
        terrain: &mut Grid<Terrain>,
        environment: &mut Grid<EnvironmentTag>,
        rooms: &[Room],
        rng: &mut StdRng,
    ) {
        for pair in rooms.windows(2) {
            let horizontal_first = rng.gen_bool(0.5);
            self.carve_l_corridor(terrain, environment, pair[0].center(), pair[1].center(), horizontal_first);
        }

        let extra_connections = (rooms.len() as f64 * self.config.extra_connection_chance) as usize;
        for _ in 0..extra_connections {
            let a = rng.gen_range(0..rooms.len());
            let b = rng.gen_range(0..rooms.len());
            if a != b {
                let horizontal_first = rng.gen_bool(0.5);
                self.carve_l_corridor(terrain, environment, rooms[a].center(), rooms[b].center(), horizontal_first);
            }
        }
    }
}

impl Default for RoomCorridorSkeleton {
    fn default() -> Self {
        Self::new(SkeletonConfig::default())
    }
}

impl SkeletonSource for RoomCorridorSkeleton {
    fn generate(&self, rng: &mut StdRng) -> CairnResult<Skeleton> {
        self.config.validate()?;
        let (width, height) = (self.config.width, self.config.height);
        let mut terrain = Grid::new(width, height, Terrain::Wall);
        let mut environment = Grid::new(width, height, EnvironmentTag::Untouched);

        let rooms = self.place_rooms(rng)?;
        for room in &rooms {
            self.carve_room(&mut terrain, &mut environment, room, rng);
        }
        self.connect_rooms(&mut terrain, &mut environment, &rooms, rng);

        debug!(
            "skeleton with {} rooms ({} caves) on a {}x{} map",
            rooms.len(),
            rooms.iter().filter(|r| r.kind == RoomKind::Cave).count(),
            width,
            height
        );
        let skeleton = Skeleton::with_environment(terrain, environment)?;
        self.validate(&skeleton)?;
        Ok(skeleton)
    }

    fn validate(&self, skeleton: &Skeleton) -> CairnResult<()> {
        skeleton.validate()?;
        let floor = Region::from_grid(skeleton.terrain(), |t| t.is_passable());
        if !is_connected(&floor, Adjacency::Cardinal) {
            return Err(CairnError::GenerationFailed(
                "rooms are not connected to each other".to_string(),
            ));
        }
        Ok(())
    }

    fn source_type(&self) -> &'static str {
        "RoomCorridorSkeleton"
    }
}

/// A fixed skeleton given as glyph text, with optional environment codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsciiSkeleton {
    pub terrain: String,
    pub environment: Option<String>,
}

impl AsciiSkeleton {
    pub fn new(terrain: impl Into<String>) -> Self {
        Self {
            terrain: terrain.into(),
            environment: None,
        }
    }

    pub fn with_environment(terrain: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            terrain: terrain.into(),
            environment: Some(environment.into()),
        }
    }
}

impl SkeletonSource for AsciiSkeleton {
    fn generate(&self, _rng: &mut StdRng) -> CairnResult<Skeleton> {
        let skeleton = match &self.environment {
            Some(env) => Skeleton::from_ascii_with_environment(&self.terrain, env)?,
            None => Skeleton::from_ascii(&self.terrain)?,
        };
        self.validate(&skeleton)?;
        Ok(skeleton)
    }

    fn source_type(&self) -> &'static str {
        "AsciiSkeleton"
    }
}
