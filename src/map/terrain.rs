//! # Terrain
//!
//! Terrain and environment classifications, their ASCII glyphs, and the
//! whole-map helpers (parse, render, wall wrap, bare collapse) built on them.

use crate::{CairnError, CairnResult, Coord, Grid};
use serde::{Deserialize, Serialize};

/// What occupies a single map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Wall,
    Floor,
    /// Door in a passage running west to east.
    DoorHorizontal,
    /// Door in a passage running north to south.
    DoorVertical,
    WaterDeep,
    WaterShallow,
    Grass,
    Boulder,
    Trap,
    /// Corridor crossing a lake.
    Bridge,
    MazeFloor,
    LakeDeep,
    LakeShallow,
    StairUp,
    StairDown,
    /// Not written by a layer; composites to wall.
    Untouched,
}

impl Terrain {
    /// Whether the cell can be walked through.
    ///
    /// Walls, boulders and untouched cells block movement; everything else,
    /// water included, is passable.
    pub fn is_passable(self) -> bool {
        !matches!(self, Terrain::Wall | Terrain::Boulder | Terrain::Untouched)
    }

    pub fn is_door(self) -> bool {
        matches!(self, Terrain::DoorHorizontal | Terrain::DoorVertical)
    }

    pub fn is_stairs(self) -> bool {
        matches!(self, Terrain::StairUp | Terrain::StairDown)
    }

    /// Pools placed by the feature fill (not lakes).
    pub fn is_water(self) -> bool {
        matches!(self, Terrain::WaterDeep | Terrain::WaterShallow)
    }

    pub fn is_lake(self) -> bool {
        matches!(self, Terrain::LakeDeep | Terrain::LakeShallow)
    }

    /// Display glyph.
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn::Terrain;
    ///
    /// assert_eq!(Terrain::Wall.glyph(), '#');
    /// assert_eq!(Terrain::from_glyph('~'), Some(Terrain::WaterDeep));
    /// ```
    pub fn glyph(self) -> char {
        match self {
            Terrain::Wall => '#',
            Terrain::Floor => '.',
            Terrain::DoorHorizontal => '+',
            Terrain::DoorVertical => '/',
            Terrain::WaterDeep => '~',
            Terrain::WaterShallow => ',',
            Terrain::Grass => '"',
            Terrain::Boulder => '0',
            Terrain::Trap => '^',
            Terrain::Bridge => ':',
            Terrain::MazeFloor => ';',
            Terrain::LakeDeep => '%',
            Terrain::LakeShallow => '`',
            Terrain::StairUp => '<',
            Terrain::StairDown => '>',
            Terrain::Untouched => ' ',
        }
    }

    /// Inverse of [`Terrain::glyph`].
    pub fn from_glyph(glyph: char) -> Option<Terrain> {
        let terrain = match glyph {
            '#' => Terrain::Wall,
            '.' => Terrain::Floor,
            '+' => Terrain::DoorHorizontal,
            '/' => Terrain::DoorVertical,
            '~' => Terrain::WaterDeep,
            ',' => Terrain::WaterShallow,
            '"' => Terrain::Grass,
            '0' => Terrain::Boulder,
            '^' => Terrain::Trap,
            ':' => Terrain::Bridge,
            ';' => Terrain::MazeFloor,
            '%' => Terrain::LakeDeep,
            '`' => Terrain::LakeShallow,
            '<' => Terrain::StairUp,
            '>' => Terrain::StairDown,
            ' ' => Terrain::Untouched,
            _ => return None,
        };
        Some(terrain)
    }

    /// Collapses to the two-symbol wall/floor alphabet.
    pub fn bare(self) -> Terrain {
        if self.is_passable() {
            Terrain::Floor
        } else {
            Terrain::Wall
        }
    }
}

/// Externally supplied classification of floor cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentTag {
    Room,
    Corridor,
    Cave,
    Untouched,
}

impl EnvironmentTag {
    /// Single-character code used by text fixtures.
    pub fn code(self) -> char {
        match self {
            EnvironmentTag::Room => 'r',
            EnvironmentTag::Corridor => 'c',
            EnvironmentTag::Cave => 'v',
            EnvironmentTag::Untouched => ' ',
        }
    }

    pub fn from_code(code: char) -> Option<EnvironmentTag> {
        match code {
            'r' => Some(EnvironmentTag::Room),
            'c' => Some(EnvironmentTag::Corridor),
            'v' => Some(EnvironmentTag::Cave),
            ' ' | '#' => Some(EnvironmentTag::Untouched),
            _ => None,
        }
    }
}

/// Parses a terrain map from text, one row per line.
///
/// Blank leading and trailing lines are ignored so fixtures can be written
/// as indented raw strings after trimming.
pub fn parse_terrain(text: &str) -> CairnResult<Grid<Terrain>> {
    let rows = text_rows(text)
        .map(|(y, line)| {
            line.chars()
                .enumerate()
                .map(|(x, ch)| {
                    Terrain::from_glyph(ch).ok_or_else(|| {
                        CairnError::InvalidMap(format!("unknown glyph {:?} at ({}, {})", ch, x, y))
                    })
                })
                .collect::<CairnResult<Vec<_>>>()
        })
        .collect::<CairnResult<Vec<_>>>()?;
    Grid::from_rows(rows)
}

/// Parses an environment tag grid from text using [`EnvironmentTag::code`].
pub fn parse_environment(text: &str) -> CairnResult<Grid<EnvironmentTag>> {
    let rows = text_rows(text)
        .map(|(y, line)| {
            line.chars()
                .enumerate()
                .map(|(x, ch)| {
                    EnvironmentTag::from_code(ch).ok_or_else(|| {
                        CairnError::InvalidMap(format!(
                            "unknown environment code {:?} at ({}, {})",
                            ch, x, y
                        ))
                    })
                })
                .collect::<CairnResult<Vec<_>>>()
        })
        .collect::<CairnResult<Vec<_>>>()?;
    Grid::from_rows(rows)
}

fn text_rows(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .skip_while(|line| line.trim().is_empty())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .skip_while(|line| line.trim().is_empty())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .enumerate()
}

/// Renders a terrain grid as text, one line per row.
pub fn render_terrain(grid: &Grid<Terrain>) -> String {
    let mut out = String::with_capacity((grid.width() + 1) * grid.height());
    for (pos, cell) in grid.iter() {
        out.push(cell.glyph());
        if pos.x as usize == grid.width() - 1 {
            out.push('\n');
        }
    }
    out
}

/// Collapses every cell to [`Terrain::Wall`] or [`Terrain::Floor`].
///
/// Applying this twice gives the same grid as applying it once.
pub fn bare_terrain(grid: &Grid<Terrain>) -> Grid<Terrain> {
    grid.map(|_, cell| cell.bare())
}

/// Forces the outermost ring of cells to wall.
pub fn wall_wrap(grid: &mut Grid<Terrain>) {
    let border: Vec<Coord> = grid.coords().filter(|&c| grid.is_border(c)).collect();
    for pos in border {
        grid[pos] = Terrain::Wall;
    }
}
