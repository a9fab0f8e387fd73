//! # Maze Pattern
//!
//! Perfect mazes grown with randomized Prim's algorithm on the odd-coordinate
//! lattice of a map. The pattern is a [`Region`] of passage cells; the lake
//! and maze stage intersects it with the rock it is allowed to carve.

use crate::{Coord, Region};
use rand::seq::SliceRandom;
use rand::Rng;

/// Maze passages covering a `width` x `height` map.
///
/// Maze cells sit at odd coordinates; a passage between two cells opens the
/// even cell between them. Every passage cell is reachable from every other
/// through cardinal moves.
///
/// # Examples
///
/// ```
/// use cairn::{maze_pattern, Adjacency};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let maze = maze_pattern(21, 11, &mut StdRng::seed_from_u64(5));
/// assert_eq!(maze.connected_components(Adjacency::Cardinal).len(), 1);
/// ```
pub fn maze_pattern<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Region {
    let mut passages = Region::new(width, height);
    let cells_w = width.saturating_sub(1) / 2;
    let cells_h = height.saturating_sub(1) / 2;
    if cells_w == 0 || cells_h == 0 {
        return passages;
    }

    let to_map = |cx: usize, cy: usize| Coord::new(cx as i32 * 2 + 1, cy as i32 * 2 + 1);
    let mut in_maze = vec![false; cells_w * cells_h];
    let mut frontier: Vec<(usize, usize)> = Vec::new();

    let add_frontier = |cx: usize, cy: usize, in_maze: &[bool], frontier: &mut Vec<(usize, usize)>| {
        let mut push = |x: usize, y: usize| {
            if !in_maze[y * cells_w + x] {
                frontier.push((x, y));
            }
        };
        if cy > 0 {
            push(cx, cy - 1);
        }
        if cy + 1 < cells_h {
            push(cx, cy + 1);
        }
        if cx > 0 {
            push(cx - 1, cy);
        }
        if cx + 1 < cells_w {
            push(cx + 1, cy);
        }
    };

    let start = (rng.gen_range(0..cells_w), rng.gen_range(0..cells_h));
    in_maze[start.1 * cells_w + start.0] = true;
    passages.on(to_map(start.0, start.1));
    add_frontier(start.0, start.1, &in_maze, &mut frontier);

    while !frontier.is_empty() {
        let (cx, cy) = frontier.swap_remove(rng.gen_range(0..frontier.len()));
        if in_maze[cy * cells_w + cx] {
            continue;
        }

        let mut linked = Vec::with_capacity(4);
        if cy > 0 && in_maze[(cy - 1) * cells_w + cx] {
            linked.push((cx, cy - 1));
        }
        if cy + 1 < cells_h && in_maze[(cy + 1) * cells_w + cx] {
            linked.push((cx, cy + 1));
        }
        if cx > 0 && in_maze[cy * cells_w + cx - 1] {
            linked.push((cx - 1, cy));
        }
        if cx + 1 < cells_w && in_maze[cy * cells_w + cx + 1] {
            linked.push((cx + 1, cy));
        }
        let Some(&(nx, ny)) = linked.choose(rng) else {
            continue;
        };

        in_maze[cy * cells_w + cx] = true;
        let here = to_map(cx, cy);
        let there = to_map(nx, ny);
        passages.on(here);
        passages.on(Coord::new((here.x + there.x) / 2, (here.y + there.y) / 2));
        add_frontier(cx, cy, &in_maze, &mut frontier);
    }

    passages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Adjacency;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_maze_is_a_spanning_tree() {
        let maze = maze_pattern(31, 21, &mut StdRng::seed_from_u64(8));
        let cells = 15 * 10;
        // one cell per lattice point plus one link per tree edge
        assert_eq!(maze.count(), cells + cells - 1);
        assert_eq!(maze.connected_components(Adjacency::Cardinal).len(), 1);
        assert!(maze.iter().all(|c| c.x > 0 && c.y > 0 && c.x < 30 && c.y < 20));
    }

    #[test]
    fn test_degenerate_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(maze_pattern(2, 10, &mut rng).is_empty());
        assert_eq!(maze_pattern(3, 3, &mut rng).count(), 1);
    }

    #[test]
    fn test_maze_is_deterministic() {
        let a = maze_pattern(25, 25, &mut StdRng::seed_from_u64(77));
        let b = maze_pattern(25, 25, &mut StdRng::seed_from_u64(77));
        assert_eq!(a, b);
    }
}
