//! # Connectivity Checks
//!
//! Breadth-first reachability over regions, used to verify that a dressed
//! dungeon is one connected piece.

use crate::{Adjacency, Coord, Region};
use ::pathfinding::prelude::bfs_reach;

/// Cells of `passable` reachable from `start` under `adjacency`.
pub fn reachable_from(passable: &Region, start: Coord, adjacency: Adjacency) -> Region {
    let mut reached = Region::new(passable.width(), passable.height());
    if !passable.contains(start) {
        return reached;
    }
    let successors = |pos: &Coord| {
        let pos = *pos;
        adjacency
            .directions()
            .iter()
            .map(move |&d| pos.step(d))
            .filter(|n| passable.contains(*n))
            .collect::<Vec<_>>()
    };
    for pos in bfs_reach(start, successors) {
        reached.on(pos);
    }
    reached
}

/// Number of connected pieces `passable` falls into.
pub fn count_components(passable: &Region, adjacency: Adjacency) -> usize {
    let mut remaining = passable.clone();
    let mut components = 0;
    loop {
        let next = remaining.iter().next();
        let Some(start) = next else {
            break;
        };
        let piece = reachable_from(passable, start, adjacency);
        remaining.subtract(&piece);
        components += 1;
    }
    components
}

/// Whether `passable` is a single connected piece (an empty region counts).
pub fn is_connected(passable: &Region, adjacency: Adjacency) -> bool {
    count_components(passable, adjacency) <= 1
}
