//! A* pathfinding over the hex grid.
//!
//! Steps between adjacent hexes cost 1 and the heuristic is hex distance, so
//! returned paths are shortest paths. The grid is unbounded; the search is
//! confined to a disk around the start that contains the goal, every obstacle
//! and a free ring beyond them, which keeps "no path" searches finite.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::hex::HexCoord;

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    hex: HexCoord,
    /// f_score = g_score + heuristic
    f_score: u32,
    /// Heuristic alone; lower is closer to the goal.
    h_score: u32,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so every comparison is reversed.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.h_score.cmp(&self.h_score))
            .then_with(|| other.hex.cmp(&self.hex))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a shortest path from `start` to `goal` avoiding `obstacles`.
///
/// Returns the hexes from start to goal inclusive. The result is empty when
/// either endpoint is an obstacle or the goal is unreachable. Ties between
/// equally good frontier nodes are broken by heuristic, then by `(q, r)`, so
/// the same inputs always yield the same path.
#[must_use]
pub fn find_path(start: HexCoord, goal: HexCoord, obstacles: &HashSet<HexCoord>) -> Vec<HexCoord> {
    if obstacles.contains(&start) || obstacles.contains(&goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let bound = obstacles
        .iter()
        .map(|o| start.distance(*o))
        .fold(start.distance(goal), u32::max)
        .saturating_add(2);

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<HexCoord, HexCoord> = HashMap::new();
    let mut g_score: HashMap<HexCoord, u32> = HashMap::new();

    let start_h = start.distance(goal);
    g_score.insert(start, 0);
    open_set.push(AStarNode {
        hex: start,
        f_score: start_h,
        h_score: start_h,
    });

    while let Some(current) = open_set.pop() {
        if current.hex == goal {
            return reconstruct_path(&came_from, goal);
        }

        let current_g = g_score.get(&current.hex).copied().unwrap_or(u32::MAX);
        // Stale heap entry superseded by a cheaper route.
        if current.f_score > current_g.saturating_add(current.h_score) {
            continue;
        }

        for neighbor in current.hex.neighbors() {
            if obstacles.contains(&neighbor) || start.distance(neighbor) > bound {
                continue;
            }

            let tentative_g = current_g.saturating_add(1);
            let neighbor_g = g_score.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.hex);
                g_score.insert(neighbor, tentative_g);

                let h = neighbor.distance(goal);
                open_set.push(AStarNode {
                    hex: neighbor,
                    f_score: tentative_g.saturating_add(h),
                    h_score: h,
                });
            }
        }
    }

    Vec::new()
}

/// Reconstruct path from came_from map.
fn reconstruct_path(came_from: &HashMap<HexCoord, HexCoord>, goal: HexCoord) -> Vec<HexCoord> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}
