// SPDX-FileCopyrightText: 2026 Roadgrid Contributors
// SPDX-License-Identifier: MIT

//! Hamiltonian path search over rectangular grids.
//!
//! [`search`] runs a backtracking depth-first search for a path that visits
//! every cell exactly once between two endpoints. Candidate moves are ranked
//! by a Warnsdorff-style heuristic (fewest onward options first, edge and
//! corner cells preferred, a distance-to-target pull that intensifies as the
//! unvisited region shrinks) and pruned with a connectivity flood fill so the
//! search never descends into a branch that strands the end cell or splits
//! the unvisited region.
//!
//! The engine is stateless and reentrant: every call allocates its own
//! working set, and identical arguments yield identical results. The
//! iteration budget is a safety valve, not a completeness guarantee.
//! Exhausting it is a normal `found = false` return, conclusive only when
//! the parity pre-check rejected the pair outright.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::geometry::{parity_compatible, Direction, GridSize, Point};

/// Outcome of one search call.
///
/// `iterations` counts node visits actually performed and never exceeds the
/// supplied budget; it exists for diagnostics and budget tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub found: bool,
    pub path: Vec<Point>,
    pub iterations: u64,
}

/// Caller errors. Malformed endpoints are reported, never silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    OutOfBounds { point: Point, size: GridSize },
    StartEqualsEnd { point: Point },
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { point, size } => write!(
                f,
                "cell ({}, {}) is outside the {}x{} grid",
                point.row, point.col, size.rows, size.cols
            ),
            Self::StartEqualsEnd { point } => write!(
                f,
                "start and end are both ({}, {}); endpoints must be distinct",
                point.row, point.col
            ),
        }
    }
}

impl std::error::Error for SearchError {}

/// Default iteration ceiling scaled to grid area.
///
/// Small grids stay cheap to reject; larger grids get progressively more
/// budget to offset the combinatorial blow-up.
pub fn default_iteration_budget(size: GridSize) -> u64 {
    match size.total_cells() {
        0..=100 => 500_000,
        101..=400 => 2_000_000,
        _ => 10_000_000,
    }
}

/// Search for a Hamiltonian path from `start` to `end`.
///
/// Returns a caller error when an endpoint is out of bounds or the endpoints
/// coincide. Parity-incompatible pairs return `found = false` with
/// `iterations = 0`: an exact rejection, no search performed.
pub fn search(
    start: Point,
    end: Point,
    size: GridSize,
    max_iterations: u64,
) -> Result<SearchResult, SearchError> {
    for point in [start, end] {
        if !size.contains(point) {
            return Err(SearchError::OutOfBounds { point, size });
        }
    }
    if start == end {
        return Err(SearchError::StartEqualsEnd { point: start });
    }

    if !parity_compatible(start, end, size) {
        return Ok(SearchResult { found: false, path: Vec::new(), iterations: 0 });
    }

    let mut searcher = Searcher::new(start, end, size, max_iterations);
    let found = searcher.descend(start);
    Ok(SearchResult {
        found,
        path: if found { searcher.path } else { Vec::new() },
        iterations: searcher.iterations,
    })
}

/// One bit per cell, row-major. Allocated per search call and mutated in
/// lockstep with the path stack.
#[derive(Debug)]
struct VisitedSet {
    bits: Vec<u64>,
}

impl VisitedSet {
    fn new(cells: usize) -> Self {
        Self { bits: vec![0; (cells + 63) / 64] }
    }

    fn insert(&mut self, index: usize) {
        self.bits[index / 64] |= 1 << (index % 64);
    }

    fn remove(&mut self, index: usize) {
        self.bits[index / 64] &= !(1 << (index % 64));
    }

    fn contains(&self, index: usize) -> bool {
        self.bits[index / 64] & (1 << (index % 64)) != 0
    }
}

struct Searcher {
    size: GridSize,
    end: Point,
    total_cells: usize,
    max_iterations: u64,
    iterations: u64,
    visited: VisitedSet,
    path: Vec<Point>,
    // flood-fill scratch, reused across pruning checks
    flood_seen: Vec<bool>,
    flood_stack: Vec<Point>,
}

impl Searcher {
    fn new(start: Point, end: Point, size: GridSize, max_iterations: u64) -> Self {
        let total_cells = size.total_cells();
        let mut visited = VisitedSet::new(total_cells);
        visited.insert(size.index_of(start));
        Self {
            size,
            end,
            total_cells,
            max_iterations,
            iterations: 0,
            visited,
            path: vec![start],
            flood_seen: vec![false; total_cells],
            flood_stack: Vec::new(),
        }
    }

    fn descend(&mut self, current: Point) -> bool {
        if self.iterations >= self.max_iterations {
            return false;
        }
        self.iterations += 1;

        if self.path.len() == self.total_cells {
            return current == self.end;
        }

        for candidate in self.ranked_candidates(current) {
            let index = self.size.index_of(candidate);
            self.visited.insert(index);
            self.path.push(candidate);

            let viable = candidate == self.end || self.remaining_reachable(candidate);
            if viable && self.descend(candidate) {
                return true;
            }

            self.path.pop();
            self.visited.remove(index);

            if self.iterations >= self.max_iterations {
                return false;
            }
        }
        false
    }

    /// Unvisited neighbors of `current`, most promising first.
    ///
    /// The end cell is only ever offered as the final step; entering it early
    /// can never complete a path.
    fn ranked_candidates(&self, current: Point) -> SmallVec<[Point; 4]> {
        let remaining = self.total_cells - self.path.len();
        let mut scored: SmallVec<[(i64, Point); 4]> = SmallVec::new();

        for direction in Direction::ALL {
            let next = current.step(direction);
            if !self.size.contains(next) || self.visited.contains(self.size.index_of(next)) {
                continue;
            }
            if next == self.end {
                if remaining == 1 {
                    scored.push((i64::MIN, next));
                }
                continue;
            }
            scored.push((self.move_score(next, remaining), next));
        }

        // stable sort: ties fall back to the fixed direction order, which
        // keeps the search deterministic
        scored.sort_by_key(|&(score, _)| score);
        scored.into_iter().map(|(_, point)| point).collect()
    }

    /// Lower is better. Combines the Warnsdorff onward-option count, a
    /// preference for structurally constrained edge/corner cells, and a
    /// Manhattan pull toward the end that gets heavier once few cells remain.
    fn move_score(&self, candidate: Point, remaining: usize) -> i64 {
        let onward = self.unvisited_degree(candidate) as i64;
        let structural = self.structural_degree(candidate) as i64;
        let distance = candidate.manhattan_distance(self.end) as i64;
        let urgency = if remaining * 4 < self.total_cells { 8 } else { 1 };
        onward * 16 + (structural - 2) * 4 + distance * urgency
    }

    fn unvisited_degree(&self, point: Point) -> u32 {
        let mut degree = 0;
        for direction in Direction::ALL {
            let next = point.step(direction);
            if self.size.contains(next) && !self.visited.contains(self.size.index_of(next)) {
                degree += 1;
            }
        }
        degree
    }

    fn structural_degree(&self, point: Point) -> u32 {
        Direction::ALL
            .iter()
            .filter(|direction| self.size.contains(point.step(**direction)))
            .count() as u32
    }

    /// Connectivity pruning, evaluated with `candidate` already marked
    /// visited: flood from the end cell through unvisited cells and require
    /// that every unvisited cell is reached and that the candidate still
    /// touches the surviving region. Any move failing this can never be
    /// completed and is discarded before descending.
    fn remaining_reachable(&mut self, candidate: Point) -> bool {
        let unvisited = self.total_cells - self.path.len();
        if unvisited == 0 {
            return true;
        }

        self.flood_seen.fill(false);
        self.flood_stack.clear();
        self.flood_stack.push(self.end);
        self.flood_seen[self.size.index_of(self.end)] = true;
        let mut reached = 1usize;

        while let Some(point) = self.flood_stack.pop() {
            for direction in Direction::ALL {
                let next = point.step(direction);
                if !self.size.contains(next) {
                    continue;
                }
                let index = self.size.index_of(next);
                if self.visited.contains(index) || self.flood_seen[index] {
                    continue;
                }
                self.flood_seen[index] = true;
                reached += 1;
                self.flood_stack.push(next);
            }
        }

        if reached != unvisited {
            return false;
        }

        Direction::ALL.iter().any(|direction| {
            let next = candidate.step(*direction);
            self.size.contains(next) && !self.visited.contains(self.size.index_of(next))
        })
    }
}
