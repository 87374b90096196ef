// SPDX-FileCopyrightText: 2026 Roadgrid Contributors
// SPDX-License-Identifier: MIT

//! Grid geometry primitives.
//!
//! Pure coordinate, parity, and adjacency helpers shared by the engine,
//! renderer, and hover layers. Everything here is a value type; nothing
//! holds state between calls.

use serde::{Deserialize, Serialize};

/// A cell coordinate, 0-indexed from the top-left corner.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Point {
    pub row: i32,
    pub col: i32,
}

impl Point {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The neighboring coordinate one step in `direction`. May be out of
    /// bounds; callers check with [`GridSize::contains`].
    pub fn step(self, direction: Direction) -> Self {
        let (dr, dc) = direction.offset();
        Self { row: self.row + dr, col: self.col + dc }
    }

    pub fn manhattan_distance(self, other: Point) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }
}

/// Grid bounds. Degenerate sizes (a dimension below 1) are representable and
/// simply contain no cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: i32,
    pub cols: i32,
}

impl GridSize {
    pub fn new(rows: i32, cols: i32) -> Self {
        Self { rows, cols }
    }

    pub fn total_cells(self) -> usize {
        (self.rows.max(0) as usize) * (self.cols.max(0) as usize)
    }

    pub fn contains(self, point: Point) -> bool {
        point.row >= 0 && point.row < self.rows && point.col >= 0 && point.col < self.cols
    }

    /// Row-major cell index. Callers must check [`GridSize::contains`] first.
    pub fn index_of(self, point: Point) -> usize {
        point.row as usize * self.cols as usize + point.col as usize
    }
}

/// The four road connection directions.
///
/// `ALL` keeps the fixed up/down/left/right order; candidate enumeration in
/// the search engine ties its determinism to this order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] =
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Checkerboard parity of a coordinate, 0 or 1.
pub fn cell_parity(row: i32, col: i32) -> i32 {
    (row + col).rem_euclid(2)
}

pub fn differing_parity(a: Point, b: Point) -> bool {
    cell_parity(a.row, a.col) != cell_parity(b.row, b.col)
}

/// Exact feasibility rule for Hamiltonian endpoints on a rectangular grid.
///
/// A full path alternates checkerboard colors, so with an even cell count the
/// endpoints must differ in parity and with an odd cell count they must
/// match. Incompatible pairs can be rejected without searching.
pub fn parity_compatible(start: Point, end: Point, size: GridSize) -> bool {
    if size.total_cells() % 2 == 0 {
        differing_parity(start, end)
    } else {
        !differing_parity(start, end)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0, 0)]
    #[case(0, 1, 1)]
    #[case(1, 0, 1)]
    #[case(1, 1, 0)]
    #[case(-1, 0, 1)]
    fn parity_checkerboard(#[case] row: i32, #[case] col: i32, #[case] expected: i32) {
        assert_eq!(cell_parity(row, col), expected);
    }

    #[test]
    fn differing_parity_is_symmetric() {
        let a = Point::new(0, 0);
        let b = Point::new(2, 1);
        assert!(differing_parity(a, b));
        assert!(differing_parity(b, a));
        assert!(!differing_parity(a, Point::new(1, 1)));
    }

    #[rstest]
    // even cell count: endpoints must differ in parity
    #[case(2, 2, Point::new(0, 0), Point::new(0, 1), true)]
    #[case(2, 2, Point::new(0, 0), Point::new(1, 1), false)]
    // odd cell count: endpoints must match in parity
    #[case(3, 3, Point::new(0, 0), Point::new(2, 2), true)]
    #[case(3, 3, Point::new(0, 0), Point::new(0, 1), false)]
    fn parity_compatibility_rule(
        #[case] rows: i32,
        #[case] cols: i32,
        #[case] start: Point,
        #[case] end: Point,
        #[case] expected: bool,
    ) {
        assert_eq!(parity_compatible(start, end, GridSize::new(rows, cols)), expected);
    }

    #[test]
    fn step_and_opposite_round_trip() {
        let origin = Point::new(3, 4);
        for direction in Direction::ALL {
            assert_eq!(origin.step(direction).step(direction.opposite()), origin);
        }
    }

    #[test]
    fn grid_size_bounds_and_indexing() {
        let size = GridSize::new(3, 5);
        assert_eq!(size.total_cells(), 15);
        assert!(size.contains(Point::new(2, 4)));
        assert!(!size.contains(Point::new(3, 0)));
        assert!(!size.contains(Point::new(0, -1)));
        assert_eq!(size.index_of(Point::new(2, 4)), 14);
        assert_eq!(GridSize::new(0, 5).total_cells(), 0);
        assert_eq!(GridSize::new(-2, 5).total_cells(), 0);
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Up).unwrap(), "\"up\"");
        assert_eq!(
            serde_json::from_str::<Direction>("\"right\"").unwrap(),
            Direction::Right
        );
    }
}
