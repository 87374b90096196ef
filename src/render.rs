// SPDX-FileCopyrightText: 2026 Roadgrid Contributors
// SPDX-License-Identifier: MIT

//! Road rendering of computed paths.
//!
//! [`render`] converts an ordered path into a [`RoadGrid`]: each cell on the
//! path gets the set of directions it connects to, pointing at its path
//! neighbors, so consecutive cells always carry mutual opposite connections.
//! Cells off the path stay empty. Pure function, no state.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Direction, GridSize, Point};

/// Road connections of one path cell. `path_index` is the cell's 0-based
/// position in the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellConnections {
    pub connections: BTreeSet<Direction>,
    pub path_index: usize,
}

/// Per-cell road view of a path, row-major, `None` for cells off the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadGrid {
    size: GridSize,
    cells: Vec<Option<CellConnections>>,
}

impl RoadGrid {
    fn empty(size: GridSize) -> Self {
        Self { size, cells: vec![None; size.total_cells()] }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Connections at a cell, `None` when off the path or out of bounds.
    pub fn get(&self, row: i32, col: i32) -> Option<&CellConnections> {
        let point = Point::new(row, col);
        if !self.size.contains(point) {
            return None;
        }
        self.cells[self.size.index_of(point)].as_ref()
    }

    /// Number of cells on the path.
    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Point, Option<&CellConnections>)> {
        let cols = self.size.cols.max(1);
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let point = Point::new(index as i32 / cols, index as i32 % cols);
            (point, cell.as_ref())
        })
    }
}

/// Caller errors: a malformed path is reported, never silently repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    OutOfBounds { point: Point, size: GridSize },
    NonAdjacentStep { from: Point, to: Point },
    RepeatedPoint { point: Point },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { point, size } => write!(
                f,
                "path cell ({}, {}) is outside the {}x{} grid",
                point.row, point.col, size.rows, size.cols
            ),
            Self::NonAdjacentStep { from, to } => write!(
                f,
                "path step ({}, {}) -> ({}, {}) is not 4-adjacent",
                from.row, from.col, to.row, to.col
            ),
            Self::RepeatedPoint { point } => {
                write!(f, "path visits ({}, {}) more than once", point.row, point.col)
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// Render `path` onto a grid of road connections.
///
/// An empty path yields an all-empty grid, not an error.
pub fn render(path: &[Point], size: GridSize) -> Result<RoadGrid, RenderError> {
    let mut grid = RoadGrid::empty(size);

    for (index, &current) in path.iter().enumerate() {
        if !size.contains(current) {
            return Err(RenderError::OutOfBounds { point: current, size });
        }

        let mut connections = BTreeSet::new();
        if index > 0 {
            connections.insert(direction_towards(current, path[index - 1])?);
        }
        if index + 1 < path.len() {
            connections.insert(direction_towards(current, path[index + 1])?);
        }

        let slot = &mut grid.cells[size.index_of(current)];
        if slot.is_some() {
            return Err(RenderError::RepeatedPoint { point: current });
        }
        *slot = Some(CellConnections { connections, path_index: index });
    }

    Ok(grid)
}

fn direction_towards(from: Point, to: Point) -> Result<Direction, RenderError> {
    match (to.row - from.row, to.col - from.col) {
        (-1, 0) => Ok(Direction::Up),
        (1, 0) => Ok(Direction::Down),
        (0, -1) => Ok(Direction::Left),
        (0, 1) => Ok(Direction::Right),
        _ => Err(RenderError::NonAdjacentStep { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{default_iteration_budget, search};

    #[test]
    fn empty_path_renders_an_empty_grid() {
        let grid = render(&[], GridSize::new(3, 3)).unwrap();
        assert_eq!(grid.occupied_cells(), 0);
        assert!(grid.get(0, 0).is_none());
    }

    #[test]
    fn endpoints_get_one_connection_and_interior_cells_two() {
        let path = [Point::new(0, 0), Point::new(1, 0), Point::new(1, 1)];
        let grid = render(&path, GridSize::new(2, 2)).unwrap();

        let head = grid.get(0, 0).unwrap();
        assert_eq!(head.path_index, 0);
        assert_eq!(head.connections, BTreeSet::from([Direction::Down]));

        let middle = grid.get(1, 0).unwrap();
        assert_eq!(middle.path_index, 1);
        assert_eq!(middle.connections, BTreeSet::from([Direction::Up, Direction::Right]));

        let tail = grid.get(1, 1).unwrap();
        assert_eq!(tail.path_index, 2);
        assert_eq!(tail.connections, BTreeSet::from([Direction::Left]));

        assert!(grid.get(0, 1).is_none());
        assert_eq!(grid.occupied_cells(), 3);
    }

    #[test]
    fn connections_of_a_searched_path_are_mutually_consistent() {
        let size = GridSize::new(3, 3);
        let result =
            search(Point::new(0, 0), Point::new(2, 2), size, default_iteration_budget(size))
                .unwrap();
        assert!(result.found);

        let grid = render(&result.path, size).unwrap();
        assert_eq!(grid.occupied_cells(), result.path.len());

        for (index, point) in result.path.iter().enumerate() {
            let cell = grid.get(point.row, point.col).unwrap();
            assert_eq!(cell.path_index, index);
            for direction in &cell.connections {
                let neighbor = point.step(*direction);
                let other = grid.get(neighbor.row, neighbor.col).unwrap();
                assert!(
                    other.connections.contains(&direction.opposite()),
                    "{neighbor:?} must connect back toward {point:?}"
                );
            }
        }
    }

    #[test]
    fn malformed_paths_are_reported() {
        let size = GridSize::new(2, 2);
        assert_eq!(
            render(&[Point::new(0, 2)], size),
            Err(RenderError::OutOfBounds { point: Point::new(0, 2), size })
        );
        assert_eq!(
            render(&[Point::new(0, 0), Point::new(1, 1)], size),
            Err(RenderError::NonAdjacentStep { from: Point::new(0, 0), to: Point::new(1, 1) })
        );
        assert_eq!(
            render(
                &[Point::new(0, 0), Point::new(0, 1), Point::new(0, 0)],
                size
            ),
            Err(RenderError::RepeatedPoint { point: Point::new(0, 0) })
        );
    }

    #[test]
    fn connection_names_match_the_wire_format() {
        let path = [Point::new(0, 0), Point::new(0, 1)];
        let grid = render(&path, GridSize::new(1, 2)).unwrap();
        let value = serde_json::to_value(grid.get(0, 0).unwrap()).unwrap();
        assert_eq!(value["connections"], serde_json::json!(["right"]));
        assert_eq!(value["path_index"], serde_json::json!(0));
    }
}
