// SPDX-FileCopyrightText: 2026 Roadgrid Contributors
// SPDX-License-Identifier: MIT

//! Hamiltonian road paths on rectangular grids.
//!
//! The crate computes a path that visits every cell of a rectangular grid
//! exactly once between a chosen start and end cell, and renders it as
//! connected road tiles. Layers, leaves first:
//!
//! - [`geometry`]: coordinates, parity, adjacency. No state.
//! - [`search`]: the backtracking Hamiltonian engine with move ordering,
//!   connectivity pruning, and an iteration budget.
//! - [`render`]: ordered path to per-cell road connections.
//! - [`orchestrator`]: runs engine/renderer calls on a background context
//!   reachable only through id-correlated request/response messages.
//! - [`hover`]: debounced, cached hover previews with per-cell exploration
//!   state and metrics.

pub mod geometry;
pub mod hover;
pub mod orchestrator;
pub mod render;
pub mod search;

pub use geometry::{cell_parity, differing_parity, Direction, GridSize, Point};
pub use render::{render, CellConnections, RenderError, RoadGrid};
pub use search::{default_iteration_budget, search, SearchError, SearchResult};
