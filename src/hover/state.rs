// SPDX-FileCopyrightText: 2026 Roadgrid Contributors
// SPDX-License-Identifier: MIT

//! Per-cell hover exploration state and aggregate metrics.
//!
//! The tracker is the single owner of the state grid: every mutation goes
//! through its methods, and metrics are maintained incrementally on each
//! transition rather than recomputed. Hover coordinates come straight from
//! live pointer positions, so out-of-bounds cells are silent no-ops and this
//! layer never errors.

use std::time::Instant;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::geometry::{GridSize, Point};

/// Exploration status of one cell.
///
/// `Found` and `NotFound` are terminal: only a full reset or an explicit
/// `Start`/`Goal` override can move a cell out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverCellState {
    Idle,
    Pending,
    Processing,
    Found,
    NotFound,
    Start,
    Goal,
}

impl HoverCellState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Found | Self::NotFound)
    }

    fn is_marker(self) -> bool {
        matches!(self, Self::Start | Self::Goal)
    }
}

/// Aggregate counters derived from cell transitions.
///
/// `marker_cells` counts `Start`/`Goal` overrides; marker cells are excluded
/// from `idle_cells`. `avg_processing_ms` is a running average of the
/// pending-to-terminal duration, updated incrementally per completion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct QueueMetrics {
    pub total_cells: usize,
    pub idle_cells: usize,
    pub pending_cells: usize,
    pub processing_cells: usize,
    pub found_cells: usize,
    pub not_found_cells: usize,
    pub marker_cells: usize,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub avg_processing_ms: f64,
}

impl QueueMetrics {
    fn fresh(total_cells: usize) -> Self {
        Self { total_cells, idle_cells: total_cells, ..Self::default() }
    }

    fn bucket(&mut self, state: HoverCellState) -> &mut usize {
        match state {
            HoverCellState::Idle => &mut self.idle_cells,
            HoverCellState::Pending => &mut self.pending_cells,
            HoverCellState::Processing => &mut self.processing_cells,
            HoverCellState::Found => &mut self.found_cells,
            HoverCellState::NotFound => &mut self.not_found_cells,
            HoverCellState::Start | HoverCellState::Goal => &mut self.marker_cells,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type CellObserver = Box<dyn Fn(Point, HoverCellState) + Send>;
type MetricsObserver = Box<dyn Fn(&QueueMetrics) + Send>;

/// Single-owner state grid for hover exploration.
pub struct CellStateTracker {
    size: GridSize,
    states: Vec<HoverCellState>,
    pending_since: Vec<Option<Instant>>,
    metrics: QueueMetrics,
    completed_samples: u64,
    next_subscription: u64,
    cell_observers: Vec<(SubscriptionId, CellObserver)>,
    metrics_observers: Vec<(SubscriptionId, MetricsObserver)>,
}

impl Default for CellStateTracker {
    fn default() -> Self {
        Self::new(GridSize::new(0, 0))
    }
}

impl CellStateTracker {
    pub fn new(size: GridSize) -> Self {
        let total = size.total_cells();
        Self {
            size,
            states: vec![HoverCellState::Idle; total],
            pending_since: vec![None; total],
            metrics: QueueMetrics::fresh(total),
            completed_samples: 0,
            next_subscription: 0,
            cell_observers: Vec::new(),
            metrics_observers: Vec::new(),
        }
    }

    /// Resize the grid, discarding all per-cell state and counters.
    /// Subscriptions survive.
    pub fn set_grid_size(&mut self, rows: i32, cols: i32) {
        self.size = GridSize::new(rows, cols);
        let total = self.size.total_cells();
        self.states = vec![HoverCellState::Idle; total];
        self.pending_since = vec![None; total];
        self.metrics = QueueMetrics::fresh(total);
        self.completed_samples = 0;
        self.notify_metrics();
    }

    /// Reset all cells to idle and zero the counters, keeping the grid size.
    pub fn reset(&mut self) {
        self.states.fill(HoverCellState::Idle);
        self.pending_since.fill(None);
        self.metrics = QueueMetrics::fresh(self.size.total_cells());
        self.completed_samples = 0;
        self.notify_metrics();
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn cell_state(&self, row: i32, col: i32) -> Option<HoverCellState> {
        self.index(row, col).map(|index| self.states[index])
    }

    /// Row-major snapshot of every cell state.
    pub fn all_cell_states(&self) -> &[HoverCellState] {
        &self.states
    }

    pub fn metrics(&self) -> QueueMetrics {
        self.metrics
    }

    /// A query for this cell was requested. Counts toward `total_requests`
    /// even when the cell was already explored; only idle cells actually
    /// move to pending.
    pub fn mark_pending(&mut self, row: i32, col: i32) {
        let Some(index) = self.index(row, col) else { return };
        self.metrics.total_requests += 1;
        if self.states[index] == HoverCellState::Idle {
            self.pending_since[index] = Some(Instant::now());
            self.transition(index, HoverCellState::Pending);
        } else {
            self.notify_metrics();
        }
    }

    /// The query was dispatched to the engine.
    pub fn mark_processing(&mut self, row: i32, col: i32) {
        let Some(index) = self.index(row, col) else { return };
        if self.states[index] == HoverCellState::Pending {
            self.transition(index, HoverCellState::Processing);
        }
    }

    /// Terminal outcome for an in-flight query. No-op unless the cell is
    /// pending or processing; terminal cells are never overwritten.
    pub fn mark_completed(&mut self, row: i32, col: i32, found: bool) {
        let Some(index) = self.index(row, col) else { return };
        if !matches!(self.states[index], HoverCellState::Pending | HoverCellState::Processing) {
            return;
        }
        self.record_processing_sample(index);
        self.transition(index, terminal_state(found));
    }

    /// A cached outcome resolved the query without invoking the engine.
    /// Counts a request and a cache hit; does not overwrite terminal cells.
    pub fn mark_cached(&mut self, row: i32, col: i32, found: bool) {
        let Some(index) = self.index(row, col) else { return };
        self.metrics.total_requests += 1;
        self.metrics.cache_hits += 1;
        let state = self.states[index];
        if state.is_terminal() || state.is_marker() {
            self.notify_metrics();
            return;
        }
        self.record_processing_sample(index);
        self.transition(index, terminal_state(found));
    }

    /// Cancellation: allowed only before the cell reaches a terminal state.
    pub fn mark_idle(&mut self, row: i32, col: i32) {
        let Some(index) = self.index(row, col) else { return };
        if matches!(self.states[index], HoverCellState::Pending | HoverCellState::Processing) {
            self.pending_since[index] = None;
            self.transition(index, HoverCellState::Idle);
        }
    }

    /// Explicit start marker; overrides any state, terminal included.
    pub fn mark_start(&mut self, row: i32, col: i32) {
        self.mark_marker(row, col, HoverCellState::Start);
    }

    /// Explicit goal marker; overrides any state, terminal included.
    pub fn mark_goal(&mut self, row: i32, col: i32) {
        self.mark_marker(row, col, HoverCellState::Goal);
    }

    pub fn subscribe_cells<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: Fn(Point, HoverCellState) + Send + 'static,
    {
        let id = self.next_subscription_id();
        self.cell_observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe_cells(&mut self, id: SubscriptionId) {
        self.cell_observers.retain(|(existing, _)| *existing != id);
    }

    pub fn subscribe_metrics<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: Fn(&QueueMetrics) + Send + 'static,
    {
        let id = self.next_subscription_id();
        self.metrics_observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe_metrics(&mut self, id: SubscriptionId) {
        self.metrics_observers.retain(|(existing, _)| *existing != id);
    }

    fn mark_marker(&mut self, row: i32, col: i32, marker: HoverCellState) {
        let Some(index) = self.index(row, col) else { return };
        self.pending_since[index] = None;
        if self.states[index] != marker {
            self.transition(index, marker);
        }
    }

    fn index(&self, row: i32, col: i32) -> Option<usize> {
        let point = Point::new(row, col);
        self.size.contains(point).then(|| self.size.index_of(point))
    }

    fn transition(&mut self, index: usize, to: HoverCellState) {
        let from = self.states[index];
        *self.metrics.bucket(from) -= 1;
        *self.metrics.bucket(to) += 1;
        self.states[index] = to;

        let point = self.point_of(index);
        trace!("cell ({}, {}) {:?} -> {:?}", point.row, point.col, from, to);
        for (_, observer) in &self.cell_observers {
            observer(point, to);
        }
        self.notify_metrics();
    }

    fn record_processing_sample(&mut self, index: usize) {
        let Some(since) = self.pending_since[index].take() else { return };
        let elapsed_ms = since.elapsed().as_secs_f64() * 1_000.0;
        self.completed_samples += 1;
        self.metrics.avg_processing_ms +=
            (elapsed_ms - self.metrics.avg_processing_ms) / self.completed_samples as f64;
    }

    fn notify_metrics(&self) {
        for (_, observer) in &self.metrics_observers {
            observer(&self.metrics);
        }
    }

    fn point_of(&self, index: usize) -> Point {
        let cols = self.size.cols.max(1);
        Point::new(index as i32 / cols, index as i32 % cols)
    }

    fn next_subscription_id(&mut self) -> SubscriptionId {
        self.next_subscription += 1;
        SubscriptionId(self.next_subscription)
    }
}

fn terminal_state(found: bool) -> HoverCellState {
    if found {
        HoverCellState::Found
    } else {
        HoverCellState::NotFound
    }
}
