// SPDX-FileCopyrightText: 2026 Roadgrid Contributors
// SPDX-License-Identifier: MIT

//! Debounced hover preview driving the orchestrator.
//!
//! Every hover starts a cancellable delayed task and unconditionally cancels
//! the previous one, so only the most recent target is ever dispatched. A
//! cache keyed by the ordered (start, end) pair resolves repeats without
//! touching the engine. When an engine result arrives, the captured target is
//! compared against the live one; a stale result is cached for later but not
//! applied to the displayed preview. Cache and cell states are invalidated
//! wholesale on grid resize or start change, since cached paths are only
//! valid for a fixed (size, start) context; results still in flight at that
//! moment belong to the old context and are discarded on arrival.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::geometry::{GridSize, Point};
use crate::orchestrator::Orchestrator;
use crate::render::RoadGrid;
use crate::search::{default_iteration_budget, SearchResult};

use super::state::{CellStateTracker, HoverCellState, QueueMetrics, SubscriptionId};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// The preview currently offered to the caller, published through a watch
/// channel. `roads` is present when a full path was found.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPreview {
    pub start: Point,
    pub end: Point,
    pub found: bool,
    pub path: Vec<Point>,
    pub roads: Option<RoadGrid>,
}

#[derive(Clone)]
struct CachedQuery {
    result: SearchResult,
    roads: Option<RoadGrid>,
}

struct PreviewState {
    size: GridSize,
    start: Option<Point>,
    live_target: Option<Point>,
    max_iterations: u64,
    cache: HashMap<(Point, Point), CachedQuery>,
    tracker: CellStateTracker,
    debounce_task: Option<JoinHandle<()>>,
    /// Bumped on every wholesale invalidation (resize, start change, reset).
    /// In-flight queries carry the epoch they were dispatched under and are
    /// discarded entirely when it no longer matches, so a result computed for
    /// a previous grid can never repopulate a freshly cleared cache.
    epoch: u64,
}

impl PreviewState {
    fn supersede_debounce(&mut self) {
        if let Some(task) = self.debounce_task.take() {
            task.abort();
        }
    }
}

/// Hover preview controller. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct HoverPreview {
    orchestrator: Arc<Orchestrator>,
    state: Arc<Mutex<PreviewState>>,
    preview: Arc<watch::Sender<Option<PathPreview>>>,
    debounce: Duration,
}

impl HoverPreview {
    pub fn new(orchestrator: Arc<Orchestrator>, size: GridSize) -> Self {
        Self::with_debounce(orchestrator, size, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(
        orchestrator: Arc<Orchestrator>,
        size: GridSize,
        debounce: Duration,
    ) -> Self {
        let (preview_tx, _preview_rx) = watch::channel(None);
        Self {
            orchestrator,
            state: Arc::new(Mutex::new(PreviewState {
                size,
                start: None,
                live_target: None,
                max_iterations: default_iteration_budget(size),
                cache: HashMap::new(),
                tracker: CellStateTracker::new(size),
                debounce_task: None,
                epoch: 0,
            })),
            preview: Arc::new(preview_tx),
            debounce,
        }
    }

    /// Receiver for preview updates; `None` means no preview is displayed.
    pub fn subscribe(&self) -> watch::Receiver<Option<PathPreview>> {
        self.preview.subscribe()
    }

    /// Resize the grid, invalidating the cache and all per-cell state.
    pub async fn set_grid_size(&self, rows: i32, cols: i32) {
        let mut state = self.state.lock().await;
        state.supersede_debounce();
        state.size = GridSize::new(rows, cols);
        state.max_iterations = default_iteration_budget(state.size);
        state.start = None;
        state.live_target = None;
        state.cache.clear();
        state.epoch += 1;
        state.tracker.set_grid_size(rows, cols);
        drop(state);
        self.preview.send_replace(None);
    }

    /// Fix the path start. Cached paths are only valid for one start, so the
    /// cache and cell states are invalidated. Out-of-bounds points are
    /// silently ignored.
    pub async fn set_start(&self, start: Point) {
        let mut state = self.state.lock().await;
        if !state.size.contains(start) {
            return;
        }
        state.supersede_debounce();
        state.start = Some(start);
        state.live_target = None;
        state.cache.clear();
        state.epoch += 1;
        state.tracker.reset();
        state.tracker.mark_start(start.row, start.col);
        drop(state);
        self.preview.send_replace(None);
    }

    /// Mark an explicit goal cell, independent of any search outcome.
    pub async fn set_goal(&self, goal: Point) {
        let mut state = self.state.lock().await;
        state.tracker.mark_goal(goal.row, goal.col);
    }

    /// The pointer moved onto `target`. Buffers the query behind the debounce
    /// window; a later hover supersedes it. No-op while no start is set, and
    /// for out-of-bounds targets or the start cell itself.
    pub async fn hover(&self, target: Point) {
        let mut state = self.state.lock().await;
        let Some(start) = state.start else {
            trace!("hover ignored, no start set");
            return;
        };
        if !state.size.contains(target) || target == start {
            return;
        }

        state.supersede_debounce();
        if let Some(previous) = state.live_target.replace(target) {
            if previous != target {
                state.tracker.mark_idle(previous.row, previous.col);
            }
        }
        state.tracker.mark_pending(target.row, target.col);

        let controller = self.clone();
        let debounce = self.debounce;
        state.debounce_task = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // once dispatched, work cannot be stopped; its result is cached
            // and suppressed on completion if the target moved on
            tokio::spawn(async move {
                controller.dispatch(start, target).await;
            });
        }));
    }

    /// The pointer left the grid: cancel the debounce timer and clear the
    /// displayed preview immediately.
    pub async fn leave(&self) {
        let mut state = self.state.lock().await;
        state.supersede_debounce();
        if let Some(previous) = state.live_target.take() {
            state.tracker.mark_idle(previous.row, previous.col);
        }
        drop(state);
        self.preview.send_replace(None);
    }

    /// Full reset: clears start, cache, preview, and all cell state.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.supersede_debounce();
        state.start = None;
        state.live_target = None;
        state.cache.clear();
        state.epoch += 1;
        state.tracker.reset();
        drop(state);
        self.preview.send_replace(None);
    }

    pub async fn metrics(&self) -> QueueMetrics {
        self.state.lock().await.tracker.metrics()
    }

    pub async fn cell_state(&self, row: i32, col: i32) -> Option<HoverCellState> {
        self.state.lock().await.tracker.cell_state(row, col)
    }

    pub async fn all_cell_states(&self) -> Vec<HoverCellState> {
        self.state.lock().await.tracker.all_cell_states().to_vec()
    }

    pub async fn subscribe_cell_changes<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(Point, HoverCellState) + Send + 'static,
    {
        self.state.lock().await.tracker.subscribe_cells(observer)
    }

    pub async fn unsubscribe_cell_changes(&self, id: SubscriptionId) {
        self.state.lock().await.tracker.unsubscribe_cells(id);
    }

    pub async fn subscribe_metrics<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&QueueMetrics) + Send + 'static,
    {
        self.state.lock().await.tracker.subscribe_metrics(observer)
    }

    pub async fn unsubscribe_metrics(&self, id: SubscriptionId) {
        self.state.lock().await.tracker.unsubscribe_metrics(id);
    }

    /// Runs after the debounce window. Re-validates the captured target, then
    /// answers from cache or dispatches to the engine through the
    /// orchestrator.
    async fn dispatch(&self, start: Point, target: Point) {
        let (size, max_iterations, epoch) = {
            let mut state = self.state.lock().await;
            if state.start != Some(start) || state.live_target != Some(target) {
                return;
            }
            if let Some(cached) = state.cache.get(&(start, target)).cloned() {
                debug!(
                    "cache hit for ({}, {}) -> ({}, {})",
                    start.row, start.col, target.row, target.col
                );
                state.tracker.mark_cached(target.row, target.col, cached.result.found);
                drop(state);
                self.publish(start, target, &cached);
                return;
            }
            state.tracker.mark_processing(target.row, target.col);
            (state.size, state.max_iterations, state.epoch)
        };

        // engine call happens outside the lock; the computation cannot be
        // stopped once dispatched, only its application can
        let result = match self.orchestrator.find_path(start, target, size, max_iterations).await {
            Ok(result) => result,
            Err(err) => {
                debug!("hover query failed: {err}");
                let mut state = self.state.lock().await;
                if state.epoch == epoch && state.live_target == Some(target) {
                    state.tracker.mark_idle(target.row, target.col);
                }
                return;
            }
        };

        let roads = if result.found {
            match self.orchestrator.render_path(&result.path, size).await {
                Ok(grid) => Some(grid),
                Err(err) => {
                    debug!("road rendering failed: {err}");
                    None
                }
            }
        } else {
            None
        };

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            // the grid or start changed mid-flight; the result belongs to an
            // invalidated context and must not repopulate the cache
            trace!(
                "discarding result from a superseded epoch for ({}, {}) -> ({}, {})",
                start.row,
                start.col,
                target.row,
                target.col
            );
            return;
        }
        let cached = CachedQuery { result, roads };
        state.cache.insert((start, target), cached.clone());
        state.tracker.mark_completed(target.row, target.col, cached.result.found);

        // stale-response suppression: the result is cached above for future
        // use, but only applied if the hovered target has not changed
        if state.start != Some(start) || state.live_target != Some(target) {
            trace!(
                "suppressing stale result for ({}, {}) -> ({}, {})",
                start.row,
                start.col,
                target.row,
                target.col
            );
            return;
        }
        drop(state);
        self.publish(start, target, &cached);
    }

    fn publish(&self, start: Point, end: Point, cached: &CachedQuery) {
        self.preview.send_replace(Some(PathPreview {
            start,
            end,
            found: cached.result.found,
            path: cached.result.path.clone(),
            roads: cached.roads.clone(),
        }));
    }
}
