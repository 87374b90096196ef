// SPDX-FileCopyrightText: 2026 Roadgrid Contributors
// SPDX-License-Identifier: MIT

//! Hover preview control.
//!
//! Pointer hover arrives far faster than the engine can answer, so this layer
//! debounces hover targets, caches results per (start, end) pair, cancels
//! superseded work, and suppresses stale responses. [`state`] owns the
//! per-cell exploration state machine and its metrics; [`preview`] drives the
//! orchestrator and publishes the live preview.

pub mod preview;
pub mod state;

pub use preview::{HoverPreview, PathPreview, DEFAULT_DEBOUNCE};
pub use state::{CellStateTracker, HoverCellState, QueueMetrics, SubscriptionId};
