// SPDX-FileCopyrightText: 2026 Roadgrid Contributors
// SPDX-License-Identifier: MIT

//! Background compute orchestration.
//!
//! The orchestrator runs engine and renderer calls on an isolated background
//! context that is reachable only through channels; no shared memory crosses
//! the boundary. Every request carries a monotonically increasing id; exactly
//! one response comes back per request and is matched to its pending entry by
//! that id, never by arrival order. Responses with an unknown id are dropped.
//!
//! [`Orchestrator::initialize`] is idempotent and memoized: concurrent
//! callers share a single in-flight setup. Requests issued before setup
//! completes fail fast with [`OrchestratorError::NotInitialized`] instead of
//! queuing indefinitely.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex, OnceCell};

use crate::geometry::{cell_parity, differing_parity, GridSize, Point};
use crate::render::{render, RoadGrid};
use crate::search::{search, SearchResult};

pub const OP_FIND_PATH: &str = "find-path";
pub const OP_RENDER_PATH: &str = "render-path";
pub const OP_CELL_PARITY: &str = "cell-parity";
pub const OP_DIFFERING_PARITY: &str = "differing-parity";

/// Message sent to the background context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub operation: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Result,
    Error,
}

/// Message received from the background context. `payload` is the return
/// value for `Result` responses and the error message for `Error` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub kind: ResponseKind,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindPathParams {
    pub start: Point,
    pub end: Point,
    pub size: GridSize,
    pub max_iterations: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderPathParams {
    pub path: Vec<Point>,
    pub size: GridSize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellParityParams {
    pub row: i32,
    pub col: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferingParityParams {
    pub a: Point,
    pub b: Point,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// A request was issued before `initialize` completed.
    NotInitialized,
    /// The orchestrator has shut down; the request was rejected or its
    /// pending entry cleared.
    ShutDown,
    /// The background context answered with an error response.
    Remote(String),
    /// A payload could not be encoded or a response could not be decoded.
    Payload(String),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "orchestrator is not initialized"),
            Self::ShutDown => write!(f, "orchestrator has shut down"),
            Self::Remote(message) => write!(f, "compute error: {message}"),
            Self::Payload(message) => write!(f, "payload error: {message}"),
        }
    }
}

impl std::error::Error for OrchestratorError {}

/// Operation tags understood by the background context. Unrecognized tags on
/// the wire fail only the request that carried them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    FindPath,
    RenderPath,
    CellParity,
    DifferingParity,
}

impl Operation {
    fn parse(name: &str) -> Option<Self> {
        match name {
            OP_FIND_PATH => Some(Self::FindPath),
            OP_RENDER_PATH => Some(Self::RenderPath),
            OP_CELL_PARITY => Some(Self::CellParity),
            OP_DIFFERING_PARITY => Some(Self::DifferingParity),
            _ => None,
        }
    }
}

enum WorkerMessage {
    Request(Request),
    Shutdown,
}

type PendingSender = oneshot::Sender<Result<Value, OrchestratorError>>;

#[derive(Default)]
struct PendingTable {
    entries: HashMap<u64, PendingSender>,
    shut_down: bool,
}

struct Channels {
    request_tx: mpsc::UnboundedSender<WorkerMessage>,
}

/// Handle to the background compute context.
pub struct Orchestrator {
    next_id: AtomicU64,
    pending: Arc<Mutex<PendingTable>>,
    channels: OnceCell<Channels>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create a handle without starting the background context; call
    /// [`Orchestrator::initialize`] before submitting requests.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            pending: Arc::new(Mutex::new(PendingTable::default())),
            channels: OnceCell::new(),
        }
    }

    /// One-time setup of the background context. Idempotent; concurrent
    /// callers share a single in-flight setup.
    pub async fn initialize(&self) {
        self.channels
            .get_or_init(|| async {
                let (request_tx, request_rx) = mpsc::unbounded_channel();
                let (response_tx, response_rx) = mpsc::unbounded_channel();

                tokio::task::spawn_blocking(move || run_worker(request_rx, response_tx));
                tokio::spawn(run_dispatcher(response_rx, Arc::clone(&self.pending)));

                debug!("compute context initialized");
                Channels { request_tx }
            })
            .await;
    }

    pub fn is_initialized(&self) -> bool {
        self.channels.get().is_some()
    }

    /// Submit one operation and await its correlated response.
    ///
    /// The operation tag travels as data; an unrecognized tag fails this
    /// request with a `Remote` error without affecting other in-flight work.
    pub async fn submit(&self, operation: &str, payload: Value) -> Result<Value, OrchestratorError> {
        let channels = self.channels.get().ok_or(OrchestratorError::NotInitialized)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if pending.shut_down {
                return Err(OrchestratorError::ShutDown);
            }
            pending.entries.insert(id, tx);
        }

        trace!("submitting request {id} ({operation})");
        let request = Request { id, operation: operation.to_string(), payload };
        if channels.request_tx.send(WorkerMessage::Request(request)).is_err() {
            self.pending.lock().await.entries.remove(&id);
            return Err(OrchestratorError::ShutDown);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(OrchestratorError::ShutDown),
        }
    }

    pub async fn find_path(
        &self,
        start: Point,
        end: Point,
        size: GridSize,
        max_iterations: u64,
    ) -> Result<SearchResult, OrchestratorError> {
        let params = FindPathParams { start, end, size, max_iterations };
        let value = self.submit(OP_FIND_PATH, encode(&params)?).await?;
        decode(value)
    }

    pub async fn render_path(
        &self,
        path: &[Point],
        size: GridSize,
    ) -> Result<RoadGrid, OrchestratorError> {
        let params = RenderPathParams { path: path.to_vec(), size };
        let value = self.submit(OP_RENDER_PATH, encode(&params)?).await?;
        decode(value)
    }

    pub async fn cell_parity(&self, row: i32, col: i32) -> Result<i32, OrchestratorError> {
        let value = self.submit(OP_CELL_PARITY, encode(&CellParityParams { row, col })?).await?;
        decode(value)
    }

    pub async fn differing_parity(&self, a: Point, b: Point) -> Result<bool, OrchestratorError> {
        let value = self
            .submit(OP_DIFFERING_PARITY, encode(&DifferingParityParams { a, b })?)
            .await?;
        decode(value)
    }

    /// Stop the background context and reject all pending entries. Requests
    /// submitted afterwards fail with [`OrchestratorError::ShutDown`].
    pub async fn shutdown(&self) {
        let Some(channels) = self.channels.get() else {
            return;
        };

        let mut pending = self.pending.lock().await;
        if pending.shut_down {
            return;
        }
        pending.shut_down = true;
        let _ = channels.request_tx.send(WorkerMessage::Shutdown);
        for (_, tx) in pending.entries.drain() {
            let _ = tx.send(Err(OrchestratorError::ShutDown));
        }
        debug!("compute context shut down");
    }
}

fn encode<T: Serialize>(params: &T) -> Result<Value, OrchestratorError> {
    serde_json::to_value(params).map_err(|err| OrchestratorError::Payload(err.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, OrchestratorError> {
    serde_json::from_value(value).map_err(|err| OrchestratorError::Payload(err.to_string()))
}

/// Background context: a dedicated blocking thread draining the request
/// channel. The engine never suspends mid-computation, so each request runs
/// to completion before the next is picked up.
fn run_worker(
    mut request_rx: mpsc::UnboundedReceiver<WorkerMessage>,
    response_tx: mpsc::UnboundedSender<Response>,
) {
    debug!("compute worker started");
    while let Some(message) = request_rx.blocking_recv() {
        let request = match message {
            WorkerMessage::Request(request) => request,
            WorkerMessage::Shutdown => break,
        };
        let response = handle_request(request);
        if response_tx.send(response).is_err() {
            break;
        }
    }
    debug!("compute worker stopped");
}

fn handle_request(request: Request) -> Response {
    let Request { id, operation, payload } = request;
    let outcome = match Operation::parse(&operation) {
        Some(op) => execute(op, payload),
        None => Err(format!("unknown operation: {operation}")),
    };
    match outcome {
        Ok(value) => Response { id, kind: ResponseKind::Result, payload: value },
        Err(message) => Response { id, kind: ResponseKind::Error, payload: Value::String(message) },
    }
}

fn execute(operation: Operation, payload: Value) -> Result<Value, String> {
    match operation {
        Operation::FindPath => {
            let params: FindPathParams = decode_payload(payload)?;
            let result = search(params.start, params.end, params.size, params.max_iterations)
                .map_err(|err| err.to_string())?;
            encode_result(&result)
        }
        Operation::RenderPath => {
            let params: RenderPathParams = decode_payload(payload)?;
            let grid = render(&params.path, params.size).map_err(|err| err.to_string())?;
            encode_result(&grid)
        }
        Operation::CellParity => {
            let params: CellParityParams = decode_payload(payload)?;
            encode_result(&cell_parity(params.row, params.col))
        }
        Operation::DifferingParity => {
            let params: DifferingParityParams = decode_payload(payload)?;
            encode_result(&differing_parity(params.a, params.b))
        }
    }
}

fn decode_payload<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|err| format!("invalid payload: {err}"))
}

fn encode_result<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|err| err.to_string())
}

/// Resolves pending entries as responses arrive, in whatever order they
/// arrive. Responses without a matching entry are dropped.
async fn run_dispatcher(
    mut response_rx: mpsc::UnboundedReceiver<Response>,
    pending: Arc<Mutex<PendingTable>>,
) {
    while let Some(response) = response_rx.recv().await {
        let sender = pending.lock().await.entries.remove(&response.id);
        let Some(sender) = sender else {
            debug!("dropping response for unknown request id {}", response.id);
            continue;
        };
        let outcome = match response.kind {
            ResponseKind::Result => Ok(response.payload),
            ResponseKind::Error => Err(OrchestratorError::Remote(
                response.payload.as_str().unwrap_or("unspecified compute error").to_string(),
            )),
        };
        let _ = sender.send(outcome);
    }
}

#[cfg(test)]
mod tests;
