// SPDX-FileCopyrightText: 2026 Roadgrid Contributors
// SPDX-License-Identifier: MIT

use serde_json::json;

use super::{Orchestrator, OrchestratorError, OP_CELL_PARITY};
use crate::geometry::{GridSize, Point};
use crate::search::default_iteration_budget;

#[tokio::test]
async fn requests_before_initialization_fail_fast() {
    let orchestrator = Orchestrator::new();
    let result = orchestrator.submit(OP_CELL_PARITY, json!({"row": 0, "col": 0})).await;
    assert_eq!(result, Err(OrchestratorError::NotInitialized));
}

#[tokio::test]
async fn initialization_is_idempotent() {
    let orchestrator = Orchestrator::new();
    orchestrator.initialize().await;
    orchestrator.initialize().await;
    assert!(orchestrator.is_initialized());
    assert_eq!(orchestrator.cell_parity(1, 2).await, Ok(1));
}

#[tokio::test]
async fn concurrent_initialization_shares_one_setup() {
    let orchestrator = std::sync::Arc::new(Orchestrator::new());
    let a = std::sync::Arc::clone(&orchestrator);
    let b = std::sync::Arc::clone(&orchestrator);
    tokio::join!(a.initialize(), b.initialize());
    assert_eq!(orchestrator.differing_parity(Point::new(0, 0), Point::new(0, 1)).await, Ok(true));
}

#[tokio::test]
async fn find_path_matches_the_synchronous_engine() {
    let orchestrator = Orchestrator::new();
    orchestrator.initialize().await;

    let size = GridSize::new(3, 3);
    let budget = default_iteration_budget(size);
    let via_orchestrator = orchestrator
        .find_path(Point::new(0, 0), Point::new(2, 2), size, budget)
        .await
        .unwrap();
    let direct = crate::search::search(Point::new(0, 0), Point::new(2, 2), size, budget).unwrap();

    assert_eq!(via_orchestrator, direct);
    assert!(via_orchestrator.found);
    assert_eq!(via_orchestrator.path.len(), 9);
}

#[tokio::test]
async fn render_path_round_trips_through_the_worker() {
    let orchestrator = Orchestrator::new();
    orchestrator.initialize().await;

    let path = [Point::new(0, 0), Point::new(0, 1), Point::new(1, 1), Point::new(1, 0)];
    let grid = orchestrator.render_path(&path, GridSize::new(2, 2)).await.unwrap();
    assert_eq!(grid.occupied_cells(), 4);
    assert_eq!(grid.get(0, 0).unwrap().path_index, 0);
    assert_eq!(grid.get(1, 0).unwrap().path_index, 3);
}

#[tokio::test]
async fn unknown_operations_fail_only_their_own_request() {
    let orchestrator = Orchestrator::new();
    orchestrator.initialize().await;

    let unknown = orchestrator.submit("grow-roads", json!({})).await;
    assert_eq!(
        unknown,
        Err(OrchestratorError::Remote("unknown operation: grow-roads".to_string()))
    );

    // the background context keeps serving other requests
    assert_eq!(orchestrator.cell_parity(0, 0).await, Ok(0));
}

#[tokio::test]
async fn malformed_payloads_become_error_responses() {
    let orchestrator = Orchestrator::new();
    orchestrator.initialize().await;

    let result = orchestrator.submit(OP_CELL_PARITY, json!({"row": "zero"})).await;
    match result {
        Err(OrchestratorError::Remote(message)) => {
            assert!(message.contains("invalid payload"), "unexpected message: {message}")
        }
        other => panic!("expected a remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn caller_errors_surface_as_remote_errors() {
    let orchestrator = Orchestrator::new();
    orchestrator.initialize().await;

    let result = orchestrator
        .find_path(Point::new(5, 5), Point::new(0, 0), GridSize::new(3, 3), 1_000)
        .await;
    match result {
        Err(OrchestratorError::Remote(message)) => {
            assert!(message.contains("outside"), "unexpected message: {message}")
        }
        other => panic!("expected a remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn responses_correlate_by_id_under_concurrent_load() {
    let orchestrator = std::sync::Arc::new(Orchestrator::new());
    orchestrator.initialize().await;

    let mut handles = Vec::new();
    for row in 0..8 {
        let orchestrator = std::sync::Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            let parity = orchestrator.cell_parity(row, 0).await.unwrap();
            (row, parity)
        }));
    }
    for handle in handles {
        let (row, parity) = handle.await.unwrap();
        assert_eq!(parity, row.rem_euclid(2), "response for row {row} mismatched");
    }
}

#[tokio::test]
async fn shutdown_rejects_later_requests() {
    let orchestrator = Orchestrator::new();
    orchestrator.initialize().await;
    assert_eq!(orchestrator.cell_parity(0, 1).await, Ok(1));

    orchestrator.shutdown().await;
    orchestrator.shutdown().await; // second call is a no-op

    let result = orchestrator.cell_parity(0, 1).await;
    assert_eq!(result, Err(OrchestratorError::ShutDown));
}

#[tokio::test]
async fn shutdown_before_initialization_is_a_no_op() {
    let orchestrator = Orchestrator::new();
    orchestrator.shutdown().await;
    assert!(!orchestrator.is_initialized());
}
