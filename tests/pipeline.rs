// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! End-to-end pipeline scenarios: natural-language command in, persisted
//! board mutations out.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ondine::budget::BudgetController;
use ondine::llm::{LlmError, StubHostedPlanner};
use ondine::model::{BoardId, ObjectId};
use ondine::orchestrator::{
    AllowAll, CommandRequest, NullAuditSink, Orchestrator, PlannerMode,
};
use ondine::plan::PlanLimits;
use ondine::remote::{RemotePlanOutcome, StubToolPlanningService};
use ondine::store::{BoardFolder, BoardLocks, BoardStore, MemoryBoardStore};

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    std::env::temp_dir().join(format!("ondine-pipeline-{tag}-{}-{nanos}", std::process::id()))
}

fn orchestrator(store: Arc<dyn BoardStore>, mode: PlannerMode) -> Orchestrator {
    Orchestrator::new(
        store,
        BoardLocks::new(),
        BudgetController::new(1.0),
        None,
        None,
        Arc::new(AllowAll),
        Arc::new(NullAuditSink),
        mode,
        PlanLimits::default(),
        Duration::from_secs(5),
    )
}

fn request(board: &str, message: &str, selected: Vec<ObjectId>) -> CommandRequest {
    CommandRequest {
        board_id: BoardId::new(board).expect("board id"),
        user_id: None,
        message: message.to_owned(),
        selected_object_ids: selected,
        viewport_bounds: None,
    }
}

#[tokio::test]
async fn swot_workflow_survives_process_restart() {
    let dir = temp_dir("swot");
    let board = BoardId::new("planning").expect("board id");

    {
        let store: Arc<dyn BoardStore> = Arc::new(BoardFolder::new(&dir));
        let orchestrator = orchestrator(store, PlannerMode::DeterministicOnly);
        let response = orchestrator
            .handle_command(request("planning", "create a swot board", Vec::new()))
            .await
            .expect("create template");
        assert!(response.execution.planned);
        assert_eq!(response.execution.objects_created, 1);
    }

    // Fresh store and orchestrator over the same folder, as after a restart.
    let store: Arc<dyn BoardStore> = Arc::new(BoardFolder::new(&dir));
    let orchestrator = orchestrator(store.clone(), PlannerMode::DeterministicOnly);

    let response = orchestrator
        .handle_command(request(
            "planning",
            "add a sticky in the strengths section saying \"Fast builds\"",
            Vec::new(),
        ))
        .await
        .expect("append to section");
    assert!(response.execution.planned);
    assert_eq!(response.execution.objects_created, 1);

    let objects = store.list_objects(&board).await.expect("list");
    assert_eq!(objects.len(), 2);
    let sticky = objects
        .iter()
        .find(|object| object.text() == "Fast builds")
        .expect("appended sticky");
    let container = objects.iter().find(|object| object.grid().is_some()).expect("container");
    // Strengths is the first cell, so the sticky lands in the left column.
    assert!(sticky.x() >= container.x());
    assert!(sticky.x() < container.x() + container.width() / 2.0);
    assert!(sticky.z_index() > container.z_index());

    // Selection flows back out, and feeds a follow-up delete.
    let select = orchestrator
        .handle_command(request("planning", "select all", Vec::new()))
        .await
        .expect("select all");
    let selected = match select.selection_update.expect("selection update") {
        ondine::model::SelectionUpdate::Replace { object_ids } => object_ids,
        ondine::model::SelectionUpdate::Clear => panic!("expected replace"),
    };
    assert_eq!(selected.len(), 2);

    let delete = orchestrator
        .handle_command(request("planning", "delete the selected objects", selected))
        .await
        .expect("delete selected");
    assert!(delete.execution.planned);
    assert!(store.list_objects(&board).await.expect("list").is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn batch_create_then_recolor_by_kind() {
    let store: Arc<dyn BoardStore> = Arc::new(MemoryBoardStore::new());
    let orchestrator = orchestrator(store.clone(), PlannerMode::DeterministicOnly);
    let board = BoardId::new("b1").expect("board id");

    let response = orchestrator
        .handle_command(request("b1", "add 6 stickies in 3 columns", Vec::new()))
        .await
        .expect("batch create");
    assert!(response.execution.planned);
    assert_eq!(response.execution.objects_created, 6);

    let objects = store.list_objects(&board).await.expect("list");
    let distinct_x: BTreeSet<String> =
        objects.iter().map(|object| format!("{:.1}", object.x())).collect();
    let distinct_y: BTreeSet<String> =
        objects.iter().map(|object| format!("{:.1}", object.y())).collect();
    assert_eq!(distinct_x.len(), 3);
    assert_eq!(distinct_y.len(), 2);

    let recolor = orchestrator
        .handle_command(request("b1", "make the stickies blue", Vec::new()))
        .await
        .expect("recolor");
    assert!(recolor.execution.planned);

    let objects = store.list_objects(&board).await.expect("list");
    assert!(objects.iter().all(|object| object.color() == "blue"));
}

#[tokio::test]
async fn hybrid_hosted_failure_falls_back_to_remote_planner() {
    let store: Arc<dyn BoardStore> = Arc::new(MemoryBoardStore::new());
    let hosted = Arc::new(StubHostedPlanner::new(0.01));
    hosted.push(Err(LlmError::Http { detail: "connection reset".to_owned() }));
    let remote = Arc::new(StubToolPlanningService::default());
    remote.push_plan(Ok(RemotePlanOutcome::Planned {
        name: "two ideas".to_owned(),
        raw_calls: vec![
            serde_json::json!({"tool": "createStickyNote", "x": 100.0, "y": 100.0, "text": "idea one"}),
            serde_json::json!({"tool": "createStickyNote", "x": 300.0, "y": 100.0, "text": "idea two"}),
        ],
    }));

    let orchestrator = Orchestrator::new(
        store.clone(),
        BoardLocks::new(),
        BudgetController::new(1.0),
        Some(hosted),
        Some(remote),
        Arc::new(AllowAll),
        Arc::new(NullAuditSink),
        PlannerMode::Hybrid,
        PlanLimits::default(),
        Duration::from_secs(5),
    );

    let response = orchestrator
        .handle_command(request("b1", "improvise something", Vec::new()))
        .await
        .expect("remote fallback");
    assert!(response.execution.planned);
    assert_eq!(response.provider, "mcp");
    assert!(response.execution.mcp_used);
    assert!(response.execution.fallback_used);
    assert_eq!(response.execution.objects_created, 2);

    let board = BoardId::new("b1").expect("board id");
    let objects = store.list_objects(&board).await.expect("list");
    let texts: BTreeSet<&str> = objects.iter().map(|object| object.text()).collect();
    assert_eq!(texts, BTreeSet::from(["idea one", "idea two"]));
}
