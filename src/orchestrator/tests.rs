// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::llm::{HostedOutcome, LlmError, LlmUsage, StubHostedPlanner};
use crate::model::{BoardObject, ObjectKind};
use crate::remote::{RemotePlanOutcome, StubToolPlanningService};
use crate::store::MemoryBoardStore;

use super::*;

fn bid() -> BoardId {
    BoardId::new("board-1").expect("id")
}

fn oid(name: &str) -> ObjectId {
    ObjectId::new(name).expect("id")
}

fn sticky(name: &str) -> BoardObject {
    BoardObject::with_frame(oid(name), ObjectKind::Sticky, 0.0, 0.0, 160.0, 160.0)
}

struct Harness {
    store: Arc<MemoryBoardStore>,
    locks: BoardLocks,
    budget: BudgetController,
    hosted: Option<Arc<StubHostedPlanner>>,
    remote: Option<Arc<StubToolPlanningService>>,
    audit: Arc<MemoryAuditSink>,
    mode: PlannerMode,
}

impl Harness {
    fn new(mode: PlannerMode) -> Self {
        Self {
            store: Arc::new(MemoryBoardStore::new()),
            locks: BoardLocks::new(),
            budget: BudgetController::new(1.0),
            hosted: None,
            remote: None,
            audit: Arc::new(MemoryAuditSink::default()),
            mode,
        }
    }

    fn with_hosted(mut self) -> Self {
        self.hosted = Some(Arc::new(StubHostedPlanner::new(0.01)));
        self
    }

    fn with_remote(mut self) -> Self {
        self.remote = Some(Arc::new(StubToolPlanningService::default()));
        self
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            self.store.clone(),
            self.locks.clone(),
            self.budget.clone(),
            self.hosted.clone().map(|h| h as Arc<dyn HostedPlanner>),
            self.remote.clone().map(|r| r as Arc<dyn ToolPlanningService>),
            Arc::new(AllowAll),
            self.audit.clone(),
            self.mode,
            PlanLimits::default(),
            Duration::from_secs(10),
        )
    }

    fn request(&self, message: &str) -> CommandRequest {
        CommandRequest {
            board_id: bid(),
            user_id: None,
            message: message.to_owned(),
            selected_object_ids: Vec::new(),
            viewport_bounds: None,
        }
    }
}

#[tokio::test]
async fn deterministic_plan_failing_validation_never_reaches_the_executor() {
    let harness = Harness::new(PlannerMode::DeterministicOnly);
    harness.store.insert_objects(&bid(), vec![sticky("a")]).await.expect("seed");

    let request = CommandRequest {
        board_id: bid(),
        user_id: None,
        message: "resize to 0 x 0".to_owned(),
        selected_object_ids: vec![oid("a")],
        viewport_bounds: None,
    };
    let response = harness.orchestrator().handle_command(request).await.expect("response");

    assert!(!response.execution.planned);
    assert!(response.execution.tool_calls.is_empty());
    let objects = harness.store.list_objects(&bid()).await.expect("list");
    assert_eq!((objects[0].width(), objects[0].height()), (160.0, 160.0));
}

#[tokio::test]
async fn deterministic_create_executes_and_reports() {
    let harness = Harness::new(PlannerMode::DeterministicOnly);
    let response = harness
        .orchestrator()
        .handle_command(harness.request("add a sticky at (10, 20)"))
        .await
        .expect("response");

    assert_eq!(response.provider, "deterministic");
    assert!(response.execution.planned);
    assert_eq!(response.execution.tool_calls, vec!["createStickyNote"]);
    assert_eq!(response.execution.objects_created, 1);
    assert_eq!(harness.store.list_objects(&bid()).await.expect("list").len(), 1);
}

#[tokio::test]
async fn clear_board_reports_measured_delta() {
    let harness = Harness::new(PlannerMode::DeterministicOnly);
    harness
        .store
        .insert_objects(&bid(), vec![sticky("a"), sticky("b"), sticky("c")])
        .await
        .expect("seed");

    let response = harness
        .orchestrator()
        .handle_command(harness.request("clear the board"))
        .await
        .expect("response");

    assert!(response.assistant_message.contains("deleted 3"));
    assert!(response.assistant_message.contains("0 remaining"));
    assert!(harness.store.list_objects(&bid()).await.expect("list").is_empty());
    assert_eq!(response.selection_update, Some(SelectionUpdate::Clear));
}

#[tokio::test]
async fn unplanned_command_in_deterministic_mode_returns_guidance() {
    let harness = Harness::new(PlannerMode::DeterministicOnly);
    let response = harness
        .orchestrator()
        .handle_command(harness.request("do something mysterious"))
        .await
        .expect("response");

    assert!(!response.execution.planned);
    assert_eq!(response.execution.intent, "unsupported-command");
    assert!(response.execution.tool_calls.is_empty());
    assert!(!response.assistant_message.is_empty());
}

#[tokio::test]
async fn hosted_plan_wins_when_deterministic_declines() {
    let harness = Harness::new(PlannerMode::Hybrid).with_hosted();
    harness.hosted.as_ref().expect("stub").push(Ok((
        HostedOutcome::Planned {
            name: "two stickies".to_owned(),
            raw_calls: vec![
                json!({"tool": "createStickyNote", "x": 0, "y": 0}),
                json!({"tool": "createStickyNote", "x": 200, "y": 0}),
            ],
        },
        LlmUsage { prompt_tokens: 100, completion_tokens: 50, cost_usd: 0.005 },
    )));

    let response = harness
        .orchestrator()
        .handle_command(harness.request("lay down a couple of ideas for me"))
        .await
        .expect("response");

    assert_eq!(response.provider, "openai");
    assert!(!response.execution.fallback_used);
    assert_eq!(response.execution.objects_created, 2);
    assert_eq!(response.execution.open_ai.map(|u| u.prompt_tokens), Some(100));
    assert!((harness.budget.spent_usd() - 0.005).abs() < 1e-12);
    assert_eq!(harness.budget.reserved_usd(), 0.0);
}

#[tokio::test]
async fn hosted_failure_falls_back_to_remote() {
    let harness = Harness::new(PlannerMode::Hybrid).with_hosted().with_remote();
    harness
        .hosted
        .as_ref()
        .expect("stub")
        .push(Err(LlmError::Http { detail: "boom".to_owned() }));
    harness.remote.as_ref().expect("stub").push_plan(Ok(RemotePlanOutcome::Planned {
        name: "remote sticky".to_owned(),
        raw_calls: vec![json!({"tool": "createStickyNote", "x": 5, "y": 5})],
    }));

    let response = harness
        .orchestrator()
        .handle_command(harness.request("improvise something"))
        .await
        .expect("response");

    assert_eq!(response.provider, "mcp");
    assert!(response.execution.mcp_used);
    assert!(response.execution.fallback_used);
    // The reservation was released when the hosted call failed.
    assert_eq!(harness.budget.spent_usd(), 0.0);
    assert_eq!(harness.budget.reserved_usd(), 0.0);
}

#[tokio::test]
async fn zero_operation_hosted_plan_is_a_contract_violation() {
    let harness = Harness::new(PlannerMode::Hybrid).with_hosted();
    harness.hosted.as_ref().expect("stub").push(Ok((
        HostedOutcome::Planned { name: "nothing".to_owned(), raw_calls: vec![] },
        LlmUsage::default(),
    )));

    let response = harness
        .orchestrator()
        .handle_command(harness.request("improvise something"))
        .await
        .expect("response");

    // No remote tier configured, so the deterministic guidance answers and
    // the fallback flag is set.
    assert_eq!(response.provider, "deterministic");
    assert!(response.execution.fallback_used);
    assert!(!response.execution.planned);
}

#[tokio::test]
async fn strict_mode_fails_rather_than_downgrading() {
    let harness = Harness::new(PlannerMode::OpenAiStrict).with_hosted();
    harness.hosted.as_ref().expect("stub").push(Ok((
        HostedOutcome::Declined { message: "cannot help".to_owned() },
        LlmUsage::default(),
    )));

    let err = harness
        .orchestrator()
        .handle_command(harness.request("improvise something"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::StrictModeFailed { .. }));
}

#[tokio::test]
async fn budget_exhaustion_blocks_hosted_tier() {
    let mut harness = Harness::new(PlannerMode::Hybrid).with_hosted();
    harness.budget = BudgetController::new(0.0);

    let response = harness
        .orchestrator()
        .handle_command(harness.request("improvise something"))
        .await
        .expect("response");

    assert_eq!(response.provider, "deterministic");
    assert!(!response.execution.planned);
    assert_eq!(harness.hosted.as_ref().expect("stub").seen_requests().len(), 0);
}

#[tokio::test]
async fn destructive_commands_never_reach_the_hosted_planner() {
    let harness = Harness::new(PlannerMode::Hybrid).with_hosted();
    harness.store.insert_objects(&bid(), vec![sticky("a")]).await.expect("seed");

    let response = harness
        .orchestrator()
        .handle_command(harness.request("clear the board"))
        .await
        .expect("response");

    assert_eq!(response.provider, "deterministic");
    assert_eq!(harness.hosted.as_ref().expect("stub").seen_requests().len(), 0);
}

#[tokio::test]
async fn busy_board_rejects_mutating_command() {
    let harness = Harness::new(PlannerMode::DeterministicOnly);
    let _guard = harness.locks.try_acquire(&bid()).expect("lock");

    let err = harness
        .orchestrator()
        .handle_command(harness.request("add a sticky"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::BoardBusy { .. }));
}

#[tokio::test]
async fn selection_command_needs_no_lock() {
    let harness = Harness::new(PlannerMode::DeterministicOnly);
    harness.store.insert_objects(&bid(), vec![sticky("a")]).await.expect("seed");
    let _guard = harness.locks.try_acquire(&bid()).expect("lock");

    let response = harness
        .orchestrator()
        .handle_command(harness.request("select everything"))
        .await
        .expect("response");
    assert!(matches!(response.selection_update, Some(SelectionUpdate::Replace { .. })));
}

struct DenyAll;

#[async_trait]
impl BoardAccess for DenyAll {
    async fn can_edit(&self, _user_id: Option<&UserId>, _board_id: &BoardId) -> bool {
        false
    }
}

#[tokio::test]
async fn unauthorized_request_is_rejected_before_side_effects() {
    let harness = Harness::new(PlannerMode::DeterministicOnly);
    let orchestrator = Orchestrator::new(
        harness.store.clone(),
        harness.locks.clone(),
        harness.budget.clone(),
        None,
        None,
        Arc::new(DenyAll),
        harness.audit.clone(),
        harness.mode,
        PlanLimits::default(),
        Duration::from_secs(10),
    );

    let err = orchestrator.handle_command(harness.request("add a sticky")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Unauthorized { .. }));
    assert!(harness.store.list_objects(&bid()).await.expect("list").is_empty());
}

#[tokio::test]
async fn every_response_is_audited() {
    let harness = Harness::new(PlannerMode::DeterministicOnly);
    harness
        .orchestrator()
        .handle_command(harness.request("add a sticky"))
        .await
        .expect("response");

    let events = harness.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].provider, "deterministic");
    assert!(events[0].planned);
    assert!(!events[0].trace_id.is_empty());
}

#[test]
fn planner_mode_parses_cli_spellings() {
    assert_eq!("hybrid".parse::<PlannerMode>(), Ok(PlannerMode::Hybrid));
    assert_eq!(
        "deterministic-only".parse::<PlannerMode>(),
        Ok(PlannerMode::DeterministicOnly)
    );
    assert_eq!("openai-strict".parse::<PlannerMode>(), Ok(PlannerMode::OpenAiStrict));
    assert!("wild".parse::<PlannerMode>().is_err());
}
