// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! The planning orchestrator.
//!
//! One command at a time per board: plan deterministically, escalate to the
//! hosted planner and then the remote tool-planning service when allowed,
//! execute the winning plan under the board lock, and assemble the response.
//! Paid tiers only run behind a budget reservation.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::budget::{BudgetController, ReservationTicket};
use crate::exec::{ExecError, ExecutionReport, ToolExecutor};
use crate::llm::{HostedOutcome, HostedPlanner, LlmUsage};
use crate::model::{BoardId, ObjectId, SelectionUpdate, UserId, ViewportBounds};
use crate::plan::{
    normalize_plan, validate_plan, ExecutionPlan, PlanAttempt, PlanLimits, ToolCall,
};
use crate::planner::{self, intent, PlanOutcome, PlannerContext};
use crate::remote::{RemotePlanOutcome, ToolPlanningService};
use crate::store::{BoardLocks, BoardStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerMode {
    DeterministicOnly,
    Hybrid,
    OpenAiStrict,
}

impl PlannerMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::DeterministicOnly => "deterministic-only",
            Self::Hybrid => "hybrid",
            Self::OpenAiStrict => "openai-strict",
        }
    }
}

impl FromStr for PlannerMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "deterministic-only" | "deterministic" => Ok(Self::DeterministicOnly),
            "hybrid" => Ok(Self::Hybrid),
            "openai-strict" | "strict" => Ok(Self::OpenAiStrict),
            other => Err(format!(
                "unknown planner mode '{other}', expected deterministic-only, hybrid, or openai-strict"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub board_id: BoardId,
    pub user_id: Option<UserId>,
    pub message: String,
    pub selected_object_ids: Vec<ObjectId>,
    pub viewport_bounds: Option<ViewportBounds>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub intent: String,
    pub mode: &'static str,
    pub planned: bool,
    pub mcp_used: bool,
    pub fallback_used: bool,
    pub tool_calls: Vec<&'static str>,
    pub objects_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_ai: Option<LlmUsage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub assistant_message: String,
    pub trace_id: String,
    pub provider: &'static str,
    pub execution: ExecutionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_update: Option<SelectionUpdate>,
}

#[derive(Debug)]
pub enum OrchestratorError {
    Unauthorized { board_id: BoardId },
    BoardBusy { board_id: BoardId },
    Timeout { after: Duration },
    StrictModeFailed { message: String },
    Execution(ExecError),
    Store(StoreError),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { board_id } => {
                write!(f, "you don't have edit access to board '{}'", board_id.as_str())
            }
            Self::BoardBusy { board_id } => write!(
                f,
                "another command is already running on board '{}'; try again in a moment",
                board_id.as_str()
            ),
            Self::Timeout { after } => write!(
                f,
                "the command timed out after {}s; parts of it may still have been applied",
                after.as_secs()
            ),
            Self::StrictModeFailed { message } => {
                write!(f, "the hosted planner could not handle this command: {message}")
            }
            Self::Execution(err) => write!(f, "the plan could not be applied: {err}"),
            Self::Store(err) => write!(f, "board storage failed: {err}"),
        }
    }
}

impl std::error::Error for OrchestratorError {}

impl From<ExecError> for OrchestratorError {
    fn from(err: ExecError) -> Self {
        Self::Execution(err)
    }
}

impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Authorization seam. The server wires a real implementation; tests and the
/// stdio mode use [`AllowAll`].
#[async_trait]
pub trait BoardAccess: Send + Sync {
    async fn can_edit(&self, user_id: Option<&UserId>, board_id: &BoardId) -> bool;
}

pub struct AllowAll;

#[async_trait]
impl BoardAccess for AllowAll {
    async fn can_edit(&self, _user_id: Option<&UserId>, _board_id: &BoardId) -> bool {
        true
    }
}

/// One orchestration decision, mirrored to the audit sink.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub trace_id: String,
    pub board_id: BoardId,
    pub intent: String,
    pub provider: &'static str,
    pub fallback_used: bool,
    pub planned: bool,
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

/// Default sink: one `tracing` event per orchestration decision.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            trace_id = %event.trace_id,
            board_id = %event.board_id,
            intent = %event.intent,
            provider = event.provider,
            fallback_used = event.fallback_used,
            planned = event.planned,
            "command handled"
        );
    }
}

#[derive(Default)]
pub struct MemoryAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit lock").clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().expect("audit lock").push(event);
    }
}

/// The plan that won, with its provenance.
struct WinningPlan {
    plan: ExecutionPlan,
    provider: &'static str,
    mcp_used: bool,
    fallback_used: bool,
    usage: Option<LlmUsage>,
    assistant_message: String,
}

pub struct Orchestrator {
    store: Arc<dyn BoardStore>,
    locks: BoardLocks,
    budget: BudgetController,
    hosted: Option<Arc<dyn HostedPlanner>>,
    remote: Option<Arc<dyn ToolPlanningService>>,
    access: Arc<dyn BoardAccess>,
    audit: Arc<dyn AuditSink>,
    mode: PlannerMode,
    limits: PlanLimits,
    timeout: Duration,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn BoardStore>,
        locks: BoardLocks,
        budget: BudgetController,
        hosted: Option<Arc<dyn HostedPlanner>>,
        remote: Option<Arc<dyn ToolPlanningService>>,
        access: Arc<dyn BoardAccess>,
        audit: Arc<dyn AuditSink>,
        mode: PlannerMode,
        limits: PlanLimits,
        timeout: Duration,
    ) -> Self {
        Self { store, locks, budget, hosted, remote, access, audit, mode, limits, timeout }
    }

    pub fn mode(&self) -> PlannerMode {
        self.mode
    }

    pub async fn handle_command(
        &self,
        request: CommandRequest,
    ) -> Result<CommandResponse, OrchestratorError> {
        let trace_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "command",
            trace_id = %trace_id,
            board = request.board_id.as_str(),
            mode = self.mode.label()
        );
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.run(&trace_id, request).instrument(span)).await {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::Timeout { after: timeout }),
        }
    }

    async fn run(
        &self,
        trace_id: &str,
        request: CommandRequest,
    ) -> Result<CommandResponse, OrchestratorError> {
        if !self.access.can_edit(request.user_id.as_ref(), &request.board_id).await {
            return Err(OrchestratorError::Unauthorized { board_id: request.board_id });
        }

        let objects = self.store.list_objects(&request.board_id).await?;
        let ctx = PlannerContext {
            objects: &objects,
            selected_ids: &request.selected_object_ids,
            viewport: request.viewport_bounds.as_ref(),
            limits: &self.limits,
        };
        let deterministic = planner::plan(&request.message, &ctx);
        info!(
            intent = deterministic.intent,
            planned = deterministic.planned,
            "deterministic planner finished"
        );

        // Selection and synthesis intents mutate nothing; answer immediately.
        if deterministic.planned && deterministic.plan.is_none() {
            return Ok(self.respond(trace_id, &request, &deterministic, None, None));
        }

        let destructive = matches!(
            deterministic.intent,
            intent::CLEAR_BOARD | intent::DELETE_SELECTED
        );
        let mut winner: Option<WinningPlan> = None;
        let mut hosted_attempt = PlanAttempt::Disabled;

        if let Some(plan) = deterministic.plan.clone() {
            // Every plan passes validation before it can reach the executor,
            // whichever tier produced it.
            if let Err(err) = validate_plan(&plan, &self.limits) {
                warn!(error = %err, "deterministic plan failed validation");
                let refused = PlanOutcome::guidance(
                    deterministic.intent,
                    format!("I can't apply that as stated: {err}"),
                );
                return Ok(self.respond(trace_id, &request, &refused, None, None));
            }
            winner = Some(WinningPlan {
                plan,
                provider: "deterministic",
                mcp_used: false,
                fallback_used: false,
                usage: None,
                assistant_message: deterministic.assistant_message.clone(),
            });
            if destructive {
                hosted_attempt = PlanAttempt::PolicyBlocked {
                    reason: "bulk destructive commands are never delegated".to_owned(),
                };
            }
        } else if self.mode != PlannerMode::DeterministicOnly {
            hosted_attempt = self.attempt_hosted(&request, &objects).await;
            match &hosted_attempt {
                PlanAttempt::Planned { plan, usage } => {
                    winner = Some(WinningPlan {
                        plan: plan.clone(),
                        provider: "openai",
                        mcp_used: false,
                        fallback_used: false,
                        usage: *usage,
                        assistant_message: format!(
                            "Done: {} ({} operation(s)).",
                            plan.name(),
                            plan.len()
                        ),
                    });
                }
                PlanAttempt::Error { message } if self.mode == PlannerMode::OpenAiStrict => {
                    return Err(OrchestratorError::StrictModeFailed {
                        message: message.clone(),
                    });
                }
                other => {
                    if self.mode == PlannerMode::OpenAiStrict {
                        if let PlanAttempt::NotPlanned { message } = other {
                            return Err(OrchestratorError::StrictModeFailed {
                                message: message
                                    .clone()
                                    .unwrap_or_else(|| "no plan produced".to_owned()),
                            });
                        }
                        if matches!(other, PlanAttempt::BudgetBlocked { .. } | PlanAttempt::Disabled)
                        {
                            return Err(OrchestratorError::StrictModeFailed {
                                message: "hosted planning unavailable".to_owned(),
                            });
                        }
                    }
                    warn!(attempt = other.label(), "hosted planner did not produce a plan");
                }
            }

            if winner.is_none() {
                if let Some(remote_win) = self.attempt_remote(&request, &objects).await {
                    winner = Some(remote_win);
                }
            }
        }

        let hosted_tried = !matches!(
            hosted_attempt,
            PlanAttempt::Disabled | PlanAttempt::PolicyBlocked { .. }
        );
        match winner {
            Some(mut win) => {
                win.fallback_used = hosted_tried && win.provider != "openai";
                let (report, message_override) =
                    self.execute(&request, &win, &deterministic).await?;
                if let Some(message) = message_override {
                    win.assistant_message = message;
                }
                Ok(self.respond(trace_id, &request, &deterministic, Some(win), Some(report)))
            }
            None => {
                // Every tier declined; the deterministic guidance is the answer.
                let mut response = self.respond(trace_id, &request, &deterministic, None, None);
                response.execution.fallback_used = hosted_tried;
                Ok(response)
            }
        }
    }

    async fn attempt_hosted(
        &self,
        request: &CommandRequest,
        objects: &[crate::model::BoardObject],
    ) -> PlanAttempt {
        let Some(hosted) = self.hosted.as_ref() else {
            return PlanAttempt::Disabled;
        };
        let ticket: ReservationTicket =
            match self.budget.reserve(hosted.estimated_request_cost_usd()) {
                Ok(ticket) => ticket,
                Err(err) => return PlanAttempt::BudgetBlocked { reason: err.to_string() },
            };
        let plan_request = crate::llm::PlanRequest {
            command: request.message.clone(),
            board_summary: board_summary(objects),
            selected_object_ids: request.selected_object_ids.clone(),
        };
        match hosted.propose(&plan_request).await {
            Ok((outcome, usage)) => {
                ticket.finalize(usage.cost_usd);
                match outcome {
                    HostedOutcome::Planned { name, raw_calls } => {
                        self.accept_proposal(name, &raw_calls, Some(usage))
                    }
                    HostedOutcome::Declined { message } => {
                        PlanAttempt::NotPlanned { message: Some(message) }
                    }
                }
            }
            Err(err) => {
                // The call never produced a billable result.
                ticket.release();
                PlanAttempt::Error { message: err.to_string() }
            }
        }
    }

    /// Normalizes and validates raw tool-call JSON from a paid tier. A
    /// planned result with zero operations is a contract violation, not a
    /// no-op.
    fn accept_proposal(
        &self,
        name: String,
        raw_calls: &[serde_json::Value],
        usage: Option<LlmUsage>,
    ) -> PlanAttempt {
        if raw_calls.is_empty() {
            return PlanAttempt::Error {
                message: "planner claimed success but returned zero operations".to_owned(),
            };
        }
        let calls: Vec<ToolCall> = match normalize_plan(raw_calls) {
            Ok(calls) => calls,
            Err(err) => return PlanAttempt::Error { message: err.to_string() },
        };
        let plan = ExecutionPlan::new(name, calls);
        if let Err(err) = validate_plan(&plan, &self.limits) {
            return PlanAttempt::Error { message: err.to_string() };
        }
        PlanAttempt::Planned { plan, usage }
    }

    async fn attempt_remote(
        &self,
        request: &CommandRequest,
        objects: &[crate::model::BoardObject],
    ) -> Option<WinningPlan> {
        let remote = self.remote.as_ref()?;
        match remote.plan_command(&request.message, &board_summary(objects)).await {
            Ok(RemotePlanOutcome::Planned { name, raw_calls }) => {
                match self.accept_proposal(name, &raw_calls, None) {
                    PlanAttempt::Planned { plan, .. } => Some(WinningPlan {
                        assistant_message: format!(
                            "Done: {} ({} operation(s)).",
                            plan.name(),
                            plan.len()
                        ),
                        plan,
                        provider: "mcp",
                        mcp_used: true,
                        fallback_used: false,
                        usage: None,
                    }),
                    other => {
                        warn!(attempt = other.label(), "remote plan rejected");
                        None
                    }
                }
            }
            Ok(RemotePlanOutcome::Declined { message }) => {
                info!(message, "remote planner declined");
                None
            }
            Err(err) => {
                warn!(error = %err, "remote planner failed");
                None
            }
        }
    }

    async fn execute(
        &self,
        request: &CommandRequest,
        win: &WinningPlan,
        deterministic: &PlanOutcome,
    ) -> Result<(ExecutionReport, Option<String>), OrchestratorError> {
        let _guard = self
            .locks
            .try_acquire(&request.board_id)
            .ok_or_else(|| OrchestratorError::BoardBusy { board_id: request.board_id.clone() })?;

        let clear_board = deterministic.intent == intent::CLEAR_BOARD;
        let before = if clear_board {
            self.store.list_objects(&request.board_id).await?.len()
        } else {
            0
        };

        let mut executor =
            ToolExecutor::load(self.store.as_ref(), request.board_id.clone(), self.limits).await?;
        let report = executor.execute(&win.plan).await?;

        // The clear-board message reports the measured delta, so it stays
        // accurate even if some deletes were skipped or a chunk failed.
        if clear_board {
            let remaining = self.store.list_objects(&request.board_id).await?.len();
            info!(before, deleted = report.deleted_count, remaining, "board cleared");
            let message = format!(
                "Cleared the board: deleted {} object(s), {} remaining.",
                report.deleted_count, remaining
            );
            return Ok((report, Some(message)));
        }
        Ok((report, None))
    }

    fn respond(
        &self,
        trace_id: &str,
        request: &CommandRequest,
        deterministic: &PlanOutcome,
        win: Option<WinningPlan>,
        report: Option<ExecutionReport>,
    ) -> CommandResponse {
        let provider = win.as_ref().map_or("deterministic", |w| w.provider);
        let planned = win.is_some() || deterministic.planned;
        let assistant_message = match &win {
            Some(win) => win.assistant_message.clone(),
            None => deterministic.assistant_message.clone(),
        };
        let response = CommandResponse {
            assistant_message,
            trace_id: trace_id.to_owned(),
            provider,
            execution: ExecutionSummary {
                intent: deterministic.intent.to_owned(),
                mode: self.mode.label(),
                planned,
                mcp_used: win.as_ref().is_some_and(|w| w.mcp_used),
                fallback_used: win.as_ref().is_some_and(|w| w.fallback_used),
                tool_calls: report.as_ref().map(|r| r.executed_tools.clone()).unwrap_or_default(),
                objects_created: report.as_ref().map_or(0, |r| r.created_object_ids.len()),
                open_ai: win.as_ref().and_then(|w| w.usage),
            },
            selection_update: deterministic.selection_update.clone(),
        };
        self.audit.record(AuditEvent {
            trace_id: trace_id.to_owned(),
            board_id: request.board_id.clone(),
            intent: response.execution.intent.clone(),
            provider,
            fallback_used: response.execution.fallback_used,
            planned,
        });
        response
    }
}

/// Compact board description for paid planning tiers: object counts by kind
/// plus a few labeled ids, bounded regardless of board size.
fn board_summary(objects: &[crate::model::BoardObject]) -> String {
    use std::collections::BTreeMap;

    if objects.is_empty() {
        return "empty board".to_owned();
    }
    let mut by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
    for object in objects {
        *by_kind.entry(object.kind().label()).or_insert(0) += 1;
    }
    let counts: Vec<String> =
        by_kind.iter().map(|(kind, count)| format!("{count} {kind}")).collect();
    let mut summary = format!("{} objects: {}", objects.len(), counts.join(", "));
    for object in objects.iter().take(12) {
        summary.push_str(&format!(
            "\n- {} {} at ({}, {})",
            object.kind().label(),
            object.id().as_str(),
            object.x(),
            object.y()
        ));
    }
    summary
}

#[cfg(test)]
mod tests;
