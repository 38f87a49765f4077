// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Remote tool-planning service: the last planning tier, spoken over
//! JSON-RPC 2.0 with a hard per-call timeout.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug)]
pub enum RemoteError {
    Http { detail: String },
    Status { code: u16, body: String },
    Rpc { code: i64, message: String },
    MalformedResponse { detail: String },
    Timeout { after: Duration },
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { detail } => write!(f, "tool-planning transport error: {detail}"),
            Self::Status { code, body } => {
                write!(f, "tool-planning service returned HTTP {code}: {body}")
            }
            Self::Rpc { code, message } => {
                write!(f, "tool-planning service returned RPC error {code}: {message}")
            }
            Self::MalformedResponse { detail } => {
                write!(f, "tool-planning service returned malformed output: {detail}")
            }
            Self::Timeout { after } => {
                write!(f, "tool-planning service timed out after {}ms", after.as_millis())
            }
        }
    }
}

impl std::error::Error for RemoteError {}

/// One reusable board layout the remote service can stamp out.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Result of `plan_command`: raw tool-call JSON for the normalizer, or a
/// refusal with a human-readable reason.
#[derive(Debug, Clone)]
pub enum RemotePlanOutcome {
    Planned { name: String, raw_calls: Vec<Value> },
    Declined { message: String },
}

#[async_trait]
pub trait ToolPlanningService: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<PlanTemplate>, RemoteError>;

    /// Expands a template into raw tool calls anchored at the given origin.
    async fn instantiate_template(
        &self,
        template_id: &str,
        origin_x: f64,
        origin_y: f64,
    ) -> Result<Vec<Value>, RemoteError>;

    async fn plan_command(
        &self,
        command: &str,
        board_summary: &str,
    ) -> Result<RemotePlanOutcome, RemoteError>;
}

/// JSON-RPC 2.0 client over HTTP POST. Request ids are monotonic per client.
pub struct HttpToolPlanningService {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl HttpToolPlanningService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| RemoteError::Http { detail: err.to_string() })?;
        Ok(Self { http, endpoint: endpoint.into(), timeout, next_id: AtomicU64::new(1) })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RemoteError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "tool-planning rpc");
        let send = self.http.post(&self.endpoint).json(&body).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| RemoteError::Timeout { after: self.timeout })?
            .map_err(|err| RemoteError::Http { detail: err.to_string() })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status { code: status.as_u16(), body });
        }
        let envelope: RpcEnvelope = tokio::time::timeout(self.timeout, response.json())
            .await
            .map_err(|_| RemoteError::Timeout { after: self.timeout })?
            .map_err(|err| RemoteError::MalformedResponse { detail: err.to_string() })?;
        if let Some(error) = envelope.error {
            return Err(RemoteError::Rpc { code: error.code, message: error.message });
        }
        envelope.result.ok_or_else(|| RemoteError::MalformedResponse {
            detail: "response carries neither result nor error".to_owned(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanCommandResult {
    planned: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tool_calls: Vec<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl ToolPlanningService for HttpToolPlanningService {
    async fn list_templates(&self) -> Result<Vec<PlanTemplate>, RemoteError> {
        let result = self.call("templates.list", serde_json::json!({})).await?;
        serde_json::from_value(result)
            .map_err(|err| RemoteError::MalformedResponse { detail: err.to_string() })
    }

    async fn instantiate_template(
        &self,
        template_id: &str,
        origin_x: f64,
        origin_y: f64,
    ) -> Result<Vec<Value>, RemoteError> {
        let result = self
            .call(
                "templates.instantiate",
                serde_json::json!({
                    "templateId": template_id,
                    "origin": { "x": origin_x, "y": origin_y },
                }),
            )
            .await?;
        serde_json::from_value(result)
            .map_err(|err| RemoteError::MalformedResponse { detail: err.to_string() })
    }

    async fn plan_command(
        &self,
        command: &str,
        board_summary: &str,
    ) -> Result<RemotePlanOutcome, RemoteError> {
        let result = self
            .call(
                "plan.command",
                serde_json::json!({ "command": command, "boardSummary": board_summary }),
            )
            .await?;
        let parsed: PlanCommandResult = serde_json::from_value(result)
            .map_err(|err| RemoteError::MalformedResponse { detail: err.to_string() })?;
        if parsed.planned {
            Ok(RemotePlanOutcome::Planned {
                name: parsed.name.unwrap_or_else(|| "remote plan".to_owned()),
                raw_calls: parsed.tool_calls,
            })
        } else {
            Ok(RemotePlanOutcome::Declined {
                message: parsed
                    .message
                    .unwrap_or_else(|| "the planning service declined this command".to_owned()),
            })
        }
    }
}

/// Scripted service for tests.
#[derive(Default)]
pub struct StubToolPlanningService {
    plan_outcomes: std::sync::Mutex<Vec<Result<RemotePlanOutcome, RemoteError>>>,
    templates: Vec<PlanTemplate>,
}

impl StubToolPlanningService {
    pub fn with_templates(templates: Vec<PlanTemplate>) -> Self {
        Self { templates, ..Self::default() }
    }

    pub fn push_plan(&self, outcome: Result<RemotePlanOutcome, RemoteError>) {
        self.plan_outcomes.lock().expect("stub lock").push(outcome);
    }
}

#[async_trait]
impl ToolPlanningService for StubToolPlanningService {
    async fn list_templates(&self) -> Result<Vec<PlanTemplate>, RemoteError> {
        Ok(self.templates.clone())
    }

    async fn instantiate_template(
        &self,
        template_id: &str,
        _origin_x: f64,
        _origin_y: f64,
    ) -> Result<Vec<Value>, RemoteError> {
        Err(RemoteError::Rpc {
            code: -32601,
            message: format!("stub has no template '{template_id}'"),
        })
    }

    async fn plan_command(
        &self,
        _command: &str,
        _board_summary: &str,
    ) -> Result<RemotePlanOutcome, RemoteError> {
        let mut outcomes = self.plan_outcomes.lock().expect("stub lock");
        if outcomes.is_empty() {
            return Err(RemoteError::Http { detail: "stub has no queued outcome".to_owned() });
        }
        outcomes.remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_display_names_code_and_message() {
        let err = RemoteError::Rpc { code: -32601, message: "method not found".to_owned() };
        assert_eq!(
            err.to_string(),
            "tool-planning service returned RPC error -32601: method not found"
        );
    }

    #[tokio::test]
    async fn stub_serves_templates_and_queued_plans() {
        let stub = StubToolPlanningService::with_templates(vec![PlanTemplate {
            id: "swot".to_owned(),
            name: "SWOT analysis".to_owned(),
            description: String::new(),
        }]);
        stub.push_plan(Ok(RemotePlanOutcome::Declined { message: "no".to_owned() }));
        assert_eq!(stub.list_templates().await.expect("templates").len(), 1);
        assert!(matches!(
            stub.plan_command("x", "").await.expect("queued"),
            RemotePlanOutcome::Declined { .. }
        ));
        assert!(stub.plan_command("x", "").await.is_err());
    }
}
