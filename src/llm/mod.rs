// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Hosted-planner seam and its OpenAI-compatible implementation.
//!
//! The hosted tier is propose-only: the model returns a JSON proposal, never
//! mutates the board itself. Proposals are normalized and validated by the
//! caller before anything executes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::model::ObjectId;

/// Token counts and the dollar cost attributed to one hosted call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug)]
pub enum LlmError {
    Http { detail: String },
    Status { code: u16, body: String },
    MalformedResponse { detail: String },
    Timeout { after: Duration },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { detail } => write!(f, "hosted planner transport error: {detail}"),
            Self::Status { code, body } => {
                write!(f, "hosted planner returned HTTP {code}: {body}")
            }
            Self::MalformedResponse { detail } => {
                write!(f, "hosted planner returned malformed output: {detail}")
            }
            Self::Timeout { after } => {
                write!(f, "hosted planner timed out after {}ms", after.as_millis())
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// What the caller sends to the hosted tier: the raw command plus just enough
/// board context for the model to reference real objects.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub command: String,
    pub board_summary: String,
    pub selected_object_ids: Vec<ObjectId>,
}

/// Outcome of a hosted call. `Planned` carries raw tool-call JSON; the
/// normalizer turns it into canonical calls afterwards.
#[derive(Debug, Clone)]
pub enum HostedOutcome {
    Planned { name: String, raw_calls: Vec<Value> },
    Declined { message: String },
}

#[async_trait]
pub trait HostedPlanner: Send + Sync {
    /// Upper bound on what one call may cost, used to size the budget
    /// reservation before the request goes out.
    fn estimated_request_cost_usd(&self) -> f64;

    async fn propose(&self, request: &PlanRequest) -> Result<(HostedOutcome, LlmUsage), LlmError>;
}

/// Per-1k-token rates for the configured model.
#[derive(Debug, Clone, Copy)]
pub struct LlmPricing {
    pub prompt_usd_per_1k: f64,
    pub completion_usd_per_1k: f64,
}

impl LlmPricing {
    pub fn cost_usd(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 / 1000.0) * self.prompt_usd_per_1k
            + (completion_tokens as f64 / 1000.0) * self.completion_usd_per_1k
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_completion_tokens: u32,
    pub timeout: Duration,
    pub pricing: LlmPricing,
}

/// Planner backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiPlanner {
    http: reqwest::Client,
    config: OpenAiConfig,
}

const SYSTEM_PROMPT: &str = "\
You translate a natural-language whiteboard command into a JSON plan.\n\
Respond with a single JSON object and nothing else:\n\
  {\"planned\": true, \"name\": \"<short plan name>\", \"toolCalls\": [...]}\n\
or, when the command cannot be expressed with the available tools:\n\
  {\"planned\": false, \"message\": \"<one-sentence reason>\"}\n\
Available tools (camelCase \"tool\" field plus flat arguments):\n\
createStickyNote{x,y,color?,text?}, createStickyBatch{count,columns?,gap?,x?,y?,color?},\n\
createShape{shape,x,y,width,height,color?,text?}, createGridContainer{x,y,width,height,columns,gap?,sections?,title?},\n\
createFrame{x,y,width,height,title?}, createConnector{fromObjectId,toObjectId,style?,color?},\n\
moveObjects{objectIds,dx?,dy?,to?}, resizeObject{objectId,width,height}, updateText{objectId,text},\n\
changeColor{objectIds,color}, deleteObjects{objectIds}, arrangeObjectsInGrid{objectIds,columns,gapX?,gapY?,origin?},\n\
alignObjects{objectIds,edge}, distributeObjects{objectIds,axis}, fitFrameToContents{frameId,padding?}.\n\
Plans are capped at 50 operations and sticky batches at 50 notes. Never invent object ids.";

impl OpenAiPlanner {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| LlmError::Http { detail: err.to_string() })?;
        Ok(Self { http, config })
    }

    fn user_prompt(request: &PlanRequest) -> String {
        let selection = if request.selected_object_ids.is_empty() {
            "none".to_owned()
        } else {
            request
                .selected_object_ids
                .iter()
                .map(|id| id.as_str().to_owned())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Command: {}\nBoard:\n{}\nSelected object ids: {}",
            request.command, request.board_summary, selection
        )
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct Proposal {
    planned: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "toolCalls")]
    tool_calls: Vec<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl HostedPlanner for OpenAiPlanner {
    fn estimated_request_cost_usd(&self) -> f64 {
        // Prompt size is bounded by the board summary cap, completions by the
        // configured token limit.
        self.config
            .pricing
            .cost_usd(4_000, u64::from(self.config.max_completion_tokens))
    }

    async fn propose(&self, request: &PlanRequest) -> Result<(HostedOutcome, LlmUsage), LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_completion_tokens,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::user_prompt(request) },
            ],
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout { after: self.config.timeout }
                } else {
                    LlmError::Http { detail: err.to_string() }
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { code: status.as_u16(), body });
        }
        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|err| LlmError::MalformedResponse { detail: err.to_string() })?;
        let content = chat
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| LlmError::MalformedResponse {
                detail: "response carries no message content".to_owned(),
            })?;
        let proposal: Proposal = serde_json::from_str(content.trim())
            .map_err(|err| LlmError::MalformedResponse { detail: err.to_string() })?;

        let chat_usage = chat.usage.unwrap_or_default();
        let usage = LlmUsage {
            prompt_tokens: chat_usage.prompt_tokens,
            completion_tokens: chat_usage.completion_tokens,
            cost_usd: self
                .config
                .pricing
                .cost_usd(chat_usage.prompt_tokens, chat_usage.completion_tokens),
        };
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            cost_usd = usage.cost_usd,
            "hosted planner responded"
        );

        let outcome = if proposal.planned {
            HostedOutcome::Planned {
                name: proposal.name.unwrap_or_else(|| "hosted plan".to_owned()),
                raw_calls: proposal.tool_calls,
            }
        } else {
            HostedOutcome::Declined {
                message: proposal
                    .message
                    .unwrap_or_else(|| "the model could not plan this command".to_owned()),
            }
        };
        Ok((outcome, usage))
    }
}

/// Scripted planner for tests. Pops queued outcomes in order and records the
/// requests it saw.
#[derive(Default)]
pub struct StubHostedPlanner {
    outcomes: std::sync::Mutex<Vec<Result<(HostedOutcome, LlmUsage), LlmError>>>,
    requests: std::sync::Mutex<Vec<PlanRequest>>,
    estimated_cost_usd: f64,
}

impl StubHostedPlanner {
    pub fn new(estimated_cost_usd: f64) -> Self {
        Self { estimated_cost_usd, ..Self::default() }
    }

    pub fn push(&self, outcome: Result<(HostedOutcome, LlmUsage), LlmError>) {
        self.outcomes.lock().expect("stub lock").push(outcome);
    }

    pub fn seen_requests(&self) -> Vec<PlanRequest> {
        self.requests.lock().expect("stub lock").clone()
    }
}

#[async_trait]
impl HostedPlanner for StubHostedPlanner {
    fn estimated_request_cost_usd(&self) -> f64 {
        self.estimated_cost_usd
    }

    async fn propose(&self, request: &PlanRequest) -> Result<(HostedOutcome, LlmUsage), LlmError> {
        self.requests.lock().expect("stub lock").push(request.clone());
        let mut outcomes = self.outcomes.lock().expect("stub lock");
        if outcomes.is_empty() {
            return Err(LlmError::Http { detail: "stub has no queued outcome".to_owned() });
        }
        outcomes.remove(0)
    }
}
