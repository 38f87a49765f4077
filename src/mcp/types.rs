// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::llm::LlmUsage;
use crate::model::{BoardObject, SelectionUpdate};
use crate::orchestrator::{CommandResponse, ExecutionSummary};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewportParam {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardCommandParams {
    pub board_id: String,
    /// Natural-language command, e.g. "add 5 yellow stickies on the left".
    pub message: String,
    /// Acting user; edit access is checked against this id when present.
    pub user_id: Option<String>,
    /// Explicit selection for this command. When omitted, the selection last
    /// reported for this board is used.
    pub selected_object_ids: Option<Vec<String>>,
    pub viewport: Option<ViewportParam>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct McpLlmUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

impl From<LlmUsage> for McpLlmUsage {
    fn from(usage: LlmUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            cost_usd: usage.cost_usd,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct McpExecutionSummary {
    pub intent: String,
    pub mode: String,
    pub planned: bool,
    pub mcp_used: bool,
    pub fallback_used: bool,
    pub tool_calls: Vec<String>,
    pub objects_created: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_ai: Option<McpLlmUsage>,
}

impl From<ExecutionSummary> for McpExecutionSummary {
    fn from(execution: ExecutionSummary) -> Self {
        Self {
            intent: execution.intent,
            mode: execution.mode.to_owned(),
            planned: execution.planned,
            mcp_used: execution.mcp_used,
            fallback_used: execution.fallback_used,
            tool_calls: execution.tool_calls.iter().map(|name| (*name).to_owned()).collect(),
            objects_created: execution.objects_created as u64,
            open_ai: execution.open_ai.map(McpLlmUsage::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct McpSelectionUpdate {
    /// `replace` or `clear`.
    pub mode: String,
    pub object_ids: Vec<String>,
}

impl From<&SelectionUpdate> for McpSelectionUpdate {
    fn from(update: &SelectionUpdate) -> Self {
        match update {
            SelectionUpdate::Replace { object_ids } => Self {
                mode: "replace".to_owned(),
                object_ids: object_ids.iter().map(|id| id.as_str().to_owned()).collect(),
            },
            SelectionUpdate::Clear => Self { mode: "clear".to_owned(), object_ids: Vec::new() },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardCommandResponse {
    pub assistant_message: String,
    pub trace_id: String,
    pub provider: String,
    pub execution: McpExecutionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_update: Option<McpSelectionUpdate>,
}

impl From<CommandResponse> for BoardCommandResponse {
    fn from(response: CommandResponse) -> Self {
        Self {
            assistant_message: response.assistant_message,
            trace_id: response.trace_id,
            provider: response.provider.to_owned(),
            execution: McpExecutionSummary::from(response.execution),
            selection_update: response.selection_update.as_ref().map(McpSelectionUpdate::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub board_id: String,
    pub objects: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardListResponse {
    pub boards: Vec<BoardSummary>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardObjectsParams {
    pub board_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct McpGridMeta {
    pub columns: u32,
    pub gap_x: f64,
    pub gap_y: f64,
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct McpConnectorMeta {
    pub from_object_id: String,
    pub to_object_id: String,
    pub from_anchor: String,
    pub to_anchor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct McpBoardObject {
    pub object_id: String,
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub color: String,
    pub text: String,
    pub z_index: i64,
    pub updated_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<McpGridMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<McpConnectorMeta>,
}

impl From<&BoardObject> for McpBoardObject {
    fn from(object: &BoardObject) -> Self {
        Self {
            object_id: object.id().as_str().to_owned(),
            kind: object.kind().label().to_owned(),
            x: object.x(),
            y: object.y(),
            width: object.width(),
            height: object.height(),
            rotation: object.rotation(),
            color: object.color().to_owned(),
            text: object.text().to_owned(),
            z_index: object.z_index(),
            updated_at_ms: object.updated_at_ms(),
            grid: object.grid().map(|grid| McpGridMeta {
                columns: grid.columns,
                gap_x: grid.gap_x,
                gap_y: grid.gap_y,
                sections: grid.sections.clone(),
            }),
            connector: object.connector().map(|connector| McpConnectorMeta {
                from_object_id: connector.from_object_id.as_str().to_owned(),
                to_object_id: connector.to_object_id.as_str().to_owned(),
                from_anchor: connector.from_anchor.label().to_owned(),
                to_anchor: connector.to_anchor.label().to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardObjectsResponse {
    pub board_id: String,
    pub objects: Vec<McpBoardObject>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardSelectionParams {
    pub board_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardSelectionResponse {
    pub board_id: String,
    pub object_ids: Vec<String>,
}
