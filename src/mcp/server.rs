// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt};
use tokio::sync::Mutex;

use crate::exec::ExecError;
use crate::model::{BoardId, ObjectId, SelectionUpdate, UserId, ViewportBounds};
use crate::orchestrator::{CommandRequest, Orchestrator, OrchestratorError};
use crate::store::BoardStore;

use super::types::*;

/// MCP front door for the command pipeline.
///
/// Selection is tracked per board between calls: a `selectionUpdate` in a
/// command response becomes the default selection for the next command on
/// that board, so agents can say "select the red stickies" and then "move
/// them down" across two calls.
#[derive(Clone)]
pub struct OndineMcp {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn BoardStore>,
    selection: Arc<Mutex<BTreeMap<BoardId, Vec<ObjectId>>>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl OndineMcp {
    pub fn new(orchestrator: Orchestrator, store: Arc<dyn BoardStore>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            store,
            selection: Arc::new(Mutex::new(BTreeMap::new())),
            tool_router: Self::tool_router(),
        }
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    /// Run a natural-language board command through the planning pipeline;
    /// the response reports which provider planned it and what was executed.
    #[tool(name = "board.command")]
    async fn board_command(
        &self,
        params: Parameters<BoardCommandParams>,
    ) -> Result<Json<BoardCommandResponse>, ErrorData> {
        let BoardCommandParams { board_id, message, user_id, selected_object_ids, viewport } =
            params.0;

        let board_id = parse_board_id(&board_id)?;
        let user_id = match user_id {
            Some(raw) => Some(UserId::new(raw.clone()).map_err(|err| {
                ErrorData::invalid_params(
                    format!("invalid userId: {err}"),
                    Some(serde_json::json!({ "userId": raw })),
                )
            })?),
            None => None,
        };

        let selected_object_ids = match selected_object_ids {
            Some(raw_ids) => parse_object_ids(&raw_ids)?,
            None => self.selection.lock().await.get(&board_id).cloned().unwrap_or_default(),
        };

        let viewport_bounds = viewport.map(|viewport| ViewportBounds {
            left: viewport.left,
            top: viewport.top,
            width: viewport.width,
            height: viewport.height,
        });

        let request = CommandRequest {
            board_id: board_id.clone(),
            user_id,
            message,
            selected_object_ids,
            viewport_bounds,
        };
        let response = self.orchestrator.handle_command(request).await.map_err(map_error)?;

        if let Some(update) = &response.selection_update {
            let mut selection = self.selection.lock().await;
            match update {
                SelectionUpdate::Replace { object_ids } => {
                    selection.insert(board_id, object_ids.clone());
                }
                SelectionUpdate::Clear => {
                    selection.remove(&board_id);
                }
            }
        }

        Ok(Json(BoardCommandResponse::from(response)))
    }

    /// List known boards with their object counts; start here, then call
    /// `board.objects` before issuing commands that reference existing objects.
    #[tool(name = "board.list")]
    async fn board_list(&self) -> Result<Json<BoardListResponse>, ErrorData> {
        let board_ids = self.store.list_boards().await.map_err(store_error)?;
        let mut boards = Vec::with_capacity(board_ids.len());
        for board_id in board_ids {
            let objects = self.store.list_objects(&board_id).await.map_err(store_error)?;
            boards.push(BoardSummary {
                board_id: board_id.as_str().to_owned(),
                objects: objects.len() as u64,
            });
        }
        Ok(Json(BoardListResponse { boards }))
    }

    /// Read every object on a board, including grid and connector metadata.
    #[tool(name = "board.objects")]
    async fn board_objects(
        &self,
        params: Parameters<BoardObjectsParams>,
    ) -> Result<Json<BoardObjectsResponse>, ErrorData> {
        let board_id = parse_board_id(&params.0.board_id)?;
        let objects = self.store.list_objects(&board_id).await.map_err(store_error)?;
        Ok(Json(BoardObjectsResponse {
            board_id: board_id.as_str().to_owned(),
            objects: objects.iter().map(McpBoardObject::from).collect(),
        }))
    }

    /// Read the selection last reported for a board by `board.command`.
    #[tool(name = "board.selection")]
    async fn board_selection(
        &self,
        params: Parameters<BoardSelectionParams>,
    ) -> Result<Json<BoardSelectionResponse>, ErrorData> {
        let board_id = parse_board_id(&params.0.board_id)?;
        let selection = self.selection.lock().await;
        let object_ids = selection
            .get(&board_id)
            .map(|ids| ids.iter().map(|id| id.as_str().to_owned()).collect())
            .unwrap_or_default();
        Ok(Json(BoardSelectionResponse { board_id: board_id.as_str().to_owned(), object_ids }))
    }
}

fn parse_board_id(raw: &str) -> Result<BoardId, ErrorData> {
    BoardId::new(raw).map_err(|err| {
        ErrorData::invalid_params(
            format!("invalid boardId: {err}"),
            Some(serde_json::json!({ "boardId": raw })),
        )
    })
}

fn parse_object_ids(raw_ids: &[String]) -> Result<Vec<ObjectId>, ErrorData> {
    raw_ids
        .iter()
        .map(|raw| {
            ObjectId::new(raw.clone()).map_err(|err| {
                ErrorData::invalid_params(
                    format!("invalid object id: {err}"),
                    Some(serde_json::json!({ "objectId": raw })),
                )
            })
        })
        .collect()
}

fn store_error(err: crate::store::StoreError) -> ErrorData {
    ErrorData::internal_error(format!("board storage failed: {err}"), None)
}

fn map_error(err: OrchestratorError) -> ErrorData {
    match &err {
        OrchestratorError::Unauthorized { board_id } => ErrorData::invalid_request(
            err.to_string(),
            Some(serde_json::json!({ "boardId": board_id.as_str() })),
        ),
        OrchestratorError::BoardBusy { board_id } => ErrorData::invalid_request(
            err.to_string(),
            Some(serde_json::json!({ "boardId": board_id.as_str() })),
        ),
        OrchestratorError::Execution(ExecError::ObjectNotFound { object_id }) => {
            ErrorData::resource_not_found(
                err.to_string(),
                Some(serde_json::json!({ "objectId": object_id.as_str() })),
            )
        }
        OrchestratorError::Execution(ExecError::Store(_)) => {
            ErrorData::internal_error(err.to_string(), None)
        }
        OrchestratorError::Execution(_) => ErrorData::invalid_params(err.to_string(), None),
        OrchestratorError::Timeout { .. }
        | OrchestratorError::StrictModeFailed { .. }
        | OrchestratorError::Store(_) => ErrorData::internal_error(err.to_string(), None),
    }
}

#[tool_handler]
impl ServerHandler for OndineMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Ondine board command server (tools: board.command, board.list, board.objects, board.selection). Use board.command with a natural-language message to create, arrange, restyle, or delete board objects; the read tools inspect boards between commands."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::budget::BudgetController;
    use crate::orchestrator::{AllowAll, NullAuditSink, PlannerMode};
    use crate::plan::PlanLimits;
    use crate::store::{BoardLocks, MemoryBoardStore};

    fn server() -> OndineMcp {
        let store: Arc<dyn BoardStore> = Arc::new(MemoryBoardStore::new());
        let orchestrator = Orchestrator::new(
            store.clone(),
            BoardLocks::new(),
            BudgetController::new(1.0),
            None,
            None,
            Arc::new(AllowAll),
            Arc::new(NullAuditSink),
            PlannerMode::DeterministicOnly,
            PlanLimits::default(),
            Duration::from_secs(5),
        );
        OndineMcp::new(orchestrator, store)
    }

    fn command(board_id: &str, message: &str) -> BoardCommandParams {
        BoardCommandParams {
            board_id: board_id.to_owned(),
            message: message.to_owned(),
            user_id: None,
            selected_object_ids: None,
            viewport: None,
        }
    }

    #[tokio::test]
    async fn command_creates_objects_and_read_tools_see_them() {
        let server = server();

        let response = server
            .board_command(Parameters(command("b1", "add 3 stickies")))
            .await
            .expect("command");
        assert!(response.0.execution.planned);
        assert_eq!(response.0.execution.objects_created, 3);

        let boards = server.board_list().await.expect("list").0.boards;
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].board_id, "b1");
        assert_eq!(boards[0].objects, 3);

        let objects = server
            .board_objects(Parameters(BoardObjectsParams { board_id: "b1".to_owned() }))
            .await
            .expect("objects")
            .0
            .objects;
        assert_eq!(objects.len(), 3);
        assert!(objects.iter().all(|object| object.kind == "sticky"));
    }

    #[tokio::test]
    async fn selection_carries_over_between_commands() {
        let server = server();

        server.board_command(Parameters(command("b1", "add a sticky"))).await.expect("create");
        let select = server
            .board_command(Parameters(command("b1", "select all")))
            .await
            .expect("select");
        let update = select.0.selection_update.expect("selection update");
        assert_eq!(update.mode, "replace");
        assert_eq!(update.object_ids.len(), 1);

        let selection = server
            .board_selection(Parameters(BoardSelectionParams { board_id: "b1".to_owned() }))
            .await
            .expect("selection")
            .0;
        assert_eq!(selection.object_ids, update.object_ids);

        // The remembered selection feeds the next command.
        let delete = server
            .board_command(Parameters(command("b1", "delete the selected objects")))
            .await
            .expect("delete");
        assert!(delete.0.execution.planned);

        let boards = server.board_list().await.expect("list").0.boards;
        assert!(boards.is_empty());
    }

    #[tokio::test]
    async fn rejects_malformed_board_id() {
        let server = server();
        let err = server
            .board_command(Parameters(command("bad/id", "add a sticky")))
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(err.message.contains("invalid boardId"));
    }

    #[tokio::test]
    async fn unknown_board_reads_as_empty() {
        let server = server();
        let objects = server
            .board_objects(Parameters(BoardObjectsParams { board_id: "nope".to_owned() }))
            .await
            .expect("objects")
            .0
            .objects;
        assert!(objects.is_empty());
    }
}
