// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! The deterministic command planner.
//!
//! [`plan`] is a pure function from (message, board state, selection,
//! viewport) to a [`PlanOutcome`]. It never errors and never touches storage;
//! identical inputs always produce identical output. Intent families are
//! tried in a fixed priority order and the first structural match wins:
//! selection, bulk destruction, creation, layout, read-only synthesis.

pub mod extract;

mod create;
mod layout;
mod synth;

use crate::model::{BoardObject, ObjectId, SelectionUpdate, ViewportBounds};
use crate::plan::{ExecutionPlan, PlanLimits, ToolCall};

/// Intent labels surfaced in responses and audit records.
pub mod intent {
    pub const SELECT_ALL: &str = "select-all";
    pub const SELECT_VISIBLE: &str = "select-visible";
    pub const UNSELECT: &str = "unselect";
    pub const CLEAR_BOARD: &str = "clear-board";
    pub const DELETE_SELECTED: &str = "delete-selected";
    pub const CREATE_STICKY: &str = "create-sticky";
    pub const CREATE_STICKY_BATCH: &str = "create-sticky-batch";
    pub const CREATE_SHAPE: &str = "create-shape";
    pub const CREATE_FRAME: &str = "create-frame";
    pub const CREATE_GRID: &str = "create-grid";
    pub const CREATE_TEMPLATE: &str = "create-template";
    pub const APPEND_TO_GRID: &str = "append-to-grid";
    pub const CREATE_CONNECTOR: &str = "create-connector";
    pub const ARRANGE_GRID: &str = "arrange-grid";
    pub const ALIGN: &str = "align";
    pub const DISTRIBUTE: &str = "distribute";
    pub const MOVE: &str = "move";
    pub const RESIZE: &str = "resize";
    pub const CHANGE_COLOR: &str = "change-color";
    pub const UPDATE_TEXT: &str = "update-text";
    pub const FIT_FRAME: &str = "fit-frame";
    pub const SUMMARIZE: &str = "summarize";
    pub const EXTRACT_ACTIONS: &str = "extract-actions";
    pub const UNSUPPORTED: &str = "unsupported-command";
}

/// Read-only view of everything the planner may consider.
#[derive(Clone, Copy)]
pub struct PlannerContext<'a> {
    pub objects: &'a [BoardObject],
    pub selected_ids: &'a [ObjectId],
    pub viewport: Option<&'a ViewportBounds>,
    pub limits: &'a PlanLimits,
}

impl<'a> PlannerContext<'a> {
    pub fn object(&self, id: &ObjectId) -> Option<&'a BoardObject> {
        self.objects.iter().find(|object| object.id() == id)
    }

    pub fn selected_objects(&self) -> Vec<&'a BoardObject> {
        self.selected_ids.iter().filter_map(|id| self.object(id)).collect()
    }

    pub fn visible_ids(&self) -> Option<Vec<ObjectId>> {
        let viewport = self.viewport?;
        Some(
            self.objects
                .iter()
                .filter(|object| viewport.intersects(object))
                .map(|object| object.id().clone())
                .collect(),
        )
    }

    fn grid_targets(&self) -> Vec<&'a BoardObject> {
        self.objects.iter().filter(|object| object.is_grid_target()).collect()
    }
}

/// Result of one deterministic planning run. `plan` is present for mutating
/// intents; selection and synthesis intents deliver their effect through
/// `selection_update` and `assistant_message` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub planned: bool,
    pub intent: &'static str,
    pub assistant_message: String,
    pub plan: Option<ExecutionPlan>,
    pub selection_update: Option<SelectionUpdate>,
}

impl PlanOutcome {
    pub fn planned(
        intent: &'static str,
        assistant_message: impl Into<String>,
        plan: ExecutionPlan,
    ) -> Self {
        Self {
            planned: true,
            intent,
            assistant_message: assistant_message.into(),
            plan: Some(plan),
            selection_update: None,
        }
    }

    pub fn message_only(intent: &'static str, assistant_message: impl Into<String>) -> Self {
        Self {
            planned: true,
            intent,
            assistant_message: assistant_message.into(),
            plan: None,
            selection_update: None,
        }
    }

    pub fn selection(
        intent: &'static str,
        assistant_message: impl Into<String>,
        update: SelectionUpdate,
    ) -> Self {
        Self {
            planned: true,
            intent,
            assistant_message: assistant_message.into(),
            plan: None,
            selection_update: Some(update),
        }
    }

    pub fn guidance(intent: &'static str, assistant_message: impl Into<String>) -> Self {
        Self {
            planned: false,
            intent,
            assistant_message: assistant_message.into(),
            plan: None,
            selection_update: None,
        }
    }

    pub fn with_selection(mut self, update: SelectionUpdate) -> Self {
        self.selection_update = Some(update);
        self
    }
}

pub fn plan(message: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let original = message.trim();
    let text = original.to_lowercase();
    if text.is_empty() {
        return PlanOutcome::guidance(
            intent::UNSUPPORTED,
            "Tell me what to change on the board, for example \"add 6 yellow stickies\".",
        );
    }
    if let Some(outcome) = try_selection(&text, ctx) {
        return outcome;
    }
    if let Some(outcome) = try_destructive(&text, ctx) {
        return outcome;
    }
    if let Some(outcome) = create::try_plan(&text, original, ctx) {
        return outcome;
    }
    if let Some(outcome) = layout::try_plan(&text, original, ctx) {
        return outcome;
    }
    if let Some(outcome) = synth::try_plan(&text, ctx) {
        return outcome;
    }
    PlanOutcome::guidance(
        intent::UNSUPPORTED,
        "I didn't recognize that command. Try things like \"add 6 yellow stickies\", \
         \"align the selected objects left\", or \"clear the board\".",
    )
}

fn try_selection(text: &str, ctx: &PlannerContext<'_>) -> Option<PlanOutcome> {
    if text.contains("unselect")
        || text.contains("deselect")
        || text.contains("clear selection")
        || text.contains("clear the selection")
    {
        return Some(PlanOutcome::selection(
            intent::UNSELECT,
            "Cleared the selection.",
            SelectionUpdate::Clear,
        ));
    }
    if !text.contains("select") {
        return None;
    }
    if text.contains("visible") || text.contains("on screen") || text.contains("on the screen") {
        let Some(ids) = ctx.visible_ids() else {
            return Some(PlanOutcome::guidance(
                intent::SELECT_VISIBLE,
                "I don't know what's on screen for this request, so I can't select by visibility.",
            ));
        };
        let message = format!("Selected {} visible object(s).", ids.len());
        return Some(PlanOutcome::selection(
            intent::SELECT_VISIBLE,
            message,
            SelectionUpdate::Replace { object_ids: ids },
        ));
    }
    if text.contains("all") || text.contains("everything") {
        let ids: Vec<ObjectId> = ctx.objects.iter().map(|object| object.id().clone()).collect();
        let message = format!("Selected all {} object(s).", ids.len());
        return Some(PlanOutcome::selection(
            intent::SELECT_ALL,
            message,
            SelectionUpdate::Replace { object_ids: ids },
        ));
    }
    None
}

fn try_destructive(text: &str, ctx: &PlannerContext<'_>) -> Option<PlanOutcome> {
    let clear_board = (text.contains("clear") && text.contains("board"))
        || text.contains("delete everything")
        || text.contains("remove everything")
        || text.contains("start over")
        || text.contains("start fresh");
    if clear_board {
        if ctx.objects.is_empty() {
            return Some(PlanOutcome::guidance(intent::CLEAR_BOARD, "The board is already empty."));
        }
        let ids: Vec<ObjectId> = ctx.objects.iter().map(|object| object.id().clone()).collect();
        let message = format!("Clearing the board: deleting {} object(s).", ids.len());
        let plan = ExecutionPlan::new("clear board", vec![ToolCall::DeleteObjects { object_ids: ids }]);
        return Some(
            PlanOutcome::planned(intent::CLEAR_BOARD, message, plan)
                .with_selection(SelectionUpdate::Clear),
        );
    }

    let delete_verb = text.contains("delete") || text.contains("remove");
    let refers_selection = text.contains("selected")
        || text.contains("selection")
        || text.contains("these")
        || text.contains("them")
        || text.contains("this");
    if delete_verb && refers_selection {
        if ctx.selected_ids.is_empty() {
            return Some(PlanOutcome::guidance(
                intent::DELETE_SELECTED,
                "Nothing is selected. Select the objects to delete first.",
            ));
        }
        let message = format!("Deleting {} selected object(s).", ctx.selected_ids.len());
        let plan = ExecutionPlan::new(
            "delete selected",
            vec![ToolCall::DeleteObjects { object_ids: ctx.selected_ids.to_vec() }],
        );
        return Some(
            PlanOutcome::planned(intent::DELETE_SELECTED, message, plan)
                .with_selection(SelectionUpdate::Clear),
        );
    }
    None
}

/// Resolves "the grid" to one container: a selected container wins, then the
/// single container in view, then the sole container on the board. Multiple
/// candidates are never guessed between.
fn resolve_container<'a>(
    ctx: &PlannerContext<'a>,
) -> Result<&'a BoardObject, String> {
    let selected: Vec<&BoardObject> =
        ctx.selected_objects().into_iter().filter(|object| object.is_grid_target()).collect();
    match selected.len() {
        1 => return Ok(selected[0]),
        0 => {}
        _ => return Err("More than one container is selected; select just the one to use.".into()),
    }
    if let Some(viewport) = ctx.viewport {
        let visible: Vec<&BoardObject> = ctx
            .grid_targets()
            .into_iter()
            .filter(|object| viewport.intersects(object))
            .collect();
        if visible.len() == 1 {
            return Ok(visible[0]);
        }
        if visible.len() > 1 {
            return Err(
                "Several containers are in view; select the one you mean and try again.".into()
            );
        }
    }
    let all = ctx.grid_targets();
    match all.len() {
        0 => Err("There is no grid container on this board yet.".into()),
        1 => Ok(all[0]),
        _ => Err("This board has several containers; select the one you mean.".into()),
    }
}

#[cfg(test)]
mod tests;
