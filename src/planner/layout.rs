// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Layout intents: arrange, align, distribute, move, resize, recolor, edit
//! text, and fit-frame. Targets come from the selection or from a type/color
//! filter named in the command ("the red stickies").

use crate::model::{BoardObject, ObjectId, ObjectKind};
use crate::plan::{ExecutionPlan, PointArg, ToolCall};

use super::extract::{self, ViewportSide};
use super::{intent, PlanOutcome, PlannerContext};

const DEFAULT_MOVE_DELTA: f64 = 100.0;
const VIEWPORT_EDGE_PADDING: f64 = 40.0;

pub(super) fn try_plan(
    text: &str,
    original: &str,
    ctx: &PlannerContext<'_>,
) -> Option<PlanOutcome> {
    if text.contains("arrange") || text.contains("organize") || text.contains("lay out") {
        return Some(plan_arrange(text, ctx));
    }
    if text.contains("align") {
        return Some(plan_align(text, ctx));
    }
    if text.contains("distribute") || (text.contains("space") && text.contains("evenly")) {
        return Some(plan_distribute(text, ctx));
    }
    if text.contains("fit") && text.contains("frame") {
        return Some(plan_fit_frame(ctx));
    }
    if text.contains("resize") {
        return Some(plan_resize(text, ctx));
    }
    if text.contains("move") || text.contains("shift") || text.contains("push") {
        return Some(plan_move(text, ctx));
    }
    if text.contains("text") && (text.contains("change") || text.contains("set") || text.contains("update")) {
        return Some(plan_update_text(original, ctx));
    }
    if let Some(outcome) = try_change_color(text, ctx) {
        return Some(outcome);
    }
    None
}

/// Type/color filter over the whole board, used when the command names its
/// targets instead of relying on the selection.
fn filter_targets(ctx: &PlannerContext<'_>, kind: Option<ObjectKind>, color: Option<&str>) -> Vec<ObjectId> {
    ctx.objects
        .iter()
        .filter(|object| match kind {
            Some(ObjectKind::ConnectorElbow) | Some(ObjectKind::ConnectorStraight) => {
                object.kind().is_connector()
            }
            Some(kind) => object.kind() == kind,
            None => true,
        })
        .filter(|object| match color {
            Some(color) => object.color().eq_ignore_ascii_case(color),
            None => true,
        })
        .map(|object| object.id().clone())
        .collect()
}

/// Resolves the objects a layout command applies to: a named filter first,
/// then the selection.
fn resolve_targets(
    text: &str,
    ctx: &PlannerContext<'_>,
    filter_color: Option<&str>,
) -> Result<Vec<ObjectId>, String> {
    let kind = extract::kind_keyword(text);
    if kind.is_some() || filter_color.is_some() {
        let targets = filter_targets(ctx, kind, filter_color);
        if targets.is_empty() {
            return Err("No objects on the board match that description.".to_owned());
        }
        return Ok(targets);
    }
    if ctx.selected_ids.is_empty() {
        return Err("Nothing is selected. Select the objects first or name them, like \
                    \"the red stickies\"."
            .to_owned());
    }
    Ok(ctx.selected_ids.to_vec())
}

fn check_layout_cap(ctx: &PlannerContext<'_>, count: usize) -> Option<String> {
    (count > ctx.limits.max_layout_objects).then(|| {
        format!(
            "That would touch {count} objects; layout commands handle at most {}.",
            ctx.limits.max_layout_objects
        )
    })
}

fn plan_arrange(text: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let targets = match resolve_targets(text, ctx, None) {
        Ok(targets) => targets,
        Err(message) => return PlanOutcome::guidance(intent::ARRANGE_GRID, message),
    };
    if targets.len() < 2 {
        return PlanOutcome::guidance(
            intent::ARRANGE_GRID,
            "Arranging needs at least two objects.",
        );
    }
    if let Some(message) = check_layout_cap(ctx, targets.len()) {
        return PlanOutcome::guidance(intent::ARRANGE_GRID, message);
    }
    let columns = extract::columns(text)
        .unwrap_or(ctx.limits.default_columns)
        .min(targets.len() as u32)
        .max(1);
    let gap = extract::gap(text).unwrap_or(ctx.limits.sticky_gap);
    let message = format!("Arranging {} objects into {columns} column(s).", targets.len());
    let call = ToolCall::ArrangeObjectsInGrid {
        object_ids: targets,
        columns,
        gap_x: gap,
        gap_y: gap,
        origin: None,
    };
    PlanOutcome::planned(intent::ARRANGE_GRID, message, ExecutionPlan::new("arrange in grid", vec![call]))
}

fn plan_align(text: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let targets = match resolve_targets(text, ctx, None) {
        Ok(targets) => targets,
        Err(message) => return PlanOutcome::guidance(intent::ALIGN, message),
    };
    if targets.len() < 2 {
        return PlanOutcome::guidance(intent::ALIGN, "Aligning needs at least two objects.");
    }
    if let Some(message) = check_layout_cap(ctx, targets.len()) {
        return PlanOutcome::guidance(intent::ALIGN, message);
    }
    let Some(edge) = extract::alignment(text) else {
        return PlanOutcome::guidance(
            intent::ALIGN,
            "Which way? Try \"align left\", \"align top\", or \"align center\".",
        );
    };
    let message = format!("Aligning {} objects.", targets.len());
    let call = ToolCall::AlignObjects { object_ids: targets, edge };
    PlanOutcome::planned(intent::ALIGN, message, ExecutionPlan::new("align objects", vec![call]))
}

fn plan_distribute(text: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let targets = match resolve_targets(text, ctx, None) {
        Ok(targets) => targets,
        Err(message) => return PlanOutcome::guidance(intent::DISTRIBUTE, message),
    };
    if targets.len() < 3 {
        return PlanOutcome::guidance(
            intent::DISTRIBUTE,
            "Distributing needs at least three objects.",
        );
    }
    if let Some(message) = check_layout_cap(ctx, targets.len()) {
        return PlanOutcome::guidance(intent::DISTRIBUTE, message);
    }
    let Some(axis) = extract::distribution_axis(text) else {
        return PlanOutcome::guidance(
            intent::DISTRIBUTE,
            "Distribute horizontally or vertically?",
        );
    };
    let message = format!("Distributing {} objects evenly.", targets.len());
    let call = ToolCall::DistributeObjects { object_ids: targets, axis };
    PlanOutcome::planned(
        intent::DISTRIBUTE,
        message,
        ExecutionPlan::new("distribute objects", vec![call]),
    )
}

fn plan_fit_frame(ctx: &PlannerContext<'_>) -> PlanOutcome {
    let selected_frames: Vec<&BoardObject> = ctx
        .selected_objects()
        .into_iter()
        .filter(|object| object.kind() == ObjectKind::Frame)
        .collect();
    let frame = match selected_frames.as_slice() {
        [frame] => *frame,
        [] => {
            let frames: Vec<&BoardObject> = ctx
                .objects
                .iter()
                .filter(|object| object.kind() == ObjectKind::Frame)
                .collect();
            match frames.as_slice() {
                [frame] => *frame,
                [] => {
                    return PlanOutcome::guidance(
                        intent::FIT_FRAME,
                        "There is no frame on this board.",
                    );
                }
                _ => {
                    return PlanOutcome::guidance(
                        intent::FIT_FRAME,
                        "This board has several frames; select the one to fit.",
                    );
                }
            }
        }
        _ => {
            return PlanOutcome::guidance(
                intent::FIT_FRAME,
                "More than one frame is selected; select just one.",
            );
        }
    };
    let call = ToolCall::FitFrameToContents { frame_id: frame.id().clone(), padding: 24.0 };
    PlanOutcome::planned(
        intent::FIT_FRAME,
        "Fitting the frame to its contents.",
        ExecutionPlan::new("fit frame", vec![call]),
    )
}

fn plan_resize(text: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let Some((width, height)) = extract::size(text) else {
        return PlanOutcome::guidance(
            intent::RESIZE,
            "What size? Try \"resize to 300 x 200\".",
        );
    };
    let targets = match resolve_targets(text, ctx, None) {
        Ok(targets) => targets,
        Err(message) => return PlanOutcome::guidance(intent::RESIZE, message),
    };
    let [object_id] = targets.as_slice() else {
        return PlanOutcome::guidance(
            intent::RESIZE,
            "Resizing works on exactly one object; select just one.",
        );
    };
    let call = ToolCall::ResizeObject { object_id: object_id.clone(), width, height };
    PlanOutcome::planned(
        intent::RESIZE,
        format!("Resizing to {width} x {height}."),
        ExecutionPlan::new("resize object", vec![call]),
    )
}

fn plan_move(text: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let colors = extract::color_keywords(text);
    let targets = match resolve_targets(text, ctx, colors.first().copied()) {
        Ok(targets) => targets,
        Err(message) => return PlanOutcome::guidance(intent::MOVE, message),
    };
    if let Some(message) = check_layout_cap(ctx, targets.len()) {
        return PlanOutcome::guidance(intent::MOVE, message);
    }

    // Destination forms, most specific first: explicit point, viewport side,
    // direction word with optional "by N".
    if let Some((x, y)) = extract::coordinates(text) {
        let message = format!("Moving {} object(s) to ({x}, {y}).", targets.len());
        let call = ToolCall::MoveObjects {
            object_ids: targets,
            dx: 0.0,
            dy: 0.0,
            to: Some(PointArg { x, y }),
        };
        return PlanOutcome::planned(intent::MOVE, message, ExecutionPlan::new("move objects", vec![call]));
    }

    if let Some(side) = extract::viewport_side(text) {
        let Some(viewport) = ctx.viewport else {
            return PlanOutcome::guidance(
                intent::MOVE,
                "I don't know what's on screen, so I can't move things to a screen edge.",
            );
        };
        let objects: Vec<&BoardObject> =
            targets.iter().filter_map(|id| ctx.object(id)).collect();
        let (width, height) = group_extent(&objects);
        let x = match side {
            ViewportSide::Left => viewport.left + VIEWPORT_EDGE_PADDING,
            ViewportSide::Right => viewport.right() - VIEWPORT_EDGE_PADDING - width,
            _ => viewport.center_x() - width / 2.0,
        };
        let y = match side {
            ViewportSide::Top => viewport.top + VIEWPORT_EDGE_PADDING,
            ViewportSide::Bottom => viewport.bottom() - VIEWPORT_EDGE_PADDING - height,
            _ => viewport.center_y() - height / 2.0,
        };
        let message = format!("Moving {} object(s).", targets.len());
        let call = ToolCall::MoveObjects {
            object_ids: targets,
            dx: 0.0,
            dy: 0.0,
            to: Some(PointArg { x, y }),
        };
        return PlanOutcome::planned(intent::MOVE, message, ExecutionPlan::new("move objects", vec![call]));
    }

    let amount = extract::move_amount(text).unwrap_or(DEFAULT_MOVE_DELTA);
    let (dx, dy) = if text.contains("left") {
        (-amount, 0.0)
    } else if text.contains("right") {
        (amount, 0.0)
    } else if text.contains("up") {
        (0.0, -amount)
    } else if text.contains("down") {
        (0.0, amount)
    } else {
        return PlanOutcome::guidance(
            intent::MOVE,
            "Which way? Try \"move them right by 100\" or \"move to (400, 200)\".",
        );
    };
    let message = format!("Moving {} object(s).", targets.len());
    let call = ToolCall::MoveObjects { object_ids: targets, dx, dy, to: None };
    PlanOutcome::planned(intent::MOVE, message, ExecutionPlan::new("move objects", vec![call]))
}

fn group_extent(objects: &[&BoardObject]) -> (f64, f64) {
    let mut left = f64::INFINITY;
    let mut top = f64::INFINITY;
    let mut right = f64::NEG_INFINITY;
    let mut bottom = f64::NEG_INFINITY;
    for object in objects {
        left = left.min(object.x());
        top = top.min(object.y());
        right = right.max(object.right());
        bottom = bottom.max(object.bottom());
    }
    if objects.is_empty() {
        (0.0, 0.0)
    } else {
        (right - left, bottom - top)
    }
}

fn plan_update_text(original: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let Some(payload) = extract::payload_text(original) else {
        return PlanOutcome::guidance(
            intent::UPDATE_TEXT,
            "What should the text say? Put it in quotes.",
        );
    };
    let [object_id] = ctx.selected_ids else {
        return PlanOutcome::guidance(
            intent::UPDATE_TEXT,
            "Select exactly one object to change its text.",
        );
    };
    let call = ToolCall::UpdateText { object_id: object_id.clone(), text: payload };
    PlanOutcome::planned(
        intent::UPDATE_TEXT,
        "Updating the text.",
        ExecutionPlan::new("update text", vec![call]),
    )
}

fn try_change_color(text: &str, ctx: &PlannerContext<'_>) -> Option<PlanOutcome> {
    let verb = text.contains("make")
        || text.contains("color")
        || text.contains("colour")
        || text.contains("paint")
        || text.contains("turn")
        || text.contains("recolor");
    if !verb {
        return None;
    }
    let colors = extract::color_keywords(text);
    let new_color = (*colors.last()?).to_owned();
    let filter_color = (colors.len() >= 2).then(|| colors[0]);
    let targets = match resolve_targets(text, ctx, filter_color) {
        Ok(targets) => targets,
        Err(message) => return Some(PlanOutcome::guidance(intent::CHANGE_COLOR, message)),
    };
    let message = format!("Recoloring {} object(s) {new_color}.", targets.len());
    let call = ToolCall::ChangeColor { object_ids: targets, color: new_color };
    Some(PlanOutcome::planned(
        intent::CHANGE_COLOR,
        message,
        ExecutionPlan::new("change color", vec![call]),
    ))
}
