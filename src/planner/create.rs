// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Creation intents: single objects, sticky batches, templates, and items
//! appended into grid sections.

use crate::model::BoardObject;
use crate::plan::{ConnectorStyle, ExecutionPlan, ShapeKind, ToolCall};

use super::extract::{self, ViewportSide};
use super::{intent, resolve_container, PlanOutcome, PlannerContext};

const REGION_PADDING: f64 = 40.0;
const FALLBACK_X: f64 = 100.0;
const FALLBACK_Y: f64 = 100.0;

pub(super) fn try_plan(
    text: &str,
    original: &str,
    ctx: &PlannerContext<'_>,
) -> Option<PlanOutcome> {
    if text.contains("connect") {
        return Some(plan_connector(text, ctx));
    }
    if let Some(outcome) = try_template(text, ctx) {
        return Some(outcome);
    }

    let creating = ["create", "add", "make", "draw", "put", "insert"]
        .iter()
        .any(|verb| text.contains(verb));
    if !creating {
        return None;
    }
    if text.contains("section") {
        return Some(plan_append_to_section(text, original, ctx));
    }
    // "make the stickies red" mutates existing objects; leave it to the
    // layout family.
    if refers_to_existing(text) {
        return None;
    }

    let wants_sticky = ["sticky", "stickies", "note", "postit", "post-it"]
        .iter()
        .any(|word| text.contains(word));
    if wants_sticky {
        return Some(plan_stickies(text, original, ctx));
    }
    if text.contains("frame") {
        return Some(plan_frame(text, original, ctx));
    }
    if text.contains("grid") || text.contains("container") {
        return Some(plan_grid_container(text, original, ctx));
    }
    if let Some(shape) = shape_keyword(text) {
        return Some(plan_shape(shape, text, original, ctx));
    }
    None
}

fn refers_to_existing(text: &str) -> bool {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        // Up to two adjectives fit between "the" and the kind word ("the
        // selected red stickies").
        regex::Regex::new(
            r"\bthe\s+(\w+\s+){0,2}(sticky|stickies|notes?|rect(angle)?s?|box(es)?|squares?|circles?|lines?|triangles?|stars?|objects?|shapes?)\b",
        )
        .expect("static pattern compiles")
    })
    .is_match(text)
}

fn shape_keyword(text: &str) -> Option<ShapeKind> {
    if text.contains("rect") || text.contains("box") || text.contains("square") {
        Some(ShapeKind::Rect)
    } else if text.contains("circle") || text.contains("ellipse") {
        Some(ShapeKind::Circle)
    } else if text.contains("line") {
        Some(ShapeKind::Line)
    } else if text.contains("triangle") {
        Some(ShapeKind::Triangle)
    } else if text.contains("star") {
        Some(ShapeKind::Star)
    } else {
        None
    }
}

#[derive(Clone, Copy)]
struct Region {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Region {
    fn from_object(object: &BoardObject) -> Self {
        Self { left: object.x(), top: object.y(), width: object.width(), height: object.height() }
    }
}

/// Places a `cluster_w` x `cluster_h` block inside a region: pinned to the
/// named side, centered otherwise, always clamped to the padded bounds.
fn place_cluster(
    region: Region,
    cluster_w: f64,
    cluster_h: f64,
    side: Option<ViewportSide>,
) -> (f64, f64) {
    let min_x = region.left + REGION_PADDING;
    let max_x = (region.left + region.width - REGION_PADDING - cluster_w).max(min_x);
    let min_y = region.top + REGION_PADDING;
    let max_y = (region.top + region.height - REGION_PADDING - cluster_h).max(min_y);
    let center_x = region.left + (region.width - cluster_w) / 2.0;
    let center_y = region.top + (region.height - cluster_h) / 2.0;
    let (x, y) = match side {
        Some(ViewportSide::Left) => (min_x, center_y),
        Some(ViewportSide::Right) => (max_x, center_y),
        Some(ViewportSide::Top) => (center_x, min_y),
        Some(ViewportSide::Bottom) => (center_x, max_y),
        Some(ViewportSide::Center) | None => (center_x, center_y),
    };
    (x.clamp(min_x, max_x), y.clamp(min_y, max_y))
}

fn plan_stickies(text: &str, original: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let limits = ctx.limits;
    let count = extract::count(text).unwrap_or(1);
    if count == 0 {
        return PlanOutcome::guidance(
            intent::CREATE_STICKY_BATCH,
            "A sticky batch needs a count of at least 1.",
        );
    }
    if count > limits.max_batch_items {
        return PlanOutcome::guidance(
            intent::CREATE_STICKY_BATCH,
            format!(
                "That's more than I can create in one command: up to {} stickies at a time.",
                limits.max_batch_items
            ),
        );
    }
    let color = extract::color_keyword(text);

    if count == 1 {
        let (x, y) = match extract::coordinates(text) {
            Some(point) => point,
            None => match ctx.viewport {
                Some(viewport) => place_cluster(
                    Region {
                        left: viewport.left,
                        top: viewport.top,
                        width: viewport.width,
                        height: viewport.height,
                    },
                    limits.sticky_width,
                    limits.sticky_height,
                    extract::viewport_side(text),
                ),
                None => (FALLBACK_X, FALLBACK_Y),
            },
        };
        let call = ToolCall::CreateStickyNote {
            x,
            y,
            color: color.map(str::to_owned),
            text: extract::payload_text(original),
        };
        return PlanOutcome::planned(
            intent::CREATE_STICKY,
            match color {
                Some(color) => format!("Adding a {color} sticky note."),
                None => "Adding a sticky note.".to_owned(),
            },
            ExecutionPlan::new("create sticky", vec![call]),
        );
    }

    let columns = extract::columns(text).unwrap_or(limits.default_columns).min(count).max(1);
    let gap = extract::gap(text).unwrap_or(limits.sticky_gap);
    let rows = count.div_ceil(columns);
    let cluster_w =
        f64::from(columns) * limits.sticky_width + f64::from(columns - 1) * gap;
    let cluster_h = f64::from(rows) * limits.sticky_height + f64::from(rows - 1) * gap;

    let origin = if let Some(point) = extract::coordinates(text) {
        Ok(point)
    } else if text.contains("grid") || text.contains("container") {
        resolve_container(ctx).map(|container| {
            place_cluster(Region::from_object(container), cluster_w, cluster_h, None)
        })
    } else if let Some(viewport) = ctx.viewport {
        Ok(place_cluster(
            Region {
                left: viewport.left,
                top: viewport.top,
                width: viewport.width,
                height: viewport.height,
            },
            cluster_w,
            cluster_h,
            extract::viewport_side(text),
        ))
    } else {
        Ok((FALLBACK_X, FALLBACK_Y))
    };
    let (x, y) = match origin {
        Ok(point) => point,
        Err(message) => return PlanOutcome::guidance(intent::CREATE_STICKY_BATCH, message),
    };

    let call = ToolCall::CreateStickyBatch {
        count,
        columns,
        gap,
        x,
        y,
        color: color.map(str::to_owned),
    };
    PlanOutcome::planned(
        intent::CREATE_STICKY_BATCH,
        format!(
            "Creating {count} {} sticky notes in {columns} column(s).",
            color.unwrap_or("yellow")
        ),
        ExecutionPlan::new("create sticky batch", vec![call]),
    )
}

fn plan_shape(
    shape: ShapeKind,
    text: &str,
    original: &str,
    ctx: &PlannerContext<'_>,
) -> PlanOutcome {
    let (width, height) = extract::size(text).unwrap_or(match shape {
        ShapeKind::Rect => (200.0, 140.0),
        ShapeKind::Circle => (140.0, 140.0),
        ShapeKind::Line => (200.0, 8.0),
        ShapeKind::Triangle => (160.0, 140.0),
        ShapeKind::Star => (150.0, 150.0),
    });
    let (x, y) = creation_point(text, ctx, width, height);
    let call = ToolCall::CreateShape {
        shape,
        x,
        y,
        width,
        height,
        color: extract::color_keyword(text).map(str::to_owned),
        text: extract::payload_text(original),
    };
    PlanOutcome::planned(
        intent::CREATE_SHAPE,
        format!("Adding a {}.", shape_label(shape)),
        ExecutionPlan::new("create shape", vec![call]),
    )
}

fn shape_label(shape: ShapeKind) -> &'static str {
    match shape {
        ShapeKind::Rect => "rectangle",
        ShapeKind::Circle => "circle",
        ShapeKind::Line => "line",
        ShapeKind::Triangle => "triangle",
        ShapeKind::Star => "star",
    }
}

fn plan_frame(text: &str, original: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let (width, height) = extract::size(text).unwrap_or((600.0, 400.0));
    let (x, y) = creation_point(text, ctx, width, height);
    let call = ToolCall::CreateFrame {
        x,
        y,
        width,
        height,
        title: extract::payload_text(original),
    };
    PlanOutcome::planned(
        intent::CREATE_FRAME,
        "Adding a frame.",
        ExecutionPlan::new("create frame", vec![call]),
    )
}

fn plan_grid_container(text: &str, original: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let columns = extract::columns(text).unwrap_or(3).max(1);
    let width = f64::from(columns) * 280.0;
    let height = 360.0;
    let (x, y) = creation_point(text, ctx, width, height);
    let call = ToolCall::CreateGridContainer {
        x,
        y,
        width,
        height,
        columns,
        gap: extract::gap(text).unwrap_or(16.0),
        sections: Vec::new(),
        title: extract::payload_text(original),
    };
    PlanOutcome::planned(
        intent::CREATE_GRID,
        format!("Adding a grid container with {columns} column(s)."),
        ExecutionPlan::new("create grid container", vec![call]),
    )
}

fn creation_point(text: &str, ctx: &PlannerContext<'_>, width: f64, height: f64) -> (f64, f64) {
    if let Some(point) = extract::coordinates(text) {
        return point;
    }
    match ctx.viewport {
        Some(viewport) => place_cluster(
            Region {
                left: viewport.left,
                top: viewport.top,
                width: viewport.width,
                height: viewport.height,
            },
            width,
            height,
            extract::viewport_side(text),
        ),
        None => (FALLBACK_X, FALLBACK_Y),
    }
}

struct Template {
    name: &'static str,
    title: &'static str,
    columns: u32,
    sections: &'static [&'static str],
    width: f64,
    height: f64,
}

const TEMPLATES: &[Template] = &[
    Template {
        name: "swot",
        title: "SWOT",
        columns: 2,
        sections: &["Strengths", "Weaknesses", "Opportunities", "Threats"],
        width: 640.0,
        height: 520.0,
    },
    Template {
        name: "retro",
        title: "Retrospective",
        columns: 3,
        sections: &["Went well", "To improve", "Action items"],
        width: 840.0,
        height: 460.0,
    },
    Template {
        name: "journey",
        title: "Journey map",
        columns: 5,
        sections: &["Awareness", "Consideration", "Decision", "Onboarding", "Retention"],
        width: 1300.0,
        height: 380.0,
    },
];

fn try_template(text: &str, ctx: &PlannerContext<'_>) -> Option<PlanOutcome> {
    let template = if text.contains("swot") {
        &TEMPLATES[0]
    } else if text.contains("retro") {
        &TEMPLATES[1]
    } else if text.contains("journey") {
        &TEMPLATES[2]
    } else {
        return None;
    };
    let (x, y) = creation_point(text, ctx, template.width, template.height);
    let call = ToolCall::CreateGridContainer {
        x,
        y,
        width: template.width,
        height: template.height,
        columns: template.columns,
        gap: 16.0,
        sections: template.sections.iter().map(|s| (*s).to_owned()).collect(),
        title: Some(template.title.to_owned()),
    };
    Some(PlanOutcome::planned(
        intent::CREATE_TEMPLATE,
        format!("Creating a {} template.", template.title),
        ExecutionPlan::new(template.name, vec![call]),
    ))
}

fn plan_append_to_section(
    text: &str,
    original: &str,
    ctx: &PlannerContext<'_>,
) -> PlanOutcome {
    let container = match resolve_container(ctx) {
        Ok(container) => container,
        Err(message) => return PlanOutcome::guidance(intent::APPEND_TO_GRID, message),
    };
    let Some(grid) = container.grid() else {
        return PlanOutcome::guidance(
            intent::APPEND_TO_GRID,
            "That container has no named sections to add into.",
        );
    };
    let matches: Vec<usize> = grid
        .sections
        .iter()
        .enumerate()
        .filter(|(_, section)| section_matches(text, section))
        .map(|(index, _)| index)
        .collect();
    let section_index = match matches.as_slice() {
        [index] => *index,
        [] => {
            return PlanOutcome::guidance(
                intent::APPEND_TO_GRID,
                format!(
                    "I couldn't match a section. This container has: {}.",
                    grid.sections.join(", ")
                ),
            );
        }
        _ => {
            return PlanOutcome::guidance(
                intent::APPEND_TO_GRID,
                "That matches more than one section; please name exactly one.",
            );
        }
    };

    let columns = grid.columns.max(1) as usize;
    let rows = grid.sections.len().div_ceil(columns).max(1);
    let header = 44.0;
    let cell_w = container.width() / columns as f64;
    let cell_h = (container.height() - header) / rows as f64;
    let cell_x = container.x() + (section_index % columns) as f64 * cell_w;
    let cell_y = container.y() + header + (section_index / columns) as f64 * cell_h;

    // Stack new items diagonally past whatever already sits in the cell.
    let occupied = ctx
        .objects
        .iter()
        .filter(|object| {
            object.id() != container.id()
                && object.center_x() >= cell_x
                && object.center_x() < cell_x + cell_w
                && object.center_y() >= cell_y
                && object.center_y() < cell_y + cell_h
        })
        .count();
    let offset = (occupied as f64 * 28.0).min((cell_h - 60.0).max(0.0));

    let section_name = grid.sections[section_index].clone();
    let call = ToolCall::CreateStickyNote {
        x: cell_x + 16.0 + offset,
        y: cell_y + 12.0 + offset,
        color: extract::color_keyword(text).map(str::to_owned),
        text: extract::payload_text(original),
    };
    PlanOutcome::planned(
        intent::APPEND_TO_GRID,
        format!("Adding a sticky to the \"{section_name}\" section."),
        ExecutionPlan::new("append to section", vec![call]),
    )
}

fn section_matches(text: &str, section: &str) -> bool {
    let section = section.to_lowercase();
    if text.contains(&section) {
        return true;
    }
    section
        .split_whitespace()
        .any(|word| word.len() >= 4 && text.contains(word))
}

fn plan_connector(text: &str, ctx: &PlannerContext<'_>) -> PlanOutcome {
    let endpoints: Vec<&BoardObject> = ctx
        .selected_objects()
        .into_iter()
        .filter(|object| !object.kind().is_connector())
        .collect();
    if endpoints.len() != 2 {
        return PlanOutcome::guidance(
            intent::CREATE_CONNECTOR,
            "Select exactly two objects to connect.",
        );
    }
    let style = if text.contains("straight") {
        ConnectorStyle::Straight
    } else {
        ConnectorStyle::Elbow
    };
    let call = ToolCall::CreateConnector {
        from_object_id: endpoints[0].id().clone(),
        to_object_id: endpoints[1].id().clone(),
        style,
        color: extract::color_keyword(text).map(str::to_owned),
    };
    PlanOutcome::planned(
        intent::CREATE_CONNECTOR,
        "Connecting the two selected objects.",
        ExecutionPlan::new("create connector", vec![call]),
    )
}
