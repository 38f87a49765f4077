// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Normalization of hosted-planner JSON into canonical [`ToolCall`]s.
//!
//! Language models emit synonymous tool names ("addSticky", "create_sticky")
//! and inconsistent argument shapes (arguments nested under `args`,
//! `arguments` or `function.arguments` as an encoded string; positions flat or
//! under `position`). This pass resolves all of that; downstream validation
//! never needs alias knowledge.

use std::fmt;

use serde_json::Value;

use crate::model::{IdError, ObjectId};

use super::{AlignEdge, Axis, ConnectorStyle, PointArg, ShapeKind, ToolCall};

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeError {
    NotAnObject,
    MissingToolName,
    UnknownTool { name: String },
    MissingField { tool: &'static str, field: &'static str },
    InvalidField { tool: &'static str, field: &'static str, detail: String },
    InvalidObjectId { tool: &'static str, value: String, source: IdError },
    UnparsableArguments { detail: String },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("tool call must be a JSON object"),
            Self::MissingToolName => f.write_str("tool call carries no tool name"),
            Self::UnknownTool { name } => write!(f, "unknown tool name '{name}'"),
            Self::MissingField { tool, field } => {
                write!(f, "{tool}: missing required argument '{field}'")
            }
            Self::InvalidField { tool, field, detail } => {
                write!(f, "{tool}: invalid argument '{field}': {detail}")
            }
            Self::InvalidObjectId { tool, value, source } => {
                write!(f, "{tool}: invalid object id '{value}': {source}")
            }
            Self::UnparsableArguments { detail } => {
                write!(f, "cannot parse tool arguments: {detail}")
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Normalizes a whole list of raw tool calls, failing on the first bad entry.
pub fn normalize_plan(raw_calls: &[Value]) -> Result<Vec<ToolCall>, NormalizeError> {
    raw_calls.iter().map(normalize_tool_call).collect()
}

pub fn normalize_tool_call(raw: &Value) -> Result<ToolCall, NormalizeError> {
    let object = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    // OpenAI function-call shape nests name and stringified arguments under
    // `function`; other planners put them at the top level.
    let (raw_name, args) = if let Some(function) = object.get("function").and_then(Value::as_object)
    {
        let name = function
            .get("name")
            .and_then(Value::as_str)
            .ok_or(NormalizeError::MissingToolName)?;
        (name, extract_args(function)?)
    } else {
        let name = ["tool", "name", "tool_name", "toolName", "type"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .ok_or(NormalizeError::MissingToolName)?;
        (name, extract_args(object)?)
    };

    let Some(tool) = canonical_tool_name(raw_name) else {
        return Err(NormalizeError::UnknownTool { name: raw_name.to_owned() });
    };
    build_call(tool, &args)
}

/// Pulls the argument object out of a tool-call record. Arguments may live
/// inline beside the tool name, under a wrapper key, or as a JSON-encoded
/// string (OpenAI `function.arguments`).
fn extract_args(object: &serde_json::Map<String, Value>) -> Result<Value, NormalizeError> {
    for key in ["args", "arguments", "params", "parameters", "input"] {
        match object.get(key) {
            Some(Value::Object(_)) => return Ok(object[key].clone()),
            Some(Value::String(encoded)) => {
                return serde_json::from_str(encoded).map_err(|err| {
                    NormalizeError::UnparsableArguments { detail: err.to_string() }
                });
            }
            _ => {}
        }
    }
    Ok(Value::Object(object.clone()))
}

fn canonical_tool_name(raw: &str) -> Option<&'static str> {
    let folded: String =
        raw.chars().filter(|ch| ch.is_ascii_alphanumeric()).map(|ch| ch.to_ascii_lowercase()).collect();
    let tool = match folded.as_str() {
        "createstickynote" | "createsticky" | "addsticky" | "addstickynote" | "newsticky"
        | "sticky" => "createStickyNote",
        "createstickybatch" | "createstickies" | "createstickynotes" | "addstickies"
        | "stickybatch" => "createStickyBatch",
        "createshape" | "addshape" | "drawshape" | "shape" => "createShape",
        "creategridcontainer" | "creategrid" | "addgridcontainer" | "gridcontainer" => {
            "createGridContainer"
        }
        "createframe" | "addframe" | "frame" => "createFrame",
        "createconnector" | "addconnector" | "connect" | "connectobjects" | "connector" => {
            "createConnector"
        }
        "moveobjects" | "moveobject" | "move" | "translateobjects" => "moveObjects",
        "resizeobject" | "resize" | "setsize" => "resizeObject",
        "updatetext" | "settext" | "edittext" | "changetext" => "updateText",
        "changecolor" | "setcolor" | "recolor" | "recolorobjects" => "changeColor",
        "deleteobjects" | "deleteobject" | "delete" | "removeobjects" | "removeobject" => {
            "deleteObjects"
        }
        "arrangeobjectsingrid" | "arrangeingrid" | "arrangegrid" | "gridarrange" => {
            "arrangeObjectsInGrid"
        }
        "alignobjects" | "align" => "alignObjects",
        "distributeobjects" | "distribute" | "spaceevenly" => "distributeObjects",
        "fitframetocontents" | "fitframe" | "shrinkwrapframe" => "fitFrameToContents",
        _ => return None,
    };
    Some(tool)
}

fn build_call(tool: &'static str, args: &Value) -> Result<ToolCall, NormalizeError> {
    match tool {
        "createStickyNote" => {
            let (x, y) = point(tool, args)?;
            Ok(ToolCall::CreateStickyNote {
                x,
                y,
                color: opt_string(args, &["color", "fill"]),
                text: opt_string(args, &["text", "content", "label"]),
            })
        }
        "createStickyBatch" => Ok(ToolCall::CreateStickyBatch {
            count: required_u32(tool, args, "count", &["count", "n", "quantity"])?,
            columns: opt_u32(args, &["columns", "cols"]).unwrap_or(0),
            gap: opt_f64(args, &["gap", "spacing"]).unwrap_or(0.0),
            x: opt_point(args).map(|p| p.x).unwrap_or(0.0),
            y: opt_point(args).map(|p| p.y).unwrap_or(0.0),
            color: opt_string(args, &["color", "fill"]),
        }),
        "createShape" => {
            let (x, y) = point(tool, args)?;
            Ok(ToolCall::CreateShape {
                shape: shape_kind(tool, args)?,
                x,
                y,
                width: required_f64(tool, args, "width", &["width", "w"])?,
                height: required_f64(tool, args, "height", &["height", "h"])?,
                color: opt_string(args, &["color", "fill"]),
                text: opt_string(args, &["text", "content", "label"]),
            })
        }
        "createGridContainer" => {
            let (x, y) = point(tool, args)?;
            Ok(ToolCall::CreateGridContainer {
                x,
                y,
                width: required_f64(tool, args, "width", &["width", "w"])?,
                height: required_f64(tool, args, "height", &["height", "h"])?,
                columns: required_u32(tool, args, "columns", &["columns", "cols"])?,
                gap: opt_f64(args, &["gap", "spacing"]).unwrap_or(16.0),
                sections: string_list(args, &["sections", "labels", "cells"]),
                title: opt_string(args, &["title", "name"]),
            })
        }
        "createFrame" => {
            let (x, y) = point(tool, args)?;
            Ok(ToolCall::CreateFrame {
                x,
                y,
                width: required_f64(tool, args, "width", &["width", "w"])?,
                height: required_f64(tool, args, "height", &["height", "h"])?,
                title: opt_string(args, &["title", "name", "label"]),
            })
        }
        "createConnector" => Ok(ToolCall::CreateConnector {
            from_object_id: required_id(tool, args, "fromObjectId", &["fromObjectId", "from", "fromId", "source"])?,
            to_object_id: required_id(tool, args, "toObjectId", &["toObjectId", "to", "toId", "target"])?,
            style: connector_style(args),
            color: opt_string(args, &["color", "stroke"]),
        }),
        "moveObjects" => {
            let object_ids = id_list(tool, args)?;
            let to = opt_key_point(args, &["to", "destination", "target"]);
            Ok(ToolCall::MoveObjects {
                object_ids,
                dx: opt_f64(args, &["dx", "deltaX", "offsetX"]).unwrap_or(0.0),
                dy: opt_f64(args, &["dy", "deltaY", "offsetY"]).unwrap_or(0.0),
                to,
            })
        }
        "resizeObject" => Ok(ToolCall::ResizeObject {
            object_id: required_id(tool, args, "objectId", &["objectId", "id", "object"])?,
            width: required_f64(tool, args, "width", &["width", "w"])?,
            height: required_f64(tool, args, "height", &["height", "h"])?,
        }),
        "updateText" => Ok(ToolCall::UpdateText {
            object_id: required_id(tool, args, "objectId", &["objectId", "id", "object"])?,
            text: opt_string(args, &["text", "content", "value"])
                .ok_or(NormalizeError::MissingField { tool, field: "text" })?,
        }),
        "changeColor" => Ok(ToolCall::ChangeColor {
            object_ids: id_list(tool, args)?,
            color: opt_string(args, &["color", "fill"])
                .ok_or(NormalizeError::MissingField { tool, field: "color" })?,
        }),
        "deleteObjects" => Ok(ToolCall::DeleteObjects { object_ids: id_list(tool, args)? }),
        "arrangeObjectsInGrid" => Ok(ToolCall::ArrangeObjectsInGrid {
            object_ids: id_list(tool, args)?,
            columns: required_u32(tool, args, "columns", &["columns", "cols"])?,
            gap_x: opt_f64(args, &["gapX", "gap", "spacing"]).unwrap_or(20.0),
            gap_y: opt_f64(args, &["gapY", "gap", "spacing"]).unwrap_or(20.0),
            origin: opt_key_point(args, &["origin", "start", "position"]),
        }),
        "alignObjects" => Ok(ToolCall::AlignObjects {
            object_ids: id_list(tool, args)?,
            edge: align_edge(tool, args)?,
        }),
        "distributeObjects" => Ok(ToolCall::DistributeObjects {
            object_ids: id_list(tool, args)?,
            axis: axis(tool, args)?,
        }),
        "fitFrameToContents" => Ok(ToolCall::FitFrameToContents {
            frame_id: required_id(tool, args, "frameId", &["frameId", "frame", "objectId", "id"])?,
            padding: opt_f64(args, &["padding", "margin"]).unwrap_or(24.0),
        }),
        _ => unreachable!("canonical_tool_name only returns known tools"),
    }
}

fn lookup<'a>(args: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = args.as_object()?;
    keys.iter().find_map(|key| object.get(*key))
}

fn opt_f64(args: &Value, keys: &[&str]) -> Option<f64> {
    match lookup(args, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn opt_u32(args: &Value, keys: &[&str]) -> Option<u32> {
    let value = opt_f64(args, keys)?;
    (value.fract() == 0.0 && value >= 0.0 && value <= f64::from(u32::MAX)).then_some(value as u32)
}

fn opt_string(args: &Value, keys: &[&str]) -> Option<String> {
    lookup(args, keys)?.as_str().map(str::trim).filter(|s| !s.is_empty()).map(ToOwned::to_owned)
}

fn string_list(args: &Value, keys: &[&str]) -> Vec<String> {
    lookup(args, keys)
        .and_then(Value::as_array)
        .map(|items| {
            items.iter().filter_map(Value::as_str).map(str::to_owned).collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn required_f64(
    tool: &'static str,
    args: &Value,
    field: &'static str,
    keys: &[&str],
) -> Result<f64, NormalizeError> {
    opt_f64(args, keys).ok_or(NormalizeError::MissingField { tool, field })
}

fn required_u32(
    tool: &'static str,
    args: &Value,
    field: &'static str,
    keys: &[&str],
) -> Result<u32, NormalizeError> {
    opt_u32(args, keys).ok_or(NormalizeError::MissingField { tool, field })
}

/// Positions arrive flat (`x`/`y`), nested (`position`/`origin`/`point`
/// objects), or as `[x, y]` pairs.
fn opt_point(args: &Value) -> Option<PointArg> {
    if let (Some(x), Some(y)) = (opt_f64(args, &["x", "left"]), opt_f64(args, &["y", "top"])) {
        return Some(PointArg { x, y });
    }
    opt_key_point(args, &["position", "origin", "point", "at"])
}

fn opt_key_point(args: &Value, keys: &[&str]) -> Option<PointArg> {
    let nested = lookup(args, keys)?;
    if let Some(pair) = nested.as_array() {
        if let (Some(x), Some(y)) = (pair.first()?.as_f64(), pair.get(1)?.as_f64()) {
            return Some(PointArg { x, y });
        }
        return None;
    }
    let x = opt_f64(nested, &["x", "left"])?;
    let y = opt_f64(nested, &["y", "top"])?;
    Some(PointArg { x, y })
}

fn point(tool: &'static str, args: &Value) -> Result<(f64, f64), NormalizeError> {
    let point = opt_point(args).ok_or(NormalizeError::MissingField { tool, field: "x/y" })?;
    Ok((point.x, point.y))
}

fn required_id(
    tool: &'static str,
    args: &Value,
    field: &'static str,
    keys: &[&str],
) -> Result<ObjectId, NormalizeError> {
    let raw =
        opt_string(args, keys).ok_or(NormalizeError::MissingField { tool, field })?;
    ObjectId::new(raw.clone())
        .map_err(|source| NormalizeError::InvalidObjectId { tool, value: raw, source })
}

fn id_list(tool: &'static str, args: &Value) -> Result<Vec<ObjectId>, NormalizeError> {
    let raw_ids: Vec<String> = match lookup(args, &["objectIds", "object_ids", "ids", "objects"]) {
        Some(Value::Array(items)) => {
            items.iter().filter_map(Value::as_str).map(str::to_owned).collect()
        }
        Some(Value::String(single)) => vec![single.clone()],
        _ => match opt_string(args, &["objectId", "id", "object"]) {
            Some(single) => vec![single],
            None => return Err(NormalizeError::MissingField { tool, field: "objectIds" }),
        },
    };
    if raw_ids.is_empty() {
        return Err(NormalizeError::MissingField { tool, field: "objectIds" });
    }
    raw_ids
        .into_iter()
        .map(|raw| {
            ObjectId::new(raw.clone())
                .map_err(|source| NormalizeError::InvalidObjectId { tool, value: raw, source })
        })
        .collect()
}

fn shape_kind(tool: &'static str, args: &Value) -> Result<ShapeKind, NormalizeError> {
    let raw = opt_string(args, &["shape", "kind", "shapeType"])
        .ok_or(NormalizeError::MissingField { tool, field: "shape" })?;
    match raw.to_ascii_lowercase().as_str() {
        "rect" | "rectangle" | "square" | "box" => Ok(ShapeKind::Rect),
        "circle" | "ellipse" | "oval" => Ok(ShapeKind::Circle),
        "line" => Ok(ShapeKind::Line),
        "triangle" => Ok(ShapeKind::Triangle),
        "star" => Ok(ShapeKind::Star),
        _ => Err(NormalizeError::InvalidField {
            tool,
            field: "shape",
            detail: format!("unsupported shape '{raw}'"),
        }),
    }
}

fn connector_style(args: &Value) -> ConnectorStyle {
    match opt_string(args, &["style", "connectorStyle", "routing"]).as_deref() {
        Some("straight") | Some("direct") => ConnectorStyle::Straight,
        _ => ConnectorStyle::Elbow,
    }
}

fn align_edge(tool: &'static str, args: &Value) -> Result<AlignEdge, NormalizeError> {
    let raw = opt_string(args, &["edge", "alignment", "align", "side"])
        .ok_or(NormalizeError::MissingField { tool, field: "edge" })?;
    match raw.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
        "left" => Ok(AlignEdge::Left),
        "right" => Ok(AlignEdge::Right),
        "top" => Ok(AlignEdge::Top),
        "bottom" => Ok(AlignEdge::Bottom),
        "center-horizontal" | "horizontal-center" | "center-x" | "middle-horizontal" => {
            Ok(AlignEdge::CenterHorizontal)
        }
        "center-vertical" | "vertical-center" | "center-y" | "middle-vertical" | "center"
        | "middle" => Ok(AlignEdge::CenterVertical),
        _ => Err(NormalizeError::InvalidField {
            tool,
            field: "edge",
            detail: format!("unsupported alignment '{raw}'"),
        }),
    }
}

fn axis(tool: &'static str, args: &Value) -> Result<Axis, NormalizeError> {
    let raw = opt_string(args, &["axis", "direction", "orientation"])
        .ok_or(NormalizeError::MissingField { tool, field: "axis" })?;
    match raw.to_ascii_lowercase().as_str() {
        "horizontal" | "x" | "row" => Ok(Axis::Horizontal),
        "vertical" | "y" | "column" => Ok(Axis::Vertical),
        _ => Err(NormalizeError::InvalidField {
            tool,
            field: "axis",
            detail: format!("unsupported axis '{raw}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn normalizes_canonical_shape() {
        let call = normalize_tool_call(&json!({
            "tool": "createStickyNote",
            "x": 100, "y": 200, "color": "yellow"
        }))
        .expect("normalize");
        assert_eq!(
            call,
            ToolCall::CreateStickyNote {
                x: 100.0,
                y: 200.0,
                color: Some("yellow".to_owned()),
                text: None
            }
        );
    }

    #[test]
    fn normalizes_alias_name_and_nested_args() {
        let call = normalize_tool_call(&json!({
            "name": "add_sticky",
            "args": { "position": { "x": 5, "y": 7 }, "text": "todo" }
        }))
        .expect("normalize");
        assert_eq!(
            call,
            ToolCall::CreateStickyNote { x: 5.0, y: 7.0, color: None, text: Some("todo".to_owned()) }
        );
    }

    #[test]
    fn normalizes_openai_function_shape_with_encoded_arguments() {
        let call = normalize_tool_call(&json!({
            "type": "function",
            "function": {
                "name": "deleteObjects",
                "arguments": "{\"ids\": [\"a\", \"b\"]}"
            }
        }))
        .expect("normalize");
        let ToolCall::DeleteObjects { object_ids } = call else {
            panic!("expected deleteObjects");
        };
        assert_eq!(object_ids.len(), 2);
    }

    #[test]
    fn normalizes_single_object_id_into_list() {
        let call = normalize_tool_call(&json!({
            "tool": "move",
            "objectId": "s1",
            "dx": 40, "dy": -10
        }))
        .expect("normalize");
        let ToolCall::MoveObjects { object_ids, dx, dy, to } = call else {
            panic!("expected moveObjects");
        };
        assert_eq!(object_ids.len(), 1);
        assert_eq!((dx, dy), (40.0, -10.0));
        assert!(to.is_none());
    }

    #[test]
    fn rejects_unknown_tool() {
        let err = normalize_tool_call(&json!({ "tool": "summonKraken", "x": 1 })).unwrap_err();
        assert!(matches!(err, NormalizeError::UnknownTool { .. }));
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = normalize_tool_call(&json!({ "tool": "resizeObject", "objectId": "a" })).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField { field: "width", .. }));
    }

    #[test]
    fn rejects_invalid_object_id() {
        let err = normalize_tool_call(&json!({ "tool": "delete", "ids": ["a/b"] })).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidObjectId { .. }));
    }

    #[test]
    fn normalizes_point_pairs_for_move_target() {
        let call = normalize_tool_call(&json!({
            "tool": "moveObjects",
            "objectIds": ["a"],
            "to": [120, 340]
        }))
        .expect("normalize");
        let ToolCall::MoveObjects { to, .. } = call else {
            panic!("expected moveObjects");
        };
        assert_eq!(to, Some(PointArg { x: 120.0, y: 340.0 }));
    }
}
