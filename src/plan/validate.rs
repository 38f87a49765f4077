// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Structural validation of an [`ExecutionPlan`] before execution.
//!
//! Validation never clamps. A plan that exceeds a limit is rejected whole so
//! the caller can report the limit instead of silently doing less than asked.

use std::fmt;

use super::{ExecutionPlan, PlanLimits, ToolCall};

#[derive(Debug, Clone, PartialEq)]
pub enum PlanValidationError {
    EmptyPlan,
    TooManyOperations { count: usize, max: usize },
    BatchCountOutOfRange { index: usize, count: u32, max: u32 },
    TooManyLayoutObjects { index: usize, tool: &'static str, count: usize, max: usize },
    EmptyObjectIds { index: usize, tool: &'static str },
    NonPositiveDimension { index: usize, tool: &'static str, field: &'static str, value: f64 },
    NegativeGap { index: usize, tool: &'static str, value: f64 },
    ZeroColumns { index: usize, tool: &'static str },
    NonFiniteNumber { index: usize, tool: &'static str, field: &'static str },
    SelfConnector { index: usize },
}

impl fmt::Display for PlanValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPlan => f.write_str("plan contains no operations"),
            Self::TooManyOperations { count, max } => {
                write!(f, "plan has {count} operations, at most {max} allowed")
            }
            Self::BatchCountOutOfRange { index, count, max } => {
                write!(f, "operation {index}: batch count {count} outside 1..={max}")
            }
            Self::TooManyLayoutObjects { index, tool, count, max } => {
                write!(f, "operation {index} ({tool}): {count} objects, at most {max} allowed")
            }
            Self::EmptyObjectIds { index, tool } => {
                write!(f, "operation {index} ({tool}): object id list is empty")
            }
            Self::NonPositiveDimension { index, tool, field, value } => {
                write!(f, "operation {index} ({tool}): {field} must be positive, got {value}")
            }
            Self::NegativeGap { index, tool, value } => {
                write!(f, "operation {index} ({tool}): gap must be non-negative, got {value}")
            }
            Self::ZeroColumns { index, tool } => {
                write!(f, "operation {index} ({tool}): columns must be at least 1")
            }
            Self::NonFiniteNumber { index, tool, field } => {
                write!(f, "operation {index} ({tool}): {field} is not a finite number")
            }
            Self::SelfConnector { index } => {
                write!(f, "operation {index}: connector endpoints must differ")
            }
        }
    }
}

impl std::error::Error for PlanValidationError {}

pub fn validate_plan(plan: &ExecutionPlan, limits: &PlanLimits) -> Result<(), PlanValidationError> {
    let calls = plan.calls();
    if calls.is_empty() {
        return Err(PlanValidationError::EmptyPlan);
    }
    if calls.len() > limits.max_operations {
        return Err(PlanValidationError::TooManyOperations {
            count: calls.len(),
            max: limits.max_operations,
        });
    }
    for (index, call) in calls.iter().enumerate() {
        validate_call(index, call, limits)?;
    }
    Ok(())
}

fn validate_call(
    index: usize,
    call: &ToolCall,
    limits: &PlanLimits,
) -> Result<(), PlanValidationError> {
    let tool = call.tool_name();
    match call {
        ToolCall::CreateStickyNote { x, y, .. } => {
            finite(index, tool, "x", *x)?;
            finite(index, tool, "y", *y)
        }
        ToolCall::CreateStickyBatch { count, columns: _, gap, x, y, .. } => {
            if *count == 0 || *count > limits.max_batch_items {
                return Err(PlanValidationError::BatchCountOutOfRange {
                    index,
                    count: *count,
                    max: limits.max_batch_items,
                });
            }
            finite(index, tool, "gap", *gap)?;
            non_negative_gap(index, tool, *gap)?;
            finite(index, tool, "x", *x)?;
            finite(index, tool, "y", *y)
        }
        ToolCall::CreateShape { x, y, width, height, .. }
        | ToolCall::CreateFrame { x, y, width, height, .. } => {
            finite(index, tool, "x", *x)?;
            finite(index, tool, "y", *y)?;
            positive(index, tool, "width", *width)?;
            positive(index, tool, "height", *height)
        }
        ToolCall::CreateGridContainer { x, y, width, height, columns, gap, .. } => {
            finite(index, tool, "x", *x)?;
            finite(index, tool, "y", *y)?;
            positive(index, tool, "width", *width)?;
            positive(index, tool, "height", *height)?;
            if *columns == 0 {
                return Err(PlanValidationError::ZeroColumns { index, tool });
            }
            finite(index, tool, "gap", *gap)?;
            non_negative_gap(index, tool, *gap)
        }
        ToolCall::CreateConnector { from_object_id, to_object_id, .. } => {
            if from_object_id == to_object_id {
                return Err(PlanValidationError::SelfConnector { index });
            }
            Ok(())
        }
        ToolCall::MoveObjects { object_ids, dx, dy, to } => {
            non_empty(index, tool, object_ids.len())?;
            layout_cap(index, tool, object_ids.len(), limits)?;
            finite(index, tool, "dx", *dx)?;
            finite(index, tool, "dy", *dy)?;
            if let Some(point) = to {
                finite(index, tool, "to.x", point.x)?;
                finite(index, tool, "to.y", point.y)?;
            }
            Ok(())
        }
        ToolCall::ResizeObject { width, height, .. } => {
            positive(index, tool, "width", *width)?;
            positive(index, tool, "height", *height)
        }
        ToolCall::UpdateText { .. } => Ok(()),
        ToolCall::ChangeColor { object_ids, .. } | ToolCall::DeleteObjects { object_ids } => {
            non_empty(index, tool, object_ids.len())
        }
        ToolCall::ArrangeObjectsInGrid { object_ids, columns, gap_x, gap_y, origin } => {
            non_empty(index, tool, object_ids.len())?;
            layout_cap(index, tool, object_ids.len(), limits)?;
            if *columns == 0 {
                return Err(PlanValidationError::ZeroColumns { index, tool });
            }
            finite(index, tool, "gapX", *gap_x)?;
            non_negative_gap(index, tool, *gap_x)?;
            finite(index, tool, "gapY", *gap_y)?;
            non_negative_gap(index, tool, *gap_y)?;
            if let Some(point) = origin {
                finite(index, tool, "origin.x", point.x)?;
                finite(index, tool, "origin.y", point.y)?;
            }
            Ok(())
        }
        ToolCall::AlignObjects { object_ids, .. }
        | ToolCall::DistributeObjects { object_ids, .. } => {
            non_empty(index, tool, object_ids.len())?;
            layout_cap(index, tool, object_ids.len(), limits)
        }
        ToolCall::FitFrameToContents { padding, .. } => {
            finite(index, tool, "padding", *padding)?;
            non_negative_gap(index, tool, *padding)
        }
    }
}

fn finite(
    index: usize,
    tool: &'static str,
    field: &'static str,
    value: f64,
) -> Result<(), PlanValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PlanValidationError::NonFiniteNumber { index, tool, field })
    }
}

fn positive(
    index: usize,
    tool: &'static str,
    field: &'static str,
    value: f64,
) -> Result<(), PlanValidationError> {
    finite(index, tool, field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(PlanValidationError::NonPositiveDimension { index, tool, field, value })
    }
}

fn non_negative_gap(index: usize, tool: &'static str, value: f64) -> Result<(), PlanValidationError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(PlanValidationError::NegativeGap { index, tool, value })
    }
}

fn non_empty(index: usize, tool: &'static str, len: usize) -> Result<(), PlanValidationError> {
    if len > 0 {
        Ok(())
    } else {
        Err(PlanValidationError::EmptyObjectIds { index, tool })
    }
}

fn layout_cap(
    index: usize,
    tool: &'static str,
    len: usize,
    limits: &PlanLimits,
) -> Result<(), PlanValidationError> {
    if len <= limits.max_layout_objects {
        Ok(())
    } else {
        Err(PlanValidationError::TooManyLayoutObjects {
            index,
            tool,
            count: len,
            max: limits.max_layout_objects,
        })
    }
}
