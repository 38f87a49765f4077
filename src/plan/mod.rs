// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Typed mutation plans.
//!
//! A plan is an ordered list of [`ToolCall`]s, each a canonical, strictly
//! typed operation. Hosted planners emit loose JSON; that JSON goes through
//! [`normalize`] to reach this closed union and then [`validate`] before any
//! call touches the executor.

pub mod normalize;
pub mod validate;

use serde::{Deserialize, Serialize};

use crate::llm::LlmUsage;
use crate::model::ObjectId;

pub use normalize::{normalize_plan, normalize_tool_call, NormalizeError};
pub use validate::{validate_plan, PlanValidationError};

/// Hard ceiling on operations per plan.
pub const MAX_PLAN_OPERATIONS: usize = 50;

/// Hard ceiling on items in a single batch/grid creation.
pub const MAX_BATCH_ITEMS: u32 = 50;

/// Numeric policy knobs shared by planner and validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLimits {
    pub max_operations: usize,
    pub max_batch_items: u32,
    /// Cap on objects a single move/align/distribute/arrange may touch.
    pub max_layout_objects: usize,
    pub default_columns: u32,
    pub sticky_width: f64,
    pub sticky_height: f64,
    pub sticky_gap: f64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_operations: MAX_PLAN_OPERATIONS,
            max_batch_items: MAX_BATCH_ITEMS,
            max_layout_objects: 100,
            default_columns: 5,
            sticky_width: 160.0,
            sticky_height: 160.0,
            sticky_gap: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Circle,
    Line,
    Triangle,
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorStyle {
    Straight,
    Elbow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignEdge {
    Left,
    Right,
    Top,
    Bottom,
    CenterHorizontal,
    CenterVertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointArg {
    pub x: f64,
    pub y: f64,
}

/// One canonical mutation request. Closed union: every operation the pipeline
/// can apply has exactly one variant here, and the executor matches totally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ToolCall {
    CreateStickyNote {
        x: f64,
        y: f64,
        color: Option<String>,
        text: Option<String>,
    },
    CreateStickyBatch {
        count: u32,
        columns: u32,
        gap: f64,
        x: f64,
        y: f64,
        color: Option<String>,
    },
    CreateShape {
        shape: ShapeKind,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Option<String>,
        text: Option<String>,
    },
    CreateGridContainer {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        columns: u32,
        gap: f64,
        sections: Vec<String>,
        title: Option<String>,
    },
    CreateFrame {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        title: Option<String>,
    },
    CreateConnector {
        from_object_id: ObjectId,
        to_object_id: ObjectId,
        style: ConnectorStyle,
        color: Option<String>,
    },
    MoveObjects {
        object_ids: Vec<ObjectId>,
        dx: f64,
        dy: f64,
        /// When set, the group's bounding-box top-left moves here and
        /// `dx`/`dy` are ignored.
        to: Option<PointArg>,
    },
    ResizeObject {
        object_id: ObjectId,
        width: f64,
        height: f64,
    },
    UpdateText {
        object_id: ObjectId,
        text: String,
    },
    ChangeColor {
        object_ids: Vec<ObjectId>,
        color: String,
    },
    DeleteObjects {
        object_ids: Vec<ObjectId>,
    },
    ArrangeObjectsInGrid {
        object_ids: Vec<ObjectId>,
        columns: u32,
        gap_x: f64,
        gap_y: f64,
        origin: Option<PointArg>,
    },
    AlignObjects {
        object_ids: Vec<ObjectId>,
        edge: AlignEdge,
    },
    DistributeObjects {
        object_ids: Vec<ObjectId>,
        axis: Axis,
    },
    FitFrameToContents {
        frame_id: ObjectId,
        padding: f64,
    },
}

impl ToolCall {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::CreateStickyNote { .. } => "createStickyNote",
            Self::CreateStickyBatch { .. } => "createStickyBatch",
            Self::CreateShape { .. } => "createShape",
            Self::CreateGridContainer { .. } => "createGridContainer",
            Self::CreateFrame { .. } => "createFrame",
            Self::CreateConnector { .. } => "createConnector",
            Self::MoveObjects { .. } => "moveObjects",
            Self::ResizeObject { .. } => "resizeObject",
            Self::UpdateText { .. } => "updateText",
            Self::ChangeColor { .. } => "changeColor",
            Self::DeleteObjects { .. } => "deleteObjects",
            Self::ArrangeObjectsInGrid { .. } => "arrangeObjectsInGrid",
            Self::AlignObjects { .. } => "alignObjects",
            Self::DistributeObjects { .. } => "distributeObjects",
            Self::FitFrameToContents { .. } => "fitFrameToContents",
        }
    }

    pub fn creates_objects(&self) -> bool {
        matches!(
            self,
            Self::CreateStickyNote { .. }
                | Self::CreateStickyBatch { .. }
                | Self::CreateShape { .. }
                | Self::CreateGridContainer { .. }
                | Self::CreateFrame { .. }
                | Self::CreateConnector { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    name: String,
    calls: Vec<ToolCall>,
}

impl ExecutionPlan {
    pub fn new(name: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self { name: name.into(), calls }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calls(&self) -> &[ToolCall] {
        &self.calls
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }
}

/// Outcome of one planning strategy run.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanAttempt {
    /// Strategy is switched off by configuration.
    Disabled,
    /// The budget controller refused the reservation.
    BudgetBlocked { reason: String },
    /// Policy routed this intent away from the strategy.
    PolicyBlocked { reason: String },
    /// The strategy ran but produced no plan.
    NotPlanned { message: Option<String> },
    /// The strategy produced a validated plan.
    Planned { plan: ExecutionPlan, usage: Option<LlmUsage> },
    /// The strategy failed outright.
    Error { message: String },
}

impl PlanAttempt {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::BudgetBlocked { .. } => "budget-blocked",
            Self::PolicyBlocked { .. } => "policy-blocked",
            Self::NotPlanned { .. } => "not-planned",
            Self::Planned { .. } => "planned",
            Self::Error { .. } => "error",
        }
    }
}
