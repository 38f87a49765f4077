// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Plan execution against a board store.
//!
//! An executor is built per request. It loads the board once into a cache,
//! resolves every read against that cache, and writes each operation's effect
//! through to the store before moving on. A failed operation aborts the rest
//! of the plan; completed operations stay committed.

pub mod arrange;

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;
use uuid::Uuid;

use crate::model::{
    BoardId, BoardObject, ConnectorMeta, GridMeta, ObjectId, ObjectKind,
};
use crate::plan::{ConnectorStyle, ExecutionPlan, PlanLimits, ShapeKind, ToolCall};
use crate::store::{BoardStore, StoreError};

/// Deletes are written in chunks so a huge sweep cannot hold the store in one
/// giant transaction.
pub const DELETE_CHUNK_SIZE: usize = 400;

const DEFAULT_STICKY_COLOR: &str = "yellow";
const DEFAULT_SHAPE_COLOR: &str = "gray";
const DEFAULT_CONNECTOR_COLOR: &str = "black";

#[derive(Debug)]
pub enum ExecError {
    Store(StoreError),
    ObjectNotFound { object_id: ObjectId },
    NotAFrame { object_id: ObjectId },
    EmptyFrame { object_id: ObjectId },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store failure: {err}"),
            Self::ObjectNotFound { object_id } => {
                write!(f, "object '{}' does not exist on this board", object_id.as_str())
            }
            Self::NotAFrame { object_id } => {
                write!(f, "object '{}' is not a frame", object_id.as_str())
            }
            Self::EmptyFrame { object_id } => {
                write!(f, "frame '{}' has no contents to fit", object_id.as_str())
            }
        }
    }
}

impl std::error::Error for ExecError {}

impl From<StoreError> for ExecError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// What one plan run did, for the response envelope and the audit trail.
#[derive(Debug, Default, Clone)]
pub struct ExecutionReport {
    pub executed_tools: Vec<&'static str>,
    pub created_object_ids: Vec<ObjectId>,
    pub deleted_count: u64,
    pub updated_count: u64,
}

pub struct ToolExecutor<'a> {
    store: &'a dyn BoardStore,
    board_id: BoardId,
    limits: PlanLimits,
    cache: BTreeMap<ObjectId, BoardObject>,
    next_z_index: i64,
}

impl<'a> ToolExecutor<'a> {
    /// Loads the board once. New objects stack above everything present at
    /// load time.
    pub async fn load(
        store: &'a dyn BoardStore,
        board_id: BoardId,
        limits: PlanLimits,
    ) -> Result<ToolExecutor<'a>, ExecError> {
        let objects = store.list_objects(&board_id).await?;
        let next_z_index = objects.iter().map(BoardObject::z_index).max().unwrap_or(0) + 1;
        let cache = objects.into_iter().map(|object| (object.id().clone(), object)).collect();
        Ok(Self { store, board_id, limits, cache, next_z_index })
    }

    pub fn cached_objects(&self) -> impl Iterator<Item = &BoardObject> {
        self.cache.values()
    }

    pub async fn execute(&mut self, plan: &ExecutionPlan) -> Result<ExecutionReport, ExecError> {
        let mut report = ExecutionReport::default();
        for call in plan.calls() {
            debug!(tool = call.tool_name(), board = self.board_id.as_str(), "executing tool call");
            self.execute_call(call, &mut report).await?;
            report.executed_tools.push(call.tool_name());
        }
        Ok(report)
    }

    async fn execute_call(
        &mut self,
        call: &ToolCall,
        report: &mut ExecutionReport,
    ) -> Result<(), ExecError> {
        match call {
            ToolCall::CreateStickyNote { x, y, color, text } => {
                let sticky = self.new_sticky(*x, *y, color.as_deref(), text.as_deref());
                self.insert(vec![sticky], report).await
            }
            ToolCall::CreateStickyBatch { count, columns, gap, x, y, color } => {
                self.create_sticky_batch(*count, *columns, *gap, *x, *y, color.as_deref(), report)
                    .await
            }
            ToolCall::CreateShape { shape, x, y, width, height, color, text } => {
                let kind = match shape {
                    ShapeKind::Rect => ObjectKind::Rect,
                    ShapeKind::Circle => ObjectKind::Circle,
                    ShapeKind::Line => ObjectKind::Line,
                    ShapeKind::Triangle => ObjectKind::Triangle,
                    ShapeKind::Star => ObjectKind::Star,
                };
                let mut object = self.new_object(kind, *x, *y, *width, *height);
                object.set_color(color.as_deref().unwrap_or(DEFAULT_SHAPE_COLOR));
                if let Some(text) = text {
                    object.set_text(text.clone());
                }
                self.insert(vec![object], report).await
            }
            ToolCall::CreateGridContainer { x, y, width, height, columns, gap, sections, title } => {
                let mut object =
                    self.new_object(ObjectKind::GridContainer, *x, *y, *width, *height);
                if let Some(title) = title {
                    object.set_text(title.clone());
                }
                object.set_grid(Some(GridMeta {
                    columns: *columns,
                    gap_x: *gap,
                    gap_y: *gap,
                    sections: sections.clone(),
                }));
                self.insert(vec![object], report).await
            }
            ToolCall::CreateFrame { x, y, width, height, title } => {
                let mut object = self.new_object(ObjectKind::Frame, *x, *y, *width, *height);
                if let Some(title) = title {
                    object.set_text(title.clone());
                }
                self.insert(vec![object], report).await
            }
            ToolCall::CreateConnector { from_object_id, to_object_id, style, color } => {
                self.create_connector(from_object_id, to_object_id, *style, color.as_deref(), report)
                    .await
            }
            ToolCall::MoveObjects { object_ids, dx, dy, to } => {
                let (dx, dy) = match to {
                    Some(point) => {
                        let objects = self.resolve_all(object_ids)?;
                        let (left, top, _, _) =
                            arrange::bounding_box(&objects).expect("resolved list is non-empty");
                        (point.x - left, point.y - top)
                    }
                    None => (*dx, *dy),
                };
                self.mutate_each(object_ids, report, |object| {
                    object.set_position(object.x() + dx, object.y() + dy);
                })
                .await
            }
            ToolCall::ResizeObject { object_id, width, height } => {
                self.mutate_each(std::slice::from_ref(object_id), report, |object| {
                    object.set_size(*width, *height);
                })
                .await
            }
            ToolCall::UpdateText { object_id, text } => {
                self.mutate_each(std::slice::from_ref(object_id), report, |object| {
                    object.set_text(text.clone());
                })
                .await
            }
            ToolCall::ChangeColor { object_ids, color } => {
                self.mutate_each(object_ids, report, |object| {
                    object.set_color(color.clone());
                })
                .await
            }
            ToolCall::DeleteObjects { object_ids } => self.delete(object_ids, report).await,
            ToolCall::ArrangeObjectsInGrid { object_ids, columns, gap_x, gap_y, origin } => {
                let mut objects = self.resolve_all(object_ids)?;
                let (origin_x, origin_y) = match origin {
                    Some(point) => (point.x, point.y),
                    None => {
                        let (left, top, _, _) =
                            arrange::bounding_box(&objects).expect("resolved list is non-empty");
                        (left, top)
                    }
                };
                arrange::arrange_in_grid(
                    &mut objects,
                    *columns as usize,
                    *gap_x,
                    *gap_y,
                    origin_x,
                    origin_y,
                );
                self.update(objects, report).await
            }
            ToolCall::AlignObjects { object_ids, edge } => {
                let mut objects = self.resolve_all(object_ids)?;
                arrange::align_objects(&mut objects, *edge);
                self.update(objects, report).await
            }
            ToolCall::DistributeObjects { object_ids, axis } => {
                let mut objects = self.resolve_all(object_ids)?;
                arrange::distribute_objects(&mut objects, *axis);
                self.update(objects, report).await
            }
            ToolCall::FitFrameToContents { frame_id, padding } => {
                self.fit_frame(frame_id, *padding, report).await
            }
        }
    }

    async fn create_sticky_batch(
        &mut self,
        count: u32,
        columns: u32,
        gap: f64,
        x: f64,
        y: f64,
        color: Option<&str>,
        report: &mut ExecutionReport,
    ) -> Result<(), ExecError> {
        let columns = if columns == 0 { self.limits.default_columns } else { columns };
        let columns = columns.min(count).max(1);
        let gap = if gap <= 0.0 { self.limits.sticky_gap } else { gap };
        let step_x = self.limits.sticky_width + gap;
        let step_y = self.limits.sticky_height + gap;
        let mut stickies = Vec::with_capacity(count as usize);
        for index in 0..count {
            let column = f64::from(index % columns);
            let row = f64::from(index / columns);
            stickies.push(self.new_sticky(x + column * step_x, y + row * step_y, color, None));
        }
        self.insert(stickies, report).await
    }

    async fn create_connector(
        &mut self,
        from_object_id: &ObjectId,
        to_object_id: &ObjectId,
        style: ConnectorStyle,
        color: Option<&str>,
        report: &mut ExecutionReport,
    ) -> Result<(), ExecError> {
        let from = self.resolve(from_object_id)?.clone();
        let to = self.resolve(to_object_id)?.clone();
        let (from_anchor, to_anchor) = arrange::connector_anchors(&from, &to);
        let kind = match style {
            ConnectorStyle::Straight => ObjectKind::ConnectorStraight,
            ConnectorStyle::Elbow => ObjectKind::ConnectorElbow,
        };
        let left = from.center_x().min(to.center_x());
        let top = from.center_y().min(to.center_y());
        let width = (from.center_x() - to.center_x()).abs();
        let height = (from.center_y() - to.center_y()).abs();
        let mut connector = self.new_object(kind, left, top, width, height);
        connector.set_color(color.unwrap_or(DEFAULT_CONNECTOR_COLOR));
        connector.set_connector(Some(ConnectorMeta {
            from_object_id: from_object_id.clone(),
            to_object_id: to_object_id.clone(),
            from_anchor,
            to_anchor,
        }));
        self.insert(vec![connector], report).await
    }

    async fn fit_frame(
        &mut self,
        frame_id: &ObjectId,
        padding: f64,
        report: &mut ExecutionReport,
    ) -> Result<(), ExecError> {
        let frame = self.resolve(frame_id)?.clone();
        if frame.kind() != ObjectKind::Frame {
            return Err(ExecError::NotAFrame { object_id: frame_id.clone() });
        }
        let contents: Vec<BoardObject> = self
            .cache
            .values()
            .filter(|object| {
                object.id() != frame_id
                    && !object.kind().is_connector()
                    && object.x() < frame.right()
                    && object.right() > frame.x()
                    && object.y() < frame.bottom()
                    && object.bottom() > frame.y()
            })
            .cloned()
            .collect();
        let Some((left, top, right, bottom)) = arrange::bounding_box(&contents) else {
            return Err(ExecError::EmptyFrame { object_id: frame_id.clone() });
        };
        let mut fitted = frame;
        fitted.set_position(left - padding, top - padding);
        fitted.set_size(right - left + 2.0 * padding, bottom - top + 2.0 * padding);
        self.update(vec![fitted], report).await
    }

    async fn delete(
        &mut self,
        object_ids: &[ObjectId],
        report: &mut ExecutionReport,
    ) -> Result<(), ExecError> {
        // Dedupe while keeping first-seen order so chunk boundaries are
        // deterministic; ids absent from the board never occupy chunk slots.
        let mut seen = std::collections::BTreeSet::new();
        let unique: Vec<ObjectId> = object_ids
            .iter()
            .filter(|id| self.cache.contains_key(*id) && seen.insert((*id).clone()))
            .cloned()
            .collect();
        for chunk in unique.chunks(DELETE_CHUNK_SIZE) {
            let deleted = self.store.delete_objects(&self.board_id, chunk).await?;
            report.deleted_count += deleted;
            for id in chunk {
                self.cache.remove(id);
            }
        }
        Ok(())
    }

    fn new_sticky(&mut self, x: f64, y: f64, color: Option<&str>, text: Option<&str>) -> BoardObject {
        let mut sticky = self.new_object(
            ObjectKind::Sticky,
            x,
            y,
            self.limits.sticky_width,
            self.limits.sticky_height,
        );
        sticky.set_color(color.unwrap_or(DEFAULT_STICKY_COLOR));
        if let Some(text) = text {
            sticky.set_text(text);
        }
        sticky
    }

    fn new_object(&mut self, kind: ObjectKind, x: f64, y: f64, width: f64, height: f64) -> BoardObject {
        let id = ObjectId::new(Uuid::new_v4().to_string()).expect("uuid is a valid id segment");
        let mut object = BoardObject::with_frame(id, kind, x, y, width, height);
        object.set_z_index(self.next_z_index);
        self.next_z_index += 1;
        object
    }

    fn resolve(&self, object_id: &ObjectId) -> Result<&BoardObject, ExecError> {
        self.cache
            .get(object_id)
            .ok_or_else(|| ExecError::ObjectNotFound { object_id: object_id.clone() })
    }

    fn resolve_all(&self, object_ids: &[ObjectId]) -> Result<Vec<BoardObject>, ExecError> {
        object_ids.iter().map(|id| self.resolve(id).cloned()).collect()
    }

    async fn mutate_each(
        &mut self,
        object_ids: &[ObjectId],
        report: &mut ExecutionReport,
        mut mutate: impl FnMut(&mut BoardObject),
    ) -> Result<(), ExecError> {
        let mut objects = self.resolve_all(object_ids)?;
        for object in &mut objects {
            mutate(object);
        }
        self.update(objects, report).await
    }

    async fn insert(
        &mut self,
        objects: Vec<BoardObject>,
        report: &mut ExecutionReport,
    ) -> Result<(), ExecError> {
        self.store.insert_objects(&self.board_id, objects.clone()).await?;
        for object in objects {
            report.created_object_ids.push(object.id().clone());
            self.cache.insert(object.id().clone(), object);
        }
        Ok(())
    }

    async fn update(
        &mut self,
        objects: Vec<BoardObject>,
        report: &mut ExecutionReport,
    ) -> Result<(), ExecError> {
        self.store.update_objects(&self.board_id, objects.clone()).await?;
        report.updated_count += objects.len() as u64;
        for object in objects {
            self.cache.insert(object.id().clone(), object);
        }
        Ok(())
    }
}
