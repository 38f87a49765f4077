// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Board objects and their geometry.
//!
//! A board is a flat collection of [`BoardObject`]s; containers and connectors
//! carry extra metadata but share the same record shape so the store stays a
//! single homogeneous table.

use serde::{Deserialize, Serialize};

use super::ids::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Sticky,
    Rect,
    Circle,
    Line,
    Triangle,
    Star,
    GridContainer,
    Frame,
    ConnectorStraight,
    ConnectorElbow,
}

impl ObjectKind {
    pub fn is_connector(self) -> bool {
        matches!(self, Self::ConnectorStraight | Self::ConnectorElbow)
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::GridContainer | Self::Frame)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sticky => "sticky",
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::Line => "line",
            Self::Triangle => "triangle",
            Self::Star => "star",
            Self::GridContainer => "grid-container",
            Self::Frame => "frame",
            Self::ConnectorStraight => "connector-straight",
            Self::ConnectorElbow => "connector-elbow",
        }
    }
}

/// Anchor side on a shape's bounding box where a connector attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl AnchorSide {
    pub fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

/// Grid metadata carried by grid containers (and rectangles promoted to act
/// as one): section labels in row-major order plus the column/gap layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMeta {
    pub columns: u32,
    pub gap_x: f64,
    pub gap_y: f64,
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorMeta {
    pub from_object_id: ObjectId,
    pub to_object_id: ObjectId,
    pub from_anchor: AnchorSide,
    pub to_anchor: AnchorSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardObject {
    id: ObjectId,
    kind: ObjectKind,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    rotation: f64,
    color: String,
    text: String,
    z_index: i64,
    updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grid: Option<GridMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connector: Option<ConnectorMeta>,
}

impl BoardObject {
    pub fn new(id: ObjectId, kind: ObjectKind) -> Self {
        Self {
            id,
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            color: String::new(),
            text: String::new(),
            z_index: 0,
            updated_at_ms: 0,
            grid: None,
            connector: None,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn z_index(&self) -> i64 {
        self.z_index
    }

    pub fn updated_at_ms(&self) -> u64 {
        self.updated_at_ms
    }

    pub fn grid(&self) -> Option<&GridMeta> {
        self.grid.as_ref()
    }

    pub fn connector(&self) -> Option<&ConnectorMeta> {
        self.connector.as_ref()
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = rotation;
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_z_index(&mut self, z_index: i64) {
        self.z_index = z_index;
    }

    pub fn set_updated_at_ms(&mut self, updated_at_ms: u64) {
        self.updated_at_ms = updated_at_ms;
    }

    pub fn set_grid(&mut self, grid: Option<GridMeta>) {
        self.grid = grid;
    }

    pub fn set_connector(&mut self, connector: Option<ConnectorMeta>) {
        self.connector = connector;
    }

    /// Containers eligible as placement targets: grid containers, or rects
    /// that carry grid metadata left behind by an earlier template.
    pub fn is_grid_target(&self) -> bool {
        self.kind == ObjectKind::GridContainer
            || (self.kind == ObjectKind::Rect && self.grid.is_some())
    }

    pub fn with_frame(id: ObjectId, kind: ObjectKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        let mut object = Self::new(id, kind);
        object.set_position(x, y);
        object.set_size(width, height);
        object
    }
}

/// Visible world rectangle reported by the requesting client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportBounds {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    pub fn intersects(&self, object: &BoardObject) -> bool {
        object.x() < self.right()
            && object.right() > self.left
            && object.y() < self.bottom()
            && object.bottom() > self.top
    }
}

/// Replacement for the client's selection set, emitted by a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SelectionUpdate {
    Replace { object_ids: Vec<ObjectId> },
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: &str, kind: ObjectKind) -> BoardObject {
        BoardObject::new(ObjectId::new(id).expect("object id"), kind)
    }

    #[test]
    fn viewport_intersection_is_exclusive_of_touching_edges() {
        let viewport = ViewportBounds { left: 0.0, top: 0.0, width: 100.0, height: 100.0 };

        let mut inside = object("a", ObjectKind::Sticky);
        inside.set_position(50.0, 50.0);
        inside.set_size(10.0, 10.0);
        assert!(viewport.intersects(&inside));

        let mut touching = object("b", ObjectKind::Sticky);
        touching.set_position(100.0, 0.0);
        touching.set_size(10.0, 10.0);
        assert!(!viewport.intersects(&touching));
    }

    #[test]
    fn rect_with_grid_meta_is_a_grid_target() {
        let mut rect = object("r", ObjectKind::Rect);
        assert!(!rect.is_grid_target());
        rect.set_grid(Some(GridMeta {
            columns: 2,
            gap_x: 16.0,
            gap_y: 16.0,
            sections: vec!["Strengths".to_owned(), "Weaknesses".to_owned()],
        }));
        assert!(rect.is_grid_target());
    }

    #[test]
    fn connector_kinds_are_connectors() {
        assert!(ObjectKind::ConnectorElbow.is_connector());
        assert!(ObjectKind::ConnectorStraight.is_connector());
        assert!(!ObjectKind::Sticky.is_connector());
    }

    #[test]
    fn board_object_serde_round_trip() {
        let mut sticky = object("s-1", ObjectKind::Sticky);
        sticky.set_position(10.0, 20.0);
        sticky.set_size(160.0, 160.0);
        sticky.set_color("#fde047");
        sticky.set_text("hello");
        sticky.set_z_index(3);

        let json = serde_json::to_string(&sticky).expect("serialize");
        let back: BoardObject = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, sticky);
    }
}
