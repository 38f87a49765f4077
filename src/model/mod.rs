// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Core data model: typed ids, board objects, geometry and selection types.

pub mod ids;
pub mod object;

pub use ids::{BoardId, Id, IdError, ObjectId, UserId};
pub use object::{
    AnchorSide, BoardObject, ConnectorMeta, GridMeta, ObjectKind, SelectionUpdate, ViewportBounds,
};
