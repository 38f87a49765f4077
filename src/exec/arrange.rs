// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Pure layout geometry. Functions here mutate object positions in memory;
//! persistence stays with the executor.

use crate::model::{AnchorSide, BoardObject};
use crate::plan::{AlignEdge, Axis};

/// Lays objects out in reading order on a grid. Each column is as wide as its
/// widest member and each row as tall as its tallest, so mixed sizes never
/// overlap.
pub fn arrange_in_grid(
    objects: &mut [BoardObject],
    columns: usize,
    gap_x: f64,
    gap_y: f64,
    origin_x: f64,
    origin_y: f64,
) {
    if objects.is_empty() || columns == 0 {
        return;
    }
    let rows = objects.len().div_ceil(columns);
    let mut column_widths = vec![0.0_f64; columns];
    let mut row_heights = vec![0.0_f64; rows];
    for (index, object) in objects.iter().enumerate() {
        let column = index % columns;
        let row = index / columns;
        column_widths[column] = column_widths[column].max(object.width());
        row_heights[row] = row_heights[row].max(object.height());
    }
    let mut column_offsets = vec![0.0_f64; columns];
    for column in 1..columns {
        column_offsets[column] = column_offsets[column - 1] + column_widths[column - 1] + gap_x;
    }
    let mut row_offsets = vec![0.0_f64; rows];
    for row in 1..rows {
        row_offsets[row] = row_offsets[row - 1] + row_heights[row - 1] + gap_y;
    }
    for (index, object) in objects.iter_mut().enumerate() {
        let column = index % columns;
        let row = index / columns;
        object.set_position(origin_x + column_offsets[column], origin_y + row_offsets[row]);
    }
}

/// Aligns objects to a shared edge or centerline derived from the group's
/// bounding box.
pub fn align_objects(objects: &mut [BoardObject], edge: AlignEdge) {
    if objects.len() < 2 {
        return;
    }
    match edge {
        AlignEdge::Left => {
            let target = fold_min(objects.iter().map(BoardObject::x));
            for object in objects.iter_mut() {
                object.set_position(target, object.y());
            }
        }
        AlignEdge::Right => {
            let target = fold_max(objects.iter().map(BoardObject::right));
            for object in objects.iter_mut() {
                object.set_position(target - object.width(), object.y());
            }
        }
        AlignEdge::Top => {
            let target = fold_min(objects.iter().map(BoardObject::y));
            for object in objects.iter_mut() {
                object.set_position(object.x(), target);
            }
        }
        AlignEdge::Bottom => {
            let target = fold_max(objects.iter().map(BoardObject::bottom));
            for object in objects.iter_mut() {
                object.set_position(object.x(), target - object.height());
            }
        }
        AlignEdge::CenterHorizontal => {
            let left = fold_min(objects.iter().map(BoardObject::x));
            let right = fold_max(objects.iter().map(BoardObject::right));
            let target = (left + right) / 2.0;
            for object in objects.iter_mut() {
                object.set_position(target - object.width() / 2.0, object.y());
            }
        }
        AlignEdge::CenterVertical => {
            let top = fold_min(objects.iter().map(BoardObject::y));
            let bottom = fold_max(objects.iter().map(BoardObject::bottom));
            let target = (top + bottom) / 2.0;
            for object in objects.iter_mut() {
                object.set_position(object.x(), target - object.height() / 2.0);
            }
        }
    }
}

/// Spreads object centers evenly along one axis. The outermost two objects
/// stay put; the rest are repositioned between them in rank order.
pub fn distribute_objects(objects: &mut [BoardObject], axis: Axis) {
    if objects.len() < 3 {
        return;
    }
    let center = |object: &BoardObject| match axis {
        Axis::Horizontal => object.center_x(),
        Axis::Vertical => object.center_y(),
    };
    let mut order: Vec<usize> = (0..objects.len()).collect();
    order.sort_by(|&a, &b| {
        center(&objects[a]).partial_cmp(&center(&objects[b])).unwrap_or(std::cmp::Ordering::Equal)
    });
    let first = center(&objects[order[0]]);
    let last = center(&objects[order[order.len() - 1]]);
    let step = (last - first) / (order.len() - 1) as f64;
    for (rank, &index) in order.iter().enumerate() {
        let target = first + step * rank as f64;
        let object = &mut objects[index];
        match axis {
            Axis::Horizontal => object.set_position(target - object.width() / 2.0, object.y()),
            Axis::Vertical => object.set_position(object.x(), target - object.height() / 2.0),
        }
    }
}

/// Picks connector anchor sides from the dominant displacement between the
/// endpoint centers: a mostly-horizontal pair connects left/right, a
/// mostly-vertical pair top/bottom. Ties go horizontal.
pub fn connector_anchors(from: &BoardObject, to: &BoardObject) -> (AnchorSide, AnchorSide) {
    let dx = to.center_x() - from.center_x();
    let dy = to.center_y() - from.center_y();
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 {
            (AnchorSide::Right, AnchorSide::Left)
        } else {
            (AnchorSide::Left, AnchorSide::Right)
        }
    } else if dy >= 0.0 {
        (AnchorSide::Bottom, AnchorSide::Top)
    } else {
        (AnchorSide::Top, AnchorSide::Bottom)
    }
}

/// Bounding box of a non-empty set of objects: (left, top, right, bottom).
pub fn bounding_box(objects: &[BoardObject]) -> Option<(f64, f64, f64, f64)> {
    let first = objects.first()?;
    let mut bbox = (first.x(), first.y(), first.right(), first.bottom());
    for object in &objects[1..] {
        bbox.0 = bbox.0.min(object.x());
        bbox.1 = bbox.1.min(object.y());
        bbox.2 = bbox.2.max(object.right());
        bbox.3 = bbox.3.max(object.bottom());
    }
    Some(bbox)
}

fn fold_min(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

fn fold_max(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use crate::model::{ObjectId, ObjectKind};

    use super::*;

    fn object(name: &str, x: f64, y: f64, width: f64, height: f64) -> BoardObject {
        BoardObject::with_frame(
            ObjectId::new(name).expect("id"),
            ObjectKind::Sticky,
            x,
            y,
            width,
            height,
        )
    }

    #[test]
    fn grid_uses_per_column_and_per_row_footprints() {
        let mut objects = vec![
            object("a", 0.0, 0.0, 100.0, 50.0),
            object("b", 0.0, 0.0, 40.0, 80.0),
            object("c", 0.0, 0.0, 60.0, 30.0),
            object("d", 0.0, 0.0, 20.0, 20.0),
        ];
        arrange_in_grid(&mut objects, 2, 10.0, 10.0, 0.0, 0.0);
        // Column 0 is 100 wide (a, c), row 0 is 80 tall (a, b).
        assert_eq!((objects[0].x(), objects[0].y()), (0.0, 0.0));
        assert_eq!((objects[1].x(), objects[1].y()), (110.0, 0.0));
        assert_eq!((objects[2].x(), objects[2].y()), (0.0, 90.0));
        assert_eq!((objects[3].x(), objects[3].y()), (110.0, 90.0));
    }

    #[test]
    fn align_left_snaps_to_minimum_x() {
        let mut objects = vec![
            object("a", 100.0, 0.0, 50.0, 50.0),
            object("b", 300.0, 60.0, 50.0, 50.0),
            object("c", 220.0, 120.0, 50.0, 50.0),
        ];
        align_objects(&mut objects, AlignEdge::Left);
        assert!(objects.iter().all(|o| o.x() == 100.0));
    }

    #[test]
    fn align_bottom_snaps_to_maximum_bottom() {
        let mut objects = vec![
            object("a", 0.0, 10.0, 50.0, 40.0),
            object("b", 60.0, 30.0, 50.0, 70.0),
        ];
        align_objects(&mut objects, AlignEdge::Bottom);
        assert_eq!(objects[0].bottom(), 100.0);
        assert_eq!(objects[1].bottom(), 100.0);
    }

    #[test]
    fn distribute_keeps_ends_and_spaces_middles_evenly() {
        let mut objects = vec![
            object("a", 130.0, 0.0, 40.0, 40.0),  // center 150
            object("b", 290.0, 0.0, 40.0, 40.0),  // center 310
            object("c", 530.0, 0.0, 40.0, 40.0),  // center 550
        ];
        distribute_objects(&mut objects, Axis::Horizontal);
        assert_eq!(objects[0].center_x(), 150.0);
        assert_eq!(objects[1].center_x(), 350.0);
        assert_eq!(objects[2].center_x(), 550.0);
    }

    #[test]
    fn distribute_is_rank_ordered_not_input_ordered() {
        let mut objects = vec![
            object("right", 530.0, 0.0, 40.0, 40.0),
            object("left", 130.0, 0.0, 40.0, 40.0),
            object("mid", 290.0, 0.0, 40.0, 40.0),
        ];
        distribute_objects(&mut objects, Axis::Horizontal);
        assert_eq!(objects[1].center_x(), 150.0);
        assert_eq!(objects[2].center_x(), 350.0);
        assert_eq!(objects[0].center_x(), 550.0);
    }

    #[test]
    fn connector_anchors_follow_dominant_axis() {
        let from = object("a", 0.0, 0.0, 100.0, 100.0);
        let to_right = object("b", 400.0, 20.0, 100.0, 100.0);
        assert_eq!(connector_anchors(&from, &to_right), (AnchorSide::Right, AnchorSide::Left));
        let to_below = object("c", 20.0, 400.0, 100.0, 100.0);
        assert_eq!(connector_anchors(&from, &to_below), (AnchorSide::Bottom, AnchorSide::Top));
    }

    #[test]
    fn bounding_box_covers_all_objects() {
        let objects =
            vec![object("a", 10.0, 20.0, 30.0, 40.0), object("b", -5.0, 50.0, 10.0, 10.0)];
        assert_eq!(bounding_box(&objects), Some((-5.0, 20.0, 40.0, 60.0)));
    }
}
