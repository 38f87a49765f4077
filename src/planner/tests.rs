// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

use rstest::rstest;

use crate::model::{
    BoardObject, GridMeta, ObjectId, ObjectKind, SelectionUpdate, ViewportBounds,
};
use crate::plan::{PlanLimits, ToolCall};

use super::*;

fn oid(name: &str) -> ObjectId {
    ObjectId::new(name).expect("id")
}

fn sticky(name: &str, x: f64, y: f64, color: &str) -> BoardObject {
    let mut object = BoardObject::with_frame(oid(name), ObjectKind::Sticky, x, y, 160.0, 160.0);
    object.set_color(color);
    object
}

fn viewport() -> ViewportBounds {
    ViewportBounds { left: 0.0, top: 0.0, width: 1600.0, height: 900.0 }
}

struct Fixture {
    objects: Vec<BoardObject>,
    selected: Vec<ObjectId>,
    viewport: Option<ViewportBounds>,
    limits: PlanLimits,
}

impl Fixture {
    fn new(objects: Vec<BoardObject>) -> Self {
        Self {
            objects,
            selected: Vec::new(),
            viewport: Some(viewport()),
            limits: PlanLimits::default(),
        }
    }

    fn select(mut self, ids: &[&str]) -> Self {
        self.selected = ids.iter().map(|name| oid(name)).collect();
        self
    }

    fn without_viewport(mut self) -> Self {
        self.viewport = None;
        self
    }

    fn plan(&self, message: &str) -> PlanOutcome {
        plan(
            message,
            &PlannerContext {
                objects: &self.objects,
                selected_ids: &self.selected,
                viewport: self.viewport.as_ref(),
                limits: &self.limits,
            },
        )
    }
}

fn single_call(outcome: &PlanOutcome) -> &ToolCall {
    let plan = outcome.plan.as_ref().expect("plan");
    assert_eq!(plan.len(), 1);
    &plan.calls()[0]
}

#[test]
fn planner_is_pure() {
    let fixture = Fixture::new(vec![sticky("a", 0.0, 0.0, "yellow")]).select(&["a"]);
    let first = fixture.plan("move it right by 40");
    let second = fixture.plan("move it right by 40");
    assert_eq!(first, second);
}

#[test]
fn unrecognized_command_reports_unsupported() {
    let outcome = Fixture::new(vec![]).plan("sing me a sea shanty");
    assert!(!outcome.planned);
    assert_eq!(outcome.intent, intent::UNSUPPORTED);
    assert!(!outcome.assistant_message.is_empty());
}

#[test]
fn empty_command_reports_unsupported() {
    let outcome = Fixture::new(vec![]).plan("   ");
    assert!(!outcome.planned);
    assert_eq!(outcome.intent, intent::UNSUPPORTED);
}

#[test]
fn select_all_returns_selection_update_only() {
    let fixture = Fixture::new(vec![sticky("a", 0.0, 0.0, "yellow"), sticky("b", 300.0, 0.0, "pink")]);
    let outcome = fixture.plan("select everything");
    assert_eq!(outcome.intent, intent::SELECT_ALL);
    assert!(outcome.plan.is_none());
    let Some(SelectionUpdate::Replace { object_ids }) = outcome.selection_update else {
        panic!("expected replace update");
    };
    assert_eq!(object_ids.len(), 2);
}

#[test]
fn select_visible_uses_viewport_intersection() {
    let fixture = Fixture::new(vec![
        sticky("in", 100.0, 100.0, "yellow"),
        sticky("out", 5000.0, 5000.0, "yellow"),
    ]);
    let outcome = fixture.plan("select what's visible");
    let Some(SelectionUpdate::Replace { object_ids }) = outcome.selection_update else {
        panic!("expected replace update");
    };
    assert_eq!(object_ids, vec![oid("in")]);
}

#[test]
fn unselect_clears_selection() {
    let outcome = Fixture::new(vec![]).plan("deselect everything");
    assert_eq!(outcome.intent, intent::UNSELECT);
    assert_eq!(outcome.selection_update, Some(SelectionUpdate::Clear));
}

#[test]
fn clear_board_deletes_all_objects() {
    let fixture = Fixture::new(vec![sticky("a", 0.0, 0.0, "yellow"), sticky("b", 300.0, 0.0, "pink")]);
    let outcome = fixture.plan("clear the board");
    assert_eq!(outcome.intent, intent::CLEAR_BOARD);
    let ToolCall::DeleteObjects { object_ids } = single_call(&outcome) else {
        panic!("expected deleteObjects");
    };
    assert_eq!(object_ids.len(), 2);
    assert_eq!(outcome.selection_update, Some(SelectionUpdate::Clear));
}

#[test]
fn clear_board_on_empty_board_is_guidance() {
    let outcome = Fixture::new(vec![]).plan("clear the board");
    assert!(!outcome.planned);
    assert_eq!(outcome.intent, intent::CLEAR_BOARD);
}

#[test]
fn delete_selected_requires_selection() {
    let fixture = Fixture::new(vec![sticky("a", 0.0, 0.0, "yellow")]);
    let outcome = fixture.plan("delete the selected objects");
    assert!(!outcome.planned);

    let outcome = fixture.clone_with_selection().plan("delete the selected objects");
    assert_eq!(outcome.intent, intent::DELETE_SELECTED);
    assert!(outcome.planned);
}

impl Fixture {
    fn clone_with_selection(&self) -> Fixture {
        Fixture {
            objects: self.objects.clone(),
            selected: self.objects.iter().map(|o| o.id().clone()).collect(),
            viewport: self.viewport.clone(),
            limits: self.limits,
        }
    }
}

#[rstest]
#[case("add 12 yellow stickies", 12, "yellow")]
#[case("create twelve yellow sticky notes", 12, "yellow")]
#[case("add 4 pink stickies please", 4, "pink")]
fn sticky_batch_parses_count_and_color(
    #[case] message: &str,
    #[case] count: u32,
    #[case] color: &str,
) {
    let outcome = Fixture::new(vec![]).plan(message);
    assert_eq!(outcome.intent, intent::CREATE_STICKY_BATCH);
    let ToolCall::CreateStickyBatch { count: got_count, color: got_color, .. } =
        single_call(&outcome)
    else {
        panic!("expected createStickyBatch");
    };
    assert_eq!(*got_count, count);
    assert_eq!(got_color.as_deref(), Some(color));
}

#[test]
fn sticky_batch_columns_never_exceed_count() {
    let outcome = Fixture::new(vec![]).plan("add 3 stickies");
    let ToolCall::CreateStickyBatch { columns, .. } = single_call(&outcome) else {
        panic!("expected createStickyBatch");
    };
    assert_eq!(*columns, 3);
}

#[test]
fn sticky_batch_over_limit_names_the_cap() {
    let outcome = Fixture::new(vec![]).plan("add 99 stickies");
    assert!(!outcome.planned);
    assert_eq!(outcome.intent, intent::CREATE_STICKY_BATCH);
    assert!(outcome.assistant_message.contains("up to 50"));
}

#[test]
fn sticky_batch_cluster_stays_inside_viewport() {
    let outcome = Fixture::new(vec![]).plan("add 10 stickies on the left");
    let ToolCall::CreateStickyBatch { x, y, columns, gap, .. } = single_call(&outcome) else {
        panic!("expected createStickyBatch");
    };
    let viewport = viewport();
    assert!(*x >= viewport.left);
    assert!(*y >= viewport.top);
    let cluster_w = f64::from(*columns) * 160.0 + f64::from(columns - 1) * gap;
    assert!(x + cluster_w <= viewport.right());
}

#[test]
fn single_sticky_takes_quoted_text() {
    let outcome = Fixture::new(vec![]).plan(r#"add a sticky saying "ship it""#);
    assert_eq!(outcome.intent, intent::CREATE_STICKY);
    let ToolCall::CreateStickyNote { text, .. } = single_call(&outcome) else {
        panic!("expected createStickyNote");
    };
    assert_eq!(text.as_deref(), Some("ship it"));
}

#[test]
fn sticky_at_explicit_point() {
    let outcome = Fixture::new(vec![]).without_viewport().plan("add a sticky at (250, 400)");
    let ToolCall::CreateStickyNote { x, y, .. } = single_call(&outcome) else {
        panic!("expected createStickyNote");
    };
    assert_eq!((*x, *y), (250.0, 400.0));
}

#[rstest]
#[case("draw a rectangle", "create-shape")]
#[case("add a circle", "create-shape")]
#[case("add a frame", "create-frame")]
fn shape_and_frame_creation(#[case] message: &str, #[case] expected_intent: &str) {
    let outcome = Fixture::new(vec![]).plan(message);
    assert!(outcome.planned);
    assert_eq!(outcome.intent, expected_intent);
}

#[test]
fn swot_template_creates_four_sections() {
    let outcome = Fixture::new(vec![]).plan("set up a swot analysis");
    assert_eq!(outcome.intent, intent::CREATE_TEMPLATE);
    let ToolCall::CreateGridContainer { sections, columns, .. } = single_call(&outcome) else {
        panic!("expected createGridContainer");
    };
    assert_eq!(sections.len(), 4);
    assert_eq!(*columns, 2);
}

fn retro_board() -> BoardObject {
    let mut container = BoardObject::with_frame(
        oid("retro"),
        ObjectKind::GridContainer,
        0.0,
        0.0,
        840.0,
        460.0,
    );
    container.set_grid(Some(GridMeta {
        columns: 3,
        gap_x: 16.0,
        gap_y: 16.0,
        sections: vec!["Went well".to_owned(), "To improve".to_owned(), "Action items".to_owned()],
    }));
    container
}

#[test]
fn append_to_section_targets_the_matched_cell() {
    let fixture = Fixture::new(vec![retro_board()]);
    let outcome = fixture.plan(r#"add "fix CI" to the improve section"#);
    assert_eq!(outcome.intent, intent::APPEND_TO_GRID);
    let ToolCall::CreateStickyNote { x, text, .. } = single_call(&outcome) else {
        panic!("expected createStickyNote");
    };
    assert_eq!(text.as_deref(), Some("fix CI"));
    // "To improve" is the middle column of three.
    assert!(*x >= 280.0 && *x < 560.0);
}

#[test]
fn append_with_unknown_section_lists_options() {
    let fixture = Fixture::new(vec![retro_board()]);
    let outcome = fixture.plan("add a sticky to the blockers section");
    assert!(!outcome.planned);
    assert!(outcome.assistant_message.contains("Went well"));
}

#[test]
fn connector_needs_exactly_two_selected() {
    let objects = vec![sticky("a", 0.0, 0.0, "yellow"), sticky("b", 600.0, 0.0, "pink")];
    let fixture = Fixture::new(objects.clone()).select(&["a", "b"]);
    let outcome = fixture.plan("connect these two");
    assert_eq!(outcome.intent, intent::CREATE_CONNECTOR);
    assert!(outcome.planned);

    let outcome = Fixture::new(objects).select(&["a"]).plan("connect these");
    assert!(!outcome.planned);
}

#[test]
fn arrange_uses_selection_and_columns() {
    let fixture = Fixture::new(vec![
        sticky("a", 0.0, 0.0, "yellow"),
        sticky("b", 500.0, 10.0, "yellow"),
        sticky("c", 20.0, 700.0, "yellow"),
    ])
    .select(&["a", "b", "c"]);
    let outcome = fixture.plan("arrange these in a grid with 2 columns");
    let ToolCall::ArrangeObjectsInGrid { object_ids, columns, .. } = single_call(&outcome) else {
        panic!("expected arrangeObjectsInGrid");
    };
    assert_eq!(object_ids.len(), 3);
    assert_eq!(*columns, 2);
}

#[test]
fn align_without_edge_asks_which_way() {
    let fixture =
        Fixture::new(vec![sticky("a", 0.0, 0.0, "yellow"), sticky("b", 300.0, 0.0, "yellow")])
            .select(&["a", "b"]);
    let outcome = fixture.plan("align the selected objects somehow");
    assert!(!outcome.planned);
    assert_eq!(outcome.intent, intent::ALIGN);
}

#[test]
fn align_left_plans_align_call() {
    let fixture =
        Fixture::new(vec![sticky("a", 100.0, 0.0, "yellow"), sticky("b", 300.0, 50.0, "yellow")])
            .select(&["a", "b"]);
    let outcome = fixture.plan("align them left");
    let ToolCall::AlignObjects { edge, .. } = single_call(&outcome) else {
        panic!("expected alignObjects");
    };
    assert_eq!(*edge, crate::plan::AlignEdge::Left);
}

#[test]
fn distribute_needs_three_objects() {
    let fixture =
        Fixture::new(vec![sticky("a", 0.0, 0.0, "yellow"), sticky("b", 300.0, 0.0, "yellow")])
            .select(&["a", "b"]);
    let outcome = fixture.plan("distribute them horizontally");
    assert!(!outcome.planned);
}

#[test]
fn move_by_filter_targets_matching_objects_without_selection() {
    let fixture = Fixture::new(vec![
        sticky("r1", 0.0, 0.0, "red"),
        sticky("r2", 300.0, 0.0, "red"),
        sticky("y1", 600.0, 0.0, "yellow"),
    ]);
    let outcome = fixture.plan("move the red stickies right by 50");
    let ToolCall::MoveObjects { object_ids, dx, .. } = single_call(&outcome) else {
        panic!("expected moveObjects");
    };
    assert_eq!(object_ids.len(), 2);
    assert_eq!(*dx, 50.0);
}

#[test]
fn move_to_point_produces_absolute_target() {
    let fixture = Fixture::new(vec![sticky("a", 0.0, 0.0, "yellow")]).select(&["a"]);
    let outcome = fixture.plan("move it to (400, 200)");
    let ToolCall::MoveObjects { to, .. } = single_call(&outcome) else {
        panic!("expected moveObjects");
    };
    assert_eq!(*to, Some(crate::plan::PointArg { x: 400.0, y: 200.0 }));
}

#[test]
fn recolor_with_two_colors_filters_on_the_first() {
    let fixture = Fixture::new(vec![
        sticky("r1", 0.0, 0.0, "red"),
        sticky("y1", 300.0, 0.0, "yellow"),
    ]);
    let outcome = fixture.plan("make the red stickies blue");
    assert_eq!(outcome.intent, intent::CHANGE_COLOR);
    let ToolCall::ChangeColor { object_ids, color } = single_call(&outcome) else {
        panic!("expected changeColor");
    };
    assert_eq!(object_ids, &vec![oid("r1")]);
    assert_eq!(color, "blue");
}

#[test]
fn fit_frame_resolves_the_sole_frame() {
    let mut objects = vec![sticky("a", 0.0, 0.0, "yellow")];
    objects.push(BoardObject::with_frame(oid("f"), ObjectKind::Frame, 0.0, 0.0, 800.0, 600.0));
    let outcome = Fixture::new(objects).plan("fit the frame to its contents");
    let ToolCall::FitFrameToContents { frame_id, .. } = single_call(&outcome) else {
        panic!("expected fitFrameToContents");
    };
    assert_eq!(frame_id, &oid("f"));
}

#[test]
fn summarize_reads_selected_texts() {
    let mut a = sticky("a", 0.0, 0.0, "yellow");
    a.set_text("ship the release");
    let mut b = sticky("b", 300.0, 0.0, "yellow");
    b.set_text("fix onboarding");
    let fixture = Fixture::new(vec![a, b]).select(&["a", "b"]);
    let outcome = fixture.plan("summarize the selected notes");
    assert_eq!(outcome.intent, intent::SUMMARIZE);
    assert!(outcome.plan.is_none());
    assert!(outcome.assistant_message.contains("ship the release"));
    assert!(outcome.assistant_message.contains("fix onboarding"));
}

#[test]
fn extract_actions_filters_action_like_texts() {
    let mut a = sticky("a", 0.0, 0.0, "yellow");
    a.set_text("TODO: wire up billing");
    let mut b = sticky("b", 300.0, 0.0, "yellow");
    b.set_text("nice weather today");
    let fixture = Fixture::new(vec![a, b]).select(&["a", "b"]);
    let outcome = fixture.plan("extract the action items");
    assert_eq!(outcome.intent, intent::EXTRACT_ACTIONS);
    assert!(outcome.assistant_message.contains("wire up billing"));
    assert!(!outcome.assistant_message.contains("nice weather"));
}
