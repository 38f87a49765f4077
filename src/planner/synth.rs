// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Read-only synthesis intents. The assistant message is the whole
//! deliverable; nothing here ever mutates the board.

use crate::model::BoardObject;

use super::{intent, PlanOutcome, PlannerContext};

pub(super) fn try_plan(text: &str, ctx: &PlannerContext<'_>) -> Option<PlanOutcome> {
    if text.contains("summarize") || text.contains("summarise") || text.contains("summary") {
        return Some(summarize(ctx));
    }
    if text.contains("action item") || text.contains("action items") || text.contains("next steps")
    {
        return Some(extract_actions(ctx));
    }
    None
}

fn texts_of(objects: &[&BoardObject]) -> Vec<String> {
    objects
        .iter()
        .map(|object| object.text().trim())
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
        .collect()
}

fn target_objects<'a>(ctx: &PlannerContext<'a>) -> Vec<&'a BoardObject> {
    if ctx.selected_ids.is_empty() {
        ctx.objects.iter().collect()
    } else {
        ctx.selected_objects()
    }
}

fn summarize(ctx: &PlannerContext<'_>) -> PlanOutcome {
    let texts = texts_of(&target_objects(ctx));
    if texts.is_empty() {
        return PlanOutcome::guidance(
            intent::SUMMARIZE,
            "There's no text to summarize. Select some notes with text first.",
        );
    }
    let mut message = format!("Here's what the {} note(s) say:\n", texts.len());
    for text in &texts {
        message.push_str("- ");
        message.push_str(text);
        message.push('\n');
    }
    PlanOutcome::message_only(intent::SUMMARIZE, message.trim_end().to_owned())
}

const ACTION_CUES: &[&str] = &["todo", "to do", "action", "fix", "follow up", "follow-up", "next"];

fn extract_actions(ctx: &PlannerContext<'_>) -> PlanOutcome {
    let texts = texts_of(&target_objects(ctx));
    if texts.is_empty() {
        return PlanOutcome::guidance(
            intent::EXTRACT_ACTIONS,
            "There's no text to scan for action items.",
        );
    }
    let actions: Vec<&String> = texts
        .iter()
        .filter(|text| {
            let lowered = text.to_lowercase();
            ACTION_CUES.iter().any(|cue| lowered.contains(cue)) || text.contains('!')
        })
        .collect();
    if actions.is_empty() {
        return PlanOutcome::message_only(
            intent::EXTRACT_ACTIONS,
            "I didn't find anything that reads like an action item.",
        );
    }
    let mut message = format!("Found {} action item(s):\n", actions.len());
    for action in &actions {
        message.push_str("- ");
        message.push_str(action);
        message.push('\n');
    }
    PlanOutcome::message_only(intent::EXTRACT_ACTIONS, message.trim_end().to_owned())
}
