// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Extraction helpers shared by the rule-based planner.
//!
//! Everything here is pure string analysis over the lowercased command text.
//! Helpers return `None` rather than guessing when the text is ambiguous.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::ObjectKind;
use crate::plan::{AlignEdge, Axis};

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

pub const COLOR_NAMES: &[&str] = &[
    "yellow", "pink", "red", "orange", "green", "blue", "purple", "teal", "cyan", "magenta",
    "white", "black", "gray", "brown",
];

/// Finds a color keyword in the text. Exact word matches win; a fuzzy pass
/// catches common misspellings ("yelow", "purpel") without matching unrelated
/// words.
pub fn color_keyword(text: &str) -> Option<&'static str> {
    for word in words(text) {
        if word == "grey" {
            return Some("gray");
        }
        if let Some(color) = COLOR_NAMES.iter().find(|c| **c == word) {
            return Some(color);
        }
    }
    for word in words(text) {
        if word.len() < 4 {
            continue;
        }
        for color in COLOR_NAMES {
            let score = rapidfuzz::fuzz::ratio(word.chars(), color.chars());
            if score >= 87.0 {
                return Some(color);
            }
        }
    }
    None
}

/// All exact color words in order of appearance. Recolor commands can carry
/// two ("make the red stickies blue"): the first filters, the last is the new
/// color.
pub fn color_keywords(text: &str) -> Vec<&'static str> {
    words(text)
        .filter_map(|word| {
            if word == "grey" {
                return Some("gray");
            }
            COLOR_NAMES.iter().find(|c| **c == word).copied()
        })
        .collect()
}

/// `by 50` in a move command.
pub fn move_amount(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let captures = regex(&RE, r"by\s+(\d+(?:\.\d+)?)").captures(text)?;
    captures[1].parse().ok()
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|ch: char| !ch.is_ascii_alphanumeric()).filter(|w| !w.is_empty())
}

const WORD_NUMBERS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("a dozen", 12),
    ("twenty", 20),
];

/// First standalone number in the text, digits or small number words.
pub fn count(text: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if let Some(captures) = regex(&RE, r"\b(\d+)\b").captures(text) {
        return captures[1].parse().ok();
    }
    for (word, value) in WORD_NUMBERS {
        if text.contains(word) {
            return Some(*value);
        }
    }
    None
}

/// `at (120, 340)`, `to 120,340`, `at 120 x 340`.
pub fn coordinates(text: &str) -> Option<(f64, f64)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let captures = regex(
        &RE,
        r"(?:at|to)\s*\(?\s*(-?\d+(?:\.\d+)?)\s*[,x]\s*(-?\d+(?:\.\d+)?)\s*\)?",
    )
    .captures(text)?;
    Some((captures[1].parse().ok()?, captures[2].parse().ok()?))
}

/// `3 columns`, `in 4 cols`.
pub fn columns(text: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let captures = regex(&RE, r"(\d+)\s*(?:columns?|cols?)\b").captures(text)?;
    captures[1].parse().ok()
}

/// `gap of 30`, `spacing 12`.
pub fn gap(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let captures = regex(&RE, r"(?:gap|spacing)\s*(?:of)?\s*(\d+(?:\.\d+)?)").captures(text)?;
    captures[1].parse().ok()
}

/// `W x H` size, distinct from a coordinate pair by requiring a size cue word.
pub fn size(text: &str) -> Option<(f64, f64)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let captures = regex(
        &RE,
        r"(?:to|size)\s*(\d+(?:\.\d+)?)\s*(?:x|by)\s*(\d+(?:\.\d+)?)",
    )
    .captures(text)?;
    Some((captures[1].parse().ok()?, captures[2].parse().ok()?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportSide {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

/// "on the left (side)", "at the top of the screen", "in the center/middle".
pub fn viewport_side(text: &str) -> Option<ViewportSide> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let captures = regex(
        &RE,
        r"(?:on|at|in|to)\s+the\s+(left|right|top|bottom|center|middle)\b",
    )
    .captures(text)?;
    Some(match &captures[1] {
        "left" => ViewportSide::Left,
        "right" => ViewportSide::Right,
        "top" => ViewportSide::Top,
        "bottom" => ViewportSide::Bottom,
        _ => ViewportSide::Center,
    })
}

/// Alignment keyword, only meaningful next to an "align" verb.
pub fn alignment(text: &str) -> Option<AlignEdge> {
    if text.contains("left") {
        Some(AlignEdge::Left)
    } else if text.contains("right") {
        Some(AlignEdge::Right)
    } else if text.contains("top") {
        Some(AlignEdge::Top)
    } else if text.contains("bottom") {
        Some(AlignEdge::Bottom)
    } else if text.contains("horizontal") {
        Some(AlignEdge::CenterHorizontal)
    } else if text.contains("vertical") {
        Some(AlignEdge::CenterVertical)
    } else if text.contains("center") || text.contains("middle") {
        Some(AlignEdge::CenterHorizontal)
    } else {
        None
    }
}

pub fn distribution_axis(text: &str) -> Option<Axis> {
    if text.contains("horizontal") || text.contains("left to right") {
        Some(Axis::Horizontal)
    } else if text.contains("vertical") || text.contains("top to bottom") {
        Some(Axis::Vertical)
    } else if text.contains("evenly") || text.contains("equal") {
        Some(Axis::Horizontal)
    } else {
        None
    }
}

/// Text payload for a created or edited object: quoted span first, then a
/// trailing clause after a "saying"-style cue.
pub fn payload_text(original: &str) -> Option<String> {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    if let Some(captures) = regex(&QUOTED, r#""([^"]+)"|'([^']+)'"#).captures(original) {
        let span = captures.get(1).or_else(|| captures.get(2))?;
        return Some(span.as_str().trim().to_owned());
    }
    static CUE: OnceLock<Regex> = OnceLock::new();
    let captures = regex(
        &CUE,
        r"(?:saying|that says|labeled|labelled|titled|with (?:the )?te?xt)\s+(.+)$",
    )
    .captures(original)?;
    let span = captures[1].trim().trim_end_matches(['.', '!']);
    (!span.is_empty()).then(|| span.to_owned())
}

/// Object-kind keyword, for filters like "the red stickies".
pub fn kind_keyword(text: &str) -> Option<ObjectKind> {
    for word in words(text) {
        let kind = match word {
            "sticky" | "stickies" | "note" | "notes" | "postit" | "postits" => ObjectKind::Sticky,
            "rect" | "rects" | "rectangle" | "rectangles" | "box" | "boxes" | "square"
            | "squares" => ObjectKind::Rect,
            "circle" | "circles" | "ellipse" | "ellipses" => ObjectKind::Circle,
            "line" | "lines" => ObjectKind::Line,
            "triangle" | "triangles" => ObjectKind::Triangle,
            "star" | "stars" => ObjectKind::Star,
            "frame" | "frames" => ObjectKind::Frame,
            "grid" => ObjectKind::GridContainer,
            "connector" | "connectors" | "arrow" | "arrows" => ObjectKind::ConnectorElbow,
            _ => continue,
        };
        return Some(kind);
    }
    None
}
