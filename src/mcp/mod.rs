// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Model Context Protocol (MCP) server surface.
//!
//! `board.command` runs the full planning pipeline on a natural-language
//! message; the `board.*` read tools let an agent inspect boards between
//! commands.

mod server;
mod types;

pub use server::OndineMcp;
