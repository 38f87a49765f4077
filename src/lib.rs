// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Ondine — natural-language command pipeline for a shared diagramming board.
//!
//! A command flows through three planning tiers: the deterministic planner in
//! [`planner`], an optional hosted LLM planner ([`llm`]) gated by the spend
//! [`budget`], and an optional remote tool-planning service ([`remote`]).
//! Whichever tier wins produces an [`plan::ExecutionPlan`] that [`exec`]
//! applies to a board in [`store`]. The [`orchestrator`] ties the tiers
//! together and the [`mcp`] module serves the result over MCP.

pub mod budget;
pub mod exec;
pub mod llm;
pub mod mcp;
pub mod model;
pub mod orchestrator;
pub mod plan;
pub mod planner;
pub mod remote;
pub mod store;
