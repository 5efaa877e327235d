//! CLI commands.
//!
//! Each submodule implements a single CLI command with its argument
//! parsing and execution logic.

/// Check that AnkiConnect is reachable.
pub mod check;

/// Shell completion script generation.
pub mod completions;

/// Show the resolved configuration.
pub mod config;

/// Run the MCP server on stdio.
pub mod serve;
