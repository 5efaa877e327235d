//! Command-line interface for the Anki study server.
//!
//! Provides the commands for running the MCP server and for checking
//! the AnkiConnect connection and configuration.

/// Individual CLI command implementations.
pub mod commands;
