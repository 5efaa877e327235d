//! MCP (Model Context Protocol) server for the Anki collection.
//!
//! Exposes Anki decks, notes, and cards plus adaptive study sessions to
//! AI tools. The server runs on stdio transport and implements:
//! - `list_decks`, `create_deck`: deck management
//! - `add_note`, `add_card`: note creation
//! - `find_cards`, `get_card_info`, `get_today_cards`: card lookup
//! - `answer_card`, `update_card_interval`, `suspend_card`: scheduling
//! - `get_study_progress`: due counts and deck statistics
//! - `create_study_session`, `submit_answer`, `complete_card_study`:
//!   the adaptive study flow
//!
//! Every failure is returned as a tool result with the error flag set.

mod params;
mod server;

pub use server::{run_server, AnkiStudyServer};

use crate::anki::AnkiError;
use crate::study::StudyError;

/// Errors reported by tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A parameter value was rejected before calling Anki.
    #[error("Invalid parameters: {0}")]
    Validation(String),

    /// The AnkiConnect call failed.
    #[error(transparent)]
    Upstream(#[from] AnkiError),

    /// A study session operation failed.
    #[error(transparent)]
    Study(#[from] StudyError),
}
