//! Adaptive study sessions.
//!
//! Turns plain front/back cards into several question framings, scores
//! free-text answers, and feeds the resulting ease back into Anki.
//!
//! # Submodules
//!
//! - `variations` - question framings generated from a card
//! - `evaluator` - lenient free-text answer matching
//! - `session` - session state and the expiring session store
//! - `manager` - session lifecycle against a [`FlashcardService`]
//!
//! [`FlashcardService`]: crate::anki::FlashcardService

pub mod evaluator;
pub mod manager;
pub mod session;
pub mod variations;

pub use evaluator::{is_correct, normalize};
pub use manager::{
    AnswerFeedback, CompletionAck, NothingDue, ReviewOutcome, StartOutcome, StudySessionManager,
};
pub use session::{SessionCard, SessionStore, StudySession};
pub use variations::{generate_variations, QuestionKind, VariationQuestion};

use crate::anki::{AnkiError, CardId};

/// Errors raised by study session operations.
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    /// No live session has this id; it never existed or has expired.
    #[error("Study session not found or expired: {0}")]
    UnknownSession(String),

    /// A caller-supplied session id is already in use.
    #[error("Study session already exists: {0}")]
    SessionExists(String),

    /// Answers can only be submitted for cards of the session.
    #[error("Card {card_id} is not part of study session {session_id}")]
    CardNotInSession {
        card_id: CardId,
        session_id: String,
    },

    /// The question index does not name one of the card's variations.
    #[error("Question index {index} is out of range: card {card_id} has {available} questions")]
    QuestionIndexOutOfRange {
        card_id: CardId,
        index: usize,
        available: usize,
    },

    /// A session needs at least one card.
    #[error("maxCards must be at least 1")]
    InvalidMaxCards,

    /// The flashcard service call failed.
    #[error(transparent)]
    Upstream(#[from] AnkiError),
}
