//! AnkiConnect client for the flashcard collection.
//!
//! Provides access to a running Anki instance through the AnkiConnect
//! add-on, which exposes a JSON action API over HTTP.
//!
//! # Submodules
//!
//! - `client` - HTTP client and the [`FlashcardService`] capability trait
//! - `models` - Card records, note payloads, and the ease signal

pub mod client;
pub mod models;

pub use client::{deck_query, AnkiClient, FlashcardService};
pub use models::{CardId, CardInfo, Ease, FieldValue, NewNote};

/// Default AnkiConnect endpoint.
pub const DEFAULT_ANKI_CONNECT_URL: &str = "http://localhost:8765";

/// AnkiConnect API version spoken by this client.
pub const ANKI_CONNECT_VERSION: u32 = 6;

/// Errors returned by AnkiConnect calls.
///
/// Callers in the study engine treat every variant the same way and only
/// surface the message.
#[derive(Debug, thiserror::Error)]
pub enum AnkiError {
    /// Network or connection error, including timeouts.
    #[error("AnkiConnect request failed: {0}")]
    RequestFailed(String),

    /// AnkiConnect answered with a non-success HTTP status.
    #[error("AnkiConnect HTTP error ({status}): {body}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The `error` field of the response envelope was set.
    #[error("{0}")]
    Api(String),

    /// The `result` field could not be decoded into the expected shape.
    #[error("Failed to decode AnkiConnect response for '{action}': {message}")]
    Decode {
        /// Action whose result failed to decode.
        action: String,
        /// Decoder message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anki_error_api_is_upstream_message() {
        let err = AnkiError::Api("deck was not found: Spanish".to_string());
        assert_eq!(err.to_string(), "deck was not found: Spanish");
    }

    #[test]
    fn test_anki_error_display_http_error() {
        let err = AnkiError::HttpError {
            status: 503,
            body: "unavailable".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("unavailable"));
    }

    #[test]
    fn test_anki_error_display_decode() {
        let err = AnkiError::Decode {
            action: "cardsInfo".to_string(),
            message: "invalid type".to_string(),
        };
        assert!(err.to_string().contains("cardsInfo"));
    }

    #[test]
    fn test_default_url() {
        assert_eq!(DEFAULT_ANKI_CONNECT_URL, "http://localhost:8765");
        assert_eq!(ANKI_CONNECT_VERSION, 6);
    }
}
