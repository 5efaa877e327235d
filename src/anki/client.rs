//! HTTP client for AnkiConnect.
//!
//! Every AnkiConnect call is a POST of `{action, version, params}` that
//! answers with an envelope `{result, error}`. [`AnkiClient::invoke`] turns
//! that envelope into a typed result or an [`AnkiError`].

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::models::{CardId, CardInfo, Ease, NewNote};
use super::{AnkiError, ANKI_CONNECT_VERSION, DEFAULT_ANKI_CONNECT_URL};
use crate::config::Config;

/// Timeout for establishing a connection to Anki.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a whole request including the response.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scheduling capabilities the study engine needs from the flashcard service.
///
/// Implemented by [`AnkiClient`]; tests substitute an in-memory service.
pub trait FlashcardService: Send + Sync {
    /// Returns ids of cards in `deck` that are due today, or within
    /// `horizon_days` days when a positive horizon is given.
    fn find_due_cards(
        &self,
        deck: &str,
        horizon_days: Option<u32>,
    ) -> impl Future<Output = Result<Vec<CardId>, AnkiError>> + Send;

    /// Fetches full card records, in the order of `card_ids`.
    fn cards_info(
        &self,
        card_ids: &[CardId],
    ) -> impl Future<Output = Result<Vec<CardInfo>, AnkiError>> + Send;

    /// Records a review for a card and advances its schedule.
    fn answer_card(
        &self,
        card_id: CardId,
        ease: Ease,
    ) -> impl Future<Output = Result<bool, AnkiError>> + Send;

    /// Overwrites a card's interval and, optionally, its ease factor.
    fn set_interval(
        &self,
        card_id: CardId,
        interval: i64,
        ease_factor: Option<u32>,
    ) -> impl Future<Output = Result<Vec<bool>, AnkiError>> + Send;
}

/// Response envelope returned by every AnkiConnect action.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// AnkiConnect API client.
#[derive(Debug, Clone)]
pub struct AnkiClient {
    /// HTTP client instance.
    client: Client,
    /// Endpoint of the AnkiConnect add-on.
    base_url: String,
}

impl AnkiClient {
    /// Creates a client for the default local endpoint.
    pub fn new() -> Result<Self, AnkiError> {
        Self::with_timeouts(
            DEFAULT_ANKI_CONNECT_URL,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Creates a client for a custom endpoint with explicit timeouts.
    pub fn with_timeouts(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, AnkiError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| AnkiError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client from the resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self, AnkiError> {
        Self::with_timeouts(
            &config.anki_connect_url,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Returns the configured endpoint.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Invokes an AnkiConnect action and decodes its result.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Value,
    ) -> Result<T, AnkiError> {
        tracing::debug!("AnkiConnect action {}", action);

        let response = self
            .client
            .post(&self.base_url)
            .json(&request_body(action, params))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("AnkiConnect action {} failed: {}", action, e);
                AnkiError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnkiError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope = response.json().await.map_err(|e| AnkiError::Decode {
            action: action.to_string(),
            message: e.to_string(),
        })?;

        decode_envelope(action, envelope)
    }

    /// Returns the AnkiConnect API version; doubles as a liveness probe.
    pub async fn version(&self) -> Result<u32, AnkiError> {
        self.invoke("version", json!({})).await
    }

    /// Lists all deck names.
    pub async fn deck_names(&self) -> Result<Vec<String>, AnkiError> {
        self.invoke("deckNames", json!({})).await
    }

    /// Creates a deck and returns its id. Existing decks are left untouched.
    pub async fn create_deck(&self, deck: &str) -> Result<i64, AnkiError> {
        self.invoke("createDeck", json!({ "deck": deck })).await
    }

    /// Adds a note and returns the new note id.
    pub async fn add_note(&self, note: &NewNote) -> Result<i64, AnkiError> {
        self.invoke("addNote", json!({ "note": note })).await
    }

    /// Runs an Anki search query and returns matching card ids.
    pub async fn find_cards(&self, query: &str) -> Result<Vec<CardId>, AnkiError> {
        self.invoke("findCards", json!({ "query": query })).await
    }

    /// Returns the raw `getDeckStats` entry map for a deck.
    pub async fn deck_stats(&self, deck: &str) -> Result<Value, AnkiError> {
        self.invoke("getDeckStats", json!({ "decks": [deck] })).await
    }

    /// Suspends or unsuspends cards.
    pub async fn set_suspended(
        &self,
        card_ids: &[CardId],
        suspended: bool,
    ) -> Result<bool, AnkiError> {
        let action = if suspended { "suspend" } else { "unsuspend" };
        self.invoke(action, json!({ "cards": card_ids })).await
    }
}

impl FlashcardService for AnkiClient {
    async fn find_due_cards(
        &self,
        deck: &str,
        horizon_days: Option<u32>,
    ) -> Result<Vec<CardId>, AnkiError> {
        self.find_cards(&deck_query(deck, horizon_days)).await
    }

    async fn cards_info(&self, card_ids: &[CardId]) -> Result<Vec<CardInfo>, AnkiError> {
        self.invoke("cardsInfo", json!({ "cards": card_ids })).await
    }

    async fn answer_card(&self, card_id: CardId, ease: Ease) -> Result<bool, AnkiError> {
        let params = json!({
            "answers": [{ "cardId": card_id, "ease": ease.value() }]
        });
        let results: Vec<bool> = self.invoke("answerCards", params).await?;
        Ok(results.first().copied().unwrap_or(false))
    }

    async fn set_interval(
        &self,
        card_id: CardId,
        interval: i64,
        ease_factor: Option<u32>,
    ) -> Result<Vec<bool>, AnkiError> {
        let mut keys = vec![json!("ivl")];
        let mut values = vec![json!(interval)];
        if let Some(factor) = ease_factor {
            keys.push(json!("factor"));
            values.push(json!(factor));
        }

        let params = json!({
            "card": card_id,
            "keys": keys,
            "newValues": values,
            "warning_check": true,
        });
        self.invoke("setSpecificValueOfCard", params).await
    }
}

/// Builds the JSON body of an AnkiConnect request.
fn request_body(action: &str, params: Value) -> Value {
    json!({
        "action": action,
        "version": ANKI_CONNECT_VERSION,
        "params": params,
    })
}

/// Converts a response envelope into the action's typed result.
fn decode_envelope<T: DeserializeOwned>(action: &str, envelope: Envelope) -> Result<T, AnkiError> {
    if let Some(error) = envelope.error {
        tracing::warn!("AnkiConnect action {} returned error: {}", action, error);
        return Err(AnkiError::Api(error));
    }

    serde_json::from_value(envelope.result).map_err(|e| AnkiError::Decode {
        action: action.to_string(),
        message: e.to_string(),
    })
}

/// Builds the search query for a deck's due cards.
///
/// Without a horizon (or a zero horizon) the query matches cards due today;
/// otherwise cards due within the next `horizon_days` days. Wildcards in the
/// deck name are escaped so it matches literally.
pub fn deck_query(deck: &str, horizon_days: Option<u32>) -> String {
    let mut escaped = String::with_capacity(deck.len());
    for c in deck.chars() {
        if matches!(c, '\\' | '"' | '*' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    let deck = escaped;
    match horizon_days {
        Some(days) if days > 0 => format!("deck:\"{deck}\" prop:due<={days}"),
        _ => format!("deck:\"{deck}\" is:due"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> Envelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_client_new_uses_default_url() {
        let client = AnkiClient::new().unwrap();
        assert_eq!(client.base_url(), DEFAULT_ANKI_CONNECT_URL);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = AnkiClient::with_timeouts(
            "http://127.0.0.1:9999/",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_client_from_config() {
        let config = Config {
            anki_connect_url: "http://anki.local:8765".to_string(),
            ..Default::default()
        };
        let client = AnkiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://anki.local:8765");
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body("findCards", json!({ "query": "deck:Default" }));
        assert_eq!(body["action"], "findCards");
        assert_eq!(body["version"], 6);
        assert_eq!(body["params"]["query"], "deck:Default");
    }

    #[test]
    fn test_decode_envelope_result() {
        let ids: Vec<CardId> =
            decode_envelope("findCards", envelope(r#"{"result": [1, 2, 3], "error": null}"#))
                .unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_envelope_error_field() {
        let result: Result<i64, AnkiError> = decode_envelope(
            "addNote",
            envelope(r#"{"result": null, "error": "cannot create note because it is a duplicate"}"#),
        );
        match result {
            Err(AnkiError::Api(message)) => assert!(message.contains("duplicate")),
            other => panic!("Expected Api error, got: {other:?}"),
        }
    }

    #[test]
    fn test_decode_envelope_wrong_shape() {
        let result: Result<Vec<String>, AnkiError> =
            decode_envelope("deckNames", envelope(r#"{"result": 42, "error": null}"#));
        assert!(matches!(result, Err(AnkiError::Decode { .. })));
    }

    #[test]
    fn test_decode_envelope_null_result_for_unit() {
        let result: Result<(), AnkiError> =
            decode_envelope("sync", envelope(r#"{"result": null, "error": null}"#));
        assert!(result.is_ok());
    }

    #[test]
    fn test_deck_query_due_today() {
        assert_eq!(deck_query("Default", None), "deck:\"Default\" is:due");
        assert_eq!(deck_query("Default", Some(0)), "deck:\"Default\" is:due");
    }

    #[test]
    fn test_deck_query_with_horizon() {
        assert_eq!(
            deck_query("Spanish::Verbs", Some(7)),
            "deck:\"Spanish::Verbs\" prop:due<=7"
        );
    }

    #[test]
    fn test_deck_query_escapes_quotes() {
        assert_eq!(deck_query("My \"Deck\"", None), "deck:\"My \\\"Deck\\\"\" is:due");
        assert_eq!(deck_query("a\\b", None), r#"deck:"a\\b" is:due"#);
    }

    #[test]
    fn test_deck_query_escapes_wildcards() {
        assert_eq!(deck_query("A_B", None), r#"deck:"A\_B" is:due"#);
        assert_eq!(
            deck_query("Kanji*::N5", Some(7)),
            r#"deck:"Kanji\*::N5" prop:due<=7"#
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_failure() {
        let client = AnkiClient::with_timeouts(
            "http://127.0.0.1:1",
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
        .unwrap();
        let result = client.version().await;
        assert!(matches!(result, Err(AnkiError::RequestFailed(_))));
    }
}
