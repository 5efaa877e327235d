//! MCP server implementation.
//!
//! Runs an MCP server on stdio transport, exposing the Anki collection and
//! the study session engine as tools.

use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, ErrorData as McpError, Implementation, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use serde::Serialize;
use serde_json::Value;

use super::params::{
    AddNoteParams, AnswerCardParams, CompleteCardParams, CreateSessionParams, DeckParams,
    FindCardsParams, GetCardInfoParams, SubmitAnswerParams, SuspendCardParams,
    UpdateIntervalParams,
};
use super::ToolError;
use crate::anki::{AnkiClient, CardId, CardInfo, Ease, FlashcardService};
use crate::config::Config;
use crate::study::{AnswerFeedback, CompletionAck, StartOutcome, StudySessionManager};

/// Horizon used for the "due this week" progress count.
const WEEK_HORIZON_DAYS: u32 = 7;

// ============== Result Types ==============

/// Response of create_deck.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckCreated {
    pub deck_name: String,
    pub deck_id: i64,
}

/// Response of add_note and add_card.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCreated {
    pub note_id: i64,
}

/// Response of get_today_cards.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayCards {
    pub deck_name: String,
    pub due_count: usize,
    pub cards: Vec<CardInfo>,
}

/// Response of answer_card.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerAck {
    pub card_id: CardId,
    pub ease: Ease,
    pub success: bool,
}

/// Response of update_card_interval.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalAck {
    pub card_id: CardId,
    pub interval: i64,
    pub ease_factor: Option<u32>,
    pub results: Vec<bool>,
}

/// Response of get_study_progress.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProgress {
    pub deck_name: String,
    pub due_today: usize,
    pub due_this_week: usize,
    pub stats: Value,
}

/// Response of suspend_card.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendAck {
    pub card_id: CardId,
    pub suspended: bool,
    /// Whether Anki changed the card's state.
    pub result: bool,
}

// ============== Server Implementation ==============

/// The Anki study MCP server.
#[derive(Clone)]
pub struct AnkiStudyServer {
    tool_router: ToolRouter<AnkiStudyServer>,
    client: AnkiClient,
    study: Arc<StudySessionManager<AnkiClient>>,
}

impl AnkiStudyServer {
    /// Creates a server talking to Anki through `client`.
    pub fn new(client: AnkiClient, config: &Config) -> Self {
        let study = StudySessionManager::new(client.clone(), config);
        Self {
            tool_router: Self::tool_router(),
            client,
            study: Arc::new(study),
        }
    }
}

/// Wraps an operation result into a tool result.
///
/// Failures become a result with the error flag set rather than a
/// protocol error, so the calling model sees the message.
fn respond<T: Serialize>(operation: &str, result: Result<T, ToolError>) -> CallToolResult {
    match result {
        Ok(value) => {
            let json = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("Error serializing response: {e}"));
            CallToolResult::success(vec![Content::text(json)])
        }
        Err(e) => {
            tracing::warn!("{} failed: {}", operation, e);
            CallToolResult::error(vec![Content::text(format!("Error: {e}"))])
        }
    }
}

#[tool_router]
impl AnkiStudyServer {
    /// Get a list of all Anki decks.
    #[tool(description = "Get a list of all Anki decks")]
    async fn list_decks(&self) -> Result<CallToolResult, McpError> {
        let result = self.client.deck_names().await.map_err(ToolError::from);
        Ok(respond("list_decks", result))
    }

    /// Create a new deck.
    #[tool(description = "Create a new deck in Anki")]
    async fn create_deck(
        &self,
        Parameters(params): Parameters<DeckParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond("create_deck", self.create_deck_impl(params).await))
    }

    /// Add a note to a deck.
    #[tool(description = "Add a note to a specific deck")]
    async fn add_note(
        &self,
        Parameters(params): Parameters<AddNoteParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond("add_note", self.add_note_impl(params).await))
    }

    /// Add a card to a deck. Cards are created from notes, so this adds a note.
    #[tool(description = "Add a card (note) to a specific deck")]
    async fn add_card(
        &self,
        Parameters(params): Parameters<AddNoteParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond("add_card", self.add_note_impl(params).await))
    }

    /// Find cards with an Anki search query.
    #[tool(description = "Find cards by query")]
    async fn find_cards(
        &self,
        Parameters(params): Parameters<FindCardsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = match params.validate() {
            Ok(query) => self.client.find_cards(query).await.map_err(ToolError::from),
            Err(e) => Err(e),
        };
        Ok(respond("find_cards", result))
    }

    /// Get the full records of specific cards.
    #[tool(description = "Get info for specific card IDs")]
    async fn get_card_info(
        &self,
        Parameters(params): Parameters<GetCardInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = match params.validate() {
            Ok(ids) => self.client.cards_info(ids).await.map_err(ToolError::from),
            Err(e) => Err(e),
        };
        Ok(respond("get_card_info", result))
    }

    /// Get the cards of a deck that are due today.
    #[tool(description = "Get the cards due for review today in a deck, with their details")]
    async fn get_today_cards(
        &self,
        Parameters(params): Parameters<DeckParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond("get_today_cards", self.today_cards_impl(params).await))
    }

    /// Answer a card directly with an explicit ease.
    #[tool(description = "Answer a card with an ease from 1 (Again) to 4 (Easy)")]
    async fn answer_card(
        &self,
        Parameters(params): Parameters<AnswerCardParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond("answer_card", self.answer_card_impl(params).await))
    }

    /// Overwrite a card's interval and optionally its ease factor.
    #[tool(description = "Set a card's interval in days and optionally its ease factor")]
    async fn update_card_interval(
        &self,
        Parameters(params): Parameters<UpdateIntervalParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond(
            "update_card_interval",
            self.update_interval_impl(params).await,
        ))
    }

    /// Get due counts and statistics for a deck.
    #[tool(description = "Get study progress for a deck: due today, due this week, and deck statistics")]
    async fn get_study_progress(
        &self,
        Parameters(params): Parameters<DeckParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond(
            "get_study_progress",
            self.study_progress_impl(params).await,
        ))
    }

    /// Suspend or unsuspend a card.
    #[tool(description = "Suspend or unsuspend a card")]
    async fn suspend_card(
        &self,
        Parameters(params): Parameters<SuspendCardParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .client
            .set_suspended(&[params.card_id], params.suspend)
            .await
            .map(|result| SuspendAck {
                card_id: params.card_id,
                suspended: params.suspend,
                result,
            })
            .map_err(ToolError::from);
        Ok(respond("suspend_card", result))
    }

    /// Start an adaptive study session over a deck's due cards.
    #[tool(description = "Start a study session: due cards from a deck, each with several question variations")]
    async fn create_study_session(
        &self,
        Parameters(params): Parameters<CreateSessionParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond(
            "create_study_session",
            self.create_session_impl(params).await,
        ))
    }

    /// Score an answer to one question variation of a session card.
    #[tool(description = "Submit an answer to a question variation of a card in a study session")]
    async fn submit_answer(
        &self,
        Parameters(params): Parameters<SubmitAnswerParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond("submit_answer", self.submit_answer_impl(params).await))
    }

    /// Finish studying a card and send its review to Anki.
    #[tool(description = "Complete studying a card and record the final ease in Anki")]
    async fn complete_card_study(
        &self,
        Parameters(params): Parameters<CompleteCardParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond(
            "complete_card_study",
            self.complete_card_impl(params).await,
        ))
    }
}

#[tool_handler]
impl ServerHandler for AnkiStudyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Tools for an Anki collection reached through AnkiConnect. To study, call \
                 create_study_session with a deck name, ask the learner the question \
                 variations of each card, score replies with submit_answer, and finish each \
                 card with complete_card_study to record the review in Anki."
                    .to_string(),
            ),
        }
    }
}

// ============== Implementation Functions ==============

impl AnkiStudyServer {
    async fn create_deck_impl(&self, params: DeckParams) -> Result<DeckCreated, ToolError> {
        let deck_name = params.validate()?;
        let deck_id = self.client.create_deck(deck_name).await?;
        tracing::info!("Created deck '{}' ({})", deck_name, deck_id);
        Ok(DeckCreated {
            deck_name: deck_name.to_string(),
            deck_id,
        })
    }

    async fn add_note_impl(&self, params: AddNoteParams) -> Result<NoteCreated, ToolError> {
        let note = params.into_note()?;
        let note_id = self.client.add_note(&note).await?;
        Ok(NoteCreated { note_id })
    }

    async fn today_cards_impl(&self, params: DeckParams) -> Result<TodayCards, ToolError> {
        let deck_name = params.validate()?;
        let ids = self.client.find_due_cards(deck_name, None).await?;
        let cards = if ids.is_empty() {
            Vec::new()
        } else {
            self.client.cards_info(&ids).await?
        };

        Ok(TodayCards {
            deck_name: deck_name.to_string(),
            due_count: ids.len(),
            cards,
        })
    }

    async fn answer_card_impl(&self, params: AnswerCardParams) -> Result<AnswerAck, ToolError> {
        let ease = params.validate()?;
        let success = self.client.answer_card(params.card_id, ease).await?;
        Ok(AnswerAck {
            card_id: params.card_id,
            ease,
            success,
        })
    }

    async fn update_interval_impl(
        &self,
        params: UpdateIntervalParams,
    ) -> Result<IntervalAck, ToolError> {
        let ease_factor = params.validate()?;
        let results = self
            .client
            .set_interval(params.card_id, params.interval, ease_factor)
            .await?;
        Ok(IntervalAck {
            card_id: params.card_id,
            interval: params.interval,
            ease_factor,
            results,
        })
    }

    async fn study_progress_impl(&self, params: DeckParams) -> Result<StudyProgress, ToolError> {
        let deck_name = params.validate()?;
        let due_today = self.client.find_due_cards(deck_name, None).await?.len();
        let due_this_week = self
            .client
            .find_due_cards(deck_name, Some(WEEK_HORIZON_DAYS))
            .await?
            .len();
        let stats = deck_stats_entry(self.client.deck_stats(deck_name).await?, deck_name);

        Ok(StudyProgress {
            deck_name: deck_name.to_string(),
            due_today,
            due_this_week,
            stats,
        })
    }

    async fn create_session_impl(
        &self,
        params: CreateSessionParams,
    ) -> Result<StartOutcome, ToolError> {
        let max_cards = params.validate()?;
        let outcome = self
            .study
            .start_session(params.deck_name.trim(), max_cards, params.session_id)
            .await?;
        Ok(outcome)
    }

    async fn submit_answer_impl(
        &self,
        params: SubmitAnswerParams,
    ) -> Result<AnswerFeedback, ToolError> {
        let question_index = params.validate()?;
        let feedback = self
            .study
            .submit_answer(
                &params.session_id,
                params.card_id,
                question_index,
                &params.user_answer,
            )
            .await?;
        Ok(feedback)
    }

    async fn complete_card_impl(
        &self,
        params: CompleteCardParams,
    ) -> Result<CompletionAck, ToolError> {
        let ease = params.validate()?;
        let ack = self
            .study
            .complete_card(&params.session_id, params.card_id, ease)
            .await?;
        Ok(ack)
    }
}

/// Picks the deck's entry out of a `getDeckStats` response.
///
/// The response is keyed by deck id; entries carry a `name`. Falls back to
/// the whole response if no entry matches.
fn deck_stats_entry(stats: Value, deck_name: &str) -> Value {
    let entry = stats.as_object().and_then(|entries| {
        entries
            .values()
            .find(|entry| entry.get("name").and_then(Value::as_str) == Some(deck_name))
            .cloned()
    });
    entry.unwrap_or(stats)
}

/// Runs the MCP server on stdio transport.
///
/// This is a blocking call that processes MCP requests until the client
/// disconnects or an error occurs.
pub async fn run_server(config: Config) -> Result<()> {
    let client = AnkiClient::from_config(&config)?;
    tracing::info!("Serving Anki tools over stdio (AnkiConnect at {})", client.base_url());

    let service = AnkiStudyServer::new(client, &config).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A server whose AnkiConnect endpoint refuses connections.
    fn offline_server() -> AnkiStudyServer {
        let config = Config {
            anki_connect_url: "http://127.0.0.1:1".to_string(),
            connect_timeout_secs: 1,
            request_timeout_secs: 1,
            ..Default::default()
        };
        let client = AnkiClient::from_config(&config).unwrap();
        AnkiStudyServer::new(client, &config)
    }

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect()
    }

    #[test]
    fn test_respond_success_is_pretty_json() {
        let result = respond("list_decks", Ok(vec!["Default".to_string()]));
        assert_ne!(result.is_error, Some(true));
        let text = text_of(&result);
        let parsed: Vec<String> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, vec!["Default".to_string()]);
    }

    #[test]
    fn test_respond_failure_sets_error_flag() {
        let result: CallToolResult = respond::<()>(
            "create_deck",
            Err(ToolError::Validation("deckName must not be empty".to_string())),
        );
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text_of(&result),
            "Error: Invalid parameters: deckName must not be empty"
        );
    }

    #[test]
    fn test_tool_catalog() {
        let server = offline_server();
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "add_card",
                "add_note",
                "answer_card",
                "complete_card_study",
                "create_deck",
                "create_study_session",
                "find_cards",
                "get_card_info",
                "get_study_progress",
                "get_today_cards",
                "list_decks",
                "submit_answer",
                "suspend_card",
                "update_card_interval",
            ]
        );
    }

    #[test]
    fn test_server_info_enables_tools() {
        let info = offline_server().get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("create_study_session"));
    }

    #[tokio::test]
    async fn test_validation_error_is_tool_result() {
        let server = offline_server();
        let result = server
            .answer_card(Parameters(AnswerCardParams { card_id: 1, ease: 7 }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).starts_with("Error: Invalid parameters"));
    }

    #[tokio::test]
    async fn test_ease_beyond_byte_range_is_tool_result() {
        let server = offline_server();
        let params: AnswerCardParams =
            serde_json::from_value(json!({"cardId": 1, "ease": 300})).unwrap();
        let result = server.answer_card(Parameters(params)).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("between 1 and 4, got 300"));
    }

    #[tokio::test]
    async fn test_negative_question_index_is_tool_result() {
        let server = offline_server();
        let params: SubmitAnswerParams = serde_json::from_value(json!({
            "cardId": 1,
            "questionIndex": -1,
            "userAnswer": "Paris",
            "sessionId": "s-1"
        }))
        .unwrap();
        let result = server.submit_answer(Parameters(params)).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).starts_with("Error: Invalid parameters: questionIndex"));
    }

    #[tokio::test]
    async fn test_negative_max_cards_is_tool_result() {
        let server = offline_server();
        let result = server
            .create_study_session(Parameters(CreateSessionParams {
                deck_name: "Default".to_string(),
                max_cards: Some(-1),
                session_id: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("maxCards must be at least 1"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_tool_result() {
        let server = offline_server();
        let result = server
            .submit_answer(Parameters(SubmitAnswerParams {
                card_id: 1,
                question_index: 0,
                user_answer: "Paris".to_string(),
                session_id: "missing".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("not found or expired"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_tool_result() {
        let server = offline_server();
        let result = server
            .create_study_session(Parameters(CreateSessionParams {
                deck_name: "Default".to_string(),
                max_cards: None,
                session_id: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).starts_with("Error: AnkiConnect request failed"));
    }

    #[test]
    fn test_deck_stats_entry_matches_name() {
        let stats = json!({
            "1651445861967": {"deck_id": 1651445861967_i64, "name": "Japanese", "new_count": 20},
            "1": {"deck_id": 1, "name": "Default", "new_count": 3}
        });
        let entry = deck_stats_entry(stats, "Default");
        assert_eq!(entry["new_count"], 3);
    }

    #[test]
    fn test_deck_stats_entry_falls_back_to_raw() {
        let stats = json!({"1": {"name": "Other"}});
        let entry = deck_stats_entry(stats.clone(), "Default");
        assert_eq!(entry, stats);
    }

    #[test]
    fn test_suspend_ack_serialization() {
        let ack = SuspendAck {
            card_id: 42,
            suspended: true,
            result: true,
        };
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            json!({"cardId": 42, "suspended": true, "result": true})
        );
    }

    #[test]
    fn test_today_cards_serialization() {
        let today = TodayCards {
            deck_name: "Default".to_string(),
            due_count: 0,
            cards: vec![],
        };
        let json = serde_json::to_value(&today).unwrap();
        assert_eq!(json["dueCount"], 0);
        assert_eq!(json["deckName"], "Default");
    }
}
