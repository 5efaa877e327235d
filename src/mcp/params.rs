//! Tool parameter types and their validation.
//!
//! Parameter names follow the camelCase convention of the AnkiConnect API.
//! Numeric fields decode as plain integers so that out-of-range values reach
//! the `validate` methods and come back as tool errors.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::Deserialize;

use super::ToolError;
use crate::anki::{CardId, Ease, NewNote};

/// Lowest ease factor Anki accepts, in permille.
pub const MIN_EASE_FACTOR: u32 = 1300;

/// Parameters naming a single deck.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeckParams {
    #[schemars(description = "Name of the deck")]
    pub deck_name: String,
}

impl DeckParams {
    pub fn validate(&self) -> Result<&str, ToolError> {
        require_text("deckName", &self.deck_name)
    }
}

/// Parameters for the add_note and add_card tools.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddNoteParams {
    #[schemars(description = "The name of the deck")]
    pub deck_name: String,

    #[schemars(description = "The note type/model name (e.g., Basic)")]
    pub model_name: String,

    #[schemars(description = "The fields for the note, by field name")]
    pub fields: BTreeMap<String, String>,

    #[schemars(description = "Tags for the note")]
    pub tags: Option<Vec<String>>,
}

impl AddNoteParams {
    /// Validates the parameters and builds the note to create.
    pub fn into_note(self) -> Result<NewNote, ToolError> {
        require_text("deckName", &self.deck_name)?;
        require_text("modelName", &self.model_name)?;
        if self.fields.is_empty() {
            return Err(ToolError::Validation(
                "fields must contain at least one field".to_string(),
            ));
        }

        Ok(NewNote::new(
            self.deck_name,
            self.model_name,
            self.fields,
            self.tags.unwrap_or_default(),
        ))
    }
}

/// Parameters for the find_cards tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindCardsParams {
    #[schemars(description = "The search query (e.g., \"deck:Default\")")]
    pub query: String,
}

impl FindCardsParams {
    pub fn validate(&self) -> Result<&str, ToolError> {
        require_text("query", &self.query)
    }
}

/// Parameters for the get_card_info tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetCardInfoParams {
    #[schemars(description = "Array of card IDs")]
    pub card_ids: Vec<CardId>,
}

impl GetCardInfoParams {
    pub fn validate(&self) -> Result<&[CardId], ToolError> {
        if self.card_ids.is_empty() {
            return Err(ToolError::Validation(
                "cardIds must contain at least one card id".to_string(),
            ));
        }
        Ok(&self.card_ids)
    }
}

/// Parameters for the answer_card tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCardParams {
    #[schemars(description = "ID of the card being answered")]
    pub card_id: CardId,

    #[schemars(description = "Ease: 1 (Again), 2 (Hard), 3 (Good), 4 (Easy)")]
    pub ease: i64,
}

impl AnswerCardParams {
    pub fn validate(&self) -> Result<Ease, ToolError> {
        parse_ease(self.ease)
    }
}

/// Parameters for the update_card_interval tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIntervalParams {
    #[schemars(description = "ID of the card to update")]
    pub card_id: CardId,

    #[schemars(description = "New interval in days")]
    pub interval: i64,

    #[schemars(description = "New ease factor in permille (e.g., 2500 for 250%)")]
    pub ease_factor: Option<i64>,
}

impl UpdateIntervalParams {
    /// Checks the interval and returns the ease factor to send, if any.
    pub fn validate(&self) -> Result<Option<u32>, ToolError> {
        if self.interval < 0 {
            return Err(ToolError::Validation(format!(
                "interval must not be negative, got {}",
                self.interval
            )));
        }
        self.ease_factor
            .map(|factor| {
                u32::try_from(factor)
                    .ok()
                    .filter(|f| *f >= MIN_EASE_FACTOR)
                    .ok_or_else(|| {
                        ToolError::Validation(format!(
                            "easeFactor must be between {MIN_EASE_FACTOR} and {}, got {factor}",
                            u32::MAX
                        ))
                    })
            })
            .transpose()
    }
}

/// Parameters for the suspend_card tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuspendCardParams {
    #[schemars(description = "ID of the card")]
    pub card_id: CardId,

    #[schemars(description = "true to suspend, false to unsuspend")]
    pub suspend: bool,
}

/// Parameters for the create_study_session tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionParams {
    #[schemars(description = "Deck to study")]
    pub deck_name: String,

    #[schemars(description = "Maximum number of cards in the session (default: 20)")]
    pub max_cards: Option<i64>,

    #[schemars(description = "Optional session ID to use instead of a generated one")]
    pub session_id: Option<String>,
}

impl CreateSessionParams {
    /// Checks the request and returns the card limit, if one was given.
    pub fn validate(&self) -> Result<Option<usize>, ToolError> {
        require_text("deckName", &self.deck_name)?;
        if let Some(id) = &self.session_id {
            require_text("sessionId", id)?;
        }
        self.max_cards
            .map(|max| {
                usize::try_from(max)
                    .ok()
                    .filter(|m| *m >= 1)
                    .ok_or_else(|| {
                        ToolError::Validation(format!("maxCards must be at least 1, got {max}"))
                    })
            })
            .transpose()
    }
}

/// Parameters for the submit_answer tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerParams {
    #[schemars(description = "ID of the card being answered")]
    pub card_id: CardId,

    #[schemars(description = "Index of the question variation (0-based)")]
    pub question_index: i64,

    #[schemars(description = "The learner's answer")]
    pub user_answer: String,

    #[schemars(description = "Study session ID")]
    pub session_id: String,
}

impl SubmitAnswerParams {
    /// Checks the request and returns the question index.
    ///
    /// Indexes past the card's variations are caught by the session.
    pub fn validate(&self) -> Result<usize, ToolError> {
        require_text("sessionId", &self.session_id)?;
        usize::try_from(self.question_index).map_err(|_| {
            ToolError::Validation(format!(
                "questionIndex must not be negative, got {}",
                self.question_index
            ))
        })
    }
}

/// Parameters for the complete_card_study tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCardParams {
    #[schemars(description = "ID of the studied card")]
    pub card_id: CardId,

    #[schemars(description = "Final ease: 1 (Again), 2 (Hard), 3 (Good), 4 (Easy)")]
    pub ease: i64,

    #[schemars(description = "Study session ID")]
    pub session_id: String,
}

impl CompleteCardParams {
    pub fn validate(&self) -> Result<Ease, ToolError> {
        require_text("sessionId", &self.session_id)?;
        parse_ease(self.ease)
    }
}

fn require_text<'a>(name: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::Validation(format!("{name} must not be empty")));
    }
    Ok(trimmed)
}

fn parse_ease(value: i64) -> Result<Ease, ToolError> {
    u8::try_from(value)
        .map_err(|_| format!("Ease must be between 1 and 4, got {value}"))
        .and_then(Ease::try_from)
        .map_err(ToolError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_use_camel_case_names() {
        let params: SubmitAnswerParams = serde_json::from_str(
            r#"{"cardId": 1, "questionIndex": 2, "userAnswer": "Paris", "sessionId": "s"}"#,
        )
        .unwrap();
        assert_eq!(params.card_id, 1);
        assert_eq!(params.question_index, 2);
        assert_eq!(params.user_answer, "Paris");
    }

    #[test]
    fn test_missing_parameter_fails_to_decode() {
        let result: Result<CompleteCardParams, _> =
            serde_json::from_str(r#"{"cardId": 1, "ease": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deck_name_required() {
        let params = DeckParams {
            deck_name: "   ".to_string(),
        };
        assert!(matches!(params.validate(), Err(ToolError::Validation(_))));

        let params = DeckParams {
            deck_name: " Spanish ".to_string(),
        };
        assert_eq!(params.validate().unwrap(), "Spanish");
    }

    #[test]
    fn test_ease_range() {
        let params = AnswerCardParams { card_id: 1, ease: 0 };
        assert!(params.validate().is_err());
        let params = AnswerCardParams { card_id: 1, ease: 5 };
        assert!(params.validate().is_err());
        let params = AnswerCardParams { card_id: 1, ease: 3 };
        assert_eq!(params.validate().unwrap(), Ease::Good);
    }

    #[test]
    fn test_ease_outside_byte_range_is_validation_error() {
        let params: AnswerCardParams =
            serde_json::from_str(r#"{"cardId": 1, "ease": 300}"#).unwrap();
        let err = params.validate().unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
        assert!(err.to_string().contains("got 300"));

        let params = AnswerCardParams { card_id: 1, ease: -2 };
        assert!(matches!(params.validate(), Err(ToolError::Validation(_))));
    }

    #[test]
    fn test_negative_question_index_decodes_and_fails_validation() {
        let params: SubmitAnswerParams = serde_json::from_str(
            r#"{"cardId": 1, "questionIndex": -1, "userAnswer": "Paris", "sessionId": "s"}"#,
        )
        .unwrap();
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("questionIndex must not be negative"));
    }

    #[test]
    fn test_question_index_passes_through() {
        let params = SubmitAnswerParams {
            card_id: 1,
            question_index: 3,
            user_answer: "Paris".to_string(),
            session_id: "s".to_string(),
        };
        assert_eq!(params.validate().unwrap(), 3);
    }

    #[test]
    fn test_add_note_defaults_tags() {
        let params: AddNoteParams = serde_json::from_str(
            r#"{"deckName": "Default", "modelName": "Basic", "fields": {"Front": "a", "Back": "b"}}"#,
        )
        .unwrap();
        let note = params.into_note().unwrap();
        assert!(note.tags.is_empty());
        assert!(!note.options.allow_duplicate);
    }

    #[test]
    fn test_add_note_requires_fields() {
        let params = AddNoteParams {
            deck_name: "Default".to_string(),
            model_name: "Basic".to_string(),
            fields: BTreeMap::new(),
            tags: None,
        };
        assert!(params.into_note().is_err());
    }

    #[test]
    fn test_card_ids_required() {
        let params = GetCardInfoParams { card_ids: vec![] };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_interval_validation() {
        let ok = UpdateIntervalParams {
            card_id: 1,
            interval: 10,
            ease_factor: Some(2500),
        };
        assert_eq!(ok.validate().unwrap(), Some(2500));

        let no_factor = UpdateIntervalParams {
            card_id: 1,
            interval: 0,
            ease_factor: None,
        };
        assert_eq!(no_factor.validate().unwrap(), None);

        let negative = UpdateIntervalParams {
            card_id: 1,
            interval: -1,
            ease_factor: None,
        };
        assert!(negative.validate().is_err());

        let low_factor = UpdateIntervalParams {
            card_id: 1,
            interval: 1,
            ease_factor: Some(100),
        };
        assert!(low_factor.validate().is_err());

        let negative_factor = UpdateIntervalParams {
            card_id: 1,
            interval: 1,
            ease_factor: Some(-2500),
        };
        assert!(negative_factor.validate().is_err());
    }

    #[test]
    fn test_create_session_validation() {
        let zero = CreateSessionParams {
            deck_name: "Default".to_string(),
            max_cards: Some(0),
            session_id: None,
        };
        assert!(zero.validate().is_err());

        let blank_id = CreateSessionParams {
            deck_name: "Default".to_string(),
            max_cards: None,
            session_id: Some(" ".to_string()),
        };
        assert!(blank_id.validate().is_err());

        let negative = CreateSessionParams {
            deck_name: "Default".to_string(),
            max_cards: Some(-4),
            session_id: None,
        };
        assert!(matches!(negative.validate(), Err(ToolError::Validation(_))));

        let fine = CreateSessionParams {
            deck_name: "Default".to_string(),
            max_cards: Some(5),
            session_id: None,
        };
        assert_eq!(fine.validate().unwrap(), Some(5));

        let unlimited = CreateSessionParams {
            deck_name: "Default".to_string(),
            max_cards: None,
            session_id: None,
        };
        assert_eq!(unlimited.validate().unwrap(), None);
    }

    #[test]
    fn test_complete_card_validation() {
        let params = CompleteCardParams {
            card_id: 1,
            ease: 9,
            session_id: "s".to_string(),
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("between 1 and 4"));
    }
}
