//! Data models exchanged with AnkiConnect.
//!
//! Card records mirror the `cardsInfo` action output. Fields the study
//! engine does not use are kept in [`CardInfo::extra`] so pass-through
//! callers still see the whole record.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Anki card identifier (creation timestamp in milliseconds).
pub type CardId = i64;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("HTML tag pattern is valid"));

/// Review ease reported to the Anki scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Ease {
    /// Forgotten; the card is relearned.
    Again = 1,
    /// Recalled with serious difficulty.
    Hard = 2,
    /// Recalled after some hesitation.
    Good = 3,
    /// Recalled effortlessly.
    Easy = 4,
}

impl Ease {
    /// Derives the ease for an automatically scored answer.
    ///
    /// Scored answers only ever map to `Easy` or `Again`; `Hard` and `Good`
    /// are reachable through explicit card answers.
    pub fn from_correctness(correct: bool) -> Self {
        if correct {
            Ease::Easy
        } else {
            Ease::Again
        }
    }

    /// Returns the integer value sent to AnkiConnect.
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl From<Ease> for u8 {
    fn from(ease: Ease) -> Self {
        ease.value()
    }
}

impl TryFrom<u8> for Ease {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Ease::Again),
            2 => Ok(Ease::Hard),
            3 => Ok(Ease::Good),
            4 => Ok(Ease::Easy),
            other => Err(format!("Ease must be between 1 and 4, got {other}")),
        }
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Ease::Again => "again",
            Ease::Hard => "hard",
            Ease::Good => "good",
            Ease::Easy => "easy",
        };
        write!(f, "{label}")
    }
}

/// A single note field as reported by `cardsInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    pub order: u32,
}

/// A card record from `cardsInfo`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardInfo {
    pub card_id: CardId,
    pub note: i64,
    pub deck_name: String,
    pub model_name: String,
    pub fields: BTreeMap<String, FieldValue>,
    /// Current interval in days (negative values are seconds for learning cards).
    pub interval: i64,
    /// Ease factor in permille (2500 = 250%).
    pub factor: i64,
    pub due: i64,
    pub queue: i64,
    #[serde(rename = "type")]
    pub card_type: i64,
    pub reps: i64,
    pub lapses: i64,
    /// Every other attribute of the record, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl CardInfo {
    /// Returns the prompt side of the card as plain text.
    ///
    /// Looks for a `Front` or `Question` field and falls back to the first
    /// field in note order.
    pub fn front(&self) -> Option<String> {
        self.field_text(&["Front", "Question"], 0)
    }

    /// Returns the answer side of the card as plain text.
    ///
    /// Looks for a `Back` or `Answer` field and falls back to the second
    /// field in note order.
    pub fn back(&self) -> Option<String> {
        self.field_text(&["Back", "Answer"], 1)
    }

    fn field_text(&self, names: &[&str], position: usize) -> Option<String> {
        names
            .iter()
            .find_map(|name| self.fields.get(*name))
            .or_else(|| {
                let mut ordered: Vec<&FieldValue> = self.fields.values().collect();
                ordered.sort_by_key(|f| f.order);
                ordered.get(position).copied()
            })
            .map(|field| plain_text(&field.value))
    }
}

/// Strips HTML markup from a field value and collapses whitespace.
pub fn plain_text(html: &str) -> String {
    let without_tags = HTML_TAG.replace_all(html, " ");
    without_tags
        .replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Options block of an `addNote` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    pub allow_duplicate: bool,
}

/// A note to be created with `addNote`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub deck_name: String,
    pub model_name: String,
    pub fields: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub options: NoteOptions,
}

impl NewNote {
    /// Creates a note that AnkiConnect will reject if it duplicates an existing one.
    pub fn new(
        deck_name: String,
        model_name: String,
        fields: BTreeMap<String, String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            deck_name,
            model_name,
            fields,
            tags,
            options: NoteOptions {
                allow_duplicate: false,
            },
        }
    }
}
