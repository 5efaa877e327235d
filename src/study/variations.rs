//! Question variations derived from a card's front and back.
//!
//! A card is asked in up to four framings, always in the same order:
//! fill-in-the-blank (only for answers long enough to blank a word),
//! multiple choice, paraphrase, and context. Randomness comes from the
//! caller's RNG so tests can pin the output.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Marker replacing the hidden word in fill-in-the-blank questions.
pub const BLANK: &str = "_____";

/// Fixed distractor meaning "this is the wrong answer".
pub const WRONG_ANSWER_PLACEHOLDER: &str = "Incorrect answer";

/// Answers must be longer than this (in characters) to get a blank.
const FILL_BLANK_MIN_CHARS: usize = 10;

/// Answers must have more than this many words to get a blank.
const FILL_BLANK_MIN_TOKENS: usize = 2;

/// Labels for multiple choice options.
const OPTION_LABELS: [char; 3] = ['A', 'B', 'C'];

/// The framing of a variation question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    FillBlank,
    MultipleChoice,
    Paraphrase,
    Context,
}

/// One alternative way of asking a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationQuestion {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    pub expected_answer: String,
    /// Presented options, only for multiple choice.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Generates the variations for a card.
///
/// Returns four questions, or three when `back` is too short for a
/// fill-in-the-blank question. Callers must not assume a fixed length.
pub fn generate_variations<R: Rng + ?Sized>(
    front: &str,
    back: &str,
    rng: &mut R,
) -> Vec<VariationQuestion> {
    let mut variations = Vec::with_capacity(4);

    if let Some(question) = fill_blank(front, back, rng) {
        variations.push(question);
    }
    variations.push(multiple_choice(front, back, rng));
    variations.push(VariationQuestion {
        kind: QuestionKind::Paraphrase,
        question: format!("Restate the answer to \"{front}\" in your own words."),
        expected_answer: back.to_string(),
        options: Vec::new(),
    });
    variations.push(VariationQuestion {
        kind: QuestionKind::Context,
        question: format!("In one sentence, explain the answer to \"{front}\" and why it holds."),
        expected_answer: back.to_string(),
        options: Vec::new(),
    });

    variations
}

fn fill_blank<R: Rng + ?Sized>(front: &str, back: &str, rng: &mut R) -> Option<VariationQuestion> {
    let tokens: Vec<&str> = back.split_whitespace().collect();
    if tokens.len() <= FILL_BLANK_MIN_TOKENS || back.chars().count() <= FILL_BLANK_MIN_CHARS {
        return None;
    }

    let hidden = rng.gen_range(0..tokens.len());
    let blanked = tokens
        .iter()
        .enumerate()
        .map(|(i, token)| if i == hidden { BLANK } else { token })
        .collect::<Vec<_>>()
        .join(" ");

    Some(VariationQuestion {
        kind: QuestionKind::FillBlank,
        question: format!("Fill in the blank for \"{front}\":\n{blanked}"),
        expected_answer: tokens[hidden].to_string(),
        options: Vec::new(),
    })
}

fn multiple_choice<R: Rng + ?Sized>(front: &str, back: &str, rng: &mut R) -> VariationQuestion {
    let [first, second] = distractors(back, rng);
    let mut options = vec![back.to_string(), first, second];
    options.shuffle(rng);

    let listing = OPTION_LABELS
        .iter()
        .zip(&options)
        .map(|(label, option)| format!("{label}. {option}"))
        .collect::<Vec<_>>()
        .join("\n");

    VariationQuestion {
        kind: QuestionKind::MultipleChoice,
        question: format!("{front}\n\nChoose the correct answer:\n{listing}"),
        expected_answer: back.to_string(),
        options,
    }
}

/// Draws two distractors for `answer`; the draws are independent and may match.
pub fn distractors<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> [String; 2] {
    [distractor(answer, rng), distractor(answer, rng)]
}

fn distractor<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> String {
    match rng.gen_range(0..4) {
        0 => format!("{answer} (not this)"),
        1 => answer.chars().rev().collect(),
        2 => {
            let half = answer.chars().count() / 2;
            answer.chars().take(half).collect()
        }
        _ => WRONG_ANSWER_PLACEHOLDER.to_string(),
    }
}
