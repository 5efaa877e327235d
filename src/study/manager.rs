//! Study session orchestration.
//!
//! The manager pulls due cards from the flashcard service, generates
//! variations for each, scores submitted answers, and forwards completed
//! reviews to the scheduler. The session store and the random source are
//! behind async mutexes; neither lock is held while the flashcard service
//! is being called.

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::evaluator::is_correct;
use super::session::{SessionCard, SessionStore, StudySession};
use super::variations::{generate_variations, QuestionKind};
use super::StudyError;
use crate::anki::{CardId, Ease, FlashcardService};
use crate::config::Config;

/// Result of starting a session.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StartOutcome {
    /// A session was created.
    Started(StudySession),
    /// No cards were due; nothing was stored.
    NothingDue(NothingDue),
}

/// Reported instead of a session when the deck has no due cards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NothingDue {
    pub deck_name: String,
    pub message: String,
}

/// Scoring of one submitted answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub session_id: String,
    pub card_id: CardId,
    pub question_index: usize,
    pub question_type: QuestionKind,
    pub question: String,
    pub expected_answer: String,
    pub is_correct: bool,
    pub ease: Ease,
    pub feedback: String,
    pub attempts: u32,
    pub correct_answers: u32,
}

/// A review result handed to the scheduler once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub card_id: CardId,
    pub ease: Ease,
    pub session_id: String,
}

/// Acknowledgment of a completed card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionAck {
    #[serde(flatten)]
    pub review: ReviewOutcome,
    /// Whether the scheduler accepted the review.
    pub scheduled: bool,
    pub completed_at: String,
    /// False when the card was not a member of a live session.
    pub tracked_in_session: bool,
    pub remaining_cards: usize,
    pub session_finished: bool,
}

/// Runs study sessions against a flashcard service.
pub struct StudySessionManager<S> {
    service: S,
    sessions: Mutex<SessionStore>,
    rng: Mutex<StdRng>,
    default_max_cards: usize,
}

impl<S: FlashcardService> StudySessionManager<S> {
    /// Creates a manager using the session limits from `config`.
    ///
    /// A time-to-live too large to represent never expires sessions.
    pub fn new(service: S, config: &Config) -> Self {
        Self {
            service,
            sessions: Mutex::new(SessionStore::new(
                config.session_ttl().unwrap_or(Duration::MAX),
                config.max_sessions,
            )),
            rng: Mutex::new(StdRng::from_entropy()),
            default_max_cards: config.default_max_cards,
        }
    }

    /// Replaces the random source used for variation generation.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Starts a session over the deck's due cards.
    ///
    /// Keeps the first `max_cards` due cards in the order the service
    /// returns them. When nothing is due no session is stored.
    pub async fn start_session(
        &self,
        deck_name: &str,
        max_cards: Option<usize>,
        session_id: Option<String>,
    ) -> Result<StartOutcome, StudyError> {
        let limit = max_cards.unwrap_or(self.default_max_cards);
        if limit == 0 {
            return Err(StudyError::InvalidMaxCards);
        }

        if let Some(id) = &session_id {
            if self.sessions.lock().await.contains(id, Utc::now()) {
                return Err(StudyError::SessionExists(id.clone()));
            }
        }

        let mut card_ids = self.service.find_due_cards(deck_name, None).await?;
        if card_ids.is_empty() {
            return Ok(nothing_due(deck_name));
        }
        card_ids.truncate(limit);

        let infos = self.service.cards_info(&card_ids).await?;
        if infos.is_empty() {
            return Ok(nothing_due(deck_name));
        }

        let cards: Vec<SessionCard> = {
            let mut rng = self.rng.lock().await;
            infos
                .iter()
                .map(|info| {
                    let front = info.front().unwrap_or_default();
                    let back = info.back().unwrap_or_default();
                    let variations = generate_variations(&front, &back, &mut *rng);
                    SessionCard::new(info.card_id, front, back, variations)
                })
                .collect()
        };

        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();
        let session = StudySession::new(session_id.clone(), deck_name.to_string(), cards, now);

        let mut store = self.sessions.lock().await;
        if store.contains(&session_id, now) {
            return Err(StudyError::SessionExists(session_id));
        }
        for evicted in store.insert(session.clone(), now) {
            tracing::info!("Evicted study session {} to make room", evicted);
        }

        tracing::info!(
            "Started study session {} on '{}' with {} card(s)",
            session_id,
            deck_name,
            session.total_cards
        );
        Ok(StartOutcome::Started(session))
    }

    /// Scores an answer to one of a card's variations.
    ///
    /// Only derives an ease; the scheduler is not touched until the card is
    /// completed.
    pub async fn submit_answer(
        &self,
        session_id: &str,
        card_id: CardId,
        question_index: usize,
        user_answer: &str,
    ) -> Result<AnswerFeedback, StudyError> {
        let mut store = self.sessions.lock().await;
        let session = store
            .get_mut(session_id, Utc::now())
            .ok_or_else(|| StudyError::UnknownSession(session_id.to_string()))?;

        let card = session
            .card_mut(card_id)
            .ok_or_else(|| StudyError::CardNotInSession {
                card_id,
                session_id: session_id.to_string(),
            })?;

        let variation = card.variations.get(question_index).cloned().ok_or(
            StudyError::QuestionIndexOutOfRange {
                card_id,
                index: question_index,
                available: card.variations.len(),
            },
        )?;

        let correct = is_correct(user_answer, &variation.expected_answer, &card.back);
        card.attempts += 1;
        if correct {
            card.correct_answers += 1;
        }

        let feedback = if correct {
            "Correct! Well done.".to_string()
        } else {
            format!(
                "Not quite. The expected answer was: {}",
                variation.expected_answer
            )
        };

        tracing::debug!(
            "Session {} card {} question {}: correct={}",
            session_id,
            card_id,
            question_index,
            correct
        );

        Ok(AnswerFeedback {
            session_id: session_id.to_string(),
            card_id,
            question_index,
            question_type: variation.kind,
            question: variation.question,
            expected_answer: variation.expected_answer,
            is_correct: correct,
            ease: Ease::from_correctness(correct),
            feedback,
            attempts: card.attempts,
            correct_answers: card.correct_answers,
        })
    }

    /// Completes a card and forwards its review to the scheduler.
    ///
    /// Card membership is not checked: a card outside the session, or an
    /// unknown session id, is still reviewed. Progress is recorded only when
    /// the card belongs to a live session, and the session is dropped once
    /// all of its cards are completed.
    pub async fn complete_card(
        &self,
        session_id: &str,
        card_id: CardId,
        ease: Ease,
    ) -> Result<CompletionAck, StudyError> {
        let review = ReviewOutcome {
            card_id,
            ease,
            session_id: session_id.to_string(),
        };

        let scheduled = self.service.answer_card(review.card_id, review.ease).await?;
        let completed_at = Utc::now();

        let mut store = self.sessions.lock().await;
        let mut tracked = false;
        let mut remaining = 0;
        let mut finished = false;

        if let Some(session) = store.get_mut(session_id, completed_at) {
            if let Some(card) = session.card_mut(card_id) {
                card.completed = true;
                card.final_ease = Some(ease);
                tracked = true;
            }
            remaining = session.remaining_cards();
            finished = session.is_finished();
        } else {
            tracing::debug!(
                "Card {} completed outside a live session ({})",
                card_id,
                session_id
            );
        }

        if finished {
            store.remove(session_id);
            tracing::info!("Study session {} finished", session_id);
        }

        Ok(CompletionAck {
            review,
            scheduled,
            completed_at: completed_at.to_rfc3339(),
            tracked_in_session: tracked,
            remaining_cards: remaining,
            session_finished: finished,
        })
    }

    /// Returns a snapshot of a live session.
    pub async fn session(&self, session_id: &str) -> Option<StudySession> {
        self.sessions
            .lock()
            .await
            .get_mut(session_id, Utc::now())
            .cloned()
    }

    /// Number of live sessions.
    pub async fn active_sessions(&self) -> usize {
        let mut store = self.sessions.lock().await;
        store.purge_expired(Utc::now());
        store.len()
    }
}

fn nothing_due(deck_name: &str) -> StartOutcome {
    tracing::info!("No cards due in '{}'", deck_name);
    StartOutcome::NothingDue(NothingDue {
        deck_name: deck_name.to_string(),
        message: format!("No cards are due for review in deck '{deck_name}'."),
    })
}
