//! Study session state and the in-memory session store.
//!
//! Sessions live only in memory. The store drops a session when it has
//! been idle longer than the configured time-to-live, when room is needed
//! for a new session (least recently used first), or when the manager
//! removes it after its last card is completed.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::variations::VariationQuestion;
use crate::anki::{CardId, Ease};

/// Progress for one card inside a study session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCard {
    pub card_id: CardId,
    pub front: String,
    pub back: String,
    /// Variations generated when the session started; answers are scored
    /// against these.
    pub variations: Vec<VariationQuestion>,
    pub attempts: u32,
    pub correct_answers: u32,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_ease: Option<Ease>,
}

impl SessionCard {
    /// Creates a card with zeroed progress.
    pub fn new(
        card_id: CardId,
        front: String,
        back: String,
        variations: Vec<VariationQuestion>,
    ) -> Self {
        Self {
            card_id,
            front,
            back,
            variations,
            attempts: 0,
            correct_answers: 0,
            completed: false,
            final_ease: None,
        }
    }
}

/// An ordered working set of due cards and their progress.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub session_id: String,
    pub deck_name: String,
    pub total_cards: usize,
    pub cards: Vec<SessionCard>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_accessed: DateTime<Utc>,
}

impl StudySession {
    pub fn new(
        session_id: String,
        deck_name: String,
        cards: Vec<SessionCard>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            deck_name,
            total_cards: cards.len(),
            cards,
            created_at: now,
            last_accessed: now,
        }
    }

    pub fn card(&self, card_id: CardId) -> Option<&SessionCard> {
        self.cards.iter().find(|c| c.card_id == card_id)
    }

    pub fn card_mut(&mut self, card_id: CardId) -> Option<&mut SessionCard> {
        self.cards.iter_mut().find(|c| c.card_id == card_id)
    }

    /// Number of cards not yet completed.
    pub fn remaining_cards(&self) -> usize {
        self.cards.iter().filter(|c| !c.completed).count()
    }

    /// True once every card has been completed.
    pub fn is_finished(&self) -> bool {
        self.remaining_cards() == 0
    }
}

/// Live study sessions keyed by session id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<String, StudySession>,
    ttl: Duration,
    capacity: usize,
}

impl SessionStore {
    /// Creates a store with an idle time-to-live and a session limit.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns true if a live session with this id exists.
    pub fn contains(&mut self, session_id: &str, now: DateTime<Utc>) -> bool {
        self.purge_expired(now);
        self.sessions.contains_key(session_id)
    }

    /// Stores a session, evicting least recently used sessions if full.
    ///
    /// Returns the ids of evicted sessions.
    pub fn insert(&mut self, session: StudySession, now: DateTime<Utc>) -> Vec<String> {
        self.purge_expired(now);

        let mut evicted = Vec::new();
        while self.sessions.len() >= self.capacity
            && !self.sessions.contains_key(&session.session_id)
        {
            let oldest = self
                .sessions
                .values()
                .min_by_key(|s| s.last_accessed)
                .map(|s| s.session_id.clone());
            match oldest {
                Some(id) => {
                    self.sessions.remove(&id);
                    evicted.push(id);
                }
                None => break,
            }
        }

        self.sessions.insert(session.session_id.clone(), session);
        evicted
    }

    /// Returns a live session and marks it as accessed.
    pub fn get_mut(&mut self, session_id: &str, now: DateTime<Utc>) -> Option<&mut StudySession> {
        self.purge_expired(now);
        let session = self.sessions.get_mut(session_id)?;
        session.last_accessed = now;
        Some(session)
    }

    pub fn remove(&mut self, session_id: &str) -> Option<StudySession> {
        self.sessions.remove(session_id)
    }

    /// Drops sessions idle for longer than the time-to-live.
    ///
    /// Returns how many were dropped.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, s| now - s.last_accessed <= ttl);
        let purged = before - self.sessions.len();
        if purged > 0 {
            tracing::debug!("Expired {} idle study session(s)", purged);
        }
        purged
    }
}
