//! Anki study server
//!
//! Exposes an Anki collection to AI assistants over the Model Context
//! Protocol, including adaptive study sessions that ask each card in
//! several ways and report the learner's ease back to Anki.

pub mod anki;
pub mod config;
pub mod mcp;
pub mod study;
