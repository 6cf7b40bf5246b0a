//! Inbound prompt as seen by the router

use jiff::Timestamp;
use serde::Serialize;
use uuid::Uuid;

/// A single inbound prompt
///
/// Immutable once created. Lives only for the duration of the request it
/// belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct Prompt {
    id: Uuid,
    text: String,
    received_at: Timestamp,
}

impl Prompt {
    /// Wrap prompt text, assigning a fresh request id and arrival time
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            received_at: Timestamp::now(),
        }
    }

    /// Request id assigned at ingress
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Raw prompt text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// When the prompt reached the router
    pub const fn received_at(&self) -> Timestamp {
        self.received_at
    }

    /// Length in Unicode scalar values
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the prompt has no visible content
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
