//! Conversation snapshots: the engine's entire input.
//!
//! A snapshot is the complete, order-stable message collection of one
//! conversation plus its group records, as read from the message store at a
//! single point in time. Nothing in a snapshot is mutated by the engine.

use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::group::MessageGroup;
use crate::message::{Message, null_as_default};

/// Errors from loading a snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Reading the source failed.
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// The source is not a valid snapshot document.
    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Messages and groups for one conversation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    /// All messages, expected in creation order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Vec<MessageGroup>,
}

impl ConversationSnapshot {
    pub fn new(messages: Vec<Message>, groups: Vec<MessageGroup>) -> Self {
        Self { messages, groups }
    }

    /// Parse a snapshot document.
    ///
    /// Accepts either `{"messages": [...], "groups": [...]}` or a bare array
    /// of messages (no groups). The shape is picked from the first
    /// non-whitespace byte so parse errors point at the offending field.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        if text.trim_start().starts_with('[') {
            let messages: Vec<Message> = serde_json::from_str(text)?;
            Ok(Self::new(messages, Vec::new()))
        } else {
            Ok(serde_json::from_str(text)?)
        }
    }

    /// Read and parse a snapshot document.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, SnapshotError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_json(&text)
    }

    /// Check if the snapshot has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the total number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether messages are in non-decreasing `created_at` order.
    pub fn is_sorted_by_creation(&self) -> bool {
        self.messages
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at)
    }

    /// Stable-sort messages by `created_at`.
    ///
    /// Flattening assumes creation order; stores that page messages out of
    /// order should call this first. Ties keep their input order.
    pub fn sort_by_creation(&mut self) {
        self.messages.sort_by_key(|m| m.created_at);
    }
}

// ============================================================================
// Tests
// ============================================================================
