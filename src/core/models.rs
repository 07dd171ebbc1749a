use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::HuddleError;

/// Canonical text shown in place of a summary when summarization fails.
pub const CANONICAL_FAILURE_MESSAGE: &str = "Failed to generate a summary. Please try again.";

/// Number of leading characters of an author id shown in transcripts.
pub const AUTHOR_PREFIX_CHARS: usize = 8;

/// The participant identity for one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    id: String,
}

impl Identity {
    /// Returns `None` for an empty or whitespace-only id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self { id })
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// A signed-in principal as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: String,
    pub anonymous: bool,
}

impl Principal {
    #[must_use]
    pub fn to_identity(&self) -> Option<Identity> {
        Identity::new(self.uid.clone())
    }
}

/// A named conversation scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    /// # Errors
    ///
    /// Returns `InvalidInput` if the id is empty or contains a path separator.
    pub fn new(id: impl Into<String>) -> Result<Self, HuddleError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(HuddleError::InvalidInput(
                "channel id must not be empty".to_string(),
            ));
        }
        if trimmed.contains('/') {
            return Err(HuddleError::InvalidInput(format!(
                "channel id must not contain '/': {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned key that totally orders messages within a channel.
///
/// Compared by timestamp first; the store sequence breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderingKey {
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
}

impl Ord for OrderingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for OrderingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A message accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub server_timestamp: OrderingKey,
}

impl Message {
    /// Render as a transcript line: `<author prefix>: <text>`.
    #[must_use]
    pub fn transcript_line(&self) -> String {
        let author: String = self.author_id.chars().take(AUTHOR_PREFIX_CHARS).collect();
        format!("{author}: {}", self.text)
    }
}

/// Marker asking the store to assign the ordering key at accept time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTimestamp;

/// Payload appended by the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub author_id: String,
    pub text: String,
    pub timestamp: ServerTimestamp,
}

impl NewMessage {
    #[must_use]
    pub fn new(author: &Identity, text: impl Into<String>) -> Self {
        Self {
            author_id: author.id().to_string(),
            text: text.into(),
            timestamp: ServerTimestamp,
        }
    }
}

/// Ordered, deduplicated view of a channel's messages.
///
/// Cloning is cheap; snapshots are replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    messages: Arc<Vec<Message>>,
}

impl FeedSnapshot {
    /// Build a snapshot from a full result set, sorting ascending by
    /// ordering key and keeping the first record seen for each id.
    #[must_use]
    pub fn from_records(records: Vec<Message>) -> Self {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        let mut messages: Vec<Message> = records
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .collect();
        messages.sort_by(|a, b| a.server_timestamp.cmp(&b.server_timestamp));
        Self {
            messages: Arc::new(messages),
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Newline-joined transcript lines in snapshot order.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(Message::transcript_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Terminal outcome of a summarization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryResult {
    Text(String),
    Failed,
}

impl SummaryResult {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, SummaryResult::Failed)
    }

    /// Text to display: the summary itself or the failure placeholder.
    #[must_use]
    pub fn display_text(&self) -> &str {
        match self {
            SummaryResult::Text(text) => text,
            SummaryResult::Failed => CANONICAL_FAILURE_MESSAGE,
        }
    }
}
