use crate::core::models::FeedSnapshot;

/// Fixed system instruction sent with every summarization request.
pub const SYSTEM_PROMPT: &str = "You are a professional chat summarizer. \
    Your task is to provide a concise, single-paragraph summary of the key points and topics \
    discussed in the chat conversation. Use clear and neutral language. \
    Do not invent any information.";

pub const USER_PROMPT_PREFIX: &str = "Summarize the following chat conversation:\n\n";

/// One summarization call: system instruction plus user payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub system_instruction: String,
    pub user_prompt: String,
}

impl SummaryRequest {
    #[must_use]
    pub fn from_transcript(transcript: &str) -> Self {
        Self {
            system_instruction: SYSTEM_PROMPT.to_string(),
            user_prompt: format!("{USER_PROMPT_PREFIX}{transcript}"),
        }
    }

    #[must_use]
    pub fn from_snapshot(snapshot: &FeedSnapshot) -> Self {
        Self::from_transcript(&snapshot.transcript())
    }
}
