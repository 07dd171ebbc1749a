//! All AI/LLM functionality

pub mod client;
pub mod prompt_builder;

// Re-export main types for convenience
pub use client::{GeminiClient, Summarizer, build_request_body, parse_generated_text};
pub use prompt_builder::{SYSTEM_PROMPT, SummaryRequest};
