//! Huddle - the realtime sync and summarization core of a team chat.
//!
//! A session resolves a participant identity, keeps a live ordered view of a
//! channel's messages pushed from a document store, appends new messages, and
//! asks an external text-generation endpoint for an on-demand summary.
//!
//! # Architecture
//!
//! - `identity`: identity resolution with custom-token and anonymous fallback
//! - `feed`: push subscriptions that replace the local snapshot on every change
//! - `publisher`: guarded appends with store-assigned ordering
//! - `summarize`: single-flight summarization with a failure placeholder
//! - `ai`: the Gemini `generateContent` client and prompts
//! - `store`: the document store port and an in-process implementation
//! - `session`: the dependency-injected client handle and per-session wiring
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use huddle::core::config::AppConfig;
//! use huddle::core::models::ChannelId;
//! use huddle::identity::MemoryIdentityService;
//! use huddle::session::{ChatSession, HuddleClient};
//! use huddle::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     huddle::setup_logging();
//!
//!     let config = AppConfig::from_env()?;
//!     let client = HuddleClient::from_config(
//!         &config,
//!         Arc::new(MemoryIdentityService::new()),
//!         Arc::new(MemoryStore::new()),
//!     )?;
//!
//!     let session = ChatSession::start(&client, ChannelId::new("general")?).await?;
//!     session.send("hello").await?;
//!
//!     if let Ok(summary) = session.summarize().await {
//!         println!("Summary: {}", summary.display_text());
//!     }
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod core;
pub mod errors;
pub mod feed;
pub mod identity;
pub mod publisher;
pub mod session;
pub mod store;
pub mod summarize;

pub use errors::HuddleError;

/// Configure structured logging with JSON format.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// huddle::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
