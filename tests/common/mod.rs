#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use huddle::HuddleError;
use huddle::ai::{Summarizer, SummaryRequest};
use huddle::core::models::{FeedSnapshot, Message, OrderingKey};

pub const WAIT: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds, panicking after `WAIT`.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub fn message(id: &str, author: &str, text: &str, seq: u64) -> Message {
    Message {
        id: id.to_string(),
        author_id: author.to_string(),
        text: text.to_string(),
        server_timestamp: OrderingKey {
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            sequence: seq,
        },
    }
}

pub fn snapshot(lines: &[(&str, &str)]) -> FeedSnapshot {
    FeedSnapshot::from_records(
        lines
            .iter()
            .enumerate()
            .map(|(i, (author, text))| message(&format!("m{i}"), author, text, i as u64 + 1))
            .collect(),
    )
}

pub enum Reply {
    Text(&'static str),
    Malformed,
    Transport,
}

/// Summarizer returning a fixed reply and recording every request.
pub struct ScriptedSummarizer {
    reply: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<SummaryRequest>>,
}

impl ScriptedSummarizer {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SummaryRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn generate(&self, request: &SummaryRequest) -> Result<String, HuddleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Malformed => Err(HuddleError::MalformedResponse("no candidates".into())),
            Reply::Transport => Err(HuddleError::HttpError("connection reset".into())),
        }
    }
}
