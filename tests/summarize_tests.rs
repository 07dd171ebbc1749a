mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{Reply, ScriptedSummarizer, snapshot, wait_until};
use huddle::HuddleError;
use huddle::ai::{GeminiClient, Summarizer, SummaryRequest};
use huddle::core::models::{FeedSnapshot, SummaryResult};
use huddle::summarize::{SummarizationCoordinator, SummarizeRejection};
use serde_json::json;
use tokio::sync::Notify;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Summarizer that holds each call until released.
struct GatedSummarizer {
    gate: Notify,
    calls: AtomicUsize,
}

impl GatedSummarizer {
    fn new() -> Self {
        Self {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Summarizer for GatedSummarizer {
    async fn generate(&self, _request: &SummaryRequest) -> Result<String, HuddleError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(format!("run {n}"))
    }
}

struct PanickingSummarizer;

#[async_trait]
impl Summarizer for PanickingSummarizer {
    async fn generate(&self, _request: &SummaryRequest) -> Result<String, HuddleError> {
        panic!("summarizer blew up");
    }
}

fn feed() -> FeedSnapshot {
    snapshot(&[("u1", "hello"), ("abcdefghijk", "long author id")])
}

#[tokio::test]
async fn test_empty_snapshot_is_rejected_without_call() {
    let summarizer = Arc::new(ScriptedSummarizer::new(Reply::Text("unused")));
    let coordinator = SummarizationCoordinator::new(summarizer.clone());

    let result = coordinator.summarize(&FeedSnapshot::default()).await;
    assert_eq!(result, Err(SummarizeRejection::EmptyFeed));
    assert_eq!(summarizer.calls(), 0);
    assert_eq!(coordinator.latest(), None);
}

#[tokio::test]
async fn test_success_builds_transcript_and_publishes_text() {
    let summarizer = Arc::new(ScriptedSummarizer::new(Reply::Text("Summary A")));
    let coordinator = SummarizationCoordinator::new(summarizer.clone());

    let result = coordinator.summarize(&feed()).await.unwrap();
    assert_eq!(result, SummaryResult::Text("Summary A".into()));
    assert_eq!(coordinator.latest(), Some(result));
    assert!(!coordinator.is_in_flight());

    let request = summarizer.last_request().unwrap();
    assert_eq!(
        request.user_prompt,
        "Summarize the following chat conversation:\n\nu1: hello\nabcdefgh: long author id"
    );
    assert!(request.system_instruction.contains("single-paragraph"));
}

#[tokio::test]
async fn test_malformed_and_transport_failures_map_to_placeholder() {
    for reply in [Reply::Malformed, Reply::Transport] {
        let coordinator =
            SummarizationCoordinator::new(Arc::new(ScriptedSummarizer::new(reply)));

        let result = coordinator.summarize(&feed()).await.unwrap();
        assert_eq!(result, SummaryResult::Failed);
        assert_eq!(coordinator.latest(), Some(SummaryResult::Failed));
        assert!(!coordinator.is_in_flight());
    }
}

#[tokio::test]
async fn test_sequential_runs_classify_the_same() {
    for reply in [Reply::Text("same"), Reply::Malformed] {
        let coordinator =
            SummarizationCoordinator::new(Arc::new(ScriptedSummarizer::new(reply)));
        let first = coordinator.summarize(&feed()).await.unwrap();
        let second = coordinator.summarize(&feed()).await.unwrap();
        assert_eq!(first.is_failed(), second.is_failed());
    }
}

#[tokio::test]
async fn test_second_call_while_in_flight_is_rejected() {
    let summarizer = Arc::new(GatedSummarizer::new());
    let coordinator = Arc::new(SummarizationCoordinator::new(summarizer.clone()));

    let running = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.summarize(&feed()).await })
    };
    wait_until(|| summarizer.calls.load(Ordering::SeqCst) == 1).await;
    assert!(coordinator.is_in_flight());
    assert_eq!(coordinator.latest(), None);

    let rejected = coordinator.summarize(&feed()).await;
    assert_eq!(rejected, Err(SummarizeRejection::InFlight));
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);

    summarizer.gate.notify_one();
    let result = running.await.unwrap().unwrap();
    assert_eq!(result, SummaryResult::Text("run 0".into()));
    assert_eq!(coordinator.latest(), Some(result));
    assert!(!coordinator.is_in_flight());
}

#[tokio::test]
async fn test_new_run_clears_previous_result() {
    let summarizer = Arc::new(GatedSummarizer::new());
    let coordinator = Arc::new(SummarizationCoordinator::new(summarizer.clone()));

    summarizer.gate.notify_one();
    coordinator.summarize(&feed()).await.unwrap();
    assert!(coordinator.latest().is_some());

    let mut results = coordinator.results();
    let running = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.summarize(&feed()).await })
    };
    tokio::time::timeout(
        Duration::from_secs(5),
        results.wait_for(|latest| latest.is_none()),
    )
    .await
    .unwrap()
    .unwrap();

    summarizer.gate.notify_one();
    running.await.unwrap().unwrap();
    assert!(coordinator.latest().is_some());
}

#[tokio::test]
async fn test_flag_released_when_summarizer_panics() {
    let coordinator = Arc::new(SummarizationCoordinator::new(Arc::new(PanickingSummarizer)));

    let task = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.summarize(&feed()).await })
    };
    assert!(task.await.is_err());
    assert!(!coordinator.is_in_flight());
}

#[tokio::test]
async fn test_flag_released_when_run_is_dropped() {
    let summarizer = Arc::new(GatedSummarizer::new());
    let coordinator = SummarizationCoordinator::new(summarizer.clone());

    let timed_out = tokio::time::timeout(Duration::from_millis(20), coordinator.summarize(&feed())).await;
    assert!(timed_out.is_err());
    assert!(!coordinator.is_in_flight());
}

// ─────────────────────────────────────────────────────────────────────────────
// Against a mocked generateContent endpoint
// ─────────────────────────────────────────────────────────────────────────────

async fn coordinator_for(server: &MockServer) -> SummarizationCoordinator {
    let client = GeminiClient::new(
        "test-key".into(),
        "gemini-test".into(),
        server.uri(),
        Duration::from_secs(5),
    )
    .unwrap();
    SummarizationCoordinator::new(Arc::new(client))
}

#[tokio::test]
async fn test_endpoint_text_becomes_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Summary A" }] } }]
        })))
        .mount(&server)
        .await;

    let result = coordinator_for(&server).await.summarize(&feed()).await;
    assert_eq!(result, Ok(SummaryResult::Text("Summary A".into())));
}

#[tokio::test]
async fn test_endpoint_empty_object_becomes_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let result = coordinator_for(&server).await.summarize(&feed()).await;
    assert_eq!(result, Ok(SummaryResult::Failed));
}

#[tokio::test]
async fn test_endpoint_error_status_becomes_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = coordinator_for(&server).await.summarize(&feed()).await;
    assert_eq!(result, Ok(SummaryResult::Failed));
}

#[tokio::test]
async fn test_empty_feed_never_reaches_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = coordinator_for(&server)
        .await
        .summarize(&FeedSnapshot::default())
        .await;
    assert_eq!(result, Err(SummarizeRejection::EmptyFeed));
}
