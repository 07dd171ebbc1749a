use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::ai::{Summarizer, SummaryRequest};
use crate::core::models::{FeedSnapshot, SummaryResult};
use crate::errors::HuddleError;

/// Why a `summarize` call was turned away without running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SummarizeRejection {
    #[error("a summarization is already in flight")]
    InFlight,
    #[error("there are no messages to summarize")]
    EmptyFeed,
}

/// Clears the in-flight flag when dropped, whatever way the run ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single-flight summarization of a feed snapshot.
pub struct SummarizationCoordinator {
    summarizer: Arc<dyn Summarizer>,
    in_flight: AtomicBool,
    latest: watch::Sender<Option<SummaryResult>>,
}

impl SummarizationCoordinator {
    #[must_use]
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            summarizer,
            in_flight: AtomicBool::new(false),
            latest,
        }
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The last published result; `None` while a run is in flight or before
    /// the first run.
    #[must_use]
    pub fn latest(&self) -> Option<SummaryResult> {
        self.latest.borrow().clone()
    }

    #[must_use]
    pub fn results(&self) -> watch::Receiver<Option<SummaryResult>> {
        self.latest.subscribe()
    }

    /// Summarize `snapshot`. Failures of the summarizer resolve to
    /// `SummaryResult::Failed`; only an empty feed or a concurrent run reject.
    ///
    /// # Errors
    ///
    /// Returns a `SummarizeRejection` when nothing was attempted.
    pub async fn summarize(
        &self,
        snapshot: &FeedSnapshot,
    ) -> Result<SummaryResult, SummarizeRejection> {
        if snapshot.is_empty() {
            return Err(SummarizeRejection::EmptyFeed);
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            info!("Summarization already in flight, ignoring request");
            return Err(SummarizeRejection::InFlight);
        };

        self.latest.send_replace(None);

        let request = SummaryRequest::from_snapshot(snapshot);
        info!("Summarizing {} messages", snapshot.len());

        let result = match self.summarizer.generate(&request).await {
            Ok(text) => SummaryResult::Text(text),
            Err(HuddleError::MalformedResponse(detail)) => {
                warn!("Summarizer returned a malformed response: {}", detail);
                SummaryResult::Failed
            }
            Err(e) => {
                error!("Error summarizing chat: {}", e);
                SummaryResult::Failed
            }
        };

        self.latest.send_replace(Some(result.clone()));
        Ok(result)
    }
}
