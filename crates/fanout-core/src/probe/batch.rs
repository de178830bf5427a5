//! Probe many URLs at once: one pool item per URL, each retried on its own.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use crate::cancel::CancelSignal;
use crate::config::ProbeConfig;
use crate::pool::{run_pool, Outcome, PoolError, WorkItem};
use crate::retry::{is_retryable, RetryPolicy};

use super::{head, ProbeResponse};

/// What happened to one URL of a batch.
#[derive(Debug)]
pub struct ProbeReport {
    pub url: String,
    pub outcome: Outcome,
    /// HEAD requests actually sent (0 when the item was never dispatched).
    pub attempts: u32,
    pub response: Option<ProbeResponse>,
}

/// Flat, serializable view of a [`ProbeReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeRecord {
    pub url: String,
    pub state: &'static str,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn record(&self) -> ProbeRecord {
        let state = match self.outcome {
            Outcome::Succeeded => "succeeded",
            Outcome::Failed(_) => "failed",
            Outcome::NotAttempted => "not_attempted",
        };
        ProbeRecord {
            url: self.url.clone(),
            state,
            attempts: self.attempts,
            status: self.response.as_ref().map(|r| r.status),
            content_length: self.response.as_ref().and_then(|r| r.content_length),
            error: self.outcome.error().map(|e| format!("{:#}", e)),
        }
    }
}

/// Per-URL state shared between the pool task and the report. Written by one item only.
#[derive(Default)]
struct ProbeSlot {
    attempts: AtomicU32,
    response: OnceLock<ProbeResponse>,
}

impl ProbeSlot {
    /// Store the final response. Each item succeeds at most once, so a second
    /// call is a bug; the first response is kept and `false` returned.
    fn record_response(&self, url: &str, response: ProbeResponse) -> bool {
        if self.response.set(response).is_err() {
            tracing::warn!("response for {} already recorded; keeping the first", url);
            return false;
        }
        true
    }
}

/// HEAD every URL with at most `max_workers` in flight, retrying each under
/// `policy` with the default classifier. Reports come back in input order.
pub async fn probe_all(
    cancel: &CancelSignal,
    urls: &[String],
    max_workers: usize,
    policy: &RetryPolicy,
    cfg: &ProbeConfig,
) -> Result<Vec<ProbeReport>, PoolError> {
    let slots: Vec<Arc<ProbeSlot>> = urls.iter().map(|_| Arc::new(ProbeSlot::default())).collect();

    let items: Vec<WorkItem> = urls
        .iter()
        .zip(&slots)
        .enumerate()
        .map(|(id, (url, slot))| {
            let url = url.clone();
            let slot = Arc::clone(slot);
            let policy = policy.clone();
            let cfg = *cfg;
            WorkItem::new(id, move |cancel| async move {
                let response = policy
                    .run(
                        &cancel,
                        |_cancel| {
                            let attempt = slot.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                            tracing::debug!("HEAD {} (attempt {})", url, attempt);
                            let url = url.clone();
                            async move {
                                let joined = tokio::task::spawn_blocking(move || head(&url, &cfg)).await;
                                joined.unwrap_or_else(|e| Err(anyhow::Error::new(e)))
                            }
                        },
                        is_retryable,
                    )
                    .await?;
                slot.record_response(&url, response);
                anyhow::Ok(())
            })
        })
        .collect();

    let outcomes = run_pool(cancel, max_workers, items).await?;

    let reports: Vec<ProbeReport> = urls
        .iter()
        .zip(slots)
        .zip(outcomes)
        .map(|((url, slot), outcome)| {
            if let Some(err) = outcome.error() {
                tracing::warn!("probe {} failed: {:#}", url, err);
            }
            ProbeReport {
                url: url.clone(),
                outcome,
                attempts: slot.attempts.load(Ordering::Relaxed),
                response: slot.response.get().cloned(),
            }
        })
        .collect();
    Ok(reports)
}
