//! Retry with exponential backoff for revision conflicts
//!
//! A structural mutation is planned against the store revision it read. If a
//! writer outside this service instance lands first, the store rejects the
//! diff with a revision conflict. The mutation is then re-planned from fresh
//! bounds instead of failing on the first conflict.

use crate::services::TreeServiceError;
use std::future::Future;
use tokio::time::Duration;

/// Longest single sleep between attempts; the structural lock is held meanwhile
const MAX_BACKOFF: Duration = Duration::from_secs(1);

const MAX_BACKOFF_EXPONENT: usize = 16;

/// Retry policy for structural mutations
#[derive(Debug, Clone, Copy)]
pub struct ConflictRetry {
    max_retries: usize,
    base_backoff: Duration,
}

impl ConflictRetry {
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            base_backoff: Duration::from_millis(10),
        }
    }

    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Sleep before retry number `retries + 1`, doubling up to `MAX_BACKOFF`
    pub fn backoff(&self, retries: usize) -> Duration {
        let exponent = retries.min(MAX_BACKOFF_EXPONENT) as u32;
        (self.base_backoff * (1u32 << exponent)).min(MAX_BACKOFF)
    }

    /// Run `attempt` until it succeeds, fails with a non-retriable error, or
    /// `max_retries` retries have been spent.
    ///
    /// Each call to `attempt` must re-read everything it plans from.
    /// Backoff doubles per retry: 10ms, 20ms, 40ms, ... capped at one second.
    pub async fn run<T, F, Fut>(&self, node_id: &str, mut attempt: F) -> Result<T, TreeServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TreeServiceError>>,
    {
        let mut retries = 0;

        loop {
            match attempt().await {
                Ok(value) => {
                    if retries > 0 {
                        tracing::debug!(
                            "Structural update succeeded after {} retry(ies) for node '{}'",
                            retries,
                            node_id
                        );
                    }
                    return Ok(value);
                }

                Err(e) if e.is_retriable() && retries < self.max_retries => {
                    tracing::debug!(
                        "Revision conflict on attempt {}/{} for node '{}': {}. Retrying...",
                        retries + 1,
                        self.max_retries + 1,
                        node_id,
                        e
                    );

                    let backoff = self.backoff(retries);
                    tokio::time::sleep(backoff).await;
                    retries += 1;
                }

                Err(e) => {
                    if e.is_retriable() {
                        tracing::warn!(
                            "Max retries ({}) exceeded for node '{}' structural update",
                            self.max_retries,
                            node_id
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
