use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::trace;

use crate::types::{DocError, LlmError};

/// Global cap on in-flight external API calls.
///
/// One limiter is shared by every file and folder task in a run. Waiters are
/// served in FIFO order, and the permit covers the whole call including any
/// retries inside it, so the provider never sees more than `max_concurrent`
/// requests from one run regardless of how wide the traversal fans out.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ApiRateLimiter {
    pub fn new(max_concurrent: usize) -> Result<Self, DocError> {
        if max_concurrent == 0 {
            return Err(DocError::Config(
                "api concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run `call` once a slot frees up.
    ///
    /// The permit is released when the call settles, on success and on
    /// failure alike.
    pub async fn submit<T, F>(&self, call: F) -> Result<T, LlmError>
    where
        F: Future<Output = Result<T, LlmError>>,
    {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LlmError::LimiterClosed)?;
        trace!(
            "call slot acquired ({} available)",
            self.semaphore.available_permits()
        );
        call.await
    }
}
