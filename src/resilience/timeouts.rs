//! Deadline enforcement for calls to external collaborators.
//!
//! A slow limiter or audit sink must never hold a request indefinitely.

use std::future::Future;
use std::time::Duration;

/// Failure of a bounded call.
#[derive(Debug, thiserror::Error)]
pub enum DeadlineError<E> {
    #[error("deadline of {0:?} elapsed")]
    Elapsed(Duration),

    #[error("{0}")]
    Failed(E),
}

/// Run `fut` with a deadline, flattening its own error into [`DeadlineError`].
pub async fn with_deadline<F, T, E>(limit: Duration, fut: F) -> Result<T, DeadlineError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DeadlineError::Failed(e)),
        Err(_) => Err(DeadlineError::Elapsed(limit)),
    }
}
