// ABOUTME: Re-issues a remote call while its failure is classified as transient.
// ABOUTME: Bounded by a time budget with a fixed pause between attempts.

pub mod classify;

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Why a retried call gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The call failed with an error that is not worth retrying.
    #[error("{error}")]
    Terminal { error: E, attempts: u32 },

    /// The call kept failing transiently until the budget ran out.
    #[error("{error} (still failing after {attempts} attempts)")]
    BudgetExhausted { error: E, attempts: u32 },

    /// An attempt was still running when the budget ran out.
    #[error("call did not complete within its time budget (attempt {attempts})")]
    DeadlineExceeded { last: Option<E>, attempts: u32 },
}

impl<E> RetryError<E> {
    /// The last error returned by the call, if one came back at all.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Terminal { error, .. } | RetryError::BudgetExhausted { error, .. } => {
                Some(error)
            }
            RetryError::DeadlineExceeded { last, .. } => last.as_ref(),
        }
    }

    pub fn into_last_error(self) -> Option<E> {
        match self {
            RetryError::Terminal { error, .. } | RetryError::BudgetExhausted { error, .. } => {
                Some(error)
            }
            RetryError::DeadlineExceeded { last, .. } => last,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Terminal { attempts, .. }
            | RetryError::BudgetExhausted { attempts, .. }
            | RetryError::DeadlineExceeded { attempts, .. } => *attempts,
        }
    }

    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, RetryError::BudgetExhausted { .. })
    }
}

/// Run `op` until it succeeds, fails terminally, or `timeout` is used up.
///
/// The first attempt is always made, even with a zero budget. `is_retryable`
/// is the only authority on which failures are retried. An attempt still
/// running when the budget is used up is abandoned.
pub async fn retry_when<T, E, F, Fut, P>(
    timeout: Duration,
    backoff: Duration,
    mut op: F,
    is_retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;
    let mut last = None;

    loop {
        attempts += 1;
        let error = match tokio::time::timeout_at(deadline, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => return Err(RetryError::DeadlineExceeded { last, attempts }),
        };

        if !is_retryable(&error) {
            return Err(RetryError::Terminal { error, attempts });
        }

        if Instant::now() + backoff >= deadline {
            return Err(RetryError::BudgetExhausted { error, attempts });
        }

        tracing::debug!(attempt = attempts, error = %error, "retrying transient failure");
        tokio::time::sleep(backoff).await;
        last = Some(error);
    }
}
