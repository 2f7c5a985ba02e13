use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::backoff::retry_delay;
use crate::errors::StreamError;

pub(crate) const STREAM_LOGS_MAX_RETRIES: u32 = 3;
pub(crate) const STREAM_LOGS_BUDGET: Duration = Duration::from_secs(300);

/// Retry budget applied to one whole streaming call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRetryPolicy {
    /// Total connection attempts, including the first.
    pub total_attempts: u32,
    /// Wall-clock budget across all attempts combined.
    pub overall_budget: Duration,
}

impl Default for StreamRetryPolicy {
    fn default() -> Self {
        Self {
            total_attempts: STREAM_LOGS_MAX_RETRIES,
            overall_budget: STREAM_LOGS_BUDGET,
        }
    }
}

impl StreamRetryPolicy {
    /// Creates a policy with an explicit attempt count and wall-clock budget.
    pub fn new(total_attempts: u32, overall_budget: Duration) -> Self {
        Self {
            total_attempts,
            overall_budget,
        }
    }
}

/// How a single attempt finished without raising.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttemptEnd {
    /// The underlying stream ran to its natural end.
    Completed,
    /// The consumer dropped its handle; stop without error.
    ConsumerGone,
}

/// Drives `attempt` until it completes, exhausts the attempt budget, or
/// fails fatally.
///
/// Transient failures (`StreamError::is_transient`) sleep `retry_delay`
/// between attempts; fatal errors propagate immediately. The wall-clock
/// budget is checked at the start of every attempt, so a slow earlier
/// attempt can convert the next one into `TimedOut`.
pub(crate) async fn run_attempts<F, Fut>(
    policy: &StreamRetryPolicy,
    mut attempt: F,
) -> Result<AttemptEnd, StreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<AttemptEnd, StreamError>>,
{
    let started = Instant::now();

    for attempt_index in 0..policy.total_attempts {
        if started.elapsed() > policy.overall_budget {
            return Err(StreamError::timed_out(policy.overall_budget));
        }

        match attempt().await {
            Ok(end) => return Ok(end),
            Err(err) if err.is_transient() => {
                debug!(attempt = attempt_index, error = %err, "transient stream failure");
                if attempt_index + 1 < policy.total_attempts {
                    let delay = retry_delay(attempt_index);
                    debug!(
                        attempt = attempt_index,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after backoff"
                    );
                    sleep(delay).await;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(StreamError::too_many_retries(policy.total_attempts))
}
