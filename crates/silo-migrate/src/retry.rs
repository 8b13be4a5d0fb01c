//! Bounded poll helper for eventually-consistent warehouse metadata.
//!
//! Object creation in a warehouse control plane may not be immediately
//! visible to subsequent metadata reads; callers poll an existence probe
//! until it reports true or a bounded number of attempts runs out.

use std::future::Future;
use std::time::Duration;

/// Outcome of a [`poll_until`] loop.
///
/// Exhaustion without a probe error and a failing probe are distinct cases;
/// callers decide how severe each one is.
#[derive(Debug)]
pub enum PollOutcome<E> {
    /// The probe returned true within the attempt budget.
    Satisfied { attempts: u32 },
    /// Every attempt completed, the last one returning a clean false.
    Exhausted { attempts: u32 },
    /// Every attempt completed, the last one returning an error.
    ProbeFailed(E),
}

/// Invoke `probe` until it returns `Ok(true)`, sleeping `delay` between
/// attempts, for at most `max_attempts` attempts.
///
/// Probe errors do not abort the loop; a transient transport fault on one
/// attempt is retried like a clean miss. Only the final attempt's error (if
/// any) is reported. There is no sleep after the final attempt.
pub async fn poll_until<F, Fut, E>(max_attempts: u32, delay: Duration, mut probe: F) -> PollOutcome<E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut last_error = None;
    for attempt in 1..=max_attempts {
        match probe().await {
            Ok(true) => return PollOutcome::Satisfied { attempts: attempt },
            Ok(false) => last_error = None,
            Err(e) => last_error = Some(e),
        }
        if attempt < max_attempts {
            tokio::time::sleep(delay).await;
        }
    }
    match last_error {
        Some(e) => PollOutcome::ProbeFailed(e),
        None => PollOutcome::Exhausted {
            attempts: max_attempts,
        },
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
