use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Timeout and retry settings applied to one external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Per-attempt timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each following one
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: None,
            max_retries: 0,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Outcome of a single attempt that did not succeed
#[derive(Debug, PartialEq, Eq)]
pub enum CallFailure<E> {
    TimedOut(Duration),
    Failed(E),
}

impl CallPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Runs `op` under this policy and returns the last failure once attempts run out.
    pub async fn run<T, E, F, Fut>(
        &self,
        name: &'static str,
        mut op: F,
    ) -> Result<T, CallFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            let outcome = match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, op()).await {
                    Ok(result) => result.map_err(CallFailure::Failed),
                    Err(_) => Err(CallFailure::TimedOut(limit)),
                },
                None => op().await.map_err(CallFailure::Failed),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(failure) if attempt < self.max_retries => {
                    let delay = self.backoff_for(attempt);
                    match &failure {
                        CallFailure::TimedOut(limit) => tracing::warn!(
                            call = name,
                            attempt = attempt + 1,
                            timeout_ms = limit.as_millis() as u64,
                            "External call timed out, retrying"
                        ),
                        CallFailure::Failed(e) => tracing::warn!(
                            call = name,
                            attempt = attempt + 1,
                            error = %e,
                            "External call failed, retrying"
                        ),
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}

impl CallFailure<AppError> {
    /// Collapses the failure into the error of the stage that made the call
    pub fn into_stage_error(self, stage: fn(String) -> AppError) -> AppError {
        match self {
            CallFailure::TimedOut(limit) => stage(format!("timed out after {:?}", limit)),
            CallFailure::Failed(e) => e,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for CallFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallFailure::TimedOut(limit) => write!(f, "timed out after {:?}", limit),
            CallFailure::Failed(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_default_policy_makes_a_single_attempt() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = CallPolicy::default()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("boom".to_string())
            })
            .await;

        assert_eq!(result, Err(CallFailure::Failed("boom".to_string())));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = CallPolicy {
            timeout: None,
            max_retries: 3,
            backoff: Duration::from_millis(100),
        };

        let result = policy
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("not yet".to_string())
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported() {
        let policy = CallPolicy::with_timeout(Duration::from_secs(120));
        let result: Result<(), CallFailure<String>> = policy
            .run("slow", || async {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(CallFailure::TimedOut(Duration::from_secs(120))));
    }

    #[test]
    fn test_timeout_maps_to_calling_stage() {
        let failure: CallFailure<AppError> = CallFailure::TimedOut(Duration::from_secs(5));
        let err = failure.into_stage_error(AppError::Extraction);
        assert!(matches!(err, AppError::Extraction(ref msg) if msg.contains("timed out")));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = CallPolicy {
            backoff: Duration::from_millis(100),
            ..CallPolicy::default()
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
    }
}
