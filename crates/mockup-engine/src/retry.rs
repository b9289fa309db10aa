//! Bounded exponential backoff for transient provider failures.
//!
//! After failed attempt `i` (0-based) the policy waits `base_delay * 2^i`
//! before trying again. Terminal errors are returned immediately, untouched.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, Result};

pub type RetryObserver = Arc<dyn Fn(&RetryNotice<'_>) + Send + Sync>;

/// Emitted once per scheduled retry, before the backoff sleep.
#[derive(Debug)]
pub struct RetryNotice<'a> {
    pub label: &'a str,
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
    pub error: &'a EngineError,
}

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    observer: Option<RetryObserver>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            observer: None,
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt_index).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt_index = 0u32;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_transient() {
                return Err(err);
            }
            let attempt = attempt_index + 1;
            if attempt >= self.max_attempts {
                tracing::warn!(label, attempts = attempt, error = %err, "retries exhausted");
                return Err(EngineError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.delay_for(attempt_index);
            tracing::warn!(
                label,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, retrying"
            );
            if let Some(observer) = &self.observer {
                observer(&RetryNotice {
                    label,
                    attempt,
                    max_attempts: self.max_attempts,
                    delay,
                    error: &err,
                });
            }
            tokio::time::sleep(delay).await;
            attempt_index = attempt;
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;

    fn busy() -> EngineError {
        EngineError::remote(Some(503), "model overloaded")
    }

    #[tokio::test(start_paused = true)]
    async fn two_transient_failures_then_success_waits_100_then_200() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let started = Instant::now();

        let value = policy
            .run("render", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(busy())
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(value.ok(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_error_fails_first_attempt_without_delay() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let started = Instant::now();

        let result: Result<()> = policy
            .run("render", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(EngineError::remote(Some(400), "invalid argument")) }
            })
            .await;

        assert!(matches!(
            result,
            Err(EngineError::Remote {
                status: Some(400),
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_wraps_the_last_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let started = Instant::now();

        let result: Result<()> = policy.run("analyze", || async { Err(busy()) }).await;

        match result {
            Err(EngineError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, EngineError::Remote { status: Some(503), .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_each_scheduled_retry() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let policy = RetryPolicy::new(4, Duration::from_millis(50)).with_observer(Arc::new(
            move |notice: &RetryNotice<'_>| {
                if let Ok(mut rows) = sink.lock() {
                    rows.push((notice.label.to_string(), notice.attempt, notice.delay));
                }
            },
        ));

        let _: Result<()> = policy.run("render", || async { Err(busy()) }).await;

        let rows = seen.lock().map(|rows| rows.clone()).unwrap_or_default();
        assert_eq!(
            rows,
            vec![
                ("render".to_string(), 1, Duration::from_millis(50)),
                ("render".to_string(), 2, Duration::from_millis(100)),
                ("render".to_string(), 3, Duration::from_millis(200)),
            ]
        );
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::from_millis(10)).max_attempts(), 1);
        assert_eq!(RetryPolicy::none().delay_for(3), Duration::ZERO);
    }
}
