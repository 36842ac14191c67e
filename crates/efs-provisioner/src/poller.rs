//! Convergence poller.
//!
//! Re-invokes an ensure call on a fixed interval until the observed object
//! reports `available`. Every attempt is a full ensure round trip, which is
//! safe because the ensure primitives are idempotent. Only "not yet
//! available" is retried: an ensure error ends the loop immediately.
//!
//! Each call owns its own timer, so concurrent polls never share a ticker.
//! Both the ensure call and the wait between attempts stop as soon as the
//! supplied [`CancellationToken`] is cancelled.

use std::future::Future;
use std::time::Duration;

use efs_core::{EfsError, Observed};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Outcome of a successful convergence.
#[derive(Debug, Clone)]
pub struct Converged<T> {
    /// The object as last observed, in the `available` state.
    pub resource: T,
    /// Number of ensure calls made, including the final one.
    pub attempts: u32,
}

/// Fixed-interval poller with an optional attempt bound.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    max_attempts: Option<u32>,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Poller {
    /// Creates an unbounded poller.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Bounds the number of ensure calls. `None` polls until cancelled.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts.filter(|max| *max > 0);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Calls `ensure` until the returned object is available.
    ///
    /// # Errors
    ///
    /// - the first error returned by `ensure`, unchanged
    /// - `EfsError::Cancelled` once `cancel` fires
    /// - `EfsError::AttemptsExhausted` when a bound is set and reached
    pub async fn converge<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut ensure: F,
    ) -> Result<Converged<T>, EfsError>
    where
        T: Observed,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EfsError>>,
    {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let observed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(EfsError::cancelled(label)),
                result = ensure() => result?,
            };

            let state = observed.lifecycle_state();
            if state.is_available() {
                debug!(resource = %label, attempts, "{} is available", observed.describe());
                return Ok(Converged {
                    resource: observed,
                    attempts,
                });
            }

            if let Some(max) = self.max_attempts
                && attempts >= max
            {
                return Err(EfsError::attempts_exhausted(label, attempts));
            }

            info!(
                resource = %label,
                lifecycle = %state,
                attempts,
                "Waiting for {} to become ready",
                observed.describe()
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(EfsError::cancelled(label)),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use efs_core::{FilesystemResource, FilesystemSpec, LifecycleState, PerformanceMode};
    use efs_memory::InMemoryProvider;
    use tokio::time::Instant;

    use super::*;
    use crate::ensure::ensure_filesystem;

    fn spec() -> FilesystemSpec {
        FilesystemSpec::new("acme-prod", "ap-southeast-2", "sg-1", ["sn-1"])
    }

    fn filesystem(state: LifecycleState) -> FilesystemResource {
        FilesystemResource {
            id: "fs-1".into(),
            creation_token: "acme-prod".into(),
            lifecycle_state: state,
            performance_mode: PerformanceMode::GeneralPurpose,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_in_exactly_n_ticks() {
        let provider = InMemoryProvider::new();
        provider.insert_filesystem("acme-prod", LifecycleState::Creating, 4);
        let spec = spec();
        let poller = Poller::new(Duration::from_secs(15));
        let started = Instant::now();

        let converged = poller
            .converge("acme-prod", &CancellationToken::new(), || {
                ensure_filesystem(&provider, &spec)
            })
            .await
            .unwrap();

        assert_eq!(converged.attempts, 4);
        assert_eq!(converged.resource.lifecycle_state, LifecycleState::Available);
        assert_eq!(provider.describe_filesystem_calls(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_on_first_call_does_not_wait() {
        let started = Instant::now();
        let converged = Poller::default()
            .converge("fs", &CancellationToken::new(), || async {
                Ok(filesystem(LifecycleState::Available))
            })
            .await
            .unwrap();
        assert_eq!(converged.attempts, 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = Poller::default()
            .converge("fs", &CancellationToken::new(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<FilesystemResource, _>(EfsError::provider("Describe", "boom")) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EfsError::Provider { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_poller_gives_up() {
        let err = Poller::new(Duration::from_secs(1))
            .with_max_attempts(Some(3))
            .converge("fs", &CancellationToken::new(), || async {
                Ok(filesystem(LifecycleState::Creating))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EfsError::AttemptsExhausted { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_the_wait() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(40)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = Poller::new(Duration::from_secs(15))
            .converge("fs", &cancel, || async { Ok(filesystem(LifecycleState::Creating)) })
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(started.elapsed(), Duration::from_secs(40));
    }

    #[test]
    fn test_zero_max_attempts_means_unbounded() {
        let poller = Poller::default().with_max_attempts(Some(0));
        assert_eq!(poller.max_attempts(), None);
        assert_eq!(poller.interval(), DEFAULT_POLL_INTERVAL);
    }
}
