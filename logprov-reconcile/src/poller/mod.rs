//! Convergence polling after writes against an eventually consistent API.
//!
//! A successful write does not mean the next read sees it. The poller re-reads
//! the resource until an acceptance predicate holds, the attempt budget runs
//! out, or a read fails in a way retrying cannot fix.

pub mod backoff;
pub mod predicates;

pub use backoff::{Backoff, BackoffStrategy};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{FetchError, ReconcileError};
use crate::remote::Fetcher;
use crate::state::{DesiredState, Observation, ObservedState};

/// Attempt budget and delay growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Upper bound on fetch calls per poll.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            backoff: Backoff::default(),
        }
    }
}

/// Decides whether a failed fetch is worth another attempt.
pub type RetryClassifier = Arc<dyn Fn(&FetchError) -> bool + Send + Sync>;

/// Terminal result of one poll.
#[derive(Debug)]
pub enum ConvergenceOutcome {
    /// The acceptance predicate held on the most recent fetch.
    Converged {
        observation: Observation,
        attempts: u32,
    },
    /// Budget exhausted; carries what was last seen so the caller can judge.
    NotYetConverged {
        last_observed: Option<ObservedState>,
        last_error: Option<FetchError>,
        attempts: u32,
    },
    /// The resource never showed up, or vanished and the classifier gave up on it.
    NotFound { attempts: u32 },
    /// A fetch failed with a non-retryable error.
    Fatal { error: FetchError, attempts: u32 },
}

impl ConvergenceOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceOutcome::Converged { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ConvergenceOutcome::Converged { attempts, .. }
            | ConvergenceOutcome::NotYetConverged { attempts, .. }
            | ConvergenceOutcome::NotFound { attempts }
            | ConvergenceOutcome::Fatal { attempts, .. } => *attempts,
        }
    }

    /// Map onto the caller-facing error taxonomy.
    pub fn into_result(self, id: &str) -> Result<Observation, ReconcileError> {
        match self {
            ConvergenceOutcome::Converged { observation, .. } => Ok(observation),
            ConvergenceOutcome::NotYetConverged {
                last_observed,
                attempts,
                ..
            } => Err(ReconcileError::RetryBudgetExhausted {
                attempts,
                last_observed: last_observed.map(Box::new),
            }),
            ConvergenceOutcome::NotFound { attempts } => Err(ReconcileError::TransientNotFound {
                id: id.to_string(),
                attempts,
            }),
            ConvergenceOutcome::Fatal { error, .. } => Err(ReconcileError::Fatal {
                id: id.to_string(),
                source: error,
            }),
        }
    }
}

/// Re-reads a resource until it converges. Holds no per-poll state, so one
/// poller can serve any number of concurrent polls.
#[derive(Clone)]
pub struct Poller {
    policy: PollPolicy,
    retryable: RetryClassifier,
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(PollPolicy::default())
    }
}

impl Poller {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            retryable: Arc::new(FetchError::is_retryable),
        }
    }

    /// Replace the default classifier (NotFound and Transient retry).
    pub fn with_classifier<C>(mut self, classifier: C) -> Self
    where
        C: Fn(&FetchError) -> bool + Send + Sync + 'static,
    {
        self.retryable = Arc::new(classifier);
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll `id` until `is_acceptable(desired, observation)` holds.
    ///
    /// Performs at most `max_attempts` fetches and sleeps per the backoff
    /// between them, never after the last. A zero budget fetches nothing and
    /// reports `NotYetConverged`. A `NotFound` read is
    /// handed to the predicate as [`Observation::Absent`], so deletes converge
    /// on absence through the same path.
    pub async fn poll_until_converged<F, P>(
        &self,
        desired: &DesiredState,
        fetcher: &F,
        id: &str,
        is_acceptable: P,
    ) -> ConvergenceOutcome
    where
        F: Fetcher + ?Sized,
        P: Fn(&DesiredState, &Observation) -> bool,
    {
        let max_attempts = self.policy.max_attempts;
        let mut last_observed: Option<ObservedState> = None;
        let mut last_error: Option<FetchError> = None;
        let mut last_absent = false;
        let mut attempts = 0;

        while attempts < max_attempts {
            if attempts > 0 {
                let delay = self.policy.backoff.delay_for(attempts - 1);
                debug!("Waiting {:?} before polling {} again", delay, id);
                tokio::time::sleep(delay).await;
            }
            attempts += 1;

            let observation = match fetcher.fetch(id).await {
                Ok(state) => Observation::Present(state),
                Err(FetchError::NotFound) => Observation::Absent,
                Err(e) if (self.retryable)(&e) => {
                    debug!(
                        "Poll {}/{} for {} failed, retrying: {}",
                        attempts, max_attempts, id, e
                    );
                    last_absent = false;
                    last_error = Some(e);
                    continue;
                }
                Err(e) => {
                    error!("Poll for {} failed permanently: {}", id, e);
                    return ConvergenceOutcome::Fatal { error: e, attempts };
                }
            };

            if is_acceptable(desired, &observation) {
                info!("Resource {} converged after {} attempt(s)", id, attempts);
                return ConvergenceOutcome::Converged {
                    observation,
                    attempts,
                };
            }

            match observation {
                Observation::Present(state) => {
                    debug!(
                        "Poll {}/{} for {}: not yet converged",
                        attempts, max_attempts, id
                    );
                    last_observed = Some(state);
                    last_error = None;
                    last_absent = false;
                }
                Observation::Absent => {
                    if !(self.retryable)(&FetchError::NotFound) {
                        warn!("Resource {} not found, not retrying", id);
                        return ConvergenceOutcome::NotFound { attempts };
                    }
                    debug!("Poll {}/{} for {}: not visible yet", attempts, max_attempts, id);
                    last_error = None;
                    last_absent = true;
                }
            }
        }

        warn!(
            "Resource {} did not converge within {} attempts",
            id, max_attempts
        );
        if last_absent {
            ConvergenceOutcome::NotFound { attempts }
        } else {
            ConvergenceOutcome::NotYetConverged {
                last_observed,
                last_error,
                attempts,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AttributeMap;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    enum Step {
        Found(AttributeMap),
        Missing,
        Throttled,
        Denied,
    }

    /// Replays `steps` in order, repeating the last one forever.
    struct Scripted {
        steps: Vec<Step>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for Scripted {
        async fn fetch(&self, id: &str) -> Result<ObservedState, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let step = self.steps[n.min(self.steps.len() - 1)].clone();
            match step {
                Step::Found(attrs) => Ok(ObservedState::new(id, attrs)),
                Step::Missing => Err(FetchError::NotFound),
                Step::Throttled => Err(FetchError::Transient(anyhow::anyhow!(
                    "429 Too Many Requests"
                ))),
                Step::Denied => Err(FetchError::Fatal(anyhow::anyhow!("403 Forbidden"))),
            }
        }
    }

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            backoff: Backoff {
                strategy: BackoffStrategy::Exponential,
                initial_delay_ms: 100,
                max_delay_ms: 1_000,
                multiplier: 2.0,
            },
        }
    }

    fn desired() -> AttributeMap {
        AttributeMap::new().with("name", "errors").with("active", true)
    }

    fn stale() -> AttributeMap {
        AttributeMap::new().with("name", "errors").with("active", false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_circuits_on_first_attempt() {
        let fetcher = Scripted::new(vec![Step::Found(desired())]);
        let poller = Poller::new(policy(5));

        let outcome = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await;

        assert!(outcome.is_converged());
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_after_stale_reads() {
        let fetcher = Scripted::new(vec![
            Step::Missing,
            Step::Found(stale()),
            Step::Found(desired()),
        ]);
        let poller = Poller::new(policy(5));
        let start = tokio::time::Instant::now();

        let outcome = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await;

        match outcome {
            ConvergenceOutcome::Converged {
                observation,
                attempts,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(observation.state().unwrap().attributes, desired());
            }
            other => panic!("expected convergence, got {:?}", other),
        }
        // 100ms + 200ms of backoff
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminates_within_budget() {
        let fetcher = Scripted::new(vec![Step::Found(stale())]);
        let poller = Poller::new(policy(4));

        let outcome = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await;

        assert_eq!(fetcher.calls(), 4);
        match outcome {
            ConvergenceOutcome::NotYetConverged {
                last_observed,
                last_error,
                attempts,
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(last_observed.unwrap().attributes, stale());
                assert!(last_error.is_none());
            }
            other => panic!("expected NotYetConverged, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_never_fetches() {
        let fetcher = Scripted::new(vec![Step::Found(desired())]);
        let poller = Poller::new(policy(0));

        let outcome = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await;

        assert!(matches!(
            outcome,
            ConvergenceOutcome::NotYetConverged {
                last_observed: None,
                last_error: None,
                attempts: 0,
            }
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_immediately() {
        let fetcher = Scripted::new(vec![
            Step::Found(stale()),
            Step::Denied,
            Step::Found(desired()),
        ]);
        let poller = Poller::new(policy(5));

        let outcome = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await;

        assert!(matches!(
            outcome,
            ConvergenceOutcome::Fatal {
                error: FetchError::Fatal(_),
                attempts: 2
            }
        ));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let fetcher = Scripted::new(vec![Step::Throttled, Step::Throttled, Step::Found(desired())]);
        let poller = Poller::new(policy(5));

        let outcome = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await;

        assert!(outcome.is_converged());
        assert_eq!(outcome.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_on_transient_keeps_last_error() {
        let fetcher = Scripted::new(vec![Step::Found(stale()), Step::Throttled]);
        let poller = Poller::new(policy(3));

        let outcome = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await;

        match outcome {
            ConvergenceOutcome::NotYetConverged {
                last_observed,
                last_error,
                ..
            } => {
                assert!(last_observed.is_some());
                assert!(matches!(last_error, Some(FetchError::Transient(_))));
            }
            other => panic!("expected NotYetConverged, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_visible_reports_not_found() {
        let fetcher = Scripted::new(vec![Step::Missing]);
        let poller = Poller::new(policy(3));

        let outcome = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await;

        assert!(matches!(outcome, ConvergenceOutcome::NotFound { attempts: 3 }));
        let err = outcome.into_result("7").unwrap_err();
        assert!(matches!(err, ReconcileError::TransientNotFound { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_converges_on_absence() {
        let fetcher = Scripted::new(vec![
            Step::Found(stale()),
            Step::Found(stale()),
            Step::Missing,
        ]);
        let poller = Poller::new(policy(5));

        let outcome = poller
            .poll_until_converged(&AttributeMap::new(), &fetcher, "7", predicates::absent)
            .await;

        match outcome {
            ConvergenceOutcome::Converged {
                observation,
                attempts,
            } => {
                assert!(observation.is_absent());
                assert_eq!(attempts, 3);
            }
            other => panic!("expected convergence, got {:?}", other),
        }
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_classifier_treats_not_found_as_final() {
        let fetcher = Scripted::new(vec![Step::Found(stale()), Step::Missing]);
        let poller =
            Poller::new(policy(5)).with_classifier(|e| matches!(e, FetchError::Transient(_)));

        let outcome = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await;

        assert!(matches!(outcome, ConvergenceOutcome::NotFound { attempts: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_narrow_predicate() {
        let observed = AttributeMap::new().with("name", "renamed").with("active", true);
        let fetcher = Scripted::new(vec![Step::Found(observed)]);
        let poller = Poller::new(policy(3));

        let outcome = poller
            .poll_until_converged(
                &desired(),
                &fetcher,
                "7",
                predicates::attribute_matches("active"),
            )
            .await;

        assert!(outcome.is_converged());
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted_maps_to_error() {
        let fetcher = Scripted::new(vec![Step::Found(stale())]);
        let poller = Poller::new(policy(2));

        let err = poller
            .poll_until_converged(&desired(), &fetcher, "7", predicates::equivalent_to_desired)
            .await
            .into_result("7")
            .unwrap_err();

        match err {
            ReconcileError::RetryBudgetExhausted {
                attempts,
                last_observed,
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(last_observed.unwrap().id, "7");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
