//! Bounded retry around [`observation::build`] for pages that navigate
//! underneath a snapshot.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::PageError;
use crate::observation;
use crate::page::Page;
use crate::types::{LOAD_WAIT_TIMEOUT, MAX_OBSERVATION_ATTEMPTS, Observation, RECOVERY_SETTLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub load_timeout: Duration,
    pub settle: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_OBSERVATION_ATTEMPTS,
            load_timeout: LOAD_WAIT_TIMEOUT,
            settle: RECOVERY_SETTLE,
        }
    }
}

/// States of one recovery run. `attempt` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Attempting { attempt: u32 },
    WaitingForLoad { attempt: u32 },
    Settling { attempt: u32 },
    Exhausted,
}

impl Phase {
    pub const START: Phase = Phase::Attempting { attempt: 0 };

    /// Transition taken after an attempt hit a destroyed context.
    pub fn on_context_destroyed(self) -> Phase {
        match self {
            Phase::Attempting { attempt } => Phase::WaitingForLoad { attempt },
            other => other,
        }
    }

    /// Transition taken once the current wait has finished.
    pub fn on_wait_finished(self, policy: &RetryPolicy) -> Phase {
        match self {
            Phase::WaitingForLoad { attempt } => Phase::Settling { attempt },
            Phase::Settling { attempt } if attempt + 1 < policy.max_attempts => {
                Phase::Attempting {
                    attempt: attempt + 1,
                }
            }
            Phase::Settling { .. } => Phase::Exhausted,
            other => other,
        }
    }
}

/// Builds an observation, retrying while navigation keeps destroying the
/// execution context. Exhausting the policy yields a degraded observation
/// rather than an error; any other failure propagates untouched.
pub fn build_with_recovery(page: &dyn Page, policy: &RetryPolicy) -> Result<Observation, PageError> {
    let mut phase = Phase::START;
    loop {
        phase = match phase {
            Phase::Attempting { attempt } => match observation::build(page) {
                Ok(observation) => return Ok(observation),
                Err(PageError::ContextDestroyed(reason)) => {
                    debug!(attempt, %reason, "snapshot raced a navigation");
                    phase.on_context_destroyed()
                }
                Err(err) => return Err(err),
            },
            Phase::WaitingForLoad { .. } => {
                if let Err(err) = page.wait_for_dom_content_loaded(policy.load_timeout) {
                    debug!(error = %err, "ignoring load wait failure");
                }
                phase.on_wait_finished(policy)
            }
            Phase::Settling { .. } => {
                page.pause(policy.settle);
                phase.on_wait_finished(policy)
            }
            Phase::Exhausted => {
                let url = page.current_url();
                warn!(%url, attempts = policy.max_attempts, "page never settled; returning degraded observation");
                return Ok(Observation::degraded(url));
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_every_phase_before_giving_up() {
        let policy = RetryPolicy::default();
        let mut phase = Phase::START;
        let mut trace = vec![phase];
        while phase != Phase::Exhausted {
            phase = match phase {
                Phase::Attempting { .. } => phase.on_context_destroyed(),
                _ => phase.on_wait_finished(&policy),
            };
            trace.push(phase);
        }

        assert_eq!(
            trace,
            vec![
                Phase::Attempting { attempt: 0 },
                Phase::WaitingForLoad { attempt: 0 },
                Phase::Settling { attempt: 0 },
                Phase::Attempting { attempt: 1 },
                Phase::WaitingForLoad { attempt: 1 },
                Phase::Settling { attempt: 1 },
                Phase::Attempting { attempt: 2 },
                Phase::WaitingForLoad { attempt: 2 },
                Phase::Settling { attempt: 2 },
                Phase::Exhausted,
            ]
        );
    }

    #[test]
    fn single_attempt_policy_exhausts_immediately() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let phase = Phase::START
            .on_context_destroyed()
            .on_wait_finished(&policy)
            .on_wait_finished(&policy);
        assert_eq!(phase, Phase::Exhausted);
    }

    #[test]
    fn default_policy_matches_worker_constants() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.load_timeout, Duration::from_millis(5000));
        assert_eq!(policy.settle, Duration::from_millis(250));
    }
}
