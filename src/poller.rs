//! Serializable completion polling.
//!
//! A [`Poller`] tracks everything one backend wait needs across process
//! boundaries: the condition being watched, an absolute deadline, a retry
//! budget for failed condition evaluations, and the last error observed. The
//! executable side lives in a [`ConditionEvaluator`] that callers rebuild on
//! every invocation from the serialized condition, so the poller itself stays
//! plain data.
//!
//! Each [`Poller::do_poll_event`] call performs exactly one evaluation: the
//! caller decides when the next one happens. Deadlines are absolute wall-clock
//! instants, which means a poller deserialized hours later times out exactly
//! when the original would have.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::system::DEFAULT_POLL_RETRY_BUDGET;

/// A failed condition evaluation, charged against the poller's retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvaluationError {
    message: String,
}

impl EvaluationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Terminal polling failures.
///
/// `Timeout` and `RetriesExceeded` are deliberately distinct variants:
/// adapters may declare timeouts fatal for a given deployment while budget
/// exhaustion stays retryable, so callers must be able to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// The absolute deadline passed before the condition concluded.
    #[error("condition did not conclude before deadline {deadline}")]
    Timeout { deadline: DateTime<Utc> },

    /// The retry budget ran out; wraps the last evaluation error observed.
    #[error("evaluation retry budget exhausted: {last_error}")]
    RetriesExceeded { last_error: String },
}

/// One observation of the watched condition.
///
/// Carries the evaluator's observation so callers can read backend detail
/// (for example a failure reason) out of a concluded poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<O> {
    /// The condition has not concluded; poll again later.
    NotYet,
    /// The condition concluded, successfully or not.
    Concluded { successful: bool, observation: O },
}

impl<O> PollOutcome<O> {
    pub fn is_concluded(&self) -> bool {
        matches!(self, Self::Concluded { .. })
    }
}

/// Executable side of a poll: rebuilt from the serialized condition at every
/// step, never serialized itself.
#[async_trait]
pub trait ConditionEvaluator<C>: Send + Sync {
    /// What one evaluation of the condition yields.
    type Observation: Send;

    /// Observe the condition once. Errors are transient by definition and
    /// charge the poller's retry budget.
    async fn poll(&self, condition: &C) -> Result<Self::Observation, EvaluationError>;

    /// Whether this observation ends the wait.
    fn exit(&self, condition: &C, observation: &Self::Observation) -> bool;

    /// Whether a concluded wait counts as success.
    fn successful(&self, condition: &C, observation: &Self::Observation) -> bool;
}

/// Serializable deadline-and-budget tracker for one backend wait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poller<C> {
    condition: C,
    deadline: DateTime<Utc>,
    retries_remaining: u32,
    last_error: Option<String>,
}

impl<C> Poller<C> {
    /// Create a poller whose deadline is `timeout` from now.
    ///
    /// The retry budget defaults to 1: a single failed evaluation ends the
    /// attempt.
    pub fn new(condition: C, timeout: Duration) -> Self {
        Self::with_deadline(condition, Utc::now() + timeout)
    }

    /// Create a poller against an explicit absolute deadline.
    pub fn with_deadline(condition: C, deadline: DateTime<Utc>) -> Self {
        Self {
            condition,
            deadline,
            retries_remaining: DEFAULT_POLL_RETRY_BUDGET,
            last_error: None,
        }
    }

    /// Tolerate up to `budget` failed evaluations before giving up.
    ///
    /// A budget below 1 is clamped to 1.
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retries_remaining = budget.max(1);
        self
    }

    pub fn condition(&self) -> &C {
        &self.condition
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn retries_remaining(&self) -> u32 {
        self.retries_remaining
    }

    /// The most recent evaluation error, kept across serialization.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.deadline
    }

    /// Run exactly one evaluation of the condition.
    ///
    /// The deadline is checked first: a poller past its deadline fails with
    /// [`PollError::Timeout`] without invoking the evaluator at all. A failed
    /// evaluation is recorded, charged against the budget, and surfaces as
    /// [`PollError::RetriesExceeded`] once the budget hits zero; until then
    /// it reads as [`PollOutcome::NotYet`].
    pub async fn do_poll_event<E>(
        &mut self,
        evaluator: &E,
    ) -> Result<PollOutcome<E::Observation>, PollError>
    where
        C: Sync,
        E: ConditionEvaluator<C> + ?Sized,
    {
        if self.is_expired() {
            warn!(deadline = %self.deadline, "poll deadline passed before evaluation");
            return Err(PollError::Timeout {
                deadline: self.deadline,
            });
        }

        match evaluator.poll(&self.condition).await {
            Ok(observation) => {
                if evaluator.exit(&self.condition, &observation) {
                    let successful = evaluator.successful(&self.condition, &observation);
                    debug!(successful, "poll condition concluded");
                    Ok(PollOutcome::Concluded {
                        successful,
                        observation,
                    })
                } else {
                    debug!("poll condition not yet satisfied");
                    Ok(PollOutcome::NotYet)
                }
            }
            Err(error) => {
                let message = error.to_string();
                self.retries_remaining = self.retries_remaining.saturating_sub(1);
                self.last_error = Some(message.clone());
                warn!(
                    error = %message,
                    retries_remaining = self.retries_remaining,
                    "condition evaluation failed"
                );
                if self.retries_remaining == 0 {
                    Err(PollError::RetriesExceeded {
                        last_error: message,
                    })
                } else {
                    Ok(PollOutcome::NotYet)
                }
            }
        }
    }
}
