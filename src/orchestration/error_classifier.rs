//! # Attempt Failure Classification
//!
//! Turns adapter and poll failures into a disposition the engine can act on.
//!
//! ## Overview
//!
//! Every failed provider attempt ends in one of two dispositions:
//!
//! - **Retryable**: abandon this attempt and fall back to the next ranked
//!   candidate (fresh submission, fresh poll budget)
//! - **Fatal**: no candidate can succeed, finalize the deployment as failed
//!
//! The assessment is serializable and rides along in the phase data so the
//! reason for the most recent failure survives process boundaries and can be
//! named when candidates run out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::poller::PollError;
use crate::providers::AdapterError;

/// What the engine should do about a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureDisposition {
    /// Abandon the attempt and try the next ranked candidate
    Retryable,

    /// Stop trying candidates and finalize as failed
    Fatal,
}

/// Where in the attempt the failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Provider rejected or faulted during submission
    Submission,

    /// Backend reported or kept producing errors during completion polling
    Backend,

    /// The attempt's completion deadline passed
    Timeout,
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCategory::Submission => write!(f, "submission"),
            FailureCategory::Backend => write!(f, "backend"),
            FailureCategory::Timeout => write!(f, "timeout"),
        }
    }
}

/// Result of classifying one failed attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureAssessment {
    pub disposition: FailureDisposition,

    pub category: FailureCategory,

    /// Provider whose attempt failed
    pub provider: String,

    /// Human-readable reason, preserved for exhaustion reporting
    pub reason: String,

    pub occurred_at: DateTime<Utc>,
}

impl FailureAssessment {
    pub fn is_fatal(&self) -> bool {
        self.disposition == FailureDisposition::Fatal
    }
}

/// Stateless classification policy for attempt failures
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureClassifier;

impl FailureClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a submission failure reported by a provider adapter.
    pub fn classify_submission(&self, provider: &str, error: &AdapterError) -> FailureAssessment {
        let disposition = if error.is_fatal() {
            FailureDisposition::Fatal
        } else {
            FailureDisposition::Retryable
        };

        FailureAssessment {
            disposition,
            category: FailureCategory::Submission,
            provider: provider.to_string(),
            reason: error.reason().to_string(),
            occurred_at: Utc::now(),
        }
    }

    /// Classify a poll failure.
    ///
    /// Timeouts are retryable at the candidate level unless the adapter
    /// declares its timeouts fatal. An exhausted retry budget always falls
    /// back to the next candidate and carries the evaluator's last error.
    pub fn classify_poll(
        &self,
        provider: &str,
        error: &PollError,
        timeout_is_fatal: bool,
    ) -> FailureAssessment {
        match error {
            PollError::Timeout { deadline } => {
                let disposition = if timeout_is_fatal {
                    FailureDisposition::Fatal
                } else {
                    FailureDisposition::Retryable
                };
                FailureAssessment {
                    disposition,
                    category: FailureCategory::Timeout,
                    provider: provider.to_string(),
                    reason: format!("completion deadline {deadline} passed"),
                    occurred_at: Utc::now(),
                }
            }
            PollError::RetriesExceeded { last_error } => FailureAssessment {
                disposition: FailureDisposition::Retryable,
                category: FailureCategory::Backend,
                provider: provider.to_string(),
                reason: last_error.clone(),
                occurred_at: Utc::now(),
            },
        }
    }

    /// Classify a backend that concluded in failure.
    ///
    /// A conclusive failure is the backend's verdict, not a transient fault:
    /// the deployment finalizes as failed instead of falling back.
    pub fn classify_backend_failure(&self, provider: &str, reason: &str) -> FailureAssessment {
        FailureAssessment {
            disposition: FailureDisposition::Fatal,
            category: FailureCategory::Backend,
            provider: provider.to_string(),
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        }
    }
}
