//! # Phase Data
//!
//! The serializable state an engine step consumes and returns.
//!
//! The engine itself keeps nothing between invocations: whatever a step needs
//! on re-entry (ranked candidates and the fallback cursor, the in-flight
//! poller, the job traversal, the most recent failure) must round-trip
//! through this structure as JSON. The execution substrate re-invokes the
//! engine with exactly the value it was handed back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::graph::JobGraph;
use crate::orchestration::error_classifier::FailureAssessment;
use crate::poller::Poller;
use crate::ranking::CandidateList;

/// Identifies what an in-flight poller is waiting on.
///
/// Carries enough to rebuild the completion evaluator after deserialization:
/// the deployment and the provider whose adapter answers `is_complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionCondition {
    pub deployment_id: Uuid,
    pub provider: String,
}

/// Per-deployment engine state, serialized between step invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseData {
    /// Provider attempts consumed so far, including the active one
    pub attempt: u32,

    /// Ranked candidates with the fallback cursor, built once per deployment
    pub candidates: Option<CandidateList>,

    /// Completion poller for the active attempt
    pub poller: Option<Poller<CompletionCondition>>,

    /// Job traversal for graph-backed providers
    pub job_graph: Option<JobGraph>,

    /// Most recent attempt failure, reported on exhaustion
    pub last_failure: Option<FailureAssessment>,
}

impl PhaseData {
    /// Decode phase data from a step payload. `Null` means a fresh start.
    pub fn decode(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
    }

    pub fn encode(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Record a failed attempt, discarding the attempt-scoped poller.
    pub fn record_failure(&mut self, assessment: FailureAssessment) {
        self.poller = None;
        self.last_failure = Some(assessment);
    }

    /// Reason of the most recent failure, for exhaustion reporting.
    pub fn last_failure_reason(&self) -> Option<&str> {
        self.last_failure.as_ref().map(|f| f.reason.as_str())
    }
}
