use serde::{Deserialize, Serialize};

/// Events that drive deployment phase transitions.
///
/// Step handlers produce exactly one event per invocation; the transition
/// table in [`super::machine`] decides where it leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PhaseEvent {
    /// A candidate provider was bound for a fresh attempt
    CandidateSelected,
    /// The ranked list ran out (or was empty); reason for the terminal record
    CandidatesExhausted(String),
    /// The backend accepted a submission; `jobs_remaining` keeps job-graph
    /// deployments in the submit phase until every job is in
    SubmissionAccepted { jobs_remaining: bool },
    /// The backend permanently rejected the submission
    SubmissionRejected(String),
    /// The submission failed retryably; fall back to the next candidate
    SubmissionFaulted(String),
    /// The backend has not concluded yet
    BackendStillRunning,
    /// The backend reported success
    BackendSucceeded,
    /// The backend reported failure, or polling failed fatally
    BackendFailed(String),
    /// Polling failed retryably; fall back to the next candidate
    AttemptAbandoned(String),
    /// An external cancel request ends the deployment as failed
    CancelRequested(String),
}

impl PhaseEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CandidateSelected => "candidate_selected",
            Self::CandidatesExhausted(_) => "candidates_exhausted",
            Self::SubmissionAccepted { .. } => "submission_accepted",
            Self::SubmissionRejected(_) => "submission_rejected",
            Self::SubmissionFaulted(_) => "submission_faulted",
            Self::BackendStillRunning => "backend_still_running",
            Self::BackendSucceeded => "backend_succeeded",
            Self::BackendFailed(_) => "backend_failed",
            Self::AttemptAbandoned(_) => "attempt_abandoned",
            Self::CancelRequested(_) => "cancel_requested",
        }
    }

    /// Extract the failure reason if this event carries one
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::CandidatesExhausted(reason)
            | Self::SubmissionRejected(reason)
            | Self::SubmissionFaulted(reason)
            | Self::BackendFailed(reason)
            | Self::AttemptAbandoned(reason)
            | Self::CancelRequested(reason) => Some(reason),
            _ => None,
        }
    }

    /// Check if this event routes the deployment toward failure finalization
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CandidatesExhausted(_)
                | Self::SubmissionRejected(_)
                | Self::BackendFailed(_)
                | Self::CancelRequested(_)
        )
    }
}
