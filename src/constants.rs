//! System-wide constants for deployment orchestration.
//!
//! Event names, status groupings, and default tuning values live here so the
//! engine, the event publisher, and external consumers agree on the same
//! identifiers.

use crate::models::{DeploymentStatus, ResourceState};

/// Lifecycle event names published on the event channel.
pub mod events {
    /// A deployment request was accepted and persisted.
    pub const DEPLOYMENT_REQUESTED: &str = "deployment.requested";
    /// A candidate provider was selected for the current attempt.
    pub const CANDIDATE_SELECTED: &str = "deployment.candidate_selected";
    /// The ranked candidate list ran out before any provider succeeded.
    pub const CANDIDATES_EXHAUSTED: &str = "deployment.candidates_exhausted";
    /// The backend accepted a submission (whole template or a single job).
    pub const SUBMISSION_ACCEPTED: &str = "deployment.submission_accepted";
    /// The backend permanently rejected a submission.
    pub const SUBMISSION_REJECTED: &str = "deployment.submission_rejected";
    /// The current provider attempt was abandoned after a retryable failure.
    pub const ATTEMPT_ABANDONED: &str = "deployment.attempt_abandoned";
    /// The backend reported the deployment finished successfully.
    pub const BACKEND_SUCCEEDED: &str = "deployment.backend_succeeded";
    /// The backend reported the deployment failed.
    pub const BACKEND_FAILED: &str = "deployment.backend_failed";
    /// The deployment reached its success terminal state.
    pub const DEPLOYMENT_COMPLETED: &str = "deployment.completed";
    /// The deployment reached its failure terminal state.
    pub const DEPLOYMENT_FAILED: &str = "deployment.failed";
    /// An external cancel request was recorded on an active deployment.
    pub const CANCEL_REQUESTED: &str = "deployment.cancel_requested";
    /// The deployment was cancelled by an external request.
    pub const DEPLOYMENT_CANCELLED: &str = "deployment.cancelled";
    /// A step lost the optimistic-version race and deferred to the winner.
    pub const STEP_DEFERRED: &str = "deployment.step_deferred";
}

/// Default tuning values; overridable via [`crate::config::OrchestratorConfig`].
pub mod system {
    /// Failed completion-predicate evaluations tolerated per attempt.
    pub const DEFAULT_POLL_RETRY_BUDGET: u32 = 1;

    /// Wall-clock budget for a single provider attempt to complete.
    pub const DEFAULT_POLL_TIMEOUT_SECS: i64 = 1800;

    /// Delay the in-process driver sleeps between poll re-invocations.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

    /// Upper bound on step invocations in one in-process driver run.
    pub const DEFAULT_MAX_ENGINE_STEPS: u32 = 250;

    /// Broadcast channel capacity for the event publisher.
    pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

    /// Environment assumed when no environment variable is set.
    pub const DEFAULT_ENVIRONMENT: &str = "development";
}

/// Status groupings used by reporting and reconciliation code.
pub mod status_groups {
    use super::{DeploymentStatus, ResourceState};

    /// Deployment statuses from which no further transitions happen.
    pub const TERMINAL_DEPLOYMENT_STATUSES: &[DeploymentStatus] = &[
        DeploymentStatus::Complete,
        DeploymentStatus::Failed,
        DeploymentStatus::Cancelled,
    ];

    /// Deployment statuses that still have orchestration work pending.
    pub const ACTIVE_DEPLOYMENT_STATUSES: &[DeploymentStatus] =
        &[DeploymentStatus::Pending, DeploymentStatus::InProgress];

    /// Resource states that indicate the backend holds live infrastructure.
    pub const LIVE_RESOURCE_STATES: &[ResourceState] =
        &[ResourceState::Creating, ResourceState::Started];
}
