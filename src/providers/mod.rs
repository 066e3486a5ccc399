//! Provider adapter contract.
//!
//! One [`ProviderAdapter`] implementation exists per backend kind: an
//! infrastructure backend accepts the whole template in one submission, a
//! job-graph backend accepts individual jobs in dependency order. The engine
//! only ever talks to backends through this trait, so tests drive full
//! lifecycles with scripted adapters and no real cloud anywhere.

pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Deployment, Resource};

pub use registry::{AdapterRegistry, RegistryError};

/// How a provider's backend accepts work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Whole-template submission (declarative stack)
    Infrastructure,
    /// Per-job submission in dependency order
    JobGraph,
}

/// What one `submit` call hands to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeploymentUnit {
    /// The deployment's entire template
    Template,
    /// A single job node from the dependency graph
    Job(Resource),
}

/// Backend acknowledgement of an accepted submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitAck {
    /// Backend descriptor (stack id, job handle) recorded on the record
    pub backend_ref: Option<Value>,
}

impl SubmitAck {
    pub fn with_backend_ref(backend_ref: Value) -> Self {
        Self {
            backend_ref: Some(backend_ref),
        }
    }
}

/// Backend's answer to "is this deployment done?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Still working
    InProgress,
    /// Finished successfully
    Succeeded,
    /// Finished in failure; `reason` feeds the terminal record
    Failed { reason: String },
}

impl CompletionStatus {
    pub fn is_concluded(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Adapter failures, pre-classified by the adapter itself.
///
/// `Fatal` means the backend will never accept this work (malformed
/// template, quota denial, failed auth): no fallback, the deployment fails.
/// `Retryable` means a transient fault: the engine abandons the attempt and
/// falls back to the next candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("backend permanently rejected the request: {reason}")]
    Fatal { reason: String },

    #[error("transient backend error: {reason}")]
    Retryable { reason: String },
}

impl AdapterError {
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal {
            reason: reason.into(),
        }
    }

    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable {
            reason: reason.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Fatal { reason } | Self::Retryable { reason } => reason,
        }
    }
}

/// Contract between the engine and one provider's backend.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name this adapter serves; the registry key.
    fn name(&self) -> &str;

    /// How this backend accepts work.
    fn backend_kind(&self) -> BackendKind;

    /// Hand work to the backend: the whole template for infrastructure
    /// backends, one job per call for job-graph backends.
    async fn submit(
        &self,
        deployment: &Deployment,
        unit: &DeploymentUnit,
    ) -> Result<SubmitAck, AdapterError>;

    /// Ask the backend whether the deployment concluded.
    ///
    /// Errors from this call are treated as transient and charge the poll
    /// retry budget; a backend that knows the deployment can never finish
    /// reports [`CompletionStatus::Failed`] instead.
    async fn is_complete(&self, deployment: &Deployment)
        -> Result<CompletionStatus, AdapterError>;

    /// Settle the terminal outcome with the backend.
    ///
    /// Must be idempotent: the engine may re-run finalization after a crash
    /// or a deferred save.
    async fn finalize(&self, deployment: &Deployment, success: bool) -> Result<(), AdapterError>;

    /// Best-effort teardown of a failed attempt before fallback.
    ///
    /// Errors are logged by the engine and never escalate.
    async fn cleanup_failed_attempt(&self, deployment: &Deployment) -> Result<(), AdapterError>;

    /// Whether a poll timeout means "this will never succeed" on this
    /// backend. Defaults to retryable timeouts.
    fn timeout_is_fatal(&self, _deployment: &Deployment) -> bool {
        false
    }
}

impl std::fmt::Debug for dyn ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ProviderAdapter {{ name: {}, backend_kind: {:?} }}",
            self.name(),
            self.backend_kind()
        )
    }
}
