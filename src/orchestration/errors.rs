//! # Orchestration Error Types
//!
//! Structured errors for the deployment engine using thiserror instead of
//! `Box<dyn Error>` patterns. Step handlers surface these; the engine decides
//! whether each one aborts the attempt, the candidate, or the deployment.

use thiserror::Error;
use uuid::Uuid;

use crate::state_machine::DeploymentPhase;

#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Backend failure on provider {provider}: {reason}")]
    RetryableBackend { provider: String, reason: String },

    #[error("No adapter registered for provider {provider}")]
    MissingAdapter { provider: String },

    #[error("Deployment {deployment_id} reached phase {phase} without a bound provider")]
    NoBoundProvider {
        deployment_id: Uuid,
        phase: DeploymentPhase,
    },

    #[error("Resource node {node} is not part of deployment {deployment_id}")]
    UnknownResourceNode { deployment_id: Uuid, node: String },

    #[error("Deployment {deployment_id} exceeded the step budget of {steps} invocations")]
    StepBudgetExhausted { deployment_id: Uuid, steps: u32 },

    #[error("Phase data error: {0}")]
    PhaseData(#[from] serde_json::Error),

    #[error(transparent)]
    Poll(#[from] crate::poller::PollError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error(transparent)]
    Source(#[from] crate::ranking::SourceError),

    #[error(transparent)]
    StateMachine(#[from] crate::state_machine::StateMachineError),

    #[error(transparent)]
    Graph(#[from] crate::graph::GraphError),
}

impl OrchestrationError {
    pub fn retryable_backend(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RetryableBackend {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_adapter(provider: impl Into<String>) -> Self {
        Self::MissingAdapter {
            provider: provider.into(),
        }
    }
}

pub type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;
