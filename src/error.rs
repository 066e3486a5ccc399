//! Crate-wide error type.
//!
//! Module-level errors stay precise (`GraphError`, `PollError`, `StoreError`,
//! ...); this enum is the converged type for callers that drive the whole
//! engine and only need one `?` chain.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StratusError {
    #[error(transparent)]
    StateMachine(#[from] crate::state_machine::StateMachineError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error(transparent)]
    Source(#[from] crate::ranking::SourceError),

    #[error(transparent)]
    Adapter(#[from] crate::providers::AdapterError),

    #[error(transparent)]
    Registry(#[from] crate::providers::RegistryError),

    #[error(transparent)]
    Orchestration(#[from] crate::orchestration::OrchestrationError),

    #[error(transparent)]
    Graph(#[from] crate::graph::GraphError),

    #[error(transparent)]
    Poll(#[from] crate::poller::PollError),

    #[error(transparent)]
    Event(#[from] crate::events::PublishError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, StratusError>;
