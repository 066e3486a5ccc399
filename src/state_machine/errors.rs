use thiserror::Error;

/// Errors raised by phase transition handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    /// The event is not legal from the current phase.
    #[error("invalid phase transition from '{from}' on event '{to}'")]
    InvalidTransition { from: String, to: String },

    /// The deployment is already finalizing; no event applies.
    #[error("deployment is already in finalizing phase '{phase}'")]
    AlreadyFinalizing { phase: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
