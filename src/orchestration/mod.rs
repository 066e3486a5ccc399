//! # Deployment Orchestration
//!
//! Step-driven orchestration core for multi-provider deployment coordination.
//!
//! ## Architecture
//!
//! The engine follows an **externally driven architecture** where:
//! - **The engine decides**: Each invocation performs one step and returns a
//!   scheduling signal plus serialized phase data
//! - **The substrate drives**: Queue workers, schedulers, or the bundled
//!   in-process driver re-invoke the engine with the data it handed back
//! - **The store arbitrates**: Optimistic versioning decides who owns a
//!   record when invocations race
//!
//! ## Core Components
//!
//! - **DeploymentEngine**: Entry point that executes steps, accepts requests, and records cancels
//! - **CandidateSelector**: Binds the next ranked provider or reports exhaustion
//! - **Submitter**: Hands templates or dependency-ordered jobs to the bound adapter
//! - **CompletionWatcher**: Polls the backend under a deadline and retry budget
//! - **Finalizer**: Settles terminal outcomes and reconciles resource records
//! - **FailureClassifier**: Maps adapter and poll errors to retry-or-fail dispositions
//! - **PhaseData**: The serialized state that travels between invocations

pub mod candidate_selector;
pub mod completion_watcher;
pub mod engine;
pub mod error_classifier;
pub mod errors;
pub mod finalizer;
pub mod phase_data;
pub mod submitter;

// Re-export core types and components for easy access
pub use candidate_selector::CandidateSelector;
pub use completion_watcher::CompletionWatcher;
pub use engine::{DeploymentEngine, StepOutcome, StepRequest, StepSignal};
pub use error_classifier::{
    FailureAssessment, FailureCategory, FailureClassifier, FailureDisposition,
};
pub use errors::{OrchestrationError, OrchestrationResult};
pub use finalizer::{FinalizationAction, FinalizationSummary, Finalizer};
pub use phase_data::{CompletionCondition, PhaseData};
pub use submitter::Submitter;
