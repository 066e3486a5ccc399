// State machine module for deployment lifecycle management
//
// Phase legality is a pure transition table over (phase, event) pairs; the
// orchestration engine owns persistence and side effects. Keeping the law
// separate from the effects is what lets any process resume a deployment
// from its serialized record.

pub mod errors;
pub mod events;
pub mod machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::PhaseEvent;
pub use machine::{determine_target_state, transition};
pub use states::DeploymentPhase;
