use tracing::debug;

use super::errors::{StateMachineError, StateMachineResult};
use super::events::PhaseEvent;
use super::states::DeploymentPhase;
use crate::models::Deployment;

/// Determine the target phase for an event without side effects.
///
/// This table is the whole transition law: handlers produce events, the
/// engine persists whatever this function returns. Illegal pairs error so a
/// buggy handler cannot push a deployment somewhere undefined.
pub fn determine_target_state(
    current: DeploymentPhase,
    event: &PhaseEvent,
) -> StateMachineResult<DeploymentPhase> {
    if current.is_finalizing() {
        return Err(StateMachineError::AlreadyFinalizing {
            phase: current.to_string(),
        });
    }

    let target = match (current, event) {
        // Candidate selection outcomes
        (DeploymentPhase::SelectCandidate, PhaseEvent::CandidateSelected) => {
            DeploymentPhase::Submit
        }
        (DeploymentPhase::SelectCandidate, PhaseEvent::CandidatesExhausted(_)) => {
            DeploymentPhase::FinalizeFailure
        }

        // Submission outcomes; job-graph backends stay in Submit while jobs
        // remain, one submission per invocation
        (
            DeploymentPhase::Submit,
            PhaseEvent::SubmissionAccepted {
                jobs_remaining: true,
            },
        ) => DeploymentPhase::Submit,
        (
            DeploymentPhase::Submit,
            PhaseEvent::SubmissionAccepted {
                jobs_remaining: false,
            },
        ) => DeploymentPhase::Poll,
        (DeploymentPhase::Submit, PhaseEvent::SubmissionRejected(_)) => {
            DeploymentPhase::FinalizeFailure
        }
        (DeploymentPhase::Submit, PhaseEvent::SubmissionFaulted(_)) => {
            DeploymentPhase::SelectCandidate
        }

        // Polling outcomes
        (DeploymentPhase::Poll, PhaseEvent::BackendStillRunning) => DeploymentPhase::Poll,
        (DeploymentPhase::Poll, PhaseEvent::BackendSucceeded) => DeploymentPhase::FinalizeSuccess,
        (DeploymentPhase::Poll, PhaseEvent::BackendFailed(_)) => DeploymentPhase::FinalizeFailure,
        (DeploymentPhase::Poll, PhaseEvent::AttemptAbandoned(_)) => {
            DeploymentPhase::SelectCandidate
        }

        // Cancellation ends any active phase as failure
        (phase, PhaseEvent::CancelRequested(_)) if phase.is_active() => {
            DeploymentPhase::FinalizeFailure
        }

        // Invalid transitions
        (from, event) => {
            return Err(StateMachineError::InvalidTransition {
                from: from.to_string(),
                to: event.event_type().to_string(),
            })
        }
    };

    Ok(target)
}

/// Apply an event to a deployment record, updating its phase marker.
///
/// Pure bookkeeping: persistence and side effects stay with the caller.
pub fn transition(
    deployment: &mut Deployment,
    event: &PhaseEvent,
) -> StateMachineResult<DeploymentPhase> {
    let target = determine_target_state(deployment.phase, event)?;
    debug!(
        deployment_id = %deployment.deployment_id,
        from = %deployment.phase,
        to = %target,
        event = event.event_type(),
        "phase transition"
    );
    deployment.phase = target;
    Ok(target)
}
