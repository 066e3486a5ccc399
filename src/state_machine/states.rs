use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestration phases a deployment moves through.
///
/// The phase is persisted on the deployment record as its ownership marker:
/// a step invocation whose named phase no longer matches the record defers
/// instead of acting on stale state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    /// Rank providers (first entry) or advance to the next candidate
    SelectCandidate,
    /// Hand work to the bound provider's backend
    Submit,
    /// Watch the backend for completion, one poll per invocation
    Poll,
    /// Reconcile resources and status after backend success
    FinalizeSuccess,
    /// Reconcile resources and status after failure or cancellation
    FinalizeFailure,
}

impl DeploymentPhase {
    /// Check if this phase finalizes the deployment (no phase follows it)
    pub fn is_finalizing(&self) -> bool {
        matches!(self, Self::FinalizeSuccess | Self::FinalizeFailure)
    }

    /// Check if this phase still has provider work in flight
    pub fn is_active(&self) -> bool {
        matches!(self, Self::SelectCandidate | Self::Submit | Self::Poll)
    }
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectCandidate => write!(f, "select_candidate"),
            Self::Submit => write!(f, "submit"),
            Self::Poll => write!(f, "poll"),
            Self::FinalizeSuccess => write!(f, "finalize_success"),
            Self::FinalizeFailure => write!(f, "finalize_failure"),
        }
    }
}

impl std::str::FromStr for DeploymentPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "select_candidate" => Ok(Self::SelectCandidate),
            "submit" => Ok(Self::Submit),
            "poll" => Ok(Self::Poll),
            "finalize_success" => Ok(Self::FinalizeSuccess),
            "finalize_failure" => Ok(Self::FinalizeFailure),
            _ => Err(format!("Invalid deployment phase: {s}")),
        }
    }
}

/// Every deployment starts by selecting a candidate
impl Default for DeploymentPhase {
    fn default() -> Self {
        Self::SelectCandidate
    }
}
