//! Deployment model: one unit of work being created, updated, or destroyed
//! on a cloud provider.
//!
//! ## Overview
//!
//! A `Deployment` carries everything the orchestration engine needs between
//! step invocations: the request itself (tenant, service, template,
//! parameters), the externally visible [`DeploymentStatus`], the
//! [`DeploymentPhase`](crate::state_machine::DeploymentPhase) marker naming
//! which orchestration step currently owns the record, the bound provider
//! once a candidate is selected, and the optimistic `version` counter every
//! save verifies and increments.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::state_machine::DeploymentPhase;

/// Externally visible deployment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Accepted and persisted, no orchestration step has run yet
    Pending,
    /// Orchestration steps are running
    InProgress,
    /// Deployment finished successfully
    Complete,
    /// Deployment failed; `status_reason` names why
    Failed,
    /// Deployment was cancelled by an external request
    Cancelled,
}

impl DeploymentStatus {
    /// Check if this is a terminal status (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    /// Check if orchestration is actively working the deployment
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Check if the deployment ended without success
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid deployment status: {s}")),
        }
    }
}

/// Default status for newly accepted deployments
impl Default for DeploymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Persisted deployment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub deployment_id: Uuid,
    /// Human-readable label; the identifier is `deployment_id`
    pub name: String,
    /// Requesting customer; key for SLA preference lookup
    pub tenant: String,
    /// Service kind the template deploys; selects per-service preferences
    /// and catalog eligibility
    pub service: String,
    /// Opaque template text; parsing it is not this crate's concern
    pub template: String,
    /// Input parameter mapping applied by the provider backend
    pub parameters: HashMap<String, Value>,
    pub status: DeploymentStatus,
    /// Which orchestration step currently owns this record
    pub phase: DeploymentPhase,
    /// Provider bound by candidate selection, if any
    pub provider: Option<String>,
    /// Backend descriptor from a whole-template submission (stack id etc.)
    pub backend_ref: Option<Value>,
    /// Set by `cancel()`; routes finalization to the cancelled status
    pub cancel_requested: bool,
    /// Non-empty on every terminal failure
    pub status_reason: Option<String>,
    /// Optimistic concurrency counter; verified and incremented by every save
    pub version: u64,
    pub requested_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Check if the deployment has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Provider bound by candidate selection
    pub fn bound_provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Look up a single input parameter
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}

/// Creation payload for a new deployment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeployment {
    pub name: String,
    pub tenant: String,
    pub service: String,
    pub template: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    /// When the request was received; defaults to now
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
}

impl NewDeployment {
    /// Materialize the persisted record: fresh id, version 1, pending status,
    /// phase at candidate selection.
    pub fn into_deployment(self) -> Deployment {
        let now = Utc::now();
        Deployment {
            deployment_id: Uuid::new_v4(),
            name: self.name,
            tenant: self.tenant,
            service: self.service,
            template: self.template,
            parameters: self.parameters,
            status: DeploymentStatus::default(),
            phase: DeploymentPhase::default(),
            provider: None,
            backend_ref: None,
            cancel_requested: false,
            status_reason: None,
            version: 1,
            requested_at: self.requested_at.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }
}
