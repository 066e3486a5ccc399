//! Resource model: one node of a deployment template.
//!
//! Resources carry the dependency edges (`requires`) the job-graph orderer
//! is built from, plus the per-node state the backend drives: `pending →
//! creating → started` on the way up, `error` when an attempt fails, and
//! `deleting → removed` on teardown.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle state of one template node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Not yet handed to a backend
    Pending,
    /// Submitted; the backend is bringing it up
    Creating,
    /// Live on the backend
    Started,
    /// The attempt that owned it failed
    Error,
    /// Teardown requested
    Deleting,
    /// Gone from the backend
    Removed,
}

impl ResourceState {
    /// Check if the backend may be holding live infrastructure for this node
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Creating | Self::Started)
    }

    /// Check if this state records a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Check if this is a terminal state for teardown purposes
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Removed)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Creating => write!(f, "creating"),
            Self::Started => write!(f, "started"),
            Self::Error => write!(f, "error"),
            Self::Deleting => write!(f, "deleting"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

impl std::str::FromStr for ResourceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "creating" => Ok(Self::Creating),
            "started" => Ok(Self::Started),
            "error" => Ok(Self::Error),
            "deleting" => Ok(Self::Deleting),
            "removed" => Ok(Self::Removed),
            _ => Err(format!("Invalid resource state: {s}")),
        }
    }
}

/// Default state for freshly persisted resources
impl Default for ResourceState {
    fn default() -> Self {
        Self::Pending
    }
}

/// Persisted template node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: Uuid,
    pub deployment_id: Uuid,
    /// Unique within the deployment; vertex id in the job graph
    pub node_name: String,
    /// Opaque kind tag from the template
    pub node_type: String,
    /// Node names this resource depends on; must be acyclic per deployment
    pub requires: Vec<String>,
    pub state: ResourceState,
    /// Backend job/stack descriptor recorded at submission
    pub backend_ref: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Check if this resource has no dependencies
    pub fn is_root(&self) -> bool {
        self.requires.is_empty()
    }
}

/// Creation payload for a template node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResource {
    pub node_name: String,
    pub node_type: String,
    #[serde(default)]
    pub requires: Vec<String>,
}

impl NewResource {
    /// Materialize the persisted row for the given deployment.
    pub fn into_resource(self, deployment_id: Uuid) -> Resource {
        let now = Utc::now();
        Resource {
            resource_id: Uuid::new_v4(),
            deployment_id,
            node_name: self.node_name,
            node_type: self.node_type,
            requires: self.requires,
            state: ResourceState::default(),
            backend_ref: None,
            created_at: now,
            updated_at: now,
        }
    }
}
