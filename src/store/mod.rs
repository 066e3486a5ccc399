//! Persistence seam for deployments and resources.
//!
//! The engine never talks to a database directly: it loads, mutates, and
//! saves through [`DeploymentStore`]. Saves are optimistic. Every save
//! verifies the caller's `version` against the stored one and increments it
//! on success; a mismatch surfaces as [`StoreError::VersionConflict`], which
//! the engine treats as "another actor owns this record right now", never as
//! a deployment failure.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Deployment, NewDeployment, NewResource, Resource};

pub use memory::MemoryStore;

/// Errors raised by deployment persistence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("deployment {deployment_id} not found")]
    DeploymentNotFound { deployment_id: Uuid },

    #[error("resource {resource_id} not found")]
    ResourceNotFound { resource_id: Uuid },

    /// The record changed under the caller; reload before retrying.
    #[error(
        "version conflict on deployment {deployment_id}: expected {expected}, stored {actual}"
    )]
    VersionConflict {
        deployment_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Check if this error is the optimistic-concurrency conflict
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// Persistence operations the orchestration engine depends on.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Persist a new deployment and its template resources atomically.
    async fn create_deployment(
        &self,
        new: NewDeployment,
        resources: Vec<NewResource>,
    ) -> Result<Deployment, StoreError>;

    /// Load a deployment by id.
    async fn load_deployment(&self, deployment_id: Uuid) -> Result<Deployment, StoreError>;

    /// Save a deployment under the optimistic version guard.
    ///
    /// The caller's `version` must equal the stored version; on success the
    /// returned record carries the incremented version and a fresh
    /// `updated_at`.
    async fn save_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError>;

    /// All resources belonging to a deployment, in creation order.
    async fn resources_for_deployment(
        &self,
        deployment_id: Uuid,
    ) -> Result<Vec<Resource>, StoreError>;

    /// Resources matching a node name within a deployment.
    async fn find_resources_by_node(
        &self,
        deployment_id: Uuid,
        node_name: &str,
    ) -> Result<Vec<Resource>, StoreError>;

    /// Replace a resource row; `updated_at` is refreshed by the store.
    async fn save_resource(&self, resource: &Resource) -> Result<Resource, StoreError>;
}
