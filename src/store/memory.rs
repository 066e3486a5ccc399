//! In-memory store used by tests and the in-process driver loop.
//!
//! Version-guard semantics are identical to what a database-backed store
//! must provide, so lifecycle tests exercise the real conflict paths.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{Deployment, NewDeployment, NewResource, Resource};

use super::{DeploymentStore, StoreError};

/// DashMap-backed [`DeploymentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    deployments: DashMap<Uuid, Deployment>,
    resources: DashMap<Uuid, Vec<Resource>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deployments held.
    pub fn deployment_count(&self) -> usize {
        self.deployments.len()
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn create_deployment(
        &self,
        new: NewDeployment,
        resources: Vec<NewResource>,
    ) -> Result<Deployment, StoreError> {
        let deployment = new.into_deployment();
        let rows: Vec<Resource> = resources
            .into_iter()
            .map(|resource| resource.into_resource(deployment.deployment_id))
            .collect();

        self.resources.insert(deployment.deployment_id, rows);
        self.deployments
            .insert(deployment.deployment_id, deployment.clone());
        Ok(deployment)
    }

    async fn load_deployment(&self, deployment_id: Uuid) -> Result<Deployment, StoreError> {
        self.deployments
            .get(&deployment_id)
            .map(|entry| entry.clone())
            .ok_or(StoreError::DeploymentNotFound { deployment_id })
    }

    async fn save_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let mut entry = self.deployments.get_mut(&deployment.deployment_id).ok_or(
            StoreError::DeploymentNotFound {
                deployment_id: deployment.deployment_id,
            },
        )?;

        if entry.version != deployment.version {
            return Err(StoreError::VersionConflict {
                deployment_id: deployment.deployment_id,
                expected: deployment.version,
                actual: entry.version,
            });
        }

        let mut saved = deployment.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();
        *entry = saved.clone();
        Ok(saved)
    }

    async fn resources_for_deployment(
        &self,
        deployment_id: Uuid,
    ) -> Result<Vec<Resource>, StoreError> {
        Ok(self
            .resources
            .get(&deployment_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn find_resources_by_node(
        &self,
        deployment_id: Uuid,
        node_name: &str,
    ) -> Result<Vec<Resource>, StoreError> {
        Ok(self
            .resources
            .get(&deployment_id)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|resource| resource.node_name == node_name)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn save_resource(&self, resource: &Resource) -> Result<Resource, StoreError> {
        let mut rows = self.resources.get_mut(&resource.deployment_id).ok_or(
            StoreError::DeploymentNotFound {
                deployment_id: resource.deployment_id,
            },
        )?;

        let Some(row) = rows
            .iter_mut()
            .find(|row| row.resource_id == resource.resource_id)
        else {
            return Err(StoreError::ResourceNotFound {
                resource_id: resource.resource_id,
            });
        };

        let mut saved = resource.clone();
        saved.updated_at = Utc::now();
        *row = saved.clone();
        Ok(saved)
    }
}
