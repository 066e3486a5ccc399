//! # Finalization Steps
//!
//! Settles a deployment's terminal outcome with the backend and the store.
//!
//! Success finalization must eventually happen exactly-once in effect: the
//! adapter contract requires `finalize` to be idempotent, so a retryable
//! settle error here surfaces as a step error and the substrate simply runs
//! the step again. Failure finalization is best-effort all the way down; the
//! record always reaches a terminal status with a non-empty reason even when
//! the backend is unreachable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{Deployment, DeploymentStatus, ResourceState};
use crate::orchestration::errors::{OrchestrationError, OrchestrationResult};
use crate::orchestration::phase_data::PhaseData;
use crate::providers::AdapterRegistry;
use crate::store::DeploymentStore;

/// Which terminal outcome finalization applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizationAction {
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for FinalizationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What finalization did, for events and driver results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizationSummary {
    pub deployment_id: Uuid,
    pub action: FinalizationAction,
    /// Non-empty for every failure outcome
    pub reason: Option<String>,
    /// Resources promoted to started
    pub resources_started: usize,
    /// Resources marked errored
    pub resources_errored: usize,
    pub finalized_at: DateTime<Utc>,
}

pub struct Finalizer {
    store: Arc<dyn DeploymentStore>,
    registry: AdapterRegistry,
}

impl Finalizer {
    pub fn new(store: Arc<dyn DeploymentStore>, registry: AdapterRegistry) -> Self {
        Self { store, registry }
    }

    /// Settle a successful deployment.
    ///
    /// Promotes every resource the backend brought up to `started` and moves
    /// the record to `complete`. A retryable backend settle error propagates
    /// unchanged so the step can re-run; a fatal one is logged and the
    /// deployment still completes, there is nothing left to settle.
    #[instrument(skip_all, fields(deployment_id = %deployment.deployment_id))]
    pub async fn finalize_success(
        &self,
        deployment: &mut Deployment,
    ) -> OrchestrationResult<FinalizationSummary> {
        let Some(provider) = deployment.bound_provider().map(str::to_string) else {
            return Err(OrchestrationError::NoBoundProvider {
                deployment_id: deployment.deployment_id,
                phase: deployment.phase,
            });
        };
        let adapter = self
            .registry
            .resolve(&provider)
            .map_err(|_| OrchestrationError::missing_adapter(&provider))?;

        if let Err(err) = adapter.finalize(deployment, true).await {
            if !err.is_fatal() {
                return Err(OrchestrationError::retryable_backend(
                    &provider,
                    err.reason(),
                ));
            }
            warn!(
                provider = %provider,
                reason = %err.reason(),
                "Backend finalize reported a permanent error, completing anyway"
            );
        }

        let mut resources_started = 0;
        let resources = self
            .store
            .resources_for_deployment(deployment.deployment_id)
            .await?;
        for mut resource in resources {
            if matches!(resource.state, ResourceState::Pending | ResourceState::Creating) {
                resource.state = ResourceState::Started;
                self.store.save_resource(&resource).await?;
                resources_started += 1;
            }
        }

        deployment.status = DeploymentStatus::Complete;
        deployment.status_reason = None;

        info!(provider = %provider, resources_started, "Deployment finalized as complete");
        Ok(FinalizationSummary {
            deployment_id: deployment.deployment_id,
            action: FinalizationAction::Completed,
            reason: None,
            resources_started,
            resources_errored: 0,
            finalized_at: Utc::now(),
        })
    }

    /// Settle a failed or cancelled deployment.
    ///
    /// Backend settlement and resource bookkeeping are best-effort; the
    /// record reaches `failed` (or `cancelled` when a cancel was requested)
    /// with a non-empty reason regardless.
    #[instrument(skip_all, fields(deployment_id = %deployment.deployment_id))]
    pub async fn finalize_failure(
        &self,
        deployment: &mut Deployment,
        data: &PhaseData,
    ) -> OrchestrationResult<FinalizationSummary> {
        let reason = deployment
            .status_reason
            .clone()
            .or_else(|| data.last_failure_reason().map(str::to_string))
            .unwrap_or_else(|| "deployment failed".to_string());

        if let Some(provider) = deployment.bound_provider().map(str::to_string) {
            match self.registry.resolve(&provider) {
                Ok(adapter) => {
                    if let Err(err) = adapter.finalize(deployment, false).await {
                        warn!(
                            provider = %provider,
                            error = %err,
                            "Backend finalize failed during failure settlement, continuing"
                        );
                    }
                }
                Err(_) => {
                    warn!(
                        provider = %provider,
                        "No adapter registered during failure settlement, skipping backend finalize"
                    );
                }
            }
        }

        let mut resources_errored = 0;
        let resources = self
            .store
            .resources_for_deployment(deployment.deployment_id)
            .await?;
        for mut resource in resources {
            if resource.state.is_live() {
                resource.state = ResourceState::Error;
                self.store.save_resource(&resource).await?;
                resources_errored += 1;
            }
        }

        let action = if deployment.cancel_requested {
            FinalizationAction::Cancelled
        } else {
            FinalizationAction::Failed
        };
        deployment.status = match action {
            FinalizationAction::Cancelled => DeploymentStatus::Cancelled,
            _ => DeploymentStatus::Failed,
        };
        deployment.status_reason = Some(reason.clone());

        warn!(
            action = %action,
            reason = %reason,
            resources_errored,
            "Deployment finalized without success"
        );
        Ok(FinalizationSummary {
            deployment_id: deployment.deployment_id,
            action,
            reason: Some(reason),
            resources_started: 0,
            resources_errored,
            finalized_at: Utc::now(),
        })
    }
}
