//! # Candidate Selection Step
//!
//! Builds the ranked candidate list on first entry and binds the next
//! untried provider to the deployment. The list is ranked exactly once per
//! deployment; fallback only advances the cursor, it never re-ranks.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::models::{Deployment, ResourceState};
use crate::orchestration::errors::OrchestrationResult;
use crate::orchestration::phase_data::PhaseData;
use crate::ranking::ProviderRanker;
use crate::state_machine::PhaseEvent;
use crate::store::DeploymentStore;

pub struct CandidateSelector {
    store: Arc<dyn DeploymentStore>,
    ranker: ProviderRanker,
}

impl CandidateSelector {
    pub fn new(store: Arc<dyn DeploymentStore>, ranker: ProviderRanker) -> Self {
        Self { store, ranker }
    }

    /// Bind the next candidate provider, or report exhaustion.
    ///
    /// Binding starts a fresh attempt: the attempt counter advances, any
    /// stale poller is dropped, the job traversal rewinds, and resource
    /// records left over from the previous attempt go back to pending.
    #[instrument(skip_all, fields(deployment_id = %deployment.deployment_id, attempt = data.attempt))]
    pub async fn select(
        &self,
        deployment: &mut Deployment,
        data: &mut PhaseData,
    ) -> OrchestrationResult<PhaseEvent> {
        if data.candidates.is_none() {
            let ranked = self
                .ranker
                .rank_candidates(&deployment.tenant, &deployment.service)
                .await?;
            debug!(count = ranked.len(), "Ranked candidate providers");
            data.candidates = Some(ranked);
        }

        let selected = data
            .candidates
            .as_mut()
            .and_then(|candidates| {
                candidates
                    .next()
                    .map(|candidate| (candidate.provider.clone(), candidate.rank))
            });

        let Some((provider, rank)) = selected else {
            let reason = data
                .last_failure_reason()
                .map(str::to_string)
                .unwrap_or_else(|| {
                    format!(
                        "no eligible providers for tenant {} and service {}",
                        deployment.tenant, deployment.service
                    )
                });
            warn!(reason = %reason, "Candidate providers exhausted");
            return Ok(PhaseEvent::CandidatesExhausted(reason));
        };

        data.attempt += 1;
        data.poller = None;
        if let Some(graph) = data.job_graph.as_mut() {
            graph.reset();
        }

        deployment.provider = Some(provider.clone());
        deployment.backend_ref = None;

        self.reset_attempt_resources(deployment.deployment_id).await?;

        info!(
            provider = %provider,
            rank = rank,
            attempt = data.attempt,
            "Candidate selected"
        );
        Ok(PhaseEvent::CandidateSelected)
    }

    /// Return every resource touched by a previous attempt to pending.
    async fn reset_attempt_resources(&self, deployment_id: Uuid) -> OrchestrationResult<()> {
        let resources = self.store.resources_for_deployment(deployment_id).await?;
        for mut resource in resources {
            if resource.state != ResourceState::Pending {
                resource.state = ResourceState::Pending;
                resource.backend_ref = None;
                self.store.save_resource(&resource).await?;
            }
        }
        Ok(())
    }
}
