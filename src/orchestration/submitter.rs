//! # Submission Step
//!
//! Hands the deployment's work to the bound provider's backend.
//!
//! Infrastructure backends take the whole template in one call and the
//! deployment moves straight to completion polling. Job-graph backends take
//! one job per engine invocation in dependency order; the step reports
//! whether jobs remain so the state machine can loop back into submit.
//! Submission failures are classified: fatal ones finalize the deployment,
//! retryable ones abandon the attempt so selection can fall back.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::graph::JobGraph;
use crate::models::{Deployment, ResourceState};
use crate::orchestration::error_classifier::{FailureClassifier, FailureDisposition};
use crate::orchestration::errors::{OrchestrationError, OrchestrationResult};
use crate::orchestration::phase_data::PhaseData;
use crate::providers::{AdapterError, AdapterRegistry, BackendKind, DeploymentUnit, ProviderAdapter};
use crate::state_machine::PhaseEvent;
use crate::store::DeploymentStore;

pub struct Submitter {
    store: Arc<dyn DeploymentStore>,
    registry: AdapterRegistry,
    classifier: FailureClassifier,
}

impl Submitter {
    pub fn new(store: Arc<dyn DeploymentStore>, registry: AdapterRegistry) -> Self {
        Self {
            store,
            registry,
            classifier: FailureClassifier::new(),
        }
    }

    /// Submit the next unit of work to the bound provider.
    #[instrument(skip_all, fields(deployment_id = %deployment.deployment_id))]
    pub async fn submit(
        &self,
        deployment: &mut Deployment,
        data: &mut PhaseData,
    ) -> OrchestrationResult<PhaseEvent> {
        let Some(provider) = deployment.bound_provider().map(str::to_string) else {
            return Err(OrchestrationError::NoBoundProvider {
                deployment_id: deployment.deployment_id,
                phase: deployment.phase,
            });
        };

        let adapter = match self.registry.resolve(&provider) {
            Ok(adapter) => adapter,
            Err(err) => {
                // The catalog offered this provider but nothing can serve it.
                let reason = err.to_string();
                warn!(provider = %provider, "No adapter registered, rejecting submission");
                data.record_failure(
                    self.classifier
                        .classify_submission(&provider, &AdapterError::fatal(reason.clone())),
                );
                return Ok(PhaseEvent::SubmissionRejected(reason));
            }
        };

        match adapter.backend_kind() {
            BackendKind::Infrastructure => {
                self.submit_template(deployment, data, adapter.as_ref(), &provider)
                    .await
            }
            BackendKind::JobGraph => {
                self.submit_next_job(deployment, data, adapter.as_ref(), &provider)
                    .await
            }
        }
    }

    /// Whole-template submission for infrastructure backends.
    async fn submit_template(
        &self,
        deployment: &mut Deployment,
        data: &mut PhaseData,
        adapter: &dyn ProviderAdapter,
        provider: &str,
    ) -> OrchestrationResult<PhaseEvent> {
        match adapter.submit(deployment, &DeploymentUnit::Template).await {
            Ok(ack) => {
                deployment.backend_ref = ack.backend_ref;
                info!(provider = %provider, "Template submission accepted");
                Ok(PhaseEvent::SubmissionAccepted {
                    jobs_remaining: false,
                })
            }
            Err(err) => {
                self.failed_submission(deployment, data, adapter, provider, err)
                    .await
            }
        }
    }

    /// One-job-per-invocation submission for job-graph backends.
    async fn submit_next_job(
        &self,
        deployment: &mut Deployment,
        data: &mut PhaseData,
        adapter: &dyn ProviderAdapter,
        provider: &str,
    ) -> OrchestrationResult<PhaseEvent> {
        if data.job_graph.is_none() {
            let resources = self
                .store
                .resources_for_deployment(deployment.deployment_id)
                .await?;
            match JobGraph::from_resources(&resources) {
                Ok(graph) => {
                    debug!(jobs = graph.len(), "Built job dependency order");
                    data.job_graph = Some(graph);
                }
                Err(err) => {
                    // Malformed dependencies fail on every provider alike.
                    let reason = err.to_string();
                    warn!(provider = %provider, reason = %reason, "Job graph rejected");
                    data.record_failure(
                        self.classifier
                            .classify_submission(provider, &AdapterError::fatal(reason.clone())),
                    );
                    return Ok(PhaseEvent::SubmissionRejected(reason));
                }
            }
        }

        let next_job = data
            .job_graph
            .as_mut()
            .and_then(|graph| graph.next().ok().map(str::to_string));

        let Some(node) = next_job else {
            debug!("Job graph has no pending jobs, moving to completion polling");
            return Ok(PhaseEvent::SubmissionAccepted {
                jobs_remaining: false,
            });
        };
        let jobs_remaining = data.job_graph.as_ref().is_some_and(JobGraph::has_next);

        let mut resource = self
            .store
            .find_resources_by_node(deployment.deployment_id, &node)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OrchestrationError::UnknownResourceNode {
                deployment_id: deployment.deployment_id,
                node: node.clone(),
            })?;

        match adapter
            .submit(deployment, &DeploymentUnit::Job(resource.clone()))
            .await
        {
            Ok(ack) => {
                resource.state = ResourceState::Creating;
                resource.backend_ref = ack.backend_ref;
                self.store.save_resource(&resource).await?;
                info!(provider = %provider, node = %node, jobs_remaining, "Job submission accepted");
                Ok(PhaseEvent::SubmissionAccepted { jobs_remaining })
            }
            Err(err) => {
                self.failed_submission(deployment, data, adapter, provider, err)
                    .await
            }
        }
    }

    /// Classify a submit failure and emit the matching event.
    ///
    /// Retryable faults get best-effort backend cleanup before the attempt is
    /// abandoned; fatal rejections go straight to failure finalization.
    async fn failed_submission(
        &self,
        deployment: &Deployment,
        data: &mut PhaseData,
        adapter: &dyn ProviderAdapter,
        provider: &str,
        error: AdapterError,
    ) -> OrchestrationResult<PhaseEvent> {
        let assessment = self.classifier.classify_submission(provider, &error);
        warn!(
            provider = %provider,
            reason = %assessment.reason,
            disposition = ?assessment.disposition,
            "Submission failed"
        );

        let reason = error.reason().to_string();
        if assessment.disposition == FailureDisposition::Fatal {
            data.record_failure(assessment);
            return Ok(PhaseEvent::SubmissionRejected(reason));
        }

        if let Err(cleanup_err) = adapter.cleanup_failed_attempt(deployment).await {
            warn!(
                provider = %provider,
                error = %cleanup_err,
                "Cleanup of failed attempt reported an error, continuing"
            );
        }
        data.record_failure(assessment);
        Ok(PhaseEvent::SubmissionFaulted(reason))
    }
}
