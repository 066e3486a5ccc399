//! # Completion Watching Step
//!
//! One poll of the bound provider's backend per engine invocation.
//!
//! The poller itself is plain data inside the phase data; this step rebuilds
//! the executable side, an [`AdapterCompletionEvaluator`] wrapping the
//! adapter's `is_complete`, from the serialized condition on every entry. A
//! deployment can therefore be polled to completion by a different process
//! than the one that submitted it.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::config::PollConfig;
use crate::models::Deployment;
use crate::orchestration::error_classifier::FailureClassifier;
use crate::orchestration::errors::{OrchestrationError, OrchestrationResult};
use crate::orchestration::phase_data::{CompletionCondition, PhaseData};
use crate::poller::{ConditionEvaluator, EvaluationError, PollOutcome, Poller};
use crate::providers::{AdapterRegistry, CompletionStatus, ProviderAdapter};
use crate::state_machine::PhaseEvent;

/// Evaluates a [`CompletionCondition`] by asking the provider adapter.
struct AdapterCompletionEvaluator<'a> {
    adapter: &'a dyn ProviderAdapter,
    deployment: &'a Deployment,
}

#[async_trait]
impl ConditionEvaluator<CompletionCondition> for AdapterCompletionEvaluator<'_> {
    type Observation = CompletionStatus;

    async fn poll(
        &self,
        _condition: &CompletionCondition,
    ) -> Result<CompletionStatus, EvaluationError> {
        self.adapter
            .is_complete(self.deployment)
            .await
            .map_err(|err| EvaluationError::new(err.reason()))
    }

    fn exit(&self, _condition: &CompletionCondition, observation: &CompletionStatus) -> bool {
        observation.is_concluded()
    }

    fn successful(&self, _condition: &CompletionCondition, observation: &CompletionStatus) -> bool {
        matches!(observation, CompletionStatus::Succeeded)
    }
}

pub struct CompletionWatcher {
    registry: AdapterRegistry,
    classifier: FailureClassifier,
    poll_timeout: chrono::Duration,
    retry_budget: u32,
}

impl CompletionWatcher {
    pub fn new(registry: AdapterRegistry, poll: &PollConfig) -> Self {
        Self {
            registry,
            classifier: FailureClassifier::new(),
            poll_timeout: chrono::Duration::seconds(poll.timeout_secs),
            retry_budget: poll.retry_budget,
        }
    }

    /// Run one completion poll against the backend.
    ///
    /// A fresh attempt gets a poller with a deadline `poll_timeout` from now;
    /// a resumed attempt keeps the deadline and budget it was serialized
    /// with. Poll failures are classified: retryable ones abandon the attempt
    /// for candidate fallback, fatal ones finalize the deployment.
    #[instrument(skip_all, fields(deployment_id = %deployment.deployment_id))]
    pub async fn watch(
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

        let adapter = self
            .registry
            .resolve(&provider)
            .map_err(|_| OrchestrationError::missing_adapter(&provider))?;

        let outcome = {
            let poller = data.poller.get_or_insert_with(|| {
                Poller::new(
                    CompletionCondition {
                        deployment_id: deployment.deployment_id,
                        provider: provider.clone(),
                    },
                    self.poll_timeout,
                )
                .with_retry_budget(self.retry_budget)
            });
            let evaluator = AdapterCompletionEvaluator {
                adapter: adapter.as_ref(),
                deployment,
            };
            poller.do_poll_event(&evaluator).await
        };

        match outcome {
            Ok(PollOutcome::NotYet) => Ok(PhaseEvent::BackendStillRunning),
            Ok(PollOutcome::Concluded {
                successful: true, ..
            }) => {
                info!(provider = %provider, "Backend reported successful completion");
                Ok(PhaseEvent::BackendSucceeded)
            }
            Ok(PollOutcome::Concluded {
                successful: false,
                observation,
            }) => {
                let reason = match observation {
                    CompletionStatus::Failed { reason } => reason,
                    _ => "backend concluded without success".to_string(),
                };
                warn!(provider = %provider, reason = %reason, "Backend reported failed completion");
                data.record_failure(self.classifier.classify_backend_failure(&provider, &reason));
                Ok(PhaseEvent::BackendFailed(reason))
            }
            Err(err) => {
                let assessment = self.classifier.classify_poll(
                    &provider,
                    &err,
                    adapter.timeout_is_fatal(deployment),
                );
                let reason = assessment.reason.clone();

                if assessment.is_fatal() {
                    warn!(provider = %provider, reason = %reason, "Poll failed fatally");
                    data.record_failure(assessment);
                    return Ok(PhaseEvent::BackendFailed(reason));
                }

                warn!(provider = %provider, reason = %reason, "Abandoning attempt after poll failure");
                if let Err(cleanup_err) = adapter.cleanup_failed_attempt(deployment).await {
                    warn!(
                        provider = %provider,
                        error = %cleanup_err,
                        "Cleanup of failed attempt reported an error, continuing"
                    );
                }
                data.record_failure(assessment);
                Ok(PhaseEvent::AttemptAbandoned(reason))
            }
        }
    }
}
