//! # Deployment Engine
//!
//! The externally driven core of the crate. Each [`DeploymentEngine::execute_step`]
//! call performs exactly one orchestration step for one deployment and
//! returns: the serialized phase data the next invocation must receive
//! verbatim, and a [`StepSignal`] telling the execution substrate what to do
//! next. The engine holds no per-deployment state between calls, so any
//! process with the store and the adapters can pick up any deployment at any
//! step.
//!
//! Saves go through the store's optimistic version guard. When a save loses
//! the race the engine never overwrites: it logs, publishes a deferral event,
//! and hands back the ORIGINAL input data so the substrate re-invokes against
//! the winner's record.
//!
//! [`DeploymentEngine::execute_deployment`] is the bundled in-process driver:
//! a loop that feeds signals back into steps until the deployment concludes,
//! for tests and single-process setups.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::constants::events;
use crate::events::{DeploymentEvent, EventPublisher};
use crate::graph::JobGraph;
use crate::models::{Deployment, DeploymentStatus, NewDeployment, NewResource};
use crate::orchestration::candidate_selector::CandidateSelector;
use crate::orchestration::completion_watcher::CompletionWatcher;
use crate::orchestration::errors::{OrchestrationError, OrchestrationResult};
use crate::orchestration::finalizer::{FinalizationAction, FinalizationSummary, Finalizer};
use crate::orchestration::phase_data::PhaseData;
use crate::orchestration::submitter::Submitter;
use crate::providers::AdapterRegistry;
use crate::ranking::{CandidateDataSource, ProviderRanker};
use crate::state_machine::{self, DeploymentPhase, PhaseEvent};
use crate::store::{DeploymentStore, StoreError};

/// One engine invocation, as handed over by the execution substrate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    pub deployment_id: Uuid,
    /// Phase the substrate believes the deployment is in
    pub step: DeploymentPhase,
    /// Phase data returned by the previous invocation; `Null` on the first
    pub data: Value,
}

/// What one invocation hands back to the substrate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Phase data the next invocation must receive verbatim
    pub data: Value,
    pub signal: StepSignal,
}

/// Scheduling instruction for the execution substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum StepSignal {
    /// More work is ready now; re-invoke with the returned data
    Continue { next: DeploymentPhase },
    /// The backend is still working; re-invoke after the poll interval
    AwaitBackend { next: DeploymentPhase },
    /// The deployment concluded; no further invocations
    Completed { success: bool },
    /// Another actor owns the record; re-invoke later with the same data
    Deferred,
}

/// Multi-provider deployment orchestration engine.
pub struct DeploymentEngine {
    store: Arc<dyn DeploymentStore>,
    registry: AdapterRegistry,
    publisher: EventPublisher,
    selector: CandidateSelector,
    submitter: Submitter,
    watcher: CompletionWatcher,
    finalizer: Finalizer,
    max_engine_steps: u32,
    reinvoke_delay: std::time::Duration,
}

impl DeploymentEngine {
    pub fn new(
        config: &OrchestratorConfig,
        store: Arc<dyn DeploymentStore>,
        source: Arc<dyn CandidateDataSource>,
        registry: AdapterRegistry,
    ) -> Self {
        let publisher = EventPublisher::new(config.execution.event_channel_capacity);
        let ranker = ProviderRanker::new(source, &config.ranking);
        Self {
            selector: CandidateSelector::new(store.clone(), ranker),
            submitter: Submitter::new(store.clone(), registry.clone()),
            watcher: CompletionWatcher::new(registry.clone(), &config.poll),
            finalizer: Finalizer::new(store.clone(), registry.clone()),
            store,
            registry,
            publisher,
            max_engine_steps: config.execution.max_engine_steps,
            reinvoke_delay: config.reinvoke_delay(),
        }
    }

    /// The adapter registry this engine resolves providers against.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Subscribe to the engine's lifecycle event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DeploymentEvent> {
        self.publisher.subscribe()
    }

    /// Accept a deployment request and persist it at the starting phase.
    ///
    /// Dependency edges are validated here: a cyclic or dangling `requires`
    /// set is rejected before anything is stored.
    #[instrument(skip_all, fields(name = %request.name, tenant = %request.tenant))]
    pub async fn create_deployment(
        &self,
        request: NewDeployment,
        resources: Vec<NewResource>,
    ) -> OrchestrationResult<Deployment> {
        JobGraph::build(
            resources
                .iter()
                .map(|resource| (resource.node_name.clone(), resource.requires.clone())),
        )?;

        let deployment = self.store.create_deployment(request, resources).await?;
        info!(deployment_id = %deployment.deployment_id, "Deployment request accepted");
        self.publish(
            events::DEPLOYMENT_REQUESTED,
            deployment.deployment_id,
            json!({
                "name": deployment.name,
                "tenant": deployment.tenant,
                "service": deployment.service,
            }),
        )
        .await;
        Ok(deployment)
    }

    /// Record an external cancel request.
    ///
    /// Idempotent on terminal deployments. A deployment already finalizing as
    /// success keeps its outcome; anything else routes to failure
    /// finalization, which will settle it as `cancelled`. A lost save race
    /// here propagates to the caller for a retry against the fresh record.
    #[instrument(skip_all, fields(deployment_id = %deployment_id))]
    pub async fn cancel(
        &self,
        deployment_id: Uuid,
        reason: impl Into<String>,
    ) -> OrchestrationResult<Deployment> {
        let mut deployment = self.store.load_deployment(deployment_id).await?;
        if deployment.is_terminal() {
            debug!(status = %deployment.status, "Cancel on terminal deployment is a no-op");
            return Ok(deployment);
        }
        if deployment.phase == DeploymentPhase::FinalizeSuccess {
            debug!("Deployment already finalizing as success, cancel ignored");
            return Ok(deployment);
        }

        let reason = reason.into();
        deployment.cancel_requested = true;
        deployment.status_reason = Some(reason.clone());
        if deployment.phase != DeploymentPhase::FinalizeFailure {
            state_machine::transition(
                &mut deployment,
                &PhaseEvent::CancelRequested(reason.clone()),
            )?;
        }

        let saved = self.store.save_deployment(&deployment).await?;
        info!(reason = %reason, "Cancel recorded, deployment will finalize as cancelled");
        self.publish(
            events::CANCEL_REQUESTED,
            saved.deployment_id,
            json!({ "reason": reason }),
        )
        .await;
        Ok(saved)
    }

    /// Execute exactly one orchestration step.
    #[instrument(skip_all, fields(deployment_id = %request.deployment_id, step = %request.step))]
    pub async fn execute_step(&self, request: StepRequest) -> OrchestrationResult<StepOutcome> {
        let mut deployment = self.store.load_deployment(request.deployment_id).await?;

        if deployment.is_terminal() {
            info!(status = %deployment.status, "Deployment already terminal, nothing to do");
            return Ok(StepOutcome {
                data: request.data,
                signal: StepSignal::Completed {
                    success: deployment.status == DeploymentStatus::Complete,
                },
            });
        }

        if request.step != deployment.phase {
            warn!(
                recorded = %deployment.phase,
                requested = %request.step,
                "Stale step request, deferring to the current record"
            );
            return Ok(StepOutcome {
                data: request.data,
                signal: StepSignal::Deferred,
            });
        }

        let mut data = PhaseData::decode(&request.data)?;

        if deployment.status == DeploymentStatus::Pending {
            deployment.status = DeploymentStatus::InProgress;
        }

        match deployment.phase {
            DeploymentPhase::SelectCandidate => {
                let event = self.selector.select(&mut deployment, &mut data).await?;
                self.advance(deployment, request.data, data, event).await
            }
            DeploymentPhase::Submit => {
                let event = self.submitter.submit(&mut deployment, &mut data).await?;
                self.advance(deployment, request.data, data, event).await
            }
            DeploymentPhase::Poll => {
                let event = self.watcher.watch(&mut deployment, &mut data).await?;
                self.advance(deployment, request.data, data, event).await
            }
            DeploymentPhase::FinalizeSuccess => {
                let summary = self.finalizer.finalize_success(&mut deployment).await?;
                self.conclude(deployment, request.data, data, summary).await
            }
            DeploymentPhase::FinalizeFailure => {
                let summary = self
                    .finalizer
                    .finalize_failure(&mut deployment, &data)
                    .await?;
                self.conclude(deployment, request.data, data, summary).await
            }
        }
    }

    /// Drive one deployment to conclusion in-process.
    ///
    /// Intended for tests and single-process deployments; production setups
    /// are expected to feed [`StepRequest`]s from their own scheduler.
    #[instrument(skip_all, fields(deployment_id = %deployment_id))]
    pub async fn execute_deployment(
        &self,
        deployment_id: Uuid,
    ) -> OrchestrationResult<Deployment> {
        let mut data = Value::Null;
        for _ in 0..self.max_engine_steps {
            let deployment = self.store.load_deployment(deployment_id).await?;
            if deployment.is_terminal() {
                return Ok(deployment);
            }

            let outcome = self
                .execute_step(StepRequest {
                    deployment_id,
                    step: deployment.phase,
                    data,
                })
                .await?;
            data = outcome.data;

            match outcome.signal {
                StepSignal::Completed { .. } => {
                    return self
                        .store
                        .load_deployment(deployment_id)
                        .await
                        .map_err(Into::into);
                }
                StepSignal::AwaitBackend { .. } | StepSignal::Deferred => {
                    tokio::time::sleep(self.reinvoke_delay).await;
                }
                StepSignal::Continue { .. } => {}
            }
        }

        Err(OrchestrationError::StepBudgetExhausted {
            deployment_id,
            steps: self.max_engine_steps,
        })
    }

    /// Apply a handler event, save under the version guard, and signal.
    async fn advance(
        &self,
        mut deployment: Deployment,
        original_data: Value,
        data: PhaseData,
        event: PhaseEvent,
    ) -> OrchestrationResult<StepOutcome> {
        let previous_phase = deployment.phase;
        state_machine::transition(&mut deployment, &event)?;

        // Carry the failure reason onto the record so finalization names it
        // even if the phase data is lost between invocations.
        if deployment.phase == DeploymentPhase::FinalizeFailure {
            if let Some(reason) = event.reason() {
                deployment.status_reason = Some(reason.to_string());
            }
        }

        let deployment = match self.store.save_deployment(&deployment).await {
            Ok(saved) => saved,
            Err(err) if err.is_version_conflict() => {
                return self
                    .defer(deployment.deployment_id, previous_phase, original_data, &err)
                    .await;
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(name) = published_event_name(&event) {
            self.publish(
                name,
                deployment.deployment_id,
                json!({
                    "event": event.event_type(),
                    "phase": deployment.phase,
                    "attempt": data.attempt,
                    "provider": deployment.provider,
                    "reason": event.reason(),
                }),
            )
            .await;
        }

        let signal = if event == PhaseEvent::BackendStillRunning {
            StepSignal::AwaitBackend {
                next: deployment.phase,
            }
        } else {
            StepSignal::Continue {
                next: deployment.phase,
            }
        };
        Ok(StepOutcome {
            data: data.encode()?,
            signal,
        })
    }

    /// Persist a finalized record and emit the terminal event.
    async fn conclude(
        &self,
        deployment: Deployment,
        original_data: Value,
        data: PhaseData,
        summary: FinalizationSummary,
    ) -> OrchestrationResult<StepOutcome> {
        let deployment = match self.store.save_deployment(&deployment).await {
            Ok(saved) => saved,
            Err(err) if err.is_version_conflict() => {
                return self
                    .defer(
                        deployment.deployment_id,
                        deployment.phase,
                        original_data,
                        &err,
                    )
                    .await;
            }
            Err(err) => return Err(err.into()),
        };

        let name = match summary.action {
            FinalizationAction::Completed => events::DEPLOYMENT_COMPLETED,
            FinalizationAction::Failed => events::DEPLOYMENT_FAILED,
            FinalizationAction::Cancelled => events::DEPLOYMENT_CANCELLED,
        };
        if let Err(err) = self
            .publisher
            .publish_serialized(name, deployment.deployment_id, &summary)
            .await
        {
            warn!(error = %err, "Event publication failed");
        }

        info!(status = %deployment.status, "Deployment concluded");
        Ok(StepOutcome {
            data: data.encode()?,
            signal: StepSignal::Completed {
                success: summary.action == FinalizationAction::Completed,
            },
        })
    }

    /// Surrender the step to whoever advanced the record first.
    async fn defer(
        &self,
        deployment_id: Uuid,
        phase: DeploymentPhase,
        original_data: Value,
        err: &StoreError,
    ) -> OrchestrationResult<StepOutcome> {
        warn!(
            phase = %phase,
            error = %err,
            "Concurrent modification detected, deferring without overwriting"
        );
        self.publish(
            events::STEP_DEFERRED,
            deployment_id,
            json!({ "phase": phase, "error": err.to_string() }),
        )
        .await;
        Ok(StepOutcome {
            data: original_data,
            signal: StepSignal::Deferred,
        })
    }

    async fn publish(&self, name: &'static str, deployment_id: Uuid, payload: Value) {
        if let Err(err) = self.publisher.publish(name, deployment_id, payload).await {
            warn!(event = name, error = %err, "Event publication failed");
        }
    }
}

/// Event-channel name for a transition event, if it is published at all.
///
/// Poll heartbeats stay off the channel; cancel requests are published by
/// `cancel()` itself.
fn published_event_name(event: &PhaseEvent) -> Option<&'static str> {
    match event {
        PhaseEvent::CandidateSelected => Some(events::CANDIDATE_SELECTED),
        PhaseEvent::CandidatesExhausted(_) => Some(events::CANDIDATES_EXHAUSTED),
        PhaseEvent::SubmissionAccepted { .. } => Some(events::SUBMISSION_ACCEPTED),
        PhaseEvent::SubmissionRejected(_) => Some(events::SUBMISSION_REJECTED),
        PhaseEvent::SubmissionFaulted(_) | PhaseEvent::AttemptAbandoned(_) => {
            Some(events::ATTEMPT_ABANDONED)
        }
        PhaseEvent::BackendSucceeded => Some(events::BACKEND_SUCCEEDED),
        PhaseEvent::BackendFailed(_) => Some(events::BACKEND_FAILED),
        PhaseEvent::BackendStillRunning | PhaseEvent::CancelRequested(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::models::Resource;
    use crate::providers::{
        AdapterError, BackendKind, CompletionStatus, DeploymentUnit, ProviderAdapter, SubmitAck,
    };
    use crate::ranking::{
        ProviderMetrics, ServiceOffering, SlaPreferenceEntry, SlaPreferences, SourceError,
    };
    use crate::store::MemoryStore;

    struct StaticSource {
        entries: Vec<SlaPreferenceEntry>,
    }

    impl StaticSource {
        fn single(provider: &str) -> Self {
            Self {
                entries: vec![SlaPreferenceEntry {
                    provider: provider.to_string(),
                    service: "compute".to_string(),
                    priority_weight: 1.0,
                }],
            }
        }
    }

    #[async_trait]
    impl CandidateDataSource for StaticSource {
        async fn preferences(&self, tenant: &str) -> Result<SlaPreferences, SourceError> {
            Ok(SlaPreferences {
                tenant: tenant.to_string(),
                entries: self.entries.clone(),
            })
        }

        async fn monitoring(&self, _provider: &str) -> Result<ProviderMetrics, SourceError> {
            Ok(ProviderMetrics {
                availability_pct: 99.95,
                avg_latency_ms: 80.0,
            })
        }

        async fn catalog(&self, _provider: &str) -> Result<Vec<ServiceOffering>, SourceError> {
            Ok(vec![ServiceOffering {
                service: "compute".to_string(),
                enabled: true,
            }])
        }
    }

    struct LifecycleAdapter {
        name: &'static str,
        completion: Mutex<VecDeque<Result<CompletionStatus, AdapterError>>>,
    }

    impl LifecycleAdapter {
        fn succeeding(name: &'static str, polls_until_done: usize) -> Arc<Self> {
            let mut completion = VecDeque::new();
            for _ in 0..polls_until_done {
                completion.push_back(Ok(CompletionStatus::InProgress));
            }
            completion.push_back(Ok(CompletionStatus::Succeeded));
            Arc::new(Self {
                name,
                completion: Mutex::new(completion),
            })
        }

        /// Reports in-progress forever.
        fn never_concluding(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                completion: Mutex::new(VecDeque::new()),
            })
        }
    }

    #[async_trait]
    impl ProviderAdapter for LifecycleAdapter {
        fn name(&self) -> &str {
            self.name
        }

        fn backend_kind(&self) -> BackendKind {
            BackendKind::Infrastructure
        }

        async fn submit(
            &self,
            _deployment: &Deployment,
            _unit: &DeploymentUnit,
        ) -> Result<SubmitAck, AdapterError> {
            Ok(SubmitAck::with_backend_ref(json!({"stack": "s-1"})))
        }

        async fn is_complete(
            &self,
            _deployment: &Deployment,
        ) -> Result<CompletionStatus, AdapterError> {
            self.completion
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(CompletionStatus::InProgress))
        }

        async fn finalize(
            &self,
            _deployment: &Deployment,
            _success: bool,
        ) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn cleanup_failed_attempt(
            &self,
            _deployment: &Deployment,
        ) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    /// Store wrapper that loses the save race exactly once.
    struct RacingStore {
        inner: MemoryStore,
        fail_next_save: AtomicBool,
    }

    impl RacingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_next_save: AtomicBool::new(false),
            }
        }

        fn lose_next_race(&self) {
            self.fail_next_save.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DeploymentStore for RacingStore {
        async fn create_deployment(
            &self,
            new: NewDeployment,
            resources: Vec<NewResource>,
        ) -> Result<Deployment, StoreError> {
            self.inner.create_deployment(new, resources).await
        }

        async fn load_deployment(&self, deployment_id: Uuid) -> Result<Deployment, StoreError> {
            self.inner.load_deployment(deployment_id).await
        }

        async fn save_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
            if self.fail_next_save.swap(false, Ordering::SeqCst) {
                return Err(StoreError::VersionConflict {
                    deployment_id: deployment.deployment_id,
                    expected: deployment.version,
                    actual: deployment.version + 1,
                });
            }
            self.inner.save_deployment(deployment).await
        }

        async fn resources_for_deployment(
            &self,
            deployment_id: Uuid,
        ) -> Result<Vec<Resource>, StoreError> {
            self.inner.resources_for_deployment(deployment_id).await
        }

        async fn find_resources_by_node(
            &self,
            deployment_id: Uuid,
            node_name: &str,
        ) -> Result<Vec<Resource>, StoreError> {
            self.inner
                .find_resources_by_node(deployment_id, node_name)
                .await
        }

        async fn save_resource(&self, resource: &Resource) -> Result<Resource, StoreError> {
            self.inner.save_resource(resource).await
        }
    }

    fn request() -> NewDeployment {
        NewDeployment {
            name: "checkout".to_string(),
            tenant: "acme".to_string(),
            service: "compute".to_string(),
            template: "resources: []".to_string(),
            parameters: HashMap::new(),
            requested_at: None,
        }
    }

    fn engine_with(
        store: Arc<dyn DeploymentStore>,
        source: Arc<dyn CandidateDataSource>,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> DeploymentEngine {
        let registry = AdapterRegistry::new();
        registry.register(adapter);
        DeploymentEngine::new(&OrchestratorConfig::for_testing(), store, source, registry)
    }

    #[tokio::test]
    async fn test_execute_deployment_happy_path() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            store.clone(),
            Arc::new(StaticSource::single("cloud-a")),
            LifecycleAdapter::succeeding("cloud-a", 1),
        );

        let created = engine.create_deployment(request(), vec![]).await.unwrap();
        let done = engine
            .execute_deployment(created.deployment_id)
            .await
            .unwrap();

        assert_eq!(done.status, DeploymentStatus::Complete);
        assert_eq!(done.phase, DeploymentPhase::FinalizeSuccess);
        assert_eq!(done.provider.as_deref(), Some("cloud-a"));
        assert!(done.status_reason.is_none());
    }

    #[tokio::test]
    async fn test_step_signals_drive_the_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            store.clone(),
            Arc::new(StaticSource::single("cloud-a")),
            LifecycleAdapter::succeeding("cloud-a", 1),
        );
        let created = engine.create_deployment(request(), vec![]).await.unwrap();
        let id = created.deployment_id;

        let mut data = Value::Null;
        let mut step = DeploymentPhase::SelectCandidate;

        let expectations = [
            StepSignal::Continue {
                next: DeploymentPhase::Submit,
            },
            StepSignal::Continue {
                next: DeploymentPhase::Poll,
            },
            StepSignal::AwaitBackend {
                next: DeploymentPhase::Poll,
            },
            StepSignal::Continue {
                next: DeploymentPhase::FinalizeSuccess,
            },
            StepSignal::Completed { success: true },
        ];

        for expected in expectations {
            let outcome = engine
                .execute_step(StepRequest {
                    deployment_id: id,
                    step,
                    data,
                })
                .await
                .unwrap();
            assert_eq!(outcome.signal, expected);
            data = outcome.data;
            step = match outcome.signal {
                StepSignal::Continue { next } | StepSignal::AwaitBackend { next } => next,
                _ => step,
            };
        }

        let stored = store.load_deployment(id).await.unwrap();
        assert_eq!(stored.status, DeploymentStatus::Complete);
    }

    #[tokio::test]
    async fn test_stale_step_request_defers() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            store.clone(),
            Arc::new(StaticSource::single("cloud-a")),
            LifecycleAdapter::succeeding("cloud-a", 0),
        );
        let created = engine.create_deployment(request(), vec![]).await.unwrap();

        let outcome = engine
            .execute_step(StepRequest {
                deployment_id: created.deployment_id,
                step: DeploymentPhase::Poll,
                data: json!({"attempt": 3}),
            })
            .await
            .unwrap();

        assert_eq!(outcome.signal, StepSignal::Deferred);
        assert_eq!(outcome.data, json!({"attempt": 3}));
    }

    #[tokio::test]
    async fn test_lost_save_race_defers_with_original_data() {
        let store = Arc::new(RacingStore::new());
        let engine = engine_with(
            store.clone(),
            Arc::new(StaticSource::single("cloud-a")),
            LifecycleAdapter::succeeding("cloud-a", 0),
        );
        let created = engine.create_deployment(request(), vec![]).await.unwrap();
        let id = created.deployment_id;
        let mut events = engine.subscribe();

        store.lose_next_race();
        let outcome = engine
            .execute_step(StepRequest {
                deployment_id: id,
                step: DeploymentPhase::SelectCandidate,
                data: Value::Null,
            })
            .await
            .unwrap();

        // The loser hands back exactly what it was given and writes nothing.
        assert_eq!(outcome.signal, StepSignal::Deferred);
        assert_eq!(outcome.data, Value::Null);
        let stored = store.load_deployment(id).await.unwrap();
        assert_eq!(stored.status, DeploymentStatus::Pending);
        assert_eq!(stored.phase, DeploymentPhase::SelectCandidate);
        assert_eq!(stored.version, created.version);

        let deferral = events.try_recv().unwrap();
        assert_eq!(deferral.name, events::STEP_DEFERRED);

        // The re-invocation wins against the fresh record.
        let retried = engine
            .execute_step(StepRequest {
                deployment_id: id,
                step: DeploymentPhase::SelectCandidate,
                data: outcome.data,
            })
            .await
            .unwrap();
        assert_eq!(
            retried.signal,
            StepSignal::Continue {
                next: DeploymentPhase::Submit
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_finalizes_as_cancelled() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            store.clone(),
            Arc::new(StaticSource::single("cloud-a")),
            LifecycleAdapter::never_concluding("cloud-a"),
        );
        let created = engine.create_deployment(request(), vec![]).await.unwrap();
        let id = created.deployment_id;

        // Run selection and submission, then cancel mid-poll.
        let first = engine
            .execute_step(StepRequest {
                deployment_id: id,
                step: DeploymentPhase::SelectCandidate,
                data: Value::Null,
            })
            .await
            .unwrap();
        engine
            .execute_step(StepRequest {
                deployment_id: id,
                step: DeploymentPhase::Submit,
                data: first.data,
            })
            .await
            .unwrap();

        let cancelled = engine.cancel(id, "operator request").await.unwrap();
        assert_eq!(cancelled.phase, DeploymentPhase::FinalizeFailure);
        assert!(cancelled.cancel_requested);

        let done = engine.execute_deployment(id).await.unwrap();
        assert_eq!(done.status, DeploymentStatus::Cancelled);
        assert_eq!(done.status_reason.as_deref(), Some("operator request"));

        // Idempotent on the terminal record.
        let again = engine.cancel(id, "second request").await.unwrap();
        assert_eq!(again.status, DeploymentStatus::Cancelled);
        assert_eq!(again.status_reason.as_deref(), Some("operator request"));
    }

    #[tokio::test]
    async fn test_cyclic_request_rejected_before_persisting() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            store.clone(),
            Arc::new(StaticSource::single("cloud-a")),
            LifecycleAdapter::succeeding("cloud-a", 0),
        );

        let err = engine
            .create_deployment(
                request(),
                vec![
                    NewResource {
                        node_name: "a".to_string(),
                        node_type: "job".to_string(),
                        requires: vec!["b".to_string()],
                    },
                    NewResource {
                        node_name: "b".to_string(),
                        node_type: "job".to_string(),
                        requires: vec!["a".to_string()],
                    },
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::Graph(_)));
    }

    #[tokio::test]
    async fn test_step_budget_bounds_the_driver() {
        let store = Arc::new(MemoryStore::new());
        let mut config = OrchestratorConfig::for_testing();
        config.execution.max_engine_steps = 5;
        config.poll.reinvoke_delay_ms = 1;

        let registry = AdapterRegistry::new();
        registry.register(LifecycleAdapter::never_concluding("cloud-a"));
        let engine = DeploymentEngine::new(
            &config,
            store.clone(),
            Arc::new(StaticSource::single("cloud-a")),
            registry,
        );

        let created = engine.create_deployment(request(), vec![]).await.unwrap();
        let err = engine
            .execute_deployment(created.deployment_id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::StepBudgetExhausted { steps: 5, .. }
        ));
    }
}
