//! Shared fixtures for deployment lifecycle integration tests.

#![allow(dead_code)] // Not every test file uses every fixture.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast::Receiver;

use stratus_core::events::DeploymentEvent;
use stratus_core::models::{Deployment, NewDeployment, NewResource};
use stratus_core::providers::{
    AdapterError, AdapterRegistry, BackendKind, CompletionStatus, DeploymentUnit, ProviderAdapter,
    SubmitAck,
};
use stratus_core::ranking::{
    CandidateDataSource, ProviderMetrics, ServiceOffering, SlaPreferenceEntry, SlaPreferences,
    SourceError,
};

pub fn init_test_logging() {
    stratus_core::logging::init_structured_logging();
}

/// Builder for a deployment request against the `acme` tenant.
pub fn deployment_request(name: &str) -> NewDeployment {
    NewDeployment {
        name: name.to_string(),
        tenant: "acme".to_string(),
        service: "compute".to_string(),
        template: "resources: []".to_string(),
        parameters: HashMap::new(),
        requested_at: None,
    }
}

pub fn resource(node: &str, requires: &[&str]) -> NewResource {
    NewResource {
        node_name: node.to_string(),
        node_type: "job".to_string(),
        requires: requires.iter().map(|dep| (*dep).to_string()).collect(),
    }
}

/// Drain whatever the broadcast channel holds right now.
pub fn drain_events(receiver: &mut Receiver<DeploymentEvent>) -> Vec<DeploymentEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

pub fn event_names(events: &[DeploymentEvent]) -> Vec<&str> {
    events.iter().map(|event| event.name.as_str()).collect()
}

/// Candidate data source with fixed SLA weights and healthy monitoring.
///
/// Every provider offers the `compute` service; metrics can be overridden
/// per provider where a test needs a degraded one.
pub struct StaticCandidateSource {
    entries: Vec<SlaPreferenceEntry>,
    metrics: HashMap<String, ProviderMetrics>,
}

impl StaticCandidateSource {
    pub fn with_weights(weights: &[(&str, f64)]) -> Self {
        Self {
            entries: weights
                .iter()
                .map(|(provider, priority_weight)| SlaPreferenceEntry {
                    provider: (*provider).to_string(),
                    service: "compute".to_string(),
                    priority_weight: *priority_weight,
                })
                .collect(),
            metrics: HashMap::new(),
        }
    }

    pub fn with_metrics(mut self, provider: &str, metrics: ProviderMetrics) -> Self {
        self.metrics.insert(provider.to_string(), metrics);
        self
    }
}

#[async_trait]
impl CandidateDataSource for StaticCandidateSource {
    async fn preferences(&self, tenant: &str) -> Result<SlaPreferences, SourceError> {
        Ok(SlaPreferences {
            tenant: tenant.to_string(),
            entries: self.entries.clone(),
        })
    }

    async fn monitoring(&self, provider: &str) -> Result<ProviderMetrics, SourceError> {
        Ok(self.metrics.get(provider).copied().unwrap_or(ProviderMetrics {
            availability_pct: 99.95,
            avg_latency_ms: 80.0,
        }))
    }

    async fn catalog(&self, _provider: &str) -> Result<Vec<ServiceOffering>, SourceError> {
        Ok(vec![ServiceOffering {
            service: "compute".to_string(),
            enabled: true,
        }])
    }
}

/// Scripted provider adapter with call counters.
///
/// Submit and completion results are consumed front to back; an exhausted
/// submit script accepts, an exhausted completion script reports success.
pub struct MockProviderAdapter {
    name: String,
    kind: BackendKind,
    fatal_timeouts: bool,
    submit_script: Mutex<VecDeque<Result<SubmitAck, AdapterError>>>,
    completion_script: Mutex<VecDeque<Result<CompletionStatus, AdapterError>>>,
    pub submit_calls: AtomicU32,
    pub poll_calls: AtomicU32,
    pub cleanup_calls: AtomicU32,
    pub finalize_calls: Mutex<Vec<bool>>,
    pub submitted_nodes: Mutex<Vec<String>>,
}

impl MockProviderAdapter {
    pub fn infrastructure(name: &str) -> Self {
        Self::new(name, BackendKind::Infrastructure)
    }

    pub fn job_graph(name: &str) -> Self {
        Self::new(name, BackendKind::JobGraph)
    }

    fn new(name: &str, kind: BackendKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            fatal_timeouts: false,
            submit_script: Mutex::new(VecDeque::new()),
            completion_script: Mutex::new(VecDeque::new()),
            submit_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
            cleanup_calls: AtomicU32::new(0),
            finalize_calls: Mutex::new(Vec::new()),
            submitted_nodes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fatal_timeouts(mut self) -> Self {
        self.fatal_timeouts = true;
        self
    }

    pub fn with_submit_result(self, result: Result<SubmitAck, AdapterError>) -> Self {
        self.submit_script.lock().unwrap().push_back(result);
        self
    }

    pub fn with_completion(self, result: Result<CompletionStatus, AdapterError>) -> Self {
        self.completion_script.lock().unwrap().push_back(result);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn register_into(self, registry: &AdapterRegistry) -> Arc<Self> {
        let adapter = self.build();
        registry.register(adapter.clone());
        adapter
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn cleanup_count(&self) -> u32 {
        self.cleanup_calls.load(Ordering::SeqCst)
    }

    pub fn finalize_flags(&self) -> Vec<bool> {
        self.finalize_calls.lock().unwrap().clone()
    }

    pub fn nodes_in_submission_order(&self) -> Vec<String> {
        self.submitted_nodes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    async fn submit(
        &self,
        _deployment: &Deployment,
        unit: &DeploymentUnit,
    ) -> Result<SubmitAck, AdapterError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let DeploymentUnit::Job(resource) = unit {
            self.submitted_nodes
                .lock()
                .unwrap()
                .push(resource.node_name.clone());
        }
        self.submit_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(SubmitAck::with_backend_ref(
                    json!({"handle": format!("{}-ok", self.name)}),
                ))
            })
    }

    async fn is_complete(
        &self,
        _deployment: &Deployment,
    ) -> Result<CompletionStatus, AdapterError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.completion_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(CompletionStatus::Succeeded))
    }

    async fn finalize(&self, _deployment: &Deployment, success: bool) -> Result<(), AdapterError> {
        self.finalize_calls.lock().unwrap().push(success);
        Ok(())
    }

    async fn cleanup_failed_attempt(&self, _deployment: &Deployment) -> Result<(), AdapterError> {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn timeout_is_fatal(&self, _deployment: &Deployment) -> bool {
        self.fatal_timeouts
    }
}
