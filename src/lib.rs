#![allow(clippy::doc_markdown)] // Allow technical terms like SLA, YAML in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Stratus Core
//!
//! Multi-provider cloud deployment orchestration engine.
//!
//! ## Overview
//!
//! Stratus Core accepts a deployment request for a tenant and drives it to a
//! terminal outcome across a ranked list of candidate cloud providers. When
//! the preferred provider rejects or abandons an attempt, orchestration falls
//! back to the next candidate until one succeeds or the list runs out.
//!
//! ## Architecture
//!
//! The engine is **externally driven**: it holds no per-deployment state
//! between invocations. Each [`orchestration::DeploymentEngine::execute_step`]
//! call loads the record, performs exactly one step, saves under an optimistic
//! version guard, and returns serializable phase data plus a scheduling
//! signal. Any process with access to the store and the adapters can resume
//! any deployment at any step, which is what makes crash recovery and
//! horizontal scaling plain.
//!
//! ## Key Features
//!
//! - **SLA-driven ranking**: Candidate providers ordered by priority weight,
//!   availability band, and latency, lower rank wins
//! - **Automatic fallback**: Retryable faults abandon the attempt and rebind
//!   the next candidate; fatal faults finalize immediately
//! - **Resumable polling**: Completion polling carries its deadline and retry
//!   budget inside the serialized phase data
//! - **Dependency-ordered jobs**: Job-graph backends receive jobs in a
//!   deterministic topological order, one submission per invocation
//! - **Optimistic concurrency**: A lost save race defers and re-invokes, it
//!   never overwrites another actor's progress
//!
//! ## Module Organization
//!
//! - [`models`] - Deployment and resource records
//! - [`store`] - Persistence seam with optimistic versioning
//! - [`state_machine`] - Phase transition law
//! - [`ranking`] - SLA preference ranking and the candidate list
//! - [`providers`] - Provider adapter contract and registry
//! - [`orchestration`] - The engine and its per-phase handlers
//! - [`poller`] - Serializable deadline-and-budget poller
//! - [`graph`] - Dependency graph ordering for job backends
//! - [`events`] - Lifecycle event publishing
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging bootstrap
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stratus_core::config::OrchestratorConfig;
//! use stratus_core::orchestration::DeploymentEngine;
//! use stratus_core::providers::AdapterRegistry;
//! use stratus_core::ranking::CandidateDataSource;
//! use stratus_core::store::MemoryStore;
//!
//! # async fn example(source: Arc<dyn CandidateDataSource>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestratorConfig::from_env()?;
//! let registry = AdapterRegistry::new();
//! // registry.register(...) your provider adapters here
//!
//! let engine = DeploymentEngine::new(&config, Arc::new(MemoryStore::new()), source, registry);
//! let mut events = engine.subscribe();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod graph;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod poller;
pub mod providers;
pub mod ranking;
pub mod state_machine;
pub mod store;

pub use config::{ExecutionConfig, OrchestratorConfig, PollConfig, RankingConfig};
pub use constants::{status_groups, system};
// Re-export constants events with different name to avoid conflict
pub use constants::events as system_events;
pub use error::{Result, StratusError};
pub use models::{Deployment, DeploymentStatus, NewDeployment, NewResource, Resource, ResourceState};
pub use orchestration::{DeploymentEngine, StepOutcome, StepRequest, StepSignal};
pub use state_machine::DeploymentPhase;
