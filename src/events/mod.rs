//! Lifecycle event publishing.
//!
//! The engine narrates deployment progress on a broadcast channel so
//! dashboards, audit sinks, and tests can watch without being wired into
//! the step path. Publishing never blocks orchestration: a channel with no
//! subscribers simply drops the event.

pub mod publisher;

pub use publisher::{DeploymentEvent, EventPublisher, PublishError};
