//! Domain models for deployments and their template resources.
//!
//! Models are plain serde structs: persistence happens behind the
//! [`crate::store::DeploymentStore`] trait, so nothing here knows about a
//! concrete storage backend.

pub mod deployment;
pub mod resource;

pub use deployment::{Deployment, DeploymentStatus, NewDeployment};
pub use resource::{NewResource, Resource, ResourceState};
