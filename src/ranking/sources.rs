//! Candidate data source: the three lookups ranking is computed from.
//!
//! SLA preferences, monitoring metrics, and the provider service catalog
//! live in systems outside this crate. The engine reaches them through
//! [`CandidateDataSource`]; tests supply fixture-backed implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One tenant preference entry: how much a tenant wants a provider for a
/// service. Lower `priority_weight` means more preferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaPreferenceEntry {
    pub provider: String,
    pub service: String,
    pub priority_weight: f64,
}

/// A tenant's ordered SLA preferences.
///
/// Entry order is meaningful: it defines the first-seen order used to break
/// rank ties, so implementations must preserve the order their backing data
/// discovers providers in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaPreferences {
    pub tenant: String,
    pub entries: Vec<SlaPreferenceEntry>,
}

impl SlaPreferences {
    /// Entries matching a service, first-seen order, one per provider.
    pub fn entries_for_service(&self, service: &str) -> Vec<&SlaPreferenceEntry> {
        let mut seen: Vec<&str> = Vec::new();
        self.entries
            .iter()
            .filter(|entry| entry.service == service)
            .filter(|entry| {
                if seen.contains(&entry.provider.as_str()) {
                    false
                } else {
                    seen.push(entry.provider.as_str());
                    true
                }
            })
            .collect()
    }
}

/// Live monitoring snapshot for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetrics {
    /// Rolling availability, 0.0 to 100.0
    pub availability_pct: f64,
    /// Rolling mean API latency in milliseconds
    pub avg_latency_ms: f64,
}

/// One service a provider offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub service: String,
    pub enabled: bool,
}

/// Errors raised by the candidate data source.
///
/// Ranking propagates these instead of degrading to an empty candidate
/// list: a broken lookup must not read as "no providers".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("preference lookup failed for tenant '{tenant}': {reason}")]
    Preferences { tenant: String, reason: String },

    #[error("monitoring lookup failed for provider '{provider}': {reason}")]
    Monitoring { provider: String, reason: String },

    #[error("catalog lookup failed for provider '{provider}': {reason}")]
    Catalog { provider: String, reason: String },
}

/// Read access to the systems candidate ranking draws from.
#[async_trait]
pub trait CandidateDataSource: Send + Sync {
    /// A tenant's SLA preferences, in discovery order.
    async fn preferences(&self, tenant: &str) -> Result<SlaPreferences, SourceError>;

    /// Current monitoring metrics for a provider.
    async fn monitoring(&self, provider: &str) -> Result<ProviderMetrics, SourceError>;

    /// Services a provider currently offers.
    async fn catalog(&self, provider: &str) -> Result<Vec<ServiceOffering>, SourceError>;
}
