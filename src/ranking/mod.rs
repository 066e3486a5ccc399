//! Provider ranking and candidate selection.
//!
//! For a tenant and service, [`ProviderRanker`] pulls SLA preferences,
//! monitoring, and catalog data from the [`CandidateDataSource`], filters
//! providers to those actually offering the service, computes a rank per
//! provider (lower is better), and hands back a [`CandidateList`] whose
//! cursor tracks fallback across attempts.

pub mod candidates;
pub mod score;
pub mod sources;

use std::sync::Arc;

use futures::future::try_join;
use tracing::{debug, instrument};

use crate::config::RankingConfig;

pub use candidates::{CandidateList, RankedCandidate};
pub use score::{
    AvailabilityComponent, CompositeRanker, LatencyComponent, PriorityComponent, RankBreakdown,
    RankComponent, RankContribution, RankInput,
};
pub use sources::{
    CandidateDataSource, ProviderMetrics, ServiceOffering, SlaPreferenceEntry, SlaPreferences,
    SourceError,
};

/// Ranks candidate providers for one tenant and service.
pub struct ProviderRanker {
    source: Arc<dyn CandidateDataSource>,
    ranker: CompositeRanker,
}

impl ProviderRanker {
    /// Build a ranker with the standard component composition.
    pub fn new(source: Arc<dyn CandidateDataSource>, config: &RankingConfig) -> Self {
        Self {
            source,
            ranker: CompositeRanker::standard(config),
        }
    }

    /// Build a ranker with a caller-assembled composition.
    pub fn with_composite(source: Arc<dyn CandidateDataSource>, ranker: CompositeRanker) -> Self {
        Self { source, ranker }
    }

    /// Rank every eligible provider for the tenant's service.
    ///
    /// Providers appear at most once, in the SLA data's first-seen order
    /// before sorting; providers whose catalog does not offer the service
    /// (or offers it disabled) are skipped. Source failures propagate: a
    /// broken lookup never reads as an empty candidate list.
    #[instrument(skip(self), fields(tenant = tenant, service = service))]
    pub async fn rank_candidates(
        &self,
        tenant: &str,
        service: &str,
    ) -> Result<CandidateList, SourceError> {
        let preferences = self.source.preferences(tenant).await?;
        let entries = preferences.entries_for_service(service);
        debug!(
            providers = entries.len(),
            "ranking providers from SLA preferences"
        );

        let mut ranked = Vec::with_capacity(entries.len());
        for entry in entries {
            let (metrics, catalog) = try_join(
                self.source.monitoring(&entry.provider),
                self.source.catalog(&entry.provider),
            )
            .await?;

            if !offers_service(&catalog, service) {
                debug!(
                    provider = %entry.provider,
                    "provider does not offer the service, skipping"
                );
                continue;
            }

            let input = RankInput {
                provider: &entry.provider,
                service,
                priority_weight: entry.priority_weight,
                metrics: &metrics,
            };
            let (rank, breakdown) = self.ranker.rank(&input);
            debug!(provider = %entry.provider, rank, "provider ranked");

            ranked.push(RankedCandidate {
                provider: entry.provider.clone(),
                rank,
                breakdown,
                metrics,
            });
        }

        Ok(CandidateList::ranked(ranked))
    }
}

fn offers_service(catalog: &[ServiceOffering], service: &str) -> bool {
    catalog
        .iter()
        .any(|offering| offering.service == service && offering.enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Fixture source with per-provider metrics and catalogs.
    struct FixtureSource {
        preferences: SlaPreferences,
        metrics: HashMap<String, ProviderMetrics>,
        catalogs: HashMap<String, Vec<ServiceOffering>>,
    }

    impl FixtureSource {
        fn new(entries: Vec<(&str, f64)>) -> Self {
            let mut metrics = HashMap::new();
            let mut catalogs = HashMap::new();
            for (provider, _) in &entries {
                metrics.insert(
                    provider.to_string(),
                    ProviderMetrics {
                        availability_pct: 100.0,
                        avg_latency_ms: 20.0,
                    },
                );
                catalogs.insert(
                    provider.to_string(),
                    vec![ServiceOffering {
                        service: "compute".to_string(),
                        enabled: true,
                    }],
                );
            }
            Self {
                preferences: SlaPreferences {
                    tenant: "acme".to_string(),
                    entries: entries
                        .into_iter()
                        .map(|(provider, priority_weight)| SlaPreferenceEntry {
                            provider: provider.to_string(),
                            service: "compute".to_string(),
                            priority_weight,
                        })
                        .collect(),
                },
                metrics,
                catalogs,
            }
        }
    }

    #[async_trait]
    impl CandidateDataSource for FixtureSource {
        async fn preferences(&self, _tenant: &str) -> Result<SlaPreferences, SourceError> {
            Ok(self.preferences.clone())
        }

        async fn monitoring(&self, provider: &str) -> Result<ProviderMetrics, SourceError> {
            self.metrics
                .get(provider)
                .copied()
                .ok_or_else(|| SourceError::Monitoring {
                    provider: provider.to_string(),
                    reason: "no metrics".to_string(),
                })
        }

        async fn catalog(&self, provider: &str) -> Result<Vec<ServiceOffering>, SourceError> {
            self.catalogs
                .get(provider)
                .cloned()
                .ok_or_else(|| SourceError::Catalog {
                    provider: provider.to_string(),
                    reason: "no catalog".to_string(),
                })
        }
    }

    fn ranker(source: FixtureSource) -> ProviderRanker {
        ProviderRanker::new(Arc::new(source), &RankingConfig::default())
    }

    #[tokio::test]
    async fn test_candidates_ordered_by_priority_weight() {
        let source = FixtureSource::new(vec![("p1", 2.0), ("p2", 1.0), ("p3", 3.0)]);

        let mut list = ranker(source)
            .rank_candidates("acme", "compute")
            .await
            .unwrap();

        assert_eq!(list.next().unwrap().provider, "p2");
        assert_eq!(list.next().unwrap().provider, "p1");
        assert_eq!(list.next().unwrap().provider, "p3");
        assert!(!list.has_next());
    }

    #[tokio::test]
    async fn test_degraded_availability_reorders_candidates() {
        let mut source = FixtureSource::new(vec![("favored", 1.0), ("backup", 2.0)]);
        // The favored provider is having a bad day.
        source.metrics.insert(
            "favored".to_string(),
            ProviderMetrics {
                availability_pct: 80.0,
                avg_latency_ms: 20.0,
            },
        );

        let mut list = ranker(source)
            .rank_candidates("acme", "compute")
            .await
            .unwrap();

        assert_eq!(list.next().unwrap().provider, "backup");
        assert_eq!(list.next().unwrap().provider, "favored");
    }

    #[tokio::test]
    async fn test_provider_without_offering_is_skipped() {
        let mut source = FixtureSource::new(vec![("p1", 1.0), ("p2", 2.0)]);
        source.catalogs.insert(
            "p1".to_string(),
            vec![ServiceOffering {
                service: "storage".to_string(),
                enabled: true,
            }],
        );

        let list = ranker(source)
            .rank_candidates("acme", "compute")
            .await
            .unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list.candidates()[0].provider, "p2");
    }

    #[tokio::test]
    async fn test_disabled_offering_is_ineligible() {
        let mut source = FixtureSource::new(vec![("p1", 1.0)]);
        source.catalogs.insert(
            "p1".to_string(),
            vec![ServiceOffering {
                service: "compute".to_string(),
                enabled: false,
            }],
        );

        let list = ranker(source)
            .rank_candidates("acme", "compute")
            .await
            .unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let mut source = FixtureSource::new(vec![("p1", 1.0)]);
        source.metrics.remove("p1");

        let err = ranker(source)
            .rank_candidates("acme", "compute")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Monitoring { .. }));
    }

    #[tokio::test]
    async fn test_breakdown_records_components() {
        let source = FixtureSource::new(vec![("p1", 1.5)]);

        let list = ranker(source)
            .rank_candidates("acme", "compute")
            .await
            .unwrap();
        let candidate = &list.candidates()[0];

        assert_eq!(candidate.rank, 1.5);
        assert_eq!(candidate.breakdown.contribution("priority"), Some(1.5));
        assert_eq!(candidate.breakdown.contribution("availability"), Some(0.0));
    }
}
