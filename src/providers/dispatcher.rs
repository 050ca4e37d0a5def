//! Provider dispatcher: routes a search to the provider registered for its
//! kind, bounds it with a timeout, and classifies the outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{ProviderKind, ProviderResult, SearchProvider, SearchQuery};
use crate::error::ProviderFailure;

/// Registry of search providers keyed by category.
pub struct ProviderDispatcher {
    providers: HashMap<ProviderKind, Arc<dyn SearchProvider>>,
    timeout: Duration,
}

impl ProviderDispatcher {
    /// Create a dispatcher with no providers registered.
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            timeout,
        }
    }

    /// Register the provider for a kind, replacing any earlier one.
    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn SearchProvider>) -> Self {
        self.register(kind, provider);
        self
    }

    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn SearchProvider>) {
        debug!(provider = provider.name(), kind = %kind, "Registered search provider");
        self.providers.insert(kind, provider);
    }

    /// Kinds that have a provider behind them.
    pub fn configured(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<ProviderKind> = self.providers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one search. Never fails: every problem becomes a recorded failure.
    pub async fn search(&self, kind: ProviderKind, query: &SearchQuery) -> ProviderResult {
        let Some(provider) = self.providers.get(&kind) else {
            debug!(kind = %kind, "No provider configured");
            return ProviderFailure::NotConfigured.into();
        };

        let outcome = match tokio::time::timeout(self.timeout, provider.search(query)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderFailure::timeout(self.timeout)),
        };

        match &outcome {
            Ok(payload) => debug!(
                provider = provider.name(),
                kind = %kind,
                items = payload.items.len(),
                "Search finished"
            ),
            Err(failure) => warn!(
                provider = provider.name(),
                kind = %kind,
                error = %failure,
                "Search failed"
            ),
        }

        outcome.into()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::providers::ResultPayload;
    use crate::session::TripQuery;

    struct Fixed(Result<ResultPayload, ProviderFailure>);

    #[async_trait]
    impl SearchProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn search(&self, _query: &SearchQuery) -> Result<ResultPayload, ProviderFailure> {
            self.0.clone()
        }
    }

    struct Slow;

    #[async_trait]
    impl SearchProvider for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        async fn search(&self, _query: &SearchQuery) -> Result<ResultPayload, ProviderFailure> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ResultPayload::new("slow", vec![]))
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::Transport {
            trip: TripQuery {
                origin_city: "Москва".into(),
                destination_city: "Казань".into(),
                start_date: chrono::NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                end_date: chrono::NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
                adult_count: 1,
            },
        }
    }

    #[tokio::test]
    async fn missing_provider_is_not_configured() {
        let dispatcher = ProviderDispatcher::new(Duration::from_secs(1));
        let result = dispatcher.search(ProviderKind::Lodging, &query()).await;
        assert_eq!(
            result,
            ProviderResult::Failed {
                failure: ProviderFailure::NotConfigured
            }
        );
    }

    #[tokio::test]
    async fn success_and_failure_are_classified() {
        let payload = ResultPayload::new("fixed", vec!["row".into()]);
        let dispatcher = ProviderDispatcher::new(Duration::from_secs(1))
            .with_provider(ProviderKind::Flights, Arc::new(Fixed(Ok(payload.clone()))))
            .with_provider(
                ProviderKind::Rail,
                Arc::new(Fixed(Err(ProviderFailure::MalformedResponse("bad".into())))),
            );

        assert_eq!(
            dispatcher.search(ProviderKind::Flights, &query()).await,
            ProviderResult::Found { payload }
        );
        assert!(!dispatcher.search(ProviderKind::Rail, &query()).await.is_found());
        assert_eq!(
            dispatcher.configured(),
            vec![ProviderKind::Flights, ProviderKind::Rail]
        );
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let dispatcher = ProviderDispatcher::new(Duration::from_millis(50))
            .with_provider(ProviderKind::Flights, Arc::new(Slow));

        let result = dispatcher.search(ProviderKind::Flights, &query()).await;
        assert_eq!(
            result,
            ProviderResult::Failed {
                failure: ProviderFailure::Timeout(0)
            }
        );
    }
}
