use std::collections::BTreeMap;
use std::time::Instant;

use futures::future::join_all;

use crate::cache::CacheMode;
use crate::circuit_breaker::CircuitSnapshot;
use crate::data_source::{DataSource, SourceError};
use crate::fallback::duration_ms;
use crate::normalize;
use crate::routing::Router;
use crate::{HealthReport, PriceComparison, SourceHealth, SourceQuote, UtcDateTime};

impl Router {
    /// Probes every configured provider concurrently. Probes bypass caches
    /// and do not feed the circuit breakers.
    pub async fn check_health(&self) -> HealthReport {
        let timeout = self.executor.attempt_timeout();
        let probes = self.configured_sources().into_iter().map(|source| async move {
            let started = Instant::now();
            let result = tokio::time::timeout(timeout, source.probe())
                .await
                .unwrap_or_else(|_| Err(SourceError::timeout(duration_ms(timeout))));
            let latency_ms = duration_ms(started.elapsed());

            if let Err(error) = &result {
                tracing::debug!(provider = %source.id(), code = error.code(), %error, "health probe failed");
            }

            SourceHealth {
                source: source.id(),
                healthy: result.is_ok(),
                latency_ms,
                error: result.err().map(|error| error.to_string()),
            }
        });

        HealthReport {
            checked_at: UtcDateTime::now(),
            sources: join_all(probes).await,
        }
    }

    /// Queries every ETH price provider at once, bypassing routing and the
    /// response caches, and reports the spread between them.
    pub async fn compare_eth_price(&self) -> PriceComparison {
        let timeout = self.executor.attempt_timeout();
        let quotes = self.eth_price_calls(CacheMode::Bypass).into_iter().map(|(source, call)| async move {
            let started = Instant::now();
            let result = tokio::time::timeout(timeout, call)
                .await
                .unwrap_or_else(|_| Err(SourceError::timeout(duration_ms(timeout))))
                .and_then(|price| {
                    normalize::validate_price(&price)
                        .map(|()| price)
                        .map_err(SourceError::invalid_response)
                });
            let latency_ms = duration_ms(started.elapsed());

            match result {
                Ok(price) => SourceQuote {
                    source,
                    value: Some(price.price),
                    latency_ms,
                    error: None,
                },
                Err(error) => SourceQuote {
                    source,
                    value: None,
                    latency_ms,
                    error: Some(error.to_string()),
                },
            }
        });

        PriceComparison::from_quotes(join_all(quotes).await)
    }

    /// Breaker state for every provider that has been attempted.
    pub fn circuit_status(&self) -> BTreeMap<String, CircuitSnapshot> {
        self.breakers().snapshot()
    }

    /// Providers that can be called at all, in [`crate::ProviderId::ALL`] order.
    fn configured_sources(&self) -> Vec<&dyn DataSource> {
        let mut sources: Vec<&dyn DataSource> = Vec::with_capacity(7);
        if let Some(node) = &self.rpc {
            sources.push(node);
        }
        sources.extend([
            &self.etherscan as &dyn DataSource,
            &self.coingecko,
            &self.defillama,
            &self.growthepie,
            &self.blobscan,
            &self.dune,
        ]);

        sources.retain(|source| source.is_configured());
        sources
    }
}
