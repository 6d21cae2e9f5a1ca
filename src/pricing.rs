//! Price and exchange-rate collaborators.
//!
//! The engine never talks to the network itself: it consumes the
//! `value + timestamp + source-currency` contract of these traits. Real
//! deployments wire HTTP clients behind them; tests and offline use wire
//! the `Static*` implementations. A TTL-caching decorator and a generic
//! fallback chain cover the two behaviors every price feed eventually
//! needs: not hammering the upstream, and degrading gracefully when it
//! falls over.

use crate::cache::{MetalSnapshot, QuoteSnapshot, SnapshotMeta};
use crate::currency::{Currency, RateQuote, RateTable};
use crate::types::EngineError;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Source of gold/silver spot prices, per gram, in a requested currency.
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait MetalPriceSource: Send + Sync {
    async fn metal_prices(&self, currency: &Currency) -> Result<MetalSnapshot, EngineError>;
}

/// Source of individual stock/crypto quotes.
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, symbol: &str, currency: &Currency)
        -> Result<QuoteSnapshot, EngineError>;
}

/// Source of currency exchange rates.
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait ExchangeRateSource: Send + Sync {
    /// Units of `to` bought by one unit of `from`.
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, EngineError>;

    /// Builds a point-in-time [`RateTable`] covering every `sources -> target`
    /// pair this source can resolve. Pairs that fail resolve are skipped with
    /// a warning; the caller decides per-field what an absent rate means.
    async fn table_for(
        &self,
        target: &Currency,
        sources: &[Currency],
    ) -> Result<RateTable, EngineError> {
        let mut quotes = Vec::new();
        for from in sources {
            if from == target {
                continue;
            }
            match self.rate(from, target).await {
                Ok(rate) => quotes.push(RateQuote::new(from.clone(), target.clone(), rate)),
                Err(e) => tracing::warn!("rate {}->{} unavailable: {}", from, target, e),
            }
        }
        Ok(RateTable::new(quotes))
    }
}

/// Fixed metal prices for tests, development, and user-supplied values.
#[derive(Debug, Clone)]
pub struct StaticMetalSource {
    gold_per_gram: Decimal,
    silver_per_gram: Decimal,
    currency: Currency,
}

impl StaticMetalSource {
    pub fn new(gold_per_gram: Decimal, silver_per_gram: Decimal, currency: Currency) -> Self {
        StaticMetalSource {
            gold_per_gram,
            silver_per_gram,
            currency,
        }
    }
}

#[cfg(feature = "async")]
#[async_trait::async_trait]
impl MetalPriceSource for StaticMetalSource {
    async fn metal_prices(&self, currency: &Currency) -> Result<MetalSnapshot, EngineError> {
        if currency != &self.currency {
            return Err(EngineError::UpstreamUnavailable {
                source: "static".to_string(),
                detail: format!("no {} prices configured", currency),
            });
        }
        Ok(MetalSnapshot {
            gold_per_gram: self.gold_per_gram,
            silver_per_gram: self.silver_per_gram,
            meta: SnapshotMeta::new(self.currency.clone(), Utc::now(), "static"),
        })
    }
}

/// Fixed exchange rates backed by a prebuilt [`RateTable`].
#[derive(Debug, Clone, Default)]
pub struct StaticRateSource {
    table: RateTable,
}

impl StaticRateSource {
    pub fn new(table: RateTable) -> Self {
        StaticRateSource { table }
    }
}

#[cfg(feature = "async")]
#[async_trait::async_trait]
impl ExchangeRateSource for StaticRateSource {
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, EngineError> {
        self.table.rate(from, to)
    }
}

/// TTL-caching decorator around a metal-price source.
///
/// Reuses fetched snapshots per currency until the TTL expires, so repeated
/// breakdown recomputations do not hit upstream rate limits. The snapshot's
/// `is_cache` flag is set on cache hits so downstream consumers can label
/// the data accordingly.
pub struct CachedMetalSource<P> {
    inner: P,
    cache: Arc<RwLock<HashMap<Currency, (Instant, MetalSnapshot)>>>,
    ttl: Duration,
}

impl<P> CachedMetalSource<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        CachedMetalSource {
            inner,
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }
}

#[cfg(feature = "async")]
#[async_trait::async_trait]
impl<P: MetalPriceSource> MetalPriceSource for CachedMetalSource<P> {
    async fn metal_prices(&self, currency: &Currency) -> Result<MetalSnapshot, EngineError> {
        // Fast path: fresh cached entry for this currency.
        if let Ok(guard) = self.cache.read() {
            if let Some((fetched_at, snapshot)) = guard.get(currency) {
                if fetched_at.elapsed() < self.ttl {
                    let mut hit = snapshot.clone();
                    hit.meta.is_cache = true;
                    return Ok(hit);
                }
            }
        }

        let fresh = self.inner.metal_prices(currency).await?;
        if let Ok(mut guard) = self.cache.write() {
            guard.insert(currency.clone(), (Instant::now(), fresh.clone()));
        }
        Ok(fresh)
    }
}

/// A value produced by a fallback chain, tagged with where it came from and
/// whether any preferred source had to be skipped to get it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: String,
    pub degraded: bool,
}

#[cfg(feature = "async")]
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EngineError>> + Send + 'a>>;

/// Runs labeled fetch attempts in order, returning the first success. If all
/// attempts fail, returns the hardcoded fallback value tagged `degraded`.
///
/// Replaces the per-call-site "try API A, then B, then constant" chains each
/// fetcher would otherwise reimplement. The result never errors: degraded
/// data with a visible marker beats no data.
#[cfg(feature = "async")]
pub async fn fetch_with_fallback<'a, T>(
    attempts: Vec<(&'a str, SourceFuture<'a, T>)>,
    fallback: (&'a str, T),
) -> Fetched<T> {
    let mut failures = 0usize;
    for (name, attempt) in attempts {
        match attempt.await {
            Ok(value) => {
                return Fetched {
                    value,
                    source: name.to_string(),
                    degraded: failures > 0,
                };
            }
            Err(e) => {
                tracing::warn!("price source '{}' failed: {}", name, e);
                failures += 1;
            }
        }
    }
    tracing::warn!("all price sources failed, using fallback '{}'", fallback.0);
    Fetched {
        value: fallback.1,
        source: fallback.0.to_string(),
        degraded: true,
    }
}
