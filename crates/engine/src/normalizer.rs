//! Currency normalization with a cached, refreshable rate table.
//!
//! [`CurrencyNormalizer::rates`] never fails. The chain is:
//!
//! 1. cached table, if younger than the TTL;
//! 2. a fresh table from the configured [`RateFetcher`];
//! 3. the last good cached table, however old;
//! 4. the embedded [`ExchangeRateTable::fallback`].
//!
//! The cache holds an immutable `Arc` snapshot. Readers clone the `Arc` and
//! release the lock immediately; a refresh swaps in a whole new snapshot or
//! leaves the old one alone. At most one refresh runs at a time and callers
//! that already have a snapshot never wait for it.

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, PoisonError, RwLock},
};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::{CurrencyCode, ExchangeRateTable, MoneyCents, ResultEngine, error::RateSourceError};

/// Default time-to-live for a fetched table.
pub const DEFAULT_TTL: TimeDelta = TimeDelta::hours(24);

pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExchangeRateTable, RateSourceError>> + Send + 'a>>;

/// A remote source of exchange rates.
pub trait RateFetcher: Send + Sync {
    fn fetch(&self) -> FetchFuture<'_>;
}

/// Source of "now" for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct CurrencyNormalizer {
    fetcher: Option<Box<dyn RateFetcher>>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    snapshot: RwLock<Option<Arc<ExchangeRateTable>>>,
    refresh: Mutex<()>,
}

impl std::fmt::Debug for CurrencyNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyNormalizer")
            .field("online", &self.fetcher.is_some())
            .field("ttl", &self.ttl)
            .field("cached", &self.cached().is_some())
            .finish()
    }
}

impl CurrencyNormalizer {
    /// Return a builder for `CurrencyNormalizer`.
    pub fn builder() -> CurrencyNormalizerBuilder {
        CurrencyNormalizerBuilder::default()
    }

    /// A normalizer with no remote source: always the embedded table.
    pub fn offline() -> Self {
        Self::builder().build()
    }

    fn cached(&self) -> Option<Arc<ExchangeRateTable>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fresh(&self) -> Option<Arc<ExchangeRateTable>> {
        self.cached()
            .filter(|table| table.is_fresh(self.clock.now(), self.ttl))
    }

    fn store(&self, table: Arc<ExchangeRateTable>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(table);
    }

    fn stale_or_fallback(&self) -> Arc<ExchangeRateTable> {
        self.cached().unwrap_or_else(|| {
            tracing::debug!("no cached rates, using the embedded table");
            Arc::new(ExchangeRateTable::fallback())
        })
    }

    /// The active rate table.
    pub async fn rates(&self) -> Arc<ExchangeRateTable> {
        if let Some(table) = self.fresh() {
            return table;
        }

        let Some(fetcher) = self.fetcher.as_ref() else {
            return self.stale_or_fallback();
        };

        let _guard = match self.refresh.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(table) = self.cached() {
                    tracing::debug!("refresh in progress, serving the previous rates");
                    return table;
                }
                self.refresh.lock().await
            }
        };

        // Another caller may have refreshed while we waited.
        if let Some(table) = self.fresh() {
            return table;
        }

        match fetcher.fetch().await {
            Ok(table) => {
                let table = Arc::new(table.stamped(self.clock.now()));
                tracing::debug!(
                    "refreshed exchange rates: base {}, {} currencies",
                    table.base,
                    table.rates.len()
                );
                self.store(Arc::clone(&table));
                table
            }
            Err(err) => {
                tracing::warn!("exchange rate source unavailable: {err}");
                self.stale_or_fallback()
            }
        }
    }

    /// Convert `amount` between two currency codes using the active table.
    pub async fn convert(
        &self,
        amount: MoneyCents,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> ResultEngine<MoneyCents> {
        if from == to {
            return Ok(amount);
        }
        self.rates().await.convert(amount, from, to)
    }
}

/// The builder for `CurrencyNormalizer`
pub struct CurrencyNormalizerBuilder {
    fetcher: Option<Box<dyn RateFetcher>>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl Default for CurrencyNormalizerBuilder {
    fn default() -> Self {
        Self {
            fetcher: None,
            clock: Arc::new(SystemClock),
            ttl: DEFAULT_TTL,
        }
    }
}

impl CurrencyNormalizerBuilder {
    /// Pass the remote rate source. Without one the normalizer stays offline.
    pub fn fetcher(mut self, fetcher: impl RateFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    /// Construct `CurrencyNormalizer`
    pub fn build(self) -> CurrencyNormalizer {
        CurrencyNormalizer {
            fetcher: self.fetcher,
            clock: self.clock,
            ttl: self.ttl,
            snapshot: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }
}
