//! Remote exchange-rate source over HTTP.
//!
//! Talks to an exchangerate-api style endpoint:
//! `GET {endpoint}/{api_key}/latest/{base}` answering
//! `{"base_code": "USD", "conversion_rates": {"EUR": 0.85, ...}}`. The older
//! `{"base": ..., "rates": ...}` shape is accepted too.

use std::{collections::HashMap, time::Duration};

use reqwest::Url;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    CurrencyCode, ExchangeRateTable,
    error::RateSourceError,
    normalizer::{FetchFuture, RateFetcher},
};

pub const DEFAULT_ENDPOINT: &str = "https://v6.exchangerate-api.com/v6";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct LatestRates {
    #[serde(alias = "base")]
    base_code: String,
    #[serde(alias = "rates")]
    conversion_rates: HashMap<String, Decimal>,
}

impl TryFrom<LatestRates> for ExchangeRateTable {
    type Error = RateSourceError;

    fn try_from(value: LatestRates) -> Result<Self, Self::Error> {
        let malformed = |err: crate::EngineError| RateSourceError::Malformed(err.to_string());
        let base = CurrencyCode::try_from(value.base_code.as_str()).map_err(malformed)?;
        let mut rates = Vec::with_capacity(value.conversion_rates.len());
        for (code, rate) in value.conversion_rates {
            // Providers list a few non-ISO entries; skip what we cannot key.
            let Ok(code) = CurrencyCode::try_from(code.as_str()) else {
                tracing::debug!("skipping rate for unsupported code {code:?}");
                continue;
            };
            rates.push((code, rate));
        }
        ExchangeRateTable::new(base, rates).map_err(malformed)
    }
}

/// Fetches the latest rates for one base currency.
#[derive(Debug, Clone)]
pub struct HttpRateFetcher {
    url: Url,
    http: reqwest::Client,
}

impl HttpRateFetcher {
    /// Build a fetcher for `{endpoint}/{api_key}/latest/{base}` with a bounded
    /// request timeout.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        base: CurrencyCode,
        timeout: Duration,
    ) -> Result<Self, RateSourceError> {
        let raw = format!(
            "{}/{}/latest/{}",
            endpoint.trim_end_matches('/'),
            api_key.trim(),
            base
        );
        let url = Url::parse(&raw)
            .map_err(|err| RateSourceError::Malformed(format!("invalid endpoint: {err}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, http })
    }

    async fn latest(&self) -> Result<ExchangeRateTable, RateSourceError> {
        let res = self.http.get(self.url.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(RateSourceError::Status(status.as_u16()));
        }
        let body = res.json::<LatestRates>().await?;
        ExchangeRateTable::try_from(body)
    }
}

impl RateFetcher for HttpRateFetcher {
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(self.latest())
    }
}
