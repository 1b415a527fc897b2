//! Exchange-rate tables and amount conversion.
//!
//! A [`ExchangeRateTable`] maps currency codes to a multiplier relative to a
//! base currency (`1 base = rate[code] code`). Converting goes through the
//! base: `amount / rate[from] * rate[to]`, rounded to cents half away from
//! zero.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{CurrencyCode, EngineError, MoneyCents, ResultEngine};

/// Snapshot of exchange rates relative to `base`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateTable {
    pub base: CurrencyCode,
    pub rates: HashMap<CurrencyCode, Decimal>,
    /// When the table was fetched; `None` for the embedded fallback table.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl ExchangeRateTable {
    /// Build a table, rejecting non-positive rates.
    ///
    /// The base currency is always present with rate 1, whatever the source
    /// says about it.
    pub fn new(
        base: CurrencyCode,
        rates: impl IntoIterator<Item = (CurrencyCode, Decimal)>,
    ) -> ResultEngine<Self> {
        let mut table = HashMap::new();
        for (code, rate) in rates {
            if rate <= Decimal::ZERO {
                return Err(EngineError::InvalidRate(code.to_string()));
            }
            table.insert(code, rate);
        }
        table.insert(base, Decimal::ONE);
        Ok(Self {
            base,
            rates: table,
            fetched_at: None,
        })
    }

    /// The embedded table used when no remote source is configured or none
    /// has ever answered.
    #[must_use]
    pub fn fallback() -> Self {
        let rates = HashMap::from([
            (CurrencyCode::USD, Decimal::ONE),
            (CurrencyCode::EUR, dec!(0.85)),
            (CurrencyCode::GBP, dec!(0.75)),
            (CurrencyCode::JPY, dec!(110.42)),
            (CurrencyCode::INR, dec!(74.53)),
            (CurrencyCode::CAD, dec!(1.25)),
            (CurrencyCode::AUD, dec!(1.35)),
            (CurrencyCode::CNY, dec!(6.45)),
        ]);
        Self {
            base: CurrencyCode::USD,
            rates,
            fetched_at: None,
        }
    }

    /// Mark the table as fetched at `now`.
    #[must_use]
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.fetched_at = Some(now);
        self
    }

    /// Whether the table is younger than `ttl` at `now`.
    ///
    /// The fallback table is never fresh, so a configured source is always
    /// retried.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        self.fetched_at.is_some_and(|at| now - at < ttl)
    }

    /// Whether this is the embedded fallback table.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fetched_at.is_none()
    }

    pub fn contains(&self, code: CurrencyCode) -> bool {
        self.rates.contains_key(&code)
    }

    /// Rate of `code` relative to the base currency.
    pub fn rate(&self, code: CurrencyCode) -> ResultEngine<Decimal> {
        self.rates
            .get(&code)
            .copied()
            .ok_or_else(|| EngineError::UnknownCurrency(code.to_string()))
    }

    /// Convert `amount` from `from` to `to`, rounded to cents.
    ///
    /// Same-currency conversions return the amount untouched without looking
    /// the code up.
    pub fn convert(
        &self,
        amount: MoneyCents,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> ResultEngine<MoneyCents> {
        if from == to {
            return Ok(amount);
        }
        MoneyCents::from_decimal_rounded(self.convert_exact(amount, from, to)?)
    }

    /// Unrounded conversion in major units.
    ///
    /// Used where many converted amounts are summed before a single rounding.
    pub fn convert_exact(
        &self,
        amount: MoneyCents,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> ResultEngine<Decimal> {
        if from == to {
            return Ok(amount.to_decimal());
        }
        let from_rate = self.rate(from)?;
        let to_rate = self.rate(to)?;
        amount
            .to_decimal()
            .checked_div(from_rate)
            .and_then(|in_base| in_base.checked_mul(to_rate))
            .ok_or_else(|| EngineError::InvalidAmount("conversion overflow".to_string()))
    }
}
