//! Balance ledger and settlement engine for shared group expenses.
//!
//! The pipeline is
//! `expenses + roster + target currency → rates → balances → settlements`:
//!
//! - [`CurrencyNormalizer`] supplies a (possibly cached) [`ExchangeRateTable`];
//! - [`compute_balances`] derives each member's net position;
//! - [`compute_settlements`] turns positions into payments.
//!
//! [`Engine`] wires the three together for a [`Group`].
use std::sync::Arc;

pub use currency::CurrencyCode;
pub use error::{EngineError, RateSourceError};
pub use export::{balances_csv, expenses_csv};
pub use http::HttpRateFetcher;
pub use ledger::{Balance, ExpenseRecord, Group, Member, MemberId, Participant, compute_balances};
pub use money::{EPSILON, MoneyCents};
pub use normalizer::{
    Clock, CurrencyNormalizer, CurrencyNormalizerBuilder, FetchFuture, RateFetcher, SystemClock,
};
pub use rates::ExchangeRateTable;
pub use rules::{split_equally, validate_expense};
pub use settlement::{Settlement, apply_settlements, compute_settlements, is_settled};

mod currency;
mod error;
mod export;
pub mod http;
mod ledger;
mod money;
pub mod normalizer;
mod rates;
mod rules;
mod settlement;

type ResultEngine<T> = Result<T, EngineError>;

#[derive(Debug)]
pub struct Engine {
    normalizer: CurrencyNormalizer,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The active exchange-rate table.
    pub async fn rates(&self) -> Arc<ExchangeRateTable> {
        self.normalizer.rates().await
    }

    /// Convert a single amount between currencies.
    pub async fn convert(
        &self,
        amount: MoneyCents,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> ResultEngine<MoneyCents> {
        self.normalizer.convert(amount, from, to).await
    }

    /// Net balances of every group member in `target`.
    ///
    /// One rate table is used for the whole computation.
    pub async fn balances(&self, group: &Group, target: CurrencyCode) -> ResultEngine<Vec<Balance>> {
        let rates = self.normalizer.rates().await;
        compute_balances(&group.expenses, &group.members, target, &rates)
    }

    /// Payments that settle the group in `target`.
    pub async fn settlements(
        &self,
        group: &Group,
        target: CurrencyCode,
    ) -> ResultEngine<Vec<Settlement>> {
        let balances = self.balances(group, target).await?;
        compute_settlements(&balances)
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    normalizer: Option<CurrencyNormalizer>,
}

impl EngineBuilder {
    /// Pass the currency normalizer. Without one the engine runs offline on
    /// the embedded rate table.
    pub fn normalizer(mut self, normalizer: CurrencyNormalizer) -> EngineBuilder {
        self.normalizer = Some(normalizer);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            normalizer: self.normalizer.unwrap_or_else(CurrencyNormalizer::offline),
        }
    }
}
