//! Settings for the command line tool.
//!
//! Read from an optional TOML file (`settleup.toml` unless `--config` says
//! otherwise), then overridden by `SETTLEUP_*` environment variables, with
//! `__` between nested keys: `SETTLEUP_RATES__API_KEY=...`.
use std::time::Duration;

use chrono::TimeDelta;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use engine::{CurrencyCode, CurrencyNormalizer, HttpRateFetcher, http};
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_PATH: &str = "settleup.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
    /// Target currency when a command does not name one.
    pub currency: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Rates {
    pub endpoint: String,
    /// Without a key the embedded rate table is used.
    pub api_key: Option<String>,
    pub base: String,
    pub ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            endpoint: http::DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            base: "USD".to_string(),
            ttl_secs: 24 * 60 * 60,
            timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub rates: Rates,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self> {
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SETTLEUP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        Ok(builder.build()?.try_deserialize()?)
    }

    /// The configured default target currency.
    pub fn currency(&self) -> Result<CurrencyCode> {
        Ok(self.app.currency.parse()?)
    }

    /// Build the rate normalizer: online when an API key is configured,
    /// offline otherwise.
    pub fn normalizer(&self) -> Result<CurrencyNormalizer> {
        let key = self
            .rates
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());
        let Some(key) = key else {
            tracing::debug!("no rates api key configured, working offline");
            return Ok(CurrencyNormalizer::offline());
        };

        let base: CurrencyCode = self.rates.base.parse()?;
        let fetcher = HttpRateFetcher::new(
            &self.rates.endpoint,
            key,
            base,
            Duration::from_secs(self.rates.timeout_secs),
        )?;
        let ttl = i64::try_from(self.rates.ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Ok(CurrencyNormalizer::builder()
            .fetcher(fetcher)
            .ttl(ttl)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> Settings {
        Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
            .unwrap()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let settings = from_toml("");
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.currency().unwrap(), CurrencyCode::USD);
        assert_eq!(settings.rates.endpoint, "https://v6.exchangerate-api.com/v6");
        assert_eq!(settings.rates.ttl_secs, 86_400);
        assert_eq!(settings.rates.timeout_secs, 5);
        assert!(settings.rates.api_key.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let settings = from_toml(
            r#"
            [app]
            currency = "eur"

            [rates]
            api_key = "secret"
            ttl_secs = 60
            "#,
        );
        assert_eq!(settings.currency().unwrap(), CurrencyCode::EUR);
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.rates.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.rates.ttl_secs, 60);
        assert_eq!(settings.rates.base, "USD");
    }

    #[test]
    fn bad_currency_is_reported() {
        let settings = from_toml("[app]\ncurrency = \"dollars\"");
        assert!(settings.currency().is_err());
    }

    #[test]
    fn blank_key_means_offline() {
        let settings = from_toml("[rates]\napi_key = \"  \"");
        let normalizer = settings.normalizer().unwrap();
        assert!(format!("{normalizer:?}").contains("online: false"));
    }
}
