use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO-4217-like currency code used by expenses, balances and rate tables.
///
/// Groups are multi-currency: every expense carries its own code and the
/// engine normalizes amounts into one target code. Codes are three ASCII
/// letters and are stored upper-cased, so `"eur"` and `"EUR"` are the same
/// currency.
///
/// Whether a code is *known* depends on the active rate table, not on this
/// type: `"XYZ"` parses fine and fails later with
/// [`EngineError::UnknownCurrency`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const USD: CurrencyCode = CurrencyCode(*b"USD");
    pub const EUR: CurrencyCode = CurrencyCode(*b"EUR");
    pub const GBP: CurrencyCode = CurrencyCode(*b"GBP");
    pub const JPY: CurrencyCode = CurrencyCode(*b"JPY");
    pub const INR: CurrencyCode = CurrencyCode(*b"INR");
    pub const CAD: CurrencyCode = CurrencyCode(*b"CAD");
    pub const AUD: CurrencyCode = CurrencyCode(*b"AUD");
    pub const CNY: CurrencyCode = CurrencyCode(*b"CNY");

    /// Canonical currency code.
    #[must_use]
    pub fn code(&self) -> &str {
        // Constructed only from ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl core::fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "CurrencyCode({})", self.code())
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        let bytes: [u8; 3] = trimmed
            .as_bytes()
            .try_into()
            .map_err(|_| EngineError::InvalidCurrency(trimmed.to_string()))?;
        if !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(EngineError::InvalidCurrency(trimmed.to_string()));
        }
        Ok(CurrencyCode(bytes.map(|b| b.to_ascii_uppercase())))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CurrencyCode::try_from(value.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::try_from(s)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.code().to_string()
    }
}
