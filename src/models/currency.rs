//! Currency codes.

use core::convert::Infallible;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A holding's currency.
///
/// The three supported codes get their own variants. Anything else is kept
/// verbatim in [`Currency::Other`] so it survives a load/save cycle and is
/// converted 1:1 by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Currency {
    /// Hong Kong dollar, the base currency.
    #[default]
    Hkd,
    /// Australian dollar.
    Aud,
    /// US dollar.
    Usd,
    /// Unsupported code, carried as written.
    Other(String),
}

impl Currency {
    /// The supported currencies in display order.
    pub const SUPPORTED: [Self; 3] = [Self::Hkd, Self::Aud, Self::Usd];

    /// Returns the ISO code.
    #[inline]
    #[must_use]
    #[expect(
        clippy::ref_patterns,
        reason = "pattern_type_mismatch requires matching on the dereferenced value"
    )]
    pub fn code(&self) -> &str {
        match *self {
            Self::Hkd => "HKD",
            Self::Aud => "AUD",
            Self::Usd => "USD",
            Self::Other(ref code) => code,
        }
    }
}

impl core::fmt::Display for Currency {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = Infallible;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Ok(match code.as_str() {
            "HKD" => Self::Hkd,
            "AUD" => Self::Aud,
            "USD" => Self::Usd,
            _ => Self::Other(code),
        })
    }
}

impl From<String> for Currency {
    #[inline]
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(currency) => currency,
            Err(never) => match never {},
        }
    }
}

impl From<Currency> for String {
    #[inline]
    fn from(value: Currency) -> Self {
        match value {
            Currency::Other(code) => code,
            Currency::Hkd | Currency::Aud | Currency::Usd => value.code().to_owned(),
        }
    }
}
