//! Candidate holdings extracted from a statement image.

use serde::{Deserialize, Serialize};

use super::{Account, AccountKind, AssetClass, Currency, Quote};

/// One holding recognised on a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedAsset {
    /// Cash balance or stock position.
    pub category: AssetClass,
    /// Bank or brokerage name as read from the image.
    #[serde(default)]
    pub institution: String,
    /// Ticker for stocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Balance for cash; share count for stocks.
    #[serde(default)]
    pub amount: f64,
    /// Currency read from the statement.
    #[serde(default)]
    pub currency: Currency,
    /// Share price, when the statement shows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Dividend yield filled in by a quote lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
}

impl ScannedAsset {
    /// Name to give the resulting account.
    ///
    /// Falls back to a generic label when the institution was not read.
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = self.institution.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("unknown") {
            match self.category {
                AssetClass::Stock => "Stocks".to_owned(),
                AssetClass::Cash => "Deposit".to_owned(),
            }
        } else {
            name.to_owned()
        }
    }

    /// Merges a live quote in: a non-zero live price wins over the
    /// statement price, and the live yield is always taken.
    #[inline]
    pub fn apply_quote(&mut self, quote: Quote) {
        if quote.price > 0.0 {
            self.price = Some(quote.price);
        }
        self.dividend_yield = Some(quote.dividend_yield);
    }

    /// Converts the candidate into an account with a fresh id.
    #[inline]
    #[must_use]
    pub fn into_account(self) -> Account {
        let name = self.display_name();
        match AccountKind::from(self.category) {
            AccountKind::Cash => Account::cash(name, self.currency, self.amount),
            AccountKind::Stock => {
                let mut account = Account::stock(
                    name,
                    self.symbol.unwrap_or_default(),
                    self.currency,
                    self.amount,
                    self.price.unwrap_or(0.0),
                );
                account.dividend_yield = self.dividend_yield;
                account
            }
        }
    }
}
