//! Cash and equity account model.

use serde::{Deserialize, Serialize};

use super::{AccountId, AccountKind, Currency};

/// A cash balance or an equity holding.
///
/// For [`AccountKind::Stock`] the balance is derived from
/// `quantity × last_price` and is recomputed by [`Account::set_price`] and
/// [`Account::set_quantity`]; it is never edited directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Institution or display name.
    pub name: String,
    /// Cash or stock.
    #[serde(rename = "type")]
    pub kind: AccountKind,
    /// Currency the balance is denominated in.
    #[serde(default)]
    pub currency: Currency,
    /// Balance in `currency`.
    #[serde(default)]
    pub balance: f64,
    /// Ticker symbol (stocks only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Number of shares held (stocks only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// Last known share price (stocks only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price: Option<f64>,
    /// Dividend yield percentage; `0` or absent means unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
}

impl Account {
    /// Creates a cash account with a fresh id.
    #[inline]
    #[must_use]
    pub fn cash<N: Into<String>>(name: N, currency: Currency, balance: f64) -> Self {
        Self {
            id: AccountId::generate(),
            name: name.into(),
            kind: AccountKind::Cash,
            currency,
            balance,
            symbol: None,
            quantity: None,
            last_price: None,
            dividend_yield: None,
        }
    }

    /// Creates a stock account with a fresh id; the balance is derived.
    #[inline]
    #[must_use]
    pub fn stock<N: Into<String>, S: Into<String>>(
        name: N,
        symbol: S,
        currency: Currency,
        quantity: f64,
        last_price: f64,
    ) -> Self {
        let mut account = Self {
            id: AccountId::generate(),
            name: name.into(),
            kind: AccountKind::Stock,
            currency,
            balance: 0.0,
            symbol: Some(symbol.into()),
            quantity: Some(quantity),
            last_price: Some(last_price),
            dividend_yield: None,
        };
        account.recompute_balance();
        account
    }

    /// Returns `true` for equity holdings.
    #[inline]
    #[must_use]
    pub fn is_stock(&self) -> bool {
        self.kind == AccountKind::Stock
    }

    /// Dividend yield percentage, `0` when unknown.
    #[inline]
    #[must_use]
    pub fn yield_percent(&self) -> f64 {
        self.dividend_yield.unwrap_or(0.0)
    }

    /// Updates the share price and re-derives the balance.
    #[inline]
    pub fn set_price(&mut self, price: f64) {
        self.last_price = Some(price);
        self.recompute_balance();
    }

    /// Updates the share count and re-derives the balance.
    #[inline]
    pub fn set_quantity(&mut self, quantity: f64) {
        self.quantity = Some(quantity);
        self.recompute_balance();
    }

    /// Re-derives a stock balance from quantity and price, rounded to a
    /// whole unit. Cash accounts are left untouched.
    #[inline]
    pub fn recompute_balance(&mut self) {
        if self.is_stock() {
            let quantity = self.quantity.unwrap_or(0.0);
            let price = self.last_price.unwrap_or(0.0);
            self.balance = (quantity * price).round();
        }
    }
}
