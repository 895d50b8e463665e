//! Enumeration types for constrained document values.

use serde::{Deserialize, Serialize};

/// Kind of a cash or equity account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccountKind {
    /// Bank balance or cash on hand.
    #[default]
    Cash,
    /// Equity holding; balance is derived from quantity and price.
    Stock,
}

impl AccountKind {
    /// Name as written in documents.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Stock => "Stock",
        }
    }
}

/// Sub-type flag on a fixed deposit.
///
/// Documents written before the flag existed omit it entirely, so the
/// field holding this is optional. Unrecognised flags are kept verbatim in
/// [`DepositKind::Other`] and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DepositKind {
    /// Non-term savings instrument, excluded from the synced net worth.
    Savings,
    /// Ordinary fixed-term deposit.
    Term,
    /// Any other flag value, carried as written.
    Other(String),
}

impl DepositKind {
    /// Name as written in documents.
    #[inline]
    #[must_use]
    #[expect(
        clippy::ref_patterns,
        reason = "pattern_type_mismatch requires matching on the dereferenced value"
    )]
    pub fn as_str(&self) -> &str {
        match *self {
            Self::Savings => "Savings",
            Self::Term => "Term",
            Self::Other(ref flag) => flag,
        }
    }
}

impl From<String> for DepositKind {
    #[inline]
    fn from(value: String) -> Self {
        match value.as_str() {
            "Savings" => Self::Savings,
            "Term" => Self::Term,
            _ => Self::Other(value),
        }
    }
}

impl From<DepositKind> for String {
    #[inline]
    fn from(value: DepositKind) -> Self {
        match value {
            DepositKind::Other(flag) => flag,
            DepositKind::Savings | DepositKind::Term => value.as_str().to_owned(),
        }
    }
}

/// Coarse asset class used on the wire (remote store rows, scanner output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetClass {
    /// Bank balances and deposits.
    Cash,
    /// Shares, equities and funds.
    Stock,
}

impl From<AccountKind> for AssetClass {
    #[inline]
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Cash => Self::Cash,
            AccountKind::Stock => Self::Stock,
        }
    }
}

impl From<AssetClass> for AccountKind {
    #[inline]
    fn from(class: AssetClass) -> Self {
        match class {
            AssetClass::Cash => Self::Cash,
            AssetClass::Stock => Self::Stock,
        }
    }
}
