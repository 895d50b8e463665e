//! Request and response shapes of the spreadsheet-backed remote store.

use serde::{Deserialize, Deserializer, Serialize};

use super::{Account, AssetClass, Currency, FixedDeposit};

/// Body of a sync push.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    /// Plaintext PIN used as the user id.
    pub user_id: String,
    /// Net worth in HKD, rounded.
    pub total: i64,
    /// Accounts followed by deposits, flattened into one list.
    pub assets: Vec<SyncAsset>,
}

/// One flattened holding row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAsset {
    /// Institution name.
    pub inst: String,
    /// Upper-cased ticker, empty for cash, `-` for deposits.
    pub sym: String,
    /// Share count (stocks only, otherwise 0).
    pub qty: f64,
    /// Share price (stocks only, otherwise 0).
    pub prc: f64,
    /// Balance or principal (non-stocks only, otherwise 0).
    pub bal: f64,
    /// Original currency.
    pub cur: Currency,
    /// Coarse asset class.
    #[serde(rename = "type")]
    pub class: AssetClass,
    /// Whether this row is a fixed deposit.
    #[serde(rename = "isFD")]
    pub is_fd: bool,
    /// Deposit interest rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    /// Deposit maturity as stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maturity_date: Option<String>,
    /// Stock dividend yield.
    #[serde(rename = "yield", skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
}

impl SyncAsset {
    /// Flattens a cash or stock account.
    #[inline]
    #[must_use]
    pub fn from_account(account: &Account) -> Self {
        let stock = account.is_stock();
        Self {
            inst: account.name.clone(),
            sym: account
                .symbol
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_uppercase(),
            qty: if stock { account.quantity.unwrap_or(0.0) } else { 0.0 },
            prc: if stock { account.last_price.unwrap_or(0.0) } else { 0.0 },
            bal: if stock { 0.0 } else { account.balance },
            cur: account.currency.clone(),
            class: account.kind.into(),
            is_fd: false,
            rate: None,
            maturity_date: None,
            dividend_yield: Some(account.yield_percent()),
        }
    }

    /// Flattens a fixed deposit.
    #[inline]
    #[must_use]
    pub fn from_deposit(deposit: &FixedDeposit) -> Self {
        Self {
            inst: deposit.bank_name.clone(),
            sym: "-".to_owned(),
            qty: 0.0,
            prc: 0.0,
            bal: deposit.principal,
            cur: deposit.currency.clone(),
            class: AssetClass::Cash,
            is_fd: true,
            rate: (deposit.interest_rate != 0.0).then_some(deposit.interest_rate),
            maturity_date: Some(deposit.maturity_date.clone()),
            dividend_yield: None,
        }
    }
}

/// Reply to a sync push.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SyncReply {
    /// `"success"` on success; anything else is a failure.
    #[serde(default)]
    pub status: String,
    /// Optional failure message.
    #[serde(default)]
    pub msg: Option<String>,
}

impl SyncReply {
    /// Returns `true` when the store accepted the push.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Live price and yield for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Quote {
    /// Last price in the listing currency; 0 when unknown.
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: f64,
    /// Dividend yield percentage; 0 when unknown.
    #[serde(rename = "yield", default, deserialize_with = "lenient_number")]
    pub dividend_yield: f64,
}

/// Accepts a number, a numeric string, or anything else (as 0).
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(num) => num.as_f64().unwrap_or(0.0),
        serde_json::Value::String(text) => text.trim().parse().unwrap_or(0.0),
        serde_json::Value::Null
        | serde_json::Value::Bool(_)
        | serde_json::Value::Array(_)
        | serde_json::Value::Object(_) => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_row_carries_quantity_and_price_only() {
        let mut account = Account::stock("IBKR", " aapl ", Currency::Usd, 10.0, 150.0);
        account.dividend_yield = Some(0.5);
        let row = SyncAsset::from_account(&account);
        assert_eq!(row.sym, "AAPL");
        assert!((row.qty - 10.0).abs() < f64::EPSILON);
        assert!((row.prc - 150.0).abs() < f64::EPSILON);
        assert!(row.bal.abs() < f64::EPSILON);
        assert_eq!(row.class, AssetClass::Stock);
    }

    #[test]
    fn cash_row_carries_balance_only() {
        let account = Account::cash("HSBC", Currency::Hkd, 5000.0);
        let row = SyncAsset::from_account(&account);
        assert_eq!(row.sym, "");
        assert!(row.qty.abs() < f64::EPSILON);
        assert!((row.bal - 5000.0).abs() < f64::EPSILON);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "CASH");
        assert_eq!(json["isFD"], false);
        assert!(json.get("rate").is_none());
    }

    #[test]
    fn deposit_row_is_flagged() {
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let deposit = FixedDeposit::new("SC", 100_000.0, Currency::Hkd, 4.1, date);
        let json = serde_json::to_value(SyncAsset::from_deposit(&deposit)).unwrap();
        assert_eq!(json["sym"], "-");
        assert_eq!(json["isFD"], true);
        assert_eq!(json["rate"], 4.1);
        assert_eq!(json["maturityDate"], "2025-06-30");
    }

    #[test]
    fn reply_status_must_be_exactly_success() {
        let ok: SyncReply = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(ok.is_success());
        let capitalised: SyncReply = serde_json::from_str(r#"{"status":"Success"}"#).unwrap();
        assert!(!capitalised.is_success());
        let bad: SyncReply = serde_json::from_str(r#"{"status":"error","msg":"sheet locked"}"#).unwrap();
        assert!(!bad.is_success());
        assert_eq!(bad.msg.as_deref(), Some("sheet locked"));
        let empty: SyncReply = serde_json::from_str("{}").unwrap();
        assert!(!empty.is_success());
    }

    #[test]
    fn quote_defaults_missing_fields() {
        let quote: Quote = serde_json::from_str(r#"{"price":"412.5"}"#).unwrap();
        assert!((quote.price - 412.5).abs() < f64::EPSILON);
        assert!(quote.dividend_yield.abs() < f64::EPSILON);

        let junk: Quote = serde_json::from_str(r#"{"price":null,"yield":"n/a"}"#).unwrap();
        assert_eq!(junk, Quote::default());
    }
}
