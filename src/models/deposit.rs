//! Fixed deposit model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Currency, DepositId, DepositKind};

/// A term deposit or other fixed-term instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedDeposit {
    /// Unique identifier.
    pub id: DepositId,
    /// Issuing bank.
    pub bank_name: String,
    /// Principal in `currency`; never negative.
    #[serde(default)]
    pub principal: f64,
    /// Currency of the principal.
    #[serde(default)]
    pub currency: Currency,
    /// Maturity as written by the user: an RFC 3339 timestamp or a plain
    /// `YYYY-MM-DD` date.
    #[serde(default)]
    pub maturity_date: String,
    /// Annual interest rate percentage.
    #[serde(default)]
    pub interest_rate: f64,
    /// Free-form instruction for maturity ("Renew", "Transfer Out", ...).
    #[serde(default)]
    pub action_on_maturity: String,
    /// Whether the deposit rolls over automatically.
    #[serde(default)]
    pub auto_roll: bool,
    /// Optional sub-type flag.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DepositKind>,
}

impl FixedDeposit {
    /// Creates a fixed-term deposit with a fresh id.
    #[inline]
    #[must_use]
    pub fn new<B: Into<String>>(
        bank_name: B,
        principal: f64,
        currency: Currency,
        interest_rate: f64,
        maturity: NaiveDate,
    ) -> Self {
        Self {
            id: DepositId::generate(),
            bank_name: bank_name.into(),
            principal,
            currency,
            maturity_date: maturity.format("%Y-%m-%d").to_string(),
            interest_rate,
            action_on_maturity: String::new(),
            auto_roll: false,
            kind: None,
        }
    }

    /// Returns `true` when flagged as a non-term savings instrument.
    #[inline]
    #[must_use]
    pub fn is_savings(&self) -> bool {
        self.kind == Some(DepositKind::Savings)
    }

    /// Parses the maturity date, accepting RFC 3339 timestamps and plain
    /// dates. Returns `None` for anything else.
    #[inline]
    #[must_use]
    pub fn maturity(&self) -> Option<DateTime<Utc>> {
        let raw = self.maturity_date.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_legacy_deposit() {
        let json = r#"{
            "id": "101",
            "bankName": "Standard Chartered",
            "principal": 100000,
            "currency": "HKD",
            "maturityDate": "2024-06-01T08:30:00.000Z",
            "actionOnMaturity": "Renew",
            "interestRate": 4.1,
            "autoRoll": true
        }"#;
        let deposit: FixedDeposit = serde_json::from_str(json).unwrap();
        assert_eq!(deposit.bank_name, "Standard Chartered");
        assert!(deposit.auto_roll);
        assert!(deposit.kind.is_none());
        assert!(!deposit.is_savings());
        let maturity = deposit.maturity().unwrap();
        assert_eq!(maturity.format("%Y-%m-%d").to_string(), "2024-06-01");
    }

    #[test]
    fn savings_flag_is_detected() {
        let json = r#"{"id":"9","bankName":"Mox","principal":5000,"currency":"HKD","maturityDate":"","interestRate":1.0,"actionOnMaturity":"","autoRoll":false,"type":"Savings"}"#;
        let deposit: FixedDeposit = serde_json::from_str(json).unwrap();
        assert!(deposit.is_savings());
        assert!(deposit.maturity().is_none());
    }

    #[test]
    fn unknown_type_survives_reload() {
        let json = r#"{"id":"4","bankName":"DBS","principal":8000,"currency":"HKD","maturityDate":"2026-01-31","interestRate":3.2,"actionOnMaturity":"","autoRoll":false,"type":"Structured"}"#;
        let deposit: FixedDeposit = serde_json::from_str(json).unwrap();
        assert_eq!(deposit.kind, Some(DepositKind::Other("Structured".to_owned())));
        assert!(!deposit.is_savings());
        let written = serde_json::to_value(&deposit).unwrap();
        assert_eq!(written["type"], "Structured");
    }

    #[test]
    fn plain_date_maturity_parses() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let deposit = FixedDeposit::new("HSBC", 1000.0, Currency::Hkd, 3.5, date);
        assert_eq!(deposit.maturity_date, "2025-03-15");
        assert_eq!(deposit.maturity().unwrap().date_naive(), date);
    }

    #[test]
    fn serialize_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let mut deposit = FixedDeposit::new("BOC", 2500.0, Currency::Aud, 4.25, date);
        deposit.kind = Some(DepositKind::Term);
        let json = serde_json::to_string(&deposit).unwrap();
        let back: FixedDeposit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, deposit);
    }
}
