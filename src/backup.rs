//! Whole-document backup and restore.
//!
//! A backup is the persisted JSON document itself, so a file written by
//! [`export_json`] can also be dropped in place of the storage file.

use std::io;

use serde_json::Value;

use crate::error::{Result, WealthError};
use crate::models::AppState;

/// Column headers of the CSV export.
pub const CSV_HEADERS: [&str; 6] = [
    "Type",
    "Name",
    "Currency",
    "Balance/Principal",
    "Symbol/Bank",
    "Maturity",
];

/// Value of the `Type` column for deposit rows.
const DEPOSIT_ROW_TYPE: &str = "FixedDeposit";

/// Serializes the full document as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`WealthError::Serialization`] if serialization fails.
#[inline]
pub fn export_json(state: &AppState) -> Result<String> {
    serde_json::to_string_pretty(state).map_err(WealthError::from)
}

/// Parses and validates a backup.
///
/// The document must be a JSON object whose `accounts` and
/// `fixedDeposits` fields are arrays; anything else is rejected without
/// being applied.
///
/// # Errors
///
/// Returns [`WealthError::InvalidBackup`] if the text is not JSON or lacks
/// the required arrays, and [`WealthError::Serialization`] if an entry in
/// them does not match the document schema.
#[inline]
pub fn import_json(text: &str) -> Result<AppState> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| WealthError::InvalidBackup(format!("not valid JSON: {err}")))?;
    for field in ["accounts", "fixedDeposits"] {
        if !value.get(field).is_some_and(Value::is_array) {
            return Err(WealthError::InvalidBackup(format!(
                "missing `{field}` array"
            )));
        }
    }
    serde_json::from_value(value).map_err(WealthError::from)
}

/// Writes accounts then deposits as CSV rows to `writer`.
///
/// # Errors
///
/// Returns [`WealthError::Csv`] if writing fails.
#[inline]
pub fn export_csv<W: io::Write>(state: &AppState, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADERS)?;
    for account in &state.accounts {
        wtr.write_record([
            account.kind.as_str(),
            account.name.as_str(),
            account.currency.code(),
            account.balance.to_string().as_str(),
            account.symbol.as_deref().unwrap_or_default(),
            "",
        ])?;
    }
    for deposit in &state.fixed_deposits {
        wtr.write_record([
            DEPOSIT_ROW_TYPE,
            deposit.bank_name.as_str(),
            deposit.currency.code(),
            deposit.principal.to_string().as_str(),
            "",
            deposit.maturity_date.as_str(),
        ])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}
