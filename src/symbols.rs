//! Ticker normalisation.
//!
//! Users type tickers loosely (`700`, `anz`, ` ivv `). These helpers turn
//! them into the exchange-suffixed form the quote service understands and
//! pick the currency a holding is listed in.

use crate::models::Currency;

/// ASX tickers recognised without an exchange suffix.
const COMMON_ASX_TICKERS: [&str; 10] = [
    "ANZ", "CBA", "NAB", "WBC", "MQG", "BHP", "RIO", "FMG", "NST", "PLS",
];

/// Hong Kong exchange suffix.
const HK_SUFFIX: &str = ".HK";

/// Australian exchange suffix.
const AX_SUFFIX: &str = ".AX";

/// Normalises a typed ticker.
///
/// - surrounding whitespace is trimmed and letters are upper-cased;
/// - anything already carrying an exchange suffix is kept as is;
/// - all-digit codes are HKEX codes, zero-padded to four digits (`700` →
///   `0700.HK`);
/// - a short list of common ASX tickers gets `.AX`;
/// - everything else is assumed to be a US listing and returned unchanged.
#[inline]
#[must_use]
pub fn format_stock_symbol(input: &str) -> String {
    let symbol = input.trim().to_uppercase();
    if symbol.is_empty() || symbol.contains('.') {
        return symbol;
    }
    if symbol.bytes().all(|byte| byte.is_ascii_digit()) {
        return format!("{symbol:0>4}{HK_SUFFIX}");
    }
    if COMMON_ASX_TICKERS.contains(&symbol.as_str()) {
        return format!("{symbol}{AX_SUFFIX}");
    }
    symbol
}

/// Currency a normalised ticker trades in.
#[inline]
#[must_use]
pub fn listing_currency(symbol: &str) -> Currency {
    let upper = symbol.trim().to_uppercase();
    if upper.ends_with(AX_SUFFIX) {
        Currency::Aud
    } else if upper.ends_with(HK_SUFFIX) {
        Currency::Hkd
    } else {
        Currency::Usd
    }
}
