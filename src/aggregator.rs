//! Wealth aggregation and passive-income projection.
//!
//! Every function here is a pure computation over in-memory holdings: no
//! I/O, no clock reads except [`upsert_current_month`], and no error path.
//! Lookups that miss (unknown currency, missing index price) fall back to a
//! neutral value instead of failing, and every division is guarded.
//!
//! All totals are expressed in the base currency, HKD, using the fixed rate
//! table below. The rates are constants; staleness is accepted.

use std::collections::BTreeMap;

use crate::models::{
    Account, AccountKind, Currency, FixedDeposit, HistoricalDataPoint, MonthKey,
};

/// HKD per AUD.
pub const AUD_TO_HKD: f64 = 5.1;

/// HKD per USD.
pub const USD_TO_HKD: f64 = 7.8;

/// Assumed nominal annual rate on cash balances, in percent.
pub const CASH_NOMINAL_RATE: f64 = 0.5;

/// Assumed monthly expenses when displaying in HKD.
pub const MONTHLY_EXPENSE_TARGET_HKD: f64 = 15_000.0;

/// Assumed monthly expenses when displaying in AUD.
pub const MONTHLY_EXPENSE_TARGET_AUD: f64 = 2_900.0;

/// Index price assumed for the first history month when the table has none.
pub const BENCHMARK_FALLBACK_START_PRICE: f64 = 380.0;

/// Monthly closing prices of VOO (S&P 500 ETF) in USD, keyed by month.
const VOO_MONTHLY_CLOSE: [(&str, f64); 26] = [
    ("2023-01", 366.59),
    ("2023-02", 356.68),
    ("2023-03", 370.16),
    ("2023-04", 376.62),
    ("2023-05", 378.20),
    ("2023-06", 403.62),
    ("2023-07", 416.58),
    ("2023-08", 409.68),
    ("2023-09", 390.17),
    ("2023-10", 381.01),
    ("2023-11", 415.69),
    ("2023-12", 434.33),
    ("2024-01", 441.74),
    ("2024-02", 468.03),
    ("2024-03", 483.07),
    ("2024-04", 463.63),
    ("2024-05", 486.27),
    ("2024-06", 503.20),
    ("2024-07", 508.62),
    ("2024-08", 520.25),
    ("2024-09", 531.02),
    ("2024-10", 526.47),
    ("2024-11", 557.06),
    ("2024-12", 550.84),
    ("2025-01", 565.20),
    ("2025-02", 572.10),
];

// ── Currency normalization ──────────────────────────────────────────────

/// HKD value of one unit of `currency`. Unknown codes convert 1:1.
#[inline]
#[must_use]
pub const fn rate_to_base(currency: &Currency) -> f64 {
    match *currency {
        Currency::Aud => AUD_TO_HKD,
        Currency::Usd => USD_TO_HKD,
        Currency::Hkd | Currency::Other(_) => 1.0,
    }
}

/// Converts `amount` in `currency` to HKD.
#[inline]
#[must_use]
pub fn to_base(amount: f64, currency: &Currency) -> f64 {
    amount * rate_to_base(currency)
}

/// Converts an HKD `amount` into `currency` for display.
#[inline]
#[must_use]
pub fn from_base(amount: f64, currency: &Currency) -> f64 {
    amount / rate_to_base(currency)
}

/// Rounds to the nearest whole unit, halves away from zero.
#[allow(
    clippy::cast_possible_truncation,
    reason = "net worth is far below i64::MAX whole units"
)]
#[inline]
#[must_use]
pub fn round_to_unit(value: f64) -> i64 {
    value.round() as i64
}

// ── Net worth ───────────────────────────────────────────────────────────

/// Which fixed deposits count toward net worth.
///
/// The synced and dashboard figure leaves out deposits flagged as
/// [`crate::models::DepositKind::Savings`]; allocation views count every
/// holding. Callers pick one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetWorthPolicy {
    /// Count deposits flagged as non-term savings.
    pub include_savings_deposits: bool,
}

impl NetWorthPolicy {
    /// Figure pushed to the remote store, shown on the dashboard and
    /// recorded in history.
    pub const SYNC: Self = Self {
        include_savings_deposits: false,
    };

    /// Every recorded holding.
    pub const ALL_HOLDINGS: Self = Self {
        include_savings_deposits: true,
    };

    /// Returns `true` when `deposit` counts under this policy.
    #[inline]
    #[must_use]
    pub fn counts(self, deposit: &FixedDeposit) -> bool {
        self.include_savings_deposits || !deposit.is_savings()
    }
}

impl Default for NetWorthPolicy {
    #[inline]
    fn default() -> Self {
        Self::SYNC
    }
}

/// Unrounded HKD total of all accounts and the deposits `policy` admits.
#[inline]
#[must_use]
pub fn total_in_base(
    accounts: &[Account],
    deposits: &[FixedDeposit],
    policy: NetWorthPolicy,
) -> f64 {
    let account_total: f64 = accounts
        .iter()
        .map(|acc| to_base(acc.balance, &acc.currency))
        .sum();
    let deposit_total: f64 = deposits
        .iter()
        .filter(|fd| policy.counts(fd))
        .map(|fd| to_base(fd.principal, &fd.currency))
        .sum();
    account_total + deposit_total
}

/// Net worth in whole HKD.
#[inline]
#[must_use]
pub fn compute_net_worth(
    accounts: &[Account],
    deposits: &[FixedDeposit],
    policy: NetWorthPolicy,
) -> i64 {
    round_to_unit(total_in_base(accounts, deposits, policy))
}

// ── Subtotals and weighted yield ────────────────────────────────────────

/// Category a holding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldingCategory {
    /// Cash account.
    Cash,
    /// Stock account.
    Stock,
    /// Fixed deposit.
    Deposit,
}

/// Uniform view over an account or a deposit for filtering and weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Holding<'a> {
    /// Holding category.
    pub category: HoldingCategory,
    /// Original currency.
    pub currency: &'a Currency,
    /// Value in the original currency.
    pub native_value: f64,
    /// Value in HKD.
    pub base_value: f64,
    /// Annual yield percentage: dividend yield for stocks, interest rate
    /// for deposits, the assumed nominal rate for cash.
    pub yield_percent: f64,
}

impl<'a> Holding<'a> {
    /// Views an account.
    #[inline]
    #[must_use]
    pub fn from_account(account: &'a Account) -> Self {
        let (category, yield_percent) = match account.kind {
            AccountKind::Cash => (HoldingCategory::Cash, CASH_NOMINAL_RATE),
            AccountKind::Stock => (HoldingCategory::Stock, account.yield_percent()),
        };
        Self {
            category,
            currency: &account.currency,
            native_value: account.balance,
            base_value: to_base(account.balance, &account.currency),
            yield_percent,
        }
    }

    /// Views a fixed deposit.
    #[inline]
    #[must_use]
    pub fn from_deposit(deposit: &'a FixedDeposit) -> Self {
        Self {
            category: HoldingCategory::Deposit,
            currency: &deposit.currency,
            native_value: deposit.principal,
            base_value: to_base(deposit.principal, &deposit.currency),
            yield_percent: deposit.interest_rate,
        }
    }

    /// Projected monthly income in HKD.
    #[inline]
    #[must_use]
    pub fn monthly_income(&self) -> f64 {
        monthly_income(self.base_value, self.yield_percent)
    }
}

/// Collects every account plus the deposits `policy` admits.
#[inline]
#[must_use]
pub fn holdings<'a>(
    accounts: &'a [Account],
    deposits: &'a [FixedDeposit],
    policy: NetWorthPolicy,
) -> Vec<Holding<'a>> {
    accounts
        .iter()
        .map(Holding::from_account)
        .chain(
            deposits
                .iter()
                .filter(|fd| policy.counts(fd))
                .map(Holding::from_deposit),
        )
        .collect()
}

/// Value-weighted average of `(value, yield)` pairs; 0 when the values sum
/// to 0.
#[inline]
#[must_use]
pub fn weighted_yield<I: IntoIterator<Item = (f64, f64)>>(items: I) -> f64 {
    let (weighted, total) = items
        .into_iter()
        .fold((0.0_f64, 0.0_f64), |(weighted, total), (value, rate)| {
            (weighted + value * rate, total + value)
        });
    if total == 0.0 { 0.0 } else { weighted / total }
}

/// Sum and weighted yield of a set of holdings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Subtotal {
    /// Sum of values in the original currency. Only meaningful when every
    /// matched holding shares one currency.
    pub native_total: f64,
    /// Sum of values in HKD.
    pub total: f64,
    /// Value-weighted average yield percentage.
    pub weighted_yield: f64,
}

/// Subtotal over the holdings matching `predicate`.
#[inline]
#[must_use]
pub fn subtotal<P>(holdings: &[Holding<'_>], predicate: P) -> Subtotal
where
    P: Fn(&Holding<'_>) -> bool,
{
    let matched: Vec<&Holding<'_>> = holdings.iter().filter(|h| predicate(h)).collect();
    Subtotal {
        native_total: matched.iter().map(|h| h.native_value).sum(),
        total: matched.iter().map(|h| h.base_value).sum(),
        weighted_yield: weighted_yield(matched.iter().map(|h| (h.base_value, h.yield_percent))),
    }
}

/// Listing region of a holding, identified by its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Hong Kong (HKD).
    Hk,
    /// Australia (AUD).
    Au,
    /// United States (USD).
    Us,
}

impl Region {
    /// All regions in display order.
    pub const ALL: [Self; 3] = [Self::Hk, Self::Au, Self::Us];

    /// Currency of the region.
    #[inline]
    #[must_use]
    pub const fn currency(self) -> Currency {
        match self {
            Self::Hk => Currency::Hkd,
            Self::Au => Currency::Aud,
            Self::Us => Currency::Usd,
        }
    }

    /// Short label.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hk => "HK",
            Self::Au => "AU",
            Self::Us => "US",
        }
    }
}

/// Dashboard grouping of holdings.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetGroups {
    /// Cash subtotal per region.
    pub banking: Vec<(Region, Subtotal)>,
    /// Stock subtotal per region, weighted by dividend yield.
    pub stocks: Vec<(Region, Subtotal)>,
    /// All cash, weighted at the assumed nominal rate.
    pub cash: Subtotal,
    /// Deposits admitted by the policy, weighted by interest rate.
    pub deposits: Subtotal,
}

impl AssetGroups {
    /// Stock subtotal for one region.
    #[inline]
    #[must_use]
    pub fn stocks_in(&self, region: Region) -> Subtotal {
        lookup_region(&self.stocks, region)
    }

    /// Cash subtotal for one region.
    #[inline]
    #[must_use]
    pub fn banking_in(&self, region: Region) -> Subtotal {
        lookup_region(&self.banking, region)
    }
}

/// Finds a region's subtotal, empty when absent.
fn lookup_region(groups: &[(Region, Subtotal)], region: Region) -> Subtotal {
    groups
        .iter()
        .find(|&&(candidate, _)| candidate == region)
        .map(|&(_, sub)| sub)
        .unwrap_or_default()
}

/// Builds the dashboard grouping.
#[inline]
#[must_use]
pub fn asset_groups(
    accounts: &[Account],
    deposits: &[FixedDeposit],
    policy: NetWorthPolicy,
) -> AssetGroups {
    let all = holdings(accounts, deposits, policy);
    let by_region = |category: HoldingCategory| -> Vec<(Region, Subtotal)> {
        Region::ALL
            .iter()
            .map(|&region| {
                let currency = region.currency();
                let sub = subtotal(&all, |h| h.category == category && *h.currency == currency);
                (region, sub)
            })
            .collect()
    };
    AssetGroups {
        banking: by_region(HoldingCategory::Cash),
        stocks: by_region(HoldingCategory::Stock),
        cash: subtotal(&all, |h| h.category == HoldingCategory::Cash),
        deposits: subtotal(&all, |h| h.category == HoldingCategory::Deposit),
    }
}

// ── Passive income ──────────────────────────────────────────────────────

/// Monthly income from `value` at an annual `rate_percent`.
#[inline]
#[must_use]
pub fn monthly_income(value: f64, rate_percent: f64) -> f64 {
    value * (rate_percent / 100.0) / 12.0
}

/// One income-producing holding.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeLine {
    /// Bank name, ticker, or account name.
    pub name: String,
    /// Original currency.
    pub currency: Currency,
    /// Principal or balance in HKD.
    pub base_value: f64,
    /// Rate or yield percentage.
    pub yield_percent: f64,
    /// Projected monthly income in HKD.
    pub monthly: f64,
}

/// Monthly income per category, in HKD.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IncomeByCategory {
    /// Fixed-deposit interest.
    pub deposits: f64,
    /// Stock dividends.
    pub dividends: f64,
    /// Assumed interest on cash.
    pub cash: f64,
}

/// Passive-income projection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PassiveIncome {
    /// Total monthly income in HKD.
    pub total: f64,
    /// Split by category.
    pub by_category: IncomeByCategory,
    /// HKD income keyed by each holding's original currency.
    pub by_currency_source: BTreeMap<Currency, f64>,
    /// Deposits, highest monthly income first.
    pub deposit_lines: Vec<IncomeLine>,
    /// Stocks, highest monthly income first.
    pub stock_lines: Vec<IncomeLine>,
    /// Principal-weighted deposit rate.
    pub weighted_deposit_rate: f64,
    /// Balance-weighted dividend yield.
    pub weighted_stock_yield: f64,
    /// Sum of deposit principals in HKD.
    pub deposit_principal: f64,
    /// Sum of stock balances in HKD.
    pub stock_balance: f64,
    /// Sum of cash balances in HKD.
    pub cash_reserve: f64,
}

/// Projects monthly passive income from every account and deposit.
#[inline]
#[must_use]
pub fn project_monthly_income(accounts: &[Account], deposits: &[FixedDeposit]) -> PassiveIncome {
    let mut by_currency_source: BTreeMap<Currency, f64> = BTreeMap::new();
    let mut credit = |currency: &Currency, monthly: f64| {
        *by_currency_source.entry(currency.clone()).or_insert(0.0) += monthly;
    };

    let mut deposit_lines: Vec<IncomeLine> = deposits
        .iter()
        .map(|fd| {
            let holding = Holding::from_deposit(fd);
            IncomeLine {
                name: fd.bank_name.clone(),
                currency: fd.currency.clone(),
                base_value: holding.base_value,
                yield_percent: holding.yield_percent,
                monthly: holding.monthly_income(),
            }
        })
        .collect();

    let mut stock_lines: Vec<IncomeLine> = accounts
        .iter()
        .filter(|acc| acc.is_stock())
        .map(|acc| {
            let holding = Holding::from_account(acc);
            IncomeLine {
                name: acc.symbol.clone().unwrap_or_else(|| acc.name.clone()),
                currency: acc.currency.clone(),
                base_value: holding.base_value,
                yield_percent: holding.yield_percent,
                monthly: holding.monthly_income(),
            }
        })
        .collect();

    let mut cash_reserve = 0.0_f64;
    let mut cash_monthly = 0.0_f64;
    for holding in accounts
        .iter()
        .filter(|acc| !acc.is_stock())
        .map(Holding::from_account)
    {
        cash_reserve += holding.base_value;
        cash_monthly += holding.monthly_income();
        credit(holding.currency, holding.monthly_income());
    }
    for line in deposit_lines.iter().chain(stock_lines.iter()) {
        credit(&line.currency, line.monthly);
    }

    deposit_lines.sort_by(|a, b| b.monthly.total_cmp(&a.monthly));
    stock_lines.sort_by(|a, b| b.monthly.total_cmp(&a.monthly));

    let by_category = IncomeByCategory {
        deposits: deposit_lines.iter().map(|line| line.monthly).sum(),
        dividends: stock_lines.iter().map(|line| line.monthly).sum(),
        cash: cash_monthly,
    };

    PassiveIncome {
        total: by_category.deposits + by_category.dividends + by_category.cash,
        by_category,
        by_currency_source,
        weighted_deposit_rate: weighted_yield(
            deposit_lines.iter().map(|l| (l.base_value, l.yield_percent)),
        ),
        weighted_stock_yield: weighted_yield(
            stock_lines.iter().map(|l| (l.base_value, l.yield_percent)),
        ),
        deposit_principal: deposit_lines.iter().map(|l| l.base_value).sum(),
        stock_balance: stock_lines.iter().map(|l| l.base_value).sum(),
        cash_reserve,
        deposit_lines,
        stock_lines,
    }
}

/// Assumed monthly expenses expressed in `display`.
#[inline]
#[must_use]
pub fn expense_target(display: &Currency) -> f64 {
    match *display {
        Currency::Hkd => MONTHLY_EXPENSE_TARGET_HKD,
        Currency::Aud => MONTHLY_EXPENSE_TARGET_AUD,
        Currency::Usd | Currency::Other(_) => from_base(MONTHLY_EXPENSE_TARGET_HKD, display),
    }
}

/// Share of assumed monthly expenses covered by passive income, capped at
/// 100.
#[inline]
#[must_use]
pub fn freedom_progress(total_monthly_base: f64, display: &Currency) -> f64 {
    let covered = from_base(total_monthly_base, display) / expense_target(display) * 100.0;
    covered.min(100.0)
}

// ── History ─────────────────────────────────────────────────────────────

/// Returns `history` with the point for `month` set to `total`.
///
/// An existing point for the month is overwritten in place; otherwise a
/// new point is appended. Order is otherwise preserved and nothing is
/// sorted.
#[inline]
#[must_use]
pub fn upsert_month(
    history: &[HistoricalDataPoint],
    month: &MonthKey,
    total: f64,
) -> Vec<HistoricalDataPoint> {
    let mut next = history.to_vec();
    match next.iter_mut().find(|point| point.date == *month) {
        Some(point) => point.total_value_hkd = total,
        None => next.push(HistoricalDataPoint::new(month.clone(), total)),
    }
    next
}

/// [`upsert_month`] for the current UTC month.
#[inline]
#[must_use]
pub fn upsert_current_month(history: &[HistoricalDataPoint], total: f64) -> Vec<HistoricalDataPoint> {
    upsert_month(history, &MonthKey::current(), total)
}

// ── Benchmark ───────────────────────────────────────────────────────────

/// VOO monthly close for `month`, if the built-in table has it.
#[inline]
#[must_use]
pub fn voo_monthly_close(month: &str) -> Option<f64> {
    VOO_MONTHLY_CLOSE
        .iter()
        .find(|&&(key, _)| key == month)
        .map(|&(_, price)| price)
}

/// One month of the benchmark comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkPoint {
    /// Month.
    pub date: MonthKey,
    /// Recorded net worth.
    pub actual: f64,
    /// Value of the first month's net worth had it tracked the index,
    /// rounded to a whole unit.
    pub hypothetical: f64,
    /// `actual` minus the unrounded hypothetical value.
    pub diff: f64,
}

/// Parallel series comparing recorded net worth with the index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BenchmarkSeries {
    /// One point per history entry, same order.
    pub points: Vec<BenchmarkPoint>,
    /// Latest actual is at least the latest hypothetical.
    pub beating_market: bool,
}

impl BenchmarkSeries {
    /// Last point of the series.
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&BenchmarkPoint> {
        self.points.last()
    }
}

/// Compares `history` with a parallel investment in the index priced by
/// `price_at`. Months without a price keep the initial net worth.
#[inline]
#[must_use]
pub fn benchmark_series<F>(history: &[HistoricalDataPoint], price_at: F) -> BenchmarkSeries
where
    F: Fn(&str) -> Option<f64>,
{
    let Some(first) = history.first() else {
        return BenchmarkSeries::default();
    };
    let start_price = price_at(first.date.as_str())
        .filter(|&price| price > 0.0)
        .unwrap_or(BENCHMARK_FALLBACK_START_PRICE);
    let initial = first.total_value_hkd;

    let points: Vec<BenchmarkPoint> = history
        .iter()
        .map(|point| {
            let hypothetical = price_at(point.date.as_str())
                .map_or(initial, |price| initial * (price / start_price));
            BenchmarkPoint {
                date: point.date.clone(),
                actual: point.total_value_hkd,
                hypothetical: hypothetical.round(),
                diff: point.total_value_hkd - hypothetical,
            }
        })
        .collect();
    let beating_market = points.last().is_some_and(|latest| latest.diff >= 0.0);
    BenchmarkSeries {
        points,
        beating_market,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DepositKind, NaiveDate};

    fn deposit(principal: f64, currency: Currency, rate: f64) -> FixedDeposit {
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        FixedDeposit::new("Bank", principal, currency, rate, date)
    }

    fn dividend_stock(currency: Currency, quantity: f64, price: f64, yield_pct: f64) -> Account {
        let mut account = Account::stock("Broker", "SYM", currency, quantity, price);
        account.dividend_yield = Some(yield_pct);
        account
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn to_base_uses_fixed_rates() {
        assert!(close(to_base(100.0, &Currency::Usd), 780.0));
        assert!(close(to_base(100.0, &Currency::Aud), 510.0));
        assert!(close(to_base(100.0, &Currency::Hkd), 100.0));
    }

    #[test]
    fn unknown_currency_passes_through() {
        let eur = Currency::Other("EUR".to_owned());
        assert!(close(to_base(42.0, &eur), 42.0));
        assert!(close(from_base(42.0, &eur), 42.0));
    }

    #[test]
    fn net_worth_of_nothing_is_zero() {
        assert_eq!(compute_net_worth(&[], &[], NetWorthPolicy::SYNC), 0);
    }

    #[test]
    fn net_worth_mixed_cash() {
        let accounts = [
            Account::cash("HK", Currency::Hkd, 1000.0),
            Account::cash("US", Currency::Usd, 100.0),
        ];
        assert_eq!(compute_net_worth(&accounts, &[], NetWorthPolicy::SYNC), 1780);
    }

    #[test]
    fn net_worth_matches_manual_sum_and_rounds() {
        let accounts = [
            Account::cash("AU", Currency::Aud, 33.3),
            Account::stock("IB", "0700.HK", Currency::Hkd, 100.0, 450.0),
        ];
        let deposits = [deposit(1000.4, Currency::Usd, 4.0)];
        let manual: f64 = 33.3 * 5.1 + 45_000.0 + 1000.4 * 7.8;
        assert_eq!(
            compute_net_worth(&accounts, &deposits, NetWorthPolicy::SYNC),
            manual.round() as i64
        );
    }

    #[test]
    fn savings_deposits_follow_policy() {
        let mut savings = deposit(50_000.0, Currency::Hkd, 1.0);
        savings.kind = Some(DepositKind::Savings);
        let deposits = [deposit(100_000.0, Currency::Hkd, 4.0), savings];
        assert_eq!(compute_net_worth(&[], &deposits, NetWorthPolicy::SYNC), 100_000);
        assert_eq!(
            compute_net_worth(&[], &deposits, NetWorthPolicy::ALL_HOLDINGS),
            150_000
        );
        assert_eq!(NetWorthPolicy::default(), NetWorthPolicy::SYNC);
    }

    #[test]
    fn weighted_yield_single_holding_is_its_own_yield() {
        assert!(close(weighted_yield([(5000.0, 3.2)]), 3.2));
    }

    #[test]
    fn weighted_yield_zero_value_is_zero() {
        assert!(close(weighted_yield([(0.0, 5.0), (0.0, 7.0)]), 0.0));
        assert!(close(weighted_yield(core::iter::empty()), 0.0));
    }

    #[test]
    fn weighted_yield_weights_by_value() {
        assert!(close(weighted_yield([(100.0, 2.0), (300.0, 6.0)]), 5.0));
    }

    #[test]
    fn asset_groups_split_by_region() {
        let accounts = [
            Account::cash("HSBC", Currency::Hkd, 150_000.0),
            Account::cash("CBA", Currency::Aud, 5000.0),
            dividend_stock(Currency::Hkd, 100.0, 400.0, 2.0),
            dividend_stock(Currency::Hkd, 100.0, 200.0, 5.0),
            dividend_stock(Currency::Aud, 10.0, 100.0, 4.0),
        ];
        let deposits = [deposit(100_000.0, Currency::Hkd, 4.1)];
        let groups = asset_groups(&accounts, &deposits, NetWorthPolicy::SYNC);

        let hk = groups.stocks_in(Region::Hk);
        assert!(close(hk.total, 60_000.0));
        assert!(close(hk.weighted_yield, 3.0));

        let au = groups.stocks_in(Region::Au);
        assert!(close(au.native_total, 1000.0));
        assert!(close(au.total, 5100.0));
        assert!(close(au.weighted_yield, 4.0));

        assert_eq!(groups.stocks_in(Region::Us), Subtotal::default());
        assert!(close(groups.banking_in(Region::Au).native_total, 5000.0));
        assert!(close(groups.cash.weighted_yield, CASH_NOMINAL_RATE));
        assert!(close(groups.deposits.weighted_yield, 4.1));
    }

    #[test]
    fn deposit_income_example() {
        let income = project_monthly_income(&[], &[deposit(120_000.0, Currency::Hkd, 4.0)]);
        assert!(close(income.total, 400.0));
        assert!(close(income.by_category.deposits, 400.0));
        assert!(close(income.weighted_deposit_rate, 4.0));
    }

    #[test]
    fn income_sums_all_categories() {
        let accounts = [
            Account::cash("HSBC", Currency::Hkd, 240_000.0),
            dividend_stock(Currency::Usd, 100.0, 100.0, 6.0),
        ];
        let deposits = [deposit(10_000.0, Currency::Aud, 3.0)];
        let income = project_monthly_income(&accounts, &deposits);

        let cash = 240_000.0 * 0.005 / 12.0;
        let dividends = 78_000.0 * 0.06 / 12.0;
        let interest = 51_000.0 * 0.03 / 12.0;
        assert!(close(income.by_category.cash, cash));
        assert!(close(income.by_category.dividends, dividends));
        assert!(close(income.by_category.deposits, interest));
        assert!(close(income.total, cash + dividends + interest));
        assert!(close(income.cash_reserve, 240_000.0));
    }

    #[test]
    fn income_source_keyed_by_holding_currency() {
        let accounts = [
            Account::cash("HSBC", Currency::Hkd, 120_000.0),
            dividend_stock(Currency::Usd, 100.0, 100.0, 6.0),
        ];
        let income = project_monthly_income(&accounts, &[deposit(60_000.0, Currency::Usd, 2.0)]);
        let usd = income.by_currency_source.get(&Currency::Usd).copied().unwrap();
        assert!(close(usd, 78_000.0 * 0.06 / 12.0 + 468_000.0 * 0.02 / 12.0));
        let hkd = income.by_currency_source.get(&Currency::Hkd).copied().unwrap();
        assert!(close(hkd, 50.0));
        assert!(!income.by_currency_source.contains_key(&Currency::Aud));
        let sum: f64 = income.by_currency_source.values().sum();
        assert!(close(sum, income.total));
    }

    #[test]
    fn income_lines_sorted_descending() {
        let deposits = [
            deposit(10_000.0, Currency::Hkd, 1.0),
            deposit(10_000.0, Currency::Hkd, 5.0),
        ];
        let income = project_monthly_income(&[], &deposits);
        assert!(income.deposit_lines[0].monthly > income.deposit_lines[1].monthly);
    }

    #[test]
    fn freedom_progress_is_capped() {
        assert!(close(freedom_progress(7_500.0, &Currency::Hkd), 50.0));
        assert!(close(freedom_progress(1_000_000.0, &Currency::Hkd), 100.0));
        let aud = freedom_progress(2_900.0 * AUD_TO_HKD, &Currency::Aud);
        assert!(close(aud, 100.0));
    }

    #[test]
    fn upsert_twice_same_month_keeps_one_entry() {
        let month = MonthKey::new("2024-05");
        let once = upsert_month(&[], &month, 100.0);
        let twice = upsert_month(&once, &month, 200.0);
        assert_eq!(twice.len(), 1);
        assert!(close(twice[0].total_value_hkd, 200.0));
    }

    #[test]
    fn upsert_different_months_appends() {
        let first = upsert_month(&[], &MonthKey::new("2024-05"), 100.0);
        let second = upsert_month(&first, &MonthKey::new("2024-06"), 200.0);
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].date.as_str(), "2024-06");
    }

    #[test]
    fn upsert_does_not_sort() {
        let history = vec![HistoricalDataPoint::new(MonthKey::new("2024-09"), 1.0)];
        let next = upsert_month(&history, &MonthKey::new("2024-01"), 2.0);
        assert_eq!(next[0].date.as_str(), "2024-09");
        assert_eq!(next[1].date.as_str(), "2024-01");
    }

    #[test]
    fn upsert_current_month_uses_clock() {
        let next = upsert_current_month(&[], 10.0);
        assert_eq!(next[0].date, MonthKey::current());
    }

    #[test]
    fn benchmark_example() {
        let history = vec![
            HistoricalDataPoint::new(MonthKey::new("2030-01"), 100_000.0),
            HistoricalDataPoint::new(MonthKey::new("2030-02"), 110_000.0),
        ];
        let series = benchmark_series(&history, |month| match month {
            "2030-02" => Some(400.0),
            _ => None,
        });
        let latest = series.latest().unwrap();
        assert!(close(latest.hypothetical, 105_263.0));
        assert!(series.beating_market);
        assert!(close(series.points[0].hypothetical, 100_000.0));
    }

    #[test]
    fn benchmark_missing_month_keeps_initial() {
        let history = vec![
            HistoricalDataPoint::new(MonthKey::new("2023-01"), 200_000.0),
            HistoricalDataPoint::new(MonthKey::new("2031-07"), 150_000.0),
        ];
        let series = benchmark_series(&history, voo_monthly_close);
        assert!(close(series.points[1].hypothetical, 200_000.0));
        assert!(!series.beating_market);
    }

    #[test]
    fn benchmark_of_empty_history() {
        let series = benchmark_series(&[], voo_monthly_close);
        assert!(series.points.is_empty());
        assert!(!series.beating_market);
    }

    #[test]
    fn voo_table_lookup() {
        assert_eq!(voo_monthly_close("2024-06"), Some(503.20));
        assert_eq!(voo_monthly_close("1999-01"), None);
    }
}
