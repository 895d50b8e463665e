//! Read-only views derived from the document.
//!
//! Everything here builds on [`crate::aggregator`] and is recomputed on
//! demand; nothing is persisted.

use chrono::{DateTime, Utc};

use crate::aggregator::{
    HoldingCategory, NetWorthPolicy, PassiveIncome, holdings, monthly_income, subtotal, to_base,
};
use crate::models::{Account, AppState, FixedDeposit, MonthKey};

/// Deposits maturing within this many days are listed on the dashboard.
pub const MATURITY_WATCH_DAYS: i64 = 30;

/// Deposits maturing within this many days are flagged as critical.
pub const MATURITY_CRITICAL_DAYS: i64 = 7;

/// Holdings not touched for longer than this are considered stale.
pub const STALE_AFTER_DAYS: i64 = 30;

/// Seconds per day.
const SECONDS_PER_DAY: i64 = 86_400;

/// Score multipliers: a share of net worth times the multiplier, capped.
const LIQUIDITY_WEIGHT: f64 = 400.0;
/// Multiplier for the stock share.
const GROWTH_WEIGHT: f64 = 150.0;
/// Multiplier for the deposit share.
const SAFETY_WEIGHT: f64 = 200.0;
/// Multiplier for annual passive income over net worth.
const YIELD_WEIGHT: f64 = 1500.0;
/// Points per recorded holding.
const DIVERSIFICATION_POINTS: f64 = 8.0;
/// Upper bound of every score.
const SCORE_CAP: f64 = 100.0;

// ── Allocation ──────────────────────────────────────────────────────────

/// HKD totals per category over every holding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Allocation {
    /// Cash accounts.
    pub cash: f64,
    /// Stock accounts.
    pub stocks: f64,
    /// Fixed deposits, savings included.
    pub deposits: f64,
}

impl Allocation {
    /// Sum of all categories.
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cash + self.stocks + self.deposits
    }

    /// `value` as a percentage of the total; 0 when nothing is held.
    #[inline]
    #[must_use]
    pub fn share(&self, value: f64) -> f64 {
        let total = self.total();
        if total == 0.0 { 0.0 } else { value / total * 100.0 }
    }
}

/// Splits every holding into cash, stock and deposit totals.
#[inline]
#[must_use]
pub fn allocation(accounts: &[Account], deposits: &[FixedDeposit]) -> Allocation {
    let all = holdings(accounts, deposits, NetWorthPolicy::ALL_HOLDINGS);
    let total_of = |category: HoldingCategory| subtotal(&all, |h| h.category == category).total;
    Allocation {
        cash: total_of(HoldingCategory::Cash),
        stocks: total_of(HoldingCategory::Stock),
        deposits: total_of(HoldingCategory::Deposit),
    }
}

// ── Monthly report ──────────────────────────────────────────────────────

/// Month-over-month snapshot summary.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReport {
    /// Month of the latest history point.
    pub month: Option<MonthKey>,
    /// Latest recorded net worth.
    pub current: f64,
    /// Previous recorded net worth; equals `current` with a single point.
    pub previous: f64,
    /// `current - previous`.
    pub net_change: f64,
    /// Change relative to `previous`; 0 when `previous` is not positive.
    pub change_percent: f64,
    /// Current holdings by category.
    pub allocation: Allocation,
    /// Monthly deposit interest in HKD.
    pub deposit_income: f64,
}

/// Builds the month-over-month report from the history and holdings.
#[inline]
#[must_use]
pub fn monthly_report(state: &AppState) -> MonthlyReport {
    let latest = state.history.last();
    let current = latest.map_or(0.0, |point| point.total_value_hkd);
    let previous = state
        .history
        .len()
        .checked_sub(2)
        .and_then(|idx| state.history.get(idx))
        .map_or(current, |point| point.total_value_hkd);
    let net_change = current - previous;
    let change_percent = if previous > 0.0 {
        net_change / previous * 100.0
    } else {
        0.0
    };
    let deposit_income = state
        .fixed_deposits
        .iter()
        .map(|fd| monthly_income(to_base(fd.principal, &fd.currency), fd.interest_rate))
        .sum();

    MonthlyReport {
        month: latest.map(|point| point.date.clone()),
        current,
        previous,
        net_change,
        change_percent,
        allocation: allocation(&state.accounts, &state.fixed_deposits),
        deposit_income,
    }
}

// ── Goal and health ─────────────────────────────────────────────────────

/// Net worth as a percentage of `goal`, capped at 100; 0 for a
/// non-positive goal.
#[inline]
#[must_use]
pub fn goal_progress(net_worth: f64, goal: f64) -> f64 {
    if goal <= 0.0 {
        return 0.0;
    }
    (net_worth / goal * 100.0).min(SCORE_CAP)
}

/// Portfolio shape scores, each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HealthScores {
    /// Cash share of net worth.
    pub liquidity: f64,
    /// Stock share of net worth.
    pub growth: f64,
    /// Deposit share of net worth.
    pub safety: f64,
    /// Annual passive income over net worth.
    pub income: f64,
    /// Number of distinct holdings.
    pub diversification: f64,
}

/// Scores the portfolio against `net_worth` (the latest history value).
///
/// A zero net worth is treated as 1 so an empty portfolio scores 0 rather
/// than dividing by zero.
#[inline]
#[must_use]
pub fn health_scores(income: &PassiveIncome, holding_count: usize, net_worth: f64) -> HealthScores {
    let denominator = if net_worth == 0.0 { 1.0 } else { net_worth };
    let score = |value: f64, weight: f64| (value / denominator * weight).min(SCORE_CAP);
    let count = f64::from(u32::try_from(holding_count).unwrap_or(u32::MAX));
    HealthScores {
        liquidity: score(income.cash_reserve, LIQUIDITY_WEIGHT),
        growth: score(income.stock_balance, GROWTH_WEIGHT),
        safety: score(income.deposit_principal, SAFETY_WEIGHT),
        income: score(income.total * 12.0, YIELD_WEIGHT),
        diversification: (count * DIVERSIFICATION_POINTS).min(SCORE_CAP),
    }
}

// ── Maturity watch and staleness ────────────────────────────────────────

/// A deposit close to (or past) maturity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaturityAlert<'a> {
    /// The deposit.
    pub deposit: &'a FixedDeposit,
    /// Whole days until maturity, rounded up; negative once overdue.
    pub days_left: i64,
    /// Maturity is at most [`MATURITY_CRITICAL_DAYS`] away.
    pub critical: bool,
}

/// Whole days from `now` until `until`, rounded up.
fn days_until_ceil(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (until - now).num_seconds();
    seconds.div_euclid(SECONDS_PER_DAY) + i64::from(seconds.rem_euclid(SECONDS_PER_DAY) != 0)
}

/// Deposits maturing at most `days` days after `now`, soonest first.
///
/// Deposits whose maturity date cannot be parsed are skipped.
#[inline]
#[must_use]
pub fn maturing_within(
    deposits: &[FixedDeposit],
    now: DateTime<Utc>,
    days: i64,
) -> Vec<MaturityAlert<'_>> {
    let mut alerts: Vec<(DateTime<Utc>, MaturityAlert<'_>)> = deposits
        .iter()
        .filter_map(|fd| {
            let maturity = fd.maturity()?;
            let days_left = days_until_ceil(maturity, now);
            (days_left <= days).then_some((
                maturity,
                MaturityAlert {
                    deposit: fd,
                    days_left,
                    critical: days_left <= MATURITY_CRITICAL_DAYS,
                },
            ))
        })
        .collect();
    alerts.sort_by_key(|&(maturity, _)| maturity);
    alerts.into_iter().map(|(_, alert)| alert).collect()
}

/// Whole days elapsed since `last_updated`, rounded down.
#[inline]
#[must_use]
pub fn days_since(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_updated).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Whether holdings have not been updated for over [`STALE_AFTER_DAYS`].
#[inline]
#[must_use]
pub fn is_stale(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    days_since(last_updated, now) > STALE_AFTER_DAYS
}
