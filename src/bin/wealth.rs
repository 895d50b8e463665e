//! CLI binary for recording holdings and reviewing net worth.

use std::fs;
use std::io::{self, BufRead as _, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use wealth_snapshot::aggregator::{
    NetWorthPolicy, PassiveIncome, Subtotal, freedom_progress, from_base, monthly_income,
    to_base, total_in_base,
};
use wealth_snapshot::client::SheetBlockingClient;
use wealth_snapshot::error::WealthError;
use wealth_snapshot::insights::{
    MATURITY_WATCH_DAYS, allocation, days_since, goal_progress, health_scores, is_stale,
    maturing_within, monthly_report,
};
use wealth_snapshot::models::{
    Account, AccountId, AccountKind, Currency, DepositId, DepositKind, FixedDeposit,
    NaiveDate, Quote, ScannedAsset,
};
use wealth_snapshot::scanner::StatementBlockingScanner;
use wealth_snapshot::storage::{BlockingStorage, FileStorage};
use wealth_snapshot::symbols::{format_stock_symbol, listing_currency};
use wealth_snapshot::sync::SyncStatus;
use wealth_snapshot::tracker::WealthTrackerBlocking;

/// Environment variable holding the remote store user id.
const USER_ID_ENV: &str = "WEALTH_USER_ID";

/// Environment variable holding the remote store endpoint.
const SYNC_URL_ENV: &str = "WEALTH_SYNC_URL";

/// Environment variable holding the Gemini API key.
const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Placeholder for empty cells.
const DASH: &str = "\u{2014}";

/// Wealth snapshot CLI: track cash, stocks and fixed deposits in HKD.
#[derive(Debug, Parser)]
#[command(name = "wealth", version, about)]
struct Cli {
    /// Override the storage directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Count savings deposits toward net worth.
    #[arg(long, global = true)]
    include_savings: bool,
    /// Show totals in AUD instead of HKD.
    #[arg(long, global = true)]
    aud: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Net worth, goal, passive income and holdings by region.
    Summary,
    /// List cash and stock accounts.
    Accounts,
    /// List fixed deposits.
    Deposits,
    /// Monthly net-worth history against the VOO benchmark.
    History,
    /// Record a cash account.
    AddCash {
        /// Bank or account name.
        name: String,
        /// Balance in the account currency.
        balance: f64,
        /// Account currency.
        #[arg(long, default_value = "HKD", value_parser = parse_currency)]
        currency: Currency,
    },
    /// Record a stock holding, priced from the remote store when possible.
    AddStock(AddStockArgs),
    /// Delete an account by id.
    RemoveAccount {
        /// Account id.
        id: String,
    },
    /// Record a fixed deposit.
    AddDeposit(AddDepositArgs),
    /// Delete a fixed deposit by id.
    RemoveDeposit {
        /// Deposit id.
        id: String,
    },
    /// Credit a matured deposit to a cash account and remove it.
    SettleDeposit {
        /// Deposit id.
        id: String,
        /// Cash account id receiving the proceeds.
        #[arg(long = "into", value_name = "ACCOUNT_ID")]
        target: String,
        /// Amount received (default: the principal).
        #[arg(long)]
        amount: Option<f64>,
    },
    /// Set the net-worth goal in HKD.
    SetGoal {
        /// Goal amount in HKD.
        amount: f64,
    },
    /// Re-price every stock holding from live quotes.
    RefreshPrices,
    /// Look up a live quote.
    Quote {
        /// Ticker; bare HK codes and common ASX tickers are completed.
        symbol: String,
    },
    /// Allocation, health scores and passive-income breakdown.
    Insights,
    /// Month-over-month report.
    Report,
    /// Push the current snapshot to the remote store.
    Sync,
    /// Extract holdings from a statement image.
    Scan {
        /// Image file (JPEG, PNG or WEBP).
        image: PathBuf,
        /// Record the extracted holdings instead of only listing them.
        #[arg(long)]
        yes: bool,
    },
    /// Write a JSON backup.
    Export {
        /// Output file (default: stdout).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Restore a JSON backup, replacing all current data.
    Import {
        /// Backup file.
        file: PathBuf,
        /// Skip the overwrite confirmation.
        #[arg(long)]
        yes: bool,
    },
    /// Write holdings as CSV.
    ExportCsv {
        /// Output file (default: stdout).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Arguments for the `add-stock` subcommand.
#[derive(Debug, Args)]
struct AddStockArgs {
    /// Ticker, e.g. `VOO`, `700` or `CBA`.
    symbol: String,
    /// Number of shares.
    quantity: f64,
    /// Broker name (default: the ticker).
    #[arg(long)]
    broker: Option<String>,
    /// Share price (default: live quote).
    #[arg(long)]
    price: Option<f64>,
    /// Dividend yield percentage (default: live quote).
    #[arg(long = "yield", value_name = "PERCENT")]
    dividend_yield: Option<f64>,
    /// Listing currency (default: derived from the ticker suffix).
    #[arg(long, value_parser = parse_currency)]
    currency: Option<Currency>,
}

/// Arguments for the `add-deposit` subcommand.
#[derive(Debug, Args)]
struct AddDepositArgs {
    /// Bank name.
    bank: String,
    /// Principal in the deposit currency.
    principal: f64,
    /// Annual interest rate in percent.
    #[arg(long)]
    rate: f64,
    /// Maturity date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    maturity: NaiveDate,
    /// Deposit currency.
    #[arg(long, default_value = "HKD", value_parser = parse_currency)]
    currency: Currency,
    /// Flag as a savings deposit rather than a term deposit.
    #[arg(long)]
    savings: bool,
    /// What happens at maturity.
    #[arg(long)]
    action: Option<String>,
    /// Rolls over automatically at maturity.
    #[arg(long)]
    auto_roll: bool,
}

/// Presentation options shared by the read commands.
#[derive(Debug, Clone, PartialEq, Eq)]
struct View {
    /// Currency totals are shown in.
    display: Currency,
}

impl View {
    /// Formats an HKD amount in the display currency, whole units.
    fn money(&self, value_hkd: f64) -> String {
        format!("{} {:.0}", self.display, from_base(value_hkd, &self.display))
    }
}

/// Parses a supported currency code for clap.
fn parse_currency(s: &str) -> Result<Currency, String> {
    let code = s.trim().to_uppercase();
    Currency::SUPPORTED
        .into_iter()
        .find(|currency| currency.code() == code)
        .ok_or_else(|| format!("unsupported currency `{s}` (expected HKD, AUD or USD)"))
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| err.to_string())
}

/// Reads a non-blank environment variable.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Prints an error line and returns a failure exit code.
fn fail(context: &str, err: &WealthError) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let sheet = match build_sheet_client() {
        Ok(sheet) => sheet,
        Err(err) => return fail("failed to configure the remote store", &err),
    };
    let scanner = match read_env(GEMINI_KEY_ENV) {
        Some(key) => match StatementBlockingScanner::builder().api_key(key).build() {
            Ok(scanner) => Some(scanner),
            Err(err) => return fail("failed to configure the scanner", &err),
        },
        None => None,
    };

    let storage = match create_storage(cli.data_dir) {
        Ok(storage) => storage,
        Err(err) => return fail("failed to initialize storage", &err),
    };

    let policy = if cli.include_savings {
        NetWorthPolicy::ALL_HOLDINGS
    } else {
        NetWorthPolicy::SYNC
    };
    let mut builder = WealthTrackerBlocking::builder().storage(storage).policy(policy);
    if let Some(client) = sheet {
        builder = builder.sheet_client(client);
    }
    if let Some(scan) = scanner {
        builder = builder.scanner(scan);
    }
    let mut tracker = match builder.build() {
        Ok(tracker) => tracker,
        Err(err) => return fail("failed to load data", &err),
    };

    let view = View {
        display: if cli.aud { Currency::Aud } else { Currency::Hkd },
    };
    dispatch(&mut tracker, &view, cli.command)
}

/// Builds the remote store client when both the user id and endpoint are
/// configured; `None` means working offline.
fn build_sheet_client() -> wealth_snapshot::error::Result<Option<SheetBlockingClient>> {
    match (read_env(USER_ID_ENV), read_env(SYNC_URL_ENV)) {
        (Some(user_id), Some(url)) => SheetBlockingClient::builder()
            .user_id(user_id)
            .base_url(url)
            .build()
            .map(Some),
        (user_id, url) => {
            tracing::debug!(
                user_id = user_id.is_some(),
                url = url.is_some(),
                "remote store not configured, working offline"
            );
            Ok(None)
        }
    }
}

/// Creates the storage backend, using `data_dir` if provided or the
/// default XDG data directory otherwise.
fn create_storage(data_dir: Option<PathBuf>) -> wealth_snapshot::error::Result<FileStorage> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileStorage::default_dir()?,
    };
    FileStorage::new(dir)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    view: &View,
    command: Command,
) -> io::Result<ExitCode> {
    match command {
        Command::Summary => cmd_summary(tracker, view),
        Command::Accounts => print_accounts_table(&tracker.state().accounts),
        Command::Deposits => print_deposits_table(&tracker.state().fixed_deposits),
        Command::History => cmd_history(tracker, view),
        Command::AddCash {
            name,
            balance,
            currency,
        } => cmd_add_cash(tracker, name, balance, currency),
        Command::AddStock(args) => cmd_add_stock(tracker, args),
        Command::RemoveAccount { id } => cmd_remove_account(tracker, id),
        Command::AddDeposit(args) => cmd_add_deposit(tracker, args),
        Command::RemoveDeposit { id } => cmd_remove_deposit(tracker, id),
        Command::SettleDeposit { id, target, amount } => {
            cmd_settle_deposit(tracker, id, target, amount)
        }
        Command::SetGoal { amount } => cmd_set_goal(tracker, amount),
        Command::RefreshPrices => cmd_refresh_prices(tracker),
        Command::Quote { symbol } => cmd_quote(tracker, &symbol),
        Command::Insights => cmd_insights(tracker, view),
        Command::Report => cmd_report(tracker, view),
        Command::Sync => cmd_sync(tracker),
        Command::Scan { image, yes } => cmd_scan(tracker, &image, yes),
        Command::Export { output } => cmd_export(tracker, output.as_deref()),
        Command::Import { file, yes } => cmd_import(tracker, &file, yes),
        Command::ExportCsv { output } => cmd_export_csv(tracker, output.as_deref()),
    }
}

// ── Read commands ────────────────────────────────────────────────────

/// Executes the `summary` subcommand.
fn cmd_summary<S: BlockingStorage>(
    tracker: &WealthTrackerBlocking<S>,
    view: &View,
) -> io::Result<ExitCode> {
    let state = tracker.state();
    let now = Utc::now();
    let net_worth = total_in_base(&state.accounts, &state.fixed_deposits, tracker.policy()).round();
    let income = tracker.passive_income();
    let groups = tracker.asset_groups();

    let mut out = io::stdout().lock();
    writeln!(out, "{}", "Wealth Snapshot".green().bold())?;
    writeln!(out)?;
    let policy_note = if tracker.policy().include_savings_deposits {
        "all holdings"
    } else {
        "savings deposits excluded"
    };
    writeln!(
        out,
        "  {:<16}{} {}",
        "Net worth".bold(),
        view.money(net_worth),
        format_args!("({policy_note})").dimmed()
    )?;
    writeln!(
        out,
        "  {:<16}{} {}",
        "Goal".bold(),
        view.money(state.wealth_goal),
        format_args!("({:.1}%)", goal_progress(net_worth, state.wealth_goal)).dimmed()
    )?;
    writeln!(
        out,
        "  {:<16}{} / month {}",
        "Passive income".bold(),
        view.money(income.total),
        format_args!(
            "(freedom {:.1}%)",
            freedom_progress(income.total, &view.display)
        )
        .dimmed()
    )?;
    writeln!(out, "  {:<16}{}", "Sync".bold(), status_label(tracker.status()))?;
    let updated = days_since(state.last_updated, now);
    if is_stale(state.last_updated, now) {
        writeln!(
            out,
            "  {:<16}{}",
            "Last updated".bold(),
            format_args!("{updated} days ago, time for a refresh").yellow()
        )?;
    } else {
        writeln!(out, "  {:<16}{updated} days ago", "Last updated".bold())?;
    }
    writeln!(out)?;

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(header(&["Group", "Native", "Value", "Yield %"]));
    for &(region, sub) in &groups.banking {
        add_subtotal_row(&mut table, &format!("{} cash", region.label()), &sub, view);
    }
    for &(region, sub) in &groups.stocks {
        add_subtotal_row(&mut table, &format!("{} stocks", region.label()), &sub, view);
    }
    add_subtotal_row(&mut table, "Fixed deposits", &groups.deposits, view);
    writeln!(out, "{table}")?;

    print_maturity_alerts(&mut out, &state.fixed_deposits)?;
    Ok(ExitCode::SUCCESS)
}

/// Lists deposits maturing within the watch window; critical ones in red.
fn print_maturity_alerts<W: io::Write>(out: &mut W, deposits: &[FixedDeposit]) -> io::Result<()> {
    let alerts = maturing_within(deposits, Utc::now(), MATURITY_WATCH_DAYS);
    if !alerts.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "Maturing soon".yellow().bold())?;
        for alert in alerts {
            let line = format!(
                "  {} {} {:.0} in {} days",
                alert.deposit.bank_name,
                alert.deposit.currency,
                alert.deposit.principal,
                alert.days_left
            );
            if alert.critical {
                writeln!(out, "{}", line.red())?;
            } else {
                writeln!(out, "{line}")?;
            }
        }
    }
    Ok(())
}

/// Adds one subtotal row; empty groups are skipped.
fn add_subtotal_row(table: &mut Table, label: &str, sub: &Subtotal, view: &View) {
    if sub.total == 0.0 {
        return;
    }
    _ = table.add_row(vec![
        Cell::new(label),
        Cell::new(format!("{:.0}", sub.native_total)),
        Cell::new(view.money(sub.total)),
        Cell::new(format!("{:.2}", sub.weighted_yield)),
    ]);
}

/// Executes the `history` subcommand.
fn cmd_history<S: BlockingStorage>(
    tracker: &WealthTrackerBlocking<S>,
    view: &View,
) -> io::Result<ExitCode> {
    let mut out = io::stdout().lock();
    let series = tracker.benchmark();
    if series.points.is_empty() {
        writeln!(out, "{}", "No history recorded yet.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(header(&["Month", "Net worth", "If in VOO", "Difference"]));
    for point in &series.points {
        let diff_cell = if point.diff >= 0.0 {
            Cell::new(view.money(point.diff)).fg(Color::Green)
        } else {
            Cell::new(view.money(point.diff)).fg(Color::Red)
        };
        _ = table.add_row(vec![
            Cell::new(point.date.as_str()),
            Cell::new(view.money(point.actual)),
            Cell::new(view.money(point.hypothetical)),
            diff_cell,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "History".green().bold(),
        format_args!("({})", series.points.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    if series.beating_market {
        writeln!(out, "{}", "Beating the market.".green())?;
    } else {
        writeln!(out, "{}", "Trailing the market.".yellow())?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `insights` subcommand.
fn cmd_insights<S: BlockingStorage>(
    tracker: &WealthTrackerBlocking<S>,
    view: &View,
) -> io::Result<ExitCode> {
    let state = tracker.state();
    let income = tracker.passive_income();
    let split = allocation(&state.accounts, &state.fixed_deposits);
    let latest = state
        .latest_snapshot()
        .map_or(0.0, |point| point.total_value_hkd);
    let scores = health_scores(
        &income,
        state.accounts.len() + state.fixed_deposits.len(),
        latest,
    );

    let mut out = io::stdout().lock();
    let mut alloc_table = Table::new();
    _ = alloc_table.load_preset(UTF8_FULL);
    _ = alloc_table.set_header(header(&["Category", "Value", "Share %"]));
    for (label, value) in [
        ("Cash", split.cash),
        ("Stocks", split.stocks),
        ("Fixed deposits", split.deposits),
    ] {
        _ = alloc_table.add_row(vec![
            Cell::new(label),
            Cell::new(view.money(value)),
            Cell::new(format!("{:.1}", split.share(value))),
        ]);
    }
    writeln!(out, "{}", "Allocation".green().bold())?;
    writeln!(out, "{alloc_table}")?;
    writeln!(out)?;

    let mut score_table = Table::new();
    _ = score_table.load_preset(UTF8_FULL);
    _ = score_table.set_header(header(&["Score", "Value"]));
    for (label, value) in [
        ("Liquidity", scores.liquidity),
        ("Growth", scores.growth),
        ("Safety", scores.safety),
        ("Income", scores.income),
        ("Diversification", scores.diversification),
    ] {
        _ = score_table.add_row(vec![Cell::new(label), score_cell(value)]);
    }
    writeln!(out, "{}", "Portfolio health".green().bold())?;
    writeln!(out, "{score_table}")?;
    writeln!(out)?;

    print_income_breakdown(&mut out, &income, view)?;
    Ok(ExitCode::SUCCESS)
}

/// Prints passive income by source and the income-producing holdings.
fn print_income_breakdown<W: io::Write>(
    out: &mut W,
    income: &PassiveIncome,
    view: &View,
) -> io::Result<()> {
    let mut income_table = Table::new();
    _ = income_table.load_preset(UTF8_FULL);
    _ = income_table.set_header(header(&["Source", "Monthly"]));
    for (label, value) in [
        ("Deposit interest", income.by_category.deposits),
        ("Dividends", income.by_category.dividends),
        ("Cash interest", income.by_category.cash),
    ] {
        _ = income_table.add_row(vec![Cell::new(label), Cell::new(view.money(value))]);
    }
    for (currency, value) in &income.by_currency_source {
        _ = income_table.add_row(vec![
            Cell::new(format!("From {currency} holdings")).fg(Color::DarkGrey),
            Cell::new(view.money(*value)).fg(Color::DarkGrey),
        ]);
    }
    writeln!(
        out,
        "{} {}",
        "Passive income".green().bold(),
        format_args!(
            "(deposits {:.2}%, stocks {:.2}%)",
            income.weighted_deposit_rate, income.weighted_stock_yield
        )
        .dimmed()
    )?;
    writeln!(out, "{income_table}")?;

    let top: Vec<_> = income
        .deposit_lines
        .iter()
        .chain(income.stock_lines.iter())
        .filter(|line| line.monthly > 0.0)
        .collect();
    if !top.is_empty() {
        let mut line_table = Table::new();
        _ = line_table.load_preset(UTF8_FULL);
        _ = line_table.set_header(header(&["Holding", "Currency", "Rate %", "Monthly"]));
        for line in top {
            _ = line_table.add_row(vec![
                Cell::new(&line.name),
                Cell::new(line.currency.code()),
                Cell::new(format!("{:.2}", line.yield_percent)),
                Cell::new(view.money(line.monthly)),
            ]);
        }
        writeln!(out)?;
        writeln!(out, "{line_table}")?;
    }
    Ok(())
}

/// Colors a 0..=100 score.
fn score_cell(value: f64) -> Cell {
    let cell = Cell::new(format!("{value:.0}"));
    if value >= 60.0 {
        cell.fg(Color::Green)
    } else if value >= 30.0 {
        cell.fg(Color::Yellow)
    } else {
        cell.fg(Color::Red)
    }
}

/// Executes the `report` subcommand.
fn cmd_report<S: BlockingStorage>(
    tracker: &WealthTrackerBlocking<S>,
    view: &View,
) -> io::Result<ExitCode> {
    let report = monthly_report(tracker.state());
    let mut out = io::stdout().lock();
    let Some(month) = report.month.as_ref() else {
        writeln!(out, "{}", "No history recorded yet.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    };
    writeln!(out, "{} {}", "Monthly report".green().bold(), month.as_str().dimmed())?;
    writeln!(out)?;
    writeln!(out, "  {:<18}{}", "Net worth".bold(), view.money(report.current))?;
    writeln!(out, "  {:<18}{}", "Previous".bold(), view.money(report.previous))?;
    let change = format!(
        "{} ({:+.2}%)",
        view.money(report.net_change),
        report.change_percent
    );
    if report.net_change >= 0.0 {
        writeln!(out, "  {:<18}{}", "Change".bold(), change.green())?;
    } else {
        writeln!(out, "  {:<18}{}", "Change".bold(), change.red())?;
    }
    writeln!(
        out,
        "  {:<18}{}",
        "Deposit interest".bold(),
        view.money(report.deposit_income)
    )?;
    writeln!(out)?;
    let split = report.allocation;
    for (label, value) in [
        ("Cash", split.cash),
        ("Stocks", split.stocks),
        ("Fixed deposits", split.deposits),
    ] {
        writeln!(
            out,
            "  {label:<18}{} {}",
            view.money(value),
            format_args!("{:.1}%", split.share(value)).dimmed()
        )?;
    }
    Ok(ExitCode::SUCCESS)
}

// ── Mutating commands ────────────────────────────────────────────────

/// Executes the `add-cash` subcommand.
fn cmd_add_cash<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    name: String,
    balance: f64,
    currency: Currency,
) -> io::Result<ExitCode> {
    match tracker.add_account(Account::cash(name, currency, balance)) {
        Ok(id) => saved(tracker, &format!("account {id}")),
        Err(err) => fail("failed to add account", &err),
    }
}

/// Executes the `add-stock` subcommand.
fn cmd_add_stock<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    args: AddStockArgs,
) -> io::Result<ExitCode> {
    let symbol = format_stock_symbol(&args.symbol);
    let currency = args.currency.unwrap_or_else(|| listing_currency(&symbol));
    let quote = if args.price.is_none() || args.dividend_yield.is_none() {
        let spinner = make_spinner(&format!("Fetching quote for {symbol}..."));
        let live = tracker.lookup_quote(&symbol);
        spinner.finish_and_clear();
        live
    } else {
        Quote::default()
    };
    let price = args.price.unwrap_or(quote.price);
    if price <= 0.0 {
        writeln!(
            io::stderr().lock(),
            "{} no price for {symbol}; pass {} to record it anyway",
            "warning:".yellow().bold(),
            "--price".bold()
        )?;
    }
    let name = args.broker.unwrap_or_else(|| symbol.clone());
    let mut account = Account::stock(name, symbol, currency, args.quantity, price);
    account.dividend_yield = Some(args.dividend_yield.unwrap_or(quote.dividend_yield));
    match tracker.add_account(account) {
        Ok(id) => saved(tracker, &format!("stock {id}")),
        Err(err) => fail("failed to add stock", &err),
    }
}

/// Executes the `remove-account` subcommand.
fn cmd_remove_account<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    id: String,
) -> io::Result<ExitCode> {
    match tracker.remove_account(&AccountId::new(id)) {
        Ok(account) => saved(tracker, &format!("removed {}", account.name)),
        Err(err) => fail("failed to remove account", &err),
    }
}

/// Executes the `add-deposit` subcommand.
fn cmd_add_deposit<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    args: AddDepositArgs,
) -> io::Result<ExitCode> {
    let mut deposit = FixedDeposit::new(
        args.bank,
        args.principal,
        args.currency,
        args.rate,
        args.maturity,
    );
    deposit.kind = Some(if args.savings {
        DepositKind::Savings
    } else {
        DepositKind::Term
    });
    deposit.action_on_maturity = args.action.unwrap_or_default();
    deposit.auto_roll = args.auto_roll;
    match tracker.upsert_deposit(deposit) {
        Ok(id) => saved(tracker, &format!("deposit {id}")),
        Err(err) => fail("failed to add deposit", &err),
    }
}

/// Executes the `remove-deposit` subcommand.
fn cmd_remove_deposit<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    id: String,
) -> io::Result<ExitCode> {
    match tracker.remove_deposit(&DepositId::new(id)) {
        Ok(deposit) => saved(tracker, &format!("removed {}", deposit.bank_name)),
        Err(err) => fail("failed to remove deposit", &err),
    }
}

/// Executes the `settle-deposit` subcommand.
fn cmd_settle_deposit<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    id: String,
    target: String,
    amount: Option<f64>,
) -> io::Result<ExitCode> {
    let deposit_id = DepositId::new(id);
    let Some(principal) = tracker
        .state()
        .deposit(&deposit_id)
        .map(|fd| fd.principal)
    else {
        return fail(
            "failed to settle deposit",
            &WealthError::NotFound(format!("deposit {deposit_id}")),
        );
    };
    let proceeds = amount.unwrap_or(principal);
    match tracker.settle_deposit(&deposit_id, &AccountId::new(target), proceeds) {
        Ok(()) => saved(tracker, &format!("settled {proceeds:.2}")),
        Err(err) => fail("failed to settle deposit", &err),
    }
}

/// Executes the `set-goal` subcommand.
fn cmd_set_goal<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    amount: f64,
) -> io::Result<ExitCode> {
    match tracker.set_goal(amount) {
        Ok(()) => saved(tracker, &format!("goal HKD {amount:.0}")),
        Err(err) => fail("failed to set goal", &err),
    }
}

/// Executes the `refresh-prices` subcommand.
fn cmd_refresh_prices<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
) -> io::Result<ExitCode> {
    let spinner = make_spinner("Fetching live prices...");
    let result = tracker.refresh_prices();
    spinner.finish_and_clear();
    match result {
        Ok(updated) => saved(tracker, &format!("{updated} holdings re-priced")),
        Err(err) => fail("failed to refresh prices", &err),
    }
}

/// Executes the `quote` subcommand.
fn cmd_quote<S: BlockingStorage>(
    tracker: &WealthTrackerBlocking<S>,
    input: &str,
) -> io::Result<ExitCode> {
    let symbol = format_stock_symbol(input);
    let spinner = make_spinner(&format!("Fetching quote for {symbol}..."));
    let quote = tracker.lookup_quote(&symbol);
    spinner.finish_and_clear();
    let mut out = io::stdout().lock();
    if quote.price > 0.0 {
        writeln!(
            out,
            "{} {} {:.2} {}",
            symbol.bold(),
            listing_currency(&symbol),
            quote.price,
            format_args!("(yield {:.2}%)", quote.dividend_yield).dimmed()
        )?;
        Ok(ExitCode::SUCCESS)
    } else {
        writeln!(out, "{}", format_args!("No quote for {symbol}.").dimmed())?;
        Ok(ExitCode::FAILURE)
    }
}

/// Executes the `sync` subcommand.
fn cmd_sync<S: BlockingStorage>(tracker: &mut WealthTrackerBlocking<S>) -> io::Result<ExitCode> {
    let spinner = make_spinner("Pushing snapshot...");
    let status = tracker.sync_now();
    spinner.finish_and_clear();
    writeln!(io::stdout().lock(), "Sync: {}", status_label(status))?;
    if status == SyncStatus::Synced {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Executes the `scan` subcommand.
fn cmd_scan<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    image: &Path,
    record: bool,
) -> io::Result<ExitCode> {
    let bytes = fs::read(image)?;
    let spinner = make_spinner("Analyzing statement...");
    let result = tracker.scan_statement(&bytes);
    spinner.finish_and_clear();
    let assets = match result {
        Ok(assets) => assets,
        Err(err) => return fail("scan failed", &err),
    };
    print_scanned_table(&assets)?;
    if assets.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    if !record {
        writeln!(
            io::stdout().lock(),
            "{} re-run with {} to record these holdings",
            "hint:".cyan(),
            "--yes".bold()
        )?;
        return Ok(ExitCode::SUCCESS);
    }
    match tracker.import_scanned(assets) {
        Ok(ids) => saved(tracker, &format!("{} holdings recorded", ids.len())),
        Err(err) => fail("failed to record holdings", &err),
    }
}

// ── Backup commands ──────────────────────────────────────────────────

/// Executes the `export` subcommand.
fn cmd_export<S: BlockingStorage>(
    tracker: &WealthTrackerBlocking<S>,
    output: Option<&Path>,
) -> io::Result<ExitCode> {
    let json = match tracker.export_json() {
        Ok(json) => json,
        Err(err) => return fail("failed to export", &err),
    };
    match output {
        Some(path) => {
            fs::write(path, json)?;
            writeln!(
                io::stderr().lock(),
                "{} backup written to {}",
                "ok:".green().bold(),
                path.display()
            )?;
        }
        None => writeln!(io::stdout().lock(), "{json}")?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `import` subcommand.
fn cmd_import<S: BlockingStorage>(
    tracker: &mut WealthTrackerBlocking<S>,
    file: &Path,
    yes: bool,
) -> io::Result<ExitCode> {
    let text = fs::read_to_string(file)?;
    if !yes && !confirm("This replaces all current data. Continue?")? {
        writeln!(io::stderr().lock(), "{}", "Import cancelled.".dimmed())?;
        return Ok(ExitCode::FAILURE);
    }
    match tracker.import_backup(&text) {
        Ok(()) => saved(tracker, "backup restored"),
        Err(err) => fail("failed to import", &err),
    }
}

/// Executes the `export-csv` subcommand.
fn cmd_export_csv<S: BlockingStorage>(
    tracker: &WealthTrackerBlocking<S>,
    output: Option<&Path>,
) -> io::Result<ExitCode> {
    let result = match output {
        Some(path) => tracker.export_csv(fs::File::create(path)?),
        None => tracker.export_csv(io::stdout().lock()),
    };
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => fail("failed to export csv", &err),
    }
}

/// Asks a yes/no question on the terminal; anything but `y` is no.
fn confirm(question: &str) -> io::Result<bool> {
    let mut err = io::stderr().lock();
    write!(err, "{} {question} [y/N] ", "?".yellow().bold())?;
    err.flush()?;
    let mut answer = String::new();
    let _read = io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

// ── Output formatting ────────────────────────────────────────────────

/// Confirms a saved mutation together with the sync outcome.
fn saved<S: BlockingStorage>(
    tracker: &WealthTrackerBlocking<S>,
    what: &str,
) -> io::Result<ExitCode> {
    writeln!(
        io::stdout().lock(),
        "{} {what} {}",
        "saved:".green().bold(),
        format_args!("(sync: {})", tracker.status()).dimmed()
    )?;
    Ok(ExitCode::SUCCESS)
}

/// Colored sync status.
fn status_label(status: SyncStatus) -> String {
    match status {
        SyncStatus::Synced => status.label().green().to_string(),
        SyncStatus::Syncing => status.label().yellow().to_string(),
        SyncStatus::Offline => status.label().red().to_string(),
    }
}

/// Builds a cyan header row.
fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|&title| Cell::new(title).fg(Color::Cyan))
        .collect()
}

/// Prints accounts in a table.
fn print_accounts_table(accounts: &[Account]) -> io::Result<ExitCode> {
    let mut out = io::stdout().lock();
    if accounts.is_empty() {
        writeln!(out, "{}", "No accounts found.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(header(&[
        "Id", "Name", "Type", "Currency", "Balance", "Symbol", "Qty", "Price", "Yield %",
    ]));
    for acc in accounts {
        let optional = |value: Option<f64>| value.map_or_else(|| DASH.to_owned(), |v| format!("{v:.2}"));
        _ = table.add_row(vec![
            Cell::new(acc.id.as_inner()).fg(Color::DarkGrey),
            Cell::new(&acc.name),
            Cell::new(acc.kind.as_str()),
            Cell::new(acc.currency.code()),
            Cell::new(format!("{:.2}", acc.balance)),
            Cell::new(acc.symbol.as_deref().unwrap_or(DASH)),
            Cell::new(optional(acc.quantity)),
            Cell::new(optional(acc.last_price)),
            Cell::new(optional(acc.dividend_yield)),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Accounts".green().bold(),
        format_args!("({})", accounts.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Prints fixed deposits in a table.
fn print_deposits_table(deposits: &[FixedDeposit]) -> io::Result<ExitCode> {
    let mut out = io::stdout().lock();
    if deposits.is_empty() {
        writeln!(out, "{}", "No fixed deposits found.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    let now = Utc::now();
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(header(&[
        "Id", "Bank", "Currency", "Principal", "Rate %", "Monthly", "Maturity", "Days", "Kind",
    ]));
    for fd in deposits {
        let days_cell = fd.maturity().map_or_else(
            || Cell::new(DASH).fg(Color::DarkGrey),
            |maturity| {
                let days = (maturity - now).num_days();
                let cell = Cell::new(days);
                if days <= MATURITY_WATCH_DAYS {
                    cell.fg(Color::Yellow)
                } else {
                    cell
                }
            },
        );
        let kind = if fd.is_savings() { "Savings" } else { "Term" };
        _ = table.add_row(vec![
            Cell::new(fd.id.as_inner()).fg(Color::DarkGrey),
            Cell::new(&fd.bank_name),
            Cell::new(fd.currency.code()),
            Cell::new(format!("{:.2}", fd.principal)),
            Cell::new(format!("{:.2}", fd.interest_rate)),
            Cell::new(format!(
                "{:.2}",
                monthly_income(fd.principal, fd.interest_rate)
            )),
            Cell::new(&fd.maturity_date),
            days_cell,
            Cell::new(kind),
        ]);
    }

    let total: f64 = deposits
        .iter()
        .map(|fd| to_base(fd.principal, &fd.currency))
        .sum();
    writeln!(
        out,
        "{} {}",
        "Fixed deposits".green().bold(),
        format_args!("({}, HKD {total:.0})", deposits.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Prints scanner candidates in a table.
fn print_scanned_table(assets: &[ScannedAsset]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if assets.is_empty() {
        writeln!(out, "{}", "No holdings found on the statement.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(header(&[
        "Category", "Name", "Symbol", "Amount", "Currency", "Price",
    ]));
    for asset in assets {
        _ = table.add_row(vec![
            Cell::new(AccountKind::from(asset.category).as_str()),
            Cell::new(asset.display_name()),
            Cell::new(asset.symbol.as_deref().unwrap_or(DASH)),
            Cell::new(format!("{:.2}", asset.amount)),
            Cell::new(asset.currency.code()),
            Cell::new(
                asset
                    .price
                    .map_or_else(|| DASH.to_owned(), |price| format!("{price:.2}")),
            ),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Statement".green().bold(),
        format_args!("({})", assets.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // stderr itself may be gone; nothing left to report to.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
