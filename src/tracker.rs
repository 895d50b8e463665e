//! Stateful wealth tracker with integrated storage and remote sync.
//!
//! The tracker owns the in-memory [`AppState`]. Every accepted mutation
//! is applied to a copy of the document, refreshes the copy's current
//! month history point and writes it through a [`Storage`] /
//! [`BlockingStorage`] backend. Only a successful save makes the copy
//! current. The snapshot is then pushed to the remote store before the
//! mutation returns. Push failures never fail the mutation; they only
//! move the [`SyncStatus`].
//!
//! [`Storage`]: crate::storage::Storage
//! [`BlockingStorage`]: crate::storage::BlockingStorage

use crate::error::{Result, WealthError};
use crate::models::{Account, FixedDeposit};

/// Rejects accounts whose figures cannot be aggregated.
fn validate_account(account: &Account) -> Result<()> {
    if !account.balance.is_finite() {
        return Err(WealthError::InvalidInput(format!(
            "balance of `{}` is not a number",
            account.name
        )));
    }
    if account.is_stock() {
        let quantity = account.quantity.unwrap_or(0.0);
        let price = account.last_price.unwrap_or(0.0);
        if !quantity.is_finite() || quantity < 0.0 || !price.is_finite() || price < 0.0 {
            return Err(WealthError::InvalidInput(format!(
                "quantity and price of `{}` must be non-negative",
                account.name
            )));
        }
    }
    Ok(())
}

/// Rejects deposits with a negative or non-numeric principal or rate.
fn validate_deposit(deposit: &FixedDeposit) -> Result<()> {
    if !deposit.principal.is_finite() || deposit.principal < 0.0 {
        return Err(WealthError::InvalidInput(format!(
            "principal of `{}` must be non-negative",
            deposit.bank_name
        )));
    }
    if !deposit.interest_rate.is_finite() {
        return Err(WealthError::InvalidInput(format!(
            "interest rate of `{}` is not a number",
            deposit.bank_name
        )));
    }
    Ok(())
}

/// Generates a tracker (async or blocking) with builder and methods.
macro_rules! define_tracker {
    (
        tracker_name: $tracker:ident,
        builder_name: $builder:ident,
        sheet_client: $sheet:ty,
        scanner: $scanner:ty,
        storage_trait: $storage_trait:ident,
        tracker_doc: $tracker_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder<S: $storage_trait> {
            /// Storage backend.
            storage: Option<S>,
            /// Remote store client; offline when absent.
            sheet: Option<$sheet>,
            /// Statement scanner; scanning is unavailable when absent.
            scanner: Option<$scanner>,
            /// Deposit policy for the tracked net worth.
            policy: NetWorthPolicy,
        }

        impl<S: $storage_trait> $builder<S> {
            /// Sets the storage backend.
            #[inline]
            #[must_use]
            pub fn storage(mut self, storage: S) -> Self {
                self.storage = Some(storage);
                self
            }

            /// Sets the remote store client.
            #[inline]
            #[must_use]
            pub fn sheet_client(mut self, client: $sheet) -> Self {
                self.sheet = Some(client);
                self
            }

            /// Sets the statement scanner.
            #[inline]
            #[must_use]
            pub fn scanner(mut self, scanner: $scanner) -> Self {
                self.scanner = Some(scanner);
                self
            }

            /// Chooses which deposits count toward the tracked net worth.
            #[inline]
            #[must_use]
            pub const fn policy(mut self, policy: NetWorthPolicy) -> Self {
                self.policy = policy;
                self
            }

            /// Loads the stored document and builds the tracker.
            ///
            /// An empty backend starts from [`AppState::default()`].
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::Storage`] if no storage was provided
            /// or the backend fails to read, and
            /// [`WealthError::Serialization`] if the stored document is
            /// corrupt.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn build(self) -> Result<$tracker<S>> {
                let storage = self.storage.ok_or_else(|| {
                    WealthError::Storage("storage backend is required".into())
                })?;
                let stored = storage.load() $( .$await_ext )? ?;
                if stored.is_none() {
                    tracing::info!("no stored document, starting empty");
                }
                let state = stored.unwrap_or_default();
                let status = if self.sheet.is_some() {
                    SyncStatus::Synced
                } else {
                    SyncStatus::Offline
                };
                tracing::debug!(
                    accounts = state.accounts.len(),
                    deposits = state.fixed_deposits.len(),
                    history = state.history.len(),
                    "document loaded"
                );
                Ok($tracker {
                    storage,
                    sheet: self.sheet,
                    scanner: self.scanner,
                    policy: self.policy,
                    state,
                    status,
                    versions: SyncVersions::new(),
                })
            }
        }

        #[doc = $tracker_doc]
        #[derive(Debug)]
        pub struct $tracker<S: $storage_trait> {
            /// Storage backend.
            storage: S,
            /// Remote store client.
            sheet: Option<$sheet>,
            /// Statement scanner.
            scanner: Option<$scanner>,
            /// Deposit policy for the tracked net worth.
            policy: NetWorthPolicy,
            /// Current document.
            state: AppState,
            /// Outcome of the latest push.
            status: SyncStatus,
            /// Push version counter.
            versions: SyncVersions,
        }

        impl<S: $storage_trait> $tracker<S> {
            /// Creates a new builder for configuring the tracker.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder<S> {
                $builder {
                    storage: None,
                    sheet: None,
                    scanner: None,
                    policy: NetWorthPolicy::SYNC,
                }
            }

            // ── Reads ───────────────────────────────────────────────

            /// Current document.
            #[inline]
            #[must_use]
            pub const fn state(&self) -> &AppState {
                &self.state
            }

            /// Outcome of the latest push.
            #[inline]
            #[must_use]
            pub const fn status(&self) -> SyncStatus {
                self.status
            }

            /// Policy used for the tracked net worth.
            #[inline]
            #[must_use]
            pub const fn policy(&self) -> NetWorthPolicy {
                self.policy
            }

            /// Returns a reference to the storage backend.
            #[inline]
            #[must_use]
            pub const fn storage(&self) -> &S {
                &self.storage
            }

            /// Net worth in whole HKD under the tracker's policy.
            #[inline]
            #[must_use]
            pub fn net_worth(&self) -> i64 {
                compute_net_worth(&self.state.accounts, &self.state.fixed_deposits, self.policy)
            }

            /// Projected monthly passive income.
            #[inline]
            #[must_use]
            pub fn passive_income(&self) -> PassiveIncome {
                project_monthly_income(&self.state.accounts, &self.state.fixed_deposits)
            }

            /// Regional and category subtotals.
            #[inline]
            #[must_use]
            pub fn asset_groups(&self) -> AssetGroups {
                asset_groups(&self.state.accounts, &self.state.fixed_deposits, self.policy)
            }

            /// Recorded history against the built-in VOO table.
            #[inline]
            #[must_use]
            pub fn benchmark(&self) -> BenchmarkSeries {
                benchmark_series(&self.state.history, voo_monthly_close)
            }

            /// Pretty JSON backup of the current document.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::Serialization`] if serialization fails.
            #[inline]
            pub fn export_json(&self) -> Result<String> {
                backup::export_json(&self.state)
            }

            /// Writes the holdings as CSV.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::Csv`] if writing fails.
            #[inline]
            pub fn export_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
                backup::export_csv(&self.state, writer)
            }

            // ── Remote lookups ──────────────────────────────────────

            /// Looks up a live quote for `symbol`.
            ///
            /// Lookup failures and a missing remote store both yield a zero
            /// quote.
            #[inline]
            #[tracing::instrument(skip_all, fields(symbol = %symbol))]
            pub $($async_kw)? fn lookup_quote(&self, symbol: &str) -> Quote {
                let Some(sheet) = self.sheet.as_ref() else {
                    return Quote::default();
                };
                match sheet.quote(symbol) $( .$await_ext )? {
                    Ok(quote) => quote,
                    Err(err) => {
                        tracing::warn!(error = %err, "quote lookup failed");
                        Quote::default()
                    }
                }
            }

            /// Extracts candidate holdings from a statement image.
            ///
            /// Nothing is recorded; pass the reviewed candidates to
            /// `import_scanned`.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::MissingCredential`] if no scanner is
            /// configured and [`WealthError::Scan`] if analysis fails.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn scan_statement(&self, image: &[u8]) -> Result<Vec<ScannedAsset>> {
                let scanner = self
                    .scanner
                    .as_ref()
                    .ok_or(WealthError::MissingCredential("gemini api key"))?;
                scanner.scan(image) $( .$await_ext )?
            }

            // ── Holdings ────────────────────────────────────────────

            /// Records a new account. Stock balances are re-derived from
            /// quantity and price.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::InvalidInput`] for non-numeric or
            /// negative figures or a duplicate id, and a storage error if
            /// the document cannot be saved.
            #[inline]
            #[tracing::instrument(skip_all, fields(name = %account.name))]
            pub $($async_kw)? fn add_account(&mut self, mut account: Account) -> Result<AccountId> {
                validate_account(&account)?;
                if self.state.account(&account.id).is_some() {
                    return Err(WealthError::InvalidInput(format!(
                        "account {} already exists",
                        account.id
                    )));
                }
                account.recompute_balance();
                let id = account.id.clone();
                let mut next = self.state.clone();
                next.accounts.push(account);
                self.commit(next) $( .$await_ext )? ?;
                Ok(id)
            }

            /// Replaces the account with the same id.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::NotFound`] if no account has the id,
            /// [`WealthError::InvalidInput`] for invalid figures, and a
            /// storage error if the document cannot be saved.
            #[inline]
            #[tracing::instrument(skip_all, fields(id = %account.id))]
            pub $($async_kw)? fn update_account(&mut self, mut account: Account) -> Result<()> {
                validate_account(&account)?;
                account.recompute_balance();
                let mut next = self.state.clone();
                let slot = next
                    .accounts
                    .iter_mut()
                    .find(|acc| acc.id == account.id)
                    .ok_or_else(|| WealthError::NotFound(format!("account {}", account.id)))?;
                *slot = account;
                self.commit(next) $( .$await_ext )?
            }

            /// Deletes an account and returns it.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::NotFound`] if no account has the id,
            /// and a storage error if the document cannot be saved.
            #[inline]
            #[tracing::instrument(skip_all, fields(id = %id))]
            pub $($async_kw)? fn remove_account(&mut self, id: &AccountId) -> Result<Account> {
                let mut next = self.state.clone();
                let index = next
                    .accounts
                    .iter()
                    .position(|acc| acc.id == *id)
                    .ok_or_else(|| WealthError::NotFound(format!("account {id}")))?;
                let removed = next.accounts.remove(index);
                self.commit(next) $( .$await_ext )? ?;
                Ok(removed)
            }

            /// Inserts a deposit, or replaces the one with the same id.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::InvalidInput`] for a negative
            /// principal, and a storage error if the document cannot be
            /// saved.
            #[inline]
            #[tracing::instrument(skip_all, fields(bank = %deposit.bank_name))]
            pub $($async_kw)? fn upsert_deposit(&mut self, deposit: FixedDeposit) -> Result<DepositId> {
                validate_deposit(&deposit)?;
                let id = deposit.id.clone();
                let mut next = self.state.clone();
                match next.fixed_deposits.iter_mut().find(|fd| fd.id == id) {
                    Some(slot) => *slot = deposit,
                    None => next.fixed_deposits.push(deposit),
                }
                self.commit(next) $( .$await_ext )? ?;
                Ok(id)
            }

            /// Deletes a deposit and returns it.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::NotFound`] if no deposit has the id,
            /// and a storage error if the document cannot be saved.
            #[inline]
            #[tracing::instrument(skip_all, fields(id = %id))]
            pub $($async_kw)? fn remove_deposit(&mut self, id: &DepositId) -> Result<FixedDeposit> {
                let mut next = self.state.clone();
                let index = next
                    .fixed_deposits
                    .iter()
                    .position(|fd| fd.id == *id)
                    .ok_or_else(|| WealthError::NotFound(format!("deposit {id}")))?;
                let removed = next.fixed_deposits.remove(index);
                self.commit(next) $( .$await_ext )? ?;
                Ok(removed)
            }

            /// Closes a matured deposit: `final_amount` is credited to the
            /// cash account `target` and the deposit is removed.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::NotFound`] if either id is unknown,
            /// [`WealthError::InvalidInput`] if the amount is negative or
            /// the target is a stock holding, and a storage error if the
            /// document cannot be saved.
            #[inline]
            #[tracing::instrument(skip_all, fields(deposit = %id, target = %target))]
            pub $($async_kw)? fn settle_deposit(
                &mut self,
                id: &DepositId,
                target: &AccountId,
                final_amount: f64,
            ) -> Result<()> {
                if !final_amount.is_finite() || final_amount < 0.0 {
                    return Err(WealthError::InvalidInput(
                        "settlement amount must be non-negative".to_owned(),
                    ));
                }
                let mut next = self.state.clone();
                let index = next
                    .fixed_deposits
                    .iter()
                    .position(|fd| fd.id == *id)
                    .ok_or_else(|| WealthError::NotFound(format!("deposit {id}")))?;
                let account = next
                    .accounts
                    .iter_mut()
                    .find(|acc| acc.id == *target)
                    .ok_or_else(|| WealthError::NotFound(format!("account {target}")))?;
                if account.is_stock() {
                    return Err(WealthError::InvalidInput(format!(
                        "`{}` is a stock holding and cannot receive cash",
                        account.name
                    )));
                }
                account.balance += final_amount;
                let settled = next.fixed_deposits.remove(index);
                self.commit(next) $( .$await_ext )? ?;
                tracing::info!(bank = %settled.bank_name, amount = final_amount, "deposit settled");
                Ok(())
            }

            /// Sets the net-worth goal.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::InvalidInput`] unless the goal is a
            /// positive number, and a storage error if the document cannot
            /// be saved.
            #[inline]
            #[tracing::instrument(skip_all, fields(goal = goal))]
            pub $($async_kw)? fn set_goal(&mut self, goal: f64) -> Result<()> {
                if !goal.is_finite() || goal <= 0.0 {
                    return Err(WealthError::InvalidInput(
                        "wealth goal must be positive".to_owned(),
                    ));
                }
                let mut next = self.state.clone();
                next.wealth_goal = goal;
                self.persist_and_push(next) $( .$await_ext )?
            }

            /// Re-prices every stock holding from live quotes and returns
            /// how many were updated.
            ///
            /// Holdings whose quote comes back without a positive price
            /// keep their recorded price and yield. Nothing is saved when
            /// no holding changed.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::MissingCredential`] if no remote
            /// store is configured, and a storage error if the document
            /// cannot be saved.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn refresh_prices(&mut self) -> Result<usize> {
                if self.sheet.is_none() {
                    return Err(WealthError::MissingCredential("sync url"));
                }
                let targets: Vec<(AccountId, String)> = self
                    .state
                    .accounts
                    .iter()
                    .filter(|acc| acc.is_stock())
                    .filter_map(|acc| {
                        let symbol = acc.symbol.as_deref()?.trim();
                        (!symbol.is_empty()).then(|| (acc.id.clone(), symbol.to_owned()))
                    })
                    .collect();
                let mut next = self.state.clone();
                let mut updated: usize = 0;
                for (id, symbol) in targets {
                    let quote = self.lookup_quote(&symbol) $( .$await_ext )?;
                    if quote.price <= 0.0 {
                        tracing::debug!(symbol = %symbol, "no live price, keeping recorded one");
                        continue;
                    }
                    if let Some(account) = next.accounts.iter_mut().find(|acc| acc.id == id) {
                        account.set_price(quote.price);
                        account.dividend_yield = Some(quote.dividend_yield);
                        updated += 1;
                    }
                }
                tracing::info!(updated, "prices refreshed");
                if updated > 0 {
                    self.commit(next) $( .$await_ext )? ?;
                }
                Ok(updated)
            }

            /// Records reviewed scanner candidates as new accounts.
            ///
            /// Stock candidates with a symbol are enriched with a live
            /// quote first.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::InvalidInput`] if a candidate has
            /// invalid figures (nothing is recorded then), and a storage
            /// error if the document cannot be saved.
            #[inline]
            #[tracing::instrument(skip_all, fields(candidates = assets.len()))]
            pub $($async_kw)? fn import_scanned(&mut self, assets: Vec<ScannedAsset>) -> Result<Vec<AccountId>> {
                let mut accounts = Vec::with_capacity(assets.len());
                for mut asset in assets {
                    let symbol = asset
                        .symbol
                        .as_deref()
                        .map(str::trim)
                        .filter(|sym| !sym.is_empty())
                        .map(str::to_owned);
                    if asset.category == AssetClass::Stock
                        && let Some(sym) = symbol
                    {
                        let quote = self.lookup_quote(&sym) $( .$await_ext )?;
                        asset.apply_quote(quote);
                    }
                    let account = asset.into_account();
                    validate_account(&account)?;
                    accounts.push(account);
                }
                let ids: Vec<AccountId> = accounts.iter().map(|acc| acc.id.clone()).collect();
                if accounts.is_empty() {
                    return Ok(ids);
                }
                let mut next = self.state.clone();
                next.accounts.extend(accounts);
                self.commit(next) $( .$await_ext )? ?;
                Ok(ids)
            }

            // ── Whole document ──────────────────────────────────────

            /// Replaces the whole document, saves it as-is and pushes it.
            ///
            /// # Errors
            ///
            /// Returns a storage error if the document cannot be saved.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn replace_state(&mut self, state: AppState) -> Result<()> {
                self.persist_and_push(state) $( .$await_ext )?
            }

            /// Validates a JSON backup and restores it.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::InvalidBackup`] or
            /// [`WealthError::Serialization`] for a malformed backup (the
            /// current document is untouched), and a storage error if the
            /// document cannot be saved.
            #[inline]
            pub $($async_kw)? fn import_backup(&mut self, text: &str) -> Result<()> {
                let state = backup::import_json(text)?;
                tracing::info!(
                    accounts = state.accounts.len(),
                    deposits = state.fixed_deposits.len(),
                    "restoring backup"
                );
                self.replace_state(state) $( .$await_ext )?
            }

            /// Pushes the current document without changing it.
            #[inline]
            pub $($async_kw)? fn sync_now(&mut self) -> SyncStatus {
                self.push() $( .$await_ext )?;
                self.status
            }

            // ── Private helpers ─────────────────────────────────────

            /// Stamps the candidate document, refreshes its current month's
            /// history point, then saves and pushes it.
            $($async_kw)? fn commit(&mut self, mut next: AppState) -> Result<()> {
                next.last_updated = Utc::now();
                let total = total_in_base(&next.accounts, &next.fixed_deposits, self.policy).round();
                next.history = upsert_current_month(&next.history, total);
                self.persist_and_push(next) $( .$await_ext )?
            }

            /// Saves the candidate document and makes it current, then
            /// pushes it.
            ///
            /// The current document is only replaced once the save
            /// succeeds, so a storage error leaves the tracker exactly as
            /// it was.
            ///
            /// The push is awaited in line: the calling mutation returns
            /// only after the remote store has answered (or the client has
            /// given up). Its outcome is recorded in [`Self::status`] and
            /// never turns into an error of the mutation.
            $($async_kw)? fn persist_and_push(&mut self, next: AppState) -> Result<()> {
                self.storage.save(&next) $( .$await_ext )? ?;
                tracing::debug!("document saved");
                self.state = next;
                self.push() $( .$await_ext )?;
                Ok(())
            }

            /// Pushes the document and records the outcome in the status,
            /// unless a newer push has already completed.
            $($async_kw)? fn push(&mut self) {
                let Some(sheet) = self.sheet.as_ref() else {
                    self.status = SyncStatus::Offline;
                    return;
                };
                let version = self.versions.begin();
                self.status = SyncStatus::Syncing;
                let outcome = sheet.push(&self.state, self.policy) $( .$await_ext )?;
                if !self.versions.complete(version) {
                    tracing::debug!(version, "discarding stale push completion");
                    return;
                }
                self.status = match outcome {
                    Ok(_) => SyncStatus::Synced,
                    Err(err) => {
                        tracing::warn!(error = %err, version, "push failed, working offline");
                        SyncStatus::Offline
                    }
                };
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_tracker {
    //! Async tracker.

    use chrono::Utc;

    use super::{validate_account, validate_deposit};
    use crate::aggregator::{
        AssetGroups, BenchmarkSeries, NetWorthPolicy, PassiveIncome, asset_groups,
        benchmark_series, compute_net_worth, project_monthly_income, total_in_base,
        upsert_current_month, voo_monthly_close,
    };
    use crate::backup;
    use crate::client::SheetClient;
    use crate::error::{Result, WealthError};
    use crate::models::{
        Account, AccountId, AppState, AssetClass, DepositId, FixedDeposit, Quote, ScannedAsset,
    };
    use crate::scanner::StatementScanner;
    use crate::storage::Storage;
    use crate::sync::{SyncStatus, SyncVersions};

    define_tracker! {
        tracker_name: WealthTracker,
        builder_name: WealthTrackerBuilder,
        sheet_client: SheetClient,
        scanner: StatementScanner,
        storage_trait: Storage,
        tracker_doc: "Async wealth tracker with integrated storage.\n\nUse [`WealthTracker::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`WealthTracker`].",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_tracker {
    //! Blocking tracker.

    use chrono::Utc;

    use super::{validate_account, validate_deposit};
    use crate::aggregator::{
        AssetGroups, BenchmarkSeries, NetWorthPolicy, PassiveIncome, asset_groups,
        benchmark_series, compute_net_worth, project_monthly_income, total_in_base,
        upsert_current_month, voo_monthly_close,
    };
    use crate::backup;
    use crate::client::SheetBlockingClient;
    use crate::error::{Result, WealthError};
    use crate::models::{
        Account, AccountId, AppState, AssetClass, DepositId, FixedDeposit, Quote, ScannedAsset,
    };
    use crate::scanner::StatementBlockingScanner;
    use crate::storage::BlockingStorage;
    use crate::sync::{SyncStatus, SyncVersions};

    define_tracker! {
        tracker_name: WealthTrackerBlocking,
        builder_name: WealthTrackerBlockingBuilder,
        sheet_client: SheetBlockingClient,
        scanner: StatementBlockingScanner,
        storage_trait: BlockingStorage,
        tracker_doc: "Blocking wealth tracker with integrated storage.\n\nUse [`WealthTrackerBlocking::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`WealthTrackerBlocking`].",
    }
}

#[cfg(feature = "async")]
pub use async_tracker::{WealthTracker, WealthTrackerBuilder};
#[cfg(feature = "blocking")]
pub use blocking_tracker::{WealthTrackerBlocking, WealthTrackerBlockingBuilder};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::NetWorthPolicy;
    use crate::models::{
        AppState, AssetClass, Currency, DepositKind, HistoricalDataPoint, MonthKey, NaiveDate,
        ScannedAsset,
    };
    use crate::storage::InMemoryStorage;
    use crate::sync::SyncStatus;

    fn term_deposit(principal: f64) -> FixedDeposit {
        let maturity = NaiveDate::from_ymd_opt(2030, 6, 30).unwrap();
        FixedDeposit::new("BOC", principal, Currency::Hkd, 4.0, maturity)
    }

    fn scanned_cash(institution: &str, amount: f64) -> ScannedAsset {
        ScannedAsset {
            category: AssetClass::Cash,
            institution: institution.to_owned(),
            symbol: None,
            amount,
            currency: Currency::Hkd,
            price: None,
            dividend_yield: None,
        }
    }

    /// Backend that serves a fixed document and refuses every write.
    #[cfg(any(feature = "async", feature = "blocking"))]
    #[derive(Debug)]
    struct ReadOnlyStorage(AppState);

    #[cfg(any(feature = "async", feature = "blocking"))]
    fn disk_full() -> WealthError {
        WealthError::Storage("disk full".into())
    }

    #[cfg(feature = "blocking")]
    impl crate::storage::BlockingStorage for ReadOnlyStorage {
        fn load(&self) -> Result<Option<AppState>> {
            Ok(Some(self.0.clone()))
        }

        fn save(&self, _state: &AppState) -> Result<()> {
            Err(disk_full())
        }

        fn clear(&self) -> Result<()> {
            Err(disk_full())
        }
    }

    #[cfg(feature = "async")]
    impl crate::storage::Storage for ReadOnlyStorage {
        fn load(&self) -> impl Future<Output = Result<Option<AppState>>> + Send {
            core::future::ready(Ok(Some(self.0.clone())))
        }

        fn save(&self, _state: &AppState) -> impl Future<Output = Result<()>> + Send {
            core::future::ready(Err(disk_full()))
        }

        fn clear(&self) -> impl Future<Output = Result<()>> + Send {
            core::future::ready(Err(disk_full()))
        }
    }

    #[cfg(any(feature = "async", feature = "blocking"))]
    fn stored_document() -> AppState {
        AppState {
            accounts: vec![Account::cash("HSBC", Currency::Hkd, 1000.0)],
            fixed_deposits: vec![term_deposit(50_000.0)],
            history: vec![HistoricalDataPoint::new(MonthKey::new("2024-01"), 51_000.0)],
            wealth_goal: 2_000_000.0,
            ..AppState::default()
        }
    }

    #[test]
    fn account_validation_rejects_nan_balance() {
        let account = Account::cash("HSBC", Currency::Hkd, f64::NAN);
        assert!(matches!(
            validate_account(&account),
            Err(WealthError::InvalidInput(_))
        ));
    }

    #[test]
    fn account_validation_rejects_negative_quantity() {
        let account = Account::stock("IBKR", "VOO", Currency::Usd, -1.0, 400.0);
        assert!(matches!(
            validate_account(&account),
            Err(WealthError::InvalidInput(_))
        ));
    }

    #[test]
    fn deposit_validation_rejects_negative_principal() {
        assert!(matches!(
            validate_deposit(&term_deposit(-1.0)),
            Err(WealthError::InvalidInput(_))
        ));
        assert!(validate_deposit(&term_deposit(0.0)).is_ok());
    }

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::storage::BlockingStorage;

        fn tracker() -> WealthTrackerBlocking<InMemoryStorage> {
            WealthTrackerBlocking::builder()
                .storage(InMemoryStorage::new())
                .build()
                .unwrap()
        }

        #[test]
        fn builder_requires_storage() {
            let result = WealthTrackerBlocking::<InMemoryStorage>::builder().build();
            assert!(matches!(result, Err(WealthError::Storage(_))));
        }

        #[test]
        fn empty_storage_starts_from_default_document() {
            let tracker = tracker();
            assert!(tracker.state().accounts.is_empty());
            assert_eq!(tracker.net_worth(), 0);
            assert_eq!(tracker.status(), SyncStatus::Offline);
            assert_eq!(tracker.policy(), NetWorthPolicy::SYNC);
        }

        #[test]
        fn loads_stored_document() {
            let stored = AppState {
                accounts: vec![Account::cash("HSBC", Currency::Hkd, 500.0)],
                ..AppState::default()
            };
            let tracker = WealthTrackerBlocking::builder()
                .storage(InMemoryStorage::with_state(stored))
                .build()
                .unwrap();
            assert_eq!(tracker.net_worth(), 500);
        }

        #[test]
        fn add_account_persists_and_records_history() {
            let mut tracker = tracker();
            let _hkd = tracker
                .add_account(Account::cash("HSBC", Currency::Hkd, 1000.0))
                .unwrap();
            let _usd = tracker
                .add_account(Account::cash("Chase", Currency::Usd, 100.0))
                .unwrap();

            assert_eq!(tracker.net_worth(), 1780);
            let history = &tracker.state().history;
            assert_eq!(history.len(), 1);
            assert_eq!(history.first().unwrap().date, MonthKey::current());
            assert!((history.first().unwrap().total_value_hkd - 1780.0).abs() < 1e-9);

            let saved = tracker.storage().load().unwrap().unwrap();
            assert_eq!(&saved, tracker.state());
            assert_eq!(tracker.storage().save_count(), 2);
            assert_eq!(tracker.status(), SyncStatus::Offline);
        }

        #[test]
        fn duplicate_account_id_is_rejected() {
            let mut tracker = tracker();
            let account = Account::cash("HSBC", Currency::Hkd, 1.0);
            let _id = tracker.add_account(account.clone()).unwrap();
            let result = tracker.add_account(account);
            assert!(matches!(result, Err(WealthError::InvalidInput(_))));
            assert_eq!(tracker.state().accounts.len(), 1);
        }

        #[test]
        fn stock_balance_is_derived_on_add() {
            let mut tracker = tracker();
            let mut account = Account::stock("IBKR", "VOO", Currency::Usd, 10.0, 400.0);
            account.balance = 1.0;
            let id = tracker.add_account(account).unwrap();
            let stored = tracker.state().account(&id).unwrap();
            assert!((stored.balance - 4000.0).abs() < 1e-9);
        }

        #[test]
        fn update_and_remove_unknown_account_fail() {
            let mut tracker = tracker();
            let ghost = Account::cash("Ghost", Currency::Hkd, 1.0);
            let ghost_id = ghost.id.clone();
            assert!(matches!(
                tracker.update_account(ghost),
                Err(WealthError::NotFound(_))
            ));
            assert!(matches!(
                tracker.remove_account(&ghost_id),
                Err(WealthError::NotFound(_))
            ));
            assert_eq!(tracker.storage().save_count(), 0);
        }

        #[test]
        fn update_account_replaces_in_place() {
            let mut tracker = tracker();
            let id = tracker
                .add_account(Account::cash("HSBC", Currency::Hkd, 1.0))
                .unwrap();
            let mut edited = tracker.state().account(&id).unwrap().clone();
            edited.balance = 250.0;
            tracker.update_account(edited).unwrap();
            assert_eq!(tracker.net_worth(), 250);
            let removed = tracker.remove_account(&id).unwrap();
            assert_eq!(removed.name, "HSBC");
            assert!(tracker.state().accounts.is_empty());
        }

        #[test]
        fn negative_principal_is_rejected_before_any_write() {
            let mut tracker = tracker();
            let result = tracker.upsert_deposit(term_deposit(-5.0));
            assert!(matches!(result, Err(WealthError::InvalidInput(_))));
            assert!(tracker.state().fixed_deposits.is_empty());
            assert_eq!(tracker.storage().save_count(), 0);
        }

        #[test]
        fn upsert_deposit_replaces_by_id() {
            let mut tracker = tracker();
            let deposit = term_deposit(100_000.0);
            let id = tracker.upsert_deposit(deposit.clone()).unwrap();
            let mut edited = deposit;
            edited.principal = 120_000.0;
            let same_id = tracker.upsert_deposit(edited).unwrap();
            assert_eq!(id, same_id);
            assert_eq!(tracker.state().fixed_deposits.len(), 1);
            assert_eq!(tracker.net_worth(), 120_000);
        }

        #[test]
        fn savings_deposits_follow_policy() {
            let mut savings = term_deposit(10_000.0);
            savings.kind = Some(DepositKind::Savings);
            let stored = AppState {
                fixed_deposits: vec![savings],
                ..AppState::default()
            };

            let sync = WealthTrackerBlocking::builder()
                .storage(InMemoryStorage::with_state(stored.clone()))
                .build()
                .unwrap();
            assert_eq!(sync.net_worth(), 0);

            let all = WealthTrackerBlocking::builder()
                .storage(InMemoryStorage::with_state(stored))
                .policy(NetWorthPolicy::ALL_HOLDINGS)
                .build()
                .unwrap();
            assert_eq!(all.net_worth(), 10_000);
        }

        #[test]
        fn settle_deposit_credits_cash_and_removes_deposit() {
            let mut tracker = tracker();
            let cash = tracker
                .add_account(Account::cash("HSBC", Currency::Hkd, 1000.0))
                .unwrap();
            let fd = tracker.upsert_deposit(term_deposit(50_000.0)).unwrap();
            tracker.settle_deposit(&fd, &cash, 51_000.0).unwrap();

            assert!(tracker.state().fixed_deposits.is_empty());
            let account = tracker.state().account(&cash).unwrap();
            assert!((account.balance - 52_000.0).abs() < 1e-9);
            assert_eq!(tracker.net_worth(), 52_000);
        }

        #[test]
        fn settle_into_stock_is_rejected() {
            let mut tracker = tracker();
            let stock = tracker
                .add_account(Account::stock("IBKR", "VOO", Currency::Usd, 1.0, 1.0))
                .unwrap();
            let fd = tracker.upsert_deposit(term_deposit(1.0)).unwrap();
            let result = tracker.settle_deposit(&fd, &stock, 1.0);
            assert!(matches!(result, Err(WealthError::InvalidInput(_))));
            assert_eq!(tracker.state().fixed_deposits.len(), 1);
        }

        #[test]
        fn goal_must_be_positive() {
            let mut tracker = tracker();
            assert!(matches!(
                tracker.set_goal(0.0),
                Err(WealthError::InvalidInput(_))
            ));
            tracker.set_goal(3_000_000.0).unwrap();
            assert!((tracker.state().wealth_goal - 3_000_000.0).abs() < 1e-9);
            assert!(tracker.state().history.is_empty());
        }

        #[test]
        fn refresh_prices_without_remote_store_fails() {
            let mut tracker = tracker();
            assert!(matches!(
                tracker.refresh_prices(),
                Err(WealthError::MissingCredential(_))
            ));
        }

        #[test]
        fn scanning_without_scanner_fails() {
            let tracker = tracker();
            assert!(matches!(
                tracker.scan_statement(&[0xFF, 0xD8]),
                Err(WealthError::MissingCredential(_))
            ));
        }

        #[test]
        fn import_scanned_adds_accounts() {
            let mut tracker = tracker();
            let ids = tracker
                .import_scanned(vec![
                    scanned_cash("HSBC", 2000.0),
                    scanned_cash("Unknown", 500.0),
                ])
                .unwrap();
            assert_eq!(ids.len(), 2);
            let names: Vec<&str> = tracker
                .state()
                .accounts
                .iter()
                .map(|acc| acc.name.as_str())
                .collect();
            assert_eq!(names, ["HSBC", "Deposit"]);
            assert_eq!(tracker.net_worth(), 2500);
        }

        #[test]
        fn import_scanned_with_nothing_does_not_save() {
            let mut tracker = tracker();
            let ids = tracker.import_scanned(Vec::new()).unwrap();
            assert!(ids.is_empty());
            assert_eq!(tracker.storage().save_count(), 0);
        }

        #[test]
        fn malformed_backup_leaves_state_untouched() {
            let mut tracker = tracker();
            let _id = tracker
                .add_account(Account::cash("HSBC", Currency::Hkd, 1.0))
                .unwrap();
            let before = tracker.state().clone();
            let result = tracker.import_backup(r#"{"accounts": 5}"#);
            assert!(matches!(result, Err(WealthError::InvalidBackup(_))));
            assert_eq!(tracker.state(), &before);
        }

        #[test]
        fn backup_round_trips_through_tracker() {
            let mut source = tracker();
            let _cash = source
                .add_account(Account::cash("HSBC", Currency::Aud, 100.0))
                .unwrap();
            let _fd = source.upsert_deposit(term_deposit(1000.0)).unwrap();
            let text = source.export_json().unwrap();

            let mut target = tracker();
            target.import_backup(&text).unwrap();
            assert_eq!(target.state(), source.state());
            assert_eq!(target.storage().snapshot().as_ref(), Some(source.state()));
        }

        #[test]
        fn sync_now_without_remote_is_offline() {
            let mut tracker = tracker();
            assert_eq!(tracker.sync_now(), SyncStatus::Offline);
        }

        #[test]
        fn csv_export_goes_through_state() {
            let mut tracker = tracker();
            let _id = tracker
                .add_account(Account::cash("HSBC", Currency::Hkd, 10.0))
                .unwrap();
            let mut out = Vec::new();
            tracker.export_csv(&mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.starts_with("Type,Name,Currency"));
            assert!(text.contains("Cash,HSBC,HKD,10"));
        }

        #[test]
        fn failed_save_leaves_document_untouched() {
            let stored = stored_document();
            let mut tracker = WealthTrackerBlocking::builder()
                .storage(ReadOnlyStorage(stored.clone()))
                .build()
                .unwrap();

            let added = tracker.add_account(Account::cash("Citi", Currency::Usd, 10.0));
            assert!(matches!(added, Err(WealthError::Storage(_))));
            assert_eq!(tracker.state(), &stored);

            let cash = stored.accounts.first().unwrap().id.clone();
            let fd = stored.fixed_deposits.first().unwrap().id.clone();
            assert!(tracker.settle_deposit(&fd, &cash, 52_000.0).is_err());
            assert!(tracker.set_goal(5_000_000.0).is_err());
            assert!(tracker.replace_state(AppState::default()).is_err());
            assert_eq!(tracker.state(), &stored);
            assert_eq!(tracker.status(), SyncStatus::Offline);
        }
    }

    #[cfg(feature = "async")]
    mod async_tests {
        use super::*;
        use crate::storage::Storage;

        async fn tracker() -> WealthTracker<InMemoryStorage> {
            WealthTracker::builder()
                .storage(InMemoryStorage::new())
                .build()
                .await
                .unwrap()
        }

        #[tokio::test]
        async fn builder_requires_storage() {
            let result = WealthTracker::<InMemoryStorage>::builder().build().await;
            assert!(matches!(result, Err(WealthError::Storage(_))));
        }

        #[tokio::test]
        async fn mutations_persist() {
            let mut tracker = tracker().await;
            let id = tracker
                .add_account(Account::cash("HSBC", Currency::Hkd, 1000.0))
                .await
                .unwrap();
            let _fd = tracker.upsert_deposit(term_deposit(120_000.0)).await.unwrap();
            assert_eq!(tracker.net_worth(), 121_000);
            assert!((tracker.passive_income().by_category.deposits - 400.0).abs() < 1e-9);

            let _removed = tracker.remove_account(&id).await.unwrap();
            let saved = tracker.storage().load().await.unwrap().unwrap();
            assert!(saved.accounts.is_empty());
            assert_eq!(saved.history.len(), 1);
            assert!((saved.history.first().unwrap().total_value_hkd - 120_000.0).abs() < 1e-9);
        }

        #[tokio::test]
        async fn benchmark_uses_recorded_history() {
            let stored = AppState {
                history: vec![
                    HistoricalDataPoint::new(MonthKey::new("2024-01"), 100_000.0),
                    HistoricalDataPoint::new(MonthKey::new("2024-02"), 110_000.0),
                ],
                ..AppState::default()
            };
            let tracker = WealthTracker::builder()
                .storage(InMemoryStorage::with_state(stored))
                .build()
                .await
                .unwrap();
            let series = tracker.benchmark();
            assert_eq!(series.points.len(), 2);
        }

        #[tokio::test]
        async fn lookup_quote_without_remote_is_zero() {
            let tracker = tracker().await;
            let quote = tracker.lookup_quote("VOO").await;
            assert!(quote.price.abs() < f64::EPSILON);
        }

        #[tokio::test]
        async fn failed_save_leaves_document_untouched() {
            let stored = stored_document();
            let mut tracker = WealthTracker::builder()
                .storage(ReadOnlyStorage(stored.clone()))
                .build()
                .await
                .unwrap();

            let added = tracker
                .add_account(Account::cash("Citi", Currency::Usd, 10.0))
                .await;
            assert!(matches!(added, Err(WealthError::Storage(_))));
            assert_eq!(tracker.state(), &stored);

            let cash = stored.accounts.first().unwrap().id.clone();
            let fd = stored.fixed_deposits.first().unwrap().id.clone();
            assert!(tracker.remove_account(&cash).await.is_err());
            assert!(tracker.upsert_deposit(term_deposit(1.0)).await.is_err());
            assert!(tracker.remove_deposit(&fd).await.is_err());
            assert_eq!(tracker.state(), &stored);
        }
    }
}
