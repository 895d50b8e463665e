//! Data models for the persisted document and its wire formats.
//!
//! This module contains strongly-typed representations of holdings,
//! history snapshots, the root document, newtype ID wrappers, and the
//! request/response shapes used by the remote store and the statement
//! scanner.

mod account;
mod currency;
mod deposit;
mod enums;
mod history;
mod ids;
mod remote;
mod scan;
mod state;

pub use account::Account;
pub use chrono::NaiveDate;
pub use currency::Currency;
pub use deposit::FixedDeposit;
pub use enums::{AccountKind, AssetClass, DepositKind};
pub use history::{HistoricalDataPoint, MonthKey};
pub use ids::{AccountId, DepositId};
pub use remote::{Quote, SyncAsset, SyncPayload, SyncReply};
pub use scan::ScannedAsset;
pub use state::{AppState, DEFAULT_WEALTH_GOAL};
