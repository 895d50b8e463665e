//! Multi-currency personal wealth tracker.
//!
//! This crate records cash, stock and fixed-deposit holdings in HKD, AUD
//! and USD, computes net worth and projected passive income in HKD, keeps
//! a monthly net-worth history, and syncs a flattened snapshot to a
//! spreadsheet-backed HTTP store. A Gemini-powered scanner turns photos of
//! bank or brokerage statements into candidate holdings.
//!
//! The entry point is the [`tracker`] module; the pure computations live
//! in [`aggregator`] and [`insights`].

pub mod aggregator;
pub mod backup;
#[cfg(any(feature = "async", feature = "blocking"))]
pub mod client;
pub mod error;
pub mod insights;
pub mod models;
pub mod retry;
#[cfg(any(feature = "async", feature = "blocking"))]
pub mod scanner;
pub mod storage;
pub mod symbols;
pub mod sync;
#[cfg(any(feature = "async", feature = "blocking"))]
pub mod tracker;
