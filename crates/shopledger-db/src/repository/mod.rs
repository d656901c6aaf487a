//! # Repository Implementations
//!
//! One module per concern:
//!
//! - [`catalog`] - categories and products (everything except stock)
//! - [`customer`] / [`supplier`] - parties
//! - [`ledger`] - the ledger engine; the only code that writes stock
//! - [`sale`] - the sale transaction coordinator
//! - [`purchase`] - the purchase receipt coordinator
//! - [`report`] - read-only aggregates

pub mod catalog;
pub mod customer;
pub mod ledger;
mod numbering;
pub mod purchase;
pub mod report;
pub mod sale;
pub mod supplier;
