//! # shopledger-db: Database Layer for shopledger
//!
//! SQLite persistence for the inventory and sales ledger, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Presentation / export layer (external)                         │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                shopledger-db (THIS CRATE)               │    │
//! │  │                                                         │    │
//! │  │  Sale Coordinator ──┐                                   │    │
//! │  │  Purchase Coord.  ──┼──► Ledger Engine ──► products +   │    │
//! │  │  Catalog / Parties ─┘       (stock)        stock_history│    │
//! │  │  Reports (read-only)                                    │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  SQLite database (WAL, foreign keys on)                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stock mutation flows through [`repository::ledger::LedgerEngine`],
//! which pairs the stock write with an append-only history row inside one
//! transaction. The sale and purchase coordinators compose that primitive
//! into multi-line, all-or-nothing operations.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage and combined error types
//! - [`repository`] - Repositories and coordinators

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::customer::CustomerRepository;
pub use repository::ledger::LedgerEngine;
pub use repository::purchase::PurchaseCoordinator;
pub use repository::report::ReportRepository;
pub use repository::sale::{SaleCoordinator, SaleReceipt};
pub use repository::supplier::SupplierRepository;
