//! # shopledger-core: Pure Domain Logic for shopledger
//!
//! The heart of the inventory and sales ledger. Everything in this crate is
//! a pure function over plain data: no database, no network, no clocks
//! beyond timestamps passed in by callers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Presentation / export layer (external)                         │
//! │        │                                                        │
//! │        ▼                                                        │
//! │  shopledger-db                                                  │
//! │    Ledger Engine ── Sale Coordinator ── Purchase Coordinator    │
//! │        │                                                        │
//! │        ▼                                                        │
//! │  ★ shopledger-core (THIS CRATE) ★                               │
//! │    types ── money ── error ── validation ── policy              │
//! │                                                                 │
//! │    NO I/O • NO DATABASE • PURE FUNCTIONS                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Invoice, PurchaseOrder, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//! - [`policy`] - Loyalty point accrual policy

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod policy;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use policy::LoyaltyPolicy;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single sale.
///
/// Keeps transaction sizes reasonable for a small-business counter; a cart
/// larger than this is almost certainly an input error.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity for a single stock movement.
///
/// Guards against fat-finger quantities (1000 typed instead of 10).
pub const MAX_MOVEMENT_QUANTITY: i64 = 100_000;
