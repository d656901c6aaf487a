//! # Business Number Allocation
//!
//! Invoices and purchase orders carry date-stamped sequential numbers:
//! `INV-20260807-001`, `PO-20260807-014`. The sequence is monotonic within
//! the day and the column is UNIQUE, so an allocation that races another
//! writer fails on insert and the caller retries with a fresh number.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

/// Day prefix for a business number, e.g. `INV-20260807-`.
pub(crate) fn day_prefix(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}-", prefix, now.format("%Y%m%d"))
}

/// Allocates the next number for `table` within the caller's transaction.
///
/// Reads the highest numeric suffix issued today and adds one. `substr`
/// keeps the comparison numeric, so the sequence survives past 999 even
/// though the usual width is three digits.
pub(crate) async fn next_number(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    prefix: &str,
    now: DateTime<Utc>,
) -> Result<String, sqlx::Error> {
    let day_prefix = day_prefix(prefix, now);

    // `table` is a compile-time constant at every call site, never input.
    let sql = format!(
        "SELECT COALESCE(MAX(CAST(substr(number, {}) AS INTEGER)), 0) \
         FROM {} WHERE number LIKE ?1",
        day_prefix.len() + 1,
        table
    );

    let max_seq: i64 = sqlx::query_scalar(&sql)
        .bind(format!("{day_prefix}%"))
        .fetch_one(&mut **tx)
        .await?;

    Ok(format!("{}{:03}", day_prefix, max_seq + 1))
}

// =============================================================================
// Unit Tests
// =============================================================================
