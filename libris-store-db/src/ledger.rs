// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Availability ledger.
//!
//! `available_copies = total_copies - active issues`, kept by the issue and
//! return workflow and by administrative edits of `total_copies`.

use serde::Serialize;
use tracing::warn;

use crate::connection::StoreDb;
use crate::error::{Error, Result};

/// Availability after lending one copy.
pub(crate) fn available_after_issue(available: u32) -> Result<u32> {
    available
        .checked_sub(1)
        .ok_or_else(|| Error::conflict("no copies available"))
}

/// Availability after one copy comes back, never above `total`.
pub fn available_after_return(available: u32, total: u32) -> u32 {
    let next = available.saturating_add(1);
    if next > total {
        warn!(available, total, "returned copy would exceed total copies, clamping");
        total
    } else {
        next
    }
}

/// Availability after `total_copies` is edited from `old_total` to `new_total`.
///
/// The number of copies on loan is preserved. Fails with a conflict if the new
/// total is smaller than that number.
pub fn recompute_available(old_total: u32, old_available: u32, new_total: u32) -> Result<u32> {
    let issued = old_total.saturating_sub(old_available);
    new_total
        .checked_sub(issued)
        .ok_or_else(|| Error::conflict("cannot reduce below currently issued count"))
}

/// A book whose stored availability disagrees with its active issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerDiscrepancy {
    pub book_id: i64,
    pub total_copies: u32,
    pub available_copies: u32,
    pub active_issues: u64,
}

impl StoreDb {
    /// List every book whose availability does not match its active issues.
    pub fn audit_ledger(&mut self) -> Result<Vec<LedgerDiscrepancy>> {
        self.read(|records| {
            let mut stmt = records.conn().prepare_cached(
                r#"
                SELECT b.id, b.total_copies, b.available_copies,
                       (SELECT COUNT(*) FROM issues i WHERE i.book_id = b.id AND i.status = 'issued')
                FROM books b
                WHERE b.available_copies + (SELECT COUNT(*) FROM issues i WHERE i.book_id = b.id AND i.status = 'issued')
                      != b.total_copies
                ORDER BY b.id
                "#,
            )?;
            let mut rows = stmt.query([])?;
            let mut found = Vec::new();
            while let Some(row) = rows.next()? {
                found.push(LedgerDiscrepancy {
                    book_id: row.get(0)?,
                    total_copies: row.get(1)?,
                    available_copies: row.get(2)?,
                    active_issues: row.get::<_, i64>(3)? as u64,
                });
            }
            Ok(found)
        })
    }
}
