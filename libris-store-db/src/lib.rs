// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! SQLite record store for the libris college library service.
//!
//! This crate owns the three persistent collections (books, students and
//! issues) and every operation that has to keep them consistent with each
//! other.
//!
//! **Architecture**: This is the storage and workflow layer. The HTTP surface
//! in `libris-server` only translates requests into calls on [`StoreDb`].
//!
//! # Key Features
//!
//! - Schema with uniqueness and range constraints
//! - Unit-of-work transactions over a [`Records`] handle
//! - Availability ledger (`available_copies` vs. active issues)
//! - Issue/return workflow with ordered precondition checks
//! - Listing, filtering, pagination and circulation statistics
//! - In-memory database for testing
//!
//! # Example
//!
//! ```ignore
//! use chrono::{Duration, Utc};
//! use libris_store_db::{BookInput, OpenMode, StoreDb};
//!
//! let mut db = StoreDb::open("libris.sqlite", OpenMode::Create)?;
//! let book = db.create_book(&BookInput {
//!     title: "Operating Systems".into(),
//!     author: "Silberschatz".into(),
//!     isbn: "978-0470128725".into(),
//!     total_copies: 2,
//!     category: "Computer Science".into(),
//! }, Utc::now())?;
//!
//! let now = Utc::now();
//! let issue = db.issue_book(book.id, student_id, now + Duration::days(14), now)?;
//! db.return_book(issue.id, Utc::now())?;
//! ```

mod admin;
mod circulation;
mod connection;
mod error;
mod ledger;
mod query;
mod records;
mod schema;
mod types;
mod validate;

pub use connection::{OpenMode, StoreDb};
pub use error::{Error, FieldError, Result};
pub use ledger::{LedgerDiscrepancy, available_after_return, recompute_available};
pub use query::{
    BookFilter, IssueFilter, IssueStatusFilter, MAX_PAGE_SIZE, Page, Paginated, Pagination,
    StudentFilter,
};
pub use records::Records;
pub use schema::SCHEMA_VERSION;
pub use types::*;
