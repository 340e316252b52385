// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Database row types for the library collections.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A book title held by the library.
///
/// `available_copies` is the availability ledger: it always equals
/// `total_copies` minus the number of active issues for this book.
/// Serialized payloads also carry `issued_copies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "BookPayload")]
pub struct Book {
    /// Database row ID
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Digits and hyphens only, unique
    pub isbn: String,
    /// Copies owned, at least 1
    pub total_copies: u32,
    /// Copies not currently on loan
    pub available_copies: u32,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Copies currently on loan.
    pub fn issued_copies(&self) -> u32 {
        self.total_copies.saturating_sub(self.available_copies)
    }
}

#[derive(Serialize)]
struct BookPayload {
    id: i64,
    title: String,
    author: String,
    isbn: String,
    total_copies: u32,
    available_copies: u32,
    issued_copies: u32,
    category: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Book> for BookPayload {
    fn from(book: Book) -> Self {
        let issued_copies = book.issued_copies();
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            issued_copies,
            category: book.category,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// A student who can borrow books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    /// Database row ID
    pub id: i64,
    pub name: String,
    /// Unique roll number
    pub roll_number: String,
    pub department: String,
    /// 1 through 8
    pub semester: u8,
    /// Ten digits
    pub phone: String,
    /// Unique, stored lowercased
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted issue status. Overdue is never stored, see [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Issued,
    Returned,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Returned => "returned",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(Self::Issued),
            "returned" => Ok(Self::Returned),
            other => Err(format!("unknown issue status '{other}'")),
        }
    }
}

/// Status of an issue as observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Issued,
    Overdue,
    Returned,
}

/// A loan of one book copy to one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Database row ID
    pub id: i64,
    pub book_id: i64,
    pub student_id: i64,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    /// Set once the book is returned
    pub return_date: Option<DateTime<Utc>>,
    pub status: IssueStatus,
}

impl Issue {
    /// True while the book is still on loan.
    pub fn is_active(&self) -> bool {
        self.status == IssueStatus::Issued
    }

    /// See [`classify`].
    pub fn state(&self, now: DateTime<Utc>) -> IssueState {
        classify(self, now)
    }
}

/// Classify an issue at `now`.
///
/// Returned if a return date is recorded, overdue if still issued and past
/// due, otherwise issued.
pub fn classify(issue: &Issue, now: DateTime<Utc>) -> IssueState {
    if issue.return_date.is_some() {
        IssueState::Returned
    } else if issue.status == IssueStatus::Issued && issue.due_date < now {
        IssueState::Overdue
    } else {
        IssueState::Issued
    }
}

/// Fields accepted when creating or editing a book.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: i64,
    pub category: String,
}

/// Fields accepted when creating or editing a student.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct StudentInput {
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub semester: i64,
    pub phone: String,
    pub email: String,
}

/// An issue joined with the book and student it references.
///
/// The joined fields are `None` when the record has since been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueDetails {
    pub id: i64,
    pub book_id: i64,
    pub student_id: i64,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: IssueStatus,
    pub state: IssueState,
    pub is_overdue: bool,
    pub book_title: Option<String>,
    pub book_author: Option<String>,
    pub isbn: Option<String>,
    pub student_name: Option<String>,
    pub roll_number: Option<String>,
    pub department: Option<String>,
}

/// An overdue issue with the contact details needed to chase it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueIssue {
    pub id: i64,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub book_title: String,
    pub book_author: String,
    pub student_name: String,
    pub roll_number: String,
    pub email: String,
    pub phone: String,
    /// Seconds elapsed since the due date
    pub overdue_seconds: i64,
}

/// Aggregate circulation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IssueStats {
    pub currently_issued: u64,
    pub total_returned: u64,
    pub overdue: u64,
    pub total_issues: u64,
}

/// Convert Unix milliseconds to a UTC timestamp.
///
/// Values outside chrono's range clamp to the Unix epoch.
pub(crate) fn from_unix_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Convert a UTC timestamp to Unix milliseconds.
pub(crate) fn to_unix_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}
