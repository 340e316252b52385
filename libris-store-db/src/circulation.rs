// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Issue and return workflow.
//!
//! Both operations run as a single unit of work. Any failed precondition
//! aborts the transaction, so a failed call never leaves a partial write.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::connection::StoreDb;
use crate::error::{Error, Result};
use crate::ledger;
use crate::types::Issue;
use crate::validate;

impl StoreDb {
    /// Lend one copy of `book_id` to `student_id` until `due_date`.
    ///
    /// Checks, in order: the book exists, it has a copy available, the
    /// student exists, the student does not already hold this book, and the
    /// due date lies after `now`. On success the new issue is stored with
    /// `issue_date = now` and the book's availability drops by one.
    pub fn issue_book(
        &mut self,
        book_id: i64,
        student_id: i64,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Issue> {
        validate::due_date(due_date, now)?;

        let issue = self.unit_of_work(|records| {
            let book = records
                .find_book(book_id)?
                .ok_or_else(|| Error::not_found("book"))?;
            let remaining = ledger::available_after_issue(book.available_copies)?;

            records
                .find_student(student_id)?
                .ok_or_else(|| Error::not_found("student"))?;

            // Keyed off the stored status alone: an overdue loan is still active.
            if records.find_active_issue_for(book_id, student_id)?.is_some() {
                return Err(Error::conflict("already issued to this student"));
            }

            validate::due_date(due_date, now)?;

            let issue = records.insert_issue(book_id, student_id, now, due_date)?;
            records.set_available_copies(book_id, remaining, now)?;
            Ok(issue)
        })?;

        info!(
            issue_id = issue.id,
            book_id, student_id, "issued book to student"
        );
        Ok(issue)
    }

    /// Record the return of an active issue at `now`.
    ///
    /// The issue becomes `returned` with `return_date = now` and the book
    /// gains one available copy, clamped to its total. Returning an issue
    /// that is unknown or already returned fails with `NotFound`.
    pub fn return_book(&mut self, issue_id: i64, now: DateTime<Utc>) -> Result<Issue> {
        let issue = self.unit_of_work(|records| {
            let issue = records
                .find_active_issue(issue_id)?
                .ok_or_else(|| Error::not_found("active issue"))?;

            records.mark_returned(issue.id, now)?;

            let book = records
                .find_book(issue.book_id)?
                .ok_or_else(|| Error::not_found("book"))?;
            let available =
                ledger::available_after_return(book.available_copies, book.total_copies);
            records.set_available_copies(book.id, available, now)?;

            records
                .find_issue(issue.id)?
                .ok_or_else(|| Error::not_found("active issue"))
        })?;

        info!(
            issue_id = issue.id,
            book_id = issue.book_id,
            student_id = issue.student_id,
            "returned book"
        );
        Ok(issue)
    }
}
