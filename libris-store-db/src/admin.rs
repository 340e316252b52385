// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Administrative create, edit and delete of books and students.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::connection::StoreDb;
use crate::error::{Error, Result};
use crate::ledger;
use crate::records::Records;
use crate::types::{Book, BookInput, Issue, Student, StudentInput};
use crate::validate::{self, ValidStudent};

impl StoreDb {
    /// Add a book. All copies start out available.
    pub fn create_book(&mut self, input: &BookInput, now: DateTime<Utc>) -> Result<Book> {
        let book = validate::book(input)?;
        let created = self.unit_of_work(|records| {
            if records.find_book_by_isbn(&book.isbn)?.is_some() {
                return Err(Error::conflict("a book with this ISBN already exists"));
            }
            records.insert_book(&book, now)
        })?;
        debug!(book_id = created.id, isbn = %created.isbn, "created book");
        Ok(created)
    }

    /// Edit a book.
    ///
    /// A change of `total_copies` keeps the number of copies on loan, so the
    /// availability becomes `new_total - issued`. An edit that would make it
    /// negative fails with a conflict and nothing is written.
    pub fn update_book(&mut self, id: i64, input: &BookInput, now: DateTime<Utc>) -> Result<Book> {
        let book = validate::book(input)?;
        self.unit_of_work(|records| {
            let current = records
                .find_book(id)?
                .ok_or_else(|| Error::not_found("book"))?;
            if records
                .find_book_by_isbn(&book.isbn)?
                .is_some_and(|other| other.id != id)
            {
                return Err(Error::conflict("a book with this ISBN already exists"));
            }
            let available = ledger::recompute_available(
                current.total_copies,
                current.available_copies,
                book.total_copies,
            )?;
            records.update_book(id, &book, available, now)
        })
    }

    /// Delete a book that no active issue references.
    pub fn delete_book(&mut self, id: i64) -> Result<()> {
        self.unit_of_work(|records| {
            records
                .find_book(id)?
                .ok_or_else(|| Error::not_found("book"))?;
            if records.count_active_issues_for_book(id)? > 0 {
                return Err(Error::conflict("cannot delete book with active issues"));
            }
            records.delete_book(id)?;
            Ok(())
        })?;
        debug!(book_id = id, "deleted book");
        Ok(())
    }

    pub fn create_student(&mut self, input: &StudentInput, now: DateTime<Utc>) -> Result<Student> {
        let student = validate::student(input)?;
        let created = self.unit_of_work(|records| {
            check_student_unique(records, &student, None)?;
            records.insert_student(&student, now)
        })?;
        debug!(student_id = created.id, roll_number = %created.roll_number, "created student");
        Ok(created)
    }

    pub fn update_student(
        &mut self,
        id: i64,
        input: &StudentInput,
        now: DateTime<Utc>,
    ) -> Result<Student> {
        let student = validate::student(input)?;
        self.unit_of_work(|records| {
            records
                .find_student(id)?
                .ok_or_else(|| Error::not_found("student"))?;
            check_student_unique(records, &student, Some(id))?;
            records.update_student(id, &student, now)
        })
    }

    /// Delete a student that no active issue references.
    pub fn delete_student(&mut self, id: i64) -> Result<()> {
        self.unit_of_work(|records| {
            records
                .find_student(id)?
                .ok_or_else(|| Error::not_found("student"))?;
            if records.count_active_issues_for_student(id)? > 0 {
                return Err(Error::conflict("cannot delete student with active issues"));
            }
            records.delete_student(id)?;
            Ok(())
        })?;
        debug!(student_id = id, "deleted student");
        Ok(())
    }

    pub fn get_book(&mut self, id: i64) -> Result<Book> {
        self.read(|records| records.find_book(id)?.ok_or_else(|| Error::not_found("book")))
    }

    pub fn get_student(&mut self, id: i64) -> Result<Student> {
        self.read(|records| {
            records
                .find_student(id)?
                .ok_or_else(|| Error::not_found("student"))
        })
    }

    pub fn get_issue(&mut self, id: i64) -> Result<Issue> {
        self.read(|records| {
            records
                .find_issue(id)?
                .ok_or_else(|| Error::not_found("issue"))
        })
    }
}

/// Roll number and email are unique; `own_id` is skipped when editing.
fn check_student_unique(
    records: &Records<'_>,
    student: &ValidStudent,
    own_id: Option<i64>,
) -> Result<()> {
    let is_other = |found: Option<Student>| found.is_some_and(|s| Some(s.id) != own_id);
    if is_other(records.find_student_by_roll_number(&student.roll_number)?) {
        return Err(Error::conflict("a student with this roll number already exists"));
    }
    if is_other(records.find_student_by_email(&student.email)?) {
        return Err(Error::conflict("a student with this email already exists"));
    }
    Ok(())
}
