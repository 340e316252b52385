// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Record-level access to the three collections.
//!
//! A [`Records`] handle is only handed out by [`StoreDb::unit_of_work`] and
//! [`StoreDb::read`], so every call made through it belongs to one
//! transaction.
//!
//! [`StoreDb::unit_of_work`]: crate::StoreDb::unit_of_work
//! [`StoreDb::read`]: crate::StoreDb::read

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::types::{Book, Issue, IssueStatus, Student, from_unix_millis, to_unix_millis};
use crate::validate::{ValidBook, ValidStudent};

pub(crate) const BOOK_COLUMNS: &str =
    "id, title, author, isbn, total_copies, available_copies, category, created_at, updated_at";
pub(crate) const STUDENT_COLUMNS: &str =
    "id, name, roll_number, department, semester, phone, email, created_at, updated_at";
pub(crate) const ISSUE_COLUMNS: &str =
    "id, book_id, student_id, issue_date, due_date, return_date, status";

impl FromSql for IssueStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for IssueStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

pub(crate) fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        isbn: row.get(3)?,
        total_copies: row.get(4)?,
        available_copies: row.get(5)?,
        category: row.get(6)?,
        created_at: from_unix_millis(row.get(7)?),
        updated_at: from_unix_millis(row.get(8)?),
    })
}

pub(crate) fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        roll_number: row.get(2)?,
        department: row.get(3)?,
        semester: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        created_at: from_unix_millis(row.get(7)?),
        updated_at: from_unix_millis(row.get(8)?),
    })
}

pub(crate) fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        book_id: row.get(1)?,
        student_id: row.get(2)?,
        issue_date: from_unix_millis(row.get(3)?),
        due_date: from_unix_millis(row.get(4)?),
        return_date: row.get::<_, Option<i64>>(5)?.map(from_unix_millis),
        status: row.get(6)?,
    })
}

/// Find-by-id, find-one-matching, insert and update over one transaction.
pub struct Records<'tx> {
    conn: &'tx Connection,
}

impl<'tx> Records<'tx> {
    pub(crate) fn new(conn: &'tx Connection) -> Self {
        Self { conn }
    }

    pub(crate) fn conn(&self) -> &'tx Connection {
        self.conn
    }

    // === Books ===

    pub fn find_book(&self, id: i64) -> Result<Option<Book>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], book_from_row).optional()?)
    }

    pub fn find_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?1"))?;
        Ok(stmt.query_row(params![isbn], book_from_row).optional()?)
    }

    pub(crate) fn insert_book(&self, book: &ValidBook, now: DateTime<Utc>) -> Result<Book> {
        let now = to_unix_millis(now);
        self.conn.execute(
            r#"
            INSERT INTO books (title, author, isbn, total_copies, available_copies, category, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?6)
            "#,
            params![book.title, book.author, book.isbn, book.total_copies, book.category, now],
        )?;
        self.expect_book(self.conn.last_insert_rowid())
    }

    pub(crate) fn update_book(
        &self,
        id: i64,
        book: &ValidBook,
        available_copies: u32,
        now: DateTime<Utc>,
    ) -> Result<Book> {
        self.conn.execute(
            r#"
            UPDATE books
            SET title = ?2, author = ?3, isbn = ?4, total_copies = ?5,
                available_copies = ?6, category = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                id,
                book.title,
                book.author,
                book.isbn,
                book.total_copies,
                available_copies,
                book.category,
                to_unix_millis(now),
            ],
        )?;
        self.expect_book(id)
    }

    /// Write a new availability count for a book.
    pub fn set_available_copies(&self, id: i64, available: u32, now: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE books SET available_copies = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, available, to_unix_millis(now)],
        )?;
        Ok(())
    }

    pub(crate) fn delete_book(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM books WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn expect_book(&self, id: i64) -> Result<Book> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], book_from_row)?)
    }

    // === Students ===

    pub fn find_student(&self, id: i64) -> Result<Option<Student>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"
        ))?;
        Ok(stmt.query_row(params![id], student_from_row).optional()?)
    }

    pub fn find_student_by_roll_number(&self, roll_number: &str) -> Result<Option<Student>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE roll_number = ?1"
        ))?;
        Ok(stmt
            .query_row(params![roll_number], student_from_row)
            .optional()?)
    }

    pub fn find_student_by_email(&self, email: &str) -> Result<Option<Student>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE email = ?1"
        ))?;
        Ok(stmt.query_row(params![email], student_from_row).optional()?)
    }

    pub(crate) fn insert_student(
        &self,
        student: &ValidStudent,
        now: DateTime<Utc>,
    ) -> Result<Student> {
        self.conn.execute(
            r#"
            INSERT INTO students (name, roll_number, department, semester, phone, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
            params![
                student.name,
                student.roll_number,
                student.department,
                student.semester,
                student.phone,
                student.email,
                to_unix_millis(now),
            ],
        )?;
        self.expect_student(self.conn.last_insert_rowid())
    }

    pub(crate) fn update_student(
        &self,
        id: i64,
        student: &ValidStudent,
        now: DateTime<Utc>,
    ) -> Result<Student> {
        self.conn.execute(
            r#"
            UPDATE students
            SET name = ?2, roll_number = ?3, department = ?4, semester = ?5,
                phone = ?6, email = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                id,
                student.name,
                student.roll_number,
                student.department,
                student.semester,
                student.phone,
                student.email,
                to_unix_millis(now),
            ],
        )?;
        self.expect_student(id)
    }

    pub(crate) fn delete_student(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM students WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn expect_student(&self, id: i64) -> Result<Student> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"
        ))?;
        Ok(stmt.query_row(params![id], student_from_row)?)
    }

    // === Issues ===

    pub fn find_issue(&self, id: i64) -> Result<Option<Issue>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], issue_from_row).optional()?)
    }

    /// The issue with this id if it is still active.
    pub fn find_active_issue(&self, id: i64) -> Result<Option<Issue>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1 AND status = 'issued'"
        ))?;
        Ok(stmt.query_row(params![id], issue_from_row).optional()?)
    }

    /// The active issue of `book_id` to `student_id`, if any.
    pub fn find_active_issue_for(&self, book_id: i64, student_id: i64) -> Result<Option<Issue>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            r#"
            SELECT {ISSUE_COLUMNS} FROM issues
            WHERE book_id = ?1 AND student_id = ?2 AND status = 'issued'
            "#
        ))?;
        Ok(stmt
            .query_row(params![book_id, student_id], issue_from_row)
            .optional()?)
    }

    pub fn count_active_issues_for_book(&self, book_id: i64) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE book_id = ?1 AND status = 'issued'",
            params![book_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn count_active_issues_for_student(&self, student_id: i64) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE student_id = ?1 AND status = 'issued'",
            params![student_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub(crate) fn insert_issue(
        &self,
        book_id: i64,
        student_id: i64,
        issue_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Result<Issue> {
        self.conn.execute(
            r#"
            INSERT INTO issues (book_id, student_id, issue_date, due_date, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                book_id,
                student_id,
                to_unix_millis(issue_date),
                to_unix_millis(due_date),
                IssueStatus::Issued,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], issue_from_row)?)
    }

    pub(crate) fn mark_returned(&self, id: i64, return_date: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE issues SET status = ?2, return_date = ?3 WHERE id = ?1",
            params![id, IssueStatus::Returned, to_unix_millis(return_date)],
        )?;
        Ok(())
    }
}
