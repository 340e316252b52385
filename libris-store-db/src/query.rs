// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Read query operations: listing, filtering, pagination and statistics.

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{Row, params, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::connection::StoreDb;
use crate::error::{Error, FieldError, Result};
use crate::records::{BOOK_COLUMNS, Records, STUDENT_COLUMNS, book_from_row, student_from_row};
use crate::types::{
    Book, IssueDetails, IssueState, IssueStats, IssueStatus, OverdueIssue, Student,
    from_unix_millis, to_unix_millis,
};

/// Largest page a caller may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_PAGE_SIZE: u32 = 10;

/// A validated page request. Pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    /// Build a page request from raw query values, applying defaults.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self> {
        let mut errors = Vec::new();
        let page = match page.map(u32::try_from) {
            None => 1,
            Some(Ok(n)) if n >= 1 => n,
            Some(_) => {
                errors.push(FieldError::new("page", "Page must be a positive integer"));
                1
            }
        };
        let limit = match limit.map(u32::try_from) {
            None => DEFAULT_PAGE_SIZE,
            Some(Ok(n)) if (1..=MAX_PAGE_SIZE).contains(&n) => n,
            Some(_) => {
                errors.push(FieldError::new(
                    "limit",
                    format!("Limit must be between 1 and {MAX_PAGE_SIZE}"),
                ));
                DEFAULT_PAGE_SIZE
            }
        };
        if errors.is_empty() {
            Ok(Self { page, limit })
        } else {
            Err(Error::Validation { errors })
        }
    }

    fn offset(self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

/// Position of a page within the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    fn new(page: Page, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(u64::from(page.limit));
        Self {
            current_page: page.page,
            total_pages,
            total_items,
            has_next_page: u64::from(page.page) < total_pages,
            has_prev_page: page.page > 1,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Case-insensitive substring filters, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
}

/// Substring filters on text fields, exact match on semester.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    pub name: Option<String>,
    pub roll_number: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub semester: Option<u8>,
}

/// Issue status as a caller can filter by it. `Overdue` is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatusFilter {
    Issued,
    Returned,
    Overdue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub status: Option<IssueStatusFilter>,
    pub student_id: Option<i64>,
    pub book_id: Option<i64>,
}

/// Accumulates `WHERE` clauses with their positional parameters.
#[derive(Default)]
struct Where {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Where {
    fn push(&mut self, clause: &str, value: impl ToSql + 'static) {
        self.params.push(Box::new(value));
        self.clauses
            .push(clause.replace('?', &format!("?{}", self.params.len())));
    }

    fn contains(&mut self, column: &str, needle: Option<&str>) {
        if let Some(needle) = needle.map(str::trim).filter(|n| !n.is_empty()) {
            self.push(
                &format!("{column} LIKE ? ESCAPE '\\'"),
                format!("%{}%", escape_like(needle)),
            );
        }
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn next_param(&self) -> usize {
        self.params.len() + 1
    }

    fn with<'a>(&'a self, extra: &[&'a dyn ToSql]) -> Vec<&'a dyn ToSql> {
        self.params
            .iter()
            .map(|p| p.as_ref())
            .chain(extra.iter().copied())
            .collect()
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn count(records: &Records<'_>, sql: &str, filter: &Where) -> Result<u64> {
    let total: i64 = records
        .conn()
        .query_row(sql, params_from_iter(filter.with(&[])), |row| row.get(0))?;
    Ok(total as u64)
}

const ISSUE_DETAIL_SQL: &str = r#"
    SELECT i.id, i.book_id, i.student_id, i.issue_date, i.due_date, i.return_date, i.status,
           b.title, b.author, b.isbn, s.name, s.roll_number, s.department
    FROM issues i
    LEFT JOIN books b ON b.id = i.book_id
    LEFT JOIN students s ON s.id = i.student_id
"#;

fn issue_details_from_row(row: &Row<'_>, now: DateTime<Utc>) -> rusqlite::Result<IssueDetails> {
    let issue = crate::records::issue_from_row(row)?;
    let state = issue.state(now);
    Ok(IssueDetails {
        id: issue.id,
        book_id: issue.book_id,
        student_id: issue.student_id,
        issue_date: issue.issue_date,
        due_date: issue.due_date,
        return_date: issue.return_date,
        status: issue.status,
        state,
        is_overdue: state == IssueState::Overdue,
        book_title: row.get(7)?,
        book_author: row.get(8)?,
        isbn: row.get(9)?,
        student_name: row.get(10)?,
        roll_number: row.get(11)?,
        department: row.get(12)?,
    })
}

impl StoreDb {
    /// Books matching `filter`, newest first.
    pub fn list_books(&mut self, filter: &BookFilter, page: Page) -> Result<Paginated<Book>> {
        let mut filter_sql = Where::default();
        filter_sql.contains("title", filter.title.as_deref());
        filter_sql.contains("author", filter.author.as_deref());
        filter_sql.contains("category", filter.category.as_deref());

        self.read(|records| {
            let where_sql = filter_sql.sql();
            let total = count(
                records,
                &format!("SELECT COUNT(*) FROM books {where_sql}"),
                &filter_sql,
            )?;
            let n = filter_sql.next_param();
            let mut stmt = records.conn().prepare(&format!(
                "SELECT {BOOK_COLUMNS} FROM books {where_sql} ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
                n,
                n + 1
            ))?;
            let (limit, offset) = (i64::from(page.limit), page.offset());
            let items = stmt
                .query_map(params_from_iter(filter_sql.with(&[&limit, &offset])), book_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Paginated {
                items,
                pagination: Pagination::new(page, total),
            })
        })
    }

    /// Students matching `filter`, newest first.
    pub fn list_students(
        &mut self,
        filter: &StudentFilter,
        page: Page,
    ) -> Result<Paginated<Student>> {
        let mut filter_sql = Where::default();
        filter_sql.contains("name", filter.name.as_deref());
        filter_sql.contains("roll_number", filter.roll_number.as_deref());
        filter_sql.contains("phone", filter.phone.as_deref());
        filter_sql.contains("department", filter.department.as_deref());
        if let Some(semester) = filter.semester {
            filter_sql.push("semester = ?", semester);
        }

        self.read(|records| {
            let where_sql = filter_sql.sql();
            let total = count(
                records,
                &format!("SELECT COUNT(*) FROM students {where_sql}"),
                &filter_sql,
            )?;
            let n = filter_sql.next_param();
            let mut stmt = records.conn().prepare(&format!(
                "SELECT {STUDENT_COLUMNS} FROM students {where_sql} ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
                n,
                n + 1
            ))?;
            let (limit, offset) = (i64::from(page.limit), page.offset());
            let items = stmt
                .query_map(
                    params_from_iter(filter_sql.with(&[&limit, &offset])),
                    student_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Paginated {
                items,
                pagination: Pagination::new(page, total),
            })
        })
    }

    /// Issues matching `filter`, most recently issued first.
    pub fn list_issues(
        &mut self,
        filter: &IssueFilter,
        page: Page,
        now: DateTime<Utc>,
    ) -> Result<Paginated<IssueDetails>> {
        let mut filter_sql = Where::default();
        match filter.status {
            Some(IssueStatusFilter::Issued) => filter_sql.push("i.status = ?", IssueStatus::Issued),
            Some(IssueStatusFilter::Returned) => {
                filter_sql.push("i.status = ?", IssueStatus::Returned)
            }
            Some(IssueStatusFilter::Overdue) => {
                filter_sql.push("i.status = ?", IssueStatus::Issued);
                filter_sql.push("i.due_date < ?", to_unix_millis(now));
            }
            None => {}
        }
        if let Some(student_id) = filter.student_id {
            filter_sql.push("i.student_id = ?", student_id);
        }
        if let Some(book_id) = filter.book_id {
            filter_sql.push("i.book_id = ?", book_id);
        }

        self.read(|records| {
            let where_sql = filter_sql.sql();
            let total = count(
                records,
                &format!("SELECT COUNT(*) FROM issues i {where_sql}"),
                &filter_sql,
            )?;
            let n = filter_sql.next_param();
            let mut stmt = records.conn().prepare(&format!(
                "{ISSUE_DETAIL_SQL} {where_sql} ORDER BY i.issue_date DESC, i.id DESC LIMIT ?{} OFFSET ?{}",
                n,
                n + 1
            ))?;
            let (limit, offset) = (i64::from(page.limit), page.offset());
            let items = stmt
                .query_map(params_from_iter(filter_sql.with(&[&limit, &offset])), |row| {
                    issue_details_from_row(row, now)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Paginated {
                items,
                pagination: Pagination::new(page, total),
            })
        })
    }

    /// Active issues past their due date, longest overdue first.
    pub fn list_overdue(&mut self, now: DateTime<Utc>) -> Result<Vec<OverdueIssue>> {
        let now_millis = to_unix_millis(now);
        self.read(|records| {
            let mut stmt = records.conn().prepare_cached(
                r#"
                SELECT i.id, i.issue_date, i.due_date, b.title, b.author,
                       s.name, s.roll_number, s.email, s.phone
                FROM issues i
                JOIN books b ON b.id = i.book_id
                JOIN students s ON s.id = i.student_id
                WHERE i.status = 'issued' AND i.due_date < ?1
                ORDER BY i.due_date ASC, i.id ASC
                "#,
            )?;
            let items = stmt
                .query_map(params![now_millis], |row| {
                    let due_millis: i64 = row.get(2)?;
                    Ok(OverdueIssue {
                        id: row.get(0)?,
                        issue_date: from_unix_millis(row.get(1)?),
                        due_date: from_unix_millis(due_millis),
                        book_title: row.get(3)?,
                        book_author: row.get(4)?,
                        student_name: row.get(5)?,
                        roll_number: row.get(6)?,
                        email: row.get(7)?,
                        phone: row.get(8)?,
                        overdue_seconds: (now_millis - due_millis) / 1000,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    /// Books a student currently holds, most recently issued first.
    pub fn student_active_issues(
        &mut self,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<IssueDetails>> {
        self.read(|records| {
            records
                .find_student(student_id)?
                .ok_or_else(|| Error::not_found("student"))?;
            let mut stmt = records.conn().prepare_cached(&format!(
                "{ISSUE_DETAIL_SQL} WHERE i.student_id = ?1 AND i.status = 'issued' ORDER BY i.issue_date DESC, i.id DESC"
            ))?;
            let items = stmt
                .query_map(params![student_id], |row| issue_details_from_row(row, now))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    /// Circulation counters with overdue computed at `now`.
    pub fn issue_stats(&mut self, now: DateTime<Utc>) -> Result<IssueStats> {
        self.read(|records| {
            let stats = records.conn().query_row(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN status = 'issued' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'returned' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'issued' AND due_date < ?1 THEN 1 ELSE 0 END), 0),
                    COUNT(*)
                FROM issues
                "#,
                params![to_unix_millis(now)],
                |row| {
                    Ok(IssueStats {
                        currently_issued: row.get::<_, i64>(0)? as u64,
                        total_returned: row.get::<_, i64>(1)? as u64,
                        overdue: row.get::<_, i64>(2)? as u64,
                        total_issues: row.get::<_, i64>(3)? as u64,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    /// Distinct book categories, sorted.
    pub fn book_categories(&mut self) -> Result<Vec<String>> {
        self.distinct("SELECT DISTINCT category FROM books ORDER BY category")
    }

    /// Distinct student departments, sorted.
    pub fn student_departments(&mut self) -> Result<Vec<String>> {
        self.distinct("SELECT DISTINCT department FROM students ORDER BY department")
    }

    fn distinct(&mut self, sql: &'static str) -> Result<Vec<String>> {
        self.read(|records| {
            let mut stmt = records.conn().prepare_cached(sql)?;
            let values = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(values)
        })
    }
}
