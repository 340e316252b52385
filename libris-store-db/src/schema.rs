// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Database schema definitions for the library record store.
//!
//! Timestamps are integer Unix milliseconds.
//!
//! `issues.book_id` and `issues.student_id` carry no foreign key clause.
//! Issue history outlives the books and students it mentions, so the
//! reference is checked inside the unit of work that creates an issue, and a
//! delete is refused while an active issue points at the record.

/// Books, students and issues.
pub const SCHEMA_SQL: &str = r#"
create table if not exists books (
    id               integer primary key autoincrement not null,
    title            text not null,
    author           text not null,
    isbn             text unique not null,
    total_copies     integer not null check (total_copies >= 1),
    available_copies integer not null check (available_copies >= 0 and available_copies <= total_copies),
    category         text not null,
    created_at       integer not null,
    updated_at       integer not null
);

create index if not exists IndexBooksCategory on books(category);

create table if not exists students (
    id          integer primary key autoincrement not null,
    name        text not null,
    roll_number text unique not null,
    department  text not null,
    semester    integer not null check (semester between 1 and 8),
    phone       text not null,
    email       text unique not null,
    created_at  integer not null,
    updated_at  integer not null
);

create index if not exists IndexStudentsDepartment on students(department);

create table if not exists issues (
    id          integer primary key autoincrement not null,
    book_id     integer not null,
    student_id  integer not null,
    issue_date  integer not null,
    due_date    integer not null,
    return_date integer,
    status      text not null default 'issued' check (status in ('issued', 'returned'))
);

create index if not exists IndexIssuesBook on issues(book_id, status);
create index if not exists IndexIssuesStudent on issues(student_id, status);
create index if not exists IndexIssuesDue on issues(status, due_date);

create unique index if not exists IndexIssuesActivePair on issues(book_id, student_id)
    where status = 'issued';
"#;

/// Schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;
