// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Field validation for records entering the store.
//!
//! Every check for one input runs, so a caller sees all problems at once.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{Error, FieldError, Result};
use crate::types::{BookInput, StudentInput, to_unix_millis};

static ISBN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9-]+$").expect("valid regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("valid regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// A book input that passed validation, with text fields trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: u32,
    pub category: String,
}

/// A student input that passed validation, with the email normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidStudent {
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub semester: u8,
    pub phone: String,
    pub email: String,
}

#[derive(Default)]
struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Trim `value` and check its length in characters.
    fn text(
        &mut self,
        field: &'static str,
        label: &str,
        value: &str,
        min: usize,
        max: usize,
    ) -> String {
        let value = value.trim();
        let len = value.chars().count();
        if len == 0 {
            self.push(field, format!("{label} is required"));
        } else if len < min || len > max {
            self.push(
                field,
                format!("{label} must be between {min} and {max} characters"),
            );
        }
        value.to_owned()
    }

    fn finish<T>(self, value: T) -> Result<T> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation {
                errors: self.errors,
            })
        }
    }
}

pub(crate) fn book(input: &BookInput) -> Result<ValidBook> {
    let mut c = Collector::default();
    let title = c.text("title", "Title", &input.title, 1, 255);
    let author = c.text("author", "Author", &input.author, 1, 255);
    let isbn = input.isbn.trim().to_owned();
    if isbn.is_empty() {
        c.push("isbn", "ISBN is required");
    } else if !ISBN_RE.is_match(&isbn) {
        c.push("isbn", "ISBN must contain only numbers and hyphens");
    }
    let total_copies = match u32::try_from(input.total_copies) {
        Ok(n) if n >= 1 => n,
        _ => {
            c.push("total_copies", "Total copies must be a positive integer");
            0
        }
    };
    let category = c.text("category", "Category", &input.category, 1, 100);

    c.finish(ValidBook {
        title,
        author,
        isbn,
        total_copies,
        category,
    })
}

pub(crate) fn student(input: &StudentInput) -> Result<ValidStudent> {
    let mut c = Collector::default();
    let name = c.text("name", "Name", &input.name, 2, 255);
    let roll_number = c.text("roll_number", "Roll number", &input.roll_number, 1, 50);
    let department = c.text("department", "Department", &input.department, 1, 100);
    let semester = match u8::try_from(input.semester) {
        Ok(n @ 1..=8) => n,
        _ => {
            c.push("semester", "Semester must be between 1 and 8");
            0
        }
    };
    let phone = input.phone.trim().to_owned();
    if !PHONE_RE.is_match(&phone) {
        c.push("phone", "Phone must be a 10-digit number");
    }
    let email = input.email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        c.push("email", "Valid email is required");
    }

    c.finish(ValidStudent {
        name,
        roll_number,
        department,
        semester,
        phone,
        email,
    })
}

/// The due date of a new issue must lie strictly after `now`.
///
/// Compared at the millisecond precision timestamps are stored with.
pub(crate) fn due_date(due: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if to_unix_millis(due) <= to_unix_millis(now) {
        return Err(Error::validation("due_date", "Due date must be in the future"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rstest::rstest;

    use super::*;

    fn good_book() -> BookInput {
        BookInput {
            title: "  Database System Concepts ".into(),
            author: "Silberschatz".into(),
            isbn: "978-0073523323".into(),
            total_copies: 3,
            category: "Computer Science".into(),
        }
    }

    fn good_student() -> StudentInput {
        StudentInput {
            name: "Asha Rao".into(),
            roll_number: "CS-2024-017".into(),
            department: "Computer Science".into(),
            semester: 5,
            phone: "9876543210".into(),
            email: " Asha.Rao@College.EDU ".into(),
        }
    }

    fn fields(err: Error) -> Vec<&'static str> {
        match err {
            Error::Validation { errors } => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_book_is_trimmed() {
        let book = book(&good_book()).unwrap();
        assert_eq!(book.title, "Database System Concepts");
        assert_eq!(book.total_copies, 3);
    }

    #[rstest]
    #[case::isbn_letters(BookInput { isbn: "97800735X".into(), ..good_book() }, "isbn")]
    #[case::isbn_blank(BookInput { isbn: "   ".into(), ..good_book() }, "isbn")]
    #[case::zero_copies(BookInput { total_copies: 0, ..good_book() }, "total_copies")]
    #[case::negative_copies(BookInput { total_copies: -2, ..good_book() }, "total_copies")]
    #[case::long_category(BookInput { category: "x".repeat(101), ..good_book() }, "category")]
    #[case::blank_title(BookInput { title: " ".into(), ..good_book() }, "title")]
    fn test_book_rejects(#[case] input: BookInput, #[case] field: &str) {
        assert_eq!(fields(book(&input).unwrap_err()), vec![field]);
    }

    #[test]
    fn test_book_collects_every_error() {
        let input = BookInput::default();
        assert_eq!(
            fields(book(&input).unwrap_err()),
            vec!["title", "author", "isbn", "total_copies", "category"]
        );
    }

    #[test]
    fn test_student_email_is_normalised() {
        let student = student(&good_student()).unwrap();
        assert_eq!(student.email, "asha.rao@college.edu");
        assert_eq!(student.semester, 5);
    }

    #[rstest]
    #[case::short_name(StudentInput { name: "A".into(), ..good_student() }, "name")]
    #[case::semester_zero(StudentInput { semester: 0, ..good_student() }, "semester")]
    #[case::semester_nine(StudentInput { semester: 9, ..good_student() }, "semester")]
    #[case::phone_short(StudentInput { phone: "12345".into(), ..good_student() }, "phone")]
    #[case::phone_letters(StudentInput { phone: "98765x3210".into(), ..good_student() }, "phone")]
    #[case::email_no_domain(StudentInput { email: "asha@".into(), ..good_student() }, "email")]
    #[case::email_spaces(StudentInput { email: "as ha@college.edu".into(), ..good_student() }, "email")]
    fn test_student_rejects(#[case] input: StudentInput, #[case] field: &str) {
        assert_eq!(fields(student(&input).unwrap_err()), vec![field]);
    }

    #[test]
    fn test_due_date_must_be_in_future() {
        let now = Utc::now();
        assert!(due_date(now + Duration::seconds(1), now).is_ok());
        assert_eq!(fields(due_date(now, now).unwrap_err()), vec!["due_date"]);
        assert_eq!(
            fields(due_date(now - Duration::days(1), now).unwrap_err()),
            vec!["due_date"]
        );
    }

    #[test]
    fn test_due_date_within_same_millisecond_is_rejected() {
        let now = DateTime::from_timestamp(1_800_000_000, 100_000).unwrap();
        let due = now + Duration::microseconds(500);
        assert!(due > now);
        assert_eq!(fields(due_date(due, now).unwrap_err()), vec!["due_date"]);
        assert!(due_date(now + Duration::milliseconds(1), now).is_ok());
    }
}
