//! In-process application fixture for handler tests.

use crate::clock::{Clock, ManualClock};
use crate::prometheus::PrometheusMetrics;
use crate::store::Store;
use crate::AppState;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use chrono::{Duration, TimeZone, Utc};
use libris_store_db::{BookInput, OpenMode, StoreDb, StudentInput};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

pub(crate) fn book_json(isbn: &str, copies: i64) -> Value {
    json!({
        "title": "The C Programming Language",
        "author": "Kernighan and Ritchie",
        "isbn": isbn,
        "total_copies": copies,
        "category": "Programming",
    })
}

pub(crate) fn student_json(roll_number: &str) -> Value {
    json!({
        "name": "Meera Iyer",
        "roll_number": roll_number,
        "department": "Electronics",
        "semester": 5,
        "phone": "9123456780",
        "email": format!("{}@college.edu", roll_number.to_lowercase()),
    })
}

pub(crate) struct TestApp {
    _dir: TempDir,
    path: PathBuf,
    pub(crate) clock: Arc<ManualClock>,
    state: web::Data<AppState>,
    metrics: Arc<PrometheusMetrics>,
}

impl TestApp {
    /// A fresh database with the clock pinned at 2026-03-01 09:00 UTC.
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libris.sqlite");
        let store = Store::open(&path, std::time::Duration::from_secs(1), 2).unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let metrics = Arc::new(PrometheusMetrics::new().unwrap());
        let state = web::Data::new(AppState {
            store,
            clock: clock.clone(),
            metrics: metrics.clone(),
            started_at: Instant::now(),
        });
        Self {
            _dir: dir,
            path,
            clock,
            state,
            metrics,
        }
    }

    pub(crate) fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        crate::app(self.state.clone(), self.metrics.clone(), false)
    }

    fn db(&self) -> StoreDb {
        StoreDb::open(&self.path, OpenMode::ReadWrite).unwrap()
    }

    pub(crate) fn create_book(&self, isbn: &str, copies: i64) -> i64 {
        let input: BookInput = serde_json::from_value(book_json(isbn, copies)).unwrap();
        self.db().create_book(&input, self.clock.now()).unwrap().id
    }

    pub(crate) fn create_student(&self, roll_number: &str) -> i64 {
        let input: StudentInput = serde_json::from_value(student_json(roll_number)).unwrap();
        self.db().create_student(&input, self.clock.now()).unwrap().id
    }

    /// Issue for seven days from the current clock time.
    pub(crate) fn issue(&self, book_id: i64, student_id: i64) -> i64 {
        let now = self.clock.now();
        self.db()
            .issue_book(book_id, student_id, now + Duration::days(7), now)
            .unwrap()
            .id
    }

    pub(crate) fn available(&self, book_id: i64) -> u32 {
        self.db().get_book(book_id).unwrap().available_copies
    }
}
