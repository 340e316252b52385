use crate::error::Result;
use crate::{AppState, ServerResult, response};
use actix_web::web;
use chrono::{DateTime, NaiveDate, Utc};
use libris_store_db::{
    Error as StoreError, Issue, IssueFilter, IssueState, IssueStatusFilter, Page,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<IssueStatusFilter>,
    student_id: Option<i64>,
    book_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueRequest {
    book_id: i64,
    student_id: i64,
    due_date: String,
}

/// An issue with its state at the time of the response.
#[derive(Debug, Serialize)]
struct IssueView {
    #[serde(flatten)]
    issue: Issue,
    state: IssueState,
    is_overdue: bool,
}

impl IssueView {
    fn new(issue: Issue, now: DateTime<Utc>) -> Self {
        let state = issue.state(now);
        Self {
            issue,
            state,
            is_overdue: state == IssueState::Overdue,
        }
    }
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_due_date(raw: &str) -> std::result::Result<DateTime<Utc>, StoreError> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| StoreError::validation("due_date", "Valid due date is required"))
}

pub(crate) async fn list(state: web::Data<AppState>, query: web::Query<ListQuery>) -> ServerResult {
    let query = query.into_inner();
    let page = Page::new(query.page, query.limit)?;
    let filter = IssueFilter {
        status: query.status,
        student_id: query.student_id,
        book_id: query.book_id,
    };
    let now = state.clock.now();
    let issues = state
        .store
        .db_operation(move |db| db.list_issues(&filter, page, now))
        .await?;
    Ok(response::ok(json!({
        "issues": issues.items,
        "pagination": issues.pagination,
    })))
}

async fn issue_book(state: &AppState, request: IssueRequest) -> Result<IssueView> {
    let due_date = parse_due_date(&request.due_date)?;
    let now = state.clock.now();
    let issue = state
        .store
        .db_operation(move |db| db.issue_book(request.book_id, request.student_id, due_date, now))
        .await?;
    Ok(IssueView::new(issue, now))
}

pub(crate) async fn create(
    state: web::Data<AppState>,
    body: web::Json<IssueRequest>,
) -> ServerResult {
    let result = issue_book(&state, body.into_inner()).await;
    state.metrics.record_issue_operation("issue", &result);
    Ok(response::created("Book issued successfully", result?))
}

pub(crate) async fn return_book(state: web::Data<AppState>, id: web::Path<i64>) -> ServerResult {
    let id = id.into_inner();
    let now = state.clock.now();
    let result = state
        .store
        .db_operation(move |db| db.return_book(id, now))
        .await
        .map(|issue| IssueView::new(issue, now));
    state.metrics.record_issue_operation("return", &result);
    Ok(response::updated("Book returned successfully", result?))
}

pub(crate) async fn overdue(state: web::Data<AppState>) -> ServerResult {
    let now = state.clock.now();
    let overdue = state
        .store
        .db_operation(move |db| db.list_overdue(now))
        .await?;
    Ok(response::ok(overdue))
}

pub(crate) async fn stats(state: web::Data<AppState>) -> ServerResult {
    let now = state.clock.now();
    let stats = state
        .store
        .db_operation(move |db| db.issue_stats(now))
        .await?;
    Ok(response::ok(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestApp;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;
    use serde_json::Value;

    fn issue_body(book: i64, student: i64, due_date: &str) -> Value {
        json!({ "book_id": book, "student_id": student, "due_date": due_date })
    }

    #[rstest]
    #[case::date_only("2026-03-08", Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap())]
    #[case::rfc3339("2026-03-08T12:30:00Z", Utc.with_ymd_and_hms(2026, 3, 8, 12, 30, 0).unwrap())]
    #[case::offset("2026-03-08T12:30:00+05:30", Utc.with_ymd_and_hms(2026, 3, 8, 7, 0, 0).unwrap())]
    fn test_parse_due_date(#[case] raw: &str, #[case] expected: DateTime<Utc>) {
        assert_eq!(parse_due_date(raw).unwrap(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::words("next tuesday")]
    #[case::bad_day("2026-02-30")]
    fn test_parse_due_date_rejects(#[case] raw: &str) {
        assert!(matches!(
            parse_due_date(raw),
            Err(StoreError::Validation { .. })
        ));
    }

    /// One copy: A borrows, B is refused, A returns, B borrows.
    #[actix_web::test]
    async fn test_single_copy_over_http() {
        let app = TestApp::new();
        let service = actix_test::init_service(app.app()).await;
        let book = app.create_book("500-1", 1);
        let a = app.create_student("EC-A");
        let b = app.create_student("EC-B");

        let req = actix_test::TestRequest::post()
            .uri("/api/issues")
            .set_json(issue_body(book, a, "2026-03-08"))
            .to_request();
        let res = actix_test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["data"]["status"], "issued");
        assert_eq!(body["data"]["state"], "issued");
        assert_eq!(body["data"]["is_overdue"], false);
        let issue_a = body["data"]["id"].as_i64().unwrap();
        assert_eq!(app.available(book), 0);

        let req = actix_test::TestRequest::post()
            .uri("/api/issues")
            .set_json(issue_body(book, b, "2026-03-08"))
            .to_request();
        let res = actix_test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["kind"], "conflict");
        assert_eq!(body["message"], "no copies available");

        let req = actix_test::TestRequest::put()
            .uri(&format!("/api/issues/{issue_a}/return"))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["data"]["status"], "returned");
        assert_eq!(body["data"]["state"], "returned");
        assert_eq!(body["data"]["is_overdue"], false);
        assert!(body["data"]["return_date"].is_string());
        assert_eq!(app.available(book), 1);

        let req = actix_test::TestRequest::post()
            .uri("/api/issues")
            .set_json(issue_body(book, b, "2026-03-08"))
            .to_request();
        let res = actix_test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(app.available(book), 0);

        let req = actix_test::TestRequest::get().uri("/metrics").to_request();
        let text = actix_test::call_and_read_body(&service, req).await;
        let text = String::from_utf8(text.to_vec()).unwrap();
        assert!(text.contains(
            r#"libris_issue_operations_total{operation="issue",outcome="success"} 2"#
        ));
        assert!(text.contains(
            r#"libris_issue_operations_total{operation="issue",outcome="conflict"} 1"#
        ));
        assert!(text.contains(r#"path="/api/issues""#));
    }

    #[actix_web::test]
    async fn test_issue_failures_map_to_statuses() {
        let app = TestApp::new();
        let service = actix_test::init_service(app.app()).await;
        let book = app.create_book("600-1", 2);
        let student = app.create_student("ME-1");

        let cases = [
            (issue_body(999, student, "2026-03-08"), StatusCode::NOT_FOUND, "book not found"),
            (issue_body(book, 999, "2026-03-08"), StatusCode::NOT_FOUND, "student not found"),
            (issue_body(book, student, "2026-02-01"), StatusCode::BAD_REQUEST, "Validation failed"),
            (issue_body(book, student, "soon"), StatusCode::BAD_REQUEST, "Validation failed"),
        ];
        for (body, status, message) in cases {
            let req = actix_test::TestRequest::post()
                .uri("/api/issues")
                .set_json(body)
                .to_request();
            let res = actix_test::call_service(&service, req).await;
            assert_eq!(res.status(), status);
            let body: Value = actix_test::read_body_json(res).await;
            assert_eq!(body["message"], message);
        }
        assert_eq!(app.available(book), 2);

        app.issue(book, student);
        let req = actix_test::TestRequest::post()
            .uri("/api/issues")
            .set_json(issue_body(book, student, "2026-03-08"))
            .to_request();
        let res = actix_test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["message"], "already issued to this student");
    }

    #[actix_web::test]
    async fn test_return_twice_is_not_found() {
        let app = TestApp::new();
        let service = actix_test::init_service(app.app()).await;
        let book = app.create_book("700-1", 1);
        let student = app.create_student("CE-1");
        let issue = app.issue(book, student);

        for expected in [StatusCode::OK, StatusCode::NOT_FOUND] {
            let req = actix_test::TestRequest::put()
                .uri(&format!("/api/issues/{issue}/return"))
                .to_request();
            assert_eq!(actix_test::call_service(&service, req).await.status(), expected);
        }
        assert_eq!(app.available(book), 1);
    }

    #[actix_web::test]
    async fn test_overdue_is_computed_on_read() {
        let app = TestApp::new();
        let service = actix_test::init_service(app.app()).await;
        let book = app.create_book("800-1", 3);
        let student = app.create_student("IT-1");
        app.issue(book, student);

        let req = actix_test::TestRequest::get().uri("/api/issues/overdue").to_request();
        let body: Value = actix_test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);

        app.clock.advance(Duration::days(8));

        let req = actix_test::TestRequest::get().uri("/api/issues/overdue").to_request();
        let body: Value = actix_test::call_and_read_body_json(&service, req).await;
        let overdue = body["data"].as_array().unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0]["roll_number"], "IT-1");
        assert_eq!(overdue[0]["overdue_seconds"], Duration::days(1).num_seconds());

        let req = actix_test::TestRequest::get()
            .uri("/api/issues?status=overdue")
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["data"]["issues"][0]["status"], "issued");
        assert_eq!(body["data"]["issues"][0]["state"], "overdue");
        assert_eq!(body["data"]["issues"][0]["is_overdue"], true);

        let req = actix_test::TestRequest::get().uri("/api/issues/stats").to_request();
        let body: Value = actix_test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["data"]["currently_issued"], 1);
        assert_eq!(body["data"]["overdue"], 1);
        assert_eq!(body["data"]["total_issues"], 1);

        let req = actix_test::TestRequest::get()
            .uri("/api/issues?status=lost")
            .to_request();
        let res = actix_test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
