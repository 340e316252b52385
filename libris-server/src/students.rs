use crate::{AppState, ServerResult, response};
use actix_web::web;
use libris_store_db::{Error as StoreError, Page, StudentFilter, StudentInput};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    name: Option<String>,
    roll_number: Option<String>,
    phone: Option<String>,
    department: Option<String>,
    semester: Option<i64>,
}

impl ListQuery {
    fn filter(&self) -> Result<StudentFilter, StoreError> {
        let semester = match self.semester {
            None => None,
            Some(n) => match u8::try_from(n) {
                Ok(n @ 1..=8) => Some(n),
                _ => {
                    return Err(StoreError::validation(
                        "semester",
                        "Semester must be between 1 and 8",
                    ));
                }
            },
        };
        Ok(StudentFilter {
            name: self.name.clone(),
            roll_number: self.roll_number.clone(),
            phone: self.phone.clone(),
            department: self.department.clone(),
            semester,
        })
    }
}

pub(crate) async fn list(state: web::Data<AppState>, query: web::Query<ListQuery>) -> ServerResult {
    let page = Page::new(query.page, query.limit)?;
    let filter = query.filter()?;
    let students = state
        .store
        .db_operation(move |db| db.list_students(&filter, page))
        .await?;
    Ok(response::ok(json!({
        "students": students.items,
        "pagination": students.pagination,
    })))
}

pub(crate) async fn get(state: web::Data<AppState>, id: web::Path<i64>) -> ServerResult {
    let id = id.into_inner();
    let student = state.store.db_operation(move |db| db.get_student(id)).await?;
    Ok(response::ok(student))
}

/// Books the student currently has on loan.
pub(crate) async fn issued_books(state: web::Data<AppState>, id: web::Path<i64>) -> ServerResult {
    let id = id.into_inner();
    let now = state.clock.now();
    let issues = state
        .store
        .db_operation(move |db| db.student_active_issues(id, now))
        .await?;
    Ok(response::ok(issues))
}

pub(crate) async fn create(
    state: web::Data<AppState>,
    body: web::Json<StudentInput>,
) -> ServerResult {
    let input = body.into_inner();
    let now = state.clock.now();
    let student = state
        .store
        .db_operation(move |db| db.create_student(&input, now))
        .await?;
    log::info!("created student {} ({})", student.id, student.roll_number);
    Ok(response::created("Student created successfully", student))
}

pub(crate) async fn update(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    body: web::Json<StudentInput>,
) -> ServerResult {
    let id = id.into_inner();
    let input = body.into_inner();
    let now = state.clock.now();
    let student = state
        .store
        .db_operation(move |db| db.update_student(id, &input, now))
        .await?;
    Ok(response::updated("Student updated successfully", student))
}

pub(crate) async fn delete(state: web::Data<AppState>, id: web::Path<i64>) -> ServerResult {
    let id = id.into_inner();
    state
        .store
        .db_operation(move |db| db.delete_student(id))
        .await?;
    log::info!("deleted student {id}");
    Ok(response::message("Student deleted successfully"))
}

pub(crate) async fn departments(state: web::Data<AppState>) -> ServerResult {
    let departments = state
        .store
        .db_operation(|db| db.student_departments())
        .await?;
    Ok(response::ok(departments))
}
