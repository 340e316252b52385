use crate::{AppState, ServerResult, response};
use actix_web::web;
use libris_store_db::{BookFilter, BookInput, Page};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    title: Option<String>,
    author: Option<String>,
    category: Option<String>,
}

pub(crate) async fn list(state: web::Data<AppState>, query: web::Query<ListQuery>) -> ServerResult {
    let query = query.into_inner();
    let page = Page::new(query.page, query.limit)?;
    let filter = BookFilter {
        title: query.title,
        author: query.author,
        category: query.category,
    };
    let books = state
        .store
        .db_operation(move |db| db.list_books(&filter, page))
        .await?;
    Ok(response::ok(json!({
        "books": books.items,
        "pagination": books.pagination,
    })))
}

pub(crate) async fn get(state: web::Data<AppState>, id: web::Path<i64>) -> ServerResult {
    let id = id.into_inner();
    let book = state.store.db_operation(move |db| db.get_book(id)).await?;
    Ok(response::ok(book))
}

pub(crate) async fn create(state: web::Data<AppState>, body: web::Json<BookInput>) -> ServerResult {
    let input = body.into_inner();
    let now = state.clock.now();
    let book = state
        .store
        .db_operation(move |db| db.create_book(&input, now))
        .await?;
    log::info!("created book {} ({})", book.id, book.isbn);
    Ok(response::created("Book created successfully", book))
}

pub(crate) async fn update(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    body: web::Json<BookInput>,
) -> ServerResult {
    let id = id.into_inner();
    let input = body.into_inner();
    let now = state.clock.now();
    let book = state
        .store
        .db_operation(move |db| db.update_book(id, &input, now))
        .await?;
    Ok(response::updated("Book updated successfully", book))
}

pub(crate) async fn delete(state: web::Data<AppState>, id: web::Path<i64>) -> ServerResult {
    let id = id.into_inner();
    state.store.db_operation(move |db| db.delete_book(id)).await?;
    log::info!("deleted book {id}");
    Ok(response::message("Book deleted successfully"))
}

pub(crate) async fn categories(state: web::Data<AppState>) -> ServerResult {
    let categories = state
        .store
        .db_operation(|db| db.book_categories())
        .await?;
    Ok(response::ok(categories))
}
