#![warn(clippy::dbg_macro)]

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use clock::{Clock, SystemClock};
use crate::prometheus::PrometheusMetrics;
use error::{IoErrorContext, LibrisError, Result};
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::Store;

mod books;
mod clock;
mod config;
mod error;
mod health;
mod issues;
mod prometheus;
mod response;
mod store;
mod students;
#[cfg(test)]
mod testing;

/// Shared by every worker.
pub(crate) struct AppState {
    pub(crate) store: Arc<Store>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Arc<PrometheusMetrics>,
    pub(crate) started_at: Instant,
}

#[derive(Debug)]
struct ServerError {
    err: LibrisError,
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl actix_web::error::ResponseError for ServerError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        response::ErrorKind::of(&self.err).status()
    }

    fn error_response(&self) -> HttpResponse {
        response::error(&self.err)
    }
}

impl From<LibrisError> for ServerError {
    fn from(err: LibrisError) -> ServerError {
        ServerError { err }
    }
}

impl From<libris_store_db::Error> for ServerError {
    fn from(err: libris_store_db::Error) -> ServerError {
        ServerError { err: err.into() }
    }
}

type ServerResult = std::result::Result<HttpResponse, ServerError>;

fn bad_request(err: impl Display) -> actix_web::Error {
    ServerError::from(LibrisError::BadRequest {
        reason: err.to_string(),
    })
    .into()
}

async fn not_found() -> ServerResult {
    Err(LibrisError::RouteNotFound.into())
}

fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::get))
        .service(
            web::scope("/books")
                .route("", web::get().to(books::list))
                .route("", web::post().to(books::create))
                .route("/meta/categories", web::get().to(books::categories))
                .route("/{id}", web::get().to(books::get))
                .route("/{id}", web::put().to(books::update))
                .route("/{id}", web::delete().to(books::delete)),
        )
        .service(
            web::scope("/students")
                .route("", web::get().to(students::list))
                .route("", web::post().to(students::create))
                .route("/meta/departments", web::get().to(students::departments))
                .route("/{id}", web::get().to(students::get))
                .route("/{id}", web::put().to(students::update))
                .route("/{id}", web::delete().to(students::delete))
                .route("/{id}/issued-books", web::get().to(students::issued_books)),
        )
        .service(
            web::scope("/issues")
                .route("", web::get().to(issues::list))
                .route("", web::post().to(issues::create))
                .route("/overdue", web::get().to(issues::overdue))
                .route("/stats", web::get().to(issues::stats))
                .route("/{id}/return", web::put().to(issues::return_book)),
        );
}

pub(crate) fn app(
    state: web::Data<AppState>,
    metrics: Arc<PrometheusMetrics>,
    enable_compression: bool,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(middleware::Condition::new(
            enable_compression,
            middleware::Compress::default(),
        ))
        .wrap(prometheus::PrometheusMiddleware::new(metrics.clone()))
        .wrap(middleware::Logger::default())
        .app_data(state)
        .app_data(web::Data::new(metrics))
        // Malformed bodies, query strings and ids get the JSON error envelope
        .app_data(
            web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| bad_request(err)),
        )
        .app_data(
            web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| bad_request(err)),
        )
        .app_data(
            web::PathConfig::default().error_handler(|err, _req: &HttpRequest| bad_request(err)),
        )
        .service(web::scope("/api").configure(api_routes))
        .route("/metrics", web::get().to(prometheus::metrics_handler))
        .default_service(web::to(not_found))
}

async fn inner_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::load()?;
    let metrics = prometheus::initialize_metrics()?;
    let store = Store::open(
        &config.database_path,
        config.busy_timeout(),
        config.max_idle_connections,
    )?;

    let state = web::Data::new(AppState {
        store,
        clock: Arc::new(SystemClock),
        metrics: metrics.clone(),
        started_at: Instant::now(),
    });
    let enable_compression = config.enable_compression;

    log::info!(
        "listening on {} with database {}",
        config.bind,
        state.store.path().display()
    );
    HttpServer::new(move || app(state.clone(), metrics.clone(), enable_compression))
        .client_request_timeout(Duration::from_secs(30))
        .workers(config.workers)
        .max_connection_rate(config.max_connection_rate)
        .bind(config.bind.clone())
        .io_context("Failed to bind server")?
        .run()
        .await
        .io_context("Failed to start server")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    inner_main().await.map_err(std::io::Error::other)
}
