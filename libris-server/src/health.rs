use crate::{AppState, ServerResult};
use actix_web::{HttpResponse, web};
use serde::Serialize;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    uptime_seconds: u64,
    database: &'static str,
    schema_version: i32,
}

/// Liveness plus a round trip to the database.
pub(crate) async fn get(state: web::Data<AppState>) -> ServerResult {
    let schema_version = state
        .store
        .db_operation(|db| db.schema_version())
        .await?;
    Ok(HttpResponse::Ok().json(Health {
        status: "OK",
        timestamp: state.clock.now(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database: "SQLite",
        schema_version,
    }))
}

#[cfg(test)]
mod tests {
    use crate::testing::TestApp;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::Value;

    #[actix_web::test]
    async fn test_health() {
        let app = TestApp::new();
        let service = actix_test::init_service(app.app()).await;

        let req = actix_test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = actix_test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["database"], "SQLite");
        assert_eq!(body["schema_version"], libris_store_db::SCHEMA_VERSION);
        assert_eq!(body["timestamp"], "2026-03-01T09:00:00Z");
    }

    #[actix_web::test]
    async fn test_unknown_route_is_json_404() {
        let app = TestApp::new();
        let service = actix_test::init_service(app.app()).await;

        let req = actix_test::TestRequest::get().uri("/api/loans").to_request();
        let res = actix_test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "not_found");
        assert_eq!(body["message"], "Route not found");
    }
}
