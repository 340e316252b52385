use crate::error::{self, LibrisError};
use actix_web::{
    Error, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::{
    future::{Future, Ready, ready},
    pin::Pin,
    sync::Arc,
    time::Instant,
};

type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T> + 'static>>;

pub struct PrometheusMetrics {
    pub registry: Registry,
    http_requests_total: IntCounterVec,
    http_requests_duration: HistogramVec,
    issue_operations_total: IntCounterVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("libris_http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;

        let http_requests_duration = HistogramVec::new(
            HistogramOpts::new(
                "libris_http_request_duration_seconds",
                "HTTP request latencies in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
            ]),
            &["method", "path", "status"],
        )?;

        let issue_operations_total = IntCounterVec::new(
            Opts::new(
                "libris_issue_operations_total",
                "Issue and return operations by outcome",
            ),
            &["operation", "outcome"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_requests_duration.clone()))?;
        registry.register(Box::new(issue_operations_total.clone()))?;

        Ok(PrometheusMetrics {
            registry,
            http_requests_total,
            http_requests_duration,
            issue_operations_total,
        })
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Count one issue or return attempt. `outcome` is `success` or the
    /// error kind reported to the client.
    pub fn record_issue_operation<T>(&self, operation: &str, result: &error::Result<T>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(e) => crate::response::ErrorKind::of(e).as_str(),
        };
        self.issue_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }
}

pub struct PrometheusMiddleware {
    metrics: Arc<PrometheusMetrics>,
}

impl PrometheusMiddleware {
    pub fn new(metrics: Arc<PrometheusMetrics>) -> Self {
        PrometheusMiddleware { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for PrometheusMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = PrometheusMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(PrometheusMiddlewareService {
            service,
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct PrometheusMiddlewareService<S> {
    service: S,
    metrics: Arc<PrometheusMetrics>,
}

impl<S, B> Service<ServiceRequest> for PrometheusMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        // Unmatched paths would give every probe its own label set
        let path = req.match_pattern();
        let metrics = self.metrics.clone();

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;

            if let Some(path) = path {
                let duration = start.elapsed().as_secs_f64();
                let status = res.status().as_str().to_owned();

                metrics
                    .http_requests_total
                    .with_label_values(&[&method, &path, &status])
                    .inc();

                metrics
                    .http_requests_duration
                    .with_label_values(&[&method, &path, &status])
                    .observe(duration);
            }

            Ok(res)
        })
    }
}

pub async fn metrics_handler(
    metrics: web::Data<Arc<PrometheusMetrics>>,
) -> actix_web::Result<HttpResponse> {
    let body = metrics
        .render()
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

pub fn initialize_metrics() -> Result<Arc<PrometheusMetrics>, LibrisError> {
    let metrics = PrometheusMetrics::new().map_err(|e| error::ServerError::Startup {
        reason: format!("Failed to create prometheus metrics: {e}"),
    })?;
    Ok(Arc::new(metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_store_db::Error as StoreError;

    #[test]
    fn test_issue_operation_outcomes() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_issue_operation("issue", &Ok(()));
        metrics.record_issue_operation::<()>(
            "issue",
            &Err(StoreError::conflict("no copies available").into()),
        );
        metrics.record_issue_operation::<()>(
            "return",
            &Err(StoreError::not_found("active issue").into()),
        );

        let text = metrics.render().unwrap();
        assert!(text.contains(
            r#"libris_issue_operations_total{operation="issue",outcome="success"} 1"#
        ));
        assert!(text.contains(
            r#"libris_issue_operations_total{operation="issue",outcome="conflict"} 1"#
        ));
        assert!(text.contains(
            r#"libris_issue_operations_total{operation="return",outcome="not_found"} 1"#
        ));
    }
}
