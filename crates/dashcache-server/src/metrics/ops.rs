//! Metricas de las peticiones al endpoint operativo (`/health`,
//! `/healthcheck`, `/metrics`).

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};

const UNMATCHED_ROUTE: &str = "unmatched";

/// Registra cada peticion por ruta, metodo y clase de estado.
pub async fn track_ops_requests(
    matched_path: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().as_str().to_owned();
    let route = route_label(matched_path.as_ref()).to_owned();

    let response = next.run(request).await;

    counter!(
        "dashcache_ops_requests_total",
        "method" => method,
        "route" => route.clone(),
        "status" => status_class(response.status())
    )
    .increment(1);

    histogram!("dashcache_ops_request_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());

    response
}

/// Rutas desconocidas comparten una sola serie.
fn route_label(matched_path: Option<&MatchedPath>) -> &str {
    matched_path.map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() / 100 {
        2 => "2xx",
        3 => "3xx",
        4 => "4xx",
        5 => "5xx",
        _ => "1xx",
    }
}

pub fn register_ops_metrics() {
    metrics::describe_counter!(
        "dashcache_ops_requests_total",
        "Requests served by the ops endpoints"
    );
    metrics::describe_histogram!(
        "dashcache_ops_request_seconds",
        "Time spent serving ops requests"
    );
}
