//! Metrics endpoint handler.

use axum::extract::State;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::error::AppError;

/// Handler para el endpoint /metrics
pub async fn metrics_handler(
    State(prometheus): State<Option<PrometheusHandle>>,
) -> Result<String, AppError> {
    prometheus
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::NotFound("metrics recorder is not installed".to_string()))
}

/// Respuesta para rutas desconocidas
pub async fn not_found() -> AppError {
    AppError::NotFound("no route matches this path".to_string())
}
