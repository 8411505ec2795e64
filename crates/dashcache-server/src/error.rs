use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::handlers::health::DependencyHealth;

#[derive(Debug)]
pub enum AppError {
    /// Ruta o recurso inexistente
    NotFound(String),

    /// Una o mas dependencias no responden
    DependenciesDown(Vec<DependencyHealth>),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, "Not Found", what),
            AppError::DependenciesDown(report) => {
                // El cuerpo es el mismo reporte que en el caso sano.
                return (StatusCode::SERVICE_UNAVAILABLE, Json(report)).into_response();
            },
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
