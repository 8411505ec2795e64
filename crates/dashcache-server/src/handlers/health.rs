use std::time::Instant;

use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use dashcache_store::StoreClient;
use futures::future::join_all;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "UP".to_string(),
        }
    }
}

/// Resultado del ping a una dependencia.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyHealth {
    pub dependency: String,
    pub target: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl DependencyHealth {
    pub fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

/// Liveness: the process is serving requests.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

async fn ping(dependency: &dyn StoreClient) -> DependencyHealth {
    let start = Instant::now();
    let result = dependency.ping().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, reply, error) = match result {
        Ok(reply) => ("UP", Some(reply), None),
        Err(e) => ("DOWN", None, Some(e.to_string())),
    };

    DependencyHealth {
        dependency: dependency.dependency_type().to_string(),
        target: dependency.target().to_string(),
        status: status.to_string(),
        reply,
        error,
        latency_ms,
    }
}

/// Readiness: pings every registered dependency concurrently.
///
/// `HEAD` answers `204` without a body; any failing dependency turns the
/// answer into `503`.
pub async fn dependency_check(
    State(state): State<AppState>,
    method: Method,
) -> Result<Response, AppError> {
    let report = join_all(
        state
            .dependencies()
            .iter()
            .map(|dependency| ping(dependency.as_ref())),
    )
    .await;

    if report.iter().any(|entry| !entry.is_up()) {
        tracing::warn!(
            down = report.iter().filter(|e| !e.is_up()).count(),
            "Health check found unavailable dependencies"
        );
        return Err(AppError::DependenciesDown(report));
    }

    if method == Method::HEAD {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(report).into_response())
}
