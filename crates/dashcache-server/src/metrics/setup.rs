//! Metrics setup and initialization.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Inicializa el sistema de metricas y retorna el handle para el endpoint.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = build_recorder()?;
    register_all();
    info!("Metrics system initialized");
    Ok(handle)
}

fn build_recorder() -> Result<PrometheusHandle, BuildError> {
    // Buckets para histogramas (en segundos). Las llamadas a la cache remota
    // suelen estar por debajo de 5ms; los fetch al backend llegan a segundos.
    PrometheusBuilder::new()
        .set_buckets(&[
            0.0005, // 500 microsegundos
            0.001,  // 1 milisegundo
            0.0025, // 2.5 milisegundos
            0.005,  // 5 milisegundos
            0.01,   // 10 milisegundos
            0.025,  // 25 milisegundos
            0.05,   // 50 milisegundos
            0.1,    // 100 milisegundos
            0.25,   // 250 milisegundos
            0.5,    // 500 milisegundos
            1.0,    // 1 segundo
            2.5,    // 2.5 segundos
            5.0,    // 5 segundos
        ])?
        .install_recorder()
}

/// Describe todas las metricas del servicio.
pub fn register_all() {
    super::cache::register_cache_metrics();
    super::ops::register_ops_metrics();
    dashcache_store::telemetry::register_dependency_metrics();
}
