//! Cache-aside metrics recording.

use metrics::counter;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Registra las metricas del orquestador.
/// Llamar una vez al inicio para registrar las metricas.
pub fn register_cache_metrics() {
    metrics::describe_counter!("dashcache_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!(
        "dashcache_cache_misses_total",
        "Total number of cache misses"
    );
    metrics::describe_counter!(
        "dashcache_cache_probe_errors_total",
        "Cache probes that failed and degraded to a backend fetch"
    );
    metrics::describe_counter!(
        "dashcache_cache_decode_errors_total",
        "Cached payloads that could not be decoded"
    );
    metrics::describe_counter!(
        "dashcache_cache_writeback_errors_total",
        "Write-backs that failed after a successful fetch"
    );
    metrics::describe_counter!(
        "dashcache_cache_race_winner_total",
        "Race fills by winning side"
    );
}

/// Which side of a race fill published first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceWinner {
    Cache,
    Backend,
}

impl RaceWinner {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceWinner::Cache => "cache",
            RaceWinner::Backend => "backend",
        }
    }
}

/// Recorder de metricas de un namespace de cache.
/// Usa atomic counters internos para consultas rapidas en tests y logs.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    namespace: Arc<str>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    probe_errors: Arc<AtomicU64>,
    writeback_errors: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: Arc::from(namespace),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            probe_errors: Arc::new(AtomicU64::new(0)),
            writeback_errors: Arc::new(AtomicU64::new(0)),
        }
    }

    fn label(&self) -> String {
        self.namespace.to_string()
    }

    /// Registra `n` cache hits
    pub fn record_hits(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.hits.fetch_add(n, Ordering::Relaxed);
        counter!("dashcache_cache_hits_total", "namespace" => self.label()).increment(n);
    }

    /// Registra `n` cache misses
    pub fn record_misses(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.misses.fetch_add(n, Ordering::Relaxed);
        counter!("dashcache_cache_misses_total", "namespace" => self.label()).increment(n);
    }

    /// Registra un probe fallido
    pub fn record_probe_error(&self) {
        self.probe_errors.fetch_add(1, Ordering::Relaxed);
        counter!("dashcache_cache_probe_errors_total", "namespace" => self.label()).increment(1);
    }

    /// Registra un payload que no se pudo decodificar
    pub fn record_decode_error(&self) {
        counter!("dashcache_cache_decode_errors_total", "namespace" => self.label()).increment(1);
    }

    /// Registra un write-back fallido
    pub fn record_writeback_error(&self) {
        self.writeback_errors.fetch_add(1, Ordering::Relaxed);
        counter!("dashcache_cache_writeback_errors_total", "namespace" => self.label())
            .increment(1);
    }

    /// Registra el ganador de un race fill
    pub fn record_race_winner(&self, winner: RaceWinner) {
        counter!(
            "dashcache_cache_race_winner_total",
            "namespace" => self.label(),
            "winner" => winner.as_str()
        )
        .increment(1);
    }

    /// Calcula hit rate (para logging/debugging)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let misses = self.misses() as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn probe_errors(&self) -> u64 {
        self.probe_errors.load(Ordering::Relaxed)
    }

    pub fn writeback_errors(&self) -> u64 {
        self.writeback_errors.load(Ordering::Relaxed)
    }
}
