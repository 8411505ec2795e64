//! Uniform telemetry for backing-store calls.
//!
//! Every dependency (remote cache, document store, relational store, blob
//! store) describes itself through [`Dependency`], and every call describes
//! itself through a typed [`CallContext`]. [`traced`] and [`traced_with`]
//! combine the two into one span per call, named `"<action> <target>"`,
//! with the same field layout regardless of the backing technology.
//!
//! When no subscriber is interested in the span the operation is awaited
//! directly: no fields are formatted and nothing is recorded.
//!
//! # Example
//!
//! ```ignore
//! use dashcache_store::telemetry::{CallContext, QueryArg, traced};
//!
//! let rows = traced(
//!     &postgres,
//!     CallContext::new("fetch", "fetch")
//!         .query("SELECT * FROM banners WHERE date > $1", vec![QueryArg::from("2021-01-04")]),
//!     postgres.fetch(query, args),
//! )
//! .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use metrics::histogram;
use tracing::field::{Empty, display};
use tracing::{Instrument, info_span, warn};

/// Span target shared by all dependency spans.
pub const DEPENDENCY_TARGET: &str = "dashcache::dependency";

/// Something this service calls out to.
pub trait Dependency: Send + Sync {
    /// Kind of dependency, e.g. `Redis`, `postgresql`, `Azure Blob`.
    fn dependency_type(&self) -> &str;

    /// Human-readable target, e.g. the account or database name.
    fn target(&self) -> &str;

    /// Static attributes copied onto every span (e.g. `url`).
    fn attributes(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// A positional query argument, used only to render the query for display.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArg {
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    List(Vec<String>),
}

impl QueryArg {
    fn render(&self) -> String {
        match self {
            QueryArg::Int(value) => value.to_string(),
            QueryArg::Float(value) => value.to_string(),
            QueryArg::Text(value) => format!("'{}'", value),
            QueryArg::Timestamp(value) => format!("'{}'", value.format("%Y-%m-%dT%H:%M:%S%.f")),
            QueryArg::List(items) => format!("'{{{}}}'", items.join(",")),
        }
    }
}

impl From<&str> for QueryArg {
    fn from(value: &str) -> Self {
        QueryArg::Text(value.to_string())
    }
}

impl From<String> for QueryArg {
    fn from(value: String) -> Self {
        QueryArg::Text(value)
    }
}

impl From<i64> for QueryArg {
    fn from(value: i64) -> Self {
        QueryArg::Int(value)
    }
}

impl From<f64> for QueryArg {
    fn from(value: f64) -> Self {
        QueryArg::Float(value)
    }
}

impl From<NaiveDateTime> for QueryArg {
    fn from(value: NaiveDateTime) -> Self {
        QueryArg::Timestamp(value)
    }
}

impl From<Vec<String>> for QueryArg {
    fn from(value: Vec<String>) -> Self {
        QueryArg::List(value)
    }
}

/// Substitutes `$1..$n` placeholders for display.
///
/// Placeholders are replaced from the highest index down so that `$1` never
/// clobbers the prefix of `$10`. The result is never executed.
pub fn format_query(query: &str, args: &[QueryArg]) -> String {
    let mut rendered = query.to_string();
    for (index, arg) in args.iter().enumerate().rev() {
        rendered = rendered.replace(&format!("${}", index + 1), &arg.render());
    }
    rendered
}

/// Typed description of one call to a dependency.
#[derive(Debug, Clone)]
pub struct CallContext {
    method: &'static str,
    action: &'static str,
    key: Option<String>,
    query: Option<(String, Vec<QueryArg>)>,
    expire: Option<Duration>,
    tags: Vec<(&'static str, String)>,
}

impl CallContext {
    /// Creates a context for `method`, reported as `action`.
    pub fn new(method: &'static str, action: &'static str) -> Self {
        Self {
            method,
            action,
            key: None,
            query: None,
            expire: None,
            tags: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>, args: Vec<QueryArg>) -> Self {
        self.query = Some((query.into(), args));
        self
    }

    pub fn expire(mut self, expire: Option<Duration>) -> Self {
        self.expire = expire;
        self
    }

    pub fn tag(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.tags.push((name, value.into()));
        self
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn action(&self) -> &'static str {
        self.action
    }

    /// Query with placeholders substituted, if this call carries one.
    pub fn display_query(&self) -> Option<String> {
        self.query
            .as_ref()
            .map(|(query, args)| format_query(query, args))
    }

    /// Expiry rendered as `"<n> s"`.
    pub fn display_expire(&self) -> Option<String> {
        self.expire.map(|ttl| format!("{} s", ttl.as_secs()))
    }
}

/// HIT/MISS for a single optional read.
pub fn presence<T>(value: &Option<T>) -> Option<&'static str> {
    Some(if value.is_some() { "HIT" } else { "MISS" })
}

/// HIT/MISS/PARTIAL for a multi-key read.
#[allow(clippy::ptr_arg)]
pub fn presence_all<T>(values: &Vec<Option<T>>) -> Option<&'static str> {
    let found = values.iter().filter(|v| v.is_some()).count();
    Some(match found {
        0 => "MISS",
        n if n == values.len() => "HIT",
        _ => "PARTIAL",
    })
}

/// Registers the dependency metrics.
pub fn register_dependency_metrics() {
    metrics::describe_histogram!(
        "dashcache_dependency_call_seconds",
        "Time spent in calls to backing stores"
    );
}

/// Runs `operation` inside a dependency span.
pub async fn traced<D, T, E, F>(dependency: &D, context: CallContext, operation: F) -> Result<T, E>
where
    D: Dependency + ?Sized,
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    traced_with(dependency, context, operation, |_| None).await
}

/// Runs `operation` inside a dependency span, recording the cache outcome
/// reported by `outcome` on success.
pub async fn traced_with<D, T, E, F, O>(
    dependency: &D,
    context: CallContext,
    operation: F,
    outcome: O,
) -> Result<T, E>
where
    D: Dependency + ?Sized,
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
    O: FnOnce(&T) -> Option<&'static str>,
{
    let span = info_span!(
        target: DEPENDENCY_TARGET,
        "dependency",
        otel.name = Empty,
        "dependency.type" = dependency.dependency_type(),
        dependency.target = dependency.target(),
        dependency.method = context.method,
        dependency.action = context.action,
        dependency.key = Empty,
        dependency.query = Empty,
        dependency.expire = Empty,
        dependency.attributes = Empty,
        dependency.tags = Empty,
        dependency.cache = Empty,
        dependency.success = Empty,
        dependency.error = Empty,
    );

    if span.is_disabled() {
        let start = Instant::now();
        let result = operation.await;
        record_call(dependency, context.action, result.is_ok(), start.elapsed());
        return result;
    }

    span.record(
        "otel.name",
        display(format_args!("{} {}", context.action, dependency.target())),
    );
    if let Some(key) = &context.key {
        span.record("dependency.key", key.as_str());
    }
    if let Some(query) = context.display_query() {
        span.record("dependency.query", query.as_str());
    }
    if let Some(expire) = context.display_expire() {
        span.record("dependency.expire", expire.as_str());
    }
    let attributes = dependency.attributes();
    if !attributes.is_empty() {
        span.record("dependency.attributes", render_pairs(&attributes).as_str());
    }
    if !context.tags.is_empty() {
        span.record("dependency.tags", render_pairs(&context.tags).as_str());
    }

    let start = Instant::now();
    let result = operation.instrument(span.clone()).await;
    let elapsed = start.elapsed();

    match &result {
        Ok(value) => {
            span.record("dependency.success", true);
            if let Some(cache) = outcome(value) {
                span.record("dependency.cache", cache);
            }
        },
        Err(error) => {
            span.record("dependency.success", false);
            span.record("dependency.error", display(error));
            span.in_scope(|| {
                warn!(
                    target: DEPENDENCY_TARGET,
                    error = %error,
                    "Dependency call failed"
                )
            });
        },
    }

    record_call(dependency, context.action, result.is_ok(), elapsed);

    result
}

fn record_call<D>(dependency: &D, action: &'static str, success: bool, elapsed: Duration)
where
    D: Dependency + ?Sized,
{
    histogram!(
        "dashcache_dependency_call_seconds",
        "dependency" => dependency.dependency_type().to_string(),
        "action" => action,
        "success" => if success { "true" } else { "false" }
    )
    .record(elapsed.as_secs_f64());
}

fn render_pairs(pairs: &[(&'static str, String)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}
