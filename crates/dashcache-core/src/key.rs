//! Cache key derivation.
//!
//! Two strategies are provided:
//!
//! - [`GenericKey`] hashes the stringified call arguments into a fixed-size
//!   digest appended to a namespace prefix.
//! - [`AreaKey`] builds a readable `prefix + date + "-" + area` key for
//!   datasets partitioned by release date and area.
//!
//! Both implement [`KeyStrategy`], which is what the orchestrator consumes.

use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::KeyError;

/// Default digest width in bytes (48 bits).
pub const DEFAULT_DIGEST_BYTES: usize = 6;

/// Area sentinel used for aggregate (country-wide) requests.
pub const OVERVIEW_AREA: &str = "UK";

/// A fully derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wraps an already-derived key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The key shape of one orchestrated call, resolved once up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySet {
    /// A scalar call backed by one entry.
    Single(CacheKey),
    /// A fan-out call backed by one entry per element, in argument order.
    Many(Vec<CacheKey>),
}

impl KeySet {
    /// Returns the keys as a slice, whatever the shape.
    pub fn keys(&self) -> &[CacheKey] {
        match self {
            KeySet::Single(key) => std::slice::from_ref(key),
            KeySet::Many(keys) => keys,
        }
    }

    /// Number of entries addressed by this key set.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

/// Derives a cache key from call arguments of type `A`.
pub trait KeyStrategy<A: ?Sized>: Send + Sync {
    /// Derives the key for one logical call.
    fn derive(&self, args: &A) -> Result<CacheKey, KeyError>;

    /// Derives one key per element, failing on the first malformed element.
    fn derive_many(&self, items: &[A]) -> Result<KeySet, KeyError>
    where
        A: Sized,
    {
        if items.is_empty() {
            return Err(KeyError::EmptyFanOut);
        }

        items
            .iter()
            .map(|item| self.derive(item))
            .collect::<Result<Vec<_>, _>>()
            .map(KeySet::Many)
    }
}

/// One argument value as seen by the generic key strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyArg {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    List(Vec<KeyArg>),
}

impl fmt::Display for KeyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyArg::Null => f.write_str("None"),
            KeyArg::Bool(value) => write!(f, "{}", value),
            KeyArg::Int(value) => write!(f, "{}", value),
            KeyArg::Float(value) => write!(f, "{:?}", value),
            KeyArg::Str(value) => f.write_str(value),
            KeyArg::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            KeyArg::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            },
        }
    }
}

impl From<&str> for KeyArg {
    fn from(value: &str) -> Self {
        KeyArg::Str(value.to_string())
    }
}

impl From<String> for KeyArg {
    fn from(value: String) -> Self {
        KeyArg::Str(value)
    }
}

impl From<i64> for KeyArg {
    fn from(value: i64) -> Self {
        KeyArg::Int(value)
    }
}

impl From<i32> for KeyArg {
    fn from(value: i32) -> Self {
        KeyArg::Int(value.into())
    }
}

impl From<u32> for KeyArg {
    fn from(value: u32) -> Self {
        KeyArg::Int(value.into())
    }
}

impl From<f64> for KeyArg {
    fn from(value: f64) -> Self {
        KeyArg::Float(value)
    }
}

impl From<bool> for KeyArg {
    fn from(value: bool) -> Self {
        KeyArg::Bool(value)
    }
}

impl From<NaiveDate> for KeyArg {
    fn from(value: NaiveDate) -> Self {
        KeyArg::Date(value)
    }
}

impl<T: Into<KeyArg>> From<Vec<T>> for KeyArg {
    fn from(values: Vec<T>) -> Self {
        KeyArg::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<KeyArg>> From<Option<T>> for KeyArg {
    fn from(value: Option<T>) -> Self {
        value.map_or(KeyArg::Null, Into::into)
    }
}

/// Positional and named arguments of one call, in call order.
///
/// # Examples
///
/// ```
/// use dashcache_core::CallArgs;
///
/// let args = CallArgs::new()
///     .arg("2021-01-04")
///     .named("area_name", "London");
/// assert_eq!(args.joined(), "2021-01-04|London");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<KeyArg>,
    named: IndexMap<String, KeyArg>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<KeyArg>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named argument. Re-setting a name keeps its original position.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<KeyArg>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn positional(&self) -> &[KeyArg] {
        &self.positional
    }

    pub fn named_args(&self) -> &IndexMap<String, KeyArg> {
        &self.named
    }

    /// Joins positional values then named values with `|`.
    ///
    /// Only named values take part, not their names.
    pub fn joined(&self) -> String {
        self.positional
            .iter()
            .chain(self.named.values())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Conversion of a domain argument struct into generic call arguments.
pub trait ToCallArgs {
    fn to_call_args(&self) -> CallArgs;
}

impl ToCallArgs for CallArgs {
    fn to_call_args(&self) -> CallArgs {
        self.clone()
    }
}

/// `prefix + hex(digest(joined args))`.
///
/// # Examples
///
/// ```
/// use dashcache_core::{CallArgs, GenericKey, KeyStrategy};
///
/// let strategy = GenericKey::new("FRONTEND::CL::");
/// let key = strategy.derive(&CallArgs::new().arg("2021-01-04")).unwrap();
/// assert!(key.as_str().starts_with("FRONTEND::CL::"));
/// assert_eq!(key.as_str().len(), "FRONTEND::CL::".len() + 12);
/// ```
#[derive(Debug, Clone)]
pub struct GenericKey {
    prefix: String,
    digest_bytes: usize,
}

impl GenericKey {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            digest_bytes: DEFAULT_DIGEST_BYTES,
        }
    }

    /// Overrides the digest width, clamped to 4..=32 bytes.
    pub fn with_digest_bytes(mut self, bytes: usize) -> Self {
        self.digest_bytes = bytes.clamp(4, 32);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn digest(&self, joined: &str) -> String {
        let hash = Sha256::digest(joined.as_bytes());
        hex::encode(&hash[..self.digest_bytes])
    }
}

impl<A: ToCallArgs + ?Sized> KeyStrategy<A> for GenericKey {
    fn derive(&self, args: &A) -> Result<CacheKey, KeyError> {
        if self.prefix.is_empty() {
            return Err(KeyError::EmptyPrefix);
        }

        let joined = args.to_call_args().joined();
        Ok(CacheKey(format!("{}{}", self.prefix, self.digest(&joined))))
    }
}

/// Whether a partitioned request targets one area or the aggregate view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AreaScope {
    /// Country-wide aggregate; normalized to [`OVERVIEW_AREA`].
    Overview,
    /// A specific sub-area by identifier (e.g. `E09000033`).
    Area(String),
}

impl AreaScope {
    pub fn area(code: impl Into<String>) -> Self {
        AreaScope::Area(code.into())
    }
}

/// Arguments of a date/area partitioned accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaQuery {
    /// Release date, as `YYYY-MM-DD` or an ISO timestamp.
    pub date: String,
    pub scope: AreaScope,
}

impl AreaQuery {
    pub fn new(date: impl Into<String>, scope: AreaScope) -> Self {
        Self {
            date: date.into(),
            scope,
        }
    }

    /// Shorthand for an overview request.
    pub fn overview(date: impl Into<String>) -> Self {
        Self::new(date, AreaScope::Overview)
    }

    /// Shorthand for a specific area request.
    pub fn area(date: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(date, AreaScope::area(code))
    }
}

impl ToCallArgs for AreaQuery {
    fn to_call_args(&self) -> CallArgs {
        let area = match &self.scope {
            AreaScope::Overview => KeyArg::from(OVERVIEW_AREA),
            AreaScope::Area(code) => KeyArg::from(code.as_str()),
        };
        CallArgs::new().arg(self.date.as_str()).arg(area)
    }
}

/// `prefix + isoDate + "-" + areaId`.
///
/// A `-` is placed between prefix and date unless the prefix already ends
/// with `:` or `-`.
///
/// # Examples
///
/// ```
/// use dashcache_core::{AreaKey, AreaQuery, KeyStrategy};
///
/// let strategy = AreaKey::new("AREA::");
/// let key = strategy.derive(&AreaQuery::overview("2021-01-04")).unwrap();
/// assert_eq!(key.as_str(), "AREA::2021-01-04-UK");
/// ```
#[derive(Debug, Clone)]
pub struct AreaKey {
    prefix: String,
}

impl AreaKey {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn separator(&self) -> &'static str {
        if self.prefix.ends_with(':') || self.prefix.ends_with('-') {
            ""
        } else {
            "-"
        }
    }

    fn area_id(&self, scope: &AreaScope) -> Result<String, KeyError> {
        match scope {
            AreaScope::Overview => Ok(OVERVIEW_AREA.to_string()),
            AreaScope::Area(code) => {
                let code = code.trim();
                if code.is_empty() {
                    return Err(KeyError::invalid_area(code, "cannot be blank"));
                }
                if code.contains(char::is_whitespace) {
                    return Err(KeyError::invalid_area(code, "cannot contain whitespace"));
                }
                Ok(code.to_uppercase())
            },
        }
    }
}

impl KeyStrategy<AreaQuery> for AreaKey {
    fn derive(&self, args: &AreaQuery) -> Result<CacheKey, KeyError> {
        if self.prefix.is_empty() {
            return Err(KeyError::EmptyPrefix);
        }

        let date = normalize_date(&args.date)?;
        let area = self.area_id(&args.scope)?;

        Ok(CacheKey(format!(
            "{}{}{}-{}",
            self.prefix,
            self.separator(),
            date.format("%Y-%m-%d"),
            area
        )))
    }
}

/// Parses `YYYY-MM-DD` or the date part of an ISO timestamp.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, KeyError> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(['T', ' '])
        .next()
        .unwrap_or(trimmed);

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| KeyError::invalid_date(raw, e.to_string()))
}
