//! Row-oriented table codec with a versioned column rename.
//!
//! Tables are exchanged with handlers using the public (camelCase) column
//! names and stored using the storage (snake_case) names. The mapping is a
//! versioned constant: a payload written under another version is rejected
//! on decode, so a mapping change reads as a cache miss instead of silently
//! mislabelling columns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::{Codec, CodecKind};
use crate::error::CodecError;

/// A public→storage column rename table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    version: u32,
    pairs: &'static [(&'static str, &'static str)],
}

/// Column mapping used by the dashboard datasets.
pub const DASHBOARD_COLUMNS: ColumnMapping = ColumnMapping::new(
    2,
    &[
        ("areaCode", "area_code"),
        ("areaName", "area_name"),
        ("areaType", "area_type"),
        ("releaseTimestamp", "release_timestamp"),
        ("metric", "metric_name"),
    ],
);

impl ColumnMapping {
    pub const fn new(version: u32, pairs: &'static [(&'static str, &'static str)]) -> Self {
        Self { version, pairs }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Storage name for a public column; unmapped columns pass through.
    pub fn to_storage<'a>(&self, public: &'a str) -> &'a str {
        self.pairs
            .iter()
            .find(|(p, _)| *p == public)
            .map_or(public, |(_, s)| *s)
    }

    /// Public name for a storage column; unmapped columns pass through.
    pub fn to_public<'a>(&self, storage: &'a str) -> &'a str {
        self.pairs
            .iter()
            .find(|(_, s)| *s == storage)
            .map_or(storage, |(p, _)| *p)
    }

    /// Rejects a public column that already uses another column's storage name,
    /// since it could not be told apart on the way back.
    fn check_public(&self, column: &str) -> Result<(), CodecError> {
        match self.pairs.iter().find(|(_, s)| *s == column) {
            Some((owner, _)) if *owner != column => Err(CodecError::ColumnCollision {
                column: column.to_string(),
                owner: owner.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// A row-oriented table: a header and rows of equal width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row, checking its width against the header.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), CodecError> {
        if row.len() != self.columns.len() {
            return Err(CodecError::RaggedRow {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Builder-style [`Table::push_row`].
    pub fn with_row(mut self, row: Vec<Value>) -> Result<Self, CodecError> {
        self.push_row(row)?;
        Ok(self)
    }

    /// Builds a table from JSON records, taking the header from the first
    /// record. Missing fields in later records become `null`.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let columns: Vec<String> = records
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    fn check_widths(&self) -> Result<(), CodecError> {
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(CodecError::RaggedRow {
                    row: index,
                    expected: self.columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Codec for [`Table`] values.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use dashcache_core::codec::{Codec, Table, TabularCodec};
///
/// let table = Table::new(["date", "areaCode", "value"])
///     .with_row(vec![json!("2021-01-04"), json!("E09000033"), json!(412)])
///     .unwrap();
///
/// let codec = TabularCodec::default();
/// let bytes = codec.encode(&table).unwrap();
/// assert!(String::from_utf8_lossy(&bytes).contains("area_code"));
/// assert_eq!(codec.decode(&bytes).unwrap(), table);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TabularCodec {
    mapping: ColumnMapping,
}

impl TabularCodec {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }
}

impl Default for TabularCodec {
    fn default() -> Self {
        Self::new(DASHBOARD_COLUMNS)
    }
}

impl Codec for TabularCodec {
    type Value = Table;

    fn encode(&self, table: &Table) -> Result<Vec<u8>, CodecError> {
        table.check_widths()?;

        let columns = table
            .columns
            .iter()
            .map(|c| {
                self.mapping.check_public(c)?;
                Ok(self.mapping.to_storage(c).to_string())
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        let envelope = Envelope {
            version: self.mapping.version,
            columns,
            rows: table.rows.clone(),
        };

        serde_json::to_vec(&envelope).map_err(CodecError::Encode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Table, CodecError> {
        let envelope: Envelope = serde_json::from_slice(bytes).map_err(CodecError::Decode)?;

        if envelope.version != self.mapping.version {
            return Err(CodecError::VersionMismatch {
                expected: self.mapping.version,
                found: envelope.version,
            });
        }

        let table = Table {
            columns: envelope
                .columns
                .iter()
                .map(|c| self.mapping.to_public(c).to_string())
                .collect(),
            rows: envelope.rows,
        };
        table.check_widths()?;

        Ok(table)
    }

    fn kind(&self) -> CodecKind {
        CodecKind::Tabular
    }
}
