//! Immutable, columnar in-memory view of the event catalog.
//!
//! A [`RecordTable`] is built once (see [`loader`]) and never mutated
//! afterwards. Filtering produces a fresh table; derived values live in
//! result tables, never on the source. The table is `Send + Sync`, so any
//! number of queries may borrow it concurrently.

pub mod loader;
pub mod value;

pub use loader::EventRecord;
pub use value::Value;

use crate::compute::expr::{Predicate, RowSource};
use crate::error::{QueryError, Result};
use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Float,
    Int,
    Bool,
    Time,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Float => "float",
            ColumnType::Int => "int",
            ColumnType::Bool => "bool",
            ColumnType::Time => "time",
        };
        f.write_str(name)
    }
}

/// Column set of an event table, in canonical order.
pub const EVENT_SCHEMA: &[(&str, ColumnType)] = &[
    ("id", ColumnType::Text),
    ("time", ColumnType::Time),
    ("latitude", ColumnType::Float),
    ("longitude", ColumnType::Float),
    ("depth", ColumnType::Float),
    ("mag", ColumnType::Float),
    ("magType", ColumnType::Text),
    ("net", ColumnType::Text),
    ("status", ColumnType::Text),
    ("type", ColumnType::Text),
    ("types", ColumnType::Text),
    ("alert", ColumnType::Text),
    ("place", ColumnType::Text),
    ("country", ColumnType::Text),
    ("continent", ColumnType::Text),
    ("region", ColumnType::Text),
    ("casualties", ColumnType::Float),
    ("economic_loss", ColumnType::Float),
    ("nst", ColumnType::Int),
    ("gap", ColumnType::Float),
    ("rms", ColumnType::Float),
    ("tsunami", ColumnType::Bool),
];

/// Columns a source must provide; every other schema column is optional.
pub const REQUIRED_COLUMNS: &[&str] = &["id", "time", "latitude", "longitude", "depth", "mag"];

/// Expected storage kind of a schema column.
pub fn schema_type(column: &str) -> Option<ColumnType> {
    EVENT_SCHEMA
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, ty)| *ty)
}

/// A typed column. Every column of a table has the same length.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Text(Vec<Option<String>>),
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    Bool(Vec<Option<bool>>),
    Time(Vec<Option<DateTime<Utc>>>),
}

impl Column {
    pub(crate) fn empty(ty: ColumnType, capacity: usize) -> Self {
        match ty {
            ColumnType::Text => Column::Text(Vec::with_capacity(capacity)),
            ColumnType::Float => Column::Float(Vec::with_capacity(capacity)),
            ColumnType::Int => Column::Int(Vec::with_capacity(capacity)),
            ColumnType::Bool => Column::Bool(Vec::with_capacity(capacity)),
            ColumnType::Time => Column::Time(Vec::with_capacity(capacity)),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Text(_) => ColumnType::Text,
            Column::Float(_) => ColumnType::Float,
            Column::Int(_) => ColumnType::Int,
            Column::Bool(_) => ColumnType::Bool,
            Column::Time(_) => ColumnType::Time,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Text(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `row`, or null when out of range.
    pub fn get(&self, row: usize) -> Value {
        match self {
            Column::Text(v) => v.get(row).cloned().flatten().into(),
            Column::Float(v) => v.get(row).copied().flatten().into(),
            Column::Int(v) => v.get(row).copied().flatten().into(),
            Column::Bool(v) => v.get(row).copied().flatten().into(),
            Column::Time(v) => v.get(row).copied().flatten().into(),
        }
    }

    pub fn null_count(&self) -> usize {
        match self {
            Column::Text(v) => v.iter().filter(|x| x.is_none()).count(),
            Column::Float(v) => v.iter().filter(|x| x.is_none()).count(),
            Column::Int(v) => v.iter().filter(|x| x.is_none()).count(),
            Column::Bool(v) => v.iter().filter(|x| x.is_none()).count(),
            Column::Time(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        fn pick<T: Clone>(values: &[Option<T>], rows: &[usize]) -> Vec<Option<T>> {
            rows.iter().map(|&r| values[r].clone()).collect()
        }
        match self {
            Column::Text(v) => Column::Text(pick(v, rows)),
            Column::Float(v) => Column::Float(pick(v, rows)),
            Column::Int(v) => Column::Int(pick(v, rows)),
            Column::Bool(v) => Column::Bool(pick(v, rows)),
            Column::Time(v) => Column::Time(pick(v, rows)),
        }
    }
}

/// Immutable columnar table of seismic events.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    len: usize,
    columns: Vec<(String, Column)>,
    index: FxHashMap<String, usize>,
}

impl RecordTable {
    /// Assemble a table from named columns.
    ///
    /// Fails when column lengths disagree, a name repeats, a schema column
    /// has the wrong storage kind, a required column is missing, or an
    /// event id is null or repeated.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let len = columns.first().map_or(0, |(_, c)| c.len());
        let mut index = FxHashMap::default();

        for (pos, (name, column)) in columns.iter().enumerate() {
            if column.len() != len {
                return Err(QueryError::incompatible(
                    name.as_str(),
                    format!("has {} rows, expected {}", column.len(), len),
                ));
            }
            if let Some(expected) = schema_type(name)
                && expected != column.column_type()
            {
                return Err(QueryError::incompatible(
                    name.as_str(),
                    format!("must be {}, got {}", expected, column.column_type()),
                ));
            }
            if index.insert(name.clone(), pos).is_some() {
                return Err(QueryError::incompatible(name.as_str(), "appears twice"));
            }
        }

        let table = Self {
            len,
            columns,
            index,
        };
        table.require(REQUIRED_COLUMNS)?;
        table.check_ids()?;
        Ok(table)
    }

    fn check_ids(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        for (row, id) in self.ids()?.iter().enumerate() {
            let Some(id) = id else {
                return Err(QueryError::incompatible(
                    "id",
                    format!("is null at row {}", row),
                ));
            };
            if !seen.insert(id.as_str()) {
                return Err(QueryError::DuplicateId(id.clone()));
            }
        }
        Ok(())
    }

    /// Build a table from row records. Absent optional fields become
    /// all-null columns, so the result always carries the full schema.
    pub fn from_events<I>(events: I) -> Result<Self>
    where
        I: IntoIterator<Item = EventRecord>,
    {
        Self::from_columns(loader::columns_from_events(events))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.index
            .get(name)
            .map(|&pos| &self.columns[pos].1)
            .ok_or_else(|| QueryError::missing_column(name))
    }

    /// Fail with a schema error naming the first absent column.
    pub fn require<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        match names.iter().find(|n| !self.has_column(n.as_ref())) {
            Some(missing) => Err(QueryError::missing_column(missing.as_ref())),
            None => Ok(()),
        }
    }

    pub fn floats(&self, name: &str) -> Result<&[Option<f64>]> {
        match self.column(name)? {
            Column::Float(v) => Ok(v),
            other => Err(wrong_type(name, ColumnType::Float, other)),
        }
    }

    pub fn ints(&self, name: &str) -> Result<&[Option<i64>]> {
        match self.column(name)? {
            Column::Int(v) => Ok(v),
            other => Err(wrong_type(name, ColumnType::Int, other)),
        }
    }

    pub fn texts(&self, name: &str) -> Result<&[Option<String>]> {
        match self.column(name)? {
            Column::Text(v) => Ok(v),
            other => Err(wrong_type(name, ColumnType::Text, other)),
        }
    }

    pub fn bools(&self, name: &str) -> Result<&[Option<bool>]> {
        match self.column(name)? {
            Column::Bool(v) => Ok(v),
            other => Err(wrong_type(name, ColumnType::Bool, other)),
        }
    }

    pub fn times(&self, name: &str) -> Result<&[Option<DateTime<Utc>>]> {
        match self.column(name)? {
            Column::Time(v) => Ok(v),
            other => Err(wrong_type(name, ColumnType::Time, other)),
        }
    }

    /// Event ids in row order.
    pub fn ids(&self) -> Result<&[Option<String>]> {
        self.texts("id")
    }

    /// Row indices satisfying `predicate`, in table order.
    pub fn matching_rows(&self, predicate: &Predicate) -> Result<Vec<usize>> {
        let bound = predicate.bind(self)?;
        let mut rows = Vec::new();
        for row in 0..self.len {
            if bound.eval(self, row)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// New table holding only the rows that satisfy `predicate`.
    pub fn filter(&self, predicate: &Predicate) -> Result<RecordTable> {
        let rows = self.matching_rows(predicate)?;
        Ok(self.take(&rows))
    }

    /// New table holding `rows` (in the given order).
    ///
    /// # Panics
    ///
    /// Panics if a row index is out of range.
    pub fn take(&self, rows: &[usize]) -> RecordTable {
        let columns: Vec<(String, Column)> = self
            .columns
            .iter()
            .map(|(name, column)| (name.clone(), column.take(rows)))
            .collect();
        RecordTable {
            len: rows.len(),
            columns,
            index: self.index.clone(),
        }
    }
}

impl RowSource for RecordTable {
    fn row_count(&self) -> usize {
        self.len
    }

    fn has_column(&self, column: &str) -> bool {
        RecordTable::has_column(self, column)
    }

    fn value(&self, column: &str, row: usize) -> Result<Value> {
        Ok(self.column(column)?.get(row))
    }
}

fn wrong_type(name: &str, expected: ColumnType, found: &Column) -> QueryError {
    QueryError::incompatible(
        name,
        format!("must be {}, got {}", expected, found.column_type()),
    )
}
