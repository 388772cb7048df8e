//! Tabular query results.

use crate::compute::expr::RowSource;
use crate::compute::rank::{self, SortKey};
use crate::error::{QueryError, Result};
use crate::table::Value;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::fmt;

/// An ordered sequence of named columns. Row order is significant: it
/// reflects the pipeline's sort and limit.
///
/// Each run builds a fresh result table owned by the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawResultTable")]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Unchecked serde form; deserialization goes through [`ResultTable::with_rows`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TryFrom<RawResultTable> for ResultTable {
    type Error = QueryError;

    fn try_from(raw: RawResultTable) -> Result<Self> {
        Self::with_rows(raw.columns, raw.rows)
    }
}

impl ResultTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build from rows; every row must be as wide as `columns`. Non-finite
    /// floats are stored as null.
    pub fn with_rows(columns: Vec<String>, mut rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((pos, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(QueryError::InvalidInput(format!(
                "row {} has {} cells, expected {}",
                pos,
                row.len(),
                columns.len()
            )));
        }
        for cell in rows.iter_mut().flatten() {
            if let Value::Float(v) = cell
                && !v.is_finite()
            {
                *cell = Value::Null;
            }
        }
        Ok(Self { columns, rows })
    }

    pub(crate) fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| QueryError::missing_column(name))
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub(crate) fn append_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if self.columns.iter().any(|c| c == name) {
            return Err(QueryError::InvalidInput(format!(
                "column '{}' already exists",
                name
            )));
        }
        if values.len() != self.rows.len() {
            return Err(QueryError::InvalidInput(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Keep rows whose flag is set.
    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.rows.retain(|_| flags.next().copied().unwrap_or(false));
    }

    /// Stable sort by one column.
    pub fn sort_by(&mut self, key: &SortKey) -> Result<()> {
        let idx = self.column_index(&key.column)?;
        rank::sort_rows(&mut self.rows, idx, key.direction);
        Ok(())
    }

    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// New table with only `names`, in that order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<ResultTable> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResultTable {
            columns: names.iter().map(|n| n.as_ref().to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Row-oriented JSON objects, one per row.
    pub fn to_records(&self) -> Result<Vec<Map<String, serde_json::Value>>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(name, value)| Ok((name.clone(), serde_json::to_value(value)?)))
                    .collect()
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_records()?)?)
    }
}

impl RowSource for ResultTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    fn value(&self, column: &str, row: usize) -> Result<Value> {
        let idx = self.column_index(column)?;
        Ok(self
            .rows
            .get(row)
            .map_or(Value::Null, |r| r[idx].clone()))
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, items: &[String]| -> fmt::Result {
            let padded: Vec<String> = items
                .iter()
                .zip(&widths)
                .map(|(item, w)| format!("{:<width$}", item, width = *w))
                .collect();
            writeln!(f, "{}", padded.join(" | ").trim_end())
        };

        line(f, &self.columns)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &cells {
            line(f, row)?;
        }
        write!(f, "({} rows)", self.rows.len())
    }
}
