//! Declarative query pipelines.
//!
//! A [`Pipeline`] runs its stages in a fixed order:
//!
//! 1. `filter` keeps source rows matching a predicate;
//! 2. the shaping stage, one of
//!    - `group_by` + `aggregates`: one row per group,
//!    - `aggregates` alone: a single row over the whole source,
//!    - `select`: one row per source row, one column per named expression;
//! 3. `derive` appends computed columns, each able to read the previous ones;
//! 4. `having` keeps result rows matching a predicate;
//! 5. `sort` orders rows (stable, nulls last, first key most significant);
//! 6. `limit` truncates;
//! 7. `keep` selects the final columns.
//!
//! Running a pipeline is a pure function of the pipeline and the table.
//!
//! ```
//! use quake_query::compute::{Aggregate, col, lit};
//! use quake_query::pipeline::{GroupKey, Pipeline};
//! use quake_query::{EventRecord, RecordTable, SortKey, Value};
//!
//! let table = RecordTable::from_events(vec![
//!     EventRecord::new("a").region("Andes").mag(6.0),
//!     EventRecord::new("b").region("Andes").mag(7.0),
//!     EventRecord::new("c").region("Kuril").mag(8.0),
//! ])?;
//!
//! let pipeline = Pipeline::new()
//!     .group_by(GroupKey::column("region"))
//!     .aggregate(Aggregate::count("freq"))
//!     .aggregate(Aggregate::mean("avg_mag", col("mag")))
//!     .derive("score", col("freq") * col("avg_mag"))
//!     .sort_by(SortKey::desc("score"))
//!     .limit(1);
//!
//! let result = pipeline.execute(&table)?;
//! assert_eq!(result.get(0, "region"), Some(&Value::text("Andes")));
//! assert_eq!(result.get(0, "score"), Some(&Value::Float(13.0)));
//! # Ok::<(), quake_query::QueryError>(())
//! ```

pub mod group;

pub use group::{GroupKey, NullKeys};

use crate::compute::aggregate::Aggregate;
use crate::compute::expr::{Expr, Predicate};
use crate::compute::rank::SortKey;
use crate::error::{QueryError, Result};
use crate::result::ResultTable;
use crate::table::RecordTable;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// An expression with an output column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedExpr {
    pub name: String,
    pub expr: Expr,
}

impl NamedExpr {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }

    /// A raw column passed through under its own name.
    pub fn column(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            expr: Expr::Column(name.clone()),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<Predicate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    group_by: Vec<GroupKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aggregates: Vec<Aggregate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    select: Vec<NamedExpr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    derive: Vec<NamedExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    having: Option<Predicate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sort: Vec<SortKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    keep: Vec<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep source rows matching `predicate`. Repeated calls combine with
    /// `and`.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn group_by(mut self, key: GroupKey) -> Self {
        self.group_by.push(key);
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }

    pub fn select(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.select.push(NamedExpr::new(name, expr));
        self
    }

    /// Pass raw columns through unchanged.
    pub fn columns<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.select
            .extend(names.iter().map(|n| NamedExpr::column(n.as_ref())));
        self
    }

    pub fn derive(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.derive.push(NamedExpr::new(name, expr));
        self
    }

    pub fn having(mut self, predicate: Predicate) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Add a sort key, less significant than those already added.
    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn limit(mut self, rows: usize) -> Self {
        self.limit = Some(rows);
        self
    }

    pub fn keep<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.keep = names.iter().map(|n| n.as_ref().to_string()).collect();
        self
    }

    /// Result columns produced by the shaping stage.
    fn shape_columns(&self) -> Vec<String> {
        if self.group_by.is_empty() && self.aggregates.is_empty() {
            self.select.iter().map(|s| s.name.clone()).collect()
        } else {
            self.group_by
                .iter()
                .map(|k| k.name.clone())
                .chain(self.aggregates.iter().map(|a| a.name.clone()))
                .collect()
        }
    }

    /// Columns of the final result.
    pub fn output_columns(&self) -> Vec<String> {
        if !self.keep.is_empty() {
            return self.keep.clone();
        }
        let mut columns = self.shape_columns();
        columns.extend(self.derive.iter().map(|d| d.name.clone()));
        columns
    }

    /// Source table columns this pipeline reads.
    pub fn source_columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(filter) = &self.filter {
            filter.collect_columns(&mut out);
        }
        for key in &self.group_by {
            key.expr.collect_columns(&mut out);
        }
        for aggregate in &self.aggregates {
            aggregate.collect_columns(&mut out);
        }
        for item in &self.select {
            item.expr.collect_columns(&mut out);
        }
        out
    }

    /// Reject pipelines whose stages cannot fit together.
    pub fn validate(&self) -> Result<()> {
        let grouped = !self.group_by.is_empty() || !self.aggregates.is_empty();
        if grouped && !self.select.is_empty() {
            return Err(invalid("select cannot be combined with group_by or aggregates"));
        }
        if !grouped && self.select.is_empty() {
            return Err(invalid("needs group_by/aggregates or a select list"));
        }
        if !self.group_by.is_empty() && self.aggregates.is_empty() {
            return Err(invalid("group_by needs at least one aggregate"));
        }
        for aggregate in &self.aggregates {
            aggregate.validate()?;
        }
        if self.limit == Some(0) {
            return Err(invalid("limit must be greater than zero"));
        }

        let mut available = self.shape_columns();
        if let Some(name) = first_duplicate(&available) {
            return Err(invalid(format!("column '{}' is produced twice", name)));
        }

        for item in &self.derive {
            let mut reads = Vec::new();
            item.expr.collect_columns(&mut reads);
            check_known(&reads, &available, "derive")?;
            if available.contains(&item.name) {
                return Err(invalid(format!("column '{}' is produced twice", item.name)));
            }
            available.push(item.name.clone());
        }

        if let Some(having) = &self.having {
            let mut reads = Vec::new();
            having.collect_columns(&mut reads);
            check_known(&reads, &available, "having")?;
        }
        let sorted: Vec<String> = self.sort.iter().map(|k| k.column.clone()).collect();
        check_known(&sorted, &available, "sort")?;
        check_known(&self.keep, &available, "keep")?;
        Ok(())
    }

    /// Run against `table`.
    pub fn execute(&self, table: &RecordTable) -> Result<ResultTable> {
        self.validate()?;
        table.require(&self.source_columns())?;

        let source: Cow<'_, RecordTable> = match &self.filter {
            Some(predicate) => Cow::Owned(table.filter(predicate)?),
            None => Cow::Borrowed(table),
        };
        let source = source.as_ref();

        let mut result = if !self.group_by.is_empty() {
            group::grouped(source, &self.group_by, &self.aggregates)?
        } else if !self.aggregates.is_empty() {
            group::global(source, &self.aggregates)?
        } else {
            project(source, &self.select)?
        };

        for item in &self.derive {
            let expr = item.expr.bind(&result)?;
            let values = (0..result.len())
                .map(|row| expr.eval(&result, row))
                .collect::<Result<Vec<_>>>()?;
            result.append_column(&item.name, values)?;
        }

        if let Some(having) = &self.having {
            let predicate = having.bind(&result)?;
            let keep = (0..result.len())
                .map(|row| predicate.eval(&result, row))
                .collect::<Result<Vec<_>>>()?;
            result.retain_rows(&keep);
        }

        // Stable sorts from least to most significant key.
        for key in self.sort.iter().rev() {
            result.sort_by(key)?;
        }

        if let Some(limit) = self.limit {
            result.truncate(limit);
        }

        if !self.keep.is_empty() {
            result = result.select(&self.keep)?;
        }

        log::debug!(
            "pipeline: {} rows in, {} after filter, {} out",
            table.len(),
            source.len(),
            result.len()
        );
        Ok(result)
    }
}

fn project(source: &RecordTable, select: &[NamedExpr]) -> Result<ResultTable> {
    let exprs = select
        .iter()
        .map(|s| s.expr.bind(source))
        .collect::<Result<Vec<_>>>()?;

    let mut out = ResultTable::new(select.iter().map(|s| s.name.clone()).collect());
    for row in 0..source.len() {
        let values = exprs
            .iter()
            .map(|e| e.eval(source, row))
            .collect::<Result<Vec<_>>>()?;
        out.push_row(values);
    }
    Ok(out)
}

fn invalid(detail: impl Into<String>) -> QueryError {
    QueryError::InvalidInput(format!("pipeline {}", detail.into()))
}

fn first_duplicate(names: &[String]) -> Option<&String> {
    names
        .iter()
        .enumerate()
        .find(|(i, name)| names[..*i].contains(name))
        .map(|(_, name)| name)
}

fn check_known(reads: &[String], available: &[String], stage: &str) -> Result<()> {
    match reads.iter().find(|c| !available.contains(c)) {
        Some(unknown) => Err(invalid(format!(
            "{} refers to unknown result column '{}'",
            stage, unknown
        ))),
        None => Ok(()),
    }
}
