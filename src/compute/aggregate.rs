//! Aggregate reducers.
//!
//! | Reducer | Input          | Empty / all-null result |
//! |---------|----------------|-------------------------|
//! | `count` | rows or values | `0`                     |
//! | `sum`   | numbers        | null                    |
//! | `mean`  | numbers        | null                    |
//! | `min`   | comparable     | null                    |
//! | `max`   | comparable     | null                    |
//! | `any`   | truthiness     | `false`                 |
//!
//! Nulls are skipped by every reducer. An aggregate may carry its own row
//! filter, so "shallow events per country" and "deep events per country"
//! can be computed side by side in one grouping pass.

use super::expr::{Expr, Predicate, RowSource};
use crate::error::{QueryError, Result};
use crate::table::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Any,
}

impl Reducer {
    pub fn name(&self) -> &'static str {
        match self {
            Reducer::Count => "count",
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Any => "any",
        }
    }

    fn needs_input(&self) -> bool {
        matches!(
            self,
            Reducer::Sum | Reducer::Mean | Reducer::Min | Reducer::Max
        )
    }

    pub(crate) fn type_error(&self, input: &Expr, found: &str) -> QueryError {
        QueryError::incompatible(
            input.to_string(),
            format!("cannot feed {} values to {}", found, self),
        )
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Running state of one reducer.
#[derive(Debug, Clone)]
pub struct Accumulator {
    reducer: Reducer,
    count: usize,
    sum: f64,
    int_sum: Option<i64>,
    best: Option<Value>,
    any: bool,
}

impl Accumulator {
    pub fn new(reducer: Reducer) -> Self {
        Self {
            reducer,
            count: 0,
            sum: 0.0,
            int_sum: Some(0),
            best: None,
            any: false,
        }
    }

    /// Feed one value. Nulls are ignored. On a kind the reducer cannot
    /// handle, returns that kind's name.
    pub fn update(&mut self, value: &Value) -> std::result::Result<(), &'static str> {
        if value.is_null() {
            return Ok(());
        }

        match self.reducer {
            Reducer::Count => {}
            Reducer::Sum | Reducer::Mean => {
                let number = match value {
                    Value::Int(_) | Value::Float(_) => value.as_f64(),
                    _ => None,
                }
                .ok_or(value.kind())?;
                self.sum += number;
                self.int_sum = match (self.int_sum, value) {
                    (Some(acc), Value::Int(i)) => acc.checked_add(*i),
                    _ => None,
                };
            }
            Reducer::Min | Reducer::Max => {
                let replace = match &self.best {
                    None => true,
                    Some(best) => {
                        let ordering = value.compare(best).ok_or(value.kind())?;
                        match self.reducer {
                            Reducer::Min => ordering == Ordering::Less,
                            _ => ordering == Ordering::Greater,
                        }
                    }
                };
                if replace {
                    self.best = Some(value.clone());
                }
            }
            Reducer::Any => self.any |= value.is_truthy(),
        }
        self.count += 1;
        Ok(())
    }

    pub fn finish(self) -> Value {
        match self.reducer {
            Reducer::Count => Value::Int(self.count as i64),
            Reducer::Sum if self.count == 0 => Value::Null,
            Reducer::Sum => match self.int_sum {
                Some(total) => Value::Int(total),
                None => Value::float(self.sum),
            },
            Reducer::Mean if self.count == 0 => Value::Null,
            Reducer::Mean => Value::float(self.sum / self.count as f64),
            Reducer::Min | Reducer::Max => self.best.unwrap_or(Value::Null),
            Reducer::Any => Value::Bool(self.any),
        }
    }
}

/// A named aggregate column: a reducer over an optional input expression,
/// restricted to rows matching an optional filter.
///
/// Without an input, `count` counts rows and `any` reports whether any row
/// matched the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Aggregate {
    pub name: String,
    pub reducer: Reducer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Expr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Predicate>,
}

impl Aggregate {
    fn build(name: impl Into<String>, reducer: Reducer, input: Option<Expr>) -> Self {
        Self {
            name: name.into(),
            reducer,
            input,
            filter: None,
        }
    }

    /// Number of rows.
    pub fn count(name: impl Into<String>) -> Self {
        Self::build(name, Reducer::Count, None)
    }

    /// Number of non-null values of `input`.
    pub fn count_of(name: impl Into<String>, input: Expr) -> Self {
        Self::build(name, Reducer::Count, Some(input))
    }

    pub fn sum(name: impl Into<String>, input: Expr) -> Self {
        Self::build(name, Reducer::Sum, Some(input))
    }

    pub fn mean(name: impl Into<String>, input: Expr) -> Self {
        Self::build(name, Reducer::Mean, Some(input))
    }

    pub fn min(name: impl Into<String>, input: Expr) -> Self {
        Self::build(name, Reducer::Min, Some(input))
    }

    pub fn max(name: impl Into<String>, input: Expr) -> Self {
        Self::build(name, Reducer::Max, Some(input))
    }

    /// Whether any row satisfies `condition`.
    pub fn any(name: impl Into<String>, condition: Predicate) -> Self {
        Self::build(name, Reducer::Any, None).filter(condition)
    }

    /// Restrict to rows matching `condition` (combined with any existing
    /// filter).
    pub fn filter(mut self, condition: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(QueryError::InvalidInput(
                "aggregate name must not be empty".to_string(),
            ));
        }
        if self.reducer.needs_input() && self.input.is_none() {
            return Err(QueryError::InvalidInput(format!(
                "aggregate '{}' uses {} and needs an input expression",
                self.name, self.reducer
            )));
        }
        Ok(())
    }

    pub fn collect_columns(&self, out: &mut Vec<String>) {
        if let Some(input) = &self.input {
            input.collect_columns(out);
        }
        if let Some(filter) = &self.filter {
            filter.collect_columns(out);
        }
    }

    /// Copy with table-wide reductions resolved against `src`.
    pub fn bind<S: RowSource + ?Sized>(&self, src: &S) -> Result<Aggregate> {
        Ok(Aggregate {
            name: self.name.clone(),
            reducer: self.reducer,
            input: self.input.as_ref().map(|e| e.bind(src)).transpose()?,
            filter: self.filter.as_ref().map(|p| p.bind(src)).transpose()?,
        })
    }

    pub fn accumulator(&self) -> Accumulator {
        Accumulator::new(self.reducer)
    }

    /// Feed `row` of `src` into `acc`, honouring the filter.
    pub fn feed<S: RowSource + ?Sized>(
        &self,
        src: &S,
        row: usize,
        acc: &mut Accumulator,
    ) -> Result<()> {
        if let Some(filter) = &self.filter
            && !filter.eval(src, row)?
        {
            return Ok(());
        }

        match &self.input {
            Some(input) => {
                let value = input.eval(src, row)?;
                acc.update(&value)
                    .map_err(|found| self.reducer.type_error(input, found))
            }
            None => acc
                .update(&Value::Bool(true))
                .map_err(|found| QueryError::InvalidInput(format!(
                    "aggregate '{}' cannot reduce {} rows without an input",
                    self.name, found
                ))),
        }
    }
}
