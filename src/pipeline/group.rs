//! Grouping and per-group aggregation.
//!
//! Groups are emitted in ascending key order, compared component by
//! component, with null keys after every non-null key. A key either keeps
//! null as a group of its own or drops the rows that produce it; temporal
//! keys always drop, so rows without a time never land in a default bucket.

use crate::compute::aggregate::{Accumulator, Aggregate};
use crate::compute::expr::{Expr, RowSource};
use crate::compute::rank::{Direction, compare_cells};
use crate::compute::temporal::TimePart;
use crate::error::Result;
use crate::result::ResultTable;
use crate::table::Value;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// What to do with rows whose key evaluates to null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullKeys {
    /// Null forms its own group.
    #[default]
    Keep,
    /// Rows with a null key are left out.
    Drop,
}

/// One component of a group key: an output column name and the expression
/// producing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupKey {
    pub name: String,
    pub expr: Expr,
    #[serde(default)]
    pub nulls: NullKeys,
}

impl GroupKey {
    /// Group by a raw column, keeping nulls.
    pub fn column(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            expr: Expr::Column(name.clone()),
            name,
            nulls: NullKeys::Keep,
        }
    }

    /// Group by a calendar component of `time`, named after the component.
    pub fn temporal(part: TimePart) -> Self {
        Self {
            name: part.name().to_string(),
            expr: Expr::temporal(part),
            nulls: NullKeys::Drop,
        }
    }

    pub fn named(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
            nulls: NullKeys::Keep,
        }
    }

    pub fn drop_nulls(mut self) -> Self {
        self.nulls = NullKeys::Drop;
        self
    }

    pub fn drops_nulls(&self) -> bool {
        self.nulls == NullKeys::Drop || self.expr.is_temporal()
    }
}

type Key = SmallVec<[Value; 2]>;

fn compare_keys(a: &Key, b: &Key) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| compare_cells(x, y, Direction::Asc))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn bind_all<S: RowSource + ?Sized>(
    aggregates: &[Aggregate],
    src: &S,
) -> Result<Vec<Aggregate>> {
    aggregates.iter().map(|a| a.bind(src)).collect()
}

fn output_columns(keys: &[GroupKey], aggregates: &[Aggregate]) -> Vec<String> {
    keys.iter()
        .map(|k| k.name.clone())
        .chain(aggregates.iter().map(|a| a.name.clone()))
        .collect()
}

/// One row per distinct key, key columns first, then one column per
/// aggregate.
pub(crate) fn grouped<S: RowSource + ?Sized>(
    src: &S,
    keys: &[GroupKey],
    aggregates: &[Aggregate],
) -> Result<ResultTable> {
    let key_exprs = keys
        .iter()
        .map(|k| k.expr.bind(src))
        .collect::<Result<Vec<_>>>()?;
    let aggregates = bind_all(aggregates, src)?;

    let mut slots: FxHashMap<Key, usize> = FxHashMap::default();
    let mut groups: Vec<(Key, Vec<Accumulator>)> = Vec::new();
    let mut dropped = 0usize;

    'rows: for row in 0..src.row_count() {
        let mut key = Key::with_capacity(keys.len());
        for (group_key, expr) in keys.iter().zip(&key_exprs) {
            let value = expr.eval(src, row)?;
            if value.is_null() && group_key.drops_nulls() {
                dropped += 1;
                continue 'rows;
            }
            key.push(value);
        }

        let slot = match slots.get(&key) {
            Some(&slot) => slot,
            None => {
                let accumulators = aggregates.iter().map(Aggregate::accumulator).collect();
                groups.push((key.clone(), accumulators));
                slots.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };

        let accumulators = &mut groups[slot].1;
        for (aggregate, acc) in aggregates.iter().zip(accumulators.iter_mut()) {
            aggregate.feed(src, row, acc)?;
        }
    }

    if dropped > 0 {
        log::debug!("group by: {} rows dropped for null keys", dropped);
    }

    groups.sort_by(|a, b| compare_keys(&a.0, &b.0));

    let mut out = ResultTable::new(output_columns(keys, &aggregates));
    for (key, accumulators) in groups {
        let mut row: Vec<Value> = key.into_iter().collect();
        row.extend(accumulators.into_iter().map(Accumulator::finish));
        out.push_row(row);
    }
    Ok(out)
}

/// A single row of aggregates over every row of `src`.
pub(crate) fn global<S: RowSource + ?Sized>(
    src: &S,
    aggregates: &[Aggregate],
) -> Result<ResultTable> {
    let aggregates = bind_all(aggregates, src)?;
    let mut accumulators: Vec<Accumulator> =
        aggregates.iter().map(Aggregate::accumulator).collect();

    for row in 0..src.row_count() {
        for (aggregate, acc) in aggregates.iter().zip(accumulators.iter_mut()) {
            aggregate.feed(src, row, acc)?;
        }
    }

    let mut out = ResultTable::new(output_columns(&[], &aggregates));
    out.push_row(accumulators.into_iter().map(Accumulator::finish).collect());
    Ok(out)
}
