//! Deterministic ordering and top-k selection.
//!
//! Sorting is stable, so rows with equal keys keep their incoming order
//! (group order or source row order). Nulls sort last in both directions,
//! which keeps them out of a top-k whenever enough non-null rows exist.

use crate::error::Result;
use crate::result::ResultTable;
use crate::table::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortKey {
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

/// Compare two cells under `direction`, nulls last either way.
pub fn compare_cells(a: &Value, b: &Value, direction: Direction) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = a.sort_cmp(b);
            match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        }
    }
}

/// Stable in-place sort of rows by the cell at `column`.
pub fn sort_rows(rows: &mut [Vec<Value>], column: usize, direction: Direction) {
    rows.sort_by(|a, b| compare_cells(&a[column], &b[column], direction));
}

/// The first `k` rows of `table` under `key`.
///
/// ```
/// use quake_query::compute::rank::{top_k, SortKey};
/// use quake_query::{ResultTable, Value};
///
/// let table = ResultTable::with_rows(
///     vec!["mag".into()],
///     vec![vec![Value::Float(5.0)], vec![Value::Float(9.0)], vec![Value::Null]],
/// )?;
/// let best = top_k(&table, &SortKey::desc("mag"), 2)?;
/// assert_eq!(best.rows(), &[vec![Value::Float(9.0)], vec![Value::Float(5.0)]]);
/// # Ok::<(), quake_query::QueryError>(())
/// ```
pub fn top_k(table: &ResultTable, key: &SortKey, k: usize) -> Result<ResultTable> {
    let mut ranked = table.clone();
    ranked.sort_by(key)?;
    ranked.truncate(k);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[(i64, Option<f64>)]) -> Vec<Vec<Value>> {
        values
            .iter()
            .map(|(id, v)| vec![Value::Int(*id), (*v).into()])
            .collect()
    }

    #[test]
    fn test_desc_sort_is_stable_with_nulls_last() {
        let mut data = rows(&[
            (1, Some(8.5)),
            (2, None),
            (3, Some(9.0)),
            (4, Some(8.5)),
            (5, Some(7.0)),
        ]);
        sort_rows(&mut data, 1, Direction::Desc);
        let order: Vec<i64> = data.iter().map(|r| r[0].as_i64().unwrap()).collect();
        assert_eq!(order, vec![3, 1, 4, 5, 2]);
    }

    #[test]
    fn test_asc_sort_keeps_nulls_last() {
        let mut data = rows(&[(1, None), (2, Some(3.0)), (3, Some(1.0))]);
        sort_rows(&mut data, 1, Direction::Asc);
        let order: Vec<i64> = data.iter().map(|r| r[0].as_i64().unwrap()).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_top_k_bounds_row_count() {
        let table = ResultTable::with_rows(
            vec!["id".into(), "mag".into()],
            rows(&[(1, Some(1.0)), (2, Some(2.0))]),
        )
        .unwrap();
        let top = top_k(&table, &SortKey::desc("mag"), 10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top.rows()[0][0], Value::Int(2));
    }

    #[test]
    fn test_top_k_unknown_column() {
        let table = ResultTable::new(vec!["mag".into()]);
        let err = top_k(&table, &SortKey::desc("depth"), 3).unwrap_err();
        assert_eq!(err.column(), Some("depth"));
    }
}
