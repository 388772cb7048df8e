//! Expressions and predicates evaluated row by row.
//!
//! The same expression type serves both phases of a pipeline: against the
//! source [`RecordTable`](crate::RecordTable) (filters, group keys,
//! aggregate inputs) and against an intermediate
//! [`ResultTable`](crate::ResultTable) (derived columns, `having`). Both
//! implement [`RowSource`].
//!
//! Null handling is uniform: arithmetic with a null operand is null,
//! division by zero or null is null, comparisons involving null are false.

use super::aggregate::{Accumulator, Reducer};
use super::temporal::TimePart;
use crate::error::{QueryError, Result};
use crate::table::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops;

/// Anything expressions can be evaluated against.
pub trait RowSource {
    fn row_count(&self) -> usize;

    fn has_column(&self, column: &str) -> bool;

    /// Value of `column` at `row`; a schema error when the column is absent.
    fn value(&self, column: &str, row: usize) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Apply to two values. `None` when an operand is not numeric.
    fn apply(&self, left: &Value, right: &Value) -> Option<Value> {
        if left.is_null() || right.is_null() {
            return Some(Value::Null);
        }

        if let (Value::Int(a), Value::Int(b)) = (left, right) {
            let exact = match self {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div => None,
            };
            if let Some(v) = exact {
                return Some(Value::Int(v));
            }
        }

        let (a, b) = (left.as_f64()?, right.as_f64()?);
        let result = match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div if b == 0.0 => return Some(Value::Null),
            BinaryOp::Div => a / b,
        };
        Some(Value::float(result))
    }
}

/// A scalar expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Column(String),
    Literal(Value),
    /// Calendar component of a time column.
    Temporal { part: TimePart, column: String },
    Abs(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Substitute `default` when the inner value is null.
    Coalesce { expr: Box<Expr>, default: Value },
    /// Value of the inner expression on the previous row; null on the first.
    Lag(Box<Expr>),
    /// Reduction over every row of the source, e.g. the latest year in the
    /// table. Folded into a literal by [`Expr::bind`].
    Whole { reducer: Reducer, expr: Box<Expr> },
    /// Boolean value of a predicate.
    Test(Box<Predicate>),
}

/// Reference a column.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// A literal value.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Percentage change against the previous row:
/// `(x - lag(x)) / lag(x) * 100`. Null on the first row and whenever the
/// previous value is zero or null.
///
/// ```
/// use quake_query::compute::expr::{col, pct_change};
///
/// let growth = pct_change(col("total"));
/// assert_eq!(growth.to_string(), "(((total - lag(total)) / lag(total)) * 100)");
/// ```
pub fn pct_change(expr: Expr) -> Expr {
    let previous = expr.clone().lag();
    ((expr - previous.clone()) / previous) * lit(100i64)
}

impl Expr {
    /// Calendar component of the `time` column.
    pub fn temporal(part: TimePart) -> Self {
        Expr::Temporal {
            part,
            column: "time".to_string(),
        }
    }

    /// Table-wide reduction of `expr`.
    pub fn whole(reducer: Reducer, expr: Expr) -> Self {
        Expr::Whole {
            reducer,
            expr: Box::new(expr),
        }
    }

    pub fn abs(self) -> Self {
        Expr::Abs(Box::new(self))
    }

    pub fn fill_null(self, default: impl Into<Value>) -> Self {
        Expr::Coalesce {
            expr: Box::new(self),
            default: default.into(),
        }
    }

    pub fn lag(self) -> Self {
        Expr::Lag(Box::new(self))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Expr::Temporal { .. })
    }

    fn compare(self, op: CmpOp, right: Expr) -> Predicate {
        Predicate::Compare {
            left: self,
            op,
            right,
        }
    }

    pub fn eq(self, right: Expr) -> Predicate {
        self.compare(CmpOp::Eq, right)
    }

    pub fn ne(self, right: Expr) -> Predicate {
        self.compare(CmpOp::Ne, right)
    }

    pub fn lt(self, right: Expr) -> Predicate {
        self.compare(CmpOp::Lt, right)
    }

    pub fn le(self, right: Expr) -> Predicate {
        self.compare(CmpOp::Le, right)
    }

    pub fn gt(self, right: Expr) -> Predicate {
        self.compare(CmpOp::Gt, right)
    }

    pub fn ge(self, right: Expr) -> Predicate {
        self.compare(CmpOp::Ge, right)
    }

    pub fn is_null(self) -> Predicate {
        Predicate::IsNull(self)
    }

    pub fn not_null(self) -> Predicate {
        Predicate::NotNull(self)
    }

    /// Columns this expression reads, appended to `out` without duplicates.
    pub fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Expr::Column(name) | Expr::Temporal { column: name, .. } => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expr::Literal(_) => {}
            Expr::Abs(inner) | Expr::Lag(inner) => inner.collect_columns(out),
            Expr::Coalesce { expr, .. } | Expr::Whole { expr, .. } => expr.collect_columns(out),
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Test(predicate) => predicate.collect_columns(out),
        }
    }

    /// Resolve table-wide reductions against `src`, returning an expression
    /// that only needs per-row evaluation.
    pub fn bind<S: RowSource + ?Sized>(&self, src: &S) -> Result<Expr> {
        Ok(match self {
            Expr::Whole { reducer, expr } => {
                let inner = expr.bind(src)?;
                let mut acc = Accumulator::new(*reducer);
                for row in 0..src.row_count() {
                    let value = inner.eval(src, row)?;
                    acc.update(&value)
                        .map_err(|found| reducer.type_error(&inner, found))?;
                }
                Expr::Literal(acc.finish())
            }
            Expr::Abs(inner) => Expr::Abs(Box::new(inner.bind(src)?)),
            Expr::Lag(inner) => Expr::Lag(Box::new(inner.bind(src)?)),
            Expr::Coalesce { expr, default } => Expr::Coalesce {
                expr: Box::new(expr.bind(src)?),
                default: default.clone(),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(left.bind(src)?),
                right: Box::new(right.bind(src)?),
            },
            Expr::Test(predicate) => Expr::Test(Box::new(predicate.bind(src)?)),
            other => other.clone(),
        })
    }

    /// Evaluate at `row` of `src`.
    pub fn eval<S: RowSource + ?Sized>(&self, src: &S, row: usize) -> Result<Value> {
        match self {
            Expr::Column(name) => src.value(name, row),
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Temporal { part, column } => {
                let value = src.value(column, row)?;
                part.extract(&value).ok_or_else(|| {
                    QueryError::incompatible(
                        column.as_str(),
                        format!("must hold times for {}, got {}", part, value.kind()),
                    )
                })
            }
            Expr::Abs(inner) => match inner.eval(src, row)? {
                Value::Null => Ok(Value::Null),
                Value::Int(i) => Ok(i
                    .checked_abs()
                    .map_or_else(|| Value::float((i as f64).abs()), Value::Int)),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(QueryError::incompatible(
                    self.to_string(),
                    format!("expects a number, got {}", other.kind()),
                )),
            },
            Expr::Binary { op, left, right } => {
                let (l, r) = (left.eval(src, row)?, right.eval(src, row)?);
                op.apply(&l, &r).ok_or_else(|| {
                    QueryError::incompatible(
                        self.to_string(),
                        format!("cannot apply '{}' to {} and {}", op.symbol(), l.kind(), r.kind()),
                    )
                })
            }
            Expr::Coalesce { expr, default } => {
                let value = expr.eval(src, row)?;
                Ok(if value.is_null() {
                    default.clone()
                } else {
                    value
                })
            }
            Expr::Lag(inner) => match row.checked_sub(1) {
                Some(previous) => inner.eval(src, previous),
                None => Ok(Value::Null),
            },
            Expr::Whole { .. } => self.bind(src)?.eval(src, row),
            Expr::Test(predicate) => predicate.eval(src, row).map(Value::Bool),
        }
    }
}

impl ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        binary(BinaryOp::Add, self, rhs)
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        binary(BinaryOp::Sub, self, rhs)
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        binary(BinaryOp::Mul, self, rhs)
    }
}

impl ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        binary(BinaryOp::Div, self, rhs)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Literal(Value::Text(s)) => write!(f, "'{}'", s),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Temporal { part, column } => write!(f, "{}({})", part, column),
            Expr::Abs(inner) => write!(f, "abs({})", inner),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Coalesce { expr, default } => write!(f, "coalesce({}, {})", expr, default),
            Expr::Lag(inner) => write!(f, "lag({})", inner),
            Expr::Whole { reducer, expr } => write!(f, "{}({})", reducer, expr),
            Expr::Test(predicate) => write!(f, "({})", predicate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// A boolean condition over one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Compare { left: Expr, op: CmpOp, right: Expr },
    IsNull(Expr),
    NotNull(Expr),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And(mut all) => {
                all.push(other);
                Predicate::And(all)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut any) => {
                any.push(other);
                Predicate::Or(any)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Boolean column view of this predicate.
    pub fn test(self) -> Expr {
        Expr::Test(Box::new(self))
    }

    pub fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Predicate::Compare { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Predicate::IsNull(expr) | Predicate::NotNull(expr) => expr.collect_columns(out),
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().for_each(|p| p.collect_columns(out))
            }
            Predicate::Not(inner) => inner.collect_columns(out),
        }
    }

    pub fn bind<S: RowSource + ?Sized>(&self, src: &S) -> Result<Predicate> {
        Ok(match self {
            Predicate::Compare { left, op, right } => Predicate::Compare {
                left: left.bind(src)?,
                op: *op,
                right: right.bind(src)?,
            },
            Predicate::IsNull(expr) => Predicate::IsNull(expr.bind(src)?),
            Predicate::NotNull(expr) => Predicate::NotNull(expr.bind(src)?),
            Predicate::And(parts) => Predicate::And(
                parts
                    .iter()
                    .map(|p| p.bind(src))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Predicate::Or(parts) => Predicate::Or(
                parts
                    .iter()
                    .map(|p| p.bind(src))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Predicate::Not(inner) => Predicate::Not(Box::new(inner.bind(src)?)),
        })
    }

    pub fn eval<S: RowSource + ?Sized>(&self, src: &S, row: usize) -> Result<bool> {
        match self {
            Predicate::Compare { left, op, right } => {
                let (l, r) = (left.eval(src, row)?, right.eval(src, row)?);
                if l.is_null() || r.is_null() {
                    return Ok(false);
                }
                match l.compare(&r) {
                    Some(ordering) => Ok(op.holds(ordering)),
                    None => Err(QueryError::incompatible(
                        left.to_string(),
                        format!("cannot compare {} with {}", l.kind(), r.kind()),
                    )),
                }
            }
            Predicate::IsNull(expr) => Ok(expr.eval(src, row)?.is_null()),
            Predicate::NotNull(expr) => Ok(!expr.eval(src, row)?.is_null()),
            Predicate::And(parts) => {
                for part in parts {
                    if !part.eval(src, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(parts) => {
                for part in parts {
                    if part.eval(src, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!inner.eval(src, row)?),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str| {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "({})", part)?;
            }
            Ok(())
        };
        match self {
            Predicate::Compare { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Predicate::IsNull(expr) => write!(f, "{} is null", expr),
            Predicate::NotNull(expr) => write!(f, "{} is not null", expr),
            Predicate::And(parts) => join(f, parts, "and"),
            Predicate::Or(parts) => join(f, parts, "or"),
            Predicate::Not(inner) => write!(f, "not ({})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultTable;

    fn series(name: &str, values: Vec<Value>) -> ResultTable {
        ResultTable::with_rows(
            vec![name.to_string()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
        .unwrap()
    }

    fn eval_all(expr: &Expr, table: &ResultTable) -> Vec<Value> {
        (0..table.len()).map(|r| expr.eval(table, r).unwrap()).collect()
    }

    #[test]
    fn test_pct_change_series() {
        let counts = series("total", vec![Value::Int(10), Value::Int(20), Value::Int(15)]);
        let growth = eval_all(&pct_change(col("total")), &counts);
        assert_eq!(
            growth,
            vec![Value::Null, Value::Float(100.0), Value::Float(-25.0)]
        );
    }

    #[test]
    fn test_pct_change_zero_prior_is_null() {
        let counts = series("total", vec![Value::Int(0), Value::Int(5), Value::Null, Value::Int(4)]);
        let growth = eval_all(&pct_change(col("total")), &counts);
        assert_eq!(growth, vec![Value::Null, Value::Null, Value::Null, Value::Null]);
    }

    #[test]
    fn test_division_never_fails() {
        let table = series("deep", vec![Value::Int(0), Value::Null, Value::Int(4)]);
        let ratio = lit(8i64) / col("deep");
        assert_eq!(
            eval_all(&ratio, &table),
            vec![Value::Null, Value::Null, Value::Float(2.0)]
        );
    }

    #[test]
    fn test_int_arithmetic_stays_exact() {
        let table = series("n", vec![Value::Int(i64::MAX), Value::Int(3)]);
        let doubled = eval_all(&(col("n") * lit(2i64)), &table);
        assert_eq!(doubled[0], Value::Float(i64::MAX as f64 * 2.0));
        assert_eq!(doubled[1], Value::Int(6));
    }

    #[test]
    fn test_fill_null_and_abs() {
        let table = series("gap", vec![Value::Null, Value::Float(-3.5)]);
        let expr = col("gap").fill_null(0.0).abs();
        assert_eq!(
            eval_all(&expr, &table),
            vec![Value::Float(0.0), Value::Float(3.5)]
        );
    }

    #[test]
    fn test_comparisons_with_null_are_false() {
        let table = series("depth", vec![Value::Null, Value::Float(10.0)]);
        let shallow = col("depth").lt(lit(50.0));
        assert!(!shallow.eval(&table, 0).unwrap());
        assert!(shallow.eval(&table, 1).unwrap());
        assert!(!shallow.clone().negate().eval(&table, 1).unwrap());
        assert!(col("depth").is_null().eval(&table, 0).unwrap());
    }

    #[test]
    fn test_incompatible_comparison_is_schema_error() {
        let table = series("place", vec![Value::text("Tonga")]);
        let err = col("place").gt(lit(5.0)).eval(&table, 0).unwrap_err();
        assert_eq!(err.column(), Some("place"));
    }

    #[test]
    fn test_whole_binds_to_literal() {
        let table = series("year", vec![Value::Int(2001), Value::Int(2019), Value::Null]);
        let recent = col("year").ge(Expr::whole(Reducer::Max, col("year")) - lit(10i64));
        let bound = recent.bind(&table).unwrap();
        assert_eq!(
            bound,
            col("year").ge(lit(2019i64) - lit(10i64))
        );
        assert!(!bound.eval(&table, 0).unwrap());
        assert!(bound.eval(&table, 1).unwrap());
    }

    #[test]
    fn test_collect_columns_dedups() {
        let mut out = Vec::new();
        (col("gap").fill_null(0.0) + col("rms").fill_null(0.0))
            .gt(col("gap"))
            .collect_columns(&mut out);
        assert_eq!(out, vec!["gap".to_string(), "rms".to_string()]);
    }

    #[test]
    fn test_predicate_serde_roundtrip() {
        let p = col("depth")
            .lt(lit(70.0))
            .and(Expr::temporal(TimePart::Year).ge(lit(2000i64)));
        let json = serde_json::to_string(&p).unwrap();
        let back: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
