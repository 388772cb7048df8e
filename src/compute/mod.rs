//! Compute layer: the building blocks every query is assembled from.
//!
//! This module separates evaluation logic from the tables it runs over.
//! It provides:
//! - Expressions and predicates over rows ([`expr`])
//! - Temporal key extraction ([`temporal`])
//! - Aggregate reducers ([`aggregate`])
//! - Deterministic ordering and top-k ([`rank`])
//! - Great-circle distance and proximity detection ([`spatial`])

pub mod aggregate;
pub mod expr;
pub mod rank;
pub mod spatial;
pub mod temporal;
pub mod validation;

pub use aggregate::{Aggregate, Reducer};
pub use expr::{CmpOp, Expr, Predicate, RowSource, col, lit, pct_change};
pub use rank::{Direction, SortKey};
pub use temporal::TimePart;
