//! Analytical query engine over seismic-event catalogs.
//!
//! A fixed catalog of questions (rankings, grouped aggregates, temporal
//! buckets, derived ratios, spatiotemporal proximity) runs deterministically
//! over an immutable in-memory [`RecordTable`] and returns a [`ResultTable`].
//!
//! ```rust
//! use quake_query::{QuestionId, RecordTable, loader};
//!
//! let table = loader::from_json_str(r#"[
//!     {"id": "us1", "time": "2011-03-11T05:46:24Z", "latitude": 38.3,
//!      "longitude": 142.4, "depth": 29.0, "mag": 9.1, "country": "Japan"},
//!     {"id": "us2", "time": "2011-03-11T06:15:40Z", "latitude": 36.1,
//!      "longitude": 141.3, "depth": 42.6, "mag": 7.9, "country": "Japan"}
//! ]"#)?;
//!
//! for (id, title) in quake_query::list_questions().iter().take(3) {
//!     println!("{}: {}", id, title);
//! }
//!
//! let strongest = quake_query::run("1".parse()?, &table)?;
//! assert_eq!(strongest.len(), 2);
//!
//! let per_year = quake_query::run(QuestionId::new(6), &table)?;
//! println!("{}", per_year);
//! # Ok::<(), quake_query::QueryError>(())
//! ```

pub mod builder;
pub mod catalog;
pub mod compute;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod result;
pub mod table;

pub use builder::EngineBuilder;
pub use catalog::{Catalog, Query, Question, QuestionId};
pub use config::{EngineConfig, ProximityConfig, ProximityIndex};
pub use engine::{Engine, list_questions, run};
pub use error::{QueryError, Result};
pub use result::ResultTable;
pub use table::{Column, ColumnType, EventRecord, RecordTable, Value, loader};

pub use compute::rank::{Direction, SortKey};
pub use compute::spatial::{ProximityDetector, ProximityPair};
pub use pipeline::{GroupKey, NullKeys, Pipeline};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Engine, EngineBuilder, QueryError, Result};

    pub use crate::{EventRecord, RecordTable, ResultTable, Value};

    pub use crate::{Catalog, Question, QuestionId};

    pub use crate::compute::{Aggregate, Expr, Predicate, TimePart, col, lit, pct_change};

    pub use crate::{GroupKey, Pipeline, SortKey};

    pub use crate::{EngineConfig, ProximityConfig, ProximityIndex};
}
