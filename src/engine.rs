//! Question execution.

use crate::builder::EngineBuilder;
use crate::catalog::{Catalog, Query, QuestionId};
use crate::compute::spatial::ProximityDetector;
use crate::config::EngineConfig;
use crate::error::{QueryError, Result};
use crate::result::ResultTable;
use crate::table::RecordTable;
use once_cell::sync::Lazy;

static DEFAULT_ENGINE: Lazy<Engine> = Lazy::new(Engine::default);

/// Runs catalog questions against record tables.
///
/// The engine holds no state between runs; one engine (or the crate-level
/// [`run`]) can serve any number of tables and callers concurrently.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Catalog,
    config: EngineConfig,
}

impl Engine {
    pub fn new(catalog: Catalog, config: EngineConfig) -> Result<Self> {
        config.validate().map_err(QueryError::InvalidInput)?;
        Ok(Self { catalog, config })
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Answer question `id` over `table`.
    pub fn run(&self, id: QuestionId, table: &RecordTable) -> Result<ResultTable> {
        let question = self.catalog.get(id)?;
        if let Some(max) = self.config.max_table_rows
            && table.len() > max
        {
            return Err(QueryError::InvalidInput(format!(
                "table has {} rows, configured limit is {}",
                table.len(),
                max
            )));
        }

        let result = match &question.query {
            Query::Pipeline(pipeline) => pipeline.execute(table),
            Query::Proximity(config) => {
                ProximityDetector::new(self.config.proximity.unwrap_or(*config))?
                    .detect_table(table)
            }
        }?;

        log::debug!(
            "{} ({}): {} rows -> {} rows",
            id,
            question.title,
            table.len(),
            result.len()
        );
        Ok(result)
    }

    /// Like [`Engine::run`], with the id given as text (`"7"`, `"q7"`).
    pub fn run_named(&self, id: &str, table: &RecordTable) -> Result<ResultTable> {
        self.run(id.parse()?, table)
    }

    /// `(id, title)` pairs in catalog order.
    pub fn list_questions(&self) -> Vec<(QuestionId, String)> {
        self.catalog
            .list()
            .into_iter()
            .map(|(id, title)| (id, title.to_string()))
            .collect()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            catalog: Catalog::builtin().clone(),
            config: EngineConfig::default(),
        }
    }
}

/// Answer a built-in question with the default configuration.
///
/// ```
/// use quake_query::{EventRecord, QuestionId, RecordTable, Value};
///
/// let table = RecordTable::from_events(vec![
///     EventRecord::new("us1").mag(7.1).place("Off Honshu"),
///     EventRecord::new("us2").mag(8.2).place("Near Coast of Chile"),
/// ])?;
/// let strongest = quake_query::run(QuestionId::new(1), &table)?;
/// assert_eq!(strongest.get(0, "id"), Some(&Value::text("us2")));
/// # Ok::<(), quake_query::QueryError>(())
/// ```
pub fn run(id: QuestionId, table: &RecordTable) -> Result<ResultTable> {
    DEFAULT_ENGINE.run(id, table)
}

/// The built-in questions, in order.
pub fn list_questions() -> Vec<(QuestionId, String)> {
    DEFAULT_ENGINE.list_questions()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProximityConfig;
    use crate::table::{EventRecord, Value};

    fn table() -> RecordTable {
        RecordTable::from_events(vec![
            EventRecord::new("a").at("2020-01-01 00:00:00").location(10.0, 20.0).mag(5.0).depth(10.0),
            EventRecord::new("b").at("2020-01-01 00:20:00").location(10.3, 20.0).mag(5.5).depth(12.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_list_questions() {
        let questions = list_questions();
        assert_eq!(questions.len(), 30);
        assert_eq!(questions[0].0, QuestionId::new(1));
        assert_eq!(questions[28].1, "Consecutive EQ within 50 km & 1 hour");
    }

    #[test]
    fn test_unknown_question() {
        let err = run(QuestionId::new(99), &table()).unwrap_err();
        assert!(matches!(err, QueryError::UnknownQuestion(ref id) if id == "Q99"));

        let err = Engine::default().run_named("first", &table()).unwrap_err();
        assert!(matches!(err, QueryError::UnknownQuestion(ref id) if id == "first"));
    }

    #[test]
    fn test_row_limit() {
        let engine = Engine::builder().max_table_rows(1).build().unwrap();
        assert!(matches!(
            engine.run(QuestionId::new(1), &table()),
            Err(QueryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_question_reported_before_row_limit() {
        let engine = Engine::builder().max_table_rows(1).build().unwrap();
        assert!(matches!(
            engine.run(QuestionId::new(42), &table()),
            Err(QueryError::UnknownQuestion(ref id)) if id == "Q42"
        ));
    }

    #[test]
    fn test_proximity_override() {
        // The two events are about 33 km apart.
        let default = run(QuestionId::new(29), &table()).unwrap();
        assert_eq!(default.len(), 1);

        let strict = Engine::builder()
            .proximity(ProximityConfig::default().with_max_distance_km(10.0))
            .build()
            .unwrap();
        assert!(strict.run(QuestionId::new(29), &table()).unwrap().is_empty());
    }

    #[test]
    fn test_run_named() {
        let result = Engine::default().run_named("q01", &table()).unwrap();
        assert_eq!(result.get(0, "mag"), Some(&Value::Float(5.5)));
    }
}
