//! Engine builder for flexible configuration
//!
//! Assembles an [`Engine`] from a catalog and settings. Without further
//! calls the built-in catalog and the default configuration are used.

use crate::catalog::{Catalog, Question};
use crate::config::{EngineConfig, ProximityConfig};
use crate::engine::Engine;
use crate::error::Result;

/// Builder for engine configuration with a custom catalog and settings.
#[derive(Debug, Default)]
pub struct EngineBuilder {
    catalog: Option<Catalog>,
    extra: Vec<Question>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Create a new builder with the built-in catalog and default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the built-in catalog.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Register an additional question on top of the catalog.
    pub fn question(mut self, question: Question) -> Self {
        self.extra.push(question);
        self
    }

    /// Set the engine configuration (proximity override, table bound).
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the proximity thresholds of every proximity question.
    pub fn proximity(mut self, proximity: ProximityConfig) -> Self {
        self.config = self.config.with_proximity(proximity);
        self
    }

    /// Reject tables with more than `rows` rows.
    pub fn max_table_rows(mut self, rows: usize) -> Self {
        self.config = self.config.with_max_table_rows(rows);
        self
    }

    /// Build the engine. Fails on an invalid configuration or a clashing
    /// question.
    pub fn build(self) -> Result<Engine> {
        let mut catalog = self
            .catalog
            .unwrap_or_else(|| Catalog::builtin().clone());

        for question in self.extra {
            catalog = catalog.with_question(question)?;
        }

        Engine::new(catalog, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Query, QuestionId};
    use crate::compute::aggregate::Aggregate;
    use crate::config::ProximityIndex;
    use crate::error::QueryError;
    use crate::pipeline::{GroupKey, Pipeline};

    #[test]
    fn test_builder_default() {
        let engine = EngineBuilder::new().build().unwrap();
        assert_eq!(engine.catalog().len(), 30);
        assert!(engine.config().proximity.is_none());
    }

    #[test]
    fn test_builder_with_config() {
        let config = EngineConfig::default().with_proximity(
            ProximityConfig::default()
                .with_max_gap_minutes(30.0)
                .with_index(ProximityIndex::LinearWindow),
        );
        let engine = EngineBuilder::new().config(config.clone()).build().unwrap();
        assert_eq!(engine.config(), &config);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = EngineBuilder::new()
            .proximity(ProximityConfig::default().with_max_distance_km(-3.0))
            .build();
        assert!(matches!(result, Err(QueryError::InvalidInput(_))));
    }

    #[test]
    fn test_builder_extra_question() {
        let question = Question::new(
            QuestionId::new(31),
            "Events per continent",
            Query::Pipeline(
                Pipeline::new()
                    .group_by(GroupKey::column("continent"))
                    .aggregate(Aggregate::count("total")),
            ),
        );
        let engine = EngineBuilder::new().question(question).build().unwrap();
        assert_eq!(engine.list_questions().len(), 31);
    }

    #[test]
    fn test_builder_custom_catalog() {
        let catalog = Catalog::new(vec![]).unwrap();
        let engine = EngineBuilder::new().catalog(catalog).build().unwrap();
        assert!(engine.list_questions().is_empty());
    }
}
