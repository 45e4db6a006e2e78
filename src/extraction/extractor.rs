use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::ExtractorConfig;
use crate::extraction::{
    deduplicate, CooccurrenceStrategy, DependencyStrategy, ExtractionContext, PatternStrategy,
    RelationStrategy,
};
use crate::mention::EntityMention;
use crate::parse::{DependencyParser, ParsedDoc, ParserCapabilities};
use crate::relation::{ExtractionMethod, Relation};
use crate::text::TextIndex;

/// Multi-strategy relation extractor.
///
/// Construct one per configuration and pass it to callers; it holds no
/// per-call state. Parser capabilities are captured once here, so a parser
/// without dependency labels disables the dependency strategy for the
/// extractor's whole lifetime.
///
/// # Example
///
/// ```
/// use doc_entities::{EntityLabel, EntityMention, Predicate, RelationExtractor};
///
/// let text = "Barack Obama worked at Apple Inc. in New York City.";
/// let entities = vec![
///     EntityMention::new(EntityLabel::Person, "Barack Obama", 0, 12),
///     EntityMention::new(EntityLabel::Org, "Apple Inc.", 23, 33),
/// ];
///
/// let relations = RelationExtractor::new().extract_relations(text, &entities);
/// assert_eq!(relations[0].predicate, Predicate::WorksAt);
/// ```
pub struct RelationExtractor {
    config: ExtractorConfig,
    parser: Option<Arc<dyn DependencyParser>>,
    capabilities: ParserCapabilities,
    strategies: Vec<Box<dyn RelationStrategy>>,
}

impl std::fmt::Debug for RelationExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationExtractor")
            .field("config", &self.config)
            .field("parser", &self.parser.as_ref().map(|p| p.name().to_string()))
            .field("capabilities", &self.capabilities)
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.method()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RelationExtractor {
    /// Extractor without a parser, running the pattern and co-occurrence
    /// strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Extractor backed by `parser`.
    #[must_use]
    pub fn with_parser(parser: Arc<dyn DependencyParser>) -> Self {
        Self::builder().parser(parser).build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> RelationExtractorBuilder {
        RelationExtractorBuilder::default()
    }

    /// Whether the dependency strategy can run.
    #[must_use]
    pub fn supports_dependency_parse(&self) -> bool {
        self.parser.is_some() && self.capabilities.dependency_parse
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Methods of the strategies that will run, in order.
    #[must_use]
    pub fn active_methods(&self) -> Vec<ExtractionMethod> {
        self.strategies
            .iter()
            .filter(|s| !s.requires_dependency_parse() || self.supports_dependency_parse())
            .map(|s| s.method())
            .collect()
    }

    /// Extracts deduplicated relations, most confident first.
    ///
    /// Fewer than two mentions yields an empty list. Spans outside the text
    /// are tolerated.
    #[instrument(skip_all, fields(entities = entities.len(), chars = text.len()))]
    pub fn extract_relations(&self, text: &str, entities: &[EntityMention]) -> Vec<Relation> {
        if entities.len() < 2 {
            return Vec::new();
        }

        let mut sorted = entities.to_vec();
        sorted.sort_by_key(|e| (e.span_start, e.span_end));

        let index = TextIndex::new(text);
        let parsed = self.parse(text);
        let ctx = ExtractionContext {
            text: &index,
            entities: &sorted,
            parse: parsed.as_ref(),
            config: &self.config,
        };

        let mut relations = Vec::new();
        for strategy in &self.strategies {
            if strategy.requires_dependency_parse() && ctx.parse.is_none() {
                debug!(method = %strategy.method(), "skipping strategy without a dependency parse");
                continue;
            }
            relations.extend(strategy.extract(&ctx));
        }

        let found = relations.len();
        let relations = deduplicate(relations);
        debug!(found, kept = relations.len(), "relations extracted");
        relations
    }

    /// Like [`RelationExtractor::extract_relations`], for loosely typed JSON
    /// mention objects. Entries that fail to deserialize are skipped.
    pub fn extract_values(&self, text: &str, entities: &[serde_json::Value]) -> Vec<Relation> {
        let mentions: Vec<EntityMention> = entities
            .iter()
            .filter_map(|value| match serde_json::from_value(value.clone()) {
                Ok(mention) => Some(mention),
                Err(err) => {
                    debug!(error = %err, "skipping malformed entity");
                    None
                }
            })
            .collect();
        self.extract_relations(text, &mentions)
    }

    fn parse(&self, text: &str) -> Option<ParsedDoc> {
        let parser = self.parser.as_ref()?;
        if !self.capabilities.dependency_parse && !self.capabilities.sentence_boundaries {
            return None;
        }
        match parser.parse(text) {
            Ok(doc) => Some(doc),
            Err(err) => {
                warn!(parser = parser.name(), error = %err, "parse failed, continuing without it");
                None
            }
        }
    }
}

impl Default for RelationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`RelationExtractor`].
#[derive(Default)]
pub struct RelationExtractorBuilder {
    config: ExtractorConfig,
    parser: Option<Arc<dyn DependencyParser>>,
    disabled: Vec<ExtractionMethod>,
    extra: Vec<Box<dyn RelationStrategy>>,
    replace_defaults: bool,
}

impl RelationExtractorBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Injects a dependency parser.
    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn DependencyParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Drops a built-in strategy.
    #[must_use]
    pub fn without(mut self, method: ExtractionMethod) -> Self {
        self.disabled.push(method);
        self
    }

    /// Appends a strategy after the built-in ones.
    #[must_use]
    pub fn strategy(mut self, strategy: Box<dyn RelationStrategy>) -> Self {
        self.extra.push(strategy);
        self
    }

    /// Runs only the strategies added with [`RelationExtractorBuilder::strategy`].
    #[must_use]
    pub fn only_custom_strategies(mut self) -> Self {
        self.replace_defaults = true;
        self
    }

    /// Builds the extractor, probing the parser's capabilities.
    #[must_use]
    pub fn build(self) -> RelationExtractor {
        let capabilities = self
            .parser
            .as_ref()
            .map(|p| p.capabilities())
            .unwrap_or_default();

        let mut strategies: Vec<Box<dyn RelationStrategy>> = Vec::new();
        if !self.replace_defaults {
            let defaults: [Box<dyn RelationStrategy>; 3] = [
                Box::new(DependencyStrategy::new()),
                Box::new(PatternStrategy::new()),
                Box::new(CooccurrenceStrategy::new()),
            ];
            strategies.extend(
                defaults
                    .into_iter()
                    .filter(|s| !self.disabled.contains(&s.method())),
            );
        }
        strategies.extend(self.extra);

        let extractor = RelationExtractor {
            config: self.config,
            parser: self.parser,
            capabilities,
            strategies,
        };
        if !extractor.supports_dependency_parse() {
            debug!("dependency parsing unavailable; dependency strategy disabled");
        }
        extractor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::mention::EntityLabel;
    use crate::relation::Predicate;

    struct FailingParser;

    impl DependencyParser for FailingParser {
        fn name(&self) -> &str {
            "failing"
        }

        fn capabilities(&self) -> ParserCapabilities {
            ParserCapabilities {
                dependency_parse: true,
                sentence_boundaries: true,
            }
        }

        fn parse(&self, _text: &str) -> Result<ParsedDoc, ParseError> {
            Err(ParseError::Backend {
                message: "model not loaded".to_string(),
            })
        }
    }

    fn scenario() -> (&'static str, Vec<EntityMention>) {
        (
            "Barack Obama worked at Apple Inc. in New York City.",
            vec![
                EntityMention::new(EntityLabel::Person, "Barack Obama", 0, 12),
                EntityMention::new(EntityLabel::Org, "Apple Inc.", 23, 33),
                EntityMention::new(EntityLabel::Gpe, "New York City", 37, 50),
            ],
        )
    }

    #[test]
    fn test_fewer_than_two_entities() {
        let extractor = RelationExtractor::new();
        let (text, entities) = scenario();
        assert!(extractor.extract_relations(text, &[]).is_empty());
        assert!(extractor.extract_relations(text, &entities[..1]).is_empty());
    }

    #[test]
    fn test_without_parser_skips_dependency() {
        let extractor = RelationExtractor::new();
        assert!(!extractor.supports_dependency_parse());
        assert_eq!(
            extractor.active_methods(),
            vec![ExtractionMethod::PatternMatch, ExtractionMethod::Cooccurrence]
        );
    }

    #[test]
    fn test_scenario_ranks_pattern_first() {
        let (text, entities) = scenario();
        let relations = RelationExtractor::new().extract_relations(text, &entities);

        let first = &relations[0];
        assert_eq!(first.predicate, Predicate::WorksAt);
        assert_eq!(first.extraction_method, ExtractionMethod::PatternMatch);
        assert!((first.confidence - 0.8).abs() < f32::EPSILON);
        assert!(relations[1..].iter().all(|r| r.predicate == Predicate::RelatedTo));
    }

    #[test]
    fn test_parser_failure_degrades() {
        let (text, entities) = scenario();
        let extractor = RelationExtractor::with_parser(Arc::new(FailingParser));
        assert!(extractor.supports_dependency_parse());
        let relations = extractor.extract_relations(text, &entities);
        assert!(relations
            .iter()
            .all(|r| r.extraction_method != ExtractionMethod::DependencyParse));
        assert!(!relations.is_empty());
    }

    #[test]
    fn test_builder_without_method() {
        let (text, entities) = scenario();
        let extractor = RelationExtractor::builder()
            .without(ExtractionMethod::Cooccurrence)
            .build();
        let relations = extractor.extract_relations(text, &entities);
        assert_eq!(relations.len(), 1);
    }

    #[test]
    fn test_extract_values_skips_malformed() {
        let (text, entities) = scenario();
        let mut values: Vec<serde_json::Value> = entities
            .iter()
            .map(|e| serde_json::to_value(e).unwrap())
            .collect();
        values.push(serde_json::json!({"id": "nope", "label": "ORG"}));
        let relations = RelationExtractor::new().extract_values(text, &values);
        assert_eq!(relations[0].predicate, Predicate::WorksAt);
    }
}
