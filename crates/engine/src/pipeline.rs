//! One run: allocate, enumerate, score, select.
//!
//! Budget policy is checked before anything else, so a bad percentage map
//! fails the run before a single item is scored. Everything after that
//! degrades into warnings on the result.

use crate::allocator::{TokenBudget, allocate};
use crate::compressor::ContentCompressor;
use crate::item::SelectionResult;
use crate::scorer::{CandidateSet, PriorityScorer};
use crate::selector::ContentSelector;
use crate::serializer::{SelectionDocument, serialize};
use crate::token::TokenCounter;
use chrono::{DateTime, Utc};
use docpack_config::{AppConfig, BudgetAllocation, SelectionStrategy};
use docpack_core::{ConfigurationError, FactsIndex, ProjectFacts};
use std::sync::Arc;

pub struct Pipeline {
    total_budget: usize,
    allocation: BudgetAllocation,
    strategy: SelectionStrategy,
    compression: bool,
    threads: usize,
    scorer: PriorityScorer,
    compressor: ContentCompressor,
}

impl Pipeline {
    /// Build from configuration, loading the exact tokenizer when one is
    /// configured. A tokenizer that fails to load is logged and skipped.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_counter(config, build_counter(config))
    }

    /// Build around an explicit counter.
    pub fn with_counter(config: &AppConfig, counter: TokenCounter) -> Self {
        let counter = Arc::new(counter);
        Self {
            total_budget: config.total_budget,
            allocation: config.allocation.clone(),
            strategy: config.selection.strategy,
            compression: config.selection.compression,
            threads: config.tokenizer.threads,
            scorer: PriorityScorer::new(config.scoring.clone(), counter.clone()),
            compressor: ContentCompressor::new(counter),
        }
    }

    pub fn counter(&self) -> &TokenCounter {
        self.scorer.counter()
    }

    pub fn compressor(&self) -> &ContentCompressor {
        &self.compressor
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// The budget this pipeline would select against.
    pub fn budget(&self) -> Result<TokenBudget, ConfigurationError> {
        allocate(self.total_budget, &self.allocation)
    }

    pub fn run(&self, facts: &ProjectFacts) -> docpack_core::Result<SelectionResult> {
        let budget = self.budget()?;

        let mut warnings = Vec::new();
        for issue in facts.validate() {
            tracing::warn!("{issue}");
            warnings.push(issue);
        }

        let index = FactsIndex::new(facts);
        let set = CandidateSet::enumerate(facts, &index);

        let scored = self.scorer.score_all(&set.candidates, self.threads);

        let mut selector = ContentSelector::new(self.strategy);
        if self.compression {
            selector = selector.with_compressor(&self.compressor);
        }
        let mut result = selector.select(scored, &budget);

        warnings.append(&mut result.warnings);
        result.warnings = warnings;

        let summary = facts.summary();
        tracing::info!(
            project = %facts.metadata.name,
            modules = summary.modules,
            classes = summary.classes,
            functions = summary.functions,
            methods = summary.methods,
            examples = summary.examples,
            candidates = set.len(),
            selected = result.selected.len(),
            dropped = result.dropped.len(),
            used = result.total_used(),
            budget = budget.total_budget(),
            strategy = %self.strategy,
            "Selection complete"
        );
        Ok(result)
    }

    /// Run and convert to the output document, stamping it when asked.
    pub fn run_document(
        &self,
        facts: &ProjectFacts,
        timestamp: Option<DateTime<Utc>>,
    ) -> docpack_core::Result<SelectionDocument> {
        let document = serialize(&self.run(facts)?);
        Ok(match timestamp {
            Some(at) => document.with_timestamp(at),
            None => document,
        })
    }
}

#[cfg(feature = "hf-tokenizer")]
fn build_counter(config: &AppConfig) -> TokenCounter {
    use crate::token::HfTokenizer;

    match &config.tokenizer.path {
        Some(path) => match HfTokenizer::from_file(path) {
            Ok(tokenizer) => {
                tracing::info!(path = %path.display(), "Loaded exact tokenizer");
                TokenCounter::with_tokenizer(Box::new(tokenizer))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Tokenizer unavailable, using heuristic counts");
                TokenCounter::new()
            }
        },
        None => TokenCounter::new(),
    }
}

#[cfg(not(feature = "hf-tokenizer"))]
fn build_counter(config: &AppConfig) -> TokenCounter {
    if let Some(path) = &config.tokenizer.path {
        tracing::warn!(
            path = %path.display(),
            "Built without the hf-tokenizer feature, using heuristic counts"
        );
    }
    TokenCounter::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpack_core::{Category, Class, Function, Module, ProjectMetadata, Structure};

    fn facts() -> ProjectFacts {
        ProjectFacts {
            metadata: ProjectMetadata {
                name: "demo".into(),
                ..Default::default()
            },
            structure: Structure {
                modules: vec![Module {
                    name: "demo".into(),
                    classes: vec![Class {
                        name: "Widget".into(),
                        methods: vec![Function {
                            name: "".into(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn bad_percentages_fail_before_scoring() {
        let mut config = AppConfig::default();
        config.allocation.buffer = 0.5;
        let pipeline = Pipeline::from_config(&config);
        let err = pipeline.run(&facts()).unwrap_err();
        assert!(matches!(
            err,
            docpack_core::Error::Configuration(ConfigurationError::PercentagesDoNotSum { .. })
        ));
        assert_eq!(pipeline.counter().cache_len(), 0);
    }

    #[test]
    fn facts_issues_become_warnings() {
        let pipeline = Pipeline::from_config(&AppConfig::default());
        let result = pipeline.run(&facts()).unwrap();
        assert!(result.warnings[0].contains("method #0 of class 'Widget'"));
        assert_eq!(
            result
                .warnings
                .iter()
                .filter(|w| w.contains("empty name"))
                .count(),
            1
        );
        assert!(result.selected.iter().any(|i| i.item_id() == "class:demo:Widget"));
    }

    #[test]
    fn result_carries_its_budget() {
        let pipeline = Pipeline::from_config(&AppConfig::default());
        let result = pipeline.run(&facts()).unwrap();
        assert_eq!(result.budget.total_budget(), 100_000);
        for category in Category::ALL {
            assert!(result.usage[&category] <= result.budget.sub_budget(category));
        }
    }

    #[test]
    fn missing_tokenizer_falls_back() {
        let mut config = AppConfig::default();
        config.tokenizer.path = Some("/nonexistent/tokenizer.json".into());
        let pipeline = Pipeline::from_config(&config);
        assert!(pipeline.counter().tokenizer_name().is_none());
        assert!(pipeline.run(&facts()).is_ok());
    }

    #[test]
    fn document_is_stamped_only_on_request() {
        let pipeline = Pipeline::from_config(&AppConfig::default());
        assert!(pipeline.run_document(&facts(), None).unwrap().generated_at.is_none());
        let at = Utc::now();
        assert_eq!(
            pipeline.run_document(&facts(), Some(at)).unwrap().generated_at,
            Some(at)
        );
    }
}
