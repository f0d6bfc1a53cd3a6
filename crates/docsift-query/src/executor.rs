//! Search execution.

use docsift_core::{SearchCriteria, SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::{SnippetStyle, TermMatcher};
use crate::interpreter::QueryInterpreter;
use crate::strategy::RetrievalStrategy;

/// Result count used by [`SearchEngine::search_default`].
pub const DEFAULT_LIMIT: usize = 5;

/// Tunables for retrieval and snippet assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Vector hits scoring below this are dropped
    pub similarity_floor: f32,
    pub max_snippets: usize,
    /// Bytes of context on each side of a hit in scan mode
    pub scan_window: usize,
    pub scan_page_size: usize,
    pub highlight_marker: String,
    pub snippet_separator: String,
}

impl SearchOptions {
    #[must_use]
    pub fn snippet_style(&self) -> SnippetStyle {
        SnippetStyle {
            max_snippets: self.max_snippets,
            separator: self.snippet_separator.clone(),
            marker: self.highlight_marker.clone(),
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        let style = SnippetStyle::default();
        Self {
            similarity_floor: 0.3,
            max_snippets: style.max_snippets,
            scan_window: 50,
            scan_page_size: 100,
            highlight_marker: style.marker,
            snippet_separator: style.separator,
        }
    }
}

/// Answers natural-language queries with ranked, highlighted results.
pub struct SearchEngine {
    interpreter: QueryInterpreter,
    strategy: Arc<dyn RetrievalStrategy>,
    options: SearchOptions,
}

impl SearchEngine {
    /// Create a new search engine.
    #[must_use]
    pub fn new(interpreter: QueryInterpreter, strategy: Arc<dyn RetrievalStrategy>) -> Self {
        Self {
            interpreter,
            strategy,
            options: SearchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Search with [`DEFAULT_LIMIT`].
    ///
    /// # Errors
    ///
    /// See [`SearchEngine::search`].
    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.search(query, DEFAULT_LIMIT).await
    }

    /// Interpret `query` and return at most `limit` results, best first.
    ///
    /// # Errors
    ///
    /// Embedding or store failures. Interpretation problems fall back to a
    /// raw-query search and never surface.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        debug!("Executing query: {}", query);
        let criteria = self.interpreter.interpret(query).await;
        self.search_criteria(&criteria, limit).await
    }

    /// Run a search for already-interpreted criteria.
    ///
    /// # Errors
    ///
    /// Embedding or store failures.
    pub async fn search_criteria(
        &self,
        criteria: &SearchCriteria,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if criteria.is_empty() || limit == 0 {
            debug!("Nothing to search for");
            return Ok(Vec::new());
        }

        let matcher = TermMatcher::new(criteria);
        if matcher.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .strategy
            .candidates(criteria, &matcher, limit, &self.options)
            .await?;
        let style = self.options.snippet_style();

        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter(|c| !c.matches.is_empty())
            .filter(|c| !criteria.require_all || matcher.covers_all(&c.matches))
            .map(|c| SearchResult {
                directory: c.record.directory(),
                filename: c.record.filename,
                path: c.record.path,
                score: c.score,
                context: matcher.build_context(c.matches, &style),
            })
            .collect();

        // Stable, so equal scores keep retrieval order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);

        info!(
            "Search ({}) for {} terms returned {} results",
            self.strategy.name(),
            matcher.term_count(),
            results.len()
        );
        Ok(results)
    }
}
