//! Candidate retrieval strategies.
//!
//! A [`RetrievalStrategy`] turns criteria into scored candidate documents
//! with their term matches. [`VectorStrategy`] ranks by embedding similarity
//! and [`ScanStrategy`] reads the whole collection and ranks by term
//! coverage.

use async_trait::async_trait;
use docsift_core::{DocumentRecord, Match, SearchCriteria, SearchError};
use docsift_embed::EmbeddingProvider;
use docsift_store::StoreClient;
use std::sync::Arc;
use tracing::debug;

use crate::context::TermMatcher;
use crate::executor::SearchOptions;

/// A document that may be returned, before filtering and ranking.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: DocumentRecord,
    pub score: f32,
    pub matches: Vec<Match>,
}

/// Source of candidate documents for a search.
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch candidates for `criteria`, matched with `matcher`.
    async fn candidates(
        &self,
        criteria: &SearchCriteria,
        matcher: &TermMatcher,
        limit: usize,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>, SearchError>;
}

/// Nearest-neighbour lookup on the embedded query terms.
pub struct VectorStrategy {
    embedder: Arc<EmbeddingProvider>,
    store: Arc<StoreClient>,
}

impl VectorStrategy {
    #[must_use]
    pub fn new(embedder: Arc<EmbeddingProvider>, store: Arc<StoreClient>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl RetrievalStrategy for VectorStrategy {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn candidates(
        &self,
        criteria: &SearchCriteria,
        matcher: &TermMatcher,
        limit: usize,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>, SearchError> {
        let query_text = criteria.all_terms().join(" ");
        let vector = self.embedder.embed(&query_text).await?;

        let fetch = limit.saturating_mul(2);
        let hits = self.store.search(&vector, fetch).await?;
        let total = hits.len();

        let candidates: Vec<Candidate> = hits
            .into_iter()
            .filter(|hit| hit.score >= options.similarity_floor)
            .map(|hit| {
                let matches = matcher.line_matches(&hit.record.content);
                Candidate {
                    record: hit.record,
                    score: hit.score,
                    matches,
                }
            })
            .collect();

        debug!(
            "Vector lookup returned {} hits, {} above floor {}",
            total,
            candidates.len(),
            options.similarity_floor
        );
        Ok(candidates)
    }
}

/// Full scan of the collection with regex matching.
///
/// Score is the share of distinct criteria terms found in the document.
pub struct ScanStrategy {
    store: Arc<StoreClient>,
}

impl ScanStrategy {
    #[must_use]
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RetrievalStrategy for ScanStrategy {
    fn name(&self) -> &'static str {
        "scan"
    }

    async fn candidates(
        &self,
        _criteria: &SearchCriteria,
        matcher: &TermMatcher,
        _limit: usize,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>, SearchError> {
        let term_count = matcher.term_count().max(1) as f32;
        let page_size = options.scan_page_size.max(1);

        let mut candidates = Vec::new();
        let mut scanned = 0usize;
        let mut offset = None;
        loop {
            let page = self.store.scroll(page_size, offset).await?;
            scanned += page.records.len();

            for record in page.records {
                let matches = matcher.window_matches(&record.content, options.scan_window);
                if matches.is_empty() {
                    continue;
                }
                let score = TermMatcher::distinct_terms(&matches) as f32 / term_count;
                candidates.push(Candidate {
                    record,
                    score,
                    matches,
                });
            }

            match page.next_offset {
                Some(next) if Some(next) != offset => offset = Some(next),
                _ => break,
            }
        }

        debug!("Scanned {} records, {} matched", scanned, candidates.len());
        Ok(candidates)
    }
}
