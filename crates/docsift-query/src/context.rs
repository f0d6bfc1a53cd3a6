//! Term matching, snippet assembly and highlighting.

use docsift_core::{ContextBlock, Match, MatchLocation, SearchCriteria};
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeSet, HashSet};
use tracing::warn;

/// Honorifics tried in front of name-like terms.
const NAME_PREFIXES: [&str; 3] = ["Dr. ", "Dr ", "Doctor "];

/// Surface forms a term may take in a document.
///
/// Name-like terms also match with a doctor honorific in front.
#[must_use]
pub fn term_variants(term: &str, name_like: bool) -> Vec<String> {
    let mut variants = vec![term.to_string()];
    if name_like {
        variants.extend(NAME_PREFIXES.iter().map(|prefix| format!("{prefix}{term}")));
    }
    variants
}

/// How snippets are assembled into a [`ContextBlock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetStyle {
    pub max_snippets: usize,
    pub separator: String,
    /// Placed on both sides of every highlighted occurrence
    pub marker: String,
}

impl Default for SnippetStyle {
    fn default() -> Self {
        Self {
            max_snippets: 3,
            separator: "\n[...]\n".to_string(),
            marker: "**".to_string(),
        }
    }
}

struct CompiledTerm {
    term: String,
    regex: Regex,
}

/// Case-insensitive matcher for every term of a [`SearchCriteria`].
///
/// Built once per search and shared across candidate documents.
pub struct TermMatcher {
    terms: Vec<CompiledTerm>,
    highlighter: Option<Regex>,
}

impl TermMatcher {
    #[must_use]
    pub fn new(criteria: &SearchCriteria) -> Self {
        let mut terms = Vec::new();
        let mut all_variants = Vec::new();

        for term in criteria.all_terms() {
            let variants = term_variants(term, criteria.is_name_term(term));
            match build_alternation(&variants) {
                Ok(regex) => {
                    terms.push(CompiledTerm {
                        term: term.to_string(),
                        regex,
                    });
                    all_variants.extend(variants);
                }
                Err(e) => warn!("Skipping term {:?}: {}", term, e),
            }
        }

        let highlighter = if all_variants.is_empty() {
            None
        } else {
            build_alternation(&all_variants)
                .map_err(|e| warn!("Highlighting disabled: {}", e))
                .ok()
        };

        Self { terms, highlighter }
    }

    /// Number of terms that compiled.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Line-based matches. Each hit carries the line before and after it.
    #[must_use]
    pub fn line_matches(&self, content: &str) -> Vec<Match> {
        let lines: Vec<&str> = content.lines().collect();
        let mut matches = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            for compiled in &self.terms {
                if compiled.regex.is_match(line) {
                    let start = idx.saturating_sub(1);
                    let end = (idx + 2).min(lines.len());
                    matches.push(Match {
                        term: compiled.term.clone(),
                        location: MatchLocation::Line(idx),
                        context: lines[start..end].join("\n"),
                    });
                }
            }
        }
        matches
    }

    /// Offset-based matches with `window` bytes of context on each side,
    /// widened to the nearest char boundaries.
    #[must_use]
    pub fn window_matches(&self, content: &str, window: usize) -> Vec<Match> {
        let mut matches = Vec::new();

        for compiled in &self.terms {
            for hit in compiled.regex.find_iter(content) {
                let start = floor_char_boundary(content, hit.start().saturating_sub(window));
                let end = ceil_char_boundary(content, hit.end().saturating_add(window));
                matches.push(Match {
                    term: compiled.term.clone(),
                    location: MatchLocation::Offset(hit.start()),
                    context: content[start..end].trim().to_string(),
                });
            }
        }
        matches.sort_by_key(|m| m.location);
        matches
    }

    /// Number of distinct terms that have at least one match.
    #[must_use]
    pub fn distinct_terms(matches: &[Match]) -> usize {
        matches
            .iter()
            .map(|m| m.term.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Whether every term appears in `matches`.
    #[must_use]
    pub fn covers_all(&self, matches: &[Match]) -> bool {
        Self::distinct_terms(matches) == self.terms.len()
    }

    /// Wrap every occurrence of any term variant in `marker`.
    ///
    /// One pass over the text with the longest variants tried first, so an
    /// occurrence is wrapped once and markers never nest.
    #[must_use]
    pub fn highlight(&self, text: &str, marker: &str) -> String {
        match &self.highlighter {
            Some(regex) => regex
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    format!("{marker}{}{marker}", &caps[0])
                })
                .into_owned(),
            None => text.to_string(),
        }
    }

    /// Assemble matches into a highlighted block.
    ///
    /// Matches are taken in position order, identical snippets are kept
    /// once and at most `style.max_snippets` survive.
    #[must_use]
    pub fn build_context(&self, mut matches: Vec<Match>, style: &SnippetStyle) -> ContextBlock {
        matches.sort_by_key(|m| m.location);

        let highlights: BTreeSet<String> = matches.iter().map(|m| m.term.clone()).collect();

        let mut seen = HashSet::new();
        let snippets: Vec<String> = matches
            .iter()
            .map(|m| m.context.as_str())
            .filter(|snippet| !snippet.is_empty() && seen.insert(*snippet))
            .take(style.max_snippets)
            .map(|snippet| self.highlight(snippet, &style.marker))
            .collect();

        ContextBlock {
            text: snippets.join(&style.separator),
            highlights,
        }
    }
}

/// Case-insensitive alternation of escaped literals, longest first.
fn build_alternation(variants: &[String]) -> Result<Regex, regex::Error> {
    let mut ordered: Vec<&String> = variants.iter().collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    ordered.dedup();

    let pattern = ordered
        .iter()
        .map(|v| regex::escape(v))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_core::TermBucket;

    fn criteria(names: &[&str], keywords: &[&str]) -> SearchCriteria {
        let mut criteria = SearchCriteria::new(false);
        for name in names {
            criteria.push(TermBucket::Names, name);
        }
        for keyword in keywords {
            criteria.push(TermBucket::Keywords, keyword);
        }
        criteria
    }

    // ========== Variant Tests ==========

    #[test]
    fn test_term_variants() {
        assert_eq!(term_variants("neuro", false), vec!["neuro"]);
        assert_eq!(
            term_variants("Smith", true),
            vec!["Smith", "Dr. Smith", "Dr Smith", "Doctor Smith"]
        );
    }

    // ========== Line Match Tests ==========

    #[test]
    fn test_line_matches_carry_neighbours() {
        let matcher = TermMatcher::new(&criteria(&[], &["neuro"]));
        let content = "intro\nSeen by NEUROLOGY team\noutro\nlast";
        let matches = matcher.line_matches(content);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].location, MatchLocation::Line(1));
        assert_eq!(matches[0].context, "intro\nSeen by NEUROLOGY team\noutro");
    }

    #[test]
    fn test_line_matches_at_edges() {
        let matcher = TermMatcher::new(&criteria(&[], &["x"]));
        let matches = matcher.line_matches("x first\nmiddle\nlast x");

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].context, "x first\nmiddle");
        assert_eq!(matches[1].context, "middle\nlast x");
    }

    #[test]
    fn test_name_matches_honorific_forms() {
        let matcher = TermMatcher::new(&criteria(&["zaid"], &[]));
        let matches = matcher.line_matches("Referred by Doctor Zaid\nnothing here");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].term, "zaid");
    }

    // ========== Window Match Tests ==========

    #[test]
    fn test_window_matches_clamp_to_char_boundaries() {
        let matcher = TermMatcher::new(&criteria(&[], &["target"]));
        let content = "ééééé target ééééé";
        let matches = matcher.window_matches(content, 3);

        assert_eq!(matches.len(), 1);
        assert!(matches[0].context.contains("target"));
        assert!(matches[0].context.starts_with('é'));
        assert!(matches[0].context.ends_with('é'));
    }

    #[test]
    fn test_window_matches_ordered_by_offset() {
        let matcher = TermMatcher::new(&criteria(&[], &["b", "a"]));
        let matches = matcher.window_matches("a then b then a", 2);
        let offsets: Vec<_> = matches.iter().map(|m| m.location).collect();
        assert_eq!(
            offsets,
            vec![
                MatchLocation::Offset(0),
                MatchLocation::Offset(7),
                MatchLocation::Offset(14),
            ]
        );
    }

    #[test]
    fn test_covers_all() {
        let matcher = TermMatcher::new(&criteria(&["smith"], &["budget"]));
        let partial = matcher.line_matches("budget only");
        let full = matcher.line_matches("budget approved by Dr. Smith");
        assert!(!matcher.covers_all(&partial));
        assert!(matcher.covers_all(&full));
        assert_eq!(TermMatcher::distinct_terms(&full), 2);
    }

    // ========== Highlight Tests ==========

    #[test]
    fn test_highlight_is_case_insensitive_and_preserves_case() {
        let matcher = TermMatcher::new(&criteria(&[], &["neuro"]));
        assert_eq!(
            matcher.highlight("Neurology and NEURO", "**"),
            "**Neuro**logy and **NEURO**"
        );
    }

    #[test]
    fn test_highlight_prefers_longest_variant() {
        let matcher = TermMatcher::new(&criteria(&["Smith"], &[]));
        let highlighted = matcher.highlight("seen by Dr. Smith and Smith", "**");
        assert_eq!(highlighted, "seen by **Dr. Smith** and **Smith**");
        assert!(!highlighted.contains("****"));
    }

    #[test]
    fn test_highlight_overlapping_terms_never_nest() {
        let matcher = TermMatcher::new(&criteria(&[], &["card", "cardiology"]));
        assert_eq!(
            matcher.highlight("cardiology card", "**"),
            "**cardiology** **card**"
        );
    }

    #[test]
    fn test_highlight_without_terms_is_identity() {
        let matcher = TermMatcher::new(&SearchCriteria::new(false));
        assert!(matcher.is_empty());
        assert_eq!(matcher.highlight("text", "**"), "text");
    }

    // ========== Context Block Tests ==========

    #[test]
    fn test_build_context_dedupes_and_caps() {
        let matcher = TermMatcher::new(&criteria(&[], &["a", "b"]));
        let content = "a b\nx\na\ny\nb\nz\na\nw";
        let block = matcher.build_context(matcher.line_matches(content), &SnippetStyle::default());

        let snippets: Vec<&str> = block.text.split("\n[...]\n").collect();
        assert_eq!(snippets.len(), 3);
        assert_eq!(snippets[0], "**a** **b**\nx");
        assert_eq!(
            block.highlights,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_build_context_custom_style() {
        let matcher = TermMatcher::new(&criteria(&[], &["term"]));
        let style = SnippetStyle {
            max_snippets: 1,
            separator: " | ".to_string(),
            marker: "__".to_string(),
        };
        let block = matcher.build_context(matcher.line_matches("term\nfoo\nbar\nterm"), &style);
        assert_eq!(block.text, "__term__\nfoo");
    }

    #[test]
    fn test_build_context_empty() {
        let matcher = TermMatcher::new(&criteria(&[], &["a"]));
        let block = matcher.build_context(Vec::new(), &SnippetStyle::default());
        assert!(block.is_empty());
        assert!(block.highlights.is_empty());
    }
}
