//! # Search Query Builder
//!
//! Turns raw user input into something safe to hand to the FTS5 index.
//!
//! ## How a Query Is Built
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    From Keyboard to FTS5                                │
//! │                                                                         │
//! │  User types: '  Amazing  "grace" OR '                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SearchQuery::parse()  → terms: [amazing, "grace", OR]                 │
//! │       │                  (blank input → None, no query at all)         │
//! │       ▼                                                                 │
//! │  Every term ≥ 3 chars?                                                 │
//! │       │                                                                 │
//! │       ├── YES → SearchPlan::Match                                      │
//! │       │         "amazing" AND """grace""" AND "or"                     │
//! │       │         (trigram tokenizer → substring, case-insensitive)      │
//! │       │                                                                 │
//! │       └── NO  → SearchPlan::Like                                       │
//! │                 %am% patterns with %, _ and \ escaped                  │
//! │                                                                         │
//! │  Operators (AND/OR/NOT/NEAR/*/^/:) are never interpreted.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// Shortest term the trigram index can answer on its own.
pub const TRIGRAM_MIN_TERM_LEN: usize = 3;

/// Escape character used in generated LIKE patterns.
pub const LIKE_ESCAPE: char = '\\';

/// A normalized, non-blank search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    terms: Vec<String>,
}

/// How the repository should execute a [`SearchQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPlan {
    /// A single FTS5 MATCH expression.
    Match(String),
    /// One `%term%` LIKE pattern per term, all of which must match.
    Like(Vec<String>),
}

impl SearchQuery {
    /// Normalizes raw input. Returns `None` for empty or whitespace-only input.
    ///
    /// ## Example
    /// ```rust
    /// use hymnal_core::search::SearchQuery;
    ///
    /// assert!(SearchQuery::parse("").is_none());
    /// assert!(SearchQuery::parse("   ").is_none());
    /// assert_eq!(SearchQuery::parse(" Abide  WITH ").unwrap().terms(), ["abide", "with"]);
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let terms: Vec<String> = raw.split_whitespace().map(str::to_lowercase).collect();

        if terms.is_empty() {
            None
        } else {
            Some(SearchQuery { terms })
        }
    }

    /// Lowercased terms, in input order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// The query as the user meant it, single-spaced.
    pub fn normalized(&self) -> String {
        self.terms.join(" ")
    }

    /// Picks the execution strategy for this query.
    pub fn plan(&self) -> SearchPlan {
        let all_indexable = self
            .terms
            .iter()
            .all(|t| t.chars().count() >= TRIGRAM_MIN_TERM_LEN);

        if all_indexable {
            SearchPlan::Match(self.fts5_expression())
        } else {
            SearchPlan::Like(self.terms.iter().map(|t| like_pattern(t)).collect())
        }
    }

    /// FTS5 expression: every term as a quoted phrase, joined with AND.
    pub fn fts5_expression(&self) -> String {
        self.terms
            .iter()
            .map(|t| quote_fts5_phrase(t))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Wraps a term in double quotes so FTS5 treats it as a literal phrase.
///
/// Embedded double quotes are doubled, per the FTS5 string syntax.
pub fn quote_fts5_phrase(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Builds a `%term%` pattern with LIKE metacharacters escaped by [`LIKE_ESCAPE`].
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// True when `query` passes the UI's minimum-length filter.
///
/// Not applied by the repository.
pub fn meets_min_length(query: &str) -> bool {
    query.trim().chars().count() >= crate::MIN_SEARCH_QUERY_LEN
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_queries_are_none() {
        assert!(SearchQuery::parse("").is_none());
        assert!(SearchQuery::parse("   ").is_none());
        assert!(SearchQuery::parse("\t\n").is_none());
    }

    #[test]
    fn test_long_terms_use_match() {
        let q = SearchQuery::parse("Amazing grace").unwrap();
        assert_eq!(
            q.plan(),
            SearchPlan::Match("\"amazing\" AND \"grace\"".to_string())
        );
    }

    #[test]
    fn test_operators_are_quoted() {
        let q = SearchQuery::parse("love OR NOT* NEAR(a b)").unwrap();
        assert_eq!(
            q.fts5_expression(),
            "\"love\" AND \"or\" AND \"not*\" AND \"near(a\" AND \"b)\""
        );
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        assert_eq!(quote_fts5_phrase("say \"amen\""), "\"say \"\"amen\"\"\"");
    }

    #[test]
    fn test_short_terms_fall_back_to_like() {
        let q = SearchQuery::parse("o god").unwrap();
        assert_eq!(
            q.plan(),
            SearchPlan::Like(vec!["%o%".to_string(), "%god%".to_string()])
        );
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c\\d"), "%c\\\\d%");
    }

    #[test]
    fn test_min_length_policy() {
        assert!(!meets_min_length("a"));
        assert!(!meets_min_length(" a "));
        assert!(meets_min_length("ab"));
    }
}
