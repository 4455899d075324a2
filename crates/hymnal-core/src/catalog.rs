//! # Seed Catalog Parsing
//!
//! Parses the plain-text source files the bundled database is built from.
//!
//! ## File Format
//! One file per category, named after it (`ancient_modern.txt`, `psalms.txt`, ...):
//!
//! ```text
//! # 1 Abide with me
//! Abide with me; fast falls the eventide:
//! The darkness deepens; Lord, with me abide:
//!
//! Swift to its close ebbs out life's little day;
//! Earth's joys grow dim, its glories pass away;
//!
//! # 2
//! (a hymn without a title)
//! ```
//!
//! - `# <number> [title]` starts a new hymn
//! - Blank lines inside a hymn separate verses and are preserved
//! - Leading and trailing blank lines are trimmed
//! - Lines before the first header must be blank

use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::types::{HymnCategory, NewHymn};
use crate::validation::validate_new_hymn;

/// Marker that starts a hymn header line.
const HEADER_MARKER: char = '#';

/// Parses one category file into hymns, in file order.
///
/// ## Errors
/// - [`CoreError::CatalogParse`] for a header without a number or stray
///   text before the first header
/// - [`CoreError::Validation`] when a parsed hymn fails validation
pub fn parse_catalog(category: HymnCategory, text: &str) -> CoreResult<Vec<NewHymn>> {
    let mut hymns = Vec::new();
    let mut current: Option<(usize, i64, Option<String>, Vec<&str>)> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(header) = line.trim_start().strip_prefix(HEADER_MARKER) {
            if let Some(done) = current.take() {
                hymns.push(finish(category, done)?);
            }
            let (number, title) = parse_header(header, line_no)?;
            current = Some((line_no, number, title, Vec::new()));
            continue;
        }

        match current.as_mut() {
            Some((_, _, _, lines)) => lines.push(line.trim_end()),
            None if line.trim().is_empty() => {}
            None => {
                return Err(CoreError::CatalogParse {
                    line: line_no,
                    reason: "text before the first hymn header".to_string(),
                })
            }
        }
    }

    if let Some(done) = current.take() {
        hymns.push(finish(category, done)?);
    }

    Ok(hymns)
}

/// Infers the category from a seed file name such as `psalms.txt`.
pub fn category_for_file(path: &Path) -> CoreResult<HymnCategory> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    stem.parse()
}

fn parse_header(header: &str, line: usize) -> CoreResult<(i64, Option<String>)> {
    let header = header.trim();
    let (number, title) = match header.split_once(char::is_whitespace) {
        Some((number, title)) => (number, title.trim()),
        None => (header, ""),
    };

    let number: i64 = number.parse().map_err(|_| CoreError::CatalogParse {
        line,
        reason: format!("expected a hymn number, found '{}'", number),
    })?;

    let title = if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    };

    Ok((number, title))
}

fn finish(
    category: HymnCategory,
    (line, number, title, lines): (usize, i64, Option<String>, Vec<&str>),
) -> CoreResult<NewHymn> {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());

    let content = match (start, end) {
        (Some(start), Some(end)) => collapse_blank_runs(&lines[start..=end]),
        _ => String::new(),
    };

    let hymn = NewHymn {
        number,
        title,
        category,
        content,
    };

    validate_new_hymn(&hymn).map_err(|e| CoreError::CatalogParse {
        line,
        reason: e.to_string(),
    })?;

    Ok(hymn)
}

/// Joins lines, keeping a single blank line between verses.
fn collapse_blank_runs(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut blank_run = false;

    for line in lines {
        if line.trim().is_empty() {
            blank_run = true;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        blank_run = false;
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\n# 1 Abide with me\nAbide with me; fast falls the eventide:\nThe darkness deepens;\n\n\nSwift to its close\n\n# 2\nO God, our help in ages past\n";

    #[test]
    fn test_parse_two_hymns() {
        let hymns = parse_catalog(HymnCategory::AncientModern, SAMPLE).unwrap();
        assert_eq!(hymns.len(), 2);

        assert_eq!(hymns[0].number, 1);
        assert_eq!(hymns[0].title.as_deref(), Some("Abide with me"));
        assert_eq!(
            hymns[0].content,
            "Abide with me; fast falls the eventide:\nThe darkness deepens;\n\nSwift to its close"
        );

        assert_eq!(hymns[1].number, 2);
        assert_eq!(hymns[1].title, None);
        assert_eq!(hymns[1].category, HymnCategory::AncientModern);
    }

    #[test]
    fn test_missing_number_is_an_error() {
        let err = parse_catalog(HymnCategory::Psalms, "# Psalm\ntext").unwrap_err();
        assert!(matches!(err, CoreError::CatalogParse { line: 1, .. }));
    }

    #[test]
    fn test_text_before_header_is_an_error() {
        let err = parse_catalog(HymnCategory::Psalms, "stray\n# 1\ntext").unwrap_err();
        assert!(matches!(err, CoreError::CatalogParse { line: 1, .. }));
    }

    #[test]
    fn test_empty_hymn_is_rejected() {
        let err = parse_catalog(HymnCategory::Creed, "# 1 Nicene\n\n# 2\nWe believe").unwrap_err();
        assert!(matches!(err, CoreError::CatalogParse { line: 1, .. }));
    }

    #[test]
    fn test_category_for_file() {
        assert_eq!(
            category_for_file(Path::new("seed/psalms.txt")).unwrap(),
            HymnCategory::Psalms
        );
        assert!(category_for_file(Path::new("seed/readme.md")).is_err());
    }
}
