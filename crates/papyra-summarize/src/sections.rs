//! Heuristic section detection for academic papers.
//!
//! Headers are matched with an ordered rule list, case-insensitive and
//! tolerant of numeric prefixes ("1. Introduction", "IV Results"). Only the
//! first occurrence of each rule counts, so a repeated "Results" header does
//! not create a second span. Matching is inherently heuristic; a missed or
//! misattributed header is an accepted limitation, not an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Fixed section vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Introduction,
    RelatedWork,
    Methodology,
    Results,
    Discussion,
    Conclusion,
    References,
}

impl SectionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::Introduction => "introduction",
            SectionName::RelatedWork  => "related_work",
            SectionName::Methodology  => "methodology",
            SectionName::Results      => "results",
            SectionName::Discussion   => "discussion",
            SectionName::Conclusion   => "conclusion",
            SectionName::References   => "references",
        }
    }
}

/// One rule per section name; headers sit on their own line, optionally
/// preceded by a numbering like "3." or "IV".
static RULES: LazyLock<Vec<(Regex, SectionName)>> = LazyLock::new(|| {
    let rule = |pattern: &str, name: SectionName| {
        (Regex::new(pattern).expect("section rule regex"), name)
    };
    vec![
        rule(r"(?i)\n\s*(?:1\.?\s+)?introduction\s*\n", SectionName::Introduction),
        rule(r"(?i)\n\s*(?:\d+\.?\s+)?(?:related\s+work|background)\s*\n", SectionName::RelatedWork),
        rule(r"(?i)\n\s*(?:\d+\.?\s+)?(?:methodology|methods|approach)\s*\n", SectionName::Methodology),
        rule(r"(?i)\n\s*(?:\d+\.?\s+)?(?:experiments?|results|evaluation)\s*\n", SectionName::Results),
        rule(r"(?i)\n\s*(?:\d+\.?\s+)?discussion\s*\n", SectionName::Discussion),
        rule(r"(?i)\n\s*(?:\d+\.?\s+)?conclusions?\s*\n", SectionName::Conclusion),
        rule(r"(?i)\n\s*references\s*\n", SectionName::References),
    ]
});

static REFERENCES_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\n\s*references\s*\n").expect("references regex"));

/// A detected section: byte span into the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpan {
    pub name: SectionName,
    pub start: usize,
    pub end: usize,
}

/// Ordered, non-overlapping section spans. Sections whose header never
/// appears are simply absent; a document with no recognizable headers yields
/// an empty map.
#[derive(Debug, Clone, Default)]
pub struct SectionMap {
    spans: Vec<SectionSpan>,
}

impl SectionMap {
    /// Run the rule list over `text`. Each span runs from its header to the
    /// start of the next detected header, or to the end of text.
    pub fn detect(text: &str) -> Self {
        let mut positions: Vec<(usize, SectionName)> = RULES
            .iter()
            .filter_map(|(re, name)| re.find(text).map(|m| (m.start(), *name)))
            .collect();
        positions.sort_by_key(|(pos, _)| *pos);

        let spans = positions
            .iter()
            .enumerate()
            .map(|(i, &(start, name))| {
                let end = positions.get(i + 1).map(|&(next, _)| next).unwrap_or(text.len());
                SectionSpan { name, start, end }
            })
            .collect();

        Self { spans }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn spans(&self) -> &[SectionSpan] {
        &self.spans
    }

    /// Section names in document order.
    pub fn names(&self) -> Vec<SectionName> {
        self.spans.iter().map(|s| s.name).collect()
    }

    pub fn contains(&self, name: SectionName) -> bool {
        self.spans.iter().any(|s| s.name == name)
    }

    /// The trimmed text of a section, if its header was found.
    pub fn text_of<'a>(&self, text: &'a str, name: SectionName) -> Option<&'a str> {
        self.spans
            .iter()
            .find(|s| s.name == name)
            .map(|s| text[s.start..s.end].trim())
    }
}

/// Everything before the first References header. Counting and summarizing
/// the bibliography would waste most of the token budget on citations.
pub fn strip_references(text: &str) -> &str {
    match REFERENCES_SPLIT.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: &str = "\
A Study of Things

Abstract text here.

1. Introduction
We introduce the problem.

2. Related Work
Prior art is discussed.

3. Methodology
We describe our approach.

4. Results
Numbers go up.

5. Conclusion
It worked.

References
[1] Someone et al.
";

    #[test]
    fn test_detects_sections_in_order() {
        let map = SectionMap::detect(PAPER);
        assert_eq!(
            map.names(),
            vec![
                SectionName::Introduction,
                SectionName::RelatedWork,
                SectionName::Methodology,
                SectionName::Results,
                SectionName::Conclusion,
                SectionName::References,
            ]
        );
    }

    #[test]
    fn test_spans_are_contiguous_and_non_overlapping() {
        let map = SectionMap::detect(PAPER);
        let spans = map.spans();
        for pair in spans.windows(2) {
            assert!(pair[0].start < pair[1].start, "spans must be ordered by position");
            assert_eq!(pair[0].end, pair[1].start, "spans must be contiguous");
        }
        assert_eq!(spans.last().unwrap().end, PAPER.len());
    }

    #[test]
    fn test_section_text_extraction() {
        let map = SectionMap::detect(PAPER);
        let intro = map.text_of(PAPER, SectionName::Introduction).unwrap();
        assert!(intro.contains("We introduce the problem."));
        assert!(!intro.contains("Prior art"));
    }

    #[test]
    fn test_no_headers_yields_empty_map() {
        let map = SectionMap::detect("Just a plain text with no headers at all.");
        assert!(map.is_empty());
        assert_eq!(map.names(), Vec::<SectionName>::new());
    }

    #[test]
    fn test_duplicate_header_uses_first_occurrence_only() {
        let text = "\nResults\nfirst block\n\nResults\nsecond block\n";
        let map = SectionMap::detect(text);
        assert_eq!(map.len(), 1);
        let span = &map.spans()[0];
        assert_eq!(span.name, SectionName::Results);
        // Span runs to end of text, swallowing the second header
        assert_eq!(span.end, text.len());
    }

    #[test]
    fn test_numeric_prefix_and_case_tolerance() {
        let text = "\n3.  METHODS\nprotocol details\n";
        let map = SectionMap::detect(text);
        assert!(map.contains(SectionName::Methodology));
    }

    #[test]
    fn test_alternative_headings_map_to_vocabulary() {
        let text = "\nBackground\nhistory\n\nEvaluation\nbenchmarks\n";
        let map = SectionMap::detect(text);
        assert!(map.contains(SectionName::RelatedWork));
        assert!(map.contains(SectionName::Results));
    }

    #[test]
    fn test_strip_references_cuts_bibliography() {
        let stripped = strip_references(PAPER);
        assert!(stripped.contains("It worked."));
        assert!(!stripped.contains("Someone et al."));
    }

    #[test]
    fn test_strip_references_without_header_is_identity() {
        let text = "No bibliography in this one.";
        assert_eq!(strip_references(text), text);
    }
}
