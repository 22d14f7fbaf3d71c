use regex::RegexBuilder;

use crate::finding::Finding;

pub const DEFAULT_WINDOW: usize = 100;
const ELLIPSIS: char = '…';

/// Find `needle` in `text` (case-insensitive, literal) and return it with up
/// to `window` characters of context either side. Truncated ends are marked
/// with an ellipsis.
pub fn locate_snippet(text: &str, needle: &str, window: usize) -> Option<String> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }

    let pattern = RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()?;
    let found = pattern.find(text)?;

    let start = if window == 0 {
        found.start()
    } else {
        text[..found.start()]
            .char_indices()
            .rev()
            .nth(window - 1)
            .map_or(0, |(i, _)| i)
    };

    let end = text[found.end()..]
        .char_indices()
        .nth(window)
        .map_or(text.len(), |(i, _)| found.end() + i);

    let mut snippet = String::new();
    if start > 0 {
        snippet.push(ELLIPSIS);
    }
    snippet.push_str(&text[start..end]);
    if end < text.len() {
        snippet.push(ELLIPSIS);
    }
    Some(snippet)
}

/// Give every finding without a snippet one located from its clause text.
pub fn attach_snippets(findings: &mut [Finding], text: &str) {
    for finding in findings.iter_mut().filter(|f| f.snippet.is_none() && !f.is_sentinel()) {
        finding.snippet = locate_snippet(text, &finding.clause, DEFAULT_WINDOW);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;

    #[test]
    fn test_whole_text_within_window() {
        let text = "The Supplier may terminate at will.";
        assert_eq!(
            locate_snippet(text, "supplier MAY terminate", 100).as_deref(),
            Some(text)
        );
    }

    #[test]
    fn test_truncation_marks() {
        let text = format!("{}Governing law is England.{}", "a".repeat(20), "b".repeat(20));
        assert_eq!(
            locate_snippet(&text, "governing law", 5).as_deref(),
            Some("…aaaaaGoverning law is E…")
        );
    }

    #[test]
    fn test_window_counts_chars_not_bytes() {
        let text = "ééééé clause ééééé";
        assert_eq!(
            locate_snippet(text, "clause", 2).as_deref(),
            Some("…é clause é…")
        );
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let text = "See clause 4.2(b) [as amended].";
        assert!(locate_snippet(text, "4.2(b) [as amended]", 10).is_some());
        assert!(locate_snippet(text, "4.2.b", 10).is_none());
    }

    #[test]
    fn test_missing_or_blank_needle() {
        assert_eq!(locate_snippet("anything", "not there", 10), None);
        assert_eq!(locate_snippet("anything", "   ", 10), None);
    }

    #[test]
    fn test_attach_only_fills_gaps() {
        let text = "1. The Tenant shall pay rent monthly. 2. Deposit is non-refundable.";
        let mut findings = vec![
            Finding::new("Rent", "The Tenant shall pay rent", "d", Severity::Low, "r"),
            Finding::new("Deposit", "Deposit", "d", Severity::High, "r").with_snippet("given"),
            Finding::new("Other", "Not in the text", "d", Severity::Low, "r"),
            Finding::no_issues(),
        ];
        attach_snippets(&mut findings, text);

        assert!(findings[0].snippet.as_deref().unwrap().contains("The Tenant shall pay rent"));
        assert_eq!(findings[1].snippet.as_deref(), Some("given"));
        assert_eq!(findings[2].snippet, None);
        assert_eq!(findings[3].snippet, None);
    }
}
