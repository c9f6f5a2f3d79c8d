//! Short-description extraction.

use tracing::debug;

use super::rules::{collapse_whitespace, FirstMatch, LineRule};

/// Captures shorter than this many characters (inclusive) are rejected.
const MIN_DESCRIPTION_CHARS: usize = 3;

/// Finds the ticket's short description in a body.
///
/// Patterns are tried in order and the first capture that passes the guard
/// wins; a capture that fails the guard does not block later patterns.
#[derive(Debug, Clone)]
pub struct ShortDescriptionRule {
    patterns: FirstMatch,
    sentinel_token: String,
}

impl ShortDescriptionRule {
    /// Standard patterns with the given sentinel token.
    ///
    /// An empty sentinel disables the sentinel check.
    pub fn new(sentinel_token: impl Into<String>) -> Self {
        Self {
            patterns: FirstMatch::new(vec![
                LineRule::labelled(r"Short\s+description"),
                LineRule::labelled(r"Short\s+Description"),
                LineRule::pattern(r"(?:^|\n)\s*Description[:\s]*([^\r\n]+)"),
                LineRule::pattern(r"(?:^|\n)\s*Request[:\s]*([^\r\n]+)"),
            ]),
            sentinel_token: sentinel_token.into(),
        }
    }

    /// The short description, or the empty string.
    pub fn extract(&self, body: &str) -> String {
        if body.is_empty() {
            return String::new();
        }

        self.patterns
            .candidates(body)
            .map(collapse_whitespace)
            .find(|candidate| self.accepts(candidate))
            .unwrap_or_else(|| {
                debug!("No usable short description");
                String::new()
            })
    }

    fn accepts(&self, candidate: &str) -> bool {
        if candidate.chars().count() <= MIN_DESCRIPTION_CHARS {
            return false;
        }
        self.sentinel_token.is_empty() || !candidate.starts_with(&self.sentinel_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(body: &str) -> String {
        ShortDescriptionRule::new("字段").extract(body)
    }

    #[test]
    fn test_short_description_label() {
        let body = "Number: RITM1602185\nShort description:   China Cloud   Resource Request \nPriority: 4";
        assert_eq!(extract(body), "China Cloud Resource Request");
    }

    #[test]
    fn test_line_leading_description() {
        assert_eq!(extract("Hello\n  Description: Reset MFA token\n"), "Reset MFA token");
    }

    #[test]
    fn test_line_leading_request() {
        assert_eq!(extract("Request: New laptop for intern\n"), "New laptop for intern");
    }

    #[test]
    fn test_too_short_capture_is_rejected() {
        assert_eq!(extract("Short description: abc\n"), "");
    }

    #[test]
    fn test_short_capture_does_not_block_later_pattern() {
        let body = "Short description: n/a\nDescription: Database access for BI\n";
        assert_eq!(extract(body), "Database access for BI");
    }

    #[test]
    fn test_sentinel_prefix_is_rejected() {
        assert_eq!(extract("Short description: 字段未填写\n"), "");
    }

    #[test]
    fn test_empty_sentinel_disables_check() {
        let rule = ShortDescriptionRule::new("");
        assert_eq!(rule.extract("Short description: 字段未填写\n"), "字段未填写");
    }

    #[test]
    fn test_no_match() {
        assert_eq!(extract("nothing relevant here"), "");
        assert_eq!(extract(""), "");
    }
}
