//! RFC 5322 header block parsing: folding and case-insensitive lookup.
//!
//! Values are kept raw (no RFC 2047 decoding) so that dedup keys and
//! removal matching compare exactly what the mailbox stores.

/// The unfolded header block of one message.
#[derive(Debug, Clone, Default)]
pub struct HeaderBlock {
    /// `(lowercase_name, raw_value)` pairs in file order.
    headers: Vec<(String, String)>,
}

impl HeaderBlock {
    /// Parse the header section of a raw message (everything before the first blank line).
    pub fn parse(raw_message: &str) -> Self {
        Self {
            headers: unfold_headers(header_section(raw_message)),
        }
    }

    /// First value for `name` (case-insensitive), if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First value for `name`, or the empty string.
    pub fn get_or_empty(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }
}

/// Slice of `text` up to (not including) the first blank line.
fn header_section(text: &str) -> &str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            return &text[..offset];
        }
        offset += line.len();
    }
    text
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation line
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let block = HeaderBlock::parse("Message-ID: <a@b>\nSUBJECT: Hi\n\nbody: not a header\n");
        assert_eq!(block.get("message-id"), Some("<a@b>"));
        assert_eq!(block.get("Subject"), Some("Hi"));
        assert_eq!(block.get("body"), None);
        assert_eq!(block.get_or_empty("reply-to"), "");
    }

    #[test]
    fn test_folded_header_is_joined() {
        let block = HeaderBlock::parse("Subject: RITM1603887 | Approval Required\n\t/ Approbation Requise\nFrom: x\n");
        assert_eq!(
            block.get("subject"),
            Some("RITM1603887 | Approval Required / Approbation Requise")
        );
    }

    #[test]
    fn test_first_occurrence_wins() {
        let block = HeaderBlock::parse("Received: one\nReceived: two\n");
        assert_eq!(block.get("received"), Some("one"));
    }

    #[test]
    fn test_crlf_header_section() {
        let block = HeaderBlock::parse("From: a@b\r\nSubject: S\r\n\r\nTo: not-a-header\r\n");
        assert_eq!(block.get("subject"), Some("S"));
        assert_eq!(block.get("to"), None);
    }
}
