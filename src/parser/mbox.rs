//! Mailbox splitter for the Thunderbird mbox dialect.
//!
//! Thunderbird prefixes every message with client status pseudo-headers
//! (`X-Mozilla-Status`, `X-Mozilla-Keys`, …) and does not always leave a
//! blank line before the `From ` separator. The splitter therefore keys on
//! two things per candidate message: whether it is still inside the vendor
//! preamble, and whether a real RFC 5322 header has been seen yet. Only
//! candidates that reached a real header are emitted.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ApproveError, Result};

/// Header prefixes that end the vendor preamble and mark a real message.
const STANDARD_HEADERS: [&str; 5] = ["Received:", "From:", "To:", "Subject:", "Date:"];

/// Tunables for [`MboxSplitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitterOptions {
    /// Line prefixes of vendor pseudo-headers skipped while in the preamble.
    pub vendor_markers: Vec<String>,
}

impl Default for SplitterOptions {
    fn default() -> Self {
        Self {
            // `X-Mozilla-Status` also covers `X-Mozilla-Status2`.
            vendor_markers: vec!["X-Mozilla-Status".to_string(), "X-Mozilla-Keys".to_string()],
        }
    }
}

/// Splits mailbox text into raw per-message texts.
///
/// Tolerant of:
///
/// - Vendor status lines and blank lines before the real header block
/// - `From ` separators with no preceding blank line
/// - Separators followed by nothing (dropped silently)
/// - Mixed `\n` and `\r\n` line endings (the `\r` stays in the raw text)
#[derive(Debug, Clone, Default)]
pub struct MboxSplitter {
    options: SplitterOptions,
}

/// Accumulation state for the candidate message currently being read.
struct Candidate<'a> {
    lines: Vec<&'a str>,
    in_vendor_preamble: bool,
    saw_real_header: bool,
}

impl<'a> Candidate<'a> {
    fn fresh() -> Self {
        Self {
            lines: Vec::new(),
            in_vendor_preamble: true,
            saw_real_header: false,
        }
    }

    /// Text of the candidate, if it ever reached a real header.
    fn finish(&self) -> Option<String> {
        if self.saw_real_header && !self.lines.is_empty() {
            Some(self.lines.join("\n"))
        } else {
            None
        }
    }
}

impl MboxSplitter {
    /// Create a splitter with explicit options.
    pub fn new(options: SplitterOptions) -> Self {
        Self { options }
    }

    /// Split `content`, calling `message_callback` with each raw message text.
    ///
    /// The callback returns `true` to continue or `false` to stop early.
    /// Returns the number of messages emitted.
    pub fn split(&self, content: &str, message_callback: &mut dyn FnMut(String) -> bool) -> u64 {
        let mut count: u64 = 0;
        let mut current = Candidate::fresh();
        let mut dropped: u64 = 0;

        for line in content.split('\n') {
            if is_mbox_separator(line) {
                match current.finish() {
                    Some(raw) => {
                        count += 1;
                        if !message_callback(raw) {
                            return count;
                        }
                    }
                    None if !current.lines.is_empty() => dropped += 1,
                    None => {}
                }
                current = Candidate::fresh();
                continue;
            }

            if current.in_vendor_preamble {
                if is_blank_line(line) || self.is_vendor_line(line) {
                    continue;
                }
                if is_standard_header(line) {
                    current.in_vendor_preamble = false;
                    current.saw_real_header = true;
                }
            }

            current.lines.push(line);
        }

        // Flush last message
        match current.finish() {
            Some(raw) => {
                count += 1;
                message_callback(raw);
            }
            None if !current.lines.is_empty() => dropped += 1,
            None => {}
        }

        if dropped > 0 {
            debug!(dropped, "Discarded candidates without a real header block");
        }

        count
    }

    /// Split `content` into an ordered list of raw message texts.
    pub fn split_all(&self, content: &str) -> Vec<String> {
        let mut messages = Vec::new();
        self.split(content, &mut |raw| {
            messages.push(raw);
            true
        });
        messages
    }

    fn is_vendor_line(&self, line: &str) -> bool {
        self.options
            .vendor_markers
            .iter()
            .any(|marker| line.starts_with(marker.as_str()))
    }
}

/// Read a mailbox file into text, dropping byte sequences that are not UTF-8.
///
/// Thunderbird stores raw 8-bit message bodies; anything undecodable is noise
/// for field extraction and is discarded rather than replaced.
pub fn read_mailbox_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ApproveError::open(path, e))?;
    let text = decode_utf8_dropping_invalid(&bytes);
    if text.len() < bytes.len() {
        warn!(
            path = %path.display(),
            dropped = bytes.len() - text.len(),
            "Dropped undecodable bytes from mailbox"
        );
    }
    Ok(text)
}

/// Decode UTF-8, silently skipping invalid sequences.
pub fn decode_utf8_dropping_invalid(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Check whether a line is an MBOX separator (`From ` at the start).
///
/// Escaped separators inside bodies (`>From `) never match.
fn is_mbox_separator(line: &str) -> bool {
    line.starts_with("From ")
}

/// Check whether a line begins with one of the standard header names.
fn is_standard_header(line: &str) -> bool {
    STANDARD_HEADERS.iter().any(|h| line.starts_with(h))
}

/// Check whether a line is blank (empty or only whitespace / CR).
fn is_blank_line(line: &str) -> bool {
    line.trim().is_empty()
}
