//! Turns raw message texts into [`ParsedMessage`]s.

use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::extract::FieldExtractor;
use crate::model::message::ParsedMessage;
use crate::parser::header::HeaderBlock;
use crate::parser::mbox::{read_mailbox_text, MboxSplitter};
use crate::parser::mime::extract_plain_body;

/// Decodes raw messages and runs field extraction on their bodies.
#[derive(Debug, Clone, Default)]
pub struct MessageDecoder {
    splitter: MboxSplitter,
    extractor: FieldExtractor,
}

impl MessageDecoder {
    /// Create a decoder from a splitter and an extractor.
    pub fn new(splitter: MboxSplitter, extractor: FieldExtractor) -> Self {
        Self {
            splitter,
            extractor,
        }
    }

    /// Decoder configured from `[mailbox]` and `[extraction]`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            MboxSplitter::new(config.splitter_options()),
            FieldExtractor::from_config(&config.extraction),
        )
    }

    /// The splitter used for mailbox text.
    pub fn splitter(&self) -> &MboxSplitter {
        &self.splitter
    }

    /// Decode one raw message (headers + body, no separator line).
    ///
    /// Returns `Ok(None)` for fragments with neither a subject nor a sender.
    pub fn decode(&self, raw_text: &str, source_path: &Path) -> Result<Option<ParsedMessage>> {
        let headers = HeaderBlock::parse(raw_text);
        let body = extract_plain_body(raw_text)?;

        let from = headers.get_or_empty("from");
        let subject = headers.get_or_empty("subject");
        if subject.is_empty() && from.is_empty() {
            return Ok(None);
        }

        let reply_to = match headers.get("reply-to") {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => from.clone(),
        };

        let extraction = self.extractor.extract(&body);

        Ok(Some(ParsedMessage {
            message_id: headers.get_or_empty("message-id"),
            from,
            to: headers.get_or_empty("to"),
            reply_to,
            subject,
            date: headers.get_or_empty("date"),
            body,
            raw_text: raw_text.to_string(),
            source_path: source_path.to_path_buf(),
            short_description: extraction.short_description,
            extra_fields: extraction.extra_fields,
        }))
    }

    /// Split mailbox text and decode every message.
    ///
    /// Messages that fail to decode are logged and skipped.
    pub fn parse_mailbox_text(&self, content: &str, source_path: &Path) -> Vec<ParsedMessage> {
        let mut messages = Vec::new();
        let mut index: u64 = 0;

        self.splitter.split(content, &mut |raw| {
            match self.decode(&raw, source_path) {
                Ok(Some(msg)) => messages.push(msg),
                Ok(None) => debug!(index, "Skipping message without subject or sender"),
                Err(e) => warn!(index, error = %e, "Skipping undecodable message"),
            }
            index += 1;
            true
        });

        messages
    }

    /// Read and parse a mailbox file.
    ///
    /// An unreadable file is an error here; see [`MessageDecoder::read_messages`]
    /// for the lenient variant.
    pub fn parse_mailbox_file(&self, path: impl AsRef<Path>) -> Result<Vec<ParsedMessage>> {
        let path = path.as_ref();
        let content = read_mailbox_text(path)?;
        let messages = self.parse_mailbox_text(&content, path);
        info!(path = %path.display(), count = messages.len(), "Parsed mailbox");
        Ok(messages)
    }

    /// Read and parse a mailbox file, treating read failures as "no messages".
    pub fn read_messages(&self, path: impl AsRef<Path>) -> Vec<ParsedMessage> {
        let path = path.as_ref();
        match self.parse_mailbox_file(path) {
            Ok(messages) => messages,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read mailbox");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::TicketField;

    fn decode(raw: &str) -> Option<ParsedMessage> {
        MessageDecoder::default()
            .decode(raw, Path::new("/mail/NeedApprove"))
            .unwrap()
    }

    #[test]
    fn test_decode_envelope() {
        let msg = decode(
            "Message-ID: <1@sn>\nFrom: ServiceNow <sn@example.com>\nTo: me@example.com\nSubject: RITM1 approval\nDate: Mon, 01 Jan 2024 10:00:00 +0000\n\nShort description: VPN access for contractor\n",
        )
        .unwrap();
        assert_eq!(msg.message_id, "<1@sn>");
        assert_eq!(msg.from, "ServiceNow <sn@example.com>");
        assert_eq!(msg.reply_to, msg.from);
        assert_eq!(msg.to, "me@example.com");
        assert_eq!(msg.date, "Mon, 01 Jan 2024 10:00:00 +0000");
        assert_eq!(msg.short_description, "VPN access for contractor");
        assert!(msg.extra_fields.is_empty());
        assert_eq!(msg.source_path, Path::new("/mail/NeedApprove"));
    }

    #[test]
    fn test_reply_to_header_wins() {
        let msg = decode("From: a@b\nReply-To: approvals@b\nSubject: S\n\nB").unwrap();
        assert_eq!(msg.reply_to, "approvals@b");
    }

    #[test]
    fn test_message_without_subject_or_sender_is_dropped() {
        assert!(decode("Date: Mon, 01 Jan 2024\nTo: x@y\n\nB").is_none());
    }

    #[test]
    fn test_category_fields_flow_into_message() {
        let msg = decode(
            "From: sn@example.com\nSubject: RITM2 approval\n\nShort description: CN-Server & DB Access Control\nWhat System do you need access to? VPN\nEnvironment: PROD\n",
        )
        .unwrap();
        assert_eq!(msg.extra_fields.len(), 4);
        assert_eq!(msg.field(TicketField::Environment), "");
    }

    #[test]
    fn test_missing_file_is_error_but_lenient_read_is_empty() {
        let decoder = MessageDecoder::default();
        assert!(decoder.parse_mailbox_file("/definitely/not/here").is_err());
        assert!(decoder.read_messages("/definitely/not/here").is_empty());
    }
}
