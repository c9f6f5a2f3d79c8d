//! The decoded unit handed from the parser to the processing pass.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Names of the ticket fields mined from recognized request categories.
///
/// The set is closed: no other key can appear in [`ParsedMessage::extra_fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TicketField {
    Environment,
    RequiredPermissions,
    ReasonForApplication,
    RequestedBy,
}

impl TicketField {
    /// Every field, in display order.
    pub const ALL: [TicketField; 4] = [
        TicketField::RequestedBy,
        TicketField::Environment,
        TicketField::RequiredPermissions,
        TicketField::ReasonForApplication,
    ];

    /// Stable camelCase name used in logs and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            TicketField::Environment => "environment",
            TicketField::RequiredPermissions => "requiredPermissions",
            TicketField::ReasonForApplication => "reasonForApplication",
            TicketField::RequestedBy => "requestedBy",
        }
    }
}

impl fmt::Display for TicketField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted ticket fields keyed by [`TicketField`].
pub type TicketFields = BTreeMap<TicketField, String>;

/// One message reconstructed from a mailbox, with its envelope, body and
/// any extracted ticket fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Raw `Message-ID` header (may be empty).
    pub message_id: String,
    /// Raw `From` header.
    pub from: String,
    /// Raw `To` header.
    pub to: String,
    /// Raw `Reply-To` header, or `from` when absent.
    pub reply_to: String,
    /// Raw `Subject` header.
    pub subject: String,
    /// Raw `Date` header.
    pub date: String,
    /// First `text/plain` part, decoded.
    pub body: String,
    /// Verbatim reconstructed message text, without the boundary line.
    pub raw_text: String,
    /// Mailbox file the message was read from.
    pub source_path: PathBuf,
    /// Extracted short description (may be empty).
    pub short_description: String,
    /// Populated only for recognized ticket categories.
    pub extra_fields: TicketFields,
}

impl ParsedMessage {
    /// Key used to remember that this message has been answered.
    ///
    /// The `Message-ID` when present, otherwise `subject|from`.
    pub fn dedup_key(&self) -> String {
        if self.message_id.is_empty() {
            format!("{}|{}", self.subject, self.from)
        } else {
            self.message_id.clone()
        }
    }

    /// Value of an extracted field, empty when missing.
    pub fn field(&self, field: TicketField) -> &str {
        self.extra_fields
            .get(&field)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// True when the message matches `other` for mailbox removal purposes:
    /// by `Message-ID` when this message has one, else by exact subject and sender.
    pub fn same_message(&self, other: &ParsedMessage) -> bool {
        if !self.message_id.is_empty() {
            return self.message_id == other.message_id;
        }
        self.subject == other.subject && self.from == other.from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, subject: &str, from: &str) -> ParsedMessage {
        ParsedMessage {
            message_id: id.to_string(),
            from: from.to_string(),
            to: String::new(),
            reply_to: from.to_string(),
            subject: subject.to_string(),
            date: String::new(),
            body: String::new(),
            raw_text: String::new(),
            source_path: PathBuf::new(),
            short_description: String::new(),
            extra_fields: TicketFields::new(),
        }
    }

    #[test]
    fn test_dedup_key_prefers_message_id() {
        assert_eq!(message("<a@b>", "S", "F").dedup_key(), "<a@b>");
        assert_eq!(message("", "Approve me", "x@y").dedup_key(), "Approve me|x@y");
    }

    #[test]
    fn test_same_message_by_id_then_pair() {
        let a = message("<1@x>", "S", "F");
        assert!(a.same_message(&message("<1@x>", "other", "other")));
        assert!(!a.same_message(&message("<2@x>", "S", "F")));

        let b = message("", "S", "F");
        assert!(b.same_message(&message("<9@x>", "S", "F")));
        assert!(!b.same_message(&message("", "S", "G")));
    }

    #[test]
    fn test_ticket_field_serializes_camel_case() {
        let mut fields = TicketFields::new();
        fields.insert(TicketField::RequiredPermissions, "Read".into());
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"requiredPermissions":"Read"}"#);
    }
}
