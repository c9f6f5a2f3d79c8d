//! Approval reply derivation.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::model::message::ParsedMessage;

static RITM_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)RITM(\d+)").expect("valid RITM pattern"));

static TICKET_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(RITM\d+|CHG\d+)").expect("valid ticket pattern"));

static REF_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"MSG\d+").expect("valid ref pattern"));

/// A reply ready to be handed to a [`crate::sender::Sender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl ReplyDraft {
    /// Derive the approval reply for `original`.
    ///
    /// `default_body` is used when the original body carries no `MSG<digits>` token.
    pub fn for_message(original: &ParsedMessage, default_body: &str) -> Self {
        let subject = reply_subject(&original.subject);
        let body = match ref_token(&original.body) {
            Some(token) => {
                info!(reference = %token, "Using reference from original body");
                format!("Ref:{token}")
            }
            None => {
                warn!(default = %default_body, "No reference in original body, using default");
                default_body.to_string()
            }
        };

        Self {
            to: original.reply_to.clone(),
            subject,
            body,
        }
    }
}

/// Subject of the approval reply.
///
/// `Re: RITM<digits> - approve` when the subject names a RITM, else the
/// original subject with a `Re: ` prefix unless it already has one.
pub fn reply_subject(original: &str) -> String {
    if let Some(caps) = RITM_NUMBER.captures(original) {
        return format!("Re: RITM{} - approve", &caps[1]);
    }
    if original.to_lowercase().starts_with("re:") {
        original.to_string()
    } else {
        format!("Re: {original}")
    }
}

/// The last `MSG<digits>` token in a body.
pub fn ref_token(body: &str) -> Option<&str> {
    REF_TOKEN.find_iter(body).last().map(|m| m.as_str())
}

/// First `RITM…` or `CHG…` identifier in a subject, as written.
pub fn ticket_number(subject: &str) -> Option<String> {
    TICKET_NUMBER
        .captures(subject)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::TicketFields;
    use std::path::PathBuf;

    #[test]
    fn test_reply_subject_with_ritm() {
        assert_eq!(
            reply_subject("RITM1603887 | Approval Required / Approbation Requise"),
            "Re: RITM1603887 - approve"
        );
        assert_eq!(reply_subject("fwd: ritm42 please"), "Re: RITM42 - approve");
    }

    #[test]
    fn test_reply_subject_without_ritm() {
        assert_eq!(reply_subject("Random ticket notice"), "Re: Random ticket notice");
        assert_eq!(reply_subject("RE: already replied"), "RE: already replied");
    }

    #[test]
    fn test_ref_token_last_wins() {
        assert_eq!(ref_token("see MSG1000 and later MSG1002 end"), Some("MSG1002"));
        assert_eq!(ref_token("no token"), None);
    }

    #[test]
    fn test_ticket_number() {
        assert_eq!(ticket_number("CHG0031 needs approval").as_deref(), Some("CHG0031"));
        assert_eq!(ticket_number("Approve ritm77").as_deref(), Some("ritm77"));
        assert_eq!(ticket_number("nothing"), None);
    }

    #[test]
    fn test_reply_draft() {
        let msg = ParsedMessage {
            message_id: String::new(),
            from: "sn@example.com".into(),
            to: String::new(),
            reply_to: "approvals@example.com".into(),
            subject: "RITM1602185 | Approval Required".into(),
            date: String::new(),
            body: "...MSG1000 ... MSG1002...".into(),
            raw_text: String::new(),
            source_path: PathBuf::new(),
            short_description: String::new(),
            extra_fields: TicketFields::new(),
        };
        let draft = ReplyDraft::for_message(&msg, "Ref:MSG0");
        assert_eq!(draft.to, "approvals@example.com");
        assert_eq!(draft.subject, "Re: RITM1602185 - approve");
        assert_eq!(draft.body, "Ref:MSG1002");

        let plain = ParsedMessage {
            body: "no reference".into(),
            ..msg
        };
        assert_eq!(ReplyDraft::for_message(&plain, "Ref:MSG0").body, "Ref:MSG0");
    }
}
