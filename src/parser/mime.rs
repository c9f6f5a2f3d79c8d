//! MIME body extraction: the first `text/plain` part, decoded tolerantly.

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::error::{ApproveError, Result};
use crate::parser::mbox::decode_utf8_dropping_invalid;

/// Maximum depth for nested `message/rfc822` descent (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 10;

/// Extract the plain-text body of a raw message.
///
/// Multipart messages are walked depth-first and the first part whose content
/// type is exactly `text/plain` wins; no such part yields an empty body.
/// Single-part messages return their transfer-decoded payload whatever their
/// declared type. Invalid UTF-8 is dropped, never an error.
pub fn extract_plain_body(raw_message: &str) -> Result<String> {
    let message = MessageParser::default()
        .parse(raw_message.as_bytes())
        .ok_or_else(|| ApproveError::MessageDecode("not an RFC 5322 message".into()))?;

    let root = message
        .parts
        .first()
        .ok_or_else(|| ApproveError::MessageDecode("message has no parts".into()))?;

    if !matches!(root.body, PartType::Multipart(_)) {
        return Ok(decode_utf8_dropping_invalid(root.contents()));
    }

    Ok(first_plain_part(&message, 0)
        .map(|part| decode_utf8_dropping_invalid(part.contents()))
        .unwrap_or_default())
}

/// Depth-first search for the first `text/plain` leaf, descending into
/// attached messages in document order.
fn first_plain_part<'a>(message: &'a Message<'a>, depth: usize) -> Option<&'a MessagePart<'a>> {
    if depth > MAX_DEPTH {
        return None;
    }
    for part in &message.parts {
        match &part.body {
            PartType::Multipart(_) => continue,
            PartType::Message(inner) => {
                if let Some(found) = first_plain_part(inner, depth + 1) {
                    return Some(found);
                }
            }
            _ if mime_type(part) == "text/plain" => return Some(part),
            _ => {}
        }
    }
    None
}

/// Lower-cased `type/subtype` of a part; parts without a `Content-Type`
/// default to `text/plain` (RFC 2045 §5.2).
fn mime_type(part: &MessagePart<'_>) -> String {
    part.content_type()
        .map(|ct| match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        })
        .unwrap_or_else(|| "text/plain".to_string())
        .to_ascii_lowercase()
}
